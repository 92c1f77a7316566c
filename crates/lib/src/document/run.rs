//! Running a document's queue
//!
//! [`Document::run`] commits the queue in one store transaction and folds
//! the outcome back into the document. The queue is cleared only when the
//! whole run succeeded, so a failed run can simply be called again.

use std::sync::Arc;

use tracing::{debug, info};

use crate::Result;
use crate::schema::{RunConfig, RunDefaults};
use crate::store::{Snapshot, TransactionOptions};
use crate::transaction::engine::CommitEngine;
use crate::transaction::{ActionsRun, CallbackError, RunStatus, RunTransactionErrors, TransactionState};

use super::Document;

impl Document {
    /// Commits the queued actions with the schema's run defaults.
    ///
    /// An empty queue is a no-op and touches no store.
    pub async fn run(&mut self) -> Result<&mut Self> {
        self.run_with(RunConfig::default()).await
    }

    /// Commits the queued actions with per-run overrides.
    ///
    /// On success the queue is cleared and the document reflects the
    /// committed state. If callbacks failed, their writes are still committed
    /// and the data is updated, but the queue is kept and
    /// [`Error::Callbacks`](crate::Error::Callbacks) is returned. Any other
    /// error leaves the document's data and queue untouched.
    ///
    /// Concurrent runs on one document are excluded by the `&mut` receiver.
    pub async fn run_with(&mut self, config: RunConfig) -> Result<&mut Self> {
        let settings = config.merged_over(self.schema.run_defaults());
        if self.queue.is_empty() && !settings.force_get {
            debug!(document = %self.path, "Queue is empty, nothing to run");
            return Ok(self);
        }

        match self.commit(settings).await {
            Ok(()) => Ok(self),
            Err(err) => {
                self.actions_run = ActionsRun::default();
                self.last_run_status = None;
                Err(err)
            }
        }
    }

    async fn commit(&mut self, settings: RunDefaults) -> Result<()> {
        let store = Arc::clone(&self.store);
        let schema = Arc::clone(&self.schema);

        let mut engine = CommitEngine::new(
            &schema,
            settings,
            self.path.clone(),
            self.raw.clone(),
            self.queue.clone(),
        );
        let options = TransactionOptions {
            max_attempts: settings.max_attempts,
        };
        store.run_transaction(&mut engine, options).await?;

        let attempts = engine.attempts();
        let errors = self.fold(engine.into_outcome());

        if settings.force_get
            && matches!(
                self.last_run_status,
                Some(RunStatus::Created | RunStatus::ForceCreated)
            )
        {
            // Pick up the timestamps the store resolved on create
            let snap = store.get(&self.path).await?;
            self.adopt(snap);
        }

        if !errors.is_empty() {
            return Err(RunTransactionErrors { errors }.into());
        }

        self.queue.clear();
        self.has_run_successfully = true;
        info!(
            document = %self.path,
            status = self.last_run_status.map(|s| s.to_string()).unwrap_or_else(|| "read".into()),
            attempts,
            "Committed document"
        );
        Ok(())
    }

    /// Takes over the state of the attempt that committed.
    fn fold(&mut self, state: TransactionState) -> Vec<CallbackError> {
        let (path, raw, snap, actions_run, status, errors) = state.into_parts();
        self.path = path;
        self.raw = raw;
        if let Some(snap) = snap {
            self.exists = snap.exists();
            self.snap = Some(snap);
        }
        match status {
            Some(RunStatus::Created | RunStatus::ForceCreated | RunStatus::Updated) => {
                self.exists = true;
            }
            Some(RunStatus::Deleted) => self.exists = false,
            None => {}
        }
        self.actions_run = actions_run;
        self.last_run_status = status;
        errors
    }

    fn adopt(&mut self, snap: Snapshot) {
        if let Some(data) = snap.data() {
            let mut raw = self.schema.defaults().clone();
            raw.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
            self.raw = raw;
        }
        self.exists = snap.exists();
        self.snap = Some(snap);
    }
}
