//! Commit engine
//!
//! Turns a document's queued actions into store operations inside one
//! transaction attempt. The decision order is fixed:
//!
//! 1. a queued delete wins over everything else
//! 2. a queued query is resolved and its first hit adopted as the document
//! 3. callbacks run against a fresh read, and may queue more actions
//! 4. a plain find reads the document
//! 5. a soft create writes only if the document is missing
//! 6. a create overwrites unconditionally
//! 7. otherwise the queued field edits are merged into the stored document
//!
//! Creates and updates pass the validation gate first; a rejected payload
//! leaves the transaction without writes.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::Result;
use crate::document::Action;
use crate::path::DocumentPath;
use crate::schema::{RunDefaults, Schema, ValidationError};
use crate::store::{SetOptions, StoreTransaction, TransactionBody};
use crate::value::Fields;

use super::context::CallbackContext;
use super::errors::{CallbackError, Phase, TransactionError};
use super::mirror::{self, MirrorSource};
use super::state::{RunStatus, TransactionState, stamp_create, stamp_update};

/// Transaction body committing one document's queue.
///
/// Every attempt starts from the same seed; the state of the last attempt
/// is kept for the caller.
pub(crate) struct CommitEngine<'a> {
    schema: &'a Schema,
    settings: RunDefaults,
    path: DocumentPath,
    raw: Fields,
    actions: Vec<Action>,
    attempts: u32,
    outcome: Option<TransactionState>,
}

impl<'a> CommitEngine<'a> {
    pub(crate) fn new(
        schema: &'a Schema,
        settings: RunDefaults,
        path: DocumentPath,
        raw: Fields,
        actions: Vec<Action>,
    ) -> Self {
        Self {
            schema,
            settings,
            path,
            raw,
            actions,
            attempts: 0,
            outcome: None,
        }
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    /// State of the last attempt, or the untouched seed if none ran.
    pub(crate) fn into_outcome(self) -> TransactionState {
        match self.outcome {
            Some(state) => state,
            None => TransactionState::new(self.path, self.raw, self.actions),
        }
    }

    fn seed(&self) -> TransactionState {
        TransactionState::new(self.path.clone(), self.raw.clone(), self.actions.clone())
    }

    async fn execute(
        &self,
        tx: &mut dyn StoreTransaction,
        mut state: TransactionState,
    ) -> Result<TransactionState> {
        let plan = state.plan();

        if plan.delete {
            return self.delete(tx, state).await;
        }

        if let Some(query) = plan.query {
            let hits = tx
                .query(&query.limit(1))
                .await
                .map_err(|e| TransactionError::new(Phase::Query, e))?;
            state = match hits.into_iter().next() {
                Some(snap) => {
                    debug!(document = %snap.path(), "Query matched, adopting document");
                    state.with_query_hit(snap, self.schema.defaults())
                }
                None => state.with_query_miss(),
            };
        }

        if !plan.callbacks.is_empty() {
            state = self.ensure_read(tx, state).await?;
            for (index, callback) in plan.callbacks.iter().enumerate() {
                let result = (**callback)(&mut CallbackContext::new(&mut state));
                if let Err(source) = result {
                    debug!(document = %state.path(), index, error = %source, "Callback failed");
                    state = state.with_error(CallbackError { index, source });
                }
            }
            // Callbacks may have queued more work
            if state.plan().delete {
                return self.delete(tx, state).await;
            }
        }

        let plan = state.plan();

        if plan.find && !plan.create && !plan.find_or_create {
            state = self.ensure_read(tx, state).await?;
        }

        if plan.find_or_create {
            state = self.ensure_read(tx, state).await?;
            if !state.exists() {
                let payload = self.validate_create(state.create_payload(false))?;
                let state = state.with_decoded(&payload);
                tx.create(state.path(), stamp_create(payload, self.schema.version()))
                    .map_err(|e| TransactionError::new(Phase::Create, e))?;
                return self.replicate(tx, state.with_status(RunStatus::Created), MirrorSource::Full);
            }
        }

        if plan.create {
            let payload = self.validate_create(state.create_payload(true))?;
            let state = state.with_decoded(&payload);
            tx.set(
                state.path(),
                stamp_create(payload, self.schema.version()),
                SetOptions::default(),
            )
            .map_err(|e| TransactionError::new(Phase::Create, e))?;
            return self.replicate(
                tx,
                state.with_status(RunStatus::ForceCreated),
                MirrorSource::Full,
            );
        }

        let changes = state.update_payload();
        if changes.is_empty() {
            if self.settings.force_get {
                state = self.ensure_read(tx, state).await?;
            }
            trace!(document = %state.path(), "Nothing to write");
            return Ok(state);
        }

        let changes = self.validate_update(changes)?;
        let state = state.with_decoded(&changes);
        tx.set(state.path(), stamp_update(changes.clone()), SetOptions::merge())
            .map_err(|e| TransactionError::new(Phase::Update, e))?;
        self.replicate(
            tx,
            state.with_status(RunStatus::Updated),
            MirrorSource::Touched(&changes),
        )
    }

    async fn delete(
        &self,
        tx: &mut dyn StoreTransaction,
        mut state: TransactionState,
    ) -> Result<TransactionState> {
        if self
            .mirror_config()
            .is_some_and(|config| mirror::needs_lookup(config, &state))
        {
            state = self.ensure_read(tx, state).await?;
        }
        tx.delete(state.path())
            .map_err(|e| TransactionError::new(Phase::Delete, e))?;
        self.replicate(tx, state.with_status(RunStatus::Deleted), MirrorSource::Removed)
    }

    /// Reads the document once per attempt; later calls reuse the first read.
    async fn ensure_read(
        &self,
        tx: &mut dyn StoreTransaction,
        state: TransactionState,
    ) -> Result<TransactionState> {
        if state.snap().is_some() {
            return Ok(state);
        }
        let snap = tx
            .get(state.path())
            .await
            .map_err(|e| TransactionError::new(Phase::Get, e))?;
        Ok(state.with_snapshot(snap, self.schema.defaults()))
    }

    fn replicate(
        &self,
        tx: &mut dyn StoreTransaction,
        state: TransactionState,
        source: MirrorSource<'_>,
    ) -> Result<TransactionState> {
        match self.mirror_config() {
            Some(config) => mirror::replicate(tx, config, state, source),
            None => Ok(state),
        }
    }

    fn mirror_config(&self) -> Option<&crate::schema::MirrorConfig> {
        if self.settings.mirror {
            self.schema.mirror()
        } else {
            None
        }
    }

    /// Validates every declared field of a create payload.
    fn validate_create(&self, payload: Fields) -> Result<Fields> {
        let subset = self.schema.field_names();
        self.validate(payload, &subset)
    }

    /// Validates only the fields an update touches.
    fn validate_update(&self, changes: Fields) -> Result<Fields> {
        let subset: Vec<String> = changes.keys().cloned().collect();
        self.validate(changes, &subset)
    }

    fn validate(&self, mut payload: Fields, subset: &[String]) -> Result<Fields> {
        if !self.settings.auto_validate {
            return Ok(payload);
        }
        let Some(validator) = self.schema.validator() else {
            return Ok(payload);
        };
        let decoded = validator
            .decode(&payload, subset)
            .map_err(ValidationError::from_issues)?;
        payload.extend(decoded);
        Ok(payload)
    }
}

#[async_trait]
impl TransactionBody for CommitEngine<'_> {
    async fn attempt(&mut self, tx: &mut dyn StoreTransaction) -> Result<()> {
        self.attempts += 1;
        self.outcome = None;
        trace!(document = %self.path, attempt = self.attempts, "Starting commit attempt");

        let state = self.execute(tx, self.seed()).await?;
        self.outcome = Some(state);
        Ok(())
    }
}
