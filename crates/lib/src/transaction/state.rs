//! Per-attempt transaction state
//!
//! A [`TransactionState`] is built fresh for every commit attempt from the
//! document's data and queue. The commit engine threads it through each step
//! by value, and the state of the attempt that committed is folded back into
//! the document.

use std::fmt;

use crate::constants::{CREATED_AT, SCHEMA_VERSION, UPDATED_AT, is_base_field};
use crate::document::{Action, Callback};
use crate::path::DocumentPath;
use crate::store::{Query, Snapshot};
use crate::value::{Fields, Value};

use super::errors::CallbackError;

/// Outcome of the write a commit attempt performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Soft create of a missing document
    Created,
    /// Unconditional create, overwriting any existing document
    ForceCreated,
    Updated,
    Deleted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Created => "created",
            RunStatus::ForceCreated => "force-created",
            RunStatus::Updated => "updated",
            RunStatus::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// Store operations performed by a commit attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionsRun {
    pub get: bool,
    pub query: bool,
    pub create: bool,
    pub force_create: bool,
    pub update: bool,
    pub delete: bool,
}

impl ActionsRun {
    /// True if nothing was read or written
    pub fn is_empty(&self) -> bool {
        *self == ActionsRun::default()
    }
}

/// Mirror document written alongside the primary write.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorWrite {
    pub path: DocumentPath,
    pub data: Fields,
}

/// Summary of the queued actions, in decision order.
#[derive(Clone, Default)]
pub(crate) struct Plan {
    pub delete: bool,
    pub query: Option<Query>,
    pub callbacks: Vec<Callback>,
    pub find: bool,
    pub find_or_create: bool,
    pub create: bool,
}

/// State of one commit attempt.
#[derive(Debug)]
pub struct TransactionState {
    path: DocumentPath,
    raw: Fields,
    actions: Vec<Action>,
    actions_run: ActionsRun,
    errors: Vec<CallbackError>,
    last_run_status: Option<RunStatus>,
    snap: Option<Snapshot>,
    mirror: Option<MirrorWrite>,
}

impl TransactionState {
    pub(crate) fn new(path: DocumentPath, raw: Fields, actions: Vec<Action>) -> Self {
        Self {
            path,
            raw,
            actions,
            actions_run: ActionsRun::default(),
            errors: Vec::new(),
            last_run_status: None,
            snap: None,
            mirror: None,
        }
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn raw(&self) -> &Fields {
        &self.raw
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn actions_run(&self) -> ActionsRun {
        self.actions_run
    }

    pub fn errors(&self) -> &[CallbackError] {
        &self.errors
    }

    pub fn last_run_status(&self) -> Option<RunStatus> {
        self.last_run_status
    }

    pub fn snap(&self) -> Option<&Snapshot> {
        self.snap.as_ref()
    }

    pub fn mirror(&self) -> Option<&MirrorWrite> {
        self.mirror.as_ref()
    }

    /// True once the attempt has read the document and found it.
    pub fn exists(&self) -> bool {
        self.snap.as_ref().is_some_and(Snapshot::exists)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        DocumentPath,
        Fields,
        Option<Snapshot>,
        ActionsRun,
        Option<RunStatus>,
        Vec<CallbackError>,
    ) {
        (
            self.path,
            self.raw,
            self.snap,
            self.actions_run,
            self.last_run_status,
            self.errors,
        )
    }

    pub(crate) fn plan(&self) -> Plan {
        let mut plan = Plan::default();
        for action in &self.actions {
            match action {
                Action::Create(_) => plan.create = true,
                Action::FindOrCreate(_) => plan.find_or_create = true,
                Action::Update(_) | Action::DeleteField(_) => {}
                Action::Delete => plan.delete = true,
                Action::Find => plan.find = true,
                // Last query wins
                Action::Query(query) => plan.query = Some(query.clone()),
                Action::Callback(callback) => plan.callbacks.push(callback.clone()),
            }
        }
        plan
    }

    /// Adopts a snapshot read by `get`.
    ///
    /// An existing document replaces the local data with the stored data over
    /// the schema defaults; field edits queued for this attempt are then
    /// applied again on top. A missing document leaves the local data alone.
    pub(crate) fn with_snapshot(mut self, snap: Snapshot, defaults: &Fields) -> Self {
        self.actions_run.get = true;
        self.adopt(snap, defaults)
    }

    /// Adopts the first hit of the queued query as the document.
    pub(crate) fn with_query_hit(mut self, snap: Snapshot, defaults: &Fields) -> Self {
        self.actions_run.query = true;
        self.path = snap.path().clone();
        self.adopt(snap, defaults)
    }

    pub(crate) fn with_query_miss(mut self) -> Self {
        self.actions_run.query = true;
        self
    }

    fn adopt(mut self, snap: Snapshot, defaults: &Fields) -> Self {
        if let Some(data) = snap.data() {
            let mut raw = defaults.clone();
            raw.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
            replay(&mut raw, &self.actions);
            self.raw = raw;
        }
        self.snap = Some(snap);
        self
    }

    pub(crate) fn with_status(mut self, status: RunStatus) -> Self {
        match status {
            RunStatus::Created => self.actions_run.create = true,
            RunStatus::ForceCreated => self.actions_run.force_create = true,
            RunStatus::Updated => self.actions_run.update = true,
            RunStatus::Deleted => self.actions_run.delete = true,
        }
        self.last_run_status = Some(status);
        self
    }

    /// Takes over the values the validator decoded, so the local data
    /// matches what is written.
    pub(crate) fn with_decoded(mut self, payload: &Fields) -> Self {
        self.raw.extend(
            payload
                .iter()
                .filter(|(k, _)| !is_base_field(k))
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        self
    }

    pub(crate) fn with_error(mut self, error: CallbackError) -> Self {
        self.errors.push(error);
        self
    }

    pub(crate) fn with_mirror(mut self, mirror: MirrorWrite) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Queues an action raised by a callback, writing field edits through to
    /// the local data.
    pub(crate) fn record(&mut self, action: Action) {
        match &action {
            Action::Update(data) => self.raw.extend(data.clone()),
            Action::DeleteField(field) => {
                self.raw.insert(field.clone(), Value::Deleted);
            }
            Action::Create(data) => self.raw.extend(data.clone()),
            Action::FindOrCreate(_)
            | Action::Delete
            | Action::Find
            | Action::Query(_)
            | Action::Callback(_) => {}
        }
        self.actions.push(action);
    }

    /// Full document data for a create, without base fields.
    ///
    /// Deleted fields are kept as deletion markers when `keep_deleted` is set
    /// and dropped otherwise.
    pub(crate) fn create_payload(&self, keep_deleted: bool) -> Fields {
        self.raw
            .iter()
            .filter(|(k, _)| !is_base_field(k))
            .filter(|(_, v)| keep_deleted || !v.is_deleted())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Fields changed by queued updates and field deletions, in queue order.
    pub(crate) fn update_payload(&self) -> Fields {
        let mut changes = Fields::new();
        for action in &self.actions {
            match action {
                Action::Update(data) => changes.extend(data.clone()),
                Action::DeleteField(field) => {
                    changes.insert(field.clone(), Value::Deleted);
                }
                _ => {}
            }
        }
        changes
    }
}

fn replay(raw: &mut Fields, actions: &[Action]) {
    for action in actions {
        match action {
            Action::Create(data) => raw.extend(data.clone()),
            Action::Update(data) => raw.extend(data.clone()),
            Action::DeleteField(field) => {
                raw.insert(field.clone(), Value::Deleted);
            }
            // A found document keeps its stored data
            Action::FindOrCreate(_) => {}
            Action::Delete | Action::Find | Action::Query(_) | Action::Callback(_) => {}
        }
    }
}

/// Adds the server-managed fields of a newly created document.
pub(crate) fn stamp_create(mut payload: Fields, version: i64) -> Fields {
    payload.insert(CREATED_AT.to_string(), Value::ServerTimestamp);
    payload.insert(UPDATED_AT.to_string(), Value::ServerTimestamp);
    payload.insert(SCHEMA_VERSION.to_string(), Value::Int(version));
    payload
}

pub(crate) fn stamp_update(mut payload: Fields) -> Fields {
    payload.insert(UPDATED_AT.to_string(), Value::ServerTimestamp);
    payload
}
