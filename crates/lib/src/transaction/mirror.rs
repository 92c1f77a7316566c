//! Mirror replication
//!
//! A schema may name a mirror: a second document that holds a copy of a
//! subset of this document's fields under a single key. Mirror writes are
//! buffered in the same transaction as the primary write, so both commit or
//! neither does.

use tracing::{debug, warn};

use crate::Result;
use crate::constants::UPDATED_AT;
use crate::path::DocumentPath;
use crate::schema::MirrorConfig;
use crate::store::{SetOptions, StoreTransaction};
use crate::value::{Fields, Value};

use super::errors::{Phase, TransactionError};
use super::state::{MirrorWrite, TransactionState};

/// Which fields of the document reach the mirror.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MirrorSource<'a> {
    /// Every mirrored field, after a create
    Full,
    /// Mirrored fields among those changed by an update
    Touched(&'a Fields),
    /// The document was deleted; the mirror key is removed
    Removed,
}

/// Mirror document for `state`, or `None` if its id is unknown or is not a
/// single path segment.
pub(crate) fn mirror_path(config: &MirrorConfig, state: &TransactionState) -> Option<DocumentPath> {
    let id = match &config.id_field {
        None => Some(state.path().id().to_string()),
        Some(field) => state
            .raw()
            .get(field)
            .filter(|v| !v.is_blank())
            .and_then(Value::as_id),
    };
    id.and_then(|id| config.collection.doc(id).ok())
}

/// True if the mirror id has to be read from the store before a delete.
pub(crate) fn needs_lookup(config: &MirrorConfig, state: &TransactionState) -> bool {
    config.id_field.is_some() && mirror_path(config, state).is_none()
}

/// Buffers the mirror write for `state` and records it on the state.
pub(crate) fn replicate(
    tx: &mut dyn StoreTransaction,
    config: &MirrorConfig,
    state: TransactionState,
    source: MirrorSource<'_>,
) -> Result<TransactionState> {
    let Some(path) = mirror_path(config, &state) else {
        warn!(
            document = %state.path(),
            id_field = config.id_field.as_deref().unwrap_or_default(),
            "Mirror id is empty or invalid, skipping mirror write"
        );
        return Ok(state);
    };

    let entry = match source {
        MirrorSource::Full => {
            let copied = config
                .fields
                .iter()
                .filter_map(|f| state.raw().get(f).map(|v| (f.clone(), v.clone())))
                .collect();
            Value::Map(stamped(copied))
        }
        MirrorSource::Touched(changes) => {
            let copied: Fields = config
                .fields
                .iter()
                .filter_map(|f| changes.get(f).map(|v| (f.clone(), v.clone())))
                .collect();
            if copied.is_empty() {
                debug!(document = %state.path(), "No mirrored field changed");
                return Ok(state);
            }
            Value::Map(stamped(copied))
        }
        MirrorSource::Removed => Value::Deleted,
    };

    let mut data = Fields::new();
    data.insert(config.name.clone(), entry);
    tx.set(&path, data.clone(), SetOptions::merge())
        .map_err(|e| TransactionError::new(Phase::Mirror, e))?;
    debug!(document = %state.path(), mirror = %path, "Buffered mirror write");

    Ok(state.with_mirror(MirrorWrite { path, data }))
}

fn stamped(mut fields: Fields) -> Fields {
    fields.insert(UPDATED_AT.to_string(), Value::ServerTimestamp);
    fields
}
