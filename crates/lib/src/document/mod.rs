//! Documents
//!
//! A [`Document`] is a local handle on one stored document. It keeps a copy
//! of the document's data and a queue of intents; nothing touches the store
//! until [`Document::run`] commits the queue in a single transaction.
//!
//! ```
//! # use std::sync::Arc;
//! use stagedoc::{CollectionPath, Document, InMemoryStore, Schema, fields};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> stagedoc::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let schema = Arc::new(
//!     Schema::new(CollectionPath::new("users").unwrap())
//!         .with_defaults(fields([("name", "".into()), ("age", 0.into())])),
//! );
//!
//! let mut doc = Document::new(store.clone(), schema, "ada")?;
//! doc.find_or_create(fields([("name", "Ada".into())]))?;
//! doc.run().await?;
//! assert!(doc.exists());
//!
//! doc.data_mut().set("age", 36)?;
//! doc.run().await?;
//! assert!(doc.queue().is_empty());
//! # Ok(())
//! # }
//! ```

mod action;
mod errors;
mod run;
mod view;

use std::sync::Arc;

pub use action::{Action, Callback};
pub use errors::FieldError;
pub(crate) use view::{check_not_protected, check_writable};
pub use view::{DataView, DataViewMut};

use crate::Result;
use crate::clock::{Clock, SystemClock};
use crate::constants::{CREATED_AT, SCHEMA_VERSION, UPDATED_AT};
use crate::path::DocumentPath;
use crate::schema::{Schema, ValidationError};
use crate::store::{Query, Snapshot, Store};
use crate::transaction::{ActionsRun, BoxError, CallbackContext, RunStatus};
use crate::value::{Fields, Value, fields_from_json, fields_to_json};

/// Local handle on one document of a schema's collection.
#[derive(Debug)]
pub struct Document {
    store: Arc<dyn Store>,
    schema: Arc<Schema>,
    path: DocumentPath,
    raw: Fields,
    queue: Vec<Action>,
    snap: Option<Snapshot>,
    exists: bool,
    has_run_successfully: bool,
    base_fallback: Fields,
    actions_run: ActionsRun,
    last_run_status: Option<RunStatus>,
}

impl Document {
    /// Creates a handle on document `id`, starting from the schema defaults.
    ///
    /// Fails if `id` is empty or contains `/`.
    pub fn new(store: Arc<dyn Store>, schema: Arc<Schema>, id: impl Into<String>) -> Result<Self> {
        let data = schema.defaults().clone();
        Self::with_data(store, schema, id, data)
    }

    /// Creates a handle on document `id` whose local data is the schema
    /// defaults overlaid with `data`. Nothing is queued.
    pub fn with_data(
        store: Arc<dyn Store>,
        schema: Arc<Schema>,
        id: impl Into<String>,
        data: Fields,
    ) -> Result<Self> {
        let path = schema.collection().doc(id)?;
        Ok(Self::at(store, schema, path, data))
    }

    fn at(store: Arc<dyn Store>, schema: Arc<Schema>, path: DocumentPath, data: Fields) -> Self {
        let mut raw = schema.defaults().clone();
        raw.extend(data);
        let base_fallback = fallback(&SystemClock, &schema);
        Self {
            store,
            schema,
            path,
            raw,
            queue: Vec::new(),
            snap: None,
            exists: false,
            has_run_successfully: false,
            base_fallback,
            actions_run: ActionsRun::default(),
            last_run_status: None,
        }
    }

    /// Creates a handle on a new document with a random id.
    pub fn generated(store: Arc<dyn Store>, schema: Arc<Schema>) -> Self {
        let path = DocumentPath::within(schema.collection().clone(), uuid::Uuid::new_v4().to_string());
        let data = schema.defaults().clone();
        Self::at(store, schema, path, data)
    }

    /// Creates a handle from a snapshot read elsewhere.
    pub fn from_snapshot(store: Arc<dyn Store>, schema: Arc<Schema>, snap: Snapshot) -> Self {
        let data = snap.data().cloned().unwrap_or_default();
        let path = DocumentPath::within(schema.collection().clone(), snap.id().to_string());
        let mut doc = Self::at(store, schema, path, data);
        doc.exists = snap.exists();
        doc.snap = Some(snap);
        doc
    }

    /// Creates a handle from JSON produced by [`Document::to_json`].
    pub fn from_json(
        store: Arc<dyn Store>,
        schema: Arc<Schema>,
        id: impl Into<String>,
        json: &serde_json::Value,
    ) -> Result<Self> {
        if !json.is_object() {
            // Surfaces serde's own "invalid type" error
            serde_json::from_value::<serde_json::Map<String, serde_json::Value>>(json.clone())?;
        }
        Self::with_data(store, schema, id, fields_from_json(json))
    }

    /// Regenerates the local base field fallback from `clock`.
    pub fn with_clock(mut self, clock: &dyn Clock) -> Self {
        self.base_fallback = fallback(clock, &self.schema);
        self
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// True if the document was found or written by the last successful read or write.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn has_run_successfully(&self) -> bool {
        self.has_run_successfully
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snap.as_ref()
    }

    pub fn queue(&self) -> &[Action] {
        &self.queue
    }

    /// Store operations of the last run.
    pub fn actions_run(&self) -> ActionsRun {
        self.actions_run
    }

    /// Write performed by the last run, if any.
    pub fn last_run_status(&self) -> Option<RunStatus> {
        self.last_run_status
    }

    pub fn data(&self) -> DataView<'_> {
        DataView::new(&self.raw, self.fallback())
    }

    pub fn data_mut(&mut self) -> DataViewMut<'_> {
        let fallback = if self.has_run_successfully {
            None
        } else {
            Some(&self.base_fallback)
        };
        DataViewMut::new(&mut self.raw, &mut self.queue, fallback)
    }

    fn fallback(&self) -> Option<&Fields> {
        (!self.has_run_successfully).then_some(&self.base_fallback)
    }

    /// Queues an unconditional create with `data` merged into the local data.
    ///
    /// The whole document is written, replacing anything stored.
    pub fn create(&mut self, data: Fields) -> Result<&mut Self> {
        check_not_protected(data.keys())?;
        self.raw.extend(data.clone());
        self.queue.push(Action::Create(data));
        Ok(self)
    }

    /// Queues a create that only happens if the document does not exist.
    ///
    /// If it exists, the stored data is adopted instead.
    pub fn find_or_create(&mut self, data: Fields) -> Result<&mut Self> {
        check_not_protected(data.keys())?;
        self.raw.extend(data.clone());
        self.queue.push(Action::FindOrCreate(data));
        Ok(self)
    }

    /// Sets several fields and queues them as one update.
    ///
    /// Every field must be writable; nothing changes if one is rejected.
    pub fn update(&mut self, data: Fields) -> Result<&mut Self> {
        for field in data.keys() {
            check_writable(&self.raw, field)?;
        }
        self.raw.extend(data.clone());
        self.queue.push(Action::Update(data));
        Ok(self)
    }

    /// Queues the removal of some fields.
    pub fn delete_fields<I, S>(&mut self, fields: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        for field in &fields {
            check_writable(&self.raw, field)?;
        }
        for field in fields {
            self.raw.insert(field.clone(), Value::Deleted);
            self.queue.push(Action::DeleteField(field));
        }
        Ok(self)
    }

    /// Queues the deletion of the whole document.
    pub fn delete(&mut self) -> &mut Self {
        self.queue.push(Action::Delete);
        self
    }

    /// Queues a read of the document.
    pub fn find(&mut self) -> &mut Self {
        self.queue.push(Action::Find);
        self
    }

    /// Queues a query whose first hit becomes this document.
    pub fn query(&mut self, query: Query) -> &mut Self {
        self.queue.push(Action::Query(query));
        self
    }

    /// Queues a callback run inside the transaction after the document is read.
    pub fn attach<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut CallbackContext<'_>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.queue.push(Action::Callback(Arc::new(callback)));
        self
    }

    /// Drops every queued action. Local data is left as is.
    pub fn clear_queue(&mut self) -> &mut Self {
        self.queue.clear();
        self
    }

    /// Runs the schema validator over the local data.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let Some(validator) = self.schema.validator() else {
            return Ok(());
        };
        let data = self.data().to_fields();
        validator
            .decode(&data, &self.schema.field_names())
            .map(|_| ())
            .map_err(ValidationError::from_issues)
    }

    /// Local data as JSON, with store-native values in tagged envelopes.
    pub fn to_json(&self) -> serde_json::Value {
        fields_to_json(&self.data().to_fields())
    }
}

fn fallback(clock: &dyn Clock, schema: &Schema) -> Fields {
    let now = Value::Timestamp(clock.now_timestamp());
    let mut fields = Fields::new();
    fields.insert(CREATED_AT.to_string(), now.clone());
    fields.insert(UPDATED_AT.to_string(), now);
    fields.insert(SCHEMA_VERSION.to_string(), Value::Int(schema.version()));
    fields
}
