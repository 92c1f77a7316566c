//! In-memory store implementation
//!
//! [`InMemoryStore`] is a complete store client that keeps documents in a
//! map. It behaves like a remote transactional store where it matters to the
//! document layer:
//!
//! - reads inside a transaction record the version they saw, and the commit
//!   fails with [`StoreError::Conflict`] if any of those documents changed;
//! - queries record their hits, and the commit fails the same way if the
//!   query would now match a different set of documents;
//! - writes are buffered and applied all at once on commit, or not at all;
//! - `ServerTimestamp` sentinels become the store clock's time at commit, and
//!   `Deleted` sentinels remove fields;
//! - conflicting attempts are re-run up to the caller's attempt bound, with
//!   exponential backoff between attempts.
//!
//! Every operation is appended to a log that tests can inspect.

use std::collections::{BTreeMap, HashMap};
#[cfg(any(test, feature = "testing"))]
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    Query, SetOptions, Snapshot, Store, StoreError, StoreTransaction, TransactionBody,
    TransactionOptions,
};
use crate::Result;
use crate::clock::{Clock, SystemClock};
use crate::path::{CollectionPath, DocumentPath};
use crate::value::{Fields, Timestamp, merge_fields};

const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// One entry of the [`InMemoryStore`] operation log.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOperation {
    Get {
        path: DocumentPath,
        in_transaction: bool,
    },
    Query {
        collection: CollectionPath,
        hits: usize,
    },
    Create {
        path: DocumentPath,
        data: Fields,
    },
    Set {
        path: DocumentPath,
        data: Fields,
        merge: bool,
    },
    Delete {
        path: DocumentPath,
    },
    Commit {
        attempt: u32,
        writes: usize,
    },
    Rollback {
        attempt: u32,
    },
}

impl StoreOperation {
    /// True for buffered writes (create, set, delete)
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StoreOperation::Create { .. } | StoreOperation::Set { .. } | StoreOperation::Delete { .. }
        )
    }

    /// True for document reads and queries
    pub fn is_read(&self) -> bool {
        matches!(self, StoreOperation::Get { .. } | StoreOperation::Query { .. })
    }

    /// The document this operation touched, if it targets a single document.
    pub fn path(&self) -> Option<&DocumentPath> {
        match self {
            StoreOperation::Get { path, .. }
            | StoreOperation::Create { path, .. }
            | StoreOperation::Set { path, .. }
            | StoreOperation::Delete { path } => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Fields,
    version: u64,
}

#[derive(Debug)]
enum Write {
    Create { path: DocumentPath, data: Fields },
    Set { path: DocumentPath, data: Fields, merge: bool },
    Delete { path: DocumentPath },
}

#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
struct Faults {
    conflicts: u32,
    failures: VecDeque<StoreError>,
    read_failures: VecDeque<StoreError>,
}

/// A store client that keeps every document in process memory.
#[derive(Debug)]
pub struct InMemoryStore {
    documents: RwLock<BTreeMap<DocumentPath, StoredDocument>>,
    next_version: AtomicU64,
    operations: Mutex<Vec<StoreOperation>>,
    clock: Arc<dyn Clock>,
    retry_backoff: Duration,
    #[cfg(any(test, feature = "testing"))]
    faults: Mutex<Faults>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store stamping writes with the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store that resolves server timestamps with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            next_version: AtomicU64::new(1),
            operations: Mutex::new(Vec::new()),
            clock,
            retry_backoff: Duration::from_millis(5),
            #[cfg(any(test, feature = "testing"))]
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Sets the delay before the first retry. Later retries double it, up to one second.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Writes a document directly, outside any transaction and unlogged.
    ///
    /// Bumps the document's version, so open transactions that read it will
    /// conflict on commit.
    pub fn insert(&self, path: DocumentPath, data: Fields) {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        self.documents
            .write()
            .unwrap()
            .insert(path, StoredDocument { data, version });
    }

    /// Returns the stored data of a document, without logging a read.
    pub fn document(&self, path: &DocumentPath) -> Option<Fields> {
        self.documents
            .read()
            .unwrap()
            .get(path)
            .map(|d| d.data.clone())
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All operations issued against this store, oldest first.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.operations.lock().unwrap().clone()
    }

    /// The buffered writes issued against this store, oldest first.
    pub fn writes(&self) -> Vec<StoreOperation> {
        self.operations()
            .into_iter()
            .filter(StoreOperation::is_write)
            .collect()
    }

    pub fn clear_operations(&self) {
        self.operations.lock().unwrap().clear();
    }

    /// Makes the next `count` commits fail with a retryable conflict.
    #[cfg(any(test, feature = "testing"))]
    pub fn inject_conflicts(&self, count: u32) {
        self.faults.lock().unwrap().conflicts += count;
    }

    /// Makes the next commit fail with `error` (queued after injected conflicts).
    #[cfg(any(test, feature = "testing"))]
    pub fn inject_failure(&self, error: StoreError) {
        self.faults.lock().unwrap().failures.push_back(error);
    }

    /// Makes the next read inside a transaction (`get` or `query`) fail with `error`.
    #[cfg(any(test, feature = "testing"))]
    pub fn inject_read_failure(&self, error: StoreError) {
        self.faults.lock().unwrap().read_failures.push_back(error);
    }

    #[cfg(any(test, feature = "testing"))]
    fn take_read_fault(&self) -> Option<StoreError> {
        self.faults.lock().unwrap().read_failures.pop_front()
    }

    #[cfg(any(test, feature = "testing"))]
    fn take_fault(&self, path: &str) -> Option<StoreError> {
        let mut faults = self.faults.lock().unwrap();
        if faults.conflicts > 0 {
            faults.conflicts -= 1;
            return Some(StoreError::Conflict {
                path: path.to_string(),
            });
        }
        faults.failures.pop_front()
    }

    fn record(&self, operation: StoreOperation) {
        tracing::trace!(?operation, "store operation");
        self.operations.lock().unwrap().push(operation);
    }

    fn read(&self, path: &DocumentPath) -> (Snapshot, Option<u64>) {
        match self.documents.read().unwrap().get(path) {
            Some(doc) => (
                Snapshot::found(path.clone(), doc.data.clone()),
                Some(doc.version),
            ),
            None => (Snapshot::missing(path.clone()), None),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.retry_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Checks the read set and applies the buffered writes atomically.
    fn commit(&self, tx: InMemoryTransaction<'_>) -> Result<()> {
        let InMemoryTransaction {
            attempt,
            reads,
            queries,
            writes,
            ..
        } = tx;
        let mut documents = self.documents.write().unwrap();

        for (query, seen) in &queries {
            let unchanged = matching(&documents, query)
                .map(|(path, _)| path)
                .eq(seen.iter());
            if !unchanged {
                drop(documents);
                self.record(StoreOperation::Rollback { attempt });
                return Err(StoreError::Conflict {
                    path: query.collection().to_string(),
                }
                .into());
            }
        }

        for (path, seen) in &reads {
            let current = documents.get(path).map(|d| d.version);
            if current != *seen {
                drop(documents);
                self.record(StoreOperation::Rollback { attempt });
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                }
                .into());
            }
        }

        #[cfg(any(test, feature = "testing"))]
        {
            let target = writes
                .first()
                .map(|w| w.path().to_string())
                .unwrap_or_default();
            if let Some(err) = self.take_fault(&target) {
                drop(documents);
                self.record(StoreOperation::Rollback { attempt });
                return Err(err.into());
            }
        }

        let now = self.clock.now_timestamp();
        let mut staged: BTreeMap<DocumentPath, Option<Fields>> = BTreeMap::new();
        for write in &writes {
            let current = staged
                .get(write.path())
                .cloned()
                .unwrap_or_else(|| documents.get(write.path()).map(|d| d.data.clone()));
            match write {
                Write::Create { path, data } => {
                    if current.is_some() {
                        drop(documents);
                        self.record(StoreOperation::Rollback { attempt });
                        return Err(StoreError::AlreadyExists {
                            path: path.to_string(),
                        }
                        .into());
                    }
                    staged.insert(path.clone(), Some(apply(Fields::new(), data, now)));
                }
                Write::Set { path, data, merge } => {
                    let base = if *merge {
                        current.unwrap_or_default()
                    } else {
                        Fields::new()
                    };
                    staged.insert(path.clone(), Some(apply(base, data, now)));
                }
                Write::Delete { path } => {
                    staged.insert(path.clone(), None);
                }
            }
        }

        for (path, data) in staged {
            match data {
                Some(data) => {
                    let version = self.next_version.fetch_add(1, Ordering::SeqCst);
                    documents.insert(path, StoredDocument { data, version });
                }
                None => {
                    documents.remove(&path);
                }
            }
        }
        drop(documents);

        self.record(StoreOperation::Commit {
            attempt,
            writes: writes.len(),
        });
        Ok(())
    }
}

/// Documents of `query`'s collection that match it, up to its limit.
fn matching<'d>(
    documents: &'d BTreeMap<DocumentPath, StoredDocument>,
    query: &'d Query,
) -> impl Iterator<Item = (&'d DocumentPath, &'d StoredDocument)> {
    documents
        .iter()
        .filter(|(path, doc)| path.collection() == query.collection() && query.matches(&doc.data))
        .take(query.max_results().unwrap_or(usize::MAX))
}

/// Resolves sentinels in `data` and merges it onto `base`.
fn apply(mut base: Fields, data: &Fields, now: Timestamp) -> Fields {
    let mut data = data.clone();
    data.values_mut()
        .for_each(|v| v.resolve_server_timestamps(now));
    merge_fields(&mut base, &data);
    base
}

impl Write {
    fn path(&self) -> &DocumentPath {
        match self {
            Write::Create { path, .. } | Write::Set { path, .. } | Write::Delete { path } => path,
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn run_transaction(
        &self,
        body: &mut dyn TransactionBody,
        options: TransactionOptions,
    ) -> Result<()> {
        let max_attempts = options.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut tx = InMemoryTransaction::new(self, attempt);
            let outcome = match body.attempt(&mut tx).await {
                Ok(()) => self.commit(tx),
                Err(err) => {
                    self.record(StoreOperation::Rollback { attempt });
                    Err(err)
                }
            };

            match outcome {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "Transaction attempt failed, retrying"
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get(&self, path: &DocumentPath) -> Result<Snapshot> {
        let (snapshot, _) = self.read(path);
        self.record(StoreOperation::Get {
            path: path.clone(),
            in_transaction: false,
        });
        Ok(snapshot)
    }
}

struct InMemoryTransaction<'a> {
    store: &'a InMemoryStore,
    attempt: u32,
    /// Version seen by the first read of each document; `None` if it did not exist
    reads: HashMap<DocumentPath, Option<u64>>,
    /// Queries run, with the documents they matched
    queries: Vec<(Query, Vec<DocumentPath>)>,
    writes: Vec<Write>,
}

impl<'a> InMemoryTransaction<'a> {
    fn new(store: &'a InMemoryStore, attempt: u32) -> Self {
        Self {
            store,
            attempt,
            reads: HashMap::new(),
            queries: Vec::new(),
            writes: Vec::new(),
        }
    }
}

#[async_trait]
impl<'a> StoreTransaction for InMemoryTransaction<'a> {
    async fn get(&mut self, path: &DocumentPath) -> Result<Snapshot> {
        #[cfg(any(test, feature = "testing"))]
        {
            if let Some(err) = self.store.take_read_fault() {
                return Err(err.into());
            }
        }
        let (snapshot, version) = self.store.read(path);
        self.reads.entry(path.clone()).or_insert(version);
        self.store.record(StoreOperation::Get {
            path: path.clone(),
            in_transaction: true,
        });
        Ok(snapshot)
    }

    async fn query(&mut self, query: &Query) -> Result<Vec<Snapshot>> {
        #[cfg(any(test, feature = "testing"))]
        {
            if let Some(err) = self.store.take_read_fault() {
                return Err(err.into());
            }
        }
        let hits: Vec<(Snapshot, u64)> = {
            let documents = self.store.documents.read().unwrap();
            matching(&documents, query)
                .map(|(path, doc)| (Snapshot::found(path.clone(), doc.data.clone()), doc.version))
                .collect()
        };
        for (snapshot, version) in &hits {
            self.reads
                .entry(snapshot.path().clone())
                .or_insert(Some(*version));
        }
        self.queries.push((
            query.clone(),
            hits.iter().map(|(snapshot, _)| snapshot.path().clone()).collect(),
        ));
        self.store.record(StoreOperation::Query {
            collection: query.collection().clone(),
            hits: hits.len(),
        });
        Ok(hits.into_iter().map(|(snapshot, _)| snapshot).collect())
    }

    fn create(&mut self, path: &DocumentPath, data: Fields) -> Result<()> {
        self.store.record(StoreOperation::Create {
            path: path.clone(),
            data: data.clone(),
        });
        self.writes.push(Write::Create {
            path: path.clone(),
            data,
        });
        Ok(())
    }

    fn set(&mut self, path: &DocumentPath, data: Fields, options: SetOptions) -> Result<()> {
        self.store.record(StoreOperation::Set {
            path: path.clone(),
            data: data.clone(),
            merge: options.merge,
        });
        self.writes.push(Write::Set {
            path: path.clone(),
            data,
            merge: options.merge,
        });
        Ok(())
    }

    fn delete(&mut self, path: &DocumentPath) -> Result<()> {
        self.store.record(StoreOperation::Delete { path: path.clone() });
        self.writes.push(Write::Delete { path: path.clone() });
        Ok(())
    }
}
