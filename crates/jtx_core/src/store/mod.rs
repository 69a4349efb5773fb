//! Asynchronous entity store with live queries.
//!
//! # Responsibility
//! - Own the single SQLite connection of the process.
//! - Run reads and writes on the blocking pool so callers never block.
//! - Re-run observed queries after every committed write.
//!
//! # Invariants
//! - The store revision is bumped only after a write commits, so a caller that
//!   awaited a mutation observes its effect on every later read.
//! - A live query re-emits only when its recomputed value differs.

mod live;

pub use live::LiveData;

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::collection::ICalCollection;
use crate::model::entity::ICalEntity;
use crate::model::ical_object::{ICalObject, ICalObjectId};
use crate::model::property::{Attachment, Category};
use crate::repo::collection_repo::{CollectionRepository, SqliteCollectionRepository};
use crate::repo::ical_repo::{
    ICalObjectRepository, ListQuery, NewEntry, RepoError, RepoResult, SqliteICalRepository,
};
pub(crate) use live::publish_if_changed;
use log::{debug, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Repo(RepoError),
    /// The blocking worker panicked or was cancelled.
    Worker(String),
    /// A previous holder of the connection lock panicked.
    Poisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Worker(message) => write!(f, "store worker failed: {message}"),
            Self::Poisoned => write!(f, "store connection lock is poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Worker(_) | Self::Poisoned => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

struct StoreInner {
    conn: Mutex<Connection>,
    revision: watch::Sender<u64>,
}

/// Cheaply clonable handle to the shared store.
#[derive(Clone)]
pub struct EntityStore {
    inner: Arc<StoreInner>,
}

impl EntityStore {
    /// Wraps a connection that already went through `open_db*`.
    pub fn new(conn: Connection) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                revision,
            }),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Number of committed writes seen by this store.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Runs a read on the blocking pool.
    pub async fn read<T, F>(&self, query: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> RepoResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let joined = tokio::task::spawn_blocking(move || {
            let conn = inner.conn.lock().map_err(|_| StoreError::Poisoned)?;
            query(&*conn).map_err(StoreError::from)
        })
        .await;
        joined.map_err(|err| StoreError::Worker(err.to_string()))?
    }

    /// Runs a write on the blocking pool and notifies observers once it
    /// succeeded.
    pub async fn write<T, F>(&self, op: &'static str, mutation: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> RepoResult<T> + Send + 'static,
    {
        let started_at = Instant::now();
        let result = self.read(mutation).await;
        match &result {
            Ok(_) => {
                self.inner.revision.send_modify(|revision| *revision += 1);
                info!(
                    "event=store_write module=store status=ok op={op} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
            }
            Err(err) => warn!(
                "event=store_write module=store status=error op={op} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    /// Observes a query: the returned value is recomputed after every write.
    pub async fn observe<T, F>(&self, query: F) -> StoreResult<LiveData<T>>
    where
        T: PartialEq + Send + Sync + 'static,
        F: Fn(&Connection) -> RepoResult<T> + Send + Sync + 'static,
    {
        let query = Arc::new(query);
        // Subscribe before the first read so a concurrent write is not missed.
        let mut revisions = self.inner.revision.subscribe();
        let initial = {
            let query = Arc::clone(&query);
            self.read(move |conn| (*query)(conn)).await?
        };
        let (tx, rx) = watch::channel(initial);
        let store = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = revisions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
                let query = Arc::clone(&query);
                match store.read(move |conn| (*query)(conn)).await {
                    Ok(next) => {
                        publish_if_changed(&tx, next);
                    }
                    Err(err) => {
                        warn!("event=live_query module=store status=error error={err}");
                    }
                }
            }
            debug!("event=live_query module=store status=closed");
        });

        Ok(LiveData::from_receiver(rx))
    }

    pub async fn observe_list(&self, query: ListQuery) -> StoreResult<LiveData<Vec<ICalObject>>> {
        self.observe(move |conn| SqliteICalRepository::new(conn).list(&query))
            .await
    }

    pub async fn observe_entity(
        &self,
        id: ICalObjectId,
    ) -> StoreResult<LiveData<Option<ICalEntity>>> {
        self.observe(move |conn| SqliteICalRepository::new(conn).get(id))
            .await
    }

    pub async fn observe_related_notes(
        &self,
        parent_id: ICalObjectId,
    ) -> StoreResult<LiveData<Vec<ICalObject>>> {
        self.observe(move |conn| SqliteICalRepository::new(conn).related_notes(parent_id))
            .await
    }

    pub async fn observe_related_todos(
        &self,
        parent_id: ICalObjectId,
    ) -> StoreResult<LiveData<Vec<ICalObject>>> {
        self.observe(move |conn| SqliteICalRepository::new(conn).related_todos(parent_id))
            .await
    }

    pub async fn observe_categories(&self) -> StoreResult<LiveData<Vec<String>>> {
        self.observe(|conn| SqliteICalRepository::new(conn).all_categories())
            .await
    }

    pub async fn list(&self, query: ListQuery) -> StoreResult<Vec<ICalObject>> {
        self.read(move |conn| SqliteICalRepository::new(conn).list(&query))
            .await
    }

    pub async fn get(&self, id: ICalObjectId) -> StoreResult<Option<ICalEntity>> {
        self.read(move |conn| SqliteICalRepository::new(conn).get(id))
            .await
    }

    pub async fn categories(&self) -> StoreResult<Vec<String>> {
        self.read(|conn| SqliteICalRepository::new(conn).all_categories())
            .await
    }

    pub async fn collections(&self) -> StoreResult<Vec<ICalCollection>> {
        self.read(|conn| SqliteCollectionRepository::new(conn).list_collections())
            .await
    }

    pub async fn collection(&self, collection_id: i64) -> StoreResult<Option<ICalCollection>> {
        self.read(move |conn| SqliteCollectionRepository::new(conn).get_collection(collection_id))
            .await
    }

    pub async fn insert(&self, object: ICalObject) -> StoreResult<ICalObjectId> {
        self.write("insert", move |conn| {
            SqliteICalRepository::new(conn).insert(&object)
        })
        .await
    }

    pub async fn insert_entry(&self, entry: NewEntry) -> StoreResult<ICalObjectId> {
        self.write("insert_entry", move |conn| {
            SqliteICalRepository::new(conn).insert_entry(&entry)
        })
        .await
    }

    pub async fn update(&self, object: ICalObject) -> StoreResult<()> {
        self.write("update", move |conn| {
            SqliteICalRepository::new(conn).update(&object)
        })
        .await
    }

    pub async fn delete(&self, id: ICalObjectId) -> StoreResult<()> {
        self.write("delete", move |conn| SqliteICalRepository::new(conn).delete(id))
            .await
    }

    pub async fn mark_deleted(&self, id: ICalObjectId, now_ms: i64) -> StoreResult<()> {
        self.write("mark_deleted", move |conn| {
            SqliteICalRepository::new(conn).mark_deleted(id, now_ms)
        })
        .await
    }

    pub async fn insert_related_note(
        &self,
        parent_id: ICalObjectId,
        note: ICalObject,
    ) -> StoreResult<ICalObjectId> {
        self.write("insert_related_note", move |conn| {
            SqliteICalRepository::new(conn).insert_related_note(parent_id, &note)
        })
        .await
    }

    /// Sets progress on the stored object, keeping status in step.
    pub async fn update_progress(
        &self,
        id: ICalObjectId,
        percent: i32,
        now_ms: i64,
    ) -> StoreResult<ICalObject> {
        self.write("update_progress", move |conn| {
            let repo = SqliteICalRepository::new(conn);
            let mut object = repo.get_object(id)?.ok_or(RepoError::NotFound(id))?;
            object.set_progress(percent, now_ms);
            repo.update(&object)?;
            Ok(object)
        })
        .await
    }

    pub async fn replace_categories(
        &self,
        id: ICalObjectId,
        categories: Vec<Category>,
    ) -> StoreResult<()> {
        self.write("replace_categories", move |conn| {
            SqliteICalRepository::new(conn).replace_categories(id, &categories)
        })
        .await
    }

    pub async fn add_attachment(&self, id: ICalObjectId, attachment: Attachment) -> StoreResult<i64> {
        self.write("add_attachment", move |conn| {
            SqliteICalRepository::new(conn).add_attachment(id, &attachment)
        })
        .await
    }
}
