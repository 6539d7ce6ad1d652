use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::{fs, sync::Mutex, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::logic::{self, DateRange};
use crate::models::{Db, Event, EventPatch, NewEvent};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event {0} not found")]
    NotFound(Uuid),

    #[error("merged event would end before it starts")]
    InvalidRange,

    #[error("storage io error: {0}")]
    Io(#[from] io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Event collection.
///
/// Each mutation is a single atomic document operation. Concurrent updates
/// to the same id are last-write-wins.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events, or those overlapping `range`, ordered by start time.
    async fn list(&self, range: Option<DateRange>) -> StoreResult<Vec<Event>>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Event>;

    /// Assigns the id and both timestamps.
    async fn create(&self, draft: NewEvent) -> StoreResult<Event>;

    /// Merge-and-replace; refreshes `updatedAt`.
    async fn update(&self, id: Uuid, patch: EventPatch) -> StoreResult<Event>;

    /// Hard delete. Returns the removed record.
    async fn delete(&self, id: Uuid) -> StoreResult<Event>;
}

// Shared document operations over an index-ordered collection

fn create_in(db: &mut Db, draft: NewEvent) -> Event {
    let event = Event::from_new(draft, Uuid::new_v4(), Utc::now());
    logic::insert_indexed(&mut db.events, event.clone());
    event
}

fn update_in(db: &mut Db, id: Uuid, patch: EventPatch) -> StoreResult<Event> {
    let pos = db
        .events
        .iter()
        .position(|e| e.id == id)
        .ok_or(StoreError::NotFound(id))?;

    let mut event = db.events[pos].clone();
    if !event.apply(patch, Utc::now()) {
        return Err(StoreError::InvalidRange);
    }

    // Times may have moved, so re-seat it in the index
    db.events.remove(pos);
    logic::insert_indexed(&mut db.events, event.clone());
    Ok(event)
}

fn delete_in(db: &mut Db, id: Uuid) -> StoreResult<Event> {
    let pos = db
        .events
        .iter()
        .position(|e| e.id == id)
        .ok_or(StoreError::NotFound(id))?;
    Ok(db.events.remove(pos))
}

fn find_in(db: &Db, id: Uuid) -> StoreResult<Event> {
    db.events
        .iter()
        .find(|e| e.id == id)
        .cloned()
        .ok_or(StoreError::NotFound(id))
}

// -----------------------------
// JSON file
// -----------------------------

/// Whole collection in one JSON file, reloaded on every operation.
pub struct JsonFileStore {
    path: PathBuf,
    // serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_db(&self) -> StoreResult<Db> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no data file yet, starting empty");
                return Ok(Db::default());
            }
            Err(e) => return Err(e.into()),
        };
        let mut db: Db = serde_json::from_str(&text)?;
        // files edited by hand may be out of index order
        db.events.sort_by_key(logic::index_key);
        Ok(db)
    }

    async fn save_db(&self, db: &Db) -> StoreResult<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(db)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&tmp_path, text).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for JsonFileStore {
    async fn list(&self, range: Option<DateRange>) -> StoreResult<Vec<Event>> {
        let db = self.load_db().await?;
        Ok(logic::select(&db.events, range.as_ref()))
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Event> {
        let db = self.load_db().await?;
        find_in(&db, id)
    }

    async fn create(&self, draft: NewEvent) -> StoreResult<Event> {
        let _guard = self.lock.lock().await;
        let mut db = self.load_db().await?;
        let event = create_in(&mut db, draft);
        self.save_db(&db).await?;
        info!(id = %event.id, kind = %event.kind.event_type(), "event created");
        Ok(event)
    }

    async fn update(&self, id: Uuid, patch: EventPatch) -> StoreResult<Event> {
        let _guard = self.lock.lock().await;
        let mut db = self.load_db().await?;
        let event = update_in(&mut db, id, patch)?;
        self.save_db(&db).await?;
        info!(%id, "event updated");
        Ok(event)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Event> {
        let _guard = self.lock.lock().await;
        let mut db = self.load_db().await?;
        let event = delete_in(&mut db, id)?;
        self.save_db(&db).await?;
        info!(%id, "event deleted");
        Ok(event)
    }
}

// -----------------------------
// In-process
// -----------------------------

/// Collection that lives only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    db: RwLock<Db>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list(&self, range: Option<DateRange>) -> StoreResult<Vec<Event>> {
        let db = self.db.read().await;
        Ok(logic::select(&db.events, range.as_ref()))
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Event> {
        find_in(&*self.db.read().await, id)
    }

    async fn create(&self, draft: NewEvent) -> StoreResult<Event> {
        let event = create_in(&mut *self.db.write().await, draft);
        info!(id = %event.id, kind = %event.kind.event_type(), "event created");
        Ok(event)
    }

    async fn update(&self, id: Uuid, patch: EventPatch) -> StoreResult<Event> {
        let event = update_in(&mut *self.db.write().await, id, patch)?;
        info!(%id, "event updated");
        Ok(event)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Event> {
        let event = delete_in(&mut *self.db.write().await, id)?;
        info!(%id, "event deleted");
        Ok(event)
    }
}
