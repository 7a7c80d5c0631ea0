//! Persistent datastore for management-plane aggregates.
//!
//! Aggregates are stored as JSON blobs in SQLite, addressed by `(kind, id)`.
//! All reads and writes go through the [`DataStoreTx`] capability trait,
//! which has two implementations: [`DirectHandle`] (auto-commit) and
//! [`TxHandle`] (one SQLite transaction). Mutation bodies are written against
//! the trait and stay agnostic to which mode is active; [`Store::execute`]
//! selects the mode from the caller-supplied flag.

mod schema;

use async_trait::async_trait;
use futures::future::BoxFuture;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use crate::model::{Endpoint, EndpointId, Registry, RegistryId, Settings, User, UserId};

pub const KIND_SETTINGS: &str = "settings";
pub const KIND_USER: &str = "user";
pub const KIND_REGISTRY: &str = "registry";
pub const KIND_ENDPOINT: &str = "endpoint";

/// Fixed id of the singleton settings aggregate.
pub const SETTINGS_ID: u64 = 1;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object {kind}/{id} not found")]
    NotFound { kind: String, id: u64 },
    #[error("datastore error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt object payload: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ============================================================================
// Capability trait
// ============================================================================

/// Read/write capability shared by the direct and transactional handles.
///
/// Mutation bodies depend only on this trait, never on a concrete handle, so
/// the same body runs unchanged in both executor modes.
#[async_trait]
pub trait DataStoreTx: Send + Sync {
    async fn read_object(&self, kind: &str, id: u64) -> Result<Value, StoreError>;
    async fn read_objects(&self, kind: &str) -> Result<Vec<Value>, StoreError>;
    async fn write_object(&self, kind: &str, id: u64, value: Value) -> Result<(), StoreError>;
}

/// Typed accessors layered over the raw object capability.
#[async_trait]
pub trait DataStoreExt: DataStoreTx {
    async fn settings(&self) -> Result<Settings, StoreError> {
        let value = self.read_object(KIND_SETTINGS, SETTINGS_ID).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn update_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.write_object(KIND_SETTINGS, SETTINGS_ID, serde_json::to_value(settings)?)
            .await
    }

    async fn user(&self, id: UserId) -> Result<User, StoreError> {
        let value = self.read_object(KIND_USER, id).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        for value in self.read_objects(KIND_USER).await? {
            let user: User = serde_json::from_value(value)?;
            if user.username == username {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        self.write_object(KIND_USER, user.id, serde_json::to_value(user)?)
            .await
    }

    async fn registry(&self, id: RegistryId) -> Result<Registry, StoreError> {
        let value = self.read_object(KIND_REGISTRY, id).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn update_registry(&self, registry: &Registry) -> Result<(), StoreError> {
        self.write_object(KIND_REGISTRY, registry.id, serde_json::to_value(registry)?)
            .await
    }

    async fn endpoint(&self, id: EndpointId) -> Result<Endpoint, StoreError> {
        let value = self.read_object(KIND_ENDPOINT, id).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn update_endpoint(&self, endpoint: &Endpoint) -> Result<(), StoreError> {
        self.write_object(KIND_ENDPOINT, endpoint.id, serde_json::to_value(endpoint)?)
            .await
    }
}

#[async_trait]
impl<T: DataStoreTx + ?Sized> DataStoreExt for T {}

// ============================================================================
// Store
// ============================================================================

/// Owns the SQLite database behind the management API.
///
/// Cheaply cloneable; the inner connection is wrapped in `Arc<Mutex<_>>` the
/// same way as any other single-writer SQLite owner in this codebase. The
/// async mutex matters here: a transactional handle holds the lock across
/// the awaits inside a mutation body.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the datastore at `path` and apply migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory datastore for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        schema::run_migrations(&conn)?;
        seed_default_settings(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A non-transactional handle: every call commits on its own.
    pub fn direct(&self) -> DirectHandle {
        DirectHandle {
            conn: Arc::clone(&self.conn),
        }
    }

    /// Run `body` inside one SQLite transaction. Commit when it succeeds,
    /// roll back when it fails; the body's error is re-raised unchanged.
    pub async fn update_tx<T, E, F>(&self, body: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: for<'a> FnOnce(&'a dyn DataStoreTx) -> BoxFuture<'a, Result<T, E>> + Send,
    {
        let guard = Arc::clone(&self.conn).lock_owned().await;
        guard
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| E::from(StoreError::from(e)))?;

        let handle = TxHandle {
            guard: parking_lot::Mutex::new(guard),
        };
        match body(&handle).await {
            Ok(value) => {
                handle.commit().map_err(E::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = handle.rollback() {
                    warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Dual-mode mutation executor. `no_tx` selects a direct handle; the
    /// transactional path otherwise. The flag is threaded in by the caller
    /// (from configuration), never read from a global.
    pub async fn execute<T, E, F>(&self, no_tx: bool, body: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: for<'a> FnOnce(&'a dyn DataStoreTx) -> BoxFuture<'a, Result<T, E>> + Send,
    {
        if no_tx {
            let handle = self.direct();
            body(&handle).await
        } else {
            self.update_tx(body).await
        }
    }
}

fn seed_default_settings(conn: &Connection) -> Result<(), StoreError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT data FROM objects WHERE kind = ?1 AND id = ?2",
            params![KIND_SETTINGS, SETTINGS_ID as i64],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_none() {
        let settings = serde_json::to_string(&Settings::default())?;
        conn.execute(
            "INSERT INTO objects (kind, id, data) VALUES (?1, ?2, ?3)",
            params![KIND_SETTINGS, SETTINGS_ID as i64, settings],
        )?;
    }
    Ok(())
}

// ============================================================================
// Handles
// ============================================================================

/// Auto-commit handle: locks the connection briefly per call.
#[derive(Clone)]
pub struct DirectHandle {
    conn: Arc<Mutex<Connection>>,
}

#[async_trait]
impl DataStoreTx for DirectHandle {
    async fn read_object(&self, kind: &str, id: u64) -> Result<Value, StoreError> {
        let conn = self.conn.lock().await;
        read_row(&conn, kind, id)
    }

    async fn read_objects(&self, kind: &str) -> Result<Vec<Value>, StoreError> {
        let conn = self.conn.lock().await;
        read_rows(&conn, kind)
    }

    async fn write_object(&self, kind: &str, id: u64, value: Value) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        write_row(&conn, kind, id, &value)
    }
}

/// Transactional handle: owns the connection lock for the duration of one
/// `BEGIN IMMEDIATE .. COMMIT/ROLLBACK` window.
///
/// The inner sync mutex exists only to make the handle `Sync` (`Connection`
/// is not); it is never contended, since one mutation body owns the handle.
pub struct TxHandle {
    guard: parking_lot::Mutex<OwnedMutexGuard<Connection>>,
}

impl TxHandle {
    fn commit(self) -> Result<(), StoreError> {
        self.guard.into_inner().execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.guard.into_inner().execute_batch("ROLLBACK")?;
        Ok(())
    }
}

#[async_trait]
impl DataStoreTx for TxHandle {
    async fn read_object(&self, kind: &str, id: u64) -> Result<Value, StoreError> {
        let conn = self.guard.lock();
        read_row(&conn, kind, id)
    }

    async fn read_objects(&self, kind: &str) -> Result<Vec<Value>, StoreError> {
        let conn = self.guard.lock();
        read_rows(&conn, kind)
    }

    async fn write_object(&self, kind: &str, id: u64, value: Value) -> Result<(), StoreError> {
        let conn = self.guard.lock();
        write_row(&conn, kind, id, &value)
    }
}

// ============================================================================
// Row access
// ============================================================================

fn read_row(conn: &Connection, kind: &str, id: u64) -> Result<Value, StoreError> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM objects WHERE kind = ?1 AND id = ?2",
            params![kind, id as i64],
            |row| row.get(0),
        )
        .optional()?;

    match data {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Err(StoreError::NotFound {
            kind: kind.to_string(),
            id,
        }),
    }
}

fn read_rows(conn: &Connection, kind: &str) -> Result<Vec<Value>, StoreError> {
    let mut stmt = conn.prepare("SELECT data FROM objects WHERE kind = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![kind], |row| row.get::<_, String>(0))?;

    let mut values = Vec::new();
    for row in rows {
        values.push(serde_json::from_str(&row?)?);
    }
    Ok(values)
}

fn write_row(conn: &Connection, kind: &str, id: u64, value: &Value) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO objects (kind, id, data) VALUES (?1, ?2, ?3)",
        params![kind, id as i64, value.to_string()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Stand-in for a classified handler error; the executor must pass it
    /// through verbatim.
    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Forbidden,
        Store(String),
    }

    impl From<StoreError> for TestError {
        fn from(err: StoreError) -> Self {
            TestError::Store(err.to_string())
        }
    }

    async fn set_logo(store: &Store, no_tx: bool, logo: &str) -> Result<(), TestError> {
        let logo = logo.to_string();
        store
            .execute(no_tx, move |tx| {
                Box::pin(async move {
                    let mut settings = tx.settings().await?;
                    settings.logo_url = logo;
                    tx.update_settings(&settings).await?;
                    Ok(())
                })
            })
            .await
    }

    #[tokio::test]
    async fn executor_modes_produce_identical_state() {
        let direct_store = Store::open_in_memory().unwrap();
        let tx_store = Store::open_in_memory().unwrap();

        set_logo(&direct_store, true, "https://example.org/logo.png")
            .await
            .unwrap();
        set_logo(&tx_store, false, "https://example.org/logo.png")
            .await
            .unwrap();

        let a = direct_store.direct().settings().await.unwrap();
        let b = tx_store.direct().settings().await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn transactional_abort_rolls_back_writes() {
        let store = Store::open_in_memory().unwrap();
        let before = store.direct().settings().await.unwrap();

        let result: Result<(), TestError> = store
            .execute(false, |tx| {
                Box::pin(async move {
                    let mut settings = tx.settings().await?;
                    settings.logo_url = "https://broken.example".to_string();
                    tx.update_settings(&settings).await?;
                    Err(TestError::Forbidden)
                })
            })
            .await;

        assert_eq!(result, Err(TestError::Forbidden));
        let after = store.direct().settings().await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn direct_mode_keeps_writes_made_before_failure() {
        let store = Store::open_in_memory().unwrap();

        let result: Result<(), TestError> = store
            .execute(true, |tx| {
                Box::pin(async move {
                    let mut settings = tx.settings().await?;
                    settings.logo_url = "https://kept.example".to_string();
                    tx.update_settings(&settings).await?;
                    Err(TestError::Forbidden)
                })
            })
            .await;

        assert_eq!(result, Err(TestError::Forbidden));
        let after = store.direct().settings().await.unwrap();
        assert_eq!(after.logo_url, "https://kept.example");
    }

    #[tokio::test]
    async fn classified_errors_pass_through_unchanged() {
        let store = Store::open_in_memory().unwrap();

        let result: Result<(), TestError> = store
            .execute(false, |_tx| Box::pin(async { Err(TestError::Forbidden) }))
            .await;
        assert_eq!(result, Err(TestError::Forbidden));

        let result: Result<(), TestError> = store
            .execute(true, |_tx| Box::pin(async { Err(TestError::Forbidden) }))
            .await;
        assert_eq!(result, Err(TestError::Forbidden));
    }

    #[tokio::test]
    async fn reopening_a_store_file_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let store = Store::open(&path).unwrap();
            set_logo(&store, true, "https://persisted.example")
                .await
                .unwrap();
        }

        let store = Store::open(&path).unwrap();
        let settings = store.direct().settings().await.unwrap();
        assert_eq!(settings.logo_url, "https://persisted.example");
    }

    #[tokio::test]
    async fn missing_objects_surface_as_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.direct().user(42).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn transaction_reads_its_own_writes() {
        let store = Store::open_in_memory().unwrap();

        let logo: Result<String, TestError> = store
            .execute(false, |tx| {
                Box::pin(async move {
                    let mut settings = tx.settings().await?;
                    settings.logo_url = "https://inside.example".to_string();
                    tx.update_settings(&settings).await?;
                    Ok(tx.settings().await?.logo_url)
                })
            })
            .await;

        assert_eq!(logo.unwrap(), "https://inside.example");
    }
}
