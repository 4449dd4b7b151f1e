use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};

const BLOBS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("blobs");

/// The external persistence capability: one opaque string value per string
/// key. Implementations must make `set` durable before returning.
pub trait StringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StringStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// redb-backed store holding every blob in a single `&str -> &str` table.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = if path.exists() {
            Database::open(path)?
        } else {
            Database::create(path)?
        };
        Ok(Self { db: Arc::new(db) })
    }

    pub fn with_db(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl StringStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(BLOBS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let value = match table.get(key)? {
            Some(value) => Some(value.value().to_string()),
            None => None,
        };
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(BLOBS_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Redb(redb::Error),
    Table(TableError),
    Transaction(TransactionError),
    Storage(StorageError),
    Commit(CommitError),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "io error: {}", err),
            StoreError::Redb(err) => write!(f, "redb error: {}", err),
            StoreError::Table(err) => write!(f, "redb table error: {}", err),
            StoreError::Transaction(err) => write!(f, "redb transaction error: {}", err),
            StoreError::Storage(err) => write!(f, "redb storage error: {}", err),
            StoreError::Commit(err) => write!(f, "redb commit error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<redb::Error> for StoreError {
    fn from(err: redb::Error) -> Self {
        StoreError::Redb(err)
    }
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        StoreError::Redb(err.into())
    }
}

impl From<TableError> for StoreError {
    fn from(err: TableError) -> Self {
        StoreError::Table(err)
    }
}

impl From<TransactionError> for StoreError {
    fn from(err: TransactionError) -> Self {
        StoreError::Transaction(err)
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        StoreError::Storage(err)
    }
}

impl From<CommitError> for StoreError {
    fn from(err: CommitError) -> Self {
        StoreError::Commit(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_db_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|value| value.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("compact-library-{}-{}.redb", tag, nanos))
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        assert_eq!(store.get("n").unwrap(), None);
        store.set("n", "Radiohead\nBjörk").unwrap();
        assert_eq!(store.get("n").unwrap().as_deref(), Some("Radiohead\nBjörk"));
        store.set("n", "replaced").unwrap();
        assert_eq!(store.get("n").unwrap().as_deref(), Some("replaced"));
    }

    #[test]
    fn redb_store_round_trips() {
        let path = temp_db_path("roundtrip");
        {
            let store = RedbStore::open(&path).unwrap();
            assert_eq!(store.get("t").unwrap(), None);
            store.set("t", "payload").unwrap();
            assert_eq!(store.get("t").unwrap().as_deref(), Some("payload"));
        }
        // value survives reopening
        {
            let store = RedbStore::open(&path).unwrap();
            assert_eq!(store.get("t").unwrap().as_deref(), Some("payload"));
        }
        let _ = fs::remove_file(&path);
    }
}
