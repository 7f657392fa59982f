use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};

mod memory;
mod schema;

pub use memory::MemoryStore;

pub const NOTES_KEY: &str = "notes";
pub const CATEGORIES_KEY: &str = "categories";
pub const SETTINGS_KEY: &str = "settings";

/// Blob store behind the note state. Values are opaque strings; every write
/// replaces the previous snapshot for that key wholesale.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// SQLite-backed key-value store. Cheap to clone; each call opens its own
/// connection.
#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }
}

impl KeyValueStore for StorageHandle {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("reading key '{key}'"))
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .with_context(|| format!("writing key '{key}'"))?;
            Ok(())
        })
    }
}

/// Open (creating if needed) the database named by `storage.database_path`.
/// `paths` is only the fallback for an unresolved, empty path.
pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), "storage ready");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{ConfigPaths, StorageOptions};
    use tempfile::TempDir;

    pub(crate) fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        let config_dir = base.join("config");
        let data_dir = base.join("data");
        let state_dir = base.join("state");
        ConfigPaths {
            config_dir: config_dir.clone(),
            config_file: config_dir.join("config.toml"),
            data_dir: data_dir.clone(),
            database_path: data_dir.join("notes.db"),
            log_dir: state_dir.join("logs"),
            state_dir,
        }
    }

    pub(crate) fn init_storage() -> anyhow::Result<(TempDir, StorageHandle)> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        let mut opts = StorageOptions::default();
        opts.database_path = paths.database_path.clone();
        let storage = init(&paths, &opts)?;
        Ok((temp, storage))
    }

    #[test]
    fn missing_key_reads_as_none() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        assert_eq!(storage.get(NOTES_KEY)?, None);
        Ok(())
    }

    #[test]
    fn set_overwrites_previous_snapshot() -> anyhow::Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.set(CATEGORIES_KEY, "[]")?;
        storage.set(CATEGORIES_KEY, r#"[{"id":"a","name":"A"}]"#)?;
        assert_eq!(
            storage.get(CATEGORIES_KEY)?.as_deref(),
            Some(r#"[{"id":"a","name":"A"}]"#)
        );
        Ok(())
    }

    #[test]
    fn snapshots_survive_reopening() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        let mut opts = StorageOptions::default();
        opts.database_path = paths.database_path.clone();

        let first = init(&paths, &opts)?;
        first.set(SETTINGS_KEY, r#"{"darkMode":true}"#)?;
        drop(first);

        let second = init(&paths, &opts)?;
        assert_eq!(
            second.get(SETTINGS_KEY)?.as_deref(),
            Some(r#"{"darkMode":true}"#)
        );
        Ok(())
    }

    #[test]
    fn configured_database_path_wins() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        let mut opts = StorageOptions::default();
        opts.database_path = temp.path().join("elsewhere").join("custom.db");

        let storage = init(&paths, &opts)?;
        storage.set(NOTES_KEY, "[]")?;
        assert_eq!(storage.database_path(), opts.database_path.as_path());
        assert!(opts.database_path.exists());
        assert!(!paths.database_path.exists());
        Ok(())
    }

    #[test]
    fn memory_store_can_refuse_writes() {
        let store = MemoryStore::new();
        store.set(NOTES_KEY, "[]").expect("first write");
        store.set_fail_writes(true);
        assert!(store.set(NOTES_KEY, "[1]").is_err());
        assert_eq!(store.snapshot(NOTES_KEY).as_deref(), Some("[]"));
    }
}
