//! SQLite-backed key-value store.
//!
//! Every durable record (preferences, daily stats, session history, the
//! running-timer snapshot) lives under one key in the `kv` table. The whole
//! table is loaded into memory when the store opens; reads are served from
//! that cache and writes update it immediately, then travel to a dedicated
//! writer thread that owns the SQLite connection. Callers never wait on a
//! write except through [`Store::flush`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::{mpsc, Mutex, RwLock};
use std::thread::JoinHandle;

use chrono::Utc;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, Result};

enum WriteOp {
    Set { key: String, value: String },
    Remove { key: String },
    Flush(mpsc::Sender<()>),
}

struct Writer {
    tx: Mutex<Option<mpsc::Sender<WriteOp>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Durable key-value store with an in-memory read cache.
pub struct Store {
    cache: RwLock<HashMap<String, String>>,
    writer: Option<Writer>,
}

impl Store {
    /// Open the store at `<data_dir>/pomokeep.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened
    /// or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("pomokeep.db");
        Self::open_path(&path)
    }

    /// Open (creating if needed) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened, migrated or read.
    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let cache = load_all(&conn).map_err(DatabaseError::from)?;
        tracing::debug!(path = %path.display(), keys = cache.len(), "store opened");

        let (tx, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("pomokeep-store".into())
            .spawn(move || run_writer(conn, rx))?;

        Ok(Self {
            cache: RwLock::new(cache),
            writer: Some(Writer {
                tx: Mutex::new(Some(tx)),
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// A store that lives only in memory (for tests and dry runs).
    pub fn open_memory() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            writer: None,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        let raw = self.get_string(key)?;
        match raw.trim().parse::<i64>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, value = %raw, "ignoring non-integer value: {e}");
                None
            }
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let raw = self.get_string(key)?;
        match raw.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            other => {
                tracing::warn!(key, value = other, "ignoring non-boolean value");
                None
            }
        }
    }

    /// Decode a JSON value. Malformed JSON reads as absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_string(key)?;
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, "discarding malformed JSON: {e}");
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    // ── Writes ───────────────────────────────────────────────────────

    pub fn set_string(&self, key: &str, value: &str) {
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        self.enqueue(WriteOp::Set {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn set_int(&self, key: &str, value: i64) {
        self.set_string(key, &value.to_string());
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        self.set_string(key, if value { "true" } else { "false" });
    }

    /// Encode `value` as JSON and store it.
    ///
    /// # Errors
    /// Returns an error only if `value` cannot be serialized.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.set_string(key, &json);
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        let existed = self
            .cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some();
        if existed {
            self.enqueue(WriteOp::Remove {
                key: key.to_string(),
            });
        }
    }

    /// Block until every write queued so far has reached the database.
    ///
    /// # Errors
    /// Returns an error if the writer thread is no longer running.
    pub fn flush(&self) -> Result<()> {
        let Some(writer) = &self.writer else {
            return Ok(());
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        {
            let guard = writer.tx.lock().unwrap_or_else(|e| e.into_inner());
            let tx = guard
                .as_ref()
                .ok_or(CoreError::Database(DatabaseError::WriterClosed))?;
            tx.send(WriteOp::Flush(ack_tx))
                .map_err(|_| DatabaseError::WriterClosed)?;
        }
        ack_rx.recv().map_err(|_| DatabaseError::WriterClosed)?;
        Ok(())
    }

    fn enqueue(&self, op: WriteOp) {
        let Some(writer) = &self.writer else {
            return;
        };
        let guard = writer.tx.lock().unwrap_or_else(|e| e.into_inner());
        let sent = guard.as_ref().map(|tx| tx.send(op).is_ok()).unwrap_or(false);
        if !sent {
            tracing::warn!("store writer is gone; write kept in memory only");
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Some(writer) = &self.writer {
            // Closing the channel lets the writer drain and exit.
            writer.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
            let handle = writer
                .handle
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    tracing::warn!("store writer panicked during shutdown");
                }
            }
        }
    }
}

fn load_all(conn: &Connection) -> rusqlite::Result<HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, value FROM kv")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let map = rows.collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(map)
}

fn run_writer(conn: Connection, rx: mpsc::Receiver<WriteOp>) {
    for op in rx {
        let result = match op {
            WriteOp::Set { key, value } => conn
                .execute(
                    "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                    params![key, value, Utc::now().to_rfc3339()],
                )
                .map(|_| ()),
            WriteOp::Remove { key } => conn
                .execute("DELETE FROM kv WHERE key = ?1", params![key])
                .map(|_| ()),
            WriteOp::Flush(ack) => {
                let _ = ack.send(());
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!("store write failed: {}", DatabaseError::from(e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_read_back_setters() {
        let store = Store::open_memory();
        store.set_int("n", 42);
        store.set_bool("b", true);
        store.set_string("s", "hello");
        assert_eq!(store.get_int("n"), Some(42));
        assert_eq!(store.get_bool("b"), Some(true));
        assert_eq!(store.get_string("s").as_deref(), Some("hello"));
        assert_eq!(store.get_int("missing"), None);
    }

    #[test]
    fn wrongly_typed_values_read_as_absent() {
        let store = Store::open_memory();
        store.set_string("n", "twenty");
        store.set_string("b", "maybe");
        assert_eq!(store.get_int("n"), None);
        assert_eq!(store.get_bool("b"), None);
    }

    #[test]
    fn malformed_json_reads_as_absent() {
        let store = Store::open_memory();
        store.set_string("map", "{not json");
        assert!(store.get_json::<HashMap<String, u64>>("map").is_none());
    }

    #[test]
    fn remove_forgets_key() {
        let store = Store::open_memory();
        store.set_int("n", 1);
        store.remove("n");
        assert!(!store.contains("n"));
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        {
            let store = Store::open_path(&path).unwrap();
            store.set_int("timer_duration", 50);
            store.set_json("list", &vec![1, 2, 3]).unwrap();
            store.set_string("gone", "x");
            store.remove("gone");
            store.flush().unwrap();
        }
        let store = Store::open_path(&path).unwrap();
        assert_eq!(store.get_int("timer_duration"), Some(50));
        assert_eq!(store.get_json::<Vec<i32>>("list"), Some(vec![1, 2, 3]));
        assert!(!store.contains("gone"));
    }

    #[test]
    fn drop_drains_pending_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        {
            let store = Store::open_path(&path).unwrap();
            for i in 0..50 {
                store.set_int("counter", i);
            }
        }
        let store = Store::open_path(&path).unwrap();
        assert_eq!(store.get_int("counter"), Some(49));
    }
}
