// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::config::IN_MEMORY;
use crate::error::{LedgerError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Read connections opened next to the writer of a file-backed shard.
pub const READ_POOL_SIZE: usize = 4;

/// Shared SQLite handle: one writer connection plus a pool of read-only
/// connections. Cloning shares the same connections.
///
/// In-memory stores have no readers; reads then go through the writer,
/// since a second `:memory:` connection would be a different database.
#[derive(Clone)]
pub struct DbHandle {
    label: Arc<str>,
    writer: Arc<Mutex<Connection>>,
    readers: Arc<Vec<Mutex<Connection>>>,
    read_cursor: Arc<AtomicUsize>,
}

impl DbHandle {
    pub fn new(label: impl Into<Arc<str>>, conn: Connection) -> Self {
        Self::with_readers(label, conn, Vec::new())
    }

    pub fn with_readers(
        label: impl Into<Arc<str>>,
        writer: Connection,
        readers: Vec<Connection>,
    ) -> Self {
        Self {
            label: label.into(),
            writer: Arc::new(Mutex::new(writer)),
            readers: Arc::new(readers.into_iter().map(Mutex::new).collect()),
            read_cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    fn poisoned(&self) -> LedgerError {
        LedgerError::Poisoned(self.label.to_string())
    }

    /// Locks the writer connection. Every mutation goes through here.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer.lock().map_err(|_| self.poisoned())
    }

    /// Checks out a read connection. Takes the first idle reader, otherwise
    /// waits on the next one in rotation. Never waits on the writer unless
    /// the handle has no readers.
    pub fn read(&self) -> Result<MutexGuard<'_, Connection>> {
        if self.readers.is_empty() {
            return self.lock();
        }
        for reader in self.readers.iter() {
            match reader.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => return Err(self.poisoned()),
            }
        }
        let i = self.read_cursor.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        self.readers[i].lock().map_err(|_| self.poisoned())
    }

    pub fn same_as(&self, other: &DbHandle) -> bool {
        Arc::ptr_eq(&self.writer, &other.writer)
    }
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHandle")
            .field("label", &self.label)
            .field("readers", &self.readers.len())
            .finish()
    }
}

/// Opens a connection string (an SQLite path or `:memory:`).
pub fn open(conn_str: &str) -> Result<Connection> {
    let conn = if conn_str == IN_MEMORY {
        Connection::open_in_memory()?
    } else {
        Connection::open(conn_str)?
    };
    conn.busy_timeout(BUSY_TIMEOUT)?;
    debug!(target: "shardbook::db", conn_str, "opened connection");
    Ok(conn)
}

/// Opens a shard store: the writer first (WAL mode, schema applied), then
/// the read pool. `:memory:` shards get the writer only.
pub fn open_shard(label: impl Into<Arc<str>>, conn_str: &str) -> Result<DbHandle> {
    let writer = open(conn_str)?;
    if conn_str == IN_MEMORY {
        init_shard_schema(&writer)?;
        return Ok(DbHandle::new(label, writer));
    }
    writer.execute_batch("PRAGMA journal_mode = WAL;")?;
    init_shard_schema(&writer)?;
    let mut readers = Vec::with_capacity(READ_POOL_SIZE);
    for _ in 0..READ_POOL_SIZE {
        let reader = open(conn_str)?;
        reader.execute_batch("PRAGMA query_only = ON;")?;
        readers.push(reader);
    }
    Ok(DbHandle::with_readers(label, writer, readers))
}

pub fn open_central(conn_str: &str) -> Result<DbHandle> {
    let conn = open(conn_str)?;
    init_central_schema(&conn)?;
    Ok(DbHandle::new("central", conn))
}

pub fn init_central_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS tenants(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        credential_hash TEXT NOT NULL,
        shard_id INTEGER NOT NULL,
        verified_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS verification_tokens(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL,
        token TEXT NOT NULL UNIQUE,
        code TEXT NOT NULL,
        expires_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_verification_tokens_email ON verification_tokens(email);
    "#,
    )?;
    Ok(())
}

pub fn init_shard_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('asset','liability')),
        parent_id INTEGER REFERENCES accounts(id),
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(user_id, name)
    );
    CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('income','expense')),
        parent_id INTEGER REFERENCES categories(id),
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(user_id, name)
    );
    CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        amount INTEGER NOT NULL CHECK(amount >= 0),
        date TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('income','expense','transfer')),
        account_id INTEGER NOT NULL REFERENCES accounts(id),
        to_account_id INTEGER REFERENCES accounts(id),
        category_id INTEGER REFERENCES categories(id),
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
    CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_to_account ON transactions(to_account_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);
    "#,
    )?;
    Ok(())
}
