// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Process-wide registry of shard handles.
//!
//! A handle is opened the first time its shard is asked for and then kept
//! until the registry is dropped. Callers share handles; nobody holds one
//! exclusively beyond a single operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::config::LedgerConfig;
use crate::db::{self, DbHandle};
use crate::error::{LedgerError, Result};
use crate::models::ShardId;

type Slot = Arc<OnceCell<DbHandle>>;

pub struct ShardPool {
    connection_strings: BTreeMap<ShardId, String>,
    /// One slot per shard asked for so far. The map lock only guards slot
    /// lookup; opening happens inside the slot.
    slots: Mutex<HashMap<ShardId, Slot>>,
}

impl ShardPool {
    pub fn new(connection_strings: BTreeMap<ShardId, String>) -> Self {
        Self {
            connection_strings,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.shards.clone())
    }

    fn slots(&self) -> Result<MutexGuard<'_, HashMap<ShardId, Slot>>> {
        self.slots
            .lock()
            .map_err(|_| LedgerError::Poisoned("shard registry".to_string()))
    }

    /// Returns the cached handle for `shard`, opening it on first use.
    ///
    /// Concurrent first use of one shard opens it once; the others wait on
    /// that shard's slot only.
    pub fn connection_for(&self, shard: ShardId) -> Result<DbHandle> {
        let conn_str = self.connection_strings.get(&shard).ok_or_else(|| {
            LedgerError::Config(format!("no connection string registered for {}", shard))
        })?;
        let slot = self.slots()?.entry(shard).or_default().clone();
        let handle = slot.get_or_try_init(|| {
            let handle = db::open_shard(shard.to_string(), conn_str)?;
            debug!(shard = handle.label(), readers = handle.reader_count(), "initialized shard handle");
            Ok::<_, LedgerError>(handle)
        })?;
        Ok(handle.clone())
    }

    pub fn is_registered(&self, shard: ShardId) -> bool {
        self.connection_strings.contains_key(&shard)
    }

    pub fn registered_shards(&self) -> impl Iterator<Item = ShardId> + '_ {
        self.connection_strings.keys().copied()
    }

    /// Number of handles opened so far.
    pub fn open_handles(&self) -> Result<usize> {
        Ok(self.slots()?.values().filter(|slot| slot.get().is_some()).count())
    }
}
