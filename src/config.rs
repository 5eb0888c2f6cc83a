// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Store layout: where the central store lives and which connection string
//! backs each shard.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use once_cell::sync::Lazy;

use crate::error::{LedgerError, Result};
use crate::models::ShardId;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Shardbook", "shardbook"));

pub const DEFAULT_SHARD_COUNT: u32 = 3;
pub const IN_MEMORY: &str = ":memory:";

pub const ENV_CENTRAL_DB: &str = "SHARDBOOK_CENTRAL_DB";
pub const ENV_SHARD_COUNT: &str = "SHARDBOOK_SHARD_COUNT";

pub fn shard_env_key(shard: ShardId) -> String {
    format!("SHARDBOOK_SHARD_{}_DB", shard.0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Connection string of the central identity store.
    pub central: String,
    /// Connection string per shard. May hold more entries than `shard_count`
    /// when retired shards still host tenants.
    pub shards: BTreeMap<ShardId, String>,
    /// Number of shards new tenants are spread across (`0..shard_count`).
    pub shard_count: u32,
}

impl LedgerConfig {
    /// Reads the layout from the process environment, defaulting unset paths
    /// to files under the platform data directory.
    pub fn from_env() -> Result<Self> {
        let dir = data_dir()?;
        Self::from_lookup(|key| std::env::var(key).ok(), &dir)
    }

    pub fn from_lookup<F>(lookup: F, data_dir: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let shard_count = match lookup(ENV_SHARD_COUNT) {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                LedgerError::Config(format!("{} must be a positive integer, got '{}'", ENV_SHARD_COUNT, raw))
            })?,
            None => DEFAULT_SHARD_COUNT,
        };
        let central = lookup(ENV_CENTRAL_DB)
            .unwrap_or_else(|| data_dir.join("central.sqlite").display().to_string());
        let shards = (0..shard_count)
            .map(ShardId)
            .map(|id| {
                let conn_str = lookup(&shard_env_key(id)).unwrap_or_else(|| {
                    data_dir
                        .join(format!("shard_{}.sqlite", id.0))
                        .display()
                        .to_string()
                });
                (id, conn_str)
            })
            .collect();
        let cfg = Self {
            central,
            shards,
            shard_count,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Every store in memory. Each cached handle is its own database.
    pub fn in_memory(shard_count: u32) -> Self {
        Self {
            central: IN_MEMORY.to_string(),
            shards: (0..shard_count)
                .map(|n| (ShardId(n), IN_MEMORY.to_string()))
                .collect(),
            shard_count,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(LedgerError::Config(
                "shard count must be at least 1".to_string(),
            ));
        }
        if self.central.trim().is_empty() {
            return Err(LedgerError::Config(
                "central store connection string is empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn data_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2).ok_or_else(|| {
        LedgerError::Config("could not determine platform-specific data dir".to_string())
    })?;
    let dir = proj.data_dir();
    fs::create_dir_all(dir).map_err(|e| {
        LedgerError::Config(format!("failed to create data dir {}: {}", dir.display(), e))
    })?;
    Ok(dir.to_path_buf())
}
