// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::Arc;

use crate::config::LedgerConfig;
use crate::db;
use crate::directory::ShardDirectory;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::models::{ShardId, TenantId};
use crate::pool::ShardPool;

/// What the session layer knows about the caller. `shard_id` is absent for
/// stale credentials issued before the shard was recorded in them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub shard_id: Option<ShardId>,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId, shard_id: Option<ShardId>) -> Self {
        Self {
            tenant_id,
            shard_id,
        }
    }
}

/// Routes tenants to the ledger stored on their shard.
#[derive(Clone)]
pub struct ShardRouter {
    directory: Arc<ShardDirectory>,
    pool: Arc<ShardPool>,
    shard_count: u32,
}

impl ShardRouter {
    pub fn new(directory: Arc<ShardDirectory>, pool: Arc<ShardPool>, shard_count: u32) -> Self {
        Self {
            directory,
            pool,
            shard_count,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Result<Self> {
        config.validate()?;
        let central = db::open_central(&config.central)?;
        Ok(Self::new(
            Arc::new(ShardDirectory::new(central)),
            Arc::new(ShardPool::from_config(config)),
            config.shard_count,
        ))
    }

    pub fn directory(&self) -> &ShardDirectory {
        &self.directory
    }

    pub fn pool(&self) -> &ShardPool {
        &self.pool
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Skips the directory when the context already carries the shard.
    pub fn shard_for(&self, ctx: &TenantContext) -> Result<ShardId> {
        match ctx.shard_id {
            Some(shard) => Ok(shard),
            None => self.directory.resolve_shard(ctx.tenant_id),
        }
    }

    pub fn ledger_for(&self, ctx: &TenantContext) -> Result<Ledger> {
        let shard = self.shard_for(ctx)?;
        let handle = self.pool.connection_for(shard)?;
        Ok(Ledger::new(ctx.tenant_id, handle))
    }
}
