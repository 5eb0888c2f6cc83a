// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Central store: tenant identities and their shard assignment.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::db::DbHandle;
use crate::error::{LedgerError, Result};
use crate::models::{ShardId, Tenant, TenantId};

const TENANT_COLUMNS: &str = "id, email, name, credential_hash, shard_id, verified_at";

pub struct ShardDirectory {
    central: DbHandle,
}

impl ShardDirectory {
    pub fn new(central: DbHandle) -> Self {
        Self { central }
    }

    pub fn central(&self) -> &DbHandle {
        &self.central
    }

    /// Looks up the shard a tenant is pinned to. A missing tenant is a hard
    /// error: the caller must never fall back to guessing a shard.
    pub fn resolve_shard(&self, tenant_id: TenantId) -> Result<ShardId> {
        let conn = self.central.lock()?;
        let shard: Option<ShardId> = conn
            .query_row(
                "SELECT shard_id FROM tenants WHERE id=?1",
                params![tenant_id],
                |r| r.get(0),
            )
            .optional()?;
        let shard = shard.ok_or_else(|| LedgerError::not_found("tenant", tenant_id))?;
        debug!(%tenant_id, %shard, "resolved shard from directory");
        Ok(shard)
    }

    pub fn tenant(&self, tenant_id: TenantId) -> Result<Tenant> {
        let conn = self.central.lock()?;
        tenant_by_id(&conn, tenant_id)?.ok_or_else(|| LedgerError::not_found("tenant", tenant_id))
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<Tenant>> {
        let conn = self.central.lock()?;
        tenant_by_email(&conn, email)
    }
}

fn tenant_from_row(r: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: r.get(0)?,
        email: r.get(1)?,
        name: r.get(2)?,
        credential_hash: r.get(3)?,
        shard_id: r.get(4)?,
        verified_at: r.get(5)?,
    })
}

pub(crate) fn tenant_by_id(conn: &Connection, tenant_id: TenantId) -> Result<Option<Tenant>> {
    let sql = format!("SELECT {} FROM tenants WHERE id=?1", TENANT_COLUMNS);
    Ok(conn
        .query_row(&sql, params![tenant_id], tenant_from_row)
        .optional()?)
}

pub(crate) fn tenant_by_email(conn: &Connection, email: &str) -> Result<Option<Tenant>> {
    let sql = format!("SELECT {} FROM tenants WHERE email=?1", TENANT_COLUMNS);
    Ok(conn
        .query_row(&sql, params![normalize_email(email)], tenant_from_row)
        .optional()?)
}

pub(crate) fn insert_tenant(
    conn: &Connection,
    email: &str,
    name: &str,
    credential_hash: &str,
    shard: ShardId,
) -> Result<TenantId> {
    conn.execute(
        "INSERT INTO tenants(email, name, credential_hash, shard_id) VALUES (?1, ?2, ?3, ?4)",
        params![normalize_email(email), name, credential_hash, shard],
    )?;
    Ok(TenantId(conn.last_insert_rowid()))
}

pub(crate) fn delete_tenant(conn: &Connection, tenant_id: TenantId) -> Result<()> {
    let n = conn.execute("DELETE FROM tenants WHERE id=?1", params![tenant_id])?;
    if n == 0 {
        return Err(LedgerError::not_found("tenant", tenant_id));
    }
    Ok(())
}

pub(crate) fn update_credentials(
    conn: &Connection,
    tenant_id: TenantId,
    name: &str,
    credential_hash: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE tenants SET name=?2, credential_hash=?3 WHERE id=?1",
        params![tenant_id, name, credential_hash],
    )?;
    Ok(())
}

/// Sets `verified_at` unless it is already set. Returns whether this call
/// performed the transition.
pub(crate) fn mark_verified(
    conn: &Connection,
    tenant_id: TenantId,
    at: DateTime<Utc>,
) -> Result<bool> {
    let n = conn.execute(
        "UPDATE tenants SET verified_at=?2 WHERE id=?1 AND verified_at IS NULL",
        params![tenant_id, at],
    )?;
    Ok(n == 1)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
