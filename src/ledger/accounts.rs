// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::hierarchy::{self, Table};
use crate::error::{LedgerError, Result};
use crate::models::{Account, AccountId, AccountKind, OrderUpdate, TenantId};

const COLUMNS: &str = "id, user_id, name, kind, parent_id, sort_order";

fn from_row(r: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        kind: r.get(3)?,
        parent_id: r.get(4)?,
        sort_order: r.get(5)?,
    })
}

/// Creates an account. A parent must belong to the same tenant and have the
/// same kind; the new account is ordered after its existing siblings.
pub fn create(
    conn: &Connection,
    tenant: TenantId,
    name: &str,
    kind: AccountKind,
    parent_id: Option<AccountId>,
) -> Result<Account> {
    let name = hierarchy::validate_name(name)?;
    if let Some(pid) = parent_id {
        let parent = get(conn, tenant, pid)?;
        if parent.kind != kind {
            return Err(LedgerError::invariant(format!(
                "{} account cannot be nested under {} account {}",
                kind, parent.kind, pid
            )));
        }
    }
    let order = hierarchy::next_sibling_order(conn, Table::Accounts, tenant, kind.as_str(), parent_id)?;
    let id = hierarchy::insert(
        conn,
        Table::Accounts,
        tenant,
        &name,
        kind.as_str(),
        parent_id,
        order,
    )?;
    get(conn, tenant, id)
}

pub fn get(conn: &Connection, tenant: TenantId, id: AccountId) -> Result<Account> {
    let sql = format!("SELECT {} FROM accounts WHERE id=?1 AND user_id=?2", COLUMNS);
    conn.query_row(&sql, params![id, tenant], from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("account", id))
}

pub fn find_by_name(conn: &Connection, tenant: TenantId, name: &str) -> Result<Account> {
    let sql = format!("SELECT {} FROM accounts WHERE name=?1 AND user_id=?2", COLUMNS);
    conn.query_row(&sql, params![name.trim(), tenant], from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("account", name))
}

/// All accounts of a tenant in display order.
pub fn list(conn: &Connection, tenant: TenantId) -> Result<Vec<Account>> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE user_id=?1 ORDER BY sort_order, id",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![tenant], from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn count(conn: &Connection, tenant: TenantId) -> Result<i64> {
    hierarchy::count(conn, Table::Accounts, tenant)
}

pub fn rename(conn: &Connection, tenant: TenantId, id: AccountId, name: &str) -> Result<()> {
    hierarchy::rename(conn, Table::Accounts, tenant, id, name)
}

pub fn can_delete(conn: &Connection, tenant: TenantId, id: AccountId) -> Result<bool> {
    hierarchy::can_delete(conn, Table::Accounts, tenant, id)
}

pub fn delete(conn: &Connection, tenant: TenantId, id: AccountId) -> Result<()> {
    hierarchy::delete(conn, Table::Accounts, tenant, id)
}

pub fn reorder(conn: &Connection, tenant: TenantId, items: &[OrderUpdate]) -> Result<usize> {
    hierarchy::reorder(conn, Table::Accounts, tenant, items)
}

/// Confirms `id` is an account of `tenant`.
pub(crate) fn ensure_owned(conn: &Connection, tenant: TenantId, id: AccountId) -> Result<()> {
    hierarchy::owned_kind(conn, Table::Accounts, tenant, id).map(|_| ())
}
