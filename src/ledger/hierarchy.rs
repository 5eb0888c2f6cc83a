// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Row operations shared by the two tree-shaped tables.

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{LedgerError, Result};
use crate::models::{OrderUpdate, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Table {
    Accounts,
    Categories,
}

impl Table {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Table::Accounts => "accounts",
            Table::Categories => "categories",
        }
    }

    pub(crate) fn entity(self) -> &'static str {
        match self {
            Table::Accounts => "account",
            Table::Categories => "category",
        }
    }

    fn usage_sql(self) -> &'static str {
        match self {
            Table::Accounts => {
                "SELECT COUNT(*) FROM transactions WHERE account_id=?1 OR to_account_id=?1"
            }
            Table::Categories => "SELECT COUNT(*) FROM transactions WHERE category_id=?1",
        }
    }
}

pub(crate) fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::invariant("name must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Kind of a row owned by `tenant`. Rows of other tenants read as missing.
pub(crate) fn owned_kind(
    conn: &Connection,
    table: Table,
    tenant: TenantId,
    id: i64,
) -> Result<String> {
    let sql = format!(
        "SELECT kind FROM {} WHERE id=?1 AND user_id=?2",
        table.name()
    );
    conn.query_row(&sql, params![id, tenant], |r| r.get::<_, String>(0))
        .optional()?
        .ok_or_else(|| LedgerError::not_found(table.entity(), id))
}

pub(crate) fn count(conn: &Connection, table: Table, tenant: TenantId) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE user_id=?1", table.name());
    Ok(conn.query_row(&sql, params![tenant], |r| r.get(0))?)
}

pub(crate) fn next_sibling_order(
    conn: &Connection,
    table: Table,
    tenant: TenantId,
    kind: &str,
    parent_id: Option<i64>,
) -> Result<i64> {
    let sql = format!(
        "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM {} WHERE user_id=?1 AND kind=?2 AND parent_id IS ?3",
        table.name()
    );
    Ok(conn.query_row(&sql, params![tenant, kind, parent_id], |r| r.get(0))?)
}

pub(crate) fn insert(
    conn: &Connection,
    table: Table,
    tenant: TenantId,
    name: &str,
    kind: &str,
    parent_id: Option<i64>,
    sort_order: i64,
) -> Result<i64> {
    let sql = format!(
        "INSERT INTO {}(user_id, name, kind, parent_id, sort_order) VALUES (?1, ?2, ?3, ?4, ?5)",
        table.name()
    );
    conn.execute(&sql, params![tenant, name, kind, parent_id, sort_order])?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn rename(
    conn: &Connection,
    table: Table,
    tenant: TenantId,
    id: i64,
    name: &str,
) -> Result<()> {
    let name = validate_name(name)?;
    let sql = format!(
        "UPDATE {} SET name=?1 WHERE id=?2 AND user_id=?3",
        table.name()
    );
    let n = conn.execute(&sql, params![name, id, tenant])?;
    if n == 0 {
        return Err(LedgerError::not_found(table.entity(), id));
    }
    Ok(())
}

/// Transactions referencing the row and direct children, in that order.
fn usage(conn: &Connection, table: Table, id: i64) -> Result<(i64, i64)> {
    let tx_count: i64 = conn.query_row(table.usage_sql(), params![id], |r| r.get(0))?;
    let sql = format!("SELECT COUNT(*) FROM {} WHERE parent_id=?1", table.name());
    let children: i64 = conn.query_row(&sql, params![id], |r| r.get(0))?;
    Ok((tx_count, children))
}

pub(crate) fn can_delete(conn: &Connection, table: Table, tenant: TenantId, id: i64) -> Result<bool> {
    owned_kind(conn, table, tenant, id)?;
    let (tx_count, children) = usage(conn, table, id)?;
    Ok(tx_count == 0 && children == 0)
}

/// Deletes an unreferenced leaf. Check and delete share one transaction so a
/// concurrent insert cannot slip in between.
pub(crate) fn delete(conn: &Connection, table: Table, tenant: TenantId, id: i64) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    owned_kind(&tx, table, tenant, id)?;
    let (tx_count, children) = usage(&tx, table, id)?;
    if tx_count > 0 {
        return Err(LedgerError::invariant(format!(
            "{} {} is referenced by {} transaction(s)",
            table.entity(),
            id,
            tx_count
        )));
    }
    if children > 0 {
        return Err(LedgerError::invariant(format!(
            "{} {} has {} child {}(s)",
            table.entity(),
            id,
            children,
            table.entity()
        )));
    }
    let sql = format!("DELETE FROM {} WHERE id=?1 AND user_id=?2", table.name());
    tx.execute(&sql, params![id, tenant])?;
    tx.commit()?;
    Ok(())
}

/// Applies a sibling order rewrite as one transaction. Rows that do not belong
/// to `tenant` are skipped; the count of rows actually updated is returned.
pub(crate) fn reorder(
    conn: &Connection,
    table: Table,
    tenant: TenantId,
    items: &[OrderUpdate],
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut updated = 0;
    {
        let sql = format!(
            "UPDATE {} SET sort_order=?1 WHERE id=?2 AND user_id=?3",
            table.name()
        );
        let mut stmt = tx.prepare(&sql)?;
        for item in items {
            updated += stmt.execute(params![item.order, item.id, tenant])?;
        }
    }
    tx.commit()?;
    Ok(updated)
}
