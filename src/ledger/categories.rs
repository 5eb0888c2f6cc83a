// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::hierarchy::{self, Table};
use crate::error::{LedgerError, Result};
use crate::models::{Category, CategoryId, CategoryKind, OrderUpdate, TenantId};

const COLUMNS: &str = "id, user_id, name, kind, parent_id, sort_order";

fn from_row(r: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        kind: r.get(3)?,
        parent_id: r.get(4)?,
        sort_order: r.get(5)?,
    })
}

/// Creates a category. The parent must belong to the tenant; unlike accounts
/// its kind is not required to match.
pub fn create(
    conn: &Connection,
    tenant: TenantId,
    name: &str,
    kind: CategoryKind,
    parent_id: Option<CategoryId>,
) -> Result<Category> {
    let name = hierarchy::validate_name(name)?;
    if let Some(pid) = parent_id {
        hierarchy::owned_kind(conn, Table::Categories, tenant, pid)?;
    }
    let order =
        hierarchy::next_sibling_order(conn, Table::Categories, tenant, kind.as_str(), parent_id)?;
    let id = hierarchy::insert(
        conn,
        Table::Categories,
        tenant,
        &name,
        kind.as_str(),
        parent_id,
        order,
    )?;
    get(conn, tenant, id)
}

pub fn get(conn: &Connection, tenant: TenantId, id: CategoryId) -> Result<Category> {
    let sql = format!("SELECT {} FROM categories WHERE id=?1 AND user_id=?2", COLUMNS);
    conn.query_row(&sql, params![id, tenant], from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("category", id))
}

pub fn find_by_name(conn: &Connection, tenant: TenantId, name: &str) -> Result<Category> {
    let sql = format!("SELECT {} FROM categories WHERE name=?1 AND user_id=?2", COLUMNS);
    conn.query_row(&sql, params![name.trim(), tenant], from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("category", name))
}

pub fn list(conn: &Connection, tenant: TenantId) -> Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories WHERE user_id=?1 ORDER BY sort_order, id",
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
    hierarchy::count(conn, Table::Categories, tenant)
}

pub fn rename(conn: &Connection, tenant: TenantId, id: CategoryId, name: &str) -> Result<()> {
    hierarchy::rename(conn, Table::Categories, tenant, id, name)
}

pub fn can_delete(conn: &Connection, tenant: TenantId, id: CategoryId) -> Result<bool> {
    hierarchy::can_delete(conn, Table::Categories, tenant, id)
}

pub fn delete(conn: &Connection, tenant: TenantId, id: CategoryId) -> Result<()> {
    hierarchy::delete(conn, Table::Categories, tenant, id)
}

pub fn reorder(conn: &Connection, tenant: TenantId, items: &[OrderUpdate]) -> Result<usize> {
    hierarchy::reorder(conn, Table::Categories, tenant, items)
}

pub(crate) fn ensure_owned(conn: &Connection, tenant: TenantId, id: CategoryId) -> Result<()> {
    hierarchy::owned_kind(conn, Table::Categories, tenant, id).map(|_| ())
}
