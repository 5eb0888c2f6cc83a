// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transaction log writes and reads. Ownership is transitive through the
//! source account; every reference is re-checked against the acting tenant.

use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use super::{accounts, categories};
use crate::error::{LedgerError, Result};
use crate::models::{
    AccountId, CategoryId, DateRange, NewTransaction, TenantId, Transaction, TransactionId,
    TransactionKind, TransactionPatch,
};

const COLUMNS: &str =
    "t.id, t.description, t.amount, t.date, t.kind, t.account_id, t.to_account_id, t.category_id";

fn from_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        description: r.get(1)?,
        amount: r.get(2)?,
        date: r.get(3)?,
        kind: r.get(4)?,
        account_id: r.get(5)?,
        to_account_id: r.get(6)?,
        category_id: r.get(7)?,
    })
}

/// Checks the field combination first, then ownership of every reference.
fn validate(conn: &Connection, tenant: TenantId, tx: &NewTransaction) -> Result<()> {
    if tx.description.trim().is_empty() {
        return Err(LedgerError::invariant("description must not be empty"));
    }
    if tx.amount < 0 {
        return Err(LedgerError::invariant(format!(
            "amount must not be negative, got {}",
            tx.amount
        )));
    }
    match tx.kind {
        TransactionKind::Transfer => {
            let dest = tx.to_account_id.ok_or_else(|| {
                LedgerError::invariant("transfer requires a destination account")
            })?;
            if dest == tx.account_id {
                return Err(LedgerError::invariant(
                    "transfer source and destination must differ",
                ));
            }
            if tx.category_id.is_some() {
                return Err(LedgerError::invariant("transfer cannot carry a category"));
            }
        }
        TransactionKind::Income | TransactionKind::Expense => {
            if tx.to_account_id.is_some() {
                return Err(LedgerError::invariant(format!(
                    "{} cannot have a destination account",
                    tx.kind
                )));
            }
        }
    }

    accounts::ensure_owned(conn, tenant, tx.account_id)?;
    if let Some(dest) = tx.to_account_id {
        accounts::ensure_owned(conn, tenant, dest)?;
    }
    if let Some(cat) = tx.category_id {
        categories::ensure_owned(conn, tenant, cat)?;
    }
    Ok(())
}

pub fn create(conn: &Connection, tenant: TenantId, new: &NewTransaction) -> Result<Transaction> {
    validate(conn, tenant, new)?;
    conn.execute(
        "INSERT INTO transactions(description, amount, date, kind, account_id, to_account_id, category_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.description.trim(),
            new.amount,
            new.date,
            new.kind,
            new.account_id,
            new.to_account_id,
            new.category_id
        ],
    )?;
    get(conn, tenant, conn.last_insert_rowid())
}

pub fn get(conn: &Connection, tenant: TenantId, id: TransactionId) -> Result<Transaction> {
    let sql = format!(
        "SELECT {} FROM transactions t JOIN accounts a ON a.id=t.account_id
         WHERE t.id=?1 AND a.user_id=?2",
        COLUMNS
    );
    conn.query_row(&sql, params![id, tenant], from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("transaction", id))
}

/// Applies the patch on top of the stored row and re-validates the result
/// as a whole before writing it back.
pub fn update(
    conn: &Connection,
    tenant: TenantId,
    id: TransactionId,
    patch: &TransactionPatch,
) -> Result<Transaction> {
    let tx = conn.unchecked_transaction()?;
    let current = get(&tx, tenant, id)?;
    let merged = NewTransaction {
        description: patch
            .description
            .clone()
            .unwrap_or(current.description),
        amount: patch.amount.unwrap_or(current.amount),
        date: patch.date.unwrap_or(current.date),
        kind: patch.kind.unwrap_or(current.kind),
        account_id: patch.account_id.unwrap_or(current.account_id),
        to_account_id: patch.to_account_id.unwrap_or(current.to_account_id),
        category_id: patch.category_id.unwrap_or(current.category_id),
    };
    validate(&tx, tenant, &merged)?;
    tx.execute(
        "UPDATE transactions SET description=?1, amount=?2, date=?3, kind=?4,
             account_id=?5, to_account_id=?6, category_id=?7
         WHERE id=?8",
        params![
            merged.description.trim(),
            merged.amount,
            merged.date,
            merged.kind,
            merged.account_id,
            merged.to_account_id,
            merged.category_id,
            id
        ],
    )?;
    let updated = get(&tx, tenant, id)?;
    tx.commit()?;
    Ok(updated)
}

const DELETE_OWNED: &str = "DELETE FROM transactions
     WHERE id=?1 AND account_id IN (SELECT id FROM accounts WHERE user_id=?2)";

pub fn delete(conn: &Connection, tenant: TenantId, id: TransactionId) -> Result<()> {
    let n = conn.execute(DELETE_OWNED, params![id, tenant])?;
    if n == 0 {
        return Err(LedgerError::not_found("transaction", id));
    }
    Ok(())
}

/// Removes every listed transaction owned by `tenant`; foreign or unknown ids
/// are skipped. Returns how many rows were removed.
pub fn delete_many(conn: &Connection, tenant: TenantId, ids: &[TransactionId]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut removed = 0;
    {
        let mut stmt = tx.prepare(DELETE_OWNED)?;
        for id in ids {
            removed += stmt.execute(params![id, tenant])?;
        }
    }
    tx.commit()?;
    Ok(removed)
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Matches the account as source or destination.
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub range: DateRange,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub account: String,
    pub to_account: Option<String>,
    pub category: Option<String>,
}

/// Lists a tenant's transactions, newest first.
pub fn list(
    conn: &Connection,
    tenant: TenantId,
    filter: &TransactionFilter,
) -> Result<Vec<TransactionRow>> {
    let mut sql = format!(
        "SELECT {}, a.name, ta.name, c.name
         FROM transactions t
         JOIN accounts a ON a.id=t.account_id
         LEFT JOIN accounts ta ON ta.id=t.to_account_id
         LEFT JOIN categories c ON c.id=t.category_id
         WHERE a.user_id=?",
        COLUMNS
    );
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(tenant)];

    if let Some(acct) = filter.account_id {
        accounts::ensure_owned(conn, tenant, acct)?;
        sql.push_str(" AND (t.account_id=? OR t.to_account_id=?)");
        params_vec.push(Box::new(acct));
        params_vec.push(Box::new(acct));
    }
    if let Some(cat) = filter.category_id {
        categories::ensure_owned(conn, tenant, cat)?;
        sql.push_str(" AND t.category_id=?");
        params_vec.push(Box::new(cat));
    }
    if let Some(start) = filter.range.start {
        sql.push_str(" AND t.date>=?");
        params_vec.push(Box::new(start));
    }
    if let Some(end) = filter.range.end {
        sql.push_str(" AND t.date<?");
        params_vec.push(Box::new(end));
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        params_vec.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec.iter()))?;
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(TransactionRow {
            transaction: from_row(r)?,
            account: r.get(8)?,
            to_account: r.get(9)?,
            category: r.get(10)?,
        });
    }
    Ok(data)
}

/// Transactions in `range` that touch `account_id` on either side, oldest
/// first with ties broken by id. The caller has already checked ownership.
pub(crate) fn touching_account(
    conn: &Connection,
    account_id: AccountId,
    range: &DateRange,
) -> Result<Vec<Transaction>> {
    let sql = format!(
        "SELECT {} FROM transactions t
         WHERE (t.account_id=?1 OR t.to_account_id=?1)
           AND (?2 IS NULL OR t.date>=?2)
           AND (?3 IS NULL OR t.date<?3)
         ORDER BY t.date ASC, t.id ASC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![account_id, range.start, range.end], from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
