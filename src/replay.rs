// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Running-balance replay for one account.

use rusqlite::Connection;
use serde::Serialize;

use crate::balance::{self, Cutoff};
use crate::error::{LedgerError, Result};
use crate::ledger::{accounts, transactions};
use crate::models::{AccountId, DateRange, TenantId, Transaction, TransactionKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningEntry {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub balance_after: i64,
}

/// Signed effect of `tx` on `account_id`, using the same rules as the
/// aggregate balance queries.
pub fn effect_on(tx: &Transaction, account_id: AccountId) -> i64 {
    let is_source = tx.account_id == account_id;
    match tx.kind {
        TransactionKind::Income if is_source => tx.amount,
        TransactionKind::Expense if is_source => -tx.amount,
        TransactionKind::Income | TransactionKind::Expense => 0,
        TransactionKind::Transfer => {
            let mut effect = 0;
            if tx.to_account_id == Some(account_id) {
                effect += tx.amount;
            }
            if is_source {
                effect -= tx.amount;
            }
            effect
        }
    }
}

/// Walks `txs` in canonical order (date ascending, then id) starting from
/// `opening`. Input order does not matter. A balance outside `i64` is an
/// `Invariant` error.
pub fn replay(
    opening: i64,
    mut txs: Vec<Transaction>,
    account_id: AccountId,
) -> Result<Vec<RunningEntry>> {
    txs.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
    let mut running = opening;
    let mut out = Vec::with_capacity(txs.len());
    for transaction in txs {
        running = running
            .checked_add(effect_on(&transaction, account_id))
            .ok_or_else(|| {
                LedgerError::invariant(format!(
                    "running balance of account {} overflows after transaction {}",
                    account_id, transaction.id
                ))
            })?;
        out.push(RunningEntry {
            transaction,
            balance_after: running,
        });
    }
    Ok(out)
}

/// Per-transaction running balance of `account_id` over `range`, oldest
/// first. Transactions before the range are folded into the opening balance
/// by aggregation rather than replayed.
pub fn running_balances(
    conn: &Connection,
    tenant: TenantId,
    account_id: AccountId,
    range: &DateRange,
) -> Result<Vec<RunningEntry>> {
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return Err(LedgerError::invariant(format!(
                "range start {} is after range end {}",
                start, end
            )));
        }
    }
    accounts::ensure_owned(conn, tenant, account_id)?;

    let opening = match range.start {
        Some(start) => balance::account_balance(conn, account_id, Cutoff::Before(start))?,
        None => 0,
    };
    let in_range = transactions::touching_account(conn, account_id, range)?;
    replay(opening, in_range, account_id)
}
