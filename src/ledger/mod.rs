// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Per-shard ledger store.
//!
//! The submodules are free functions over a borrowed [`rusqlite::Connection`]
//! and an acting tenant. [`Ledger`] binds the two together for callers that
//! came through the [`ShardRouter`](crate::router::ShardRouter).

pub mod accounts;
pub mod categories;
pub(crate) mod hierarchy;
pub mod transactions;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::balance::{self, BalanceTree, FinancialSummary, TreeKind};
use crate::db::DbHandle;
use crate::error::Result;
use crate::models::{
    Account, AccountId, AccountKind, Category, CategoryId, CategoryKind, DateRange,
    NewTransaction, OrderUpdate, TenantId, Transaction, TransactionId, TransactionPatch,
};
use crate::replay::{self, RunningEntry};
use transactions::{TransactionFilter, TransactionRow};

/// A tenant's view of the shard that stores its data.
#[derive(Debug, Clone)]
pub struct Ledger {
    tenant_id: TenantId,
    handle: DbHandle,
}

impl Ledger {
    pub fn new(tenant_id: TenantId, handle: DbHandle) -> Self {
        Self { tenant_id, handle }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn handle(&self) -> &DbHandle {
        &self.handle
    }

    /// Runs several queries on a read connection inside one transaction so
    /// they all see the same committed state.
    fn snapshot<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.handle.read()?;
        let tx = conn.unchecked_transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    // accounts

    pub fn create_account(
        &self,
        name: &str,
        kind: AccountKind,
        parent_id: Option<AccountId>,
    ) -> Result<Account> {
        accounts::create(&*self.handle.lock()?, self.tenant_id, name, kind, parent_id)
    }

    pub fn account(&self, id: AccountId) -> Result<Account> {
        accounts::get(&*self.handle.read()?, self.tenant_id, id)
    }

    pub fn account_by_name(&self, name: &str) -> Result<Account> {
        accounts::find_by_name(&*self.handle.read()?, self.tenant_id, name)
    }

    pub fn accounts(&self) -> Result<Vec<Account>> {
        accounts::list(&*self.handle.read()?, self.tenant_id)
    }

    pub fn rename_account(&self, id: AccountId, name: &str) -> Result<()> {
        accounts::rename(&*self.handle.lock()?, self.tenant_id, id, name)
    }

    pub fn can_delete_account(&self, id: AccountId) -> Result<bool> {
        accounts::can_delete(&*self.handle.read()?, self.tenant_id, id)
    }

    pub fn delete_account(&self, id: AccountId) -> Result<()> {
        accounts::delete(&*self.handle.lock()?, self.tenant_id, id)
    }

    pub fn reorder_accounts(&self, items: &[OrderUpdate]) -> Result<usize> {
        accounts::reorder(&*self.handle.lock()?, self.tenant_id, items)
    }

    // categories

    pub fn create_category(
        &self,
        name: &str,
        kind: CategoryKind,
        parent_id: Option<CategoryId>,
    ) -> Result<Category> {
        categories::create(&*self.handle.lock()?, self.tenant_id, name, kind, parent_id)
    }

    pub fn category(&self, id: CategoryId) -> Result<Category> {
        categories::get(&*self.handle.read()?, self.tenant_id, id)
    }

    pub fn category_by_name(&self, name: &str) -> Result<Category> {
        categories::find_by_name(&*self.handle.read()?, self.tenant_id, name)
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        categories::list(&*self.handle.read()?, self.tenant_id)
    }

    pub fn rename_category(&self, id: CategoryId, name: &str) -> Result<()> {
        categories::rename(&*self.handle.lock()?, self.tenant_id, id, name)
    }

    pub fn can_delete_category(&self, id: CategoryId) -> Result<bool> {
        categories::can_delete(&*self.handle.read()?, self.tenant_id, id)
    }

    pub fn delete_category(&self, id: CategoryId) -> Result<()> {
        categories::delete(&*self.handle.lock()?, self.tenant_id, id)
    }

    pub fn reorder_categories(&self, items: &[OrderUpdate]) -> Result<usize> {
        categories::reorder(&*self.handle.lock()?, self.tenant_id, items)
    }

    // transactions

    pub fn create_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        transactions::create(&*self.handle.lock()?, self.tenant_id, new)
    }

    pub fn transaction(&self, id: TransactionId) -> Result<Transaction> {
        transactions::get(&*self.handle.read()?, self.tenant_id, id)
    }

    pub fn update_transaction(
        &self,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction> {
        transactions::update(&*self.handle.lock()?, self.tenant_id, id, patch)
    }

    pub fn delete_transaction(&self, id: TransactionId) -> Result<()> {
        transactions::delete(&*self.handle.lock()?, self.tenant_id, id)
    }

    pub fn delete_transactions(&self, ids: &[TransactionId]) -> Result<usize> {
        transactions::delete_many(&*self.handle.lock()?, self.tenant_id, ids)
    }

    pub fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<TransactionRow>> {
        transactions::list(&*self.handle.read()?, self.tenant_id, filter)
    }

    // balances

    pub fn balance_tree(&self, kind: TreeKind, as_of: Option<NaiveDate>) -> Result<BalanceTree> {
        self.snapshot(|conn| balance::build_balance_tree(conn, kind, self.tenant_id, as_of))
    }

    pub fn running_balances(
        &self,
        account_id: AccountId,
        range: &DateRange,
    ) -> Result<Vec<RunningEntry>> {
        self.snapshot(|conn| replay::running_balances(conn, self.tenant_id, account_id, range))
    }

    pub fn summary(&self, as_of: Option<NaiveDate>) -> Result<FinancialSummary> {
        self.snapshot(|conn| balance::summarize(conn, self.tenant_id, as_of))
    }
}
