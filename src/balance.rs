// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Balance aggregation over the account and category hierarchies.
//!
//! Own balances come straight from SQL aggregates over the transaction log.
//! The hierarchy is assembled once per call into an arena (`Vec` of nodes
//! addressed by index); parent links that form a cycle are cut so every node
//! ends up in exactly one tree, and subtree sums are computed with an explicit
//! post-order stack.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::{Connection, Params, params};
use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::ledger::{accounts, categories};
use crate::models::{Account, AccountId, AccountKind, Category, CategoryId, CategoryKind, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeKind {
    Account,
    Category,
}

/// Presentation bucket a root is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceClass {
    Asset,
    Liability,
    Income,
    Expense,
}

impl BalanceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            BalanceClass::Asset => "asset",
            BalanceClass::Liability => "liability",
            BalanceClass::Income => "income",
            BalanceClass::Expense => "expense",
        }
    }
}

impl From<AccountKind> for BalanceClass {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Asset => BalanceClass::Asset,
            AccountKind::Liability => BalanceClass::Liability,
        }
    }
}

impl From<CategoryKind> for BalanceClass {
    fn from(kind: CategoryKind) -> Self {
        match kind {
            CategoryKind::Income => BalanceClass::Income,
            CategoryKind::Expense => BalanceClass::Expense,
        }
    }
}

/// Flat input row for [`BalanceTree::assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub id: i64,
    pub name: String,
    pub class: BalanceClass,
    pub parent_id: Option<i64>,
}

impl From<Account> for TreeEntry {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            name: a.name,
            class: a.kind.into(),
            parent_id: a.parent_id,
        }
    }
}

impl From<Category> for TreeEntry {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            class: c.kind.into(),
            parent_id: c.parent_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceNode {
    pub id: i64,
    pub name: String,
    pub class: BalanceClass,
    /// Effective parent after cycle cutting; `None` for roots.
    pub parent_id: Option<i64>,
    pub own_balance: i64,
    pub subtree_balance: i64,
    #[serde(skip)]
    pub children: Vec<usize>,
}

/// One row of a serialized tree. Rows come in pre-order; `depth` and
/// `parent_id` carry the shape, so arbitrarily deep trees serialize flat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceView {
    pub id: i64,
    pub name: String,
    pub class: BalanceClass,
    pub parent_id: Option<i64>,
    pub depth: usize,
    pub own_balance: i64,
    pub subtree_balance: i64,
}

#[derive(Debug, Clone, Default)]
pub struct BalanceTree {
    nodes: Vec<BalanceNode>,
    roots: Vec<usize>,
    index: HashMap<i64, usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    OnPath,
    Done,
}

impl BalanceTree {
    /// Builds the forest from a flat list. Entries whose parent is missing
    /// from the list become roots. Children keep the input order.
    pub fn assemble(entries: Vec<TreeEntry>, own: &HashMap<i64, i64>) -> Self {
        let index: HashMap<i64, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
        let mut parent: Vec<Option<usize>> = entries
            .iter()
            .map(|e| e.parent_id.and_then(|p| index.get(&p).copied()))
            .collect();
        cut_cycles(&mut parent, &entries);

        let mut nodes: Vec<BalanceNode> = entries
            .into_iter()
            .map(|e| BalanceNode {
                own_balance: own.get(&e.id).copied().unwrap_or(0),
                subtree_balance: 0,
                children: Vec::new(),
                id: e.id,
                name: e.name,
                class: e.class,
                parent_id: None,
            })
            .collect();

        let mut roots = Vec::new();
        for (i, p) in parent.iter().enumerate() {
            match *p {
                Some(p) => {
                    let pid = nodes[p].id;
                    nodes[i].parent_id = Some(pid);
                    nodes[p].children.push(i);
                }
                None => roots.push(i),
            }
        }

        let mut tree = Self {
            nodes,
            roots,
            index,
        };
        tree.aggregate();
        tree
    }

    fn aggregate(&mut self) {
        let mut stack: Vec<(usize, bool)> = self.roots.iter().rev().map(|&r| (r, false)).collect();
        while let Some((i, expanded)) = stack.pop() {
            if expanded {
                let below: i64 = self.nodes[i]
                    .children
                    .iter()
                    .map(|&c| self.nodes[c].subtree_balance)
                    .sum();
                self.nodes[i].subtree_balance = self.nodes[i].own_balance + below;
            } else {
                stack.push((i, true));
                for &c in self.nodes[i].children.iter().rev() {
                    stack.push((c, false));
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: i64) -> Option<&BalanceNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &BalanceNode> {
        self.nodes.iter()
    }

    pub fn roots(&self) -> impl Iterator<Item = &BalanceNode> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    pub fn children(&self, node: &BalanceNode) -> impl Iterator<Item = &BalanceNode> {
        node.children.iter().map(|&i| &self.nodes[i])
    }

    /// Roots of one class; a filter over the already aggregated forest.
    pub fn roots_of(&self, class: BalanceClass) -> Vec<&BalanceNode> {
        self.roots().filter(|n| n.class == class).collect()
    }

    /// Sum of subtree balances over the roots of `class`.
    pub fn total(&self, class: BalanceClass) -> i64 {
        self.roots_of(class).iter().map(|n| n.subtree_balance).sum()
    }

    /// Pre-order walk of the subtree rooted at `id`, with depths relative to it.
    pub fn subtree(&self, id: i64) -> Vec<(usize, &BalanceNode)> {
        match self.index.get(&id) {
            Some(&start) => self.walk_from(&[start]),
            None => Vec::new(),
        }
    }

    /// Pre-order walk of the whole forest.
    pub fn walk(&self) -> Vec<(usize, &BalanceNode)> {
        self.walk_from(&self.roots)
    }

    fn walk_from(&self, starts: &[usize]) -> Vec<(usize, &BalanceNode)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, usize)> = starts.iter().rev().map(|&i| (i, 0)).collect();
        while let Some((i, depth)) = stack.pop() {
            let node = &self.nodes[i];
            out.push((depth, node));
            for &c in node.children.iter().rev() {
                stack.push((c, depth + 1));
            }
        }
        out
    }

    pub fn to_views(&self) -> Vec<BalanceView> {
        self.walk()
            .into_iter()
            .map(|(depth, n)| BalanceView {
                id: n.id,
                name: n.name.clone(),
                class: n.class,
                parent_id: n.parent_id,
                depth,
                own_balance: n.own_balance,
                subtree_balance: n.subtree_balance,
            })
            .collect()
    }
}

/// Follows parent links from every node; when a walk comes back to a node on
/// its own path, that node's parent link is dropped and it becomes a root.
fn cut_cycles(parent: &mut [Option<usize>], entries: &[TreeEntry]) {
    let mut state = vec![Visit::Unseen; parent.len()];
    let mut path = Vec::new();
    for start in 0..parent.len() {
        let mut cur = start;
        loop {
            match state[cur] {
                Visit::Done => break,
                Visit::OnPath => {
                    warn!(
                        id = entries[cur].id,
                        "parent cycle in hierarchy; treating node as a root"
                    );
                    parent[cur] = None;
                    break;
                }
                Visit::Unseen => {}
            }
            state[cur] = Visit::OnPath;
            path.push(cur);
            match parent[cur] {
                Some(p) => cur = p,
                None => break,
            }
        }
        for i in path.drain(..) {
            state[i] = Visit::Done;
        }
    }
}

/// Which transactions count toward a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    Unbounded,
    /// `date <= d`, used for as-of balances.
    OnOrBefore(NaiveDate),
    /// `date < d`, used for the balance carried into a replay range.
    Before(NaiveDate),
}

impl Cutoff {
    fn clause(self) -> &'static str {
        match self {
            Cutoff::Unbounded => "?2 IS NULL",
            Cutoff::OnOrBefore(_) => "t.date <= ?2",
            Cutoff::Before(_) => "t.date < ?2",
        }
    }

    fn date(self) -> Option<NaiveDate> {
        match self {
            Cutoff::Unbounded => None,
            Cutoff::OnOrBefore(d) | Cutoff::Before(d) => Some(d),
        }
    }
}

/// Effect on the source account: income adds, expense and transfer subtract.
const SOURCE_EFFECT: &str = "SUM(CASE WHEN t.kind = 'income' THEN t.amount ELSE -t.amount END)";

fn accumulate<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    out: &mut HashMap<i64, i64>,
) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let sum: i64 = r.get(1)?;
        *out.entry(id).or_insert(0) += sum;
    }
    Ok(())
}

/// Own balance of every account of `tenant` that has at least one
/// transaction inside the cutoff.
pub fn account_balances(
    conn: &Connection,
    tenant: TenantId,
    cutoff: Cutoff,
) -> Result<HashMap<AccountId, i64>> {
    let mut out = HashMap::new();
    let outgoing = format!(
        "SELECT t.account_id, {}
         FROM transactions t JOIN accounts a ON a.id = t.account_id
         WHERE a.user_id = ?1 AND {}
         GROUP BY t.account_id",
        SOURCE_EFFECT,
        cutoff.clause()
    );
    accumulate(conn, &outgoing, params![tenant, cutoff.date()], &mut out)?;
    let incoming = format!(
        "SELECT t.to_account_id, SUM(t.amount)
         FROM transactions t JOIN accounts a ON a.id = t.to_account_id
         WHERE a.user_id = ?1 AND t.kind = 'transfer' AND {}
         GROUP BY t.to_account_id",
        cutoff.clause()
    );
    accumulate(conn, &incoming, params![tenant, cutoff.date()], &mut out)?;
    Ok(out)
}

/// Own balance of a single account, aggregated directly over its history.
pub fn account_balance(conn: &Connection, account_id: AccountId, cutoff: Cutoff) -> Result<i64> {
    let outgoing = format!(
        "SELECT COALESCE({}, 0) FROM transactions t WHERE t.account_id = ?1 AND {}",
        SOURCE_EFFECT,
        cutoff.clause()
    );
    let out: i64 = conn.query_row(&outgoing, params![account_id, cutoff.date()], |r| r.get(0))?;
    let incoming = format!(
        "SELECT COALESCE(SUM(t.amount), 0) FROM transactions t
         WHERE t.to_account_id = ?1 AND t.kind = 'transfer' AND {}",
        cutoff.clause()
    );
    let inc: i64 = conn.query_row(&incoming, params![account_id, cutoff.date()], |r| r.get(0))?;
    Ok(out + inc)
}

/// Flow through each category: plain sum of amounts, sign not flipped.
pub fn category_balances(
    conn: &Connection,
    tenant: TenantId,
    cutoff: Cutoff,
) -> Result<HashMap<CategoryId, i64>> {
    let mut out = HashMap::new();
    let sql = format!(
        "SELECT t.category_id, SUM(t.amount)
         FROM transactions t JOIN categories c ON c.id = t.category_id
         WHERE c.user_id = ?1 AND {}
         GROUP BY t.category_id",
        cutoff.clause()
    );
    accumulate(conn, &sql, params![tenant, cutoff.date()], &mut out)?;
    Ok(out)
}

pub fn build_balance_tree(
    conn: &Connection,
    kind: TreeKind,
    tenant: TenantId,
    as_of: Option<NaiveDate>,
) -> Result<BalanceTree> {
    let cutoff = as_of.map_or(Cutoff::Unbounded, Cutoff::OnOrBefore);
    let tree = match kind {
        TreeKind::Account => {
            let entries = accounts::list(conn, tenant)?
                .into_iter()
                .map(TreeEntry::from)
                .collect();
            BalanceTree::assemble(entries, &account_balances(conn, tenant, cutoff)?)
        }
        TreeKind::Category => {
            let entries = categories::list(conn, tenant)?
                .into_iter()
                .map(TreeEntry::from)
                .collect();
            BalanceTree::assemble(entries, &category_balances(conn, tenant, cutoff)?)
        }
    };
    Ok(tree)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialSummary {
    pub as_of: Option<NaiveDate>,
    pub total_assets: i64,
    pub total_liabilities: i64,
    pub total_income: i64,
    pub total_expenses: i64,
    /// Assets minus liabilities.
    pub net_worth: i64,
    /// Income minus expenses.
    pub net_income: i64,
    pub balanced: bool,
}

pub fn summarize(
    conn: &Connection,
    tenant: TenantId,
    as_of: Option<NaiveDate>,
) -> Result<FinancialSummary> {
    let accounts = build_balance_tree(conn, TreeKind::Account, tenant, as_of)?;
    let categories = build_balance_tree(conn, TreeKind::Category, tenant, as_of)?;
    let total_assets = accounts.total(BalanceClass::Asset);
    let total_liabilities = accounts.total(BalanceClass::Liability);
    let total_income = categories.total(BalanceClass::Income);
    let total_expenses = categories.total(BalanceClass::Expense);
    let net_worth = total_assets - total_liabilities;
    let net_income = total_income - total_expenses;
    Ok(FinancialSummary {
        as_of,
        total_assets,
        total_liabilities,
        total_income,
        total_expenses,
        net_worth,
        net_income,
        balanced: net_worth == net_income,
    })
}
