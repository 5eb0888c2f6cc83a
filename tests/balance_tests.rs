// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Connection;
use shardbook::Ledger;
use shardbook::balance::{BalanceClass, BalanceTree, TreeEntry, TreeKind};
use shardbook::db::{self, DbHandle};
use shardbook::models::{AccountKind, CategoryKind, NewTransaction, TenantId, TransactionKind};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

struct Books {
    ledger: Ledger,
    cash: i64,
    card: i64,
    salary: i64,
    food: i64,
}

fn setup() -> Books {
    let conn = Connection::open_in_memory().unwrap();
    db::init_shard_schema(&conn).unwrap();
    let ledger = Ledger::new(TenantId(1), DbHandle::new("test", conn));

    let cash = ledger.create_account("Cash", AccountKind::Asset, None).unwrap().id;
    let card = ledger
        .create_account("CreditCard", AccountKind::Liability, None)
        .unwrap()
        .id;
    let salary = ledger
        .create_category("Salary", CategoryKind::Income, None)
        .unwrap()
        .id;
    let food = ledger
        .create_category("Food", CategoryKind::Expense, None)
        .unwrap()
        .id;

    let rows = [
        ("Paycheck", 1000, "2024-01-05", TransactionKind::Income, cash, None, Some(salary)),
        ("Groceries", 200, "2024-01-10", TransactionKind::Expense, cash, None, Some(food)),
        ("Card payment", 150, "2024-01-15", TransactionKind::Transfer, cash, Some(card), None),
    ];
    for (description, amount, date, kind, account_id, to_account_id, category_id) in rows {
        ledger
            .create_transaction(&NewTransaction {
                description: description.to_string(),
                amount,
                date: d(date),
                kind,
                account_id,
                to_account_id,
                category_id,
            })
            .unwrap();
    }
    Books {
        ledger,
        cash,
        card,
        salary,
        food,
    }
}

#[test]
fn own_balances_follow_transaction_effects() {
    let b = setup();
    let accounts = b.ledger.balance_tree(TreeKind::Account, None).unwrap();
    assert_eq!(accounts.get(b.cash).unwrap().own_balance, 650);
    assert_eq!(accounts.get(b.card).unwrap().own_balance, 150);

    let categories = b.ledger.balance_tree(TreeKind::Category, None).unwrap();
    assert_eq!(categories.get(b.food).unwrap().own_balance, 200);
    assert_eq!(categories.get(b.salary).unwrap().own_balance, 1000);
}

#[test]
fn as_of_is_inclusive() {
    let b = setup();
    let tree = b
        .ledger
        .balance_tree(TreeKind::Account, Some(d("2024-01-10")))
        .unwrap();
    assert_eq!(tree.get(b.cash).unwrap().own_balance, 800);
    assert_eq!(tree.get(b.card).unwrap().own_balance, 0);

    let before = b
        .ledger
        .balance_tree(TreeKind::Account, Some(d("2023-12-31")))
        .unwrap();
    assert!(before.nodes().all(|n| n.own_balance == 0 && n.subtree_balance == 0));
    assert_eq!(before.len(), 2);
}

#[test]
fn subtree_sums_descendants() {
    let b = setup();
    let l = &b.ledger;
    let savings = l
        .create_account("Savings", AccountKind::Asset, Some(b.cash))
        .unwrap()
        .id;
    let vault = l
        .create_account("Vault", AccountKind::Asset, Some(savings))
        .unwrap()
        .id;
    l.create_transaction(&NewTransaction {
        description: "Stash".into(),
        amount: 300,
        date: d("2024-02-01"),
        kind: TransactionKind::Transfer,
        account_id: b.cash,
        to_account_id: Some(vault),
        category_id: None,
    })
    .unwrap();

    let tree = l.balance_tree(TreeKind::Account, None).unwrap();
    let cash = tree.get(b.cash).unwrap();
    assert_eq!(cash.own_balance, 350);
    assert_eq!(cash.subtree_balance, 650);
    assert_eq!(tree.get(savings).unwrap().own_balance, 0);
    assert_eq!(tree.get(savings).unwrap().subtree_balance, 300);

    for node in tree.nodes() {
        let below: i64 = tree.subtree(node.id).iter().map(|(_, n)| n.own_balance).sum();
        assert_eq!(node.subtree_balance, below, "node {}", node.name);
        if tree.children(node).next().is_none() {
            assert_eq!(node.subtree_balance, node.own_balance);
        }
    }

    let walk: Vec<_> = tree.walk().into_iter().map(|(depth, n)| (depth, n.id)).collect();
    assert_eq!(walk[0], (0, b.cash));
    assert_eq!(walk[1], (1, savings));
    assert_eq!(walk[2], (2, vault));
}

#[test]
fn roots_are_grouped_by_class() {
    let b = setup();
    let tree = b.ledger.balance_tree(TreeKind::Account, None).unwrap();
    let assets: Vec<_> = tree.roots_of(BalanceClass::Asset).iter().map(|n| n.id).collect();
    let liabilities: Vec<_> = tree
        .roots_of(BalanceClass::Liability)
        .iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(assets, vec![b.cash]);
    assert_eq!(liabilities, vec![b.card]);
    assert_eq!(tree.total(BalanceClass::Asset), 650);

    let summary = b.ledger.summary(None).unwrap();
    assert_eq!(summary.total_assets, 650);
    assert_eq!(summary.total_liabilities, 150);
    assert_eq!(summary.total_income, 1000);
    assert_eq!(summary.total_expenses, 200);
    assert_eq!(summary.net_worth, 500);
    assert_eq!(summary.net_income, 800);
}

#[test]
fn category_tree_accepts_mixed_kinds() {
    let b = setup();
    let dining = b
        .ledger
        .create_category("Dining out", CategoryKind::Expense, Some(b.salary))
        .unwrap();
    assert_eq!(dining.parent_id, Some(b.salary));
    let tree = b.ledger.balance_tree(TreeKind::Category, None).unwrap();
    let roots: Vec<_> = tree.roots().map(|n| n.id).collect();
    assert!(roots.contains(&b.salary));
    assert!(!roots.contains(&dining.id));
}

fn entry(id: i64, parent_id: Option<i64>) -> TreeEntry {
    TreeEntry {
        id,
        name: format!("n{id}"),
        class: BalanceClass::Asset,
        parent_id,
    }
}

#[test]
fn cycles_and_orphans_become_roots() {
    // 1 -> 2 -> 3 -> 1 is a cycle, 4 hangs off 2, 5 points at a missing row
    let entries = vec![
        entry(1, Some(3)),
        entry(2, Some(1)),
        entry(3, Some(2)),
        entry(4, Some(2)),
        entry(5, Some(99)),
    ];
    let own: HashMap<i64, i64> = [(1, 10), (2, 20), (3, 30), (4, 40), (5, 50)].into_iter().collect();
    let tree = BalanceTree::assemble(entries, &own);

    assert_eq!(tree.len(), 5);
    let walk = tree.walk();
    assert_eq!(walk.len(), 5, "every node appears exactly once");
    let mut seen: Vec<i64> = walk.iter().map(|(_, n)| n.id).collect();
    seen.sort();
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);

    let root_total: i64 = tree.roots().map(|n| n.subtree_balance).sum();
    assert_eq!(root_total, 150);
    assert!(tree.get(5).unwrap().parent_id.is_none());
    assert_eq!(tree.get(5).unwrap().subtree_balance, 50);
    assert_eq!(tree.roots().filter(|n| n.id != 5).count(), 1);
}

#[test]
fn empty_ledger_has_empty_tree() {
    let conn = Connection::open_in_memory().unwrap();
    db::init_shard_schema(&conn).unwrap();
    let ledger = Ledger::new(TenantId(7), DbHandle::new("empty", conn));
    let tree = ledger.balance_tree(TreeKind::Account, None).unwrap();
    assert!(tree.is_empty());
    assert!(tree.to_views().is_empty());
    let summary = ledger.summary(None).unwrap();
    assert!(summary.balanced);
}

#[test]
fn deep_chain_renders_without_recursion() {
    const DEPTH: i64 = 100_000;
    let entries: Vec<TreeEntry> = (0..DEPTH)
        .map(|i| entry(i, if i == 0 { None } else { Some(i - 1) }))
        .collect();
    let own: HashMap<i64, i64> = (0..DEPTH).map(|i| (i, 1)).collect();
    let tree = BalanceTree::assemble(entries, &own);

    assert_eq!(tree.get(0).unwrap().subtree_balance, DEPTH);
    assert_eq!(tree.get(DEPTH - 1).unwrap().subtree_balance, 1);

    let views = tree.to_views();
    assert_eq!(views.len(), DEPTH as usize);
    assert_eq!(views[0].depth, 0);
    assert_eq!(views[0].parent_id, None);
    let last = views.last().unwrap();
    assert_eq!(last.id, DEPTH - 1);
    assert_eq!(last.depth, (DEPTH - 1) as usize);
    assert_eq!(last.parent_id, Some(DEPTH - 2));

    let json = serde_json::to_string(&views).unwrap();
    assert!(json.starts_with('['));
}

#[test]
fn parent_owned_by_other_tenant_is_ignored() {
    let b = setup();
    let (foreign_account, foreign_category) = {
        let conn = b.ledger.handle().lock().unwrap();
        conn.execute(
            "INSERT INTO accounts(user_id, name, kind) VALUES (2, 'Theirs', 'asset')",
            [],
        )
        .unwrap();
        let foreign_account = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO categories(user_id, name, kind) VALUES (2, 'Theirs', 'expense')",
            [],
        )
        .unwrap();
        let foreign_category = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO accounts(user_id, name, kind, parent_id) VALUES (1, 'Stray', 'asset', ?1)",
            [foreign_account],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO categories(user_id, name, kind, parent_id) VALUES (1, 'Stray', 'expense', ?1)",
            [foreign_category],
        )
        .unwrap();
        (foreign_account, foreign_category)
    };

    let accounts = b.ledger.balance_tree(TreeKind::Account, None).unwrap();
    assert!(accounts.get(foreign_account).is_none());
    let stray = accounts.nodes().find(|n| n.name == "Stray").unwrap();
    assert_eq!(stray.parent_id, None);
    assert!(accounts.roots().any(|n| n.id == stray.id));
    assert_eq!(accounts.len(), 3);

    let categories = b.ledger.balance_tree(TreeKind::Category, None).unwrap();
    assert!(categories.get(foreign_category).is_none());
    let stray = categories.nodes().find(|n| n.name == "Stray").unwrap();
    assert_eq!(stray.parent_id, None);
    assert!(categories.roots().any(|n| n.id == stray.id));
}
