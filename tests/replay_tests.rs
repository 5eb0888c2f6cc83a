// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use shardbook::balance::TreeKind;
use shardbook::db::{self, DbHandle};
use shardbook::models::{
    AccountKind, DateRange, NewTransaction, TenantId, Transaction, TransactionKind,
};
use shardbook::replay;
use shardbook::{Ledger, LedgerError};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn setup() -> (Ledger, i64, i64) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_shard_schema(&conn).unwrap();
    let ledger = Ledger::new(TenantId(1), DbHandle::new("test", conn));
    let cash = ledger.create_account("Cash", AccountKind::Asset, None).unwrap().id;
    let card = ledger
        .create_account("CreditCard", AccountKind::Liability, None)
        .unwrap()
        .id;
    record(&ledger, "Paycheck", 1000, "2024-01-05", TransactionKind::Income, cash, None);
    record(&ledger, "Groceries", 200, "2024-01-10", TransactionKind::Expense, cash, None);
    record(&ledger, "Card payment", 150, "2024-01-15", TransactionKind::Transfer, cash, Some(card));
    (ledger, cash, card)
}

fn record(
    ledger: &Ledger,
    description: &str,
    amount: i64,
    date: &str,
    kind: TransactionKind,
    account_id: i64,
    to_account_id: Option<i64>,
) -> Transaction {
    ledger
        .create_transaction(&NewTransaction {
            description: description.to_string(),
            amount,
            date: d(date),
            kind,
            account_id,
            to_account_id,
            category_id: None,
        })
        .unwrap()
}

fn balances(entries: &[replay::RunningEntry]) -> Vec<(NaiveDate, i64)> {
    entries
        .iter()
        .map(|e| (e.transaction.date, e.balance_after))
        .collect()
}

#[test]
fn replays_full_history() {
    let (ledger, cash, card) = setup();
    let entries = ledger.running_balances(cash, &DateRange::all()).unwrap();
    assert_eq!(
        balances(&entries),
        vec![
            (d("2024-01-05"), 1000),
            (d("2024-01-10"), 800),
            (d("2024-01-15"), 650),
        ]
    );

    let card_entries = ledger.running_balances(card, &DateRange::all()).unwrap();
    assert_eq!(balances(&card_entries), vec![(d("2024-01-15"), 150)]);
}

#[test]
fn range_start_carries_opening_balance() {
    let (ledger, cash, _) = setup();
    let range = DateRange::new(Some(d("2024-01-10")), Some(d("2024-01-15")));
    let entries = ledger.running_balances(cash, &range).unwrap();
    // start is inclusive, end is exclusive
    assert_eq!(balances(&entries), vec![(d("2024-01-10"), 800)]);

    let tail = ledger
        .running_balances(cash, &DateRange::new(Some(d("2024-01-11")), None))
        .unwrap();
    assert_eq!(balances(&tail), vec![(d("2024-01-15"), 650)]);

    let empty = ledger
        .running_balances(cash, &DateRange::new(Some(d("2024-02-01")), Some(d("2024-03-01"))))
        .unwrap();
    assert!(empty.is_empty());
}

#[test]
fn last_entry_agrees_with_as_of_balance() {
    let (ledger, cash, _) = setup();
    for (start, end) in [
        ("2024-01-01", "2024-01-11"),
        ("2024-01-06", "2024-01-16"),
        ("2024-01-10", "2024-01-15"),
    ] {
        let range = DateRange::new(Some(d(start)), Some(d(end)));
        let entries = ledger.running_balances(cash, &range).unwrap();
        let last = entries.last().unwrap().balance_after;
        let tree = ledger
            .balance_tree(TreeKind::Account, Some(d(end) - Duration::days(1)))
            .unwrap();
        assert_eq!(last, tree.get(cash).unwrap().own_balance, "{start}..{end}");
    }
}

#[test]
fn same_day_entries_replay_by_id() {
    let (ledger, cash, _) = setup();
    let a = record(&ledger, "Coffee", 5, "2024-01-20", TransactionKind::Expense, cash, None);
    let b = record(&ledger, "Refund", 30, "2024-01-20", TransactionKind::Income, cash, None);
    let c = record(&ledger, "Lunch", 12, "2024-01-20", TransactionKind::Expense, cash, None);

    let range = DateRange::new(Some(d("2024-01-20")), None);
    let entries = ledger.running_balances(cash, &range).unwrap();
    let order: Vec<_> = entries.iter().map(|e| e.transaction.id).collect();
    assert_eq!(order, vec![a.id, b.id, c.id]);
    let running: Vec<_> = entries.iter().map(|e| e.balance_after).collect();
    assert_eq!(running, vec![645, 675, 663]);

    // input order does not matter to the pure replay
    let shuffled = vec![c.clone(), a.clone(), b.clone()];
    let replayed = replay::replay(650, shuffled, cash).unwrap();
    assert_eq!(replayed, entries);
}

#[test]
fn foreign_account_is_not_found() {
    let (ledger, cash, _) = setup();
    let other = Ledger::new(TenantId(2), ledger.handle().clone());
    let err = other.running_balances(cash, &DateRange::all()).unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[test]
fn inverted_range_is_rejected() {
    let (ledger, cash, _) = setup();
    let range = DateRange::new(Some(d("2024-02-01")), Some(d("2024-01-01")));
    let err = ledger.running_balances(cash, &range).unwrap_err();
    assert!(matches!(err, LedgerError::Invariant(_)));
}

#[test]
fn transfer_effects_by_side() {
    let (ledger, cash, card) = setup();
    let tx = ledger
        .transactions(&Default::default())
        .unwrap()
        .into_iter()
        .map(|row| row.transaction)
        .find(|t| t.kind == TransactionKind::Transfer)
        .unwrap();
    assert_eq!(replay::effect_on(&tx, cash), -150);
    assert_eq!(replay::effect_on(&tx, card), 150);
    assert_eq!(replay::effect_on(&tx, 9999), 0);
}

#[test]
fn overflowing_balance_is_an_error() {
    let tx = |id: i64, amount: i64, kind: TransactionKind| Transaction {
        id,
        description: format!("t{id}"),
        amount,
        date: d("2024-03-01"),
        kind,
        account_id: 1,
        to_account_id: None,
        category_id: None,
    };
    let near_max = vec![tx(1, i64::MAX - 10, TransactionKind::Income)];
    assert_eq!(
        replay::replay(10, near_max.clone(), 1).unwrap()[0].balance_after,
        i64::MAX
    );
    let err = replay::replay(11, near_max, 1).unwrap_err();
    assert!(matches!(err, LedgerError::Invariant(_)), "got {err:?}");

    let err = replay::replay(i64::MIN + 5, vec![tx(2, 6, TransactionKind::Expense)], 1).unwrap_err();
    assert!(matches!(err, LedgerError::Invariant(_)), "got {err:?}");
}
