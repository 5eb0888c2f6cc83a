// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use shardbook::db::{self, DbHandle};
use shardbook::ledger::transactions::TransactionFilter;
use shardbook::models::{
    AccountKind, CategoryKind, DateRange, NewTransaction, OrderUpdate, TenantId, TransactionKind,
    TransactionPatch,
};
use shardbook::{Ledger, LedgerError};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn setup() -> (Ledger, Ledger) {
    let conn = Connection::open_in_memory().unwrap();
    db::init_shard_schema(&conn).unwrap();
    let handle = DbHandle::new("shard-test", conn);
    (
        Ledger::new(TenantId(1), handle.clone()),
        Ledger::new(TenantId(2), handle),
    )
}

fn expense(account_id: i64, amount: i64, date: &str) -> NewTransaction {
    NewTransaction {
        description: "Spend".to_string(),
        amount,
        date: d(date),
        kind: TransactionKind::Expense,
        account_id,
        to_account_id: None,
        category_id: None,
    }
}

fn is_invariant<T: std::fmt::Debug>(r: Result<T, LedgerError>) -> bool {
    matches!(r, Err(LedgerError::Invariant(_)))
}

#[test]
fn siblings_are_ordered_on_create() {
    let (l, _) = setup();
    let cash = l.create_account("Cash", AccountKind::Asset, None).unwrap();
    let bank = l.create_account("Bank", AccountKind::Asset, None).unwrap();
    let card = l.create_account("Card", AccountKind::Liability, None).unwrap();
    let wallet = l
        .create_account("Wallet", AccountKind::Asset, Some(cash.id))
        .unwrap();
    assert_eq!(cash.sort_order, 0);
    assert_eq!(bank.sort_order, 1);
    assert_eq!(card.sort_order, 0);
    assert_eq!(wallet.sort_order, 0);
}

#[test]
fn account_parent_must_share_kind() {
    let (l, _) = setup();
    let cash = l.create_account("Cash", AccountKind::Asset, None).unwrap();
    assert!(is_invariant(l.create_account(
        "Loan",
        AccountKind::Liability,
        Some(cash.id)
    )));
}

#[test]
fn foreign_parent_is_not_found() {
    let (a, b) = setup();
    let cash = a.create_account("Cash", AccountKind::Asset, None).unwrap();
    let err = b
        .create_account("Sneaky", AccountKind::Asset, Some(cash.id))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[test]
fn duplicate_name_conflicts_per_tenant() {
    let (a, b) = setup();
    a.create_account("Cash", AccountKind::Asset, None).unwrap();
    let err = a.create_account("Cash", AccountKind::Asset, None).unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)), "got {err:?}");
    // another tenant on the same shard may reuse it
    b.create_account("Cash", AccountKind::Asset, None).unwrap();
}

#[test]
fn delete_refuses_referenced_or_parent_rows() {
    let (l, _) = setup();
    let cash = l.create_account("Cash", AccountKind::Asset, None).unwrap();
    let wallet = l
        .create_account("Wallet", AccountKind::Asset, Some(cash.id))
        .unwrap();
    let food = l
        .create_category("Food", CategoryKind::Expense, None)
        .unwrap();
    let mut tx = expense(wallet.id, 20, "2024-03-01");
    tx.category_id = Some(food.id);
    let tx = l.create_transaction(&tx).unwrap();

    assert!(!l.can_delete_account(cash.id).unwrap());
    assert!(is_invariant(l.delete_account(cash.id)));
    assert!(!l.can_delete_account(wallet.id).unwrap());
    assert!(is_invariant(l.delete_account(wallet.id)));
    assert!(!l.can_delete_category(food.id).unwrap());
    assert!(is_invariant(l.delete_category(food.id)));

    l.delete_transaction(tx.id).unwrap();
    assert!(l.can_delete_category(food.id).unwrap());
    l.delete_category(food.id).unwrap();
    l.delete_account(wallet.id).unwrap();
    l.delete_account(cash.id).unwrap();
    assert!(l.accounts().unwrap().is_empty());
}

#[test]
fn transfer_destination_blocks_delete() {
    let (l, _) = setup();
    let cash = l.create_account("Cash", AccountKind::Asset, None).unwrap();
    let bank = l.create_account("Bank", AccountKind::Asset, None).unwrap();
    l.create_transaction(&NewTransaction {
        kind: TransactionKind::Transfer,
        to_account_id: Some(bank.id),
        ..expense(cash.id, 50, "2024-03-02")
    })
    .unwrap();
    assert!(is_invariant(l.delete_account(bank.id)));
}

#[test]
fn reorder_skips_foreign_rows() {
    let (a, b) = setup();
    let cash = a.create_account("Cash", AccountKind::Asset, None).unwrap();
    let bank = a.create_account("Bank", AccountKind::Asset, None).unwrap();
    let theirs = b.create_account("Theirs", AccountKind::Asset, None).unwrap();

    let n = a
        .reorder_accounts(&[
            OrderUpdate { id: cash.id, order: 1 },
            OrderUpdate { id: bank.id, order: 0 },
            OrderUpdate { id: theirs.id, order: 9 },
        ])
        .unwrap();
    assert_eq!(n, 2);
    let names: Vec<_> = a.accounts().unwrap().into_iter().map(|x| x.name).collect();
    assert_eq!(names, vec!["Bank", "Cash"]);
    assert_eq!(b.account(theirs.id).unwrap().sort_order, 0);
}

#[test]
fn transaction_field_rules() {
    let (l, _) = setup();
    let cash = l.create_account("Cash", AccountKind::Asset, None).unwrap();
    let bank = l.create_account("Bank", AccountKind::Asset, None).unwrap();
    let food = l
        .create_category("Food", CategoryKind::Expense, None)
        .unwrap();

    assert!(is_invariant(l.create_transaction(&NewTransaction {
        description: "  ".into(),
        ..expense(cash.id, 1, "2024-01-01")
    })));
    assert!(is_invariant(
        l.create_transaction(&expense(cash.id, -1, "2024-01-01"))
    ));
    let transfer = NewTransaction {
        kind: TransactionKind::Transfer,
        ..expense(cash.id, 10, "2024-01-01")
    };
    assert!(is_invariant(l.create_transaction(&transfer)));
    assert!(is_invariant(l.create_transaction(&NewTransaction {
        to_account_id: Some(cash.id),
        ..transfer.clone()
    })));
    assert!(is_invariant(l.create_transaction(&NewTransaction {
        to_account_id: Some(bank.id),
        category_id: Some(food.id),
        ..transfer.clone()
    })));
    assert!(is_invariant(l.create_transaction(&NewTransaction {
        to_account_id: Some(bank.id),
        ..expense(cash.id, 10, "2024-01-01")
    })));

    let zero = l.create_transaction(&expense(cash.id, 0, "2024-01-01")).unwrap();
    assert_eq!(zero.amount, 0);
    assert_eq!(l.transactions(&TransactionFilter::default()).unwrap().len(), 1);
}

#[test]
fn foreign_references_are_not_found() {
    let (a, b) = setup();
    let mine = a.create_account("Cash", AccountKind::Asset, None).unwrap();
    let theirs = b.create_account("Cash", AccountKind::Asset, None).unwrap();
    let their_cat = b
        .create_category("Food", CategoryKind::Expense, None)
        .unwrap();

    let err = a
        .create_transaction(&expense(theirs.id, 5, "2024-01-01"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
    let err = a
        .create_transaction(&NewTransaction {
            category_id: Some(their_cat.id),
            ..expense(mine.id, 5, "2024-01-01")
        })
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));

    let tx = a.create_transaction(&expense(mine.id, 5, "2024-01-01")).unwrap();
    assert!(matches!(
        b.transaction(tx.id),
        Err(LedgerError::NotFound { .. })
    ));
    assert!(matches!(
        b.delete_transaction(tx.id),
        Err(LedgerError::NotFound { .. })
    ));
    let filter = TransactionFilter {
        account_id: Some(mine.id),
        ..Default::default()
    };
    assert!(matches!(
        b.transactions(&filter),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn update_revalidates_merged_row() {
    let (l, _) = setup();
    let cash = l.create_account("Cash", AccountKind::Asset, None).unwrap();
    let bank = l.create_account("Bank", AccountKind::Asset, None).unwrap();
    let tx = l.create_transaction(&expense(cash.id, 40, "2024-04-01")).unwrap();

    let to_transfer = TransactionPatch {
        kind: Some(TransactionKind::Transfer),
        ..Default::default()
    };
    assert!(is_invariant(l.update_transaction(tx.id, &to_transfer)));
    assert_eq!(l.transaction(tx.id).unwrap(), tx);

    let ok = TransactionPatch {
        kind: Some(TransactionKind::Transfer),
        to_account_id: Some(Some(bank.id)),
        amount: Some(45),
        ..Default::default()
    };
    let updated = l.update_transaction(tx.id, &ok).unwrap();
    assert_eq!(updated.kind, TransactionKind::Transfer);
    assert_eq!(updated.to_account_id, Some(bank.id));
    assert_eq!(updated.amount, 45);
    assert_eq!(updated.description, tx.description);

    let back = TransactionPatch {
        kind: Some(TransactionKind::Income),
        to_account_id: Some(None),
        ..Default::default()
    };
    let income = l.update_transaction(tx.id, &back).unwrap();
    assert_eq!(income.to_account_id, None);
}

#[test]
fn batch_delete_counts_only_owned_rows() {
    let (a, b) = setup();
    let mine = a.create_account("Cash", AccountKind::Asset, None).unwrap();
    let theirs = b.create_account("Cash", AccountKind::Asset, None).unwrap();
    let t1 = a.create_transaction(&expense(mine.id, 1, "2024-01-01")).unwrap();
    let t2 = a.create_transaction(&expense(mine.id, 2, "2024-01-02")).unwrap();
    let t3 = b.create_transaction(&expense(theirs.id, 3, "2024-01-03")).unwrap();

    let removed = a.delete_transactions(&[t1.id, t2.id, t3.id, 424242]).unwrap();
    assert_eq!(removed, 2);
    assert!(b.transaction(t3.id).is_ok());
}

#[test]
fn list_filters_combine() {
    let (l, _) = setup();
    let cash = l.create_account("Cash", AccountKind::Asset, None).unwrap();
    let bank = l.create_account("Bank", AccountKind::Asset, None).unwrap();
    let food = l
        .create_category("Food", CategoryKind::Expense, None)
        .unwrap();
    l.create_transaction(&NewTransaction {
        category_id: Some(food.id),
        ..expense(cash.id, 10, "2024-05-01")
    })
    .unwrap();
    l.create_transaction(&expense(cash.id, 20, "2024-05-31")).unwrap();
    l.create_transaction(&expense(cash.id, 30, "2024-06-01")).unwrap();
    l.create_transaction(&NewTransaction {
        kind: TransactionKind::Transfer,
        to_account_id: Some(bank.id),
        ..expense(cash.id, 40, "2024-05-15")
    })
    .unwrap();

    let may = DateRange::new(Some(d("2024-05-01")), Some(d("2024-06-01")));
    let rows = l
        .transactions(&TransactionFilter {
            range: may,
            ..Default::default()
        })
        .unwrap();
    let amounts: Vec<_> = rows.iter().map(|r| r.transaction.amount).collect();
    assert_eq!(amounts, vec![20, 40, 10]);

    let by_bank = l
        .transactions(&TransactionFilter {
            account_id: Some(bank.id),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_bank.len(), 1);
    assert_eq!(by_bank[0].to_account.as_deref(), Some("Bank"));

    let by_food = l
        .transactions(&TransactionFilter {
            category_id: Some(food.id),
            range: may,
            limit: Some(5),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_food.len(), 1);
    assert_eq!(by_food[0].category.as_deref(), Some("Food"));
}

#[test]
fn rename_trims_and_rejects_blank() {
    let (l, other) = setup();
    let cash = l.create_account("Cash", AccountKind::Asset, None).unwrap();
    l.rename_account(cash.id, "  Petty cash ").unwrap();
    assert_eq!(l.account_by_name("Petty cash").unwrap().id, cash.id);
    assert!(is_invariant(l.rename_account(cash.id, "   ")));
    assert!(matches!(
        other.rename_account(cash.id, "Mine"),
        Err(LedgerError::NotFound { .. })
    ));
}
