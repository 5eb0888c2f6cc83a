// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use super::{required, window};
use crate::balance::TreeKind;
use crate::ledger::Ledger;
use crate::utils::{fmt_amount, id_for_account, maybe_print_json, parse_date, pretty_table};

pub fn handle(ledger: &Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("balances", sub)) => balances(ledger, sub)?,
        Some(("running", sub)) => running(ledger, sub)?,
        Some(("summary", sub)) => summary(ledger, sub)?,
        _ => {}
    }
    Ok(())
}

fn as_of(sub: &clap::ArgMatches) -> Result<Option<chrono::NaiveDate>> {
    sub.get_one::<String>("as-of")
        .map(|s| parse_date(s))
        .transpose()
}

fn balances(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let kind = match sub.get_one::<String>("tree").map(String::as_str) {
        Some("category") => TreeKind::Category,
        _ => TreeKind::Account,
    };
    let tree = ledger.balance_tree(kind, as_of(sub)?)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &tree.to_views())? {
        return Ok(());
    }
    let rows = tree
        .walk()
        .into_iter()
        .map(|(depth, n)| {
            vec![
                format!("{}{}", "  ".repeat(depth), n.name),
                n.class.as_str().to_string(),
                fmt_amount(n.own_balance),
                fmt_amount(n.subtree_balance),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Name", "Class", "Own", "Subtree"], rows)
    );
    Ok(())
}

fn running(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let account_id = id_for_account(ledger, required(sub, "account")?)?;
    let entries = ledger.running_balances(account_id, &window(sub)?)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &entries)? {
        return Ok(());
    }
    let rows = entries
        .iter()
        .map(|e| {
            let t = &e.transaction;
            vec![
                t.date.to_string(),
                t.id.to_string(),
                t.kind.to_string(),
                t.description.clone(),
                fmt_amount(t.amount),
                fmt_amount(e.balance_after),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Date", "Id", "Kind", "Description", "Amount", "Balance"],
            rows
        )
    );
    Ok(())
}

fn summary(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let s = ledger.summary(as_of(sub)?)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &s)? {
        return Ok(());
    }
    let rows = vec![
        vec!["Assets".into(), fmt_amount(s.total_assets)],
        vec!["Liabilities".into(), fmt_amount(s.total_liabilities)],
        vec!["Income".into(), fmt_amount(s.total_income)],
        vec!["Expenses".into(), fmt_amount(s.total_expenses)],
        vec!["Net worth".into(), fmt_amount(s.net_worth)],
        vec!["Net income".into(), fmt_amount(s.net_income)],
    ];
    println!("{}", pretty_table(&["", "Total"], rows));
    if !s.balanced {
        println!("Net worth and net income differ by {}", fmt_amount(s.net_worth - s.net_income));
    }
    Ok(())
}
