// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};

use super::{required, window};
use crate::ledger::Ledger;
use crate::ledger::transactions::{TransactionFilter, TransactionRow};
use crate::models::{NewTransaction, TransactionKind, TransactionPatch};
use crate::utils::{
    fmt_amount, id_for_account, id_for_category, maybe_print_json, parse_amount, parse_date,
    pretty_table,
};

pub fn handle(ledger: &Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(ledger, sub)?,
        Some(("edit", sub)) => edit(ledger, sub)?,
        Some(("rm", sub)) => rm(ledger, sub)?,
        Some(("list", sub)) => list(ledger, sub)?,
        _ => {}
    }
    Ok(())
}

fn parse_kind(s: &str) -> Result<TransactionKind> {
    s.parse().map_err(|e| anyhow!("{e}"))
}

fn add(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let new = NewTransaction {
        description: required(sub, "description")?.to_string(),
        amount: parse_amount(required(sub, "amount")?)?,
        date: parse_date(required(sub, "date")?)?,
        kind: parse_kind(required(sub, "kind")?)?,
        account_id: id_for_account(ledger, required(sub, "account")?)?,
        to_account_id: sub
            .get_one::<String>("to")
            .map(|s| id_for_account(ledger, s))
            .transpose()?,
        category_id: sub
            .get_one::<String>("category")
            .map(|s| id_for_category(ledger, s))
            .transpose()?,
    };
    let t = ledger.create_transaction(&new)?;
    println!(
        "Recorded {} {} on {} (#{})",
        t.kind,
        fmt_amount(t.amount),
        t.date,
        t.id
    );
    Ok(())
}

fn edit(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub
        .get_one::<i64>("id")
        .ok_or_else(|| anyhow!("Missing argument 'id'"))?;
    let to_account_id = if sub.get_flag("clear-to") {
        Some(None)
    } else {
        sub.get_one::<String>("to")
            .map(|s| id_for_account(ledger, s).map(Some))
            .transpose()?
    };
    let category_id = if sub.get_flag("clear-category") {
        Some(None)
    } else {
        sub.get_one::<String>("category")
            .map(|s| id_for_category(ledger, s).map(Some))
            .transpose()?
    };
    let patch = TransactionPatch {
        description: sub.get_one::<String>("description").cloned(),
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_amount(s))
            .transpose()?,
        date: sub
            .get_one::<String>("date")
            .map(|s| parse_date(s))
            .transpose()?,
        kind: sub
            .get_one::<String>("kind")
            .map(|s| parse_kind(s))
            .transpose()?,
        account_id: sub
            .get_one::<String>("account")
            .map(|s| id_for_account(ledger, s))
            .transpose()?,
        to_account_id,
        category_id,
    };
    let t = ledger.update_transaction(id, &patch)?;
    println!(
        "Updated #{}: {} {} on {}",
        t.id,
        t.kind,
        fmt_amount(t.amount),
        t.date
    );
    Ok(())
}

fn rm(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let ids: Vec<i64> = sub.get_many::<i64>("ids").into_iter().flatten().copied().collect();
    if let [id] = ids.as_slice() {
        ledger.delete_transaction(*id)?;
        println!("Removed transaction #{}", id);
    } else {
        let n = ledger.delete_transactions(&ids)?;
        println!("Removed {} of {} transaction(s)", n, ids.len());
    }
    Ok(())
}

fn list(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(ledger, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                let t = &r.transaction;
                let account = match &r.to_account {
                    Some(to) => format!("{} -> {}", r.account, to),
                    None => r.account.clone(),
                };
                vec![
                    t.id.to_string(),
                    t.date.to_string(),
                    t.kind.to_string(),
                    account,
                    t.description.clone(),
                    fmt_amount(t.amount),
                    r.category.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Kind", "Account", "Description", "Amount", "Category"],
                rows,
            )
        );
    }
    Ok(())
}

pub fn query_rows(ledger: &Ledger, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let filter = TransactionFilter {
        account_id: sub
            .get_one::<String>("account")
            .map(|s| id_for_account(ledger, s))
            .transpose()?,
        category_id: sub
            .get_one::<String>("category")
            .map(|s| id_for_category(ledger, s))
            .transpose()?,
        range: window(sub)?,
        limit: sub.get_one::<usize>("limit").copied(),
    };
    Ok(ledger.transactions(&filter)?)
}
