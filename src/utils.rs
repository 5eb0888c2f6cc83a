// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Datelike, NaiveDate};
use comfy_table::{Cell, Table, presets::UTF8_FULL};

use crate::ledger::Ledger;
use crate::models::{AccountId, CategoryId, DateRange};

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// `YYYY` or `YYYY-MM` to the half-open range covering it.
pub fn parse_period(s: &str) -> Result<DateRange> {
    let s = s.trim();
    let (start, end) = match s.split_once('-') {
        None => {
            let y: i32 = s
                .parse()
                .with_context(|| format!("Invalid period '{}', expected YYYY or YYYY-MM", s))?;
            (
                NaiveDate::from_ymd_opt(y, 1, 1),
                NaiveDate::from_ymd_opt(y + 1, 1, 1),
            )
        }
        Some(_) => {
            let start = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
                .with_context(|| format!("Invalid period '{}', expected YYYY or YYYY-MM", s))?;
            (Some(start), next_month(start))
        }
    };
    match (start, end) {
        (Some(start), Some(end)) => Ok(DateRange::new(Some(start), Some(end))),
        _ => Err(anyhow!("Period '{}' is out of range", s)),
    }
}

fn next_month(d: NaiveDate) -> Option<NaiveDate> {
    if d.month() == 12 {
        NaiveDate::from_ymd_opt(d.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(d.year(), d.month() + 1, 1)
    }
}

/// Amounts are entered in the smallest currency unit.
pub fn parse_amount(s: &str) -> Result<i64> {
    let v: i64 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid amount '{}', expected a whole number", s))?;
    if v < 0 {
        bail!("Amount must not be negative, got {}", v);
    }
    Ok(v)
}

/// Renders minor units with two decimals, e.g. `-1250` as `-12.50`.
pub fn fmt_amount(v: i64) -> String {
    let sign = if v < 0 { "-" } else { "" };
    let abs = v.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

/// Accepts either a numeric id or an account name.
pub fn id_for_account(ledger: &Ledger, key: &str) -> Result<AccountId> {
    let account = match key.trim().parse::<i64>() {
        Ok(id) => ledger.account(id),
        Err(_) => ledger.account_by_name(key),
    }
    .with_context(|| format!("Account '{}' not found", key))?;
    Ok(account.id)
}

/// Accepts either a numeric id or a category name.
pub fn id_for_category(ledger: &Ledger, key: &str) -> Result<CategoryId> {
    let category = match key.trim().parse::<i64>() {
        Ok(id) => ledger.category(id),
        Err(_) => ledger.category_by_name(key),
    }
    .with_context(|| format!("Category '{}' not found", key))?;
    Ok(category.id)
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // arrays stream one element per line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
