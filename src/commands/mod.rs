// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod categories;
pub mod reports;
pub mod tenants;
pub mod transactions;

use anyhow::{Context, Result, bail};
use clap::ArgMatches;

use crate::ledger::Ledger;
use crate::models::{DateRange, OrderUpdate, ShardId, TenantId};
use crate::router::{ShardRouter, TenantContext};
use crate::utils::{parse_date, parse_period};

/// Builds the acting tenant from the global `--tenant`/`--shard` flags.
pub fn tenant_context(m: &ArgMatches) -> Result<TenantContext> {
    let tenant = m
        .get_one::<i64>("tenant")
        .copied()
        .context("--tenant is required for this command")?;
    let shard = m.get_one::<u32>("shard").copied().map(ShardId);
    Ok(TenantContext::new(TenantId(tenant), shard))
}

pub fn ledger_for(router: &ShardRouter, m: &ArgMatches) -> Result<Ledger> {
    let ctx = tenant_context(m)?;
    Ok(router.ledger_for(&ctx)?)
}

pub(crate) fn required<'a>(m: &'a ArgMatches, id: &str) -> Result<&'a str> {
    m.get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("Missing argument '{}'", id))
}

/// Parses `id=order` pairs from a reorder command.
pub(crate) fn order_pairs(m: &ArgMatches) -> Result<Vec<OrderUpdate>> {
    let mut out = Vec::new();
    for raw in m.get_many::<String>("pairs").into_iter().flatten() {
        let (id, order) = raw
            .split_once('=')
            .with_context(|| format!("Invalid pair '{}', expected ID=ORDER", raw))?;
        out.push(OrderUpdate {
            id: id
                .trim()
                .parse()
                .with_context(|| format!("Invalid id in '{}'", raw))?,
            order: order
                .trim()
                .parse()
                .with_context(|| format!("Invalid order in '{}'", raw))?,
        });
    }
    Ok(out)
}

/// Date window from `--period` or `--from`/`--to`.
pub(crate) fn window(m: &ArgMatches) -> Result<DateRange> {
    if let Some(period) = m.get_one::<String>("period") {
        return parse_period(period);
    }
    let start = m.get_one::<String>("from").map(|s| parse_date(s)).transpose()?;
    let end = m.get_one::<String>("to").map(|s| parse_date(s)).transpose()?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            bail!("--from {} is after --to {}", s, e);
        }
    }
    Ok(DateRange::new(start, end))
}
