// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow, bail};

use super::{order_pairs, required};
use crate::ledger::Ledger;
use crate::models::CategoryKind;
use crate::utils::{id_for_category, maybe_print_json, pretty_table};

pub fn handle(ledger: &Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = required(sub, "name")?;
            let kind: CategoryKind = required(sub, "kind")?.parse().map_err(|e| anyhow!("{e}"))?;
            let parent = sub
                .get_one::<String>("parent")
                .map(|p| id_for_category(ledger, p))
                .transpose()?;
            let c = ledger.create_category(name, kind, parent)?;
            println!("Added category '{}' (#{}, {})", c.name, c.id, c.kind);
        }
        Some(("rename", sub)) => {
            let id = id_for_category(ledger, required(sub, "key")?)?;
            let name = required(sub, "name")?;
            ledger.rename_category(id, name)?;
            println!("Renamed category #{} to '{}'", id, name.trim());
        }
        Some(("rm", sub)) => {
            let key = required(sub, "key")?;
            let id = id_for_category(ledger, key)?;
            if !ledger.can_delete_category(id)? {
                bail!("Category '{}' has transactions or subcategories", key);
            }
            ledger.delete_category(id)?;
            println!("Removed category '{}'", key);
        }
        Some(("reorder", sub)) => {
            let n = ledger.reorder_categories(&order_pairs(sub)?)?;
            println!("Reordered {} categories", n);
        }
        Some(("list", sub)) => {
            let data = ledger.categories()?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|c| {
                        vec![
                            c.id.to_string(),
                            c.name,
                            c.kind.to_string(),
                            c.parent_id.map(|p| p.to_string()).unwrap_or_default(),
                            c.sort_order.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Id", "Name", "Kind", "Parent", "Order"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}
