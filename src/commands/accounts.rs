// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};

use super::{order_pairs, required};
use crate::ledger::Ledger;
use crate::models::AccountKind;
use crate::utils::{id_for_account, maybe_print_json, pretty_table};

pub fn handle(ledger: &Ledger, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = required(sub, "name")?;
            let kind: AccountKind = required(sub, "kind")?.parse().map_err(|e| anyhow!("{e}"))?;
            let parent = sub
                .get_one::<String>("parent")
                .map(|p| id_for_account(ledger, p))
                .transpose()?;
            let a = ledger.create_account(name, kind, parent)?;
            println!("Added account '{}' (#{}, {})", a.name, a.id, a.kind);
        }
        Some(("rename", sub)) => {
            let id = id_for_account(ledger, required(sub, "key")?)?;
            let name = required(sub, "name")?;
            ledger.rename_account(id, name)?;
            println!("Renamed account #{} to '{}'", id, name.trim());
        }
        Some(("rm", sub)) => {
            let key = required(sub, "key")?;
            let id = id_for_account(ledger, key)?;
            ledger.delete_account(id)?;
            println!("Removed account '{}'", key);
        }
        Some(("reorder", sub)) => {
            let n = ledger.reorder_accounts(&order_pairs(sub)?)?;
            println!("Reordered {} account(s)", n);
        }
        Some(("list", sub)) => {
            let data = ledger.accounts()?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|a| {
                        vec![
                            a.id.to_string(),
                            a.name,
                            a.kind.to_string(),
                            a.parent_id.map(|p| p.to_string()).unwrap_or_default(),
                            a.sort_order.to_string(),
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
