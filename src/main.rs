// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use shardbook::config::LedgerConfig;
use shardbook::router::ShardRouter;
use shardbook::{cli, commands, logging};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();
    logging::init(matches.get_flag("verbose"));

    let config = LedgerConfig::from_env()?;
    let router = ShardRouter::from_config(&config)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Central store at {}", config.central);
            for shard in router.pool().registered_shards() {
                let handle = router.pool().connection_for(shard)?;
                println!("{} ready, {} read connections", handle.label(), handle.reader_count());
            }
        }
        Some(("tenant", sub)) => commands::tenants::handle(&router, &matches, sub)?,
        Some(("account", sub)) => {
            let ledger = commands::ledger_for(&router, &matches)?;
            commands::accounts::handle(&ledger, sub)?
        }
        Some(("category", sub)) => {
            let ledger = commands::ledger_for(&router, &matches)?;
            commands::categories::handle(&ledger, sub)?
        }
        Some(("tx", sub)) => {
            let ledger = commands::ledger_for(&router, &matches)?;
            commands::transactions::handle(&ledger, sub)?
        }
        Some(("report", sub)) => {
            let ledger = commands::ledger_for(&router, &matches)?;
            commands::reports::handle(&ledger, sub)?
        }
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
