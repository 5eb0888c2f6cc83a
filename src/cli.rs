// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, ArgGroup, Command, value_parser};

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    ]
}

fn tree_command(name: &'static str, entity: &'static str, kinds: [&'static str; 2]) -> Command {
    Command::new(name)
        .about(format!("Manage {} hierarchy", entity))
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about(format!("Add a {}", entity))
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .value_parser(kinds),
                )
                .arg(
                    Arg::new("parent")
                        .long("parent")
                        .help("Parent id or name"),
                ),
        )
        .subcommand(
            Command::new("rename")
                .about(format!("Rename a {}", entity))
                .arg(Arg::new("key").required(true).help("Id or name"))
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("rm")
                .about(format!("Delete an unused leaf {}", entity))
                .arg(Arg::new("key").required(true).help("Id or name")),
        )
        .subcommand(
            Command::new("reorder")
                .about("Set sibling order, given as id=order pairs")
                .arg(
                    Arg::new("pairs")
                        .required(true)
                        .num_args(1..)
                        .value_name("ID=ORDER"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about(format!("List {} rows", entity))
                .args(json_args()),
        )
}

pub fn build_cli() -> Command {
    Command::new("shardbook")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Multi-tenant double-entry ledger over sharded SQLite stores")
        .arg(
            Arg::new("tenant")
                .long("tenant")
                .global(true)
                .value_parser(value_parser!(i64))
                .help("Acting tenant id"),
        )
        .arg(
            Arg::new("shard")
                .long("shard")
                .global(true)
                .value_parser(value_parser!(u32))
                .help("Shard hint for the acting tenant; skips the directory lookup"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("init").about("Create the central and shard stores"))
        .subcommand(
            Command::new("tenant")
                .about("Register and verify tenants")
                .subcommand_required(true)
                .subcommand(
                    Command::new("register")
                        .about("Provision a tenant and its default ledger")
                        .arg(Arg::new("email").required(true))
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("credential")
                                .long("credential")
                                .required(true)
                                .help("Pre-hashed credential"),
                        ),
                )
                .subcommand(
                    Command::new("verify")
                        .about("Verify with a link token")
                        .arg(Arg::new("token").required(true)),
                )
                .subcommand(
                    Command::new("verify-code")
                        .about("Verify with the numeric code")
                        .arg(Arg::new("email").required(true))
                        .arg(Arg::new("code").required(true)),
                )
                .subcommand(
                    Command::new("show")
                        .about("Show a tenant by email or by --tenant")
                        .arg(Arg::new("email"))
                        .args(json_args()),
                ),
        )
        .subcommand(tree_command("account", "account", ["asset", "liability"]))
        .subcommand(tree_command("category", "category", ["income", "expense"]))
        .subcommand(
            Command::new("tx")
                .about("Record and query transactions")
                .subcommand_required(true)
                .subcommand(
                    Command::new("add")
                        .about("Record a transaction")
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .value_parser(["income", "expense", "transfer"]),
                        )
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .required(true)
                                .help("Smallest currency unit"),
                        )
                        .arg(Arg::new("description").long("description").required(true))
                        .arg(Arg::new("to").long("to").help("Transfer destination"))
                        .arg(Arg::new("category").long("category")),
                )
                .subcommand(
                    Command::new("edit")
                        .about("Change fields of a transaction")
                        .arg(
                            Arg::new("id")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .value_parser(["income", "expense", "transfer"]),
                        )
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("to").long("to"))
                        .arg(
                            Arg::new("clear-to")
                                .long("clear-to")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("to"),
                        )
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("clear-category")
                                .long("clear-category")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("category"),
                        ),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Delete transactions")
                        .arg(
                            Arg::new("ids")
                                .required(true)
                                .num_args(1..)
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .about("List transactions, newest first")
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("period")
                                .long("period")
                                .conflicts_with("to")
                                .help("YYYY or YYYY-MM"),
                        )
                        .arg(Arg::new("from").long("from").help("Inclusive start date"))
                        .arg(Arg::new("to").long("to").help("Exclusive end date"))
                        .group(
                            ArgGroup::new("window")
                                .args(["period", "from"])
                                .multiple(false),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        )
                        .args(json_args()),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Balances and summaries")
                .subcommand_required(true)
                .subcommand(
                    Command::new("balances")
                        .about("Hierarchical balances")
                        .arg(
                            Arg::new("tree")
                                .long("tree")
                                .default_value("account")
                                .value_parser(["account", "category"]),
                        )
                        .arg(Arg::new("as-of").long("as-of").help("Inclusive cutoff date"))
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("running")
                        .about("Running balance of one account")
                        .arg(Arg::new("account").required(true))
                        .arg(Arg::new("period").long("period").conflicts_with("to"))
                        .arg(Arg::new("from").long("from"))
                        .arg(Arg::new("to").long("to"))
                        .group(
                            ArgGroup::new("window")
                                .args(["period", "from"])
                                .multiple(false),
                        )
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("summary")
                        .about("Totals per class and net worth")
                        .arg(Arg::new("as-of").long("as-of"))
                        .args(json_args()),
                ),
        )
}
