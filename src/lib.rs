// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod balance;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod pool;
pub mod provision;
pub mod replay;
pub mod router;
pub mod utils;
pub mod verification;

pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use router::{ShardRouter, TenantContext};
