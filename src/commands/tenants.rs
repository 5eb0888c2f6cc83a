// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::{required, tenant_context};
use crate::models::Tenant;
use crate::provision::{ProvisionOutcome, Provisioner, Registration};
use crate::router::ShardRouter;
use crate::utils::{maybe_print_json, pretty_table};
use crate::verification;

/// `top` carries the global flags, `m` the `tenant` subcommand.
pub fn handle(router: &ShardRouter, top: &clap::ArgMatches, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("register", sub)) => {
            let registration = Registration {
                email: required(sub, "email")?.to_string(),
                name: required(sub, "name")?.to_string(),
                credential_hash: required(sub, "credential")?.to_string(),
            };
            match Provisioner::new(router).provision_tenant(&registration)? {
                ProvisionOutcome::Created(t) => {
                    println!("Registered tenant {} on {}", t.tenant_id, t.shard_id)
                }
                ProvisionOutcome::Reissued {
                    tenant,
                    defaults_restored,
                } => {
                    println!(
                        "Tenant {} is awaiting verification; a new code was issued",
                        tenant.tenant_id
                    );
                    if defaults_restored {
                        println!("Default accounts and categories were restored");
                    }
                }
            }
        }
        Some(("verify", sub)) => {
            let t = verification::verify_token(router.directory(), required(sub, "token")?, Utc::now())?;
            println!("Verified {} (tenant {})", t.email, t.id);
        }
        Some(("verify-code", sub)) => {
            let t = verification::verify_code(
                router.directory(),
                required(sub, "email")?,
                required(sub, "code")?,
                Utc::now(),
            )?;
            println!("Verified {} (tenant {})", t.email, t.id);
        }
        Some(("show", sub)) => {
            let tenant = match sub.get_one::<String>("email") {
                Some(email) => router
                    .directory()
                    .find_by_email(email)?
                    .with_context(|| format!("No tenant registered as '{}'", email))?,
                None => router.directory().tenant(tenant_context(top)?.tenant_id)?,
            };
            show(&tenant, sub)?;
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
struct TenantView<'a> {
    id: i64,
    email: &'a str,
    name: &'a str,
    shard: u32,
    verified_at: Option<String>,
}

fn show(t: &Tenant, sub: &clap::ArgMatches) -> Result<()> {
    let view = TenantView {
        id: t.id.0,
        email: &t.email,
        name: &t.name,
        shard: t.shard_id.0,
        verified_at: t.verified_at.map(|d| d.to_rfc3339()),
    };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &view)? {
        let rows = vec![vec![
            view.id.to_string(),
            view.email.to_string(),
            view.name.to_string(),
            t.shard_id.to_string(),
            view.verified_at.clone().unwrap_or_else(|| "pending".into()),
        ]];
        println!(
            "{}",
            pretty_table(&["Id", "Email", "Name", "Shard", "Verified"], rows)
        );
    }
    Ok(())
}
