// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Tenant provisioning across the central store and a shard.
//!
//! The two stores share no transaction. The tenant row is committed first;
//! if seeding the shard then fails, the row is deleted again so the tenant
//! never exists without its default ledger. When that cleanup fails too the
//! caller gets [`LedgerError::Inconsistent`] and an error-level log entry.

use chrono::{DateTime, Utc};
use rand::Rng;
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::directory::{self, normalize_email};
use crate::error::{LedgerError, Result};
use crate::ledger::accounts;
use crate::ledger::hierarchy::{self, Table};
use crate::models::{AccountKind, CategoryKind, ShardId, Tenant, TenantId, TenantRef};
use crate::router::ShardRouter;
use crate::verification::{self, LogVerificationSender, VerificationSender};

pub const DEFAULT_ACCOUNTS: &[(&str, AccountKind)] = &[
    ("Cash", AccountKind::Asset),
    ("Bank", AccountKind::Asset),
    ("Credit Card", AccountKind::Liability),
];

pub const DEFAULT_CATEGORIES: &[(&str, CategoryKind)] = &[
    ("Salary", CategoryKind::Income),
    ("Bonus", CategoryKind::Income),
    ("Investment", CategoryKind::Income),
    ("Other", CategoryKind::Income),
    ("Food", CategoryKind::Expense),
    ("Transport", CategoryKind::Expense),
    ("Entertainment", CategoryKind::Expense),
    ("Shopping", CategoryKind::Expense),
    ("Housing", CategoryKind::Expense),
    ("Medical", CategoryKind::Expense),
];

/// Picks the shard a new tenant is pinned to.
pub trait ShardSelector: Send + Sync {
    fn select(&self, shard_count: u32) -> ShardId;
}

/// Uniform random choice over `0..shard_count`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomShardSelector;

impl ShardSelector for RandomShardSelector {
    fn select(&self, shard_count: u32) -> ShardId {
        ShardId(rand::thread_rng().gen_range(0..shard_count.max(1)))
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub name: String,
    /// Already hashed by the caller; stored as-is.
    pub credential_hash: String,
}

impl Registration {
    fn validate(&self) -> Result<()> {
        let email = normalize_email(&self.email);
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => {
                return Err(LedgerError::invariant(format!(
                    "invalid email address: {}",
                    self.email
                )));
            }
        }
        if self.name.trim().chars().count() < 2 {
            return Err(LedgerError::invariant(
                "name must be at least 2 characters",
            ));
        }
        if self.credential_hash.is_empty() {
            return Err(LedgerError::invariant("credential hash must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A new tenant was created and its default ledger seeded.
    Created(TenantRef),
    /// The identity already existed unverified; credentials were refreshed
    /// and a new verification artifact issued.
    Reissued {
        tenant: TenantRef,
        defaults_restored: bool,
    },
}

impl ProvisionOutcome {
    pub fn tenant(&self) -> TenantRef {
        match self {
            ProvisionOutcome::Created(tenant) => *tenant,
            ProvisionOutcome::Reissued { tenant, .. } => *tenant,
        }
    }
}

/// Seeds the default accounts and categories for `tenant` in one transaction.
/// A table the tenant already has rows in is left alone.
pub fn seed_defaults(conn: &Connection, tenant: TenantId) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    if hierarchy::count(&tx, Table::Accounts, tenant)? == 0 {
        for kind in AccountKind::ALL {
            let names = DEFAULT_ACCOUNTS.iter().filter(|(_, k)| k == kind);
            for (order, (name, _)) in names.enumerate() {
                hierarchy::insert(
                    &tx,
                    Table::Accounts,
                    tenant,
                    name,
                    kind.as_str(),
                    None,
                    order as i64,
                )?;
            }
        }
    }
    if hierarchy::count(&tx, Table::Categories, tenant)? == 0 {
        for kind in CategoryKind::ALL {
            let names = DEFAULT_CATEGORIES.iter().filter(|(_, k)| k == kind);
            for (order, (name, _)) in names.enumerate() {
                hierarchy::insert(
                    &tx,
                    Table::Categories,
                    tenant,
                    name,
                    kind.as_str(),
                    None,
                    order as i64,
                )?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

pub struct Provisioner<'a> {
    router: &'a ShardRouter,
    selector: Box<dyn ShardSelector + 'a>,
    sender: Box<dyn VerificationSender + 'a>,
}

impl<'a> Provisioner<'a> {
    pub fn new(router: &'a ShardRouter) -> Self {
        Self {
            router,
            selector: Box::new(RandomShardSelector),
            sender: Box::new(LogVerificationSender),
        }
    }

    pub fn with_selector(mut self, selector: impl ShardSelector + 'a) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn with_sender(mut self, sender: impl VerificationSender + 'a) -> Self {
        self.sender = Box::new(sender);
        self
    }

    pub fn provision_tenant(&self, registration: &Registration) -> Result<ProvisionOutcome> {
        self.provision_tenant_at(registration, Utc::now())
    }

    pub fn provision_tenant_at(
        &self,
        registration: &Registration,
        now: DateTime<Utc>,
    ) -> Result<ProvisionOutcome> {
        registration.validate()?;
        let email = normalize_email(&registration.email);
        let name = registration.name.trim();

        if let Some(existing) = self.router.directory().find_by_email(&email)? {
            if existing.is_verified() {
                return Err(LedgerError::Conflict(format!(
                    "identity {} is already registered",
                    email
                )));
            }
            return self.reissue(existing, name, &registration.credential_hash, now);
        }

        let shard = self.selector.select(self.router.shard_count());
        let tenant_id = {
            let conn = self.router.directory().central().lock()?;
            directory::insert_tenant(&conn, &email, name, &registration.credential_hash, shard)?
        };
        info!(%tenant_id, %shard, "tenant row committed");

        if let Err(cause) = self.seed_shard(tenant_id, shard) {
            return Err(self.compensate(tenant_id, cause));
        }
        info!(%tenant_id, %shard, "default ledger seeded");

        self.send_verification(&email, now);
        Ok(ProvisionOutcome::Created(TenantRef {
            tenant_id,
            shard_id: shard,
        }))
    }

    fn seed_shard(&self, tenant_id: TenantId, shard: ShardId) -> Result<()> {
        let handle = self.router.pool().connection_for(shard)?;
        let conn = handle.lock()?;
        seed_defaults(&conn, tenant_id)
    }

    fn compensate(&self, tenant_id: TenantId, cause: LedgerError) -> LedgerError {
        warn!(%tenant_id, error = %cause, "shard seeding failed, removing tenant row");
        let cleanup = self
            .router
            .directory()
            .central()
            .lock()
            .and_then(|conn| directory::delete_tenant(&conn, tenant_id));
        match cleanup {
            Ok(()) => {
                info!(%tenant_id, "tenant row removed");
                cause
            }
            Err(cleanup) => {
                error!(
                    %tenant_id,
                    cause = %cause,
                    cleanup = %cleanup,
                    "tenant row left without a ledger, manual cleanup required"
                );
                LedgerError::Inconsistent {
                    tenant_id,
                    cause: cause.to_string(),
                    cleanup: cleanup.to_string(),
                }
            }
        }
    }

    /// Unverified re-registration: refresh credentials, restore the default
    /// ledger if an earlier attempt left the shard empty, reissue the artifact.
    fn reissue(
        &self,
        existing: Tenant,
        name: &str,
        credential_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ProvisionOutcome> {
        let tenant = existing.tenant_ref();
        {
            let conn = self.router.directory().central().lock()?;
            directory::update_credentials(&conn, tenant.tenant_id, name, credential_hash)?;
        }

        let handle = self.router.pool().connection_for(tenant.shard_id)?;
        let defaults_restored = {
            let conn = handle.lock()?;
            if accounts::count(&conn, tenant.tenant_id)? == 0 {
                warn!(tenant_id = %tenant.tenant_id, shard = %tenant.shard_id, "no accounts on shard, seeding defaults again");
                seed_defaults(&conn, tenant.tenant_id)?;
                true
            } else {
                false
            }
        };

        self.send_verification(&existing.email, now);
        info!(tenant_id = %tenant.tenant_id, defaults_restored, "verification reissued");
        Ok(ProvisionOutcome::Reissued {
            tenant,
            defaults_restored,
        })
    }

    /// Issues and delivers an artifact. Failures here are logged only.
    fn send_verification(&self, email: &str, now: DateTime<Utc>) {
        let issued = self
            .router
            .directory()
            .central()
            .lock()
            .and_then(|conn| verification::issue(&conn, email, now));
        let artifact = match issued {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(email, error = %e, "could not issue verification artifact");
                return;
            }
        };
        if let Err(e) = self.sender.send(&artifact) {
            warn!(email, error = %e, "could not deliver verification artifact");
        }
    }
}
