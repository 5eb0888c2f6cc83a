// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Verification artifacts: a link token plus a short numeric code, stored in
//! the central store. Delivery is left to a [`VerificationSender`].

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::directory::{self, ShardDirectory, normalize_email};
use crate::error::{LedgerError, Result};
use crate::models::Tenant;

/// How long an issued artifact stays valid.
pub fn token_ttl() -> Duration {
    Duration::hours(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationArtifact {
    pub email: String,
    pub token: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Delivers verification artifacts (e.g. by email). Failures are reported
/// back but never undo provisioning.
pub trait VerificationSender: Send + Sync {
    fn send(&self, artifact: &VerificationArtifact) -> anyhow::Result<()>;
}

/// Writes the artifact to the log instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogVerificationSender;

impl VerificationSender for LogVerificationSender {
    fn send(&self, artifact: &VerificationArtifact) -> anyhow::Result<()> {
        info!(
            email = %artifact.email,
            code = %artifact.code,
            token = %artifact.token,
            expires_at = %artifact.expires_at,
            "verification artifact issued"
        );
        Ok(())
    }
}

/// Issues a fresh artifact for `email`, replacing any earlier one.
pub fn issue(conn: &Connection, email: &str, now: DateTime<Utc>) -> Result<VerificationArtifact> {
    let email = normalize_email(email);
    let artifact = VerificationArtifact {
        token: Uuid::new_v4().to_string(),
        code: rand::thread_rng().gen_range(100_000..1_000_000).to_string(),
        expires_at: now + token_ttl(),
        email,
    };
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM verification_tokens WHERE email=?1",
        params![artifact.email],
    )?;
    tx.execute(
        "INSERT INTO verification_tokens(email, token, code, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![artifact.email, artifact.token, artifact.code, artifact.expires_at],
    )?;
    tx.commit()?;
    Ok(artifact)
}

struct StoredToken {
    id: i64,
    email: String,
    expires_at: DateTime<Utc>,
}

fn consume(conn: &Connection, stored: StoredToken, now: DateTime<Utc>) -> Result<Tenant> {
    if stored.expires_at < now {
        return Err(LedgerError::invariant("verification token has expired"));
    }
    let tx = conn.unchecked_transaction()?;
    let tenant = directory::tenant_by_email(&tx, &stored.email)?
        .ok_or_else(|| LedgerError::not_found("tenant", &stored.email))?;
    if directory::mark_verified(&tx, tenant.id, now)? {
        info!(tenant_id = %tenant.id, "tenant verified");
    }
    tx.execute(
        "DELETE FROM verification_tokens WHERE id=?1",
        params![stored.id],
    )?;
    let tenant = directory::tenant_by_id(&tx, tenant.id)?
        .ok_or_else(|| LedgerError::not_found("tenant", tenant.id))?;
    tx.commit()?;
    Ok(tenant)
}

pub fn verify_token(directory: &ShardDirectory, token: &str, now: DateTime<Utc>) -> Result<Tenant> {
    let conn = directory.central().lock()?;
    let stored = conn
        .query_row(
            "SELECT id, email, expires_at FROM verification_tokens WHERE token=?1",
            params![token.trim()],
            |r| {
                Ok(StoredToken {
                    id: r.get(0)?,
                    email: r.get(1)?,
                    expires_at: r.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::not_found("verification token", token))?;
    consume(&conn, stored, now)
}

pub fn verify_code(
    directory: &ShardDirectory,
    email: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Tenant> {
    let conn = directory.central().lock()?;
    let stored = conn
        .query_row(
            "SELECT id, email, expires_at FROM verification_tokens WHERE email=?1 AND code=?2",
            params![normalize_email(email), code.trim()],
            |r| {
                Ok(StoredToken {
                    id: r.get(0)?,
                    email: r.get(1)?,
                    expires_at: r.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::not_found("verification code", code))?;
    consume(&conn, stored, now)
}
