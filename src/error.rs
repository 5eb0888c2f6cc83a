// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error type shared by the routing layer, the provisioning saga and the
//! ledger engine.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::models::TenantId;

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Missing or malformed configuration, e.g. no connection string for a shard.
    #[error("configuration error: {0}")]
    Config(String),

    /// The referenced entity does not exist for the acting tenant. Rows owned
    /// by another tenant are reported through this variant as well.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A write would break a ledger rule (referenced delete, bad field mix, ...).
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Duplicate unique key or an identity that is already registered.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Failure reported by the underlying store. Never retried here.
    #[error("store error: {0}")]
    Store(#[source] rusqlite::Error),

    /// A shared handle was poisoned by a panicking holder.
    #[error("database handle {0} is poisoned")]
    Poisoned(String),

    /// Provisioning failed and its compensating delete failed too. The tenant
    /// row exists in the central store with no financial data behind it.
    #[error(
        "tenant {tenant_id} left inconsistent: provisioning failed ({cause}) and cleanup failed ({cleanup})"
    )]
    Inconsistent {
        tenant_id: TenantId,
        cause: String,
        cleanup: String,
    },
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// True for failures that may succeed if the caller tries again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ffi_err, msg) = &err {
            let unique = ffi_err.code == ErrorCode::ConstraintViolation
                && matches!(
                    ffi_err.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                );
            if unique {
                return Self::Conflict(
                    msg.clone()
                        .unwrap_or_else(|| "unique constraint violated".to_string()),
                );
            }
        }
        Self::Store(err)
    }
}
