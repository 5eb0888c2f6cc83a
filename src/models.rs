// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

pub type AccountId = i64;
pub type CategoryId = i64;
pub type TransactionId = i64;

/// Central-store identifier of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub i64);

/// Identifier of one financial-data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(pub u32);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard-{}", self.0)
    }
}

impl ToSql for TenantId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for TenantId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(TenantId)
    }
}

impl ToSql for ShardId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.0)))
    }
}

impl FromSql for ShardId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        u32::try_from(raw)
            .map(ShardId)
            .map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

/// Declares a lowercase text enum stored as TEXT in SQLite.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "invalid {} '{}'",
                        stringify!($name),
                        other
                    )),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                s.parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

text_enum!(AccountKind {
    Asset => "asset",
    Liability => "liability",
});

text_enum!(CategoryKind {
    Income => "income",
    Expense => "expense",
});

text_enum!(TransactionKind {
    Income => "income",
    Expense => "expense",
    Transfer => "transfer",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub email: String,
    pub name: String,
    pub credential_hash: String,
    pub shard_id: ShardId,
    pub verified_at: Option<DateTime<Utc>>,
}

impl Tenant {
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }

    pub fn tenant_ref(&self) -> TenantRef {
        TenantRef {
            tenant_id: self.id,
            shard_id: self.shard_id,
        }
    }
}

/// The authenticated pair handed to the core by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRef {
    pub tenant_id: TenantId,
    pub shard_id: ShardId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: TenantId,
    pub name: String,
    pub kind: AccountKind,
    pub parent_id: Option<AccountId>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: TenantId,
    pub name: String,
    pub kind: CategoryKind,
    pub parent_id: Option<CategoryId>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub description: String,
    /// Smallest currency unit, never negative.
    pub amount: i64,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub account_id: AccountId,
    pub to_account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub description: String,
    pub amount: i64,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub account_id: AccountId,
    pub to_account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
}

/// Field-level update. `None` keeps the stored value; for the nullable
/// references `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub amount: Option<i64>,
    pub date: Option<NaiveDate>,
    pub kind: Option<TransactionKind>,
    pub account_id: Option<AccountId>,
    pub to_account_id: Option<Option<AccountId>>,
    pub category_id: Option<Option<CategoryId>>,
}

/// One entry of a sibling reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub id: i64,
    pub order: i64,
}

/// Half-open date interval `[start, end)`; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn all() -> Self {
        Self::default()
    }
}
