//! One-shot observations taken around the benchmark loop.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::driver::StatementDriver;
use crate::error::BenchResult;

/// Server status variable holding the number of live prepared statements.
pub const PREPARED_STMT_COUNT: &str = "Prepared_stmt_count";

/// What the identity probe saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityReport {
    pub implementation_label: String,
    pub object_reused: bool,
}

/// Prepare `sql`, release it, prepare it again and compare handle identity.
///
/// The first handle is released before the second prepare so a cache that
/// inserts on release has the chance to hand it back.
pub async fn probe_identity<D: StatementDriver>(
    conn: &mut D,
    sql: &str,
) -> BenchResult<IdentityReport> {
    let first = conn.prepare(sql).await?;
    let implementation_label = conn.describe_statement_implementation();
    let witness = first.clone();
    conn.release(first);

    let second = conn.prepare(sql).await?;
    let object_reused = witness.same_object(&second);
    conn.release(second);

    tracing::debug!(
        "Identity probe: implementation={}, reused={}",
        implementation_label,
        object_reused
    );

    Ok(IdentityReport {
        implementation_label,
        object_reused,
    })
}

/// A server counter value, or `Unknown` when it could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementCount {
    Known(u64),
    #[default]
    Unknown,
}

impl StatementCount {
    pub fn known(&self) -> Option<u64> {
        match self {
            StatementCount::Known(n) => Some(*n),
            StatementCount::Unknown => None,
        }
    }
}

impl fmt::Display for StatementCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementCount::Known(n) => write!(f, "{}", n),
            StatementCount::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for StatementCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatementCount::Known(n) => serializer.serialize_u64(*n),
            StatementCount::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// Read `Prepared_stmt_count`. Never fails: anything unreadable is `Unknown`.
pub async fn probe_server_status<D: StatementDriver>(conn: &mut D) -> StatementCount {
    match conn.global_status(PREPARED_STMT_COUNT).await {
        Ok(Some(raw)) => match raw.trim().parse::<u64>() {
            Ok(n) => StatementCount::Known(n),
            Err(_) => {
                tracing::warn!("{} is not a count: '{}'", PREPARED_STMT_COUNT, raw);
                StatementCount::Unknown
            }
        },
        Ok(None) => {
            tracing::warn!("Server does not report {}", PREPARED_STMT_COUNT);
            StatementCount::Unknown
        }
        Err(e) => {
            tracing::warn!("Could not read {}: {}", PREPARED_STMT_COUNT, e);
            StatementCount::Unknown
        }
    }
}
