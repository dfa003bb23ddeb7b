//! The seam between the harness and a database driver.
//!
//! The harness only talks to [`StatementDriver`] and [`ConnectionFactory`].
//! Handles are reference counted so that reuse can be observed as pointer
//! identity rather than value equality.

use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::BenchResult;
use crate::parser::Template;
use crate::variant::ConfigVariant;

/// Handles kept per connection when client caching is on.
pub const DEFAULT_CACHE_CAPACITY: usize = 25;

/// How a prepared statement will be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// Prepared on the server; `columns` is known once the server described it.
    Server { columns: Option<usize> },
    /// Emulated in the client: the template is rendered into text per execution.
    Client { template: Template },
}

/// A prepared statement as held by a driver.
#[derive(Debug)]
pub struct PreparedStatement {
    sql: String,
    kind: StatementKind,
}

/// A shared handle to a [`PreparedStatement`].
#[derive(Clone)]
pub struct StatementHandle(Arc<PreparedStatement>);

impl StatementHandle {
    pub fn server(sql: impl Into<String>, columns: Option<usize>) -> Self {
        Self(Arc::new(PreparedStatement {
            sql: sql.into(),
            kind: StatementKind::Server { columns },
        }))
    }

    pub fn client(template: Template) -> Self {
        Self(Arc::new(PreparedStatement {
            sql: template.sql().to_string(),
            kind: StatementKind::Client { template },
        }))
    }

    pub fn sql(&self) -> &str {
        &self.0.sql
    }

    pub fn kind(&self) -> &StatementKind {
        &self.0.kind
    }

    /// True when both handles point at the same statement object.
    pub fn same_object(&self, other: &StatementHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StatementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementHandle")
            .field("ptr", &Arc::as_ptr(&self.0))
            .field("sql_len", &self.0.sql.len())
            .field("kind", &self.0.kind)
            .finish()
    }
}

/// Client-side handle cache keyed by SQL text.
///
/// Handles enter the cache when they are released and leave it when they are
/// checked out again, so a statement is never shared by two live callers.
/// SQL longer than the variant's size limit is never stored.
pub struct HandleCache {
    enabled: bool,
    sql_limit: usize,
    entries: LruCache<String, StatementHandle>,
}

impl HandleCache {
    pub fn new(enabled: bool, sql_limit: usize, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            enabled,
            sql_limit,
            entries: LruCache::new(capacity),
        }
    }

    pub fn for_variant(variant: &ConfigVariant, capacity: usize) -> Self {
        Self::new(
            variant.client_cache,
            variant.effective_cache_size_limit(),
            capacity,
        )
    }

    /// Whether `sql` is eligible for caching at all.
    pub fn accepts(&self, sql: &str) -> bool {
        self.enabled && sql.len() <= self.sql_limit
    }

    /// Take a previously released handle for `sql`, if any.
    pub fn checkout(&mut self, sql: &str) -> Option<StatementHandle> {
        if !self.enabled {
            return None;
        }
        self.entries.pop(sql)
    }

    /// Return a handle. Returns `true` if it was cached.
    pub fn checkin(&mut self, handle: StatementHandle) -> bool {
        if !self.accepts(handle.sql()) {
            return false;
        }
        self.entries.put(handle.sql().to_string(), handle);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A live database session the harness can benchmark against.
///
/// Calls are strictly sequential; implementations may block for the full
/// network round trip.
#[allow(async_fn_in_trait)]
pub trait StatementDriver {
    /// Opaque label describing which statement implementation is in use.
    fn describe_statement_implementation(&self) -> String;

    /// Prepare `sql`, or hand back a cached handle for it.
    async fn prepare(&mut self, sql: &str) -> BenchResult<StatementHandle>;

    /// Execute with one integer parameter and drain every row.
    /// Returns the number of rows consumed.
    async fn execute(&mut self, handle: &StatementHandle, param: i64) -> BenchResult<u64>;

    /// Give the handle back. Cache insertion, if any, happens here.
    fn release(&mut self, handle: StatementHandle);

    /// Read one global status variable. `Ok(None)` when the server has no such row.
    async fn global_status(&mut self, name: &str) -> BenchResult<Option<String>>;

    /// Close the session.
    async fn close(self) -> BenchResult<()>;
}

/// Opens a fresh [`StatementDriver`] per variant.
#[allow(async_fn_in_trait)]
pub trait ConnectionFactory {
    type Connection: StatementDriver;

    async fn open(&self, variant: &ConfigVariant) -> BenchResult<Self::Connection>;
}
