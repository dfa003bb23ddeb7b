//! MySQL adapter built on sqlx.
//!
//! Variant toggles map onto the driver as follows:
//!
//! - `serverSidePrepare=true` uses the binary protocol (COM_STMT_PREPARE /
//!   COM_STMT_EXECUTE). `false` parses the template on prepare and sends the
//!   rendered text over the text protocol on execute.
//! - `clientCache=true` enables sqlx's per-connection statement cache and the
//!   release-time [`HandleCache`]. `false` sets the sqlx cache capacity to 0,
//!   so every server-side execution prepares and closes its own statement.
//! - `cacheSizeLimit` keeps longer SQL out of both caches.
//!
//! A server-side statement with no cache slot is checked once per session with
//! a `PREPARE`/`DEALLOCATE PREPARE` pair, so invalid SQL surfaces as
//! [`BenchError::StatementPrepare`] from `prepare` rather than from the first
//! execution.

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Executor, Row, Statement};
use std::collections::HashSet;
use std::str::FromStr;

use crate::driver::{
    ConnectionFactory, DEFAULT_CACHE_CAPACITY, HandleCache, StatementDriver, StatementHandle,
    StatementKind,
};
use crate::error::{BenchError, BenchResult};
use crate::parser;
use crate::variant::ConfigVariant;

/// Login for the benchmark database.
#[derive(Clone, Default)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Opens one [`MySqlSession`] per variant.
#[derive(Debug, Clone)]
pub struct MySqlFactory {
    base_address: String,
    credentials: Credentials,
    cache_capacity: usize,
}

impl MySqlFactory {
    /// `base_address` is a URL such as `mysql://localhost:3306/sakila`.
    pub fn new(base_address: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_address: base_address.into(),
            credentials,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Number of statements each cache may hold when client caching is on.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    pub fn base_address(&self) -> &str {
        &self.base_address
    }

    fn connect_options(&self, variant: &ConfigVariant) -> BenchResult<MySqlConnectOptions> {
        let mut options = MySqlConnectOptions::from_str(&self.base_address)
            .map_err(|e| BenchError::Connection(format!("{}: {}", self.base_address, e)))?;

        if !self.credentials.user.is_empty() {
            options = options.username(&self.credentials.user);
        }
        if let Some(password) = &self.credentials.password {
            options = options.password(password);
        }

        let capacity = if variant.client_cache {
            self.cache_capacity
        } else {
            0
        };

        Ok(options
            .statement_cache_capacity(capacity)
            .disable_statement_logging())
    }
}

impl ConnectionFactory for MySqlFactory {
    type Connection = MySqlSession;

    async fn open(&self, variant: &ConfigVariant) -> BenchResult<MySqlSession> {
        let options = self.connect_options(variant)?;
        tracing::debug!("Connecting to {} for '{}'", self.base_address, variant.name);

        let conn = options
            .connect()
            .await
            .map_err(|e| BenchError::Connection(e.to_string()))?;

        Ok(MySqlSession {
            conn,
            variant: variant.clone(),
            handles: HandleCache::for_variant(variant, self.cache_capacity),
            checked: HashSet::new(),
        })
    }
}

/// A single MySQL connection configured for one variant.
pub struct MySqlSession {
    conn: MySqlConnection,
    variant: ConfigVariant,
    handles: HandleCache,
    /// Uncached server-side SQL already validated on this connection.
    checked: HashSet<String>,
}

impl MySqlSession {
    pub fn variant(&self) -> &ConfigVariant {
        &self.variant
    }

    /// Have the server parse `sql` without keeping a statement around.
    async fn check_server_prepare(&mut self, sql: &str) -> BenchResult<()> {
        if self.checked.contains(sql) {
            return Ok(());
        }

        let prepare = format!("PREPARE stmtbench_check FROM {}", quote_literal(sql));
        (&mut self.conn)
            .execute(prepare.as_str())
            .await
            .map_err(|e| BenchError::StatementPrepare(e.to_string()))?;
        (&mut self.conn)
            .execute("DEALLOCATE PREPARE stmtbench_check")
            .await
            .map_err(|e| BenchError::StatementPrepare(e.to_string()))?;

        self.checked.insert(sql.to_string());
        Ok(())
    }
}

/// Quote `s` as a single-quoted MySQL string literal.
fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

impl StatementDriver for MySqlSession {
    fn describe_statement_implementation(&self) -> String {
        if self.variant.server_side_prepare {
            "sqlx-mysql/ServerPreparedStatement".to_string()
        } else {
            "sqlx-mysql/ClientPreparedStatement".to_string()
        }
    }

    async fn prepare(&mut self, sql: &str) -> BenchResult<StatementHandle> {
        if let Some(handle) = self.handles.checkout(sql) {
            return Ok(handle);
        }

        if !self.variant.server_side_prepare {
            let template = parser::parse_template(sql)
                .map_err(|e| BenchError::StatementPrepare(e.to_string()))?;
            return Ok(StatementHandle::client(template));
        }

        // Without a cache slot the statement is prepared by the execution
        // itself and closed right after, so nothing is left on the server.
        if !self.handles.accepts(sql) {
            self.check_server_prepare(sql).await?;
            return Ok(StatementHandle::server(sql, None));
        }

        let statement = (&mut self.conn)
            .prepare(sql)
            .await
            .map_err(|e| BenchError::StatementPrepare(e.to_string()))?;
        Ok(StatementHandle::server(sql, Some(statement.columns().len())))
    }

    async fn execute(&mut self, handle: &StatementHandle, param: i64) -> BenchResult<u64> {
        let rows = match handle.kind() {
            StatementKind::Server { .. } => {
                let persistent = self.handles.accepts(handle.sql());
                sqlx::query(handle.sql())
                    .bind(param)
                    .persistent(persistent)
                    .fetch_all(&mut self.conn)
                    .await
            }
            StatementKind::Client { template } => {
                let sql = template.render(&[param])?;
                (&mut self.conn).fetch_all(sql.as_str()).await
            }
        }
        .map_err(|e| BenchError::Execution(e.to_string()))?;

        Ok(rows.len() as u64)
    }

    fn release(&mut self, handle: StatementHandle) {
        self.handles.checkin(handle);
    }

    async fn global_status(&mut self, name: &str) -> BenchResult<Option<String>> {
        let sql = format!("SHOW GLOBAL STATUS LIKE {}", quote_literal(name));

        // Text protocol, so the probe itself does not add a prepared statement.
        let row = (&mut self.conn)
            .fetch_optional(sql.as_str())
            .await
            .map_err(|e| BenchError::StatusQuery(e.to_string()))?;

        match row {
            Some(row) => row
                .try_get::<String, _>(1)
                .map(Some)
                .map_err(|e| BenchError::StatusQuery(e.to_string())),
            None => Ok(None),
        }
    }

    async fn close(self) -> BenchResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| BenchError::Connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> MySqlFactory {
        MySqlFactory::new(
            "mysql://localhost:3306/sakila",
            Credentials {
                user: "root".into(),
                password: Some("1234".into()),
            },
        )
    }

    #[test]
    fn test_connect_options_accept_variants() {
        for variant in ConfigVariant::presets() {
            assert!(factory().connect_options(&variant).is_ok());
        }
    }

    #[test]
    fn test_bad_address_is_connection_error() {
        let factory = MySqlFactory::new("not a url", Credentials::default());
        let err = factory
            .connect_options(&ConfigVariant::presets()[0])
            .unwrap_err();
        assert!(matches!(err, BenchError::Connection(_)));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            user: "root".into(),
            password: Some("1234".into()),
        };
        let shown = format!("{:?}", creds);
        assert!(shown.contains("root"));
        assert!(!shown.contains("1234"));
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("Prepared_stmt_count"), "'Prepared_stmt_count'");
        assert_eq!(
            quote_literal(r"SELECT 'a\b' FROM t WHERE id = ?"),
            r"'SELECT ''a\\b'' FROM t WHERE id = ?'"
        );
    }

    #[test]
    fn test_cache_capacity_floor() {
        assert_eq!(factory().with_cache_capacity(0).cache_capacity, 1);
    }
}
