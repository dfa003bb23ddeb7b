//! # stmtbench — prepared statement cache benchmark
//!
//! Runs one parameterized query thousands of times under several driver
//! configurations and reports how long each took, whether the driver handed
//! back the same statement object for identical SQL, and how many prepared
//! statements the server ended up holding.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use stmtbench::prelude::*;
//!
//! let config = BenchConfig::default();
//! let harness = Harness::new(config.factory(), config.plan()?, config.variants()?);
//!
//! let mut sink = ReportSink::new(std::io::stdout(), OutputFormat::Text);
//! harness.run(&mut sink).await?;
//! let results = sink.finalize()?.0;
//! ```
//!
//! ## Variant options
//!
//! | Option              | Effect                                         |
//! |---------------------|------------------------------------------------|
//! | `serverSidePrepare` | Binary protocol prepare vs. client emulation   |
//! | `clientCache`       | Reuse statement handles for identical SQL      |
//! | `cacheSizeLimit`    | Longest SQL the cache will hold (default 256)  |

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod mysql;
pub mod parser;
pub mod probe;
pub mod query;
pub mod report;
pub mod runner;
pub mod variant;

pub mod prelude {
    pub use crate::config::BenchConfig;
    pub use crate::driver::{ConnectionFactory, HandleCache, StatementDriver, StatementHandle};
    pub use crate::engine::{BenchmarkPlan, Harness, RunStage, VariantFailure, run_variant};
    pub use crate::error::*;
    pub use crate::mysql::{Credentials, MySqlFactory, MySqlSession};
    pub use crate::probe::{StatementCount, probe_identity, probe_server_status};
    pub use crate::query::{ParameterCycle, Query, QueryPreset};
    pub use crate::report::{BenchmarkResult, OutputFormat, ReportSink};
    pub use crate::runner::run_benchmark;
    pub use crate::variant::ConfigVariant;
}

/// Parse a variant from a property string such as
/// `serverSidePrepare=true&clientCache=true&cacheSizeLimit=2048`.
///
/// # Example
///
/// ```
/// let v = stmtbench::parse_variant("useServerPrepStmts=true&cachePrepStmts=true").unwrap();
/// assert!(v.server_side_prepare && v.client_cache);
/// ```
pub fn parse_variant(props: &str) -> Result<variant::ConfigVariant, error::BenchError> {
    props.parse()
}
