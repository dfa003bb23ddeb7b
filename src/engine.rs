//! Benchmark execution engine.
//!
//! Each variant walks the same stages on a fresh connection:
//!
//! ```text
//! Init → Connected → Probed → Benchmarked → StatusChecked → Closed
//! ```
//!
//! A failure stops progression at the failing stage, but once a connection
//! was opened it is always closed.

use chrono::Utc;
use serde::Serialize;
use std::io::Write;

use crate::driver::{ConnectionFactory, StatementDriver};
use crate::error::{BenchError, BenchResult};
use crate::probe::{self, IdentityReport, StatementCount};
use crate::query::{ParameterCycle, Query};
use crate::report::{BenchmarkResult, ReportSink};
use crate::runner::{self, LoopTiming};
use crate::variant::ConfigVariant;

/// Iterations used when nothing else is configured.
pub const DEFAULT_ITERATIONS: u32 = 10_000;
/// Parameter cycle length used when nothing else is configured.
pub const DEFAULT_CYCLE: u32 = 200;

/// Per-variant run stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Init,
    Connected,
    Probed,
    Benchmarked,
    StatusChecked,
    Closed,
}

/// A variant that did not produce a result.
#[derive(Debug)]
pub struct VariantFailure {
    pub variant: ConfigVariant,
    /// Last stage completed before the error.
    pub stage: RunStage,
    pub error: BenchError,
}

/// What to run against every variant.
#[derive(Debug, Clone)]
pub struct BenchmarkPlan {
    pub query: Query,
    pub iterations: u32,
    pub cycle: ParameterCycle,
}

impl BenchmarkPlan {
    pub fn new(query: Query, iterations: u32, cycle: ParameterCycle) -> Self {
        Self {
            query,
            iterations,
            cycle,
        }
    }
}

struct Observations {
    identity: IdentityReport,
    timing: LoopTiming,
    status: StatementCount,
}

struct StageTracker<'a> {
    variant: &'a ConfigVariant,
    stage: RunStage,
}

impl StageTracker<'_> {
    fn advance(&mut self, next: RunStage) {
        tracing::debug!("[{}] {:?} → {:?}", self.variant.name, self.stage, next);
        self.stage = next;
    }

    fn fail(&self, error: BenchError) -> VariantFailure {
        VariantFailure {
            variant: self.variant.clone(),
            stage: self.stage,
            error,
        }
    }
}

/// Run one variant on a fresh connection from `factory`.
pub async fn run_variant<F: ConnectionFactory>(
    factory: &F,
    plan: &BenchmarkPlan,
    variant: &ConfigVariant,
) -> Result<BenchmarkResult, VariantFailure> {
    let started_at = Utc::now();
    let mut tracker = StageTracker {
        variant,
        stage: RunStage::Init,
    };

    if variant.client_cache && !variant.caches(plan.query.sql()) {
        tracing::warn!(
            "[{}] query is {} chars, over the cache size limit of {}; it will not be cached",
            variant.name,
            plan.query.sql().len(),
            variant.effective_cache_size_limit()
        );
    }

    let mut conn = factory.open(variant).await.map_err(|e| tracker.fail(e))?;
    tracker.advance(RunStage::Connected);

    let observed = observe(&mut conn, plan, &mut tracker).await;

    let closed = conn.close().await;
    let last_stage = tracker.stage;
    tracker.advance(RunStage::Closed);

    let observed = match observed {
        Ok(observed) => observed,
        Err(error) => {
            if let Err(e) = closed {
                tracing::warn!("[{}] close after failure also failed: {}", variant.name, e);
            }
            return Err(VariantFailure {
                variant: variant.clone(),
                stage: last_stage,
                error,
            });
        }
    };
    if let Err(e) = closed {
        tracing::warn!("[{}] close failed: {}", variant.name, e);
    }

    Ok(BenchmarkResult {
        variant: variant.clone(),
        implementation_label: observed.identity.implementation_label,
        object_reused: observed.identity.object_reused,
        elapsed_millis: observed.timing.elapsed_millis(),
        iterations: observed.timing.iterations,
        rows_drained: observed.timing.rows_drained,
        server_statement_count: observed.status,
        started_at,
    })
}

async fn observe<D: StatementDriver>(
    conn: &mut D,
    plan: &BenchmarkPlan,
    tracker: &mut StageTracker<'_>,
) -> BenchResult<Observations> {
    let identity = probe::probe_identity(conn, plan.query.sql()).await?;
    tracker.advance(RunStage::Probed);

    let timing = runner::run_benchmark(conn, &plan.query, plan.iterations, plan.cycle).await?;
    tracker.advance(RunStage::Benchmarked);

    let status = probe::probe_server_status(conn).await;
    tracker.advance(RunStage::StatusChecked);

    Ok(Observations {
        identity,
        timing,
        status,
    })
}

/// Runs a plan against a list of variants, one after another.
pub struct Harness<F> {
    factory: F,
    plan: BenchmarkPlan,
    variants: Vec<ConfigVariant>,
}

impl<F: ConnectionFactory> Harness<F> {
    pub fn new(factory: F, plan: BenchmarkPlan, variants: Vec<ConfigVariant>) -> Self {
        Self {
            factory,
            plan,
            variants,
        }
    }

    pub fn plan(&self) -> &BenchmarkPlan {
        &self.plan
    }

    pub fn variants(&self) -> &[ConfigVariant] {
        &self.variants
    }

    /// Run every variant in order, recording into `sink`.
    ///
    /// Prepare and execution failures are recorded and the next variant
    /// runs. A connection failure is recorded and then returned, skipping
    /// the remaining variants.
    pub async fn run<W: Write>(&self, sink: &mut ReportSink<W>) -> BenchResult<()> {
        for (i, variant) in self.variants.iter().enumerate() {
            tracing::info!(
                "Running variant {}/{}: {}",
                i + 1,
                self.variants.len(),
                variant
            );

            match run_variant(&self.factory, &self.plan, variant).await {
                Ok(result) => {
                    tracing::info!(
                        "[{}] {} ms, reused={}",
                        variant.name,
                        result.elapsed_millis,
                        result.object_reused
                    );
                    sink.record(result)?;
                }
                Err(failure) => {
                    tracing::error!(
                        "[{}] failed after {:?}: {}",
                        failure.variant.name,
                        failure.stage,
                        failure.error
                    );
                    sink.record_failure(&failure)?;
                    if failure.error.aborts_benchmark() {
                        return Err(failure.error);
                    }
                }
            }
        }
        Ok(())
    }
}
