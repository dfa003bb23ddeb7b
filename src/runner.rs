//! The timed prepare/execute/release loop.

use std::time::{Duration, Instant};

use crate::driver::StatementDriver;
use crate::error::BenchResult;
use crate::query::{ParameterCycle, Query};

/// Outcome of one completed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    pub elapsed: Duration,
    pub iterations: u32,
    pub rows_drained: u64,
}

impl LoopTiming {
    pub fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Run `query` `iterations` times, binding `(i mod cycle) + 1` each time.
///
/// Each iteration prepares, executes, drains and releases. The handle is
/// released even when execution fails. Any error aborts the loop and the
/// partial timing is dropped.
pub async fn run_benchmark<D: StatementDriver>(
    conn: &mut D,
    query: &Query,
    iterations: u32,
    cycle: ParameterCycle,
) -> BenchResult<LoopTiming> {
    let sql = query.sql();
    let mut rows_drained: u64 = 0;

    let start = Instant::now();
    for i in 0..iterations {
        let handle = conn.prepare(sql).await?;
        let executed = conn.execute(&handle, cycle.value(i)).await;
        conn.release(handle);
        rows_drained += executed?;
    }
    let elapsed = start.elapsed();

    Ok(LoopTiming {
        elapsed,
        iterations,
        rows_drained,
    })
}
