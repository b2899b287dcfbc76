use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::{Aggregate, OutcomeTally};
use crate::metric::ExecutionRecord;
use crate::plan::Harness;
use crate::probe::Probe;
use crate::scenario::Scenario;

/// What one load execution runs: a single probed operation or a whole
/// scenario.
pub enum LoadUnit {
    Probe(Probe),
    Scenario(Scenario),
}

impl From<Probe> for LoadUnit {
    fn from(probe: Probe) -> Self {
        LoadUnit::Probe(probe)
    }
}

impl From<Scenario> for LoadUnit {
    fn from(scenario: Scenario) -> Self {
        LoadUnit::Scenario(scenario)
    }
}

type UnitFn = Arc<dyn Fn(u32) -> LoadUnit + Send + Sync>;

/// N concurrent executions of a unit plus a success-rate threshold.
///
/// The factory receives the worker index and builds that execution's unit,
/// which is where each execution gets its own synthetic identity — distinct
/// usernames, tokens, room IDs — so concurrent executions never share
/// mutable state or depend on one another's side effects.
pub struct LoadJob {
    name: String,
    concurrency: u32,
    threshold: f64,
    unit: UnitFn,
}

impl LoadJob {
    /// `threshold` is a success-rate floor in `[0, 1]`. Tolerance-based on
    /// purpose: some concurrent failures (resource contention) are expected
    /// in the target systems.
    pub fn new(
        name: impl Into<String>,
        concurrency: u32,
        threshold: f64,
        unit: impl Fn(u32) -> LoadUnit + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            concurrency,
            threshold,
            unit: Arc::new(unit),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launch every execution, wait for all of them — one failure never
    /// cancels siblings, since the aggregate needs every outcome — and
    /// evaluate the threshold predicate. Nothing is retried: each
    /// execution runs exactly once.
    pub async fn run(&self, harness: &Harness) -> LoadResult {
        info!(job = %self.name, concurrency = self.concurrency, "spawning load workers");

        let handles: Vec<_> = (0..self.concurrency)
            .map(|worker| {
                let unit = (self.unit)(worker);
                let harness = harness.clone();
                tokio::spawn(async move { execute(worker, unit, &harness).await })
            })
            .collect();

        let mut tally = OutcomeTally::new();
        for joined in join_all(handles).await {
            let record = joined.expect("load worker panicked");
            tally.consume(&record);
        }

        let success_rate = tally.success_rate();
        let verdict = if success_rate >= self.threshold {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        info!(
            job = %self.name,
            success_rate,
            threshold = self.threshold,
            ?verdict,
            "load job finished"
        );

        LoadResult {
            job: self.name.clone(),
            concurrency: self.concurrency,
            threshold: self.threshold,
            success_rate,
            verdict,
            tally,
        }
    }
}

async fn execute(worker: u32, unit: LoadUnit, harness: &Harness) -> ExecutionRecord {
    let start = Instant::now();
    let (kind, detail) = match unit {
        LoadUnit::Probe(probe) => match probe.run(harness).await {
            Ok(hit) => {
                let detail = (!hit.outcome.is_accepted()).then(|| {
                    format!(
                        "tag {}: status {}",
                        hit.tag,
                        hit.outcome
                            .status()
                            .map_or_else(|| "-".to_string(), |s| s.to_string())
                    )
                });
                (hit.outcome.kind(), detail)
            }
            Err(exhausted) => (exhausted.failure_kind(), Some(exhausted.to_string())),
        },
        LoadUnit::Scenario(scenario) => {
            let result = scenario.run(harness).await;
            (result.outcome_kind(), result.failure_detail())
        }
    };
    ExecutionRecord {
        worker,
        kind,
        detail,
        latency: start.elapsed(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

/// Aggregate of one load job: the tally of all executions and the verdict
/// of the threshold predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub job: String,
    pub concurrency: u32,
    pub threshold: f64,
    pub success_rate: f64,
    pub verdict: Verdict,
    pub tally: OutcomeTally,
}

impl LoadResult {
    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}
