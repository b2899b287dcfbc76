use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::load::LoadResult;
use crate::scenario::ScenarioResult;

/// A finished, serializable result structure ready for a [`Reporter`].
pub trait Report
where
    Self: Send + Sync + Debug + Serialize + DeserializeOwned,
{
}

/// Consumes a [`Report`] and sends it somewhere — stdout, a file, a CI
/// annotation endpoint. Reporters are free to format, compress, or enrich
/// reports as needed.
#[async_trait]
pub trait Reporter<R: Report> {
    async fn report(&self, report: R) -> Result<(), Box<dyn std::error::Error>>;
}

/// Everything one [`TestPlan`](crate::TestPlan) run produced: per-scenario
/// results with first-failure detail, per-load-job rates and verdicts, and
/// the unreachable marker when preflight failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub plan: String,
    /// Set when the preflight exchange never got an HTTP answer; the plan
    /// body did not run.
    pub unreachable: Option<String>,
    pub scenarios: Vec<ScenarioResult>,
    pub load_jobs: Vec<LoadResult>,
}

impl PlanReport {
    pub(crate) fn unreachable(plan: String, cause: String) -> Self {
        Self {
            plan,
            unreachable: Some(cause),
            scenarios: Vec::new(),
            load_jobs: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.unreachable.is_none()
            && self.scenarios.iter().all(ScenarioResult::is_pass)
            && self.load_jobs.iter().all(LoadResult::is_pass)
    }

    /// Process exit status for CI callers: zero only when every scenario
    /// passed and every load job met its threshold.
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }
}

impl Report for PlanReport {}
impl Report for ScenarioResult {}
impl Report for LoadResult {}

#[cfg(feature = "builtins")]
pub use builtins::*;

#[cfg(feature = "builtins")]
mod builtins {
    use super::*;

    /// Human-readable plan summary on stdout.
    pub struct StdoutReporter;

    #[async_trait]
    impl Reporter<PlanReport> for StdoutReporter {
        async fn report(&self, report: PlanReport) -> Result<(), Box<dyn std::error::Error>> {
            println!("plan {}: {}", report.plan, pass_str(report.passed()));
            if let Some(cause) = &report.unreachable {
                println!("  deployment unreachable: {cause}");
                return Ok(());
            }
            for scenario in &report.scenarios {
                println!(
                    "  scenario {}: {} ({} step(s) completed)",
                    scenario.scenario,
                    pass_str(scenario.is_pass()),
                    scenario.completed.len(),
                );
                if let Some(detail) = scenario.failure_detail() {
                    println!("    {detail}");
                }
            }
            for job in &report.load_jobs {
                println!(
                    "  load {}: {} ({:.0}% of {} against threshold {:.0}%)",
                    job.job,
                    pass_str(job.is_pass()),
                    job.success_rate * 100.0,
                    job.concurrency,
                    job.threshold * 100.0,
                );
            }
            Ok(())
        }
    }

    fn pass_str(pass: bool) -> &'static str {
        if pass { "PASS" } else { "FAIL" }
    }

    /// Machine-readable output: any report, pretty-printed JSON on stdout.
    pub struct JsonReporter;

    #[async_trait]
    impl<R: Report + 'static> Reporter<R> for JsonReporter {
        async fn report(&self, report: R) -> Result<(), Box<dyn std::error::Error>> {
            let value = serde_json::to_string_pretty(&report)?;
            println!("{value}");
            Ok(())
        }
    }
}
