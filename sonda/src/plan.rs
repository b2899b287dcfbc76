use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::load::LoadJob;
use crate::message::Endpoint;
use crate::outcome::{Classifier, Outcome};
use crate::report::PlanReport;
use crate::scenario::Scenario;
use crate::transport::Transport;
use crate::error::TransportFailure;

/// Shared execution context: the transport handle, the outcome classifier,
/// and the name of the discriminator field. Cheap to clone — concurrent
/// load executions each carry their own copy and share only the transport's
/// connection pool.
#[derive(Clone)]
pub struct Harness {
    transport: Arc<dyn Transport>,
    classifier: Classifier,
    type_field: String,
}

impl Harness {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            classifier: Classifier::default(),
            type_field: "type".to_string(),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_type_field(mut self, type_field: impl Into<String>) -> Self {
        self.type_field = type_field.into();
        self
    }

    pub fn type_field(&self) -> &str {
        &self.type_field
    }

    /// One exchange, classified. Transport failures fold into the outcome
    /// domain here so callers see exactly one result shape per request.
    pub async fn exchange(&self, endpoint: &Endpoint, payload: &Value) -> Outcome {
        match self.transport.send(endpoint, payload).await {
            Ok(response) => self.classifier.classify(&response),
            Err(cause) => Outcome::TransportError {
                cause: cause.to_string(),
            },
        }
    }

    /// One minimal exchange to see whether the deployment answers at all.
    /// Any HTTP-level response counts as reachable, a rejected empty
    /// payload included.
    pub async fn preflight(&self, endpoint: &Endpoint) -> Result<(), TransportFailure> {
        self.transport
            .send(endpoint, &Value::Object(Default::default()))
            .await
            .map(|_| ())
    }
}

/// A named list of scenarios and load jobs — the single-call boundary a CLI
/// or CI runner drives. Scenarios run first, then load jobs; the report
/// maps any failure to a non-zero exit code.
pub struct TestPlan {
    name: String,
    preflight: Option<Endpoint>,
    scenarios: Vec<Scenario>,
    load_jobs: Vec<LoadJob>,
}

impl TestPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            preflight: None,
            scenarios: Vec::new(),
            load_jobs: Vec::new(),
        }
    }

    /// Check this endpoint answers before running the plan body; an
    /// unreachable deployment fails the whole plan fast with a dedicated
    /// report entry instead of a cascade of transport errors.
    pub fn preflight(mut self, endpoint: Endpoint) -> Self {
        self.preflight = Some(endpoint);
        self
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    pub fn load_job(mut self, job: LoadJob) -> Self {
        self.load_jobs.push(job);
        self
    }

    pub async fn run(&self, harness: &Harness) -> PlanReport {
        info!(plan = %self.name, "running test plan");

        if let Some(endpoint) = &self.preflight {
            if let Err(cause) = harness.preflight(endpoint).await {
                warn!(%cause, "deployment unreachable, aborting plan");
                return PlanReport::unreachable(self.name.clone(), cause.to_string());
            }
        }

        let mut scenarios = Vec::new();
        for scenario in &self.scenarios {
            scenarios.push(scenario.run(harness).await);
        }

        let mut load_jobs = Vec::new();
        for job in &self.load_jobs {
            load_jobs.push(job.run(harness).await);
        }

        PlanReport {
            plan: self.name.clone(),
            unreachable: None,
            scenarios,
            load_jobs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{StubReply, StubTransport};

    #[tokio::test]
    async fn preflight_failure_aborts_the_plan() {
        let stub = Arc::new(StubTransport::new().reply(
            "/health",
            "",
            StubReply::unreachable("connection refused"),
        ));
        let harness = Harness::new(stub);

        let report = TestPlan::new("smoke")
            .preflight(Endpoint::post("/health"))
            .run(&harness)
            .await;

        assert!(!report.passed());
        assert!(report.unreachable.is_some());
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn preflight_counts_any_http_answer_as_reachable() {
        // The stub's default reply is a 400; that still proves the service is up.
        let stub = Arc::new(StubTransport::new());
        let harness = Harness::new(stub);

        let report = TestPlan::new("smoke")
            .preflight(Endpoint::post("/api/Anything"))
            .run(&harness)
            .await;

        assert!(report.passed());
        assert_eq!(report.exit_code(), 0);
    }
}
