use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Exhausted, ExtractionError};
use crate::message::{Endpoint, PayloadTemplate, TypeCandidates};
use crate::outcome::{Outcome, OutcomeKind};
use crate::plan::Harness;
use crate::probe::Probe;

type PayloadFn = Box<dyn Fn(&StepValues) -> PayloadTemplate + Send + Sync>;

/// Values extracted from prior steps' responses, keyed by binding name.
/// Each scenario execution owns its own set — nothing is shared between
/// concurrent executions.
#[derive(Debug, Clone, Default)]
pub struct StepValues(HashMap<String, Value>);

impl StepValues {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// The extracted value by name, or `Value::Null` when absent. Meant for
    /// payload builders, which should stay infallible — a genuinely missing
    /// binding has already failed the extracting step.
    pub fn value(&self, name: &str) -> Value {
        self.0.get(name).cloned().unwrap_or(Value::Null)
    }

    fn insert(&mut self, name: String, value: Value) {
        self.0.insert(name, value);
    }
}

/// What a step requires of its probed outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Expect {
    /// The operation must be accepted; extractors then run on the body.
    #[default]
    Accepted,
    /// The operation must be rejected at the business level — the negative
    /// path. Optionally the rejection body must contain a marker substring.
    Rejected { body_contains: Option<String> },
}

/// One name → JSON-pointer binding run against an accepted response body.
/// An empty pointer binds the whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub path: String,
}

/// A named operation inside a scenario: candidates to probe, a payload
/// built from prior steps' extracted values, extractor bindings for later
/// steps, and an expectation.
pub struct ScenarioStep {
    name: String,
    endpoint: Endpoint,
    candidates: TypeCandidates,
    payload: PayloadFn,
    bindings: Vec<Binding>,
    expect: Expect,
}

impl ScenarioStep {
    pub fn new(
        name: impl Into<String>,
        endpoint: Endpoint,
        candidates: TypeCandidates,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint,
            candidates,
            payload: Box::new(|_| PayloadTemplate::new()),
            bindings: Vec::new(),
            expect: Expect::Accepted,
        }
    }

    /// Payload builder; receives every value extracted by prior steps.
    pub fn payload(
        mut self,
        build: impl Fn(&StepValues) -> PayloadTemplate + Send + Sync + 'static,
    ) -> Self {
        self.payload = Box::new(build);
        self
    }

    /// Bind `name` to the value at `path` (JSON pointer; empty for the
    /// whole body) in this step's accepted response.
    pub fn extract(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.bindings.push(Binding {
            name: name.into(),
            path: path.into(),
        });
        self
    }

    pub fn expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An ordered, dependency-chained sequence of steps. Execution is strictly
/// sequential: step N's request is never issued before step N−1 completed
/// and extracted. The first non-conforming step halts the scenario; no
/// rollback is attempted — this is a read-mostly verification workflow.
pub struct Scenario {
    name: String,
    steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: ScenarioStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(&self, harness: &Harness) -> ScenarioResult {
        let mut values = StepValues::default();
        let mut completed = Vec::new();

        for step in &self.steps {
            let template = (step.payload)(&values);
            let probe = Probe::builder()
                .endpoint(step.endpoint.clone())
                .candidates(step.candidates.clone())
                .template(template)
                .build();

            let hit = match probe.run(harness).await {
                Ok(hit) => hit,
                Err(exhausted) => {
                    warn!(scenario = %self.name, step = %step.name, %exhausted, "step failed");
                    return self.failed(completed, step, StepError::Exhausted(exhausted));
                }
            };

            match (&step.expect, &hit.outcome) {
                (Expect::Accepted, Outcome::Accepted { body, .. }) => {
                    for binding in &step.bindings {
                        match extract(body, &binding.path) {
                            Some(value) => values.insert(binding.name.clone(), value),
                            None => {
                                let error = ExtractionError {
                                    name: binding.name.clone(),
                                    path: binding.path.clone(),
                                };
                                warn!(scenario = %self.name, step = %step.name, %error, "step failed");
                                return self.failed(completed, step, StepError::Extraction(error));
                            }
                        }
                    }
                }
                (Expect::Rejected { body_contains }, Outcome::RecognizedButRejected { body, .. })
                    if body_contains
                        .as_deref()
                        .is_none_or(|marker| body.contains(marker)) => {}
                (expect, outcome) => {
                    warn!(
                        scenario = %self.name,
                        step = %step.name,
                        kind = ?outcome.kind(),
                        "step outcome did not meet expectation"
                    );
                    return self.failed(
                        completed,
                        step,
                        StepError::Unexpected {
                            expected: expect.clone(),
                            outcome: outcome.clone(),
                        },
                    );
                }
            }

            debug!(scenario = %self.name, step = %step.name, tag = %hit.tag, "step completed");
            completed.push(CompletedStep {
                step: step.name.clone(),
                tag: hit.tag,
                status: hit.outcome.status().unwrap_or_default(),
            });
        }

        ScenarioResult {
            scenario: self.name.clone(),
            completed,
            failure: None,
        }
    }

    fn failed(
        &self,
        completed: Vec<CompletedStep>,
        step: &ScenarioStep,
        error: StepError,
    ) -> ScenarioResult {
        ScenarioResult {
            scenario: self.name.clone(),
            completed,
            failure: Some(StepFailure {
                step: step.name.clone(),
                error,
            }),
        }
    }
}

/// Run every binding's pointer against the parsed body. A body that is not
/// JSON at all is treated as one opaque string value, since some observed
/// services answer with bare text.
fn extract(body: &str, path: &str) -> Option<Value> {
    let parsed: Value =
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));
    if path.is_empty() {
        return Some(parsed);
    }
    parsed.pointer(path).cloned()
}

/// A step the scenario got through, with the tag the endpoint understood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedStep {
    pub step: String,
    pub tag: String,
    pub status: u16,
}

/// Why a step halted its scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepError {
    /// No candidate tag was understood by the endpoint.
    Exhausted(Exhausted),
    /// The probed outcome did not match the step's expectation.
    Unexpected { expected: Expect, outcome: Outcome },
    /// An expected field was missing from the accepted response.
    Extraction(ExtractionError),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::Exhausted(e) => write!(f, "{e}"),
            StepError::Unexpected { expected, outcome } => write!(
                f,
                "expected {:?}, got {:?} (status {})",
                expected,
                outcome.kind(),
                outcome
                    .status()
                    .map_or_else(|| "-".to_string(), |s| s.to_string()),
            ),
            StepError::Extraction(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: String,
    pub error: StepError,
}

/// Outcome of one scenario execution: the steps that completed, and the
/// first failure if any. Later steps never ran past a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: String,
    pub completed: Vec<CompletedStep>,
    pub failure: Option<StepFailure>,
}

impl ScenarioResult {
    pub fn is_pass(&self) -> bool {
        self.failure.is_none()
    }

    /// How this execution is tallied in load aggregation: the outcome kind
    /// of the first failing step, or Accepted when every step conformed. An
    /// extraction failure after an accepted response tallies as
    /// RecognizedButRejected so it can never inflate the success rate.
    pub fn outcome_kind(&self) -> OutcomeKind {
        match &self.failure {
            None => OutcomeKind::Accepted,
            Some(failure) => match &failure.error {
                StepError::Exhausted(e) => e.failure_kind(),
                StepError::Unexpected { outcome, .. } => outcome.kind(),
                StepError::Extraction(_) => OutcomeKind::RecognizedButRejected,
            },
        }
    }

    /// One-line failure description for records and reports.
    pub fn failure_detail(&self) -> Option<String> {
        self.failure
            .as_ref()
            .map(|f| format!("step {}: {}", f.step, f.error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{StubReply, StubTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn step(name: &str, path: &str, tag: &str) -> ScenarioStep {
        ScenarioStep::new(name, Endpoint::post(path), TypeCandidates::single(tag))
    }

    #[tokio::test]
    async fn extracted_values_flow_into_later_payloads() {
        let stub = Arc::new(
            StubTransport::new()
                .reply(
                    "/api/RegisterUser",
                    "RegisterUser",
                    StubReply::ok(json!({"userID": "u-42"}).to_string()),
                )
                .reply("/api/GetUserInfo", "GetUserInfo", StubReply::ok("{}")),
        );
        let harness = Harness::new(stub.clone());

        let scenario = Scenario::new("register then fetch")
            .step(
                step("register", "/api/RegisterUser", "RegisterUser")
                    .payload(|_| PayloadTemplate::new().field("username", "alice"))
                    .extract("userID", "/userID"),
            )
            .step(
                step("get info", "/api/GetUserInfo", "GetUserInfo")
                    .payload(|values| PayloadTemplate::new().field("userID", values.value("userID"))),
            );

        let result = scenario.run(&harness).await;
        assert!(result.is_pass(), "failure: {:?}", result.failure);

        // The second request carried exactly the value the first response produced.
        let sent = stub.sent();
        let info_request = sent
            .iter()
            .find(|r| r.path == "/api/GetUserInfo")
            .expect("GetUserInfo was called");
        assert_eq!(info_request.payload["userID"], "u-42");
    }

    #[tokio::test]
    async fn whole_body_extraction_handles_bare_scalars() {
        // Registration answers a bare quoted string, as the user service does.
        let stub = Arc::new(
            StubTransport::new()
                .reply("/api/RegisterUser", "RegisterUser", StubReply::ok("\"u-7\""))
                .reply("/api/GetUserInfo", "GetUserInfo", StubReply::ok("{}")),
        );
        let harness = Harness::new(stub.clone());

        let scenario = Scenario::new("bare scalar")
            .step(step("register", "/api/RegisterUser", "RegisterUser").extract("userID", ""))
            .step(
                step("get info", "/api/GetUserInfo", "GetUserInfo")
                    .payload(|values| PayloadTemplate::new().field("userID", values.value("userID"))),
            );

        let result = scenario.run(&harness).await;
        assert!(result.is_pass());
        let sent = stub.sent();
        let info_request = sent.iter().find(|r| r.path == "/api/GetUserInfo").unwrap();
        assert_eq!(info_request.payload["userID"], "u-7");
    }

    #[tokio::test]
    async fn a_failing_step_halts_before_later_steps_send_anything() {
        let stub = Arc::new(StubTransport::new().reply("/api/S1", "S1", StubReply::ok("{}")));
        // S2 has no rule: its probe exhausts on the default Unknown-type reply.
        let harness = Harness::new(stub.clone());

        let scenario = Scenario::new("halt")
            .step(step("one", "/api/S1", "S1"))
            .step(step("two", "/api/S2", "S2"))
            .step(step("three", "/api/S3", "S3"));

        let result = scenario.run(&harness).await;
        assert!(!result.is_pass());
        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.step, "two");
        assert!(matches!(failure.error, StepError::Exhausted(_)));
        assert_eq!(result.completed.len(), 1);
        assert_eq!(stub.calls("/api/S3"), 0);
    }

    #[tokio::test]
    async fn missing_extraction_field_fails_the_step() {
        let stub = Arc::new(StubTransport::new().reply(
            "/api/RegisterUser",
            "RegisterUser",
            StubReply::ok(json!({"unexpected": true}).to_string()),
        ));
        let harness = Harness::new(stub);

        let scenario = Scenario::new("missing field").step(
            step("register", "/api/RegisterUser", "RegisterUser").extract("userID", "/userID"),
        );

        let result = scenario.run(&harness).await;
        let failure = result.failure.as_ref().unwrap();
        assert!(matches!(failure.error, StepError::Extraction(_)));
        assert_eq!(result.outcome_kind(), OutcomeKind::RecognizedButRejected);
    }

    #[tokio::test]
    async fn rejected_expectation_passes_on_matching_business_failure() {
        let stub = Arc::new(StubTransport::new().reply(
            "/api/Login",
            "LoginUser",
            StubReply::status(400, "invalid credentials"),
        ));
        let harness = Harness::new(stub);

        let scenario = Scenario::new("wrong password is refused").step(
            step("login wrong", "/api/Login", "LoginUser").expect(Expect::Rejected {
                body_contains: Some("invalid credentials".to_string()),
            }),
        );

        let result = scenario.run(&harness).await;
        assert!(result.is_pass());
    }

    #[tokio::test]
    async fn rejected_expectation_fails_when_the_call_is_accepted() {
        let stub = Arc::new(StubTransport::new().reply("/api/Login", "LoginUser", StubReply::ok("{}")));
        let harness = Harness::new(stub);

        let scenario = Scenario::new("must refuse").step(
            step("login wrong", "/api/Login", "LoginUser")
                .expect(Expect::Rejected { body_contains: None }),
        );

        let result = scenario.run(&harness).await;
        let failure = result.failure.unwrap();
        assert!(matches!(failure.error, StepError::Unexpected { .. }));
    }
}
