//! Sonda — an adaptive conformance and load-testing harness for
//! message-typed HTTP APIs.
//!
//! A message-typed API dispatches behavior on a string discriminator field
//! inside a JSON body posted to a fixed path. In practice the exact
//! discriminator spelling is not always reliably known (`"RegisterUserMessage"`?
//! `"RegisterUser"`? `"registerUser"`?), and correctness has to hold up
//! under concurrency. Sonda probes an ordered list of candidate tags per
//! operation, separates "wrong tag, try another" from "right tag, the
//! business logic said no", chains multi-step workflows whose later
//! payloads depend on earlier responses, and drives concurrent load with a
//! success-rate verdict.
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`Transport`]: one request/response exchange, normalized to status +
//!   body. [`HttpTransport`] is the reqwest-backed implementation;
//!   [`testkit::StubTransport`] is the in-memory one for offline tests.
//! - [`Classifier`]: pure three-way mapping of a response to an
//!   [`Outcome`] — Accepted, RecognizedButRejected, or Unrecognized — with
//!   transport failures folded in as the fourth tag.
//! - [`Probe`]: the ordered candidate-tag search over one endpoint,
//!   stopping at the first understood outcome.
//! - [`Scenario`] / [`ScenarioStep`]: strictly sequential workflows where
//!   each step's payload may use values extracted from prior responses.
//! - [`LoadJob`]: N concurrent executions of a probe or scenario, joined
//!   without early cancellation and judged against a success-rate
//!   threshold.
//! - [`Aggregate`] / [`Metric`]: how per-execution records are collected
//!   into the mergeable [`OutcomeTally`].
//! - [`Report`] / [`Reporter`]: how a finished [`TestPlan`] run reaches
//!   stdout, JSON, or wherever else a reporter sends it.
//!
//! # Design goals
//!
//! - Protocol-discovery failures and business failures stay distinguishable
//!   end to end; an exhausted candidate list is a loud, typed signal, never
//!   silently tolerated.
//! - Concurrent executions share nothing but the HTTP connection pool: each
//!   carries its own synthetic identity and extracted values.
//! - Small, composable pieces — custom transports, aggregates, and
//!   reporters slot in through the same traits the built-ins use.
//!
//! # Example
//!
//! ```no_run
//! use sonda::{
//!     Endpoint, HarnessConfig, PayloadTemplate, Reporter, Scenario, ScenarioStep,
//!     StdoutReporter, TestPlan, TypeCandidates,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let harness = HarnessConfig::new("http://localhost:10010").build()?;
//!
//!     let register = ScenarioStep::new(
//!         "register",
//!         Endpoint::post("/api/RegisterUserMessage"),
//!         // Tried in order; the first understood spelling wins.
//!         TypeCandidates::new(["RegisterUserMessage", "RegisterUser", "registerUser"])?,
//!     )
//!     .payload(|_| {
//!         PayloadTemplate::new()
//!             .field("username", "probe_user")
//!             .field("passwordHash", "482c811da5d5b4bc6d497ffa98491e38")
//!     })
//!     // The service answers the new user ID as a bare scalar.
//!     .extract("userID", "");
//!
//!     let get_info = ScenarioStep::new(
//!         "get info",
//!         Endpoint::post("/api/GetUserInfo"),
//!         TypeCandidates::new(["GetUserInfoMessage", "GetUserInfo"])?,
//!     )
//!     .payload(|values| PayloadTemplate::new().field("userID", values.value("userID")));
//!
//!     let plan = TestPlan::new("user service conformance")
//!         .preflight(Endpoint::post("/api/LoginUser"))
//!         .scenario(Scenario::new("register then fetch").step(register).step(get_info));
//!
//!     let report = plan.run(&harness).await;
//!     StdoutReporter.report(report.clone()).await?;
//!     std::process::exit(report.exit_code());
//! }
//! ```
//!
//! # Feature flags
//!
//! - `builtins`: the stdout and JSON reporters for quick experiments and CI
//!   runners. (Enabled by default)
//!
//! # Where to start
//!
//! - Read the docs for [`Probe`], [`Scenario`], and [`LoadJob`], then
//!   [`TestPlan`] for the single-call boundary a runner drives.
//! - See `examples/` for a runnable plan against a local deployment, and
//!   [`testkit`] for exercising plans without one.

/// Outcome tallies and the aggregate trait
pub mod aggregate;
/// Deployment configuration
pub mod config;
/// Error taxonomy
pub mod error;
/// Concurrent load execution
pub mod load;
/// Endpoints, candidate tags, and payload templates
pub mod message;
/// Per-execution records
pub mod metric;
/// Outcome classification
pub mod outcome;
/// The harness context and test plans
pub mod plan;
/// Ordered candidate-tag probing
pub mod probe;
/// Reports and Reporters
pub mod report;
/// Dependency-chained workflows
pub mod scenario;
/// In-memory transport for offline tests
pub mod testkit;
/// The HTTP exchange layer
pub mod transport;

pub use aggregate::{Aggregate, OutcomeTally};
pub use config::HarnessConfig;
pub use error::{ConfigError, Exhausted, ExtractionError, TransportFailure};
pub use load::{LoadJob, LoadResult, LoadUnit, Verdict};
pub use message::{Endpoint, Method, PayloadTemplate, TypeCandidates};
pub use metric::{ExecutionRecord, Metric};
pub use outcome::{Attempt, Classifier, Outcome, OutcomeKind};
pub use plan::{Harness, TestPlan};
pub use probe::{Probe, ProbeHit};
pub use report::{PlanReport, Report, Reporter};
pub use scenario::{
    Binding, CompletedStep, Expect, Scenario, ScenarioResult, ScenarioStep, StepError,
    StepFailure, StepValues,
};
pub use transport::{HttpTransport, RawResponse, Transport};

#[cfg(feature = "builtins")]
pub use report::{JsonReporter, StdoutReporter};
