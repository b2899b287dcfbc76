use std::fmt::Debug;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::metric::{ExecutionRecord, Metric};
use crate::outcome::OutcomeKind;

/// Collects raw [`Metric`] values into a compact, mergeable representation.
///
/// Aggregates store counts and records, not derived statistics — success
/// rates and verdicts are computed at the report stage so nothing is lost
/// along the way. `merge` must be associative and commutative: worker-local
/// aggregates are merged in arbitrary order after join.
pub trait Aggregate
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
    /// The metric type this aggregate summarizes.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Aggregate multiple metrics into the current instance.
    fn aggregate(&mut self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.consume(m));
    }

    /// Incorporate a single metric into the aggregate.
    fn consume(&mut self, metric: &Self::Metric);

    /// Combine two different aggregates into one.
    fn merge(&mut self, other: Self);
}

/// Per-outcome-tag counts over a set of load executions, plus the full
/// per-attempt record list for diagnostics.
///
/// Invariant: the four per-tag counts always sum to `total`.
#[derive(Debug, Clone, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub accepted: usize,
    pub rejected: usize,
    pub unrecognized: usize,
    pub transport_errors: usize,
    pub total: usize,
    pub records: Vec<ExecutionRecord>,
}

impl Aggregate for OutcomeTally {
    type Metric = ExecutionRecord;

    fn new() -> Self {
        OutcomeTally::default()
    }

    fn consume(&mut self, metric: &Self::Metric) {
        match metric.kind {
            OutcomeKind::Accepted => self.accepted += 1,
            OutcomeKind::RecognizedButRejected => self.rejected += 1,
            OutcomeKind::Unrecognized => self.unrecognized += 1,
            OutcomeKind::TransportError => self.transport_errors += 1,
        }
        self.total += 1;
        self.records.push(metric.clone());
    }

    fn merge(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.unrecognized += other.unrecognized;
        self.transport_errors += other.transport_errors;
        self.total += other.total;
        self.records.extend(other.records);
    }
}

impl OutcomeTally {
    /// Accepted executions over total. Zero when nothing ran.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.accepted as f64 / self.total as f64
        }
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Accepted => self.accepted,
            OutcomeKind::RecognizedButRejected => self.rejected,
            OutcomeKind::Unrecognized => self.unrecognized,
            OutcomeKind::TransportError => self.transport_errors,
        }
    }
}
