use std::fmt::Debug;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::outcome::OutcomeKind;

/// The smallest unit of measurement the harness produces: one record per
/// executed load unit. Metrics can be composed of other metrics as well.
pub trait Metric
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
}

/// Result of one load execution: which worker ran it, how its outcome was
/// classified, and how long the whole unit took.
///
/// `detail` is a short human-readable note for non-accepted executions
/// (failing step, status, tried tags); it is `None` on success.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub worker: u32,
    pub kind: OutcomeKind,
    pub detail: Option<String>,
    pub latency: Duration,
}

impl Metric for ExecutionRecord {}
