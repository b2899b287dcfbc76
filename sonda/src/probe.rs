use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::Exhausted;
use crate::message::{Endpoint, PayloadTemplate, TypeCandidates};
use crate::outcome::{Attempt, Outcome};
use crate::plan::Harness;

/// One logical operation to discover: an endpoint, the ordered candidate
/// tags for its discriminator, and the rest of the payload.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Probe {
    pub endpoint: Endpoint,
    pub candidates: TypeCandidates,
    #[builder(default)]
    pub template: PayloadTemplate,
}

/// A candidate search that ended on an understood outcome: the tag the
/// endpoint understood, what it answered, and every attempt on the way
/// there (the understood one included, last).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeHit {
    pub tag: String,
    pub outcome: Outcome,
    pub attempts: Vec<Attempt>,
}

impl Probe {
    /// Try candidate tags strictly in order, one request each, and stop on
    /// the first understood outcome — Accepted or RecognizedButRejected
    /// both mean the tag landed, so neither triggers a further candidate.
    /// Unrecognized and transport failures fall through to the next tag.
    ///
    /// Issues at most one transport call per candidate.
    pub async fn run(&self, harness: &Harness) -> Result<ProbeHit, Exhausted> {
        let mut attempts = Vec::new();
        for tag in self.candidates.iter() {
            let payload = self.template.materialize(harness.type_field(), tag);
            let outcome = harness.exchange(&self.endpoint, &payload).await;
            debug!(
                endpoint = %self.endpoint.path,
                tag,
                kind = ?outcome.kind(),
                "probe attempt"
            );
            attempts.push(Attempt {
                tag: tag.to_string(),
                outcome: outcome.clone(),
            });
            if outcome.is_understood() {
                return Ok(ProbeHit {
                    tag: tag.to_string(),
                    outcome,
                    attempts,
                });
            }
        }
        Err(Exhausted {
            endpoint: self.endpoint.path.clone(),
            attempts,
        })
    }
}
