use serde::{Deserialize, Serialize};

use crate::transport::RawResponse;

/// Three-way classification of one HTTP exchange, plus the case where the
/// exchange never completed.
///
/// The split between [`Unrecognized`](Outcome::Unrecognized) ("wrong tag,
/// try another") and [`RecognizedButRejected`](Outcome::RecognizedButRejected)
/// ("right tag, the business logic said no") is what lets the probe engine
/// search candidate tags without masking real failures behind a wrong-guess
/// narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// 2xx: the message shape and the request were both accepted.
    Accepted { status: u16, body: String },
    /// The endpoint understood the message shape but rejected the request
    /// itself (validation, credentials, business rules).
    RecognizedButRejected { status: u16, body: String },
    /// The endpoint did not recognize the message shape; the next candidate
    /// tag may fare better.
    Unrecognized { status: u16, body: String },
    /// No HTTP-level response at all: connection failure, timeout, or an
    /// unreadable body.
    TransportError { cause: String },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Accepted { .. } => OutcomeKind::Accepted,
            Outcome::RecognizedButRejected { .. } => OutcomeKind::RecognizedButRejected,
            Outcome::Unrecognized { .. } => OutcomeKind::Unrecognized,
            Outcome::TransportError { .. } => OutcomeKind::TransportError,
        }
    }

    /// Whether the endpoint understood the message shape, whatever it then
    /// decided about the request. Understood outcomes end a candidate search.
    pub fn is_understood(&self) -> bool {
        matches!(
            self,
            Outcome::Accepted { .. } | Outcome::RecognizedButRejected { .. }
        )
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Accepted { status, .. }
            | Outcome::RecognizedButRejected { status, .. }
            | Outcome::Unrecognized { status, .. } => Some(*status),
            Outcome::TransportError { .. } => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Outcome::Accepted { body, .. }
            | Outcome::RecognizedButRejected { body, .. }
            | Outcome::Unrecognized { body, .. } => Some(body),
            Outcome::TransportError { .. } => None,
        }
    }
}

/// Discriminant of [`Outcome`], used for counting in aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    Accepted,
    RecognizedButRejected,
    Unrecognized,
    TransportError,
}

/// One tried candidate tag and what came back for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub tag: String,
    pub outcome: Outcome,
}

/// Pure mapping from a raw response to an [`Outcome`].
///
/// The unknown-type markers are deployment configuration, not a protocol
/// constant: the observed services answer an unknown discriminator with a
/// 4xx whose body contains `"Unknown type"`, but other deployments word it
/// differently.
///
/// An ambiguous body (client error, no marker) classifies as
/// `RecognizedButRejected`: treating uncertain failures as "try the next
/// candidate" would risk silently masking real bugs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    unknown_markers: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            unknown_markers: vec!["Unknown type".to_string()],
        }
    }
}

impl Classifier {
    pub fn new<I, S>(unknown_markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unknown_markers: unknown_markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classify(&self, response: &RawResponse) -> Outcome {
        let status = response.status;
        let body = response.body.clone();
        match status {
            200..=299 => Outcome::Accepted { status, body },
            400..=499 if self.matches_marker(&response.body) => {
                Outcome::Unrecognized { status, body }
            }
            _ => Outcome::RecognizedButRejected { status, body },
        }
    }

    fn matches_marker(&self, body: &str) -> bool {
        self.unknown_markers.iter().any(|m| body.contains(m))
    }
}
