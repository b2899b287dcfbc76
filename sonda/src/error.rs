use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::outcome::{Attempt, OutcomeKind};

/// Failure below the HTTP layer: the exchange never produced a status code
/// and a body. An HTTP-level 4xx/5xx is *not* a `TransportFailure` — those
/// are classified as [`Outcome`](crate::Outcome)s.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response body could not be read: {0}")]
    MalformedResponse(String),

    #[error("http error: {0}")]
    Http(String),
}

/// Every candidate tag was tried and none was understood by the endpoint.
///
/// This signals configuration or protocol drift, not a business failure:
/// either the candidate list is stale or the service changed its contract.
/// It always fails the owning scenario step or load execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub struct Exhausted {
    pub endpoint: String,
    pub attempts: Vec<Attempt>,
}

impl Exhausted {
    /// How an exhausted probe is tallied in load aggregation: a probe that
    /// only ever hit the network failure path counts as a transport error,
    /// anything else counts as an unrecognized tag.
    pub fn failure_kind(&self) -> OutcomeKind {
        let all_transport = self
            .attempts
            .iter()
            .all(|a| a.outcome.kind() == OutcomeKind::TransportError);
        if all_transport {
            OutcomeKind::TransportError
        } else {
            OutcomeKind::Unrecognized
        }
    }
}

impl fmt::Display for Exhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.attempts.iter().map(|a| a.tag.as_str()).collect();
        write!(
            f,
            "no candidate tag recognized by {} (tried: {})",
            self.endpoint,
            tags.join(", ")
        )
    }
}

/// An expected field was missing from an accepted response body, so a later
/// step cannot be given the value it depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("extracted value {name:?} not found at {path:?} in response body")]
pub struct ExtractionError {
    pub name: String,
    pub path: String,
}

/// Problems detected before anything is sent: bad candidate lists,
/// unparseable configuration, or an HTTP client that cannot be built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("candidate tag list must not be empty")]
    EmptyCandidates,

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
