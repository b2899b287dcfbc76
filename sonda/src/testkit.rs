//! In-memory transport for exercising plans without a live deployment.
//!
//! `StubTransport` answers from scripted replies keyed by `(path, tag)`,
//! records every payload it was sent, and counts calls per endpoint. Any
//! request with no matching rule gets a 400 whose body says
//! `Unknown type: <tag>` — the same shape the real message-typed services
//! answer with — so unrecognized-tag paths work out of the box.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportFailure;
use crate::message::Endpoint;
use crate::transport::{RawResponse, Transport};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum StubReply {
    Respond(RawResponse),
    Unreachable(String),
}

impl StubReply {
    /// 200 with the given body (pass JSON text for JSON-speaking tests).
    pub fn ok(body: impl Into<String>) -> Self {
        StubReply::Respond(RawResponse {
            status: 200,
            body: body.into(),
        })
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        StubReply::Respond(RawResponse {
            status,
            body: body.into(),
        })
    }

    /// Simulates a connection-level failure.
    pub fn unreachable(cause: impl Into<String>) -> Self {
        StubReply::Unreachable(cause.into())
    }
}

/// A request the stub saw, as sent.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub path: String,
    pub payload: Value,
}

/// Scripted transport. Replies registered for the same `(path, tag)` are
/// served in registration order; the last one repeats once the queue is
/// down to it, so a single registration answers any number of calls.
pub struct StubTransport {
    type_field: String,
    rules: Mutex<HashMap<(String, String), VecDeque<StubReply>>>,
    log: Mutex<Vec<SentRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            type_field: "type".to_string(),
            rules: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Match requests on a different discriminator field name.
    pub fn with_type_field(mut self, type_field: impl Into<String>) -> Self {
        self.type_field = type_field.into();
        self
    }

    /// Register a reply for requests to `path` carrying `tag` as their
    /// discriminator. Use `""` for requests without one.
    pub fn reply(self, path: &str, tag: &str, reply: StubReply) -> Self {
        self.rules
            .lock()
            .expect("stub rules poisoned")
            .entry((path.to_string(), tag.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request seen so far, in arrival order.
    pub fn sent(&self) -> Vec<SentRequest> {
        self.log.lock().expect("stub log poisoned").clone()
    }

    /// Number of requests that hit `path`, any tag.
    pub fn calls(&self, path: &str) -> usize {
        self.log
            .lock()
            .expect("stub log poisoned")
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    fn next_reply(&self, path: &str, tag: &str) -> Option<StubReply> {
        let mut rules = self.rules.lock().expect("stub rules poisoned");
        let queue = rules.get_mut(&(path.to_string(), tag.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Default for StubTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(
        &self,
        endpoint: &Endpoint,
        payload: &Value,
    ) -> Result<RawResponse, TransportFailure> {
        let tag = payload
            .get(&self.type_field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        self.log
            .lock()
            .expect("stub log poisoned")
            .push(SentRequest {
                path: endpoint.path.clone(),
                payload: payload.clone(),
            });

        match self.next_reply(&endpoint.path, &tag) {
            Some(StubReply::Respond(response)) => Ok(response),
            Some(StubReply::Unreachable(cause)) => Err(TransportFailure::Connect(cause)),
            None => Ok(RawResponse {
                status: 400,
                body: format!("Unknown type: {tag}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unmatched_requests_get_the_unknown_type_reply() {
        let stub = StubTransport::new();
        let response = stub
            .send(
                &Endpoint::post("/api/Nope"),
                &serde_json::json!({"type": "NopeMessage"}),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 400);
        assert!(response.body.contains("Unknown type: NopeMessage"));
    }

    #[tokio::test]
    async fn sequenced_replies_drain_then_repeat_the_last() {
        let stub = StubTransport::new()
            .reply("/api/Op", "Op", StubReply::ok("first"))
            .reply("/api/Op", "Op", StubReply::ok("second"));
        let endpoint = Endpoint::post("/api/Op");
        let payload = serde_json::json!({"type": "Op"});

        let bodies: Vec<String> = [
            stub.send(&endpoint, &payload).await.unwrap().body,
            stub.send(&endpoint, &payload).await.unwrap().body,
            stub.send(&endpoint, &payload).await.unwrap().body,
        ]
        .into();
        assert_eq!(bodies, ["first", "second", "second"]);
    }
}
