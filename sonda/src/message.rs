use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// HTTP method of a target endpoint. The message-typed services observed in
/// the wild dispatch everything over POST; GET exists for health probes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Post,
    Get,
}

/// A target URL path plus method. Endpoints are configuration: defined once,
/// read-only for the harness's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub path: String,
    #[serde(default)]
    pub method: Method,
}

impl Endpoint {
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Post,
        }
    }
}

/// An ordered, non-empty list of discriminator tags to try for one logical
/// operation. Order matters: earlier entries are preferred and tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct TypeCandidates(Vec<String>);

impl TypeCandidates {
    /// Build a candidate list, rejecting the empty case up front.
    pub fn new<I, S>(tags: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.is_empty() {
            return Err(ConfigError::EmptyCandidates);
        }
        Ok(Self(tags))
    }

    /// A single known tag, for operations whose spelling is not in doubt.
    pub fn single(tag: impl Into<String>) -> Self {
        Self(vec![tag.into()])
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn tags(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for TypeCandidates {
    type Error = ConfigError;

    fn try_from(tags: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(tags)
    }
}

impl From<TypeCandidates> for Vec<String> {
    fn from(candidates: TypeCandidates) -> Self {
        candidates.0
    }
}

/// Field map for a request body, with the discriminator field left open.
/// [`materialize`](Self::materialize) fills it in per candidate tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadTemplate {
    fields: Map<String, Value>,
}

impl PayloadTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Concrete payload with the discriminator substituted. A template field
    /// that collides with the discriminator name is overwritten.
    pub fn materialize(&self, type_field: &str, tag: &str) -> Value {
        let mut fields = self.fields.clone();
        fields.insert(type_field.to_string(), Value::String(tag.to_string()));
        Value::Object(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_candidate_list_is_rejected() {
        let err = TypeCandidates::new(Vec::<String>::new());
        assert!(matches!(err, Err(ConfigError::EmptyCandidates)));
    }

    #[test]
    fn candidates_preserve_order() {
        let candidates =
            TypeCandidates::new(["RegisterUserMessage", "RegisterUser", "registerUser"]).unwrap();
        let tags: Vec<&str> = candidates.iter().collect();
        assert_eq!(tags, ["RegisterUserMessage", "RegisterUser", "registerUser"]);
    }

    #[test]
    fn candidates_deserialize_through_non_empty_check() {
        let ok: Result<TypeCandidates, _> = serde_json::from_str(r#"["A","B"]"#);
        assert!(ok.is_ok());
        let empty: Result<TypeCandidates, _> = serde_json::from_str("[]");
        assert!(empty.is_err());
    }

    #[test]
    fn materialize_injects_discriminator() {
        let template = PayloadTemplate::new()
            .field("username", "alice")
            .field("drawCount", 1);
        let payload = template.materialize("type", "DrawCardMessage");
        assert_eq!(
            payload,
            json!({"type": "DrawCardMessage", "username": "alice", "drawCount": 1})
        );
    }

    #[test]
    fn materialize_does_not_mutate_the_template() {
        let template = PayloadTemplate::new().field("k", "v");
        let first = template.materialize("type", "A");
        let second = template.materialize("type", "B");
        assert_eq!(first["type"], "A");
        assert_eq!(second["type"], "B");
    }
}
