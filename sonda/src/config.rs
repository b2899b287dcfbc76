use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::outcome::Classifier;
use crate::plan::Harness;
use crate::transport::HttpTransport;

/// Deployment-level configuration: where the service lives and how its
/// wire conventions deviate from the defaults. Everything but the base URL
/// has a sensible default, so a minimal YAML file is one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the discriminator field in request bodies.
    #[serde(default = "default_type_field")]
    pub type_field: String,
    /// Body substrings that mark a 4xx as "message shape not recognized".
    #[serde(default = "default_unknown_markers")]
    pub unknown_markers: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_type_field() -> String {
    "type".to_string()
}

fn default_unknown_markers() -> Vec<String> {
    vec!["Unknown type".to_string()]
}

impl HarnessConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            type_field: default_type_field(),
            unknown_markers: default_unknown_markers(),
        }
    }

    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Build a live harness: an HTTP transport with the configured timeout
    /// plus a classifier carrying the configured markers.
    pub fn build(&self) -> Result<Harness, ConfigError> {
        let transport =
            HttpTransport::with_timeout(&self.base_url, Duration::from_secs(self.timeout_secs))?;
        Ok(Harness::new(Arc::new(transport))
            .with_classifier(Classifier::new(self.unknown_markers.clone()))
            .with_type_field(self.type_field.clone()))
    }
}
