//! Data transfer objects for the gateway's auxiliary endpoints.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Body of `GET /models`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Getters)]
pub struct ModelsResponse {
    /// Model names available on the gateway
    #[serde(default)]
    models: Vec<String>,
}

impl ModelsResponse {
    /// Consumes the response, yielding the model names.
    pub fn into_models(self) -> Vec<String> {
        self.models
    }
}

/// Body of `GET /healthz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Getters)]
pub struct Health {
    /// Whether the gateway process is alive
    #[serde(default)]
    ok: bool,
}

/// Body of `GET /readyz`.
///
/// A ready gateway reports how many models its backend exposes; an unready
/// one reports why.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Getters)]
pub struct Readiness {
    /// Whether the model backend is reachable
    ready: bool,
    /// Number of models available when ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    models: Option<usize>,
    /// Reason the gateway is not ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_shapes() {
        let ready: Readiness = serde_json::from_str(r#"{"ready": true, "models": 3}"#).unwrap();
        assert!(*ready.ready());
        assert_eq!(*ready.models(), Some(3));

        let down: Readiness =
            serde_json::from_str(r#"{"ready": false, "error": "connection refused"}"#).unwrap();
        assert!(!*down.ready());
        assert_eq!(down.error().as_deref(), Some("connection refused"));
    }

    #[test]
    fn models_default_to_empty() {
        let models: ModelsResponse = serde_json::from_str("{}").unwrap();
        assert!(models.into_models().is_empty());
    }
}
