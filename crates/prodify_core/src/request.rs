//! Generation request submitted by the UI collaborator.

use derive_builder::Builder;
use derive_getters::Getters;
use prodify_error::{ConsoleError, ConsoleErrorKind};
use serde::{Deserialize, Serialize};

/// Smallest accepted `max_tokens`.
pub const MAX_TOKENS_MIN: u32 = 10;
/// Largest accepted `max_tokens`.
pub const MAX_TOKENS_MAX: u32 = 500;
/// Granularity of `max_tokens`, matching the UI slider.
pub const MAX_TOKENS_STEP: u32 = 10;
/// `max_tokens` used when the caller does not pick one.
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Snaps a token budget onto the slider grid: nearest step, clamped into range.
///
/// # Examples
///
/// ```
/// use prodify_core::quantize_max_tokens;
///
/// assert_eq!(quantize_max_tokens(0), 10);
/// assert_eq!(quantize_max_tokens(144), 140);
/// assert_eq!(quantize_max_tokens(145), 150);
/// assert_eq!(quantize_max_tokens(9000), 500);
/// ```
pub fn quantize_max_tokens(value: u32) -> u32 {
    let clamped = value.clamp(MAX_TOKENS_MIN, MAX_TOKENS_MAX);
    let snapped = (clamped + MAX_TOKENS_STEP / 2) / MAX_TOKENS_STEP * MAX_TOKENS_STEP;
    snapped.clamp(MAX_TOKENS_MIN, MAX_TOKENS_MAX)
}

/// A single generation request. Immutable once built.
///
/// Serializes to the gateway's submission body:
/// `{"model", "prompt", "max_tokens", "temperature"?, "top_p"?, "stream"?}`.
///
/// # Examples
///
/// ```
/// use prodify_core::GenerationRequest;
///
/// let request = GenerationRequest::builder()
///     .model("qwen3:0.6b")
///     .prompt("Once upon a time in Bangalore,")
///     .max_tokens(123u32)
///     .build()
///     .expect("valid request");
///
/// assert_eq!(*request.max_tokens(), 120);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, Builder)]
#[serde(try_from = "UncheckedRequest")]
#[builder(setter(into), build_fn(private, name = "build_unchecked"))]
pub struct GenerationRequest {
    /// Model identifier as listed by the gateway
    model: String,
    /// Prompt text, sent verbatim
    prompt: String,
    /// Token budget, quantized to [`MAX_TOKENS_STEP`]
    #[builder(default = "DEFAULT_MAX_TOKENS")]
    max_tokens: u32,
    /// Sampling temperature
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Nucleus sampling threshold
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    /// Ask the gateway for an incremental response
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

impl GenerationRequest {
    /// Creates a new builder for `GenerationRequest`.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    /// Builds a request from the three values the UI always supplies.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the model is empty or the prompt is blank.
    #[track_caller]
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        max_tokens: u32,
    ) -> Result<Self, ConsoleError> {
        Self::builder()
            .model(model)
            .prompt(prompt)
            .max_tokens(max_tokens)
            .build()
    }

    #[track_caller]
    fn validated(mut self) -> Result<Self, ConsoleError> {
        if self.model.trim().is_empty() {
            return Err(ConsoleError::new(ConsoleErrorKind::InvalidRequest(
                "model must not be empty".to_string(),
            )));
        }
        if self.prompt.trim().is_empty() {
            return Err(ConsoleError::new(ConsoleErrorKind::InvalidRequest(
                "prompt must not be blank".to_string(),
            )));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConsoleError::new(ConsoleErrorKind::InvalidRequest(format!(
                    "temperature {} outside 0.0..=2.0",
                    temperature
                ))));
            }
        }
        if let Some(top_p) = self.top_p {
            if !(top_p > 0.0 && top_p <= 1.0) {
                return Err(ConsoleError::new(ConsoleErrorKind::InvalidRequest(format!(
                    "top_p {} outside (0.0, 1.0]",
                    top_p
                ))));
            }
        }
        self.max_tokens = quantize_max_tokens(self.max_tokens);
        Ok(self)
    }
}

/// Wire form of a request before validation.
#[derive(Deserialize)]
struct UncheckedRequest {
    model: String,
    prompt: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    top_p: Option<f32>,
    #[serde(default)]
    stream: Option<bool>,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl TryFrom<UncheckedRequest> for GenerationRequest {
    type Error = ConsoleError;

    fn try_from(raw: UncheckedRequest) -> Result<Self, Self::Error> {
        GenerationRequest {
            model: raw.model,
            prompt: raw.prompt,
            max_tokens: raw.max_tokens,
            temperature: raw.temperature,
            top_p: raw.top_p,
            stream: raw.stream,
        }
        .validated()
    }
}

impl GenerationRequestBuilder {
    /// Builds and validates the request.
    ///
    /// # Errors
    ///
    /// Returns `Builder` when a required field is missing and
    /// `InvalidRequest` when a field is out of range.
    #[track_caller]
    pub fn build(&self) -> Result<GenerationRequest, ConsoleError> {
        let request = self
            .build_unchecked()
            .map_err(|e| ConsoleError::new(ConsoleErrorKind::Builder(e.to_string())))?;
        request.validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_max_tokens() {
        let request = GenerationRequest::builder()
            .model("m")
            .prompt("p")
            .build()
            .unwrap();
        assert_eq!(*request.max_tokens(), DEFAULT_MAX_TOKENS);
        assert_eq!(*request.temperature(), None);
    }

    #[test]
    fn rejects_blank_prompt() {
        let err = GenerationRequest::new("m", "   \n", 100).unwrap_err();
        assert!(matches!(err.kind(), ConsoleErrorKind::InvalidRequest(_)));
    }

    #[test]
    fn rejects_empty_model() {
        let err = GenerationRequest::new("", "hello", 100).unwrap_err();
        assert!(matches!(err.kind(), ConsoleErrorKind::InvalidRequest(_)));
    }

    #[test]
    fn deserializing_validates() {
        let request: GenerationRequest =
            serde_json::from_str(r#"{"model":"m","prompt":"p","max_tokens":144}"#).unwrap();
        assert_eq!(*request.max_tokens(), 140);

        let err = serde_json::from_str::<GenerationRequest>(r#"{"model":"m","prompt":"  "}"#)
            .unwrap_err();
        assert!(err.to_string().contains("prompt must not be blank"));
    }

    #[test]
    fn missing_model_is_builder_error() {
        let err = GenerationRequest::builder().prompt("hi").build().unwrap_err();
        assert!(matches!(err.kind(), ConsoleErrorKind::Builder(_)));
    }

    #[test]
    fn rejects_out_of_range_sampling() {
        let err = GenerationRequest::builder()
            .model("m")
            .prompt("p")
            .temperature(3.5f32)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("temperature"));

        let err = GenerationRequest::builder()
            .model("m")
            .prompt("p")
            .top_p(0.0f32)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("top_p"));
    }

    #[test]
    fn prompt_is_sent_untrimmed() {
        let request = GenerationRequest::new("m", "  spaced  ", 50).unwrap();
        assert_eq!(request.prompt(), "  spaced  ");
    }

    #[test]
    fn serializes_submission_body() {
        let request = GenerationRequest::builder()
            .model("qwen3:0.6b")
            .prompt("Why is the sky blue?")
            .max_tokens(100u32)
            .temperature(0.7f32)
            .build()
            .unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "qwen3:0.6b");
        assert_eq!(body["max_tokens"], 100);
        assert!(body.get("top_p").is_none());
        assert!(body.get("stream").is_none());
    }
}
