//! Best-effort extraction of incremental text from one stream frame.

use serde_json::Value;
use tracing::{debug, trace};

/// Text carried by one frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IncrementalRecord {
    /// Frame was structured data with a recognized text field
    Delta(String),
    /// Frame was not structured data, or its shape was not recognized
    Raw(String),
}

impl IncrementalRecord {
    /// Text to append to the running output.
    pub fn text(&self) -> &str {
        match self {
            IncrementalRecord::Delta(text) | IncrementalRecord::Raw(text) => text,
        }
    }

    /// Consumes the record, yielding its text.
    pub fn into_text(self) -> String {
        match self {
            IncrementalRecord::Delta(text) | IncrementalRecord::Raw(text) => text,
        }
    }

    /// Returns true for `Delta`.
    pub fn is_delta(&self) -> bool {
        matches!(self, IncrementalRecord::Delta(_))
    }
}

/// Extracts the incremental text from a frame. Never fails.
///
/// Recognized shapes, first match wins:
/// 1. `{"response": "<text>"}` (generate-style records)
/// 2. `{"message": {"content": "<text>"}}` (chat-style records)
///
/// Anything else, including valid JSON of another shape, is returned verbatim
/// as `Raw` so partially-conforming servers still produce visible output.
///
/// # Examples
///
/// ```
/// use prodify_console::{IncrementalRecord, extract_record};
///
/// assert_eq!(
///     extract_record(r#"{"response":"Hi","done":false}"#),
///     IncrementalRecord::Delta("Hi".to_string())
/// );
/// assert_eq!(extract_record("not-json"), IncrementalRecord::Raw("not-json".to_string()));
/// ```
pub fn extract_record(frame: &str) -> IncrementalRecord {
    let value = match serde_json::from_str::<Value>(frame) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, frame_len = frame.len(), "Frame is not JSON, keeping raw text");
            return IncrementalRecord::Raw(frame.to_string());
        }
    };

    if let Some(text) = value.get("response").and_then(Value::as_str) {
        return IncrementalRecord::Delta(text.to_string());
    }
    if let Some(text) = value.pointer("/message/content").and_then(Value::as_str) {
        return IncrementalRecord::Delta(text.to_string());
    }

    trace!(frame_len = frame.len(), "Unrecognized record shape, keeping raw text");
    IncrementalRecord::Raw(frame.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_record_is_delta() {
        assert_eq!(
            extract_record(r#"{"model":"m","response":" world","done":false}"#),
            IncrementalRecord::Delta(" world".into())
        );
    }

    #[test]
    fn final_generate_record_contributes_nothing() {
        let record = extract_record(r#"{"model":"m","response":"","done":true}"#);
        assert!(record.is_delta());
        assert_eq!(record.text(), "");
    }

    #[test]
    fn chat_record_is_delta() {
        assert_eq!(
            extract_record(r#"{"message":{"role":"assistant","content":"Hey"}}"#),
            IncrementalRecord::Delta("Hey".into())
        );
    }

    #[test]
    fn response_field_wins_over_message() {
        let record = extract_record(r#"{"response":"a","message":{"content":"b"}}"#);
        assert_eq!(record.into_text(), "a");
    }

    #[test]
    fn unknown_shapes_fall_back_to_raw() {
        for frame in [
            r#"{"error":"model not loaded"}"#,
            r#"{"response":42}"#,
            r#""just a string""#,
            "[1,2,3]",
            "null",
        ] {
            assert_eq!(extract_record(frame), IncrementalRecord::Raw(frame.into()));
        }
    }

    #[test]
    fn malformed_input_never_panics() {
        for frame in ["", "{", "}{", "\u{0}", "{\"response\":\"unterminated", "\r"] {
            let record = extract_record(frame);
            assert!(!record.is_delta());
            assert_eq!(record.text(), frame);
        }
    }
}
