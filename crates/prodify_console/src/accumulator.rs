//! Running output for an incremental response body.

use crate::{ByteStream, IncrementalRecord, Publisher, extract_record, frames};
use futures_util::{StreamExt, pin_mut};
use prodify_core::GenerationStatus;
use prodify_error::ConsoleError;
use tracing::{debug, instrument, warn};

/// How a stream consumption ended.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    /// Body ended normally
    Completed {
        /// Frames that contributed text
        frames: usize,
    },
    /// Body failed mid-stream; the partial text was kept
    Failed(ConsoleError),
    /// A newer submission or a cancellation took over the output
    Superseded,
}

/// Concatenates the text of every frame in arrival order.
///
/// Blank and whitespace-only frames carry no record and are skipped; every
/// other frame, structured or not, contributes its extracted text. The text
/// only ever grows.
#[derive(Debug, Default, Clone)]
pub struct StreamAccumulator {
    text: String,
    frames: usize,
    raw_frames: usize,
}

impl StreamAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one frame. Returns the extracted record, or `None` for a
    /// blank frame.
    pub fn push_frame(&mut self, frame: &str) -> Option<IncrementalRecord> {
        if frame.trim().is_empty() {
            return None;
        }
        let record = extract_record(frame);
        if !record.is_delta() {
            self.raw_frames += 1;
        }
        self.frames += 1;
        self.text.push_str(record.text());
        Some(record)
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Frames that contributed text.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Frames that were kept as raw text.
    pub fn raw_frames(&self) -> usize {
        self.raw_frames
    }

    /// Consumes `body`, publishing the full accumulated text after every
    /// contributing frame.
    ///
    /// The publisher is checked after every suspension point; once it stops
    /// being current the body is dropped unread.
    #[instrument(skip_all, fields(submission = publisher.submission()))]
    pub async fn run(mut self, body: ByteStream, publisher: &Publisher) -> StreamOutcome {
        if !publisher.set_status(GenerationStatus::Streaming) {
            return StreamOutcome::Superseded;
        }

        let frames = frames(body);
        pin_mut!(frames);
        while let Some(frame) = frames.next().await {
            if !publisher.is_current() {
                debug!(frames = self.frames, "Stream superseded, dropping body");
                return StreamOutcome::Superseded;
            }

            match frame {
                Ok(frame) => {
                    let Some(record) = self.push_frame(&frame) else {
                        continue;
                    };
                    publisher.metrics().record_frame(record.is_delta());
                    let text = self.text.clone();
                    if !publisher.publish(|state| state.text = text) {
                        return StreamOutcome::Superseded;
                    }
                }
                Err(e) => {
                    warn!(error = %e, frames = self.frames, "Stream failed, keeping partial text");
                    if !publisher.fail(None, e.kind().to_string()) {
                        return StreamOutcome::Superseded;
                    }
                    return StreamOutcome::Failed(e);
                }
            }
        }

        debug!(
            frames = self.frames,
            raw_frames = self.raw_frames,
            chars = self.text.chars().count(),
            "Stream finished"
        );
        if !publisher.complete(self.text) {
            return StreamOutcome::Superseded;
        }
        StreamOutcome::Completed {
            frames: self.frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConsoleMetrics, OutputChannel, SubmissionResponse};
    use bytes::Bytes;
    use prodify_error::ConsoleErrorKind;
    use std::sync::Arc;

    fn body(chunks: Vec<Result<&'static [u8], ConsoleError>>) -> ByteStream {
        SubmissionResponse::from_chunks(
            None,
            chunks
                .into_iter()
                .map(|c| c.map(Bytes::from_static))
                .collect::<Vec<_>>(),
        )
        .into_body()
    }

    fn setup() -> (Arc<OutputChannel>, Publisher) {
        let channel = Arc::new(OutputChannel::new());
        let submission = channel.begin();
        let publisher = Publisher::new(Arc::clone(&channel), submission, ConsoleMetrics::new());
        (channel, publisher)
    }

    #[test]
    fn skips_blank_frames() {
        let mut acc = StreamAccumulator::new();
        assert!(acc.push_frame("").is_none());
        assert!(acc.push_frame("  \r").is_none());
        acc.push_frame(r#"{"response":"a"}"#);
        acc.push_frame("raw");
        assert_eq!(acc.text(), "araw");
        assert_eq!(acc.frames(), 2);
        assert_eq!(acc.raw_frames(), 1);
    }

    #[tokio::test]
    async fn completes_with_concatenated_text() {
        let (channel, publisher) = setup();
        let outcome = StreamAccumulator::new()
            .run(
                body(vec![
                    Ok(br#"{"response":"Hel"#.as_slice()),
                    Ok(br#"lo"}"#.as_slice()),
                    Ok(b"\n{\"response\":\" world\"}\n".as_slice()),
                ]),
                &publisher,
            )
            .await;
        assert!(matches!(outcome, StreamOutcome::Completed { frames: 2 }));
        let state = channel.snapshot();
        assert_eq!(state.text, "Hello world");
        assert_eq!(state.status, GenerationStatus::Completed);
    }

    #[tokio::test]
    async fn failure_keeps_partial_text() {
        let (channel, publisher) = setup();
        let outcome = StreamAccumulator::new()
            .run(
                body(vec![
                    Ok(b"{\"response\":\"part\"}\n".as_slice()),
                    Err(ConsoleError::new(ConsoleErrorKind::Stream("reset".into()))),
                ]),
                &publisher,
            )
            .await;
        assert!(matches!(outcome, StreamOutcome::Failed(_)));
        let state = channel.snapshot();
        assert_eq!(state.text, "part");
        assert_eq!(state.status, GenerationStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("Stream interrupted: reset"));
    }

    #[tokio::test]
    async fn superseded_stream_stops_publishing() {
        let (channel, publisher) = setup();
        channel.begin();
        let outcome = StreamAccumulator::new()
            .run(
                body(vec![Ok(b"{\"response\":\"late\"}\n".as_slice())]),
                &publisher,
            )
            .await;
        assert!(matches!(outcome, StreamOutcome::Superseded));
        let state = channel.snapshot();
        assert_eq!(state.text, "");
        assert_eq!(state.status, GenerationStatus::Submitting);
    }
}
