//! Newline framing for incremental response bodies.
//!
//! Chunks arrive with arbitrary boundaries: a frame, or a single multi-byte
//! character, may be split across two reads. Splitting happens on raw bytes
//! because `\n` never occurs inside a UTF-8 multi-byte sequence, so text is
//! only decoded once a whole frame is buffered.

use async_stream::try_stream;
use futures_util::{Stream, StreamExt, pin_mut};

/// Splits a byte stream into newline-delimited frames.
///
/// The incomplete tail of each chunk is held back and prefixed onto the next
/// chunk. Frames never contain `\n`, are emitted in stream order, and empty
/// frames (blank lines) are emitted as empty strings; skipping them is the
/// consumer's decision.
///
/// # Examples
///
/// ```
/// use prodify_console::LineFrameDecoder;
///
/// let mut decoder = LineFrameDecoder::new();
/// assert_eq!(decoder.decode(b"{\"response\":\"He"), Vec::<String>::new());
/// assert_eq!(decoder.decode(b"llo\"}\n{\"resp"), vec![r#"{"response":"Hello"}"#]);
/// assert_eq!(decoder.finish().as_deref(), Some(r#"{"resp"#));
/// ```
#[derive(Debug, Default, Clone)]
pub struct LineFrameDecoder {
    pending: Vec<u8>,
}

impl LineFrameDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every frame it completed.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            frames.push(String::from_utf8_lossy(&self.pending[start..end]).into_owned());
            start = end + 1;
        }
        self.pending.drain(..start);
        frames
    }

    /// Flushes the buffered partial frame at end of stream, if non-empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let frame = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(frame)
    }

    /// Bytes currently held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Adapts a chunk stream into a lazy stream of frames.
///
/// The first chunk error is forwarded and ends the frame stream; a partial
/// frame buffered at that point is dropped.
pub fn frames<S, B, E>(chunks: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    try_stream! {
        let mut decoder = LineFrameDecoder::new();
        pin_mut!(chunks);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            for frame in decoder.decode(chunk.as_ref()) {
                yield frame;
            }
        }
        if let Some(frame) = decoder.finish() {
            yield frame;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn decode_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut decoder = LineFrameDecoder::new();
        let mut frames: Vec<String> = chunks.iter().flat_map(|c| decoder.decode(c)).collect();
        frames.extend(decoder.finish());
        frames
    }

    fn rebuild(frames: &[String], input: &str) -> String {
        let mut text = frames.join("\n");
        if input.ends_with('\n') {
            text.push('\n');
        }
        text
    }

    #[test]
    fn reassembles_any_two_way_split() {
        let input = "{\"response\":\"Grüße\"}\nnot-json\n\n{\"message\":{\"content\":\"ಬೆಂಗಳೂರು\"}}\n";
        let bytes = input.as_bytes();
        for cut in 0..=bytes.len() {
            let frames = decode_all(&[&bytes[..cut], &bytes[cut..]]);
            assert_eq!(rebuild(&frames, input), input, "split at byte {}", cut);
            assert!(frames.iter().all(|f| !f.contains('\n')));
        }
    }

    #[test]
    fn reassembles_byte_at_a_time() {
        let input = "a\nåß\n€ tail";
        let chunks: Vec<&[u8]> = input.as_bytes().chunks(1).collect();
        let frames = decode_all(&chunks);
        assert_eq!(frames, vec!["a", "åß", "€ tail"]);
        assert_eq!(rebuild(&frames, input), input);
    }

    #[test]
    fn holds_back_partial_segment() {
        let mut decoder = LineFrameDecoder::new();
        assert!(decoder.decode(b"partial").is_empty());
        assert_eq!(decoder.pending_len(), 7);
        assert_eq!(decoder.decode(b" line\nnext"), vec!["partial line"]);
        assert_eq!(decoder.finish().as_deref(), Some("next"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn blank_lines_become_empty_frames() {
        assert_eq!(decode_all(&[b"\n\nx\n".as_slice()]), vec!["", "", "x"]);
    }

    #[tokio::test]
    async fn frame_stream_flushes_tail_and_stops_on_error() {
        let chunks = stream::iter(vec![
            Ok::<_, String>(b"one\ntw".to_vec()),
            Ok(b"o\nthree".to_vec()),
        ]);
        let collected: Vec<_> = frames(chunks).collect().await;
        assert_eq!(
            collected,
            vec![Ok("one".to_string()), Ok("two".to_string()), Ok("three".to_string())]
        );

        let failing = stream::iter(vec![
            Ok(b"kept\nlost".to_vec()),
            Err("connection reset".to_string()),
        ]);
        let collected: Vec<_> = frames(failing).collect().await;
        assert_eq!(
            collected,
            vec![Ok("kept".to_string()), Err("connection reset".to_string())]
        );
    }
}
