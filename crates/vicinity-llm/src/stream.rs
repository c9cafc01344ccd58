//! Reassembly of newline-delimited JSON chat streams.
//!
//! The chat endpoint answers with one JSON object per line, each carrying a
//! fragment in `message.content`. Network reads split the body at
//! arbitrary byte offsets, so bytes are buffered until a newline arrives.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(default)]
    message: Option<StreamMessage>,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Accumulates answer text from a chunked NDJSON body.
///
/// Lines that are not UTF-8 or not valid JSON are counted and skipped.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    pending: Vec<u8>,
    text: String,
    skipped: usize,
}

impl StreamAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next slice of the body.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return;
        };
        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
        for line in complete.split(|&b| b == b'\n') {
            self.consume(line);
        }
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of lines skipped as malformed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Flush the trailing partial line and return the full text.
    pub fn finish(mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        self.consume(&rest);
        if self.skipped > 0 {
            log::debug!("Skipped {} malformed stream lines", self.skipped);
        }
        self.text
    }

    fn consume(&mut self, line: &[u8]) {
        let Ok(line) = std::str::from_utf8(line) else {
            self.skipped += 1;
            return;
        };
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<StreamLine>(line) {
            Ok(parsed) => {
                if let Some(content) = parsed.message.and_then(|m| m.content) {
                    self.text.push_str(&content);
                }
            }
            Err(_) => self.skipped += 1,
        }
    }
}
