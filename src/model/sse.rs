//! Minimal server-sent-events parser for streaming chat completions.
//!
//! Chat completion streams only ever use `data:` lines, so this parser
//! handles exactly that subset: buffer incoming text, split on newlines,
//! and hand back the payload of each complete `data:` line.

/// Incremental parser over an SSE byte stream decoded as UTF-8.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    /// Bytes held back because they end mid-way through a UTF-8 sequence.
    pending: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw network chunk. Chunk boundaries are arbitrary, so a
    /// multi-byte character may be split across chunks; its leading bytes
    /// stay buffered until the rest arrives instead of being decoded
    /// lossily. Invalid sequences become replacement characters.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut text = String::new();
        loop {
            let (valid, error_len) = match std::str::from_utf8(&self.pending) {
                Ok(_) => (self.pending.len(), None),
                Err(e) => (e.valid_up_to(), e.error_len()),
            };
            if valid > 0 {
                text.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or(""));
            }
            if valid == self.pending.len() {
                self.pending.clear();
                break;
            }
            match error_len {
                Some(bad) => {
                    text.push(char::REPLACEMENT_CHARACTER);
                    self.pending.drain(..valid + bad);
                }
                None => {
                    // Incomplete trailing sequence; wait for the next chunk.
                    self.pending.drain(..valid);
                    break;
                }
            }
        }
        self.feed(&text)
    }

    /// Feed a chunk of text and collect the data payloads of every line
    /// completed by it. Partial lines stay buffered for the next feed.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.strip_prefix(' ').unwrap_or(data).to_string());
            }
            // Blank lines and other fields (event:, id:, comments) are
            // irrelevant to this protocol subset.
        }
        payloads
    }
}
