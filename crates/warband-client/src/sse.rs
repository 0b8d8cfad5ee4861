//! Incremental decoder for `text/event-stream` bodies.
//!
//! Only the `data` field matters to the optimizer stream; `event`, `id` and
//! `retry` are accepted and ignored. Lines end in `\n` or `\r\n`.

/// Turns arbitrary byte chunks into complete event payloads.
///
/// Bytes are buffered until a line is complete, so chunk boundaries may fall
/// anywhere, including inside a multi-byte UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: String,
    has_data: bool,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the payloads of every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut buf = core::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut rest = buf.as_slice();
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let line = rest[..pos].strip_suffix(b"\r").unwrap_or(&rest[..pos]);
            if let Some(event) = self.line(&String::from_utf8_lossy(line)) {
                events.push(event);
            }
            rest = &rest[pos + 1..];
        }
        self.pending = rest.to_vec();
        events
    }

    /// Flushes at end of stream: an event whose terminating blank line never
    /// arrived is still delivered if it carried data.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let line = core::mem::take(&mut self.pending);
            let line = line.strip_suffix(b"\r").unwrap_or(&line);
            if let Some(event) = self.line(&String::from_utf8_lossy(line)) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(value);
            self.has_data = true;
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(core::mem::take(&mut self.data))
    }
}
