//! SSE (Server-Sent Events) line reassembly.
//!
//! Network chunks do not respect line boundaries, and a multi-byte UTF-8
//! character may be split between two chunks. [`LineReassembler`] buffers
//! both kinds of partial input and yields only complete lines:
//!
//! ```text
//! chunk 1: b"data: {\"a\":"      -> []
//! chunk 2: b"1}\n\ndata: [DO"    -> ["data: {\"a\":1}", ""]
//! chunk 3: b"NE]\n"              -> ["data: [DONE]"]
//! ```
//!
//! [`data_payload`] then extracts the payload of `data:` lines; blank lines,
//! comments and `event:`/`id:`/`retry:` lines are protocol padding.

/// Incremental splitter from raw byte chunks to complete text lines.
#[derive(Debug, Default)]
pub struct LineReassembler {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending_bytes: Vec<u8>,
    /// Decoded text not yet terminated by a newline.
    pending_line: String,
    /// Prefix length of `pending_line` already searched for a newline.
    scanned: usize,
}

impl LineReassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line completed by them.
    ///
    /// Line terminators (`\n` or `\r\n`) are stripped. Text after the last
    /// terminator stays buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.decode(bytes);

        let mut lines = Vec::new();
        while let Some(offset) = self.pending_line[self.scanned..].find('\n') {
            let pos = self.scanned + offset;
            let mut line: String = self.pending_line.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
            self.scanned = 0;
        }
        self.scanned = self.pending_line.len();
        lines
    }

    /// Return the unterminated remainder at end of stream, if any.
    ///
    /// Undecodable trailing bytes are replaced with U+FFFD.
    pub fn flush(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            self.pending_line
                .push_str(&String::from_utf8_lossy(&self.pending_bytes));
            self.pending_bytes.clear();
        }

        self.scanned = 0;
        let mut rest = std::mem::take(&mut self.pending_line);
        if rest.ends_with('\r') {
            rest.pop();
        }
        if rest.is_empty() { None } else { Some(rest) }
    }

    /// Whether any partial input is buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending_bytes.is_empty() || !self.pending_line.is_empty()
    }

    fn decode(&mut self, bytes: &[u8]) {
        self.pending_bytes.extend_from_slice(bytes);
        let buf = std::mem::take(&mut self.pending_bytes);

        let mut start = 0;
        while start < buf.len() {
            match std::str::from_utf8(&buf[start..]) {
                Ok(text) => {
                    self.pending_line.push_str(text);
                    start = buf.len();
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    self.pending_line
                        .push_str(&String::from_utf8_lossy(&buf[start..valid_end]));
                    match err.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.pending_bytes.extend_from_slice(&buf[valid_end..]);
                            return;
                        }
                        Some(len) => {
                            self.pending_line.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                    }
                }
            }
        }
    }
}

/// Extract the payload of an SSE `data:` line.
///
/// Returns `None` for:
/// - Empty lines (event boundaries)
/// - Comment lines (starting with `:`)
/// - `event:`, `id:`, `retry:` and any other non-data line
/// - `data:` lines with an empty payload
pub fn data_payload(line: &str) -> Option<&str> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() { None } else { Some(payload) }
}
