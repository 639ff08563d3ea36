// src/io/serial/framer.rs
//
// Newline framer for the sensor's text stream.
// Accumulates raw serial bytes and yields complete lines as owned strings.
// Sensor UARTs spray garbage bytes at power-up and across reconnects, so
// decoding tolerates malformed sequences: invalid bytes are dropped, never
// surfaced as an error.

/// Forced split point for a runaway line (wedged device holding TX high,
/// wrong baud rate producing no newlines).
const MAX_LINE_LENGTH: usize = 1024;

/// Stateful line framer for streaming serial data.
///
/// Feed raw bytes as they arrive; complete lines come out trimmed of
/// surrounding whitespace (including the `\r` of CRLF). Lines that are empty
/// after trimming are swallowed.
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        LineFramer { buffer: Vec::new() }
    }

    /// Feed raw bytes into the framer.
    /// Returns any complete lines that were terminated in this chunk.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in data {
            if byte == b'\n' {
                if let Some(line) = Self::take_line(&mut self.buffer) {
                    lines.push(line);
                }
            } else {
                self.buffer.push(byte);

                if self.buffer.len() >= MAX_LINE_LENGTH {
                    if let Some(line) = Self::take_line(&mut self.buffer) {
                        lines.push(line);
                    }
                }
            }
        }

        lines
    }

    /// Flush any buffered partial line. Call when the stream ends.
    pub fn flush(&mut self) -> Option<String> {
        Self::take_line(&mut self.buffer)
    }

    /// Decode and trim the buffered bytes, clearing the buffer.
    /// Invalid UTF-8 sequences are dropped. Returns `None` when nothing
    /// printable remains.
    fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
        if buffer.is_empty() {
            return None;
        }

        let raw: Vec<u8> = buffer.drain(..).collect();
        let text: String = String::from_utf8_lossy(&raw)
            .chars()
            .filter(|c| *c != char::REPLACEMENT_CHARACTER)
            .collect();

        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
