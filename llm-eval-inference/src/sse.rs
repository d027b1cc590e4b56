//! Incremental decoder for `text/event-stream` bodies.

/// Accumulates body bytes and yields the `data` payload of each complete event.
///
/// Multi-line data fields are joined with `\n`. Comments and fields other than
/// `data` are dropped. Lines may end in `\n`, `\r\n` or a lone `\r`. Bytes are
/// buffered until an event boundary, so chunks may split UTF-8 sequences or
/// lines anywhere, including between the two bytes of a `\r\n`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Pending bytes with line endings normalized to `\n`.
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched for a boundary.
    scanned: usize,
    /// The last byte seen was `\r`, so a following `\n` completes it.
    pending_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        for &byte in chunk {
            match byte {
                b'\r' => {
                    self.buffer.push(b'\n');
                    self.pending_cr = true;
                }
                b'\n' if self.pending_cr => self.pending_cr = false,
                _ => {
                    self.buffer.push(byte);
                    self.pending_cr = false;
                }
            }
        }

        let mut payloads = Vec::new();
        loop {
            // A boundary may straddle the last scanned byte and the new ones.
            let start = self.scanned.saturating_sub(1);
            let Some(offset) = find_boundary(&self.buffer[start..]) else {
                self.scanned = self.buffer.len();
                break;
            };
            let pos = start + offset;
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            self.scanned = 0;
            if let Some(data) = parse_block(&block[..pos]) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flushes a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let block = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        self.pending_cr = false;
        parse_block(&block)
    }
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(block);
    let mut data: Option<String> = None;

    for line in text.lines() {
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    data
}
