/// Upper bound on bytes buffered without seeing a newline. A device that never
/// terminates its records gets its output split at this length instead of
/// growing the buffer without limit.
pub const MAX_LINE_BYTES: usize = 4096;

/// Reassembles newline-terminated records from arbitrarily chunked reads.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Pop the next complete line, without its `\n`.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let window = self.pending.len().min(MAX_LINE_BYTES + 1);
        if let Some(pos) = self.pending[..window].iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            return Some(line);
        }
        if self.pending.len() >= MAX_LINE_BYTES {
            tracing::warn!(bytes = self.pending.len(), "unterminated record, splitting");
            return Some(self.pending.drain(..MAX_LINE_BYTES).collect());
        }
        None
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}
