//! Incremental line splitting for child-process output.
//!
//! Commands drive progress bars with bare `\r`, so a line ends at `\n`,
//! `\r\n`, or a lone `\r`. Chunks arrive at arbitrary boundaries; a `\r\n`
//! pair may straddle two reads.

/// Accumulates raw output chunks and yields complete lines.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: Vec<u8>,
    pending_cr: bool,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if self.pending_cr {
                self.pending_cr = false;
                // \r\n: the \r already terminated the line
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => lines.push(self.take_line()),
                b'\r' => {
                    lines.push(self.take_line());
                    self.pending_cr = true;
                }
                other => self.buf.push(other),
            }
        }
        lines
    }

    /// Flush the unterminated remainder at stream end, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.pending_cr = false;
        if self.buf.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}
