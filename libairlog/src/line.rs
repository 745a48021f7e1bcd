use std::io::{ErrorKind, Read};

/// A raw line of instrument output tagged with the identity of its producer.
///
/// This is the unit of transfer through the shared queue: produced once by a
/// reader, consumed exactly once by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine {
    pub instrument: String,
    pub text: String,
}

impl TaggedLine {
    pub fn new(instrument: &str, text: &str) -> Self {
        TaggedLine {
            instrument: instrument.to_string(),
            text: text.to_string(),
        }
    }
}

/// Assembles complete newline-terminated lines from a byte stream that may
/// time out mid-line.
///
/// Bytes received before a timeout are retained and joined with the next read,
/// so a slow instrument never produces a truncated row. Only complete lines are
/// ever returned; trailing `\r\n` or `\n` is stripped.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        LineAssembler::default()
    }

    /// Read from `source` until a complete line is available.
    ///
    /// Returns `Ok(None)` when the source times out (or momentarily has no
    /// data) before a newline arrives; partial bytes stay buffered for the
    /// next call. Any other IO error is passed through.
    pub fn read_line<R: Read>(&mut self, source: &mut R) -> std::io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(line));
            }

            let mut buf = [0u8; 256];
            match source.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Discard any buffered partial line. Used after a port is reopened, since
    /// the tail of the old stream no longer lines up with the new one.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
