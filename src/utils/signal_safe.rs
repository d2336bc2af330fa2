//! Allocation-free diagnostics for async-signal and post-clone contexts.
//!
//! Only stack buffers and raw `write(2)` are used here, so these helpers may
//! run inside a signal handler or in the new process before exec.

const LINE_CAPACITY: usize = 160;

/// Fixed-capacity line buffer. Input past capacity is dropped.
pub struct StderrLine {
    buf: [u8; LINE_CAPACITY],
    len: usize,
}

impl StderrLine {
    pub const fn new() -> Self {
        Self {
            buf: [0; LINE_CAPACITY],
            len: 0,
        }
    }

    pub fn push_str(&mut self, s: &str) -> &mut Self {
        self.push_bytes(s.as_bytes())
    }

    /// Append `n` in decimal.
    pub fn push_int(&mut self, n: i64) -> &mut Self {
        let mut digits = [0u8; 20];
        let mut i = digits.len();
        let mut rest = n.unsigned_abs();

        loop {
            i -= 1;
            digits[i] = b'0' + (rest % 10) as u8;
            rest /= 10;
            if rest == 0 {
                break;
            }
        }

        if n < 0 {
            self.push_bytes(b"-");
        }
        self.push_bytes(&digits[i..])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Emit the line on fd 2 with a single `write(2)`; errors are ignored.
    pub fn write_to_stderr(&self) {
        let bytes = self.as_bytes();
        // SAFETY: pointer and length describe a live stack buffer.
        let _ = unsafe {
            libc::write(
                libc::STDERR_FILENO,
                bytes.as_ptr() as *const libc::c_void,
                bytes.len(),
            )
        };
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        let room = LINE_CAPACITY - self.len;
        let take = bytes.len().min(room);
        self.buf[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
        self
    }
}

impl Default for StderrLine {
    fn default() -> Self {
        Self::new()
    }
}
