use semihost::{HostTrap, Semihost};

use crate::config::Config;

/// Where a [`LineBuffer`] sends its bytes when it flushes.
///
/// Delivery is best effort: there is nothing to report a failure to.
pub trait Output {
    fn transmit(&mut self, bytes: &[u8]);
}

impl<T: HostTrap> Output for Semihost<T> {
    fn transmit(&mut self, bytes: &[u8]) {
        let _ = self.write(Config::STDOUT_HANDLE, bytes);
    }
}

/// Fixed-capacity output buffer that flushes on newline or when full.
///
/// Between calls `len() < N` always holds.
#[derive(Debug, Clone)]
pub struct LineBuffer<const N: usize> {
    buf: [u8; N],
    cursor: usize,
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineBuffer<N> {
    const NOT_EMPTY: () = assert!(N > 0, "line buffer capacity must be non-zero");

    pub const fn new() -> Self {
        let () = Self::NOT_EMPTY;
        Self {
            buf: [0; N],
            cursor: 0,
        }
    }

    pub fn emit<O: Output + ?Sized>(&mut self, byte: u8, out: &mut O) {
        self.buf[self.cursor] = byte;
        self.cursor += 1;
        if self.cursor == N || byte == b'\n' {
            self.flush(out);
        }
    }

    /// Sends the pending bytes, if any, and resets the cursor whatever the
    /// outcome.
    ///
    /// A NUL is stored after the last byte when there is a slot for it, for
    /// whoever inspects the buffer from the host. It is not transmitted.
    pub fn flush<O: Output + ?Sized>(&mut self, out: &mut O) {
        if self.cursor == 0 {
            return;
        }
        if self.cursor < N {
            self.buf[self.cursor] = 0;
        }
        out.transmit(&self.buf[..self.cursor]);
        self.cursor = 0;
    }

    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}
