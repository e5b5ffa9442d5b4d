use core::ffi::CStr;
use core::fmt;

use semihost::{Handle, HostTrap, Semihost};

use crate::config::Config;
use crate::line_buffer::LineBuffer;
use crate::process::platform_exit;

/// The console: a semihosting connection and the line buffer in front of
/// it.
///
/// There is a single output stream. Stream arguments are accepted for C
/// compatibility and ignored.
#[derive(Debug)]
pub struct Console<T: HostTrap, const N: usize> {
    host: Semihost<T>,
    buffer: LineBuffer<N>,
}

/// The console with the default buffer size.
pub type StdConsole<T> = Console<T, { Config::PUTC_BUFFER_SIZE }>;

impl<T: HostTrap, const N: usize> Console<T, N> {
    pub const fn new(trap: T) -> Self {
        Self {
            host: Semihost::new(trap),
            buffer: LineBuffer::new(),
        }
    }

    pub fn host_mut(&mut self) -> &mut Semihost<T> {
        &mut self.host
    }

    pub fn buffer(&self) -> &LineBuffer<N> {
        &self.buffer
    }

    pub fn emit(&mut self, byte: u8) {
        self.buffer.emit(byte, &mut self.host);
    }

    pub fn fputc(&mut self, c: i32, _stream: Handle) -> i32 {
        self.emit(c as u8);
        0
    }

    pub fn putchar(&mut self, c: i32) -> i32 {
        self.fputc(c, Config::STDOUT_HANDLE);
        i32::from(c as u8)
    }

    /// Writes `s` followed by exactly one newline.
    pub fn puts(&mut self, s: &CStr) -> i32 {
        for &byte in s.to_bytes() {
            self.fputc(i32::from(byte), Config::STDOUT_HANDLE);
        }
        self.fputc(i32::from(b'\n'), Config::STDOUT_HANDLE);
        0
    }

    /// Pushes out a partial line without waiting for a newline.
    pub fn flush(&mut self) {
        self.buffer.flush(&mut self.host);
    }

    /// Pending output that has not reached a newline is not flushed.
    pub fn exit(&mut self, status: i32) -> ! {
        platform_exit(&mut self.host, status)
    }

    pub fn abort(&mut self) -> ! {
        self.exit(-1)
    }
}

impl<T: HostTrap, const N: usize> fmt::Write for Console<T, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.emit(byte);
        }
        Ok(())
    }
}
