use semihost::Handle;

pub struct Config;

impl Config {
    /// Capacity of the console line buffer.
    pub const PUTC_BUFFER_SIZE: usize = 128;
    /// Host handle that flushed console output is written to.
    pub const STDOUT_HANDLE: Handle = semihost::STDOUT;
}
