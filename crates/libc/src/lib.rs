#![no_std]

//! Just enough of a C library for bare-metal firmware to print through a
//! debugger: a line-buffered console on top of semihosting, plus `exit` and
//! `abort`.

pub mod config;
pub mod line_buffer;
pub mod process;
pub mod stdio;

#[cfg(all(
    any(target_arch = "riscv32", target_arch = "riscv64"),
    target_os = "none"
))]
pub mod runtime;

pub use config::Config;
pub use line_buffer::{LineBuffer, Output};
pub use process::platform_exit;
pub use stdio::{Console, StdConsole};
