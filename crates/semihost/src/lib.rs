#![no_std]

//! Target-side semihosting: the trap sequence and typed wrappers for the
//! host operations the console and file layers need.

pub mod ops;
pub mod trap;

pub use ops::{Handle, Semihost, STDERR, STDIN, STDOUT};
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub use trap::Ebreak;
pub use types::{ExitReason, HostTrap, OpenMode, Result, SemihostError, SemihostOp};
