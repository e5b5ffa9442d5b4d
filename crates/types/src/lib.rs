#![no_std]

//! Protocol vocabulary shared by the target-side trap layer and the host-side
//! semihosting agent. Both sides depend on this crate so that operation
//! numbers, exit reasons and the trap instruction encoding stay in lockstep.

pub mod result;
pub use result::{Result, SemihostError};

pub mod semihost;
pub use semihost::{ExitReason, OpenMode, SemihostOp};

pub mod trap;
pub use trap::HostTrap;
