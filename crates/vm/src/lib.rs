//! Host side of the semihosting bridge.
//!
//! A [`SemihostAgent`] services requests against a [`TargetMemory`]: either a
//! simulated RV32 address space driven by a [`Hart`], or the memory of the
//! current process through [`NativeHost`], which lets target-side crates run
//! their tests on a development machine.

pub mod agent;
pub mod config;
pub mod decoder;
pub mod files;
pub mod hart;
pub mod memory;
pub mod native;
pub mod registers;

pub use agent::{AgentError, ExitStatus, Request, SemihostAgent};
pub use config::AgentConfig;
pub use hart::{Hart, TrapOutcome};
pub use memory::{Memory, MemoryError, NativeMemory, TargetMemory};
pub use native::{NativeHost, TargetExit};
pub use registers::Register;
