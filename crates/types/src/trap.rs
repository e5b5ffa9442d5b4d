//! The trap capability and the instruction words that make up a request.
//!
//! A semihosting request on RISC-V is an `ebreak` sandwiched between two
//! shifts of `x0`. Cores without a semihosting-aware debugger execute the
//! shifts as no-ops; the host recognizes the exact sequence around the
//! `ebreak` and services the request instead of treating it as a breakpoint.

use crate::SemihostOp;

/// `slli x0, x0, 0x1f`
pub const SLLI_ZERO_0X1F: u32 = 0x01f0_1013;
/// `ebreak`
pub const EBREAK: u32 = 0x0010_0073;
/// `srai x0, x0, 7`
pub const SRAI_ZERO_7: u32 = 0x4070_5013;

/// The three words, in memory order. Assembled without compression.
pub const TRAP_SEQUENCE: [u32; 3] = [SLLI_ZERO_0X1F, EBREAK, SRAI_ZERO_7];

/// Register carrying the operation number in, and the result out.
pub const OP_REGISTER: usize = 10; // a0
/// Register carrying the scalar argument or argument block address.
pub const ARG_REGISTER: usize = 11; // a1

/// A synchronous round trip to the debug host.
///
/// Real hardware implements this with the trap sequence; host-side tests
/// implement it with a simulated agent.
pub trait HostTrap {
    /// Issues `op` with `arg` in `a1` and returns the host's `a0`.
    ///
    /// # Safety
    /// `arg` must follow `op`'s convention: when it is an address, every
    /// word and buffer it describes must be valid and fully written to
    /// memory for the duration of the call, since the host reads (and for
    /// `SYS_READ` writes) through it.
    unsafe fn trap(&mut self, op: SemihostOp, arg: usize) -> isize;
}

impl<T: HostTrap + ?Sized> HostTrap for &mut T {
    unsafe fn trap(&mut self, op: SemihostOp, arg: usize) -> isize {
        unsafe { (**self).trap(op, arg) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i_type(imm: u32, funct3: u32) -> u32 {
        // rd = rs1 = x0, opcode OP-IMM
        (imm << 20) | (funct3 << 12) | 0x13
    }

    #[test]
    fn sequence_words_match_their_encoding() {
        assert_eq!(SLLI_ZERO_0X1F, i_type(0x1f, 0b001));
        assert_eq!(SRAI_ZERO_7, i_type(0x400 | 7, 0b101));
        assert_eq!(EBREAK, (1 << 20) | 0x73);
    }
}
