//! Hardware trap for RISC-V targets.

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
use types::{HostTrap, SemihostOp};

/// The real trap: `a0`/`a1` in, `ebreak` between two `x0` shifts, `a0` out.
///
/// Only exists on RISC-V. Everywhere else the layers above are generic over
/// [`HostTrap`](types::HostTrap) and run against a simulated host.
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
#[derive(Copy, Clone, Debug, Default)]
pub struct Ebreak;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
impl HostTrap for Ebreak {
    #[inline(always)]
    unsafe fn trap(&mut self, op: SemihostOp, arg: usize) -> isize {
        let mut a0 = op.number() as usize;
        // The host matches these exact 32-bit words, so compression must be
        // off. The alignment keeps all three words on one page.
        unsafe {
            core::arch::asm!(
                ".balign 16",
                ".option push",
                ".option norvc",
                "slli zero, zero, 0x1f",
                "ebreak",
                "srai zero, zero, 0x7",
                ".option pop",
                inout("a0") a0,
                in("a1") arg,
                options(nostack, preserves_flags),
            );
        }
        a0 as isize
    }
}
