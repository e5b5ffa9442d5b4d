use crate::agent::{ExitStatus, SemihostAgent};
use crate::decoder;
use crate::memory::TargetMemory;
use crate::registers::Register;

/// What an `ebreak` turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// A semihosting request; `a0` holds the result and `pc` points past
    /// the trap sequence.
    Serviced { op: usize, result: isize },
    /// A plain breakpoint, left for a debugger. `pc` is unchanged.
    Breakpoint,
    /// The target asked to terminate.
    Exited(ExitStatus),
}

/// Architectural state of one RV32 hart, as far as trap handling needs it.
#[derive(Debug, Clone)]
pub struct Hart {
    pub pc: u32,
    pub regs: [u32; 32],
}

impl Hart {
    pub fn new(pc: u32) -> Self {
        Self { pc, regs: [0; 32] }
    }

    pub fn reg(&self, reg: Register) -> u32 {
        self.regs[reg.index()]
    }

    pub fn set_reg(&mut self, reg: Register, value: u32) {
        if reg != Register::Zero {
            self.regs[reg.index()] = value;
        }
    }

    /// Called when the hart stops on an `ebreak` at `pc`.
    pub fn handle_ebreak<M: TargetMemory>(&mut self, agent: &mut SemihostAgent<M>) -> TrapOutcome {
        if !decoder::is_semihost_call(agent.memory(), self.pc as usize) {
            return TrapOutcome::Breakpoint;
        }

        let op = self.reg(Register::A0) as usize;
        let arg = self.reg(Register::A1) as usize;
        let result = agent.handle(op, arg);
        self.set_reg(Register::A0, result as u32);

        if let Some(status) = agent.exit_status() {
            return TrapOutcome::Exited(status);
        }
        // resume after `srai x0, x0, 7`
        self.pc = self.pc.wrapping_add(8);
        TrapOutcome::Serviced { op, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use types::trap::{EBREAK, TRAP_SEQUENCE};
    use types::{ExitReason, SemihostOp};

    const CODE: u32 = 0x100;

    fn target() -> SemihostAgent<Memory> {
        let mut mem = Memory::new(0x4000);
        mem.write_code(CODE as usize, &TRAP_SEQUENCE).unwrap();
        SemihostAgent::new(mem)
    }

    #[test]
    fn services_write_and_skips_sequence() {
        let mut agent = target();
        let text = agent.memory_mut().alloc(b"hi\n").unwrap();
        let block = agent.memory_mut().alloc_words(&[1, text, 3]).unwrap();

        let mut hart = Hart::new(CODE + 4);
        hart.set_reg(Register::A0, SemihostOp::Write.number());
        hart.set_reg(Register::A1, block as u32);

        let outcome = hart.handle_ebreak(&mut agent);
        assert_eq!(
            outcome,
            TrapOutcome::Serviced { op: SemihostOp::Write.number() as usize, result: 0 }
        );
        assert_eq!(hart.pc, CODE + 12);
        assert_eq!(hart.reg(Register::A0), 0);
        assert_eq!(agent.stdout(), b"hi\n");
    }

    #[test]
    fn failure_lands_in_a0_as_minus_one() {
        let mut agent = target();
        let mut hart = Hart::new(CODE + 4);
        hart.set_reg(Register::A0, SemihostOp::Close.number());
        hart.set_reg(Register::A1, 42);

        hart.handle_ebreak(&mut agent);
        assert_eq!(hart.reg(Register::A0), u32::MAX);
    }

    #[test]
    fn lone_ebreak_is_a_breakpoint() {
        let mut agent = target();
        agent.memory_mut().store_u32(0x200, EBREAK).unwrap();
        let mut hart = Hart::new(0x200);
        hart.set_reg(Register::A0, SemihostOp::Exit.number());

        assert_eq!(hart.handle_ebreak(&mut agent), TrapOutcome::Breakpoint);
        assert_eq!(hart.pc, 0x200);
        assert_eq!(agent.exit_status(), None);
    }

    #[test]
    fn exit_stops_the_hart() {
        let mut agent = target();
        let mut hart = Hart::new(CODE + 4);
        hart.set_reg(Register::A0, SemihostOp::Exit.number());
        hart.set_reg(Register::A1, ExitReason::SUCCESS_CODE as u32);

        match hart.handle_ebreak(&mut agent) {
            TrapOutcome::Exited(status) => assert_eq!(status.reason, ExitReason::Success),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(hart.pc, CODE + 4);
    }

    #[test]
    fn x0_stays_zero() {
        let mut hart = Hart::new(0);
        hart.set_reg(Register::Zero, 5);
        assert_eq!(hart.reg(Register::Zero), 0);
    }
}
