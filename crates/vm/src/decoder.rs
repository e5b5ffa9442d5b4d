use types::trap::EBREAK;

use crate::memory::TargetMemory;

const OPCODE_OP_IMM: u32 = 0b001_0011;
const OPCODE_SYSTEM: u32 = 0b111_0011;

/// The handful of instructions the trap recognizer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Slli { rd: usize, rs1: usize, shamt: u8 },
    Srai { rd: usize, rs1: usize, shamt: u8 },
    Ebreak,
    /// Anything else, including compressed encodings.
    Other(u32),
}

/// Decodes one 32-bit instruction word.
///
/// ```text
/// 31:25 funct7 | 24:20 shamt/rs2 | 19:15 rs1 | 14:12 funct3 | 11:7 rd | 6:0 opcode
/// ```
pub fn decode(word: u32) -> Instruction {
    let opcode = word & 0x7f;
    let rd = ((word >> 7) & 0x1f) as usize;
    let funct3 = (word >> 12) & 0x7;
    let rs1 = ((word >> 15) & 0x1f) as usize;
    let shamt = ((word >> 20) & 0x1f) as u8;
    let funct7 = word >> 25;

    match (opcode, funct3, funct7) {
        (OPCODE_OP_IMM, 0x1, 0x00) => Instruction::Slli { rd, rs1, shamt },
        (OPCODE_OP_IMM, 0x5, 0x20) => Instruction::Srai { rd, rs1, shamt },
        (OPCODE_SYSTEM, 0x0, _) if word == EBREAK => Instruction::Ebreak,
        _ => Instruction::Other(word),
    }
}

fn fetch<M: TargetMemory>(mem: &M, addr: usize) -> Option<u32> {
    let mut raw = [0u8; 4];
    mem.read_bytes(addr, &mut raw).ok()?;
    Some(u32::from_le_bytes(raw))
}

/// True when the `ebreak` at `pc` is the middle of a semihosting request:
/// `slli x0, x0, 0x1f` right before it and `srai x0, x0, 7` right after.
///
/// Any other `ebreak` is an ordinary breakpoint.
pub fn is_semihost_call<M: TargetMemory>(mem: &M, pc: usize) -> bool {
    let Some(prev_pc) = pc.checked_sub(4) else {
        return false;
    };
    let words = (fetch(mem, prev_pc), fetch(mem, pc), fetch(mem, pc + 4));
    let (Some(prev), Some(cur), Some(next)) = words else {
        return false;
    };

    matches!(
        (decode(prev), decode(cur), decode(next)),
        (
            Instruction::Slli { rd: 0, rs1: 0, shamt: 0x1f },
            Instruction::Ebreak,
            Instruction::Srai { rd: 0, rs1: 0, shamt: 7 },
        )
    )
}
