use std::fmt;

use crate::runtime::machine::{Instruction, Memory, Op, REGISTER_COUNT};

/// Print the disassembly of the instruction at `addr`, returning its text and length.
///
/// Bytes past the end of `bytes` read as zero, like unwritten RAM.
pub fn disasm_instruction(bytes: &[u8], addr: usize) -> (String, usize) {
    let byte_at = |i: usize| bytes.get(addr + i).copied().unwrap_or(0);
    let opcode = byte_at(0);

    let Some(instr) = Instruction::decode(opcode) else {
        return (format!("%bytes 0x{:02X}", opcode), 1);
    };

    let len = instr.opcode().len() as usize;
    let text = match (instr, len) {
        (_, 1) => instr.mnemonic().to_string(),
        (_, 2) => format!("{} R{}", instr.mnemonic(), byte_at(1) & 0b111),
        (Instruction::General(Op::LDI), _) => {
            format!("LDI R{}, {}", byte_at(1) & 0b111, byte_at(2))
        }
        _ => format!(
            "{} R{}, R{}",
            instr.mnemonic(),
            byte_at(1) & 0b111,
            byte_at(2) & 0b111
        ),
    };

    (text, len)
}

/// One disassembled instruction of a program image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmLine {
    pub addr: usize,
    pub bytes: Vec<u8>,
    pub text: String,
}

impl fmt::Display for DisasmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self
            .bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");

        write!(f, "{:02X}: {:<8}  {}", self.addr, hex, self.text)
    }
}

/// Linear sweep over a program image. Data laid out after code is decoded as
/// whatever instruction it happens to look like.
pub fn disassemble(image: &[u8]) -> Vec<DisasmLine> {
    let mut lines = Vec::new();
    let mut addr = 0;

    while addr < image.len() {
        let (mut text, mut len) = disasm_instruction(image, addr);
        if addr + len > image.len() {
            // Truncated instruction at the tail of the image
            text = format!("%bytes 0x{:02X}", image[addr]);
            len = 1;
        }

        lines.push(DisasmLine {
            addr,
            bytes: image[addr..addr + len].to_vec(),
            text,
        });
        addr += len;
    }

    lines
}

pub fn trace_line(pc: u8, ram: &Memory, reg: &[u8; REGISTER_COUNT]) -> String {
    let mut line = format!(
        "TRACE: {:02X} | {:02X} {:02X} {:02X} |",
        pc,
        ram.read(pc),
        ram.read(pc.wrapping_add(1)),
        ram.read(pc.wrapping_add(2))
    );

    for r in reg {
        line.push_str(&format!(" {:02X}", r));
    }

    line
}
