#![allow(clippy::upper_case_acronyms)]

//! Core of the LS-8 machine
//!
//! A 256 byte address space, eight byte-wide registers and a flag register.
//! Every opcode carries its own metadata in the top nibble:
//!
//! ```text
//! AABCDDDD
//! ||||
//! |||+---- identifier
//! ||+----- handler sets PC itself
//! |+------ routed to the ALU
//! +------- operand count (0-2)
//! ```

use std::cmp::Ordering;
use std::io::{self, Write};

use log::debug;

use crate::error::{LoadError, VmError};
use crate::runtime::disasm;

pub const RAM_SIZE: usize = 256;
pub const REGISTER_COUNT: usize = 8;

/// R7 is the stack pointer by convention.
pub const SP: usize = 7;
pub const SP_INIT: u8 = 0xF4;

const OPERAND_COUNT_SHIFT: u8 = 6;
const ALU_BIT: u8 = 0b0010_0000;
const SETS_PC_BIT: u8 = 0b0001_0000;

/// Builds an opcode enumeration with byte conversions and mnemonic lookup.
macro_rules! opcodes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $byte:literal,)+ }) => {
        $(#[$meta])*
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $byte,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)+
                }
            }

            pub fn from_mnemonic(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
            }

            pub fn opcode(self) -> Opcode {
                Opcode(self as u8)
            }
        }

        impl TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(byte: u8) -> Result<Self, Self::Error> {
                match byte {
                    $($byte => Ok($name::$variant),)+
                    _ => Err(byte),
                }
            }
        }
    };
}

opcodes! {
    /// Opcodes served by the general dispatch table
    Op {
        NOP = 0b0000_0000,
        HLT = 0b0000_0001,
        RET = 0b0001_0001,

        // Stack and console
        PUSH = 0b0100_0101,
        POP = 0b0100_0110,
        PRN = 0b0100_0111,
        PRA = 0b0100_1000,

        // Control transfer
        CALL = 0b0101_0000,
        JMP = 0b0101_0100,
        JEQ = 0b0101_0101,
        JNE = 0b0101_0110,
        JGT = 0b0101_0111,
        JLT = 0b0101_1000,
        JLE = 0b0101_1001,
        JGE = 0b0101_1010,

        // Data movement
        LDI = 0b1000_0010,
        LD = 0b1000_0011,
        ST = 0b1000_0100,
    }
}

opcodes! {
    /// Opcodes served by the ALU
    AluOp {
        INC = 0b0110_0101,
        DEC = 0b0110_0110,
        NOT = 0b0110_1001,

        ADD = 0b1010_0000,
        SUB = 0b1010_0001,
        MUL = 0b1010_0010,
        CMP = 0b1010_0111,
        AND = 0b1010_1000,
        OR = 0b1010_1010,
        XOR = 0b1010_1011,
        SHL = 0b1010_1100,
        SHR = 0b1010_1101,
    }
}

/// Raw opcode byte and the fields packed into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u8);

impl Opcode {
    pub fn operand_count(self) -> u8 {
        self.0 >> OPERAND_COUNT_SHIFT
    }

    pub fn is_alu(self) -> bool {
        self.0 & ALU_BIT != 0
    }

    pub fn sets_pc(self) -> bool {
        self.0 & SETS_PC_BIT != 0
    }

    /// Total instruction length in bytes, opcode included.
    pub fn len(self) -> u8 {
        1 + self.operand_count()
    }
}

/// A decoded opcode, routed by its ALU bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    General(Op),
    Alu(AluOp),
}

impl Instruction {
    pub fn decode(byte: u8) -> Option<Self> {
        if Opcode(byte).is_alu() {
            AluOp::try_from(byte).ok().map(Instruction::Alu)
        } else {
            Op::try_from(byte).ok().map(Instruction::General)
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Op::from_mnemonic(name)
            .map(Instruction::General)
            .or_else(|| AluOp::from_mnemonic(name).map(Instruction::Alu))
    }

    pub fn opcode(self) -> Opcode {
        match self {
            Instruction::General(op) => op.opcode(),
            Instruction::Alu(op) => op.opcode(),
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Instruction::General(op) => op.mnemonic(),
            Instruction::Alu(op) => op.mnemonic(),
        }
    }
}

/// Result of CMP. Exactly one bit is set after every compare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    pub const EQUAL: u8 = 0b001;
    pub const GREATER: u8 = 0b010;
    pub const LESS: u8 = 0b100;

    pub fn compare(a: u8, b: u8) -> Self {
        match a.cmp(&b) {
            Ordering::Equal => Flags(Self::EQUAL),
            Ordering::Greater => Flags(Self::GREATER),
            Ordering::Less => Flags(Self::LESS),
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn equal(self) -> bool {
        self.0 & Self::EQUAL != 0
    }

    pub fn greater(self) -> bool {
        self.0 & Self::GREATER != 0
    }

    pub fn less(self) -> bool {
        self.0 & Self::LESS != 0
    }
}

/// Flat byte-addressed RAM. Addresses are `u8`, so every access wraps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: [u8; RAM_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            cells: [0; RAM_SIZE],
        }
    }
}

impl Memory {
    pub fn read(&self, address: u8) -> u8 {
        self.cells[address as usize]
    }

    pub fn write(&mut self, address: u8, value: u8) {
        self.cells[address as usize] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

/// Outcome of a single fetch/decode/execute cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halted,
}

#[derive(Debug)]
pub struct Machine<W: Write = io::Stdout> {
    pub ram: Memory,
    pub reg: [u8; REGISTER_COUNT],
    pub pc: u8,
    pub fl: Flags,

    halted: bool,
    cycles: u64,
    out: W,
}

impl Machine<io::Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Machine<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

// Operand bytes double as register indices; only the low three bits select one.
fn reg_index(operand: u8) -> usize {
    (operand & 0b111) as usize
}

impl<W: Write> Machine<W> {
    pub fn with_output(out: W) -> Self {
        let mut reg = [0; REGISTER_COUNT];
        reg[SP] = SP_INIT;

        Self {
            ram: Memory::default(),
            reg,
            pc: 0,
            fl: Flags::default(),
            halted: false,
            cycles: 0,
            out,
        }
    }

    /// Copy a program image into memory starting at address 0.
    pub fn load(&mut self, image: &[u8]) -> Result<(), LoadError> {
        if image.len() > RAM_SIZE {
            return Err(LoadError::TooLarge { len: image.len() });
        }

        for (address, &byte) in image.iter().enumerate() {
            self.ram.write(address as u8, byte);
        }

        Ok(())
    }

    pub fn ram_read(&self, address: u8) -> u8 {
        self.ram.read(address)
    }

    pub fn ram_write(&mut self, address: u8, value: u8) {
        self.ram.write(address, value);
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Instructions executed so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Fixed-width dump of PC, the next three bytes and the register file.
    pub fn trace(&self) -> String {
        disasm::trace_line(self.pc, &self.ram, &self.reg)
    }

    pub fn step(&mut self) -> Result<Step, VmError> {
        if self.halted {
            return Ok(Step::Halted);
        }

        let pc = self.pc;
        let ir = Opcode(self.ram.read(pc));
        // Always safe to read: memory is total over u8 addresses
        let operand_a = self.ram.read(pc.wrapping_add(1));
        let operand_b = self.ram.read(pc.wrapping_add(2));

        if ir.is_alu() {
            let op = AluOp::try_from(ir.0)
                .map_err(|opcode| VmError::UnknownAluOp { opcode, pc })?;
            debug!("{:02X}: {} {:02X} {:02X}", pc, op.mnemonic(), operand_a, operand_b);
            self.alu(op, operand_a, operand_b);
        } else {
            let op =
                Op::try_from(ir.0).map_err(|opcode| VmError::UnknownOpcode { opcode, pc })?;
            debug!("{:02X}: {} {:02X} {:02X}", pc, op.mnemonic(), operand_a, operand_b);
            self.execute(op, operand_a, operand_b)?;
        }

        self.cycles += 1;

        if !ir.sets_pc() {
            self.pc = self.pc.wrapping_add(ir.len());
        }

        if self.halted {
            Ok(Step::Halted)
        } else {
            Ok(Step::Continue)
        }
    }

    pub fn run(&mut self) -> Result<(), VmError> {
        while self.step()? == Step::Continue {}
        Ok(())
    }

    pub fn run_with(&mut self, code: &[u8]) -> Result<(), VmError> {
        self.load(code)?;
        self.run()
    }

    fn push(&mut self, value: u8) {
        self.reg[SP] = self.reg[SP].wrapping_sub(1);
        self.ram.write(self.reg[SP], value);
    }

    fn pop(&mut self) -> u8 {
        let value = self.ram.read(self.reg[SP]);
        self.reg[SP] = self.reg[SP].wrapping_add(1);
        value
    }

    /// Jump to the address in `target` when `taken`, otherwise step over the jump.
    fn jump_if(&mut self, taken: bool, target: u8, op: Op) {
        if taken {
            self.pc = self.reg[reg_index(target)];
        } else {
            self.pc = self.pc.wrapping_add(op.opcode().len());
        }
    }

    fn alu(&mut self, op: AluOp, a: u8, b: u8) {
        let (ra, rb) = (reg_index(a), reg_index(b));
        let (x, y) = (self.reg[ra], self.reg[rb]);

        self.reg[ra] = match op {
            AluOp::INC => x.wrapping_add(1),
            AluOp::DEC => x.wrapping_sub(1),
            AluOp::NOT => !x,
            AluOp::ADD => x.wrapping_add(y),
            AluOp::SUB => x.wrapping_sub(y),
            AluOp::MUL => x.wrapping_mul(y),
            AluOp::AND => x & y,
            AluOp::OR => x | y,
            AluOp::XOR => x ^ y,
            AluOp::SHL => x << (y & 0b111),
            AluOp::SHR => x >> (y & 0b111),
            AluOp::CMP => {
                self.fl = Flags::compare(x, y);
                return;
            }
        };
    }

    fn execute(&mut self, op: Op, a: u8, b: u8) -> Result<(), VmError> {
        match op {
            Op::NOP => {}

            Op::HLT => {
                self.halted = true;
                self.out.flush()?;
            }

            // Data movement
            Op::LDI => self.reg[reg_index(a)] = b,
            Op::LD => self.reg[reg_index(a)] = self.ram.read(self.reg[reg_index(b)]),
            Op::ST => self.ram.write(self.reg[reg_index(a)], self.reg[reg_index(b)]),

            // Stack
            Op::PUSH => self.push(self.reg[reg_index(a)]),
            Op::POP => self.reg[reg_index(a)] = self.pop(),

            // Console
            Op::PRN => writeln!(self.out, "{}", self.reg[reg_index(a)])?,
            Op::PRA => self.out.write_all(&[self.reg[reg_index(a)]])?,

            // Control transfer
            Op::CALL => {
                let return_address = self.pc.wrapping_add(op.opcode().len());
                self.push(return_address);
                self.pc = self.reg[reg_index(a)];
            }
            Op::RET => self.pc = self.pop(),
            Op::JMP => self.jump_if(true, a, op),
            Op::JEQ => self.jump_if(self.fl.equal(), a, op),
            Op::JNE => self.jump_if(!self.fl.equal(), a, op),
            Op::JGT => self.jump_if(self.fl.greater(), a, op),
            Op::JLT => self.jump_if(self.fl.less(), a, op),
            Op::JLE => self.jump_if(self.fl.less() || self.fl.equal(), a, op),
            Op::JGE => self.jump_if(self.fl.greater() || self.fl.equal(), a, op),
        }

        Ok(())
    }
}
