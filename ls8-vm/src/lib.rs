//! LS-8: an eight bit teaching processor
//!
//! [`Machine`] holds the whole machine state and steps through a program one
//! instruction at a time. [`loader`] turns the textual image format into bytes.

pub mod error;
pub mod loader;
pub mod runtime;

pub use error::{LoadError, VmError};
pub use runtime::machine::{
    AluOp, Flags, Instruction, Machine, Memory, Op, Opcode, RAM_SIZE, REGISTER_COUNT, SP,
    SP_INIT, Step,
};
