use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a program file into a memory image.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no such file or directory: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: `{text}` is not a binary byte")]
    InvalidLine { line: usize, text: String },
    #[error("program is {len} bytes, memory holds 256")]
    TooLarge { len: usize },
}

/// Fatal conditions raised by the execution engine.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("unrecognized instruction {opcode:#010b} at {pc:#04x}")]
    UnknownOpcode { opcode: u8, pc: u8 },
    #[error("unsupported ALU operation {opcode:#010b} at {pc:#04x}")]
    UnknownAluOp { opcode: u8, pc: u8 },
    #[error("console write failed: {0}")]
    Output(#[from] io::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl VmError {
    /// True for the decode failures, as opposed to host-side I/O trouble.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            VmError::UnknownOpcode { .. } | VmError::UnknownAluOp { .. }
        )
    }
}
