use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsmError {
    // Lexing
    #[error("line {line}: unexpected character `{ch}`")]
    UnexpectedChar { line: usize, ch: char },
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
    #[error("line {line}: invalid number `{literal}`")]
    InvalidNumber { line: usize, literal: String },

    // Parsing
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },
    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("line {line}: unknown instruction `{name}`")]
    UnknownInstruction { line: usize, name: String },
    #[error("line {line}: unknown directive `%{name}`")]
    UnknownDirective { line: usize, name: String },

    // Assembling
    #[error("line {line}: {mnemonic} takes {expected} operand(s), got {found}")]
    Arity {
        line: usize,
        mnemonic: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: operand {index} of {mnemonic} must be {expected}")]
    OperandKind {
        line: usize,
        mnemonic: &'static str,
        index: usize,
        expected: &'static str,
    },
    #[error("line {line}: undefined label or constant `{name}`")]
    Undefined { line: usize, name: String },
    #[error("line {line}: `{name}` is already defined")]
    Redefinition { line: usize, name: String },
    #[error("line {line}: {value} does not fit in a byte")]
    OutOfRange { line: usize, value: u32 },
    #[error("program is {len} bytes, memory holds 256")]
    TooLarge { len: usize },
    #[error("cannot include {}: {source}", path.display())]
    Include {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("includes nested too deeply at {}", path.display())]
    IncludeDepth { path: PathBuf },
}

pub type AsmResult<T> = Result<T, AsmError>;
