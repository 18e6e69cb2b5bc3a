//! Two-pass assembler producing LS-8 program images

pub mod assembler;
pub mod error;
pub mod lexer;
pub mod parser;

use std::path::Path;

pub use assembler::{Assembler, Image};
pub use error::{AsmError, AsmResult};

/// Assemble source text; `%include` paths resolve against `root_path`.
pub fn assemble_source(src: &str, root_path: &Path) -> AsmResult<Image> {
    let ast = parser::parse_source(src)?;
    Assembler::new(root_path).assemble(&ast)
}
