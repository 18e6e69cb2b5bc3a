pub mod disasm;
pub mod machine;
