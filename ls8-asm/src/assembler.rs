//! Assembler for LS-8 programs
//!
//! Takes the AST from the parser, splices in includes, resolves labels and
//! constants, and lays out the bytes of a program image.
//!
//! Operand kinds follow from the opcode itself: its top two bits give the operand
//! count, and every operand is a register index except the immediate of `LDI`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use ls8::{Instruction, Op, RAM_SIZE};

use crate::error::{AsmError, AsmResult};
use crate::parser::{Ast, Directive, Node, Operand, parse_source};

const MAX_INCLUDE_DEPTH: usize = 16;

/// Assembled program: bytes plus the source text of each instruction, keyed by address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub notes: BTreeMap<usize, String>,
}

impl Image {
    /// Render in the loader's format: one binary byte per line, `#` comments.
    pub fn listing(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (addr, byte) in self.bytes.iter().enumerate() {
            match self.notes.get(&addr) {
                Some(note) => writeln!(f, "{:08b} # {}", byte, note)?,
                None => writeln!(f, "{:08b}", byte)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Assembler {
    pub ptr: usize, // current position, translates to pc
    root_path: PathBuf,

    // Labels to resolve to addresses
    pub labels: HashMap<String, usize>,
    pub consts: HashMap<String, u32>,

    buffer: Vec<u8>,
    notes: BTreeMap<usize, String>,
}

enum Expect {
    Register,
    Immediate,
}

impl Expect {
    fn describe(&self) -> &'static str {
        match self {
            Expect::Register => "a register",
            Expect::Immediate => "an immediate value",
        }
    }
}

fn operand_kinds(instr: Instruction) -> Vec<Expect> {
    let count = instr.opcode().operand_count() as usize;
    (0..count)
        .map(|i| match (instr, i) {
            (Instruction::General(Op::LDI), 1) => Expect::Immediate,
            _ => Expect::Register,
        })
        .collect()
}

fn node_size(node: &Node) -> usize {
    match node {
        Node::Instruction { instr, .. } => instr.opcode().len() as usize,
        Node::Directive { directive, .. } => match directive {
            Directive::Bytes(values) => values.len(),
            Directive::String(s) => s.len(),
            Directive::Define(..) | Directive::Include(_) => 0,
        },
        Node::Label { .. } => 0,
    }
}

impl Assembler {
    pub fn new(root_path: &Path) -> Self {
        Self {
            ptr: 0,
            root_path: root_path.into(),
            labels: HashMap::new(),
            consts: HashMap::new(),
            buffer: Vec::new(),
            notes: BTreeMap::new(),
        }
    }

    // C style #include, spliced in place before any address is assigned. Paths are
    // relative to the directory of the file that names them.
    fn expand_includes(&self, ast: &Ast, dir: &Path, depth: usize) -> AsmResult<Ast> {
        let mut out = Vec::with_capacity(ast.len());

        for node in ast {
            let Node::Directive {
                directive: Directive::Include(path),
                ..
            } = node
            else {
                out.push(node.clone());
                continue;
            };

            let full_path = dir.join(path);
            if depth >= MAX_INCLUDE_DEPTH {
                return Err(AsmError::IncludeDepth { path: full_path });
            }

            debug!("assembler: including {}", full_path.display());
            let contents = fs::read_to_string(&full_path).map_err(|source| AsmError::Include {
                path: full_path.clone(),
                source,
            })?;

            let included = parse_source(&contents)?;
            let included_dir = full_path.parent().unwrap_or(dir);
            out.extend(self.expand_includes(&included, included_dir, depth + 1)?);
        }

        Ok(out)
    }

    fn resolve_const_pass(&mut self, ast: &Ast) -> AsmResult<()> {
        for node in ast {
            if let Node::Directive {
                directive: Directive::Define(name, value),
                line,
            } = node
            {
                if self.consts.insert(name.clone(), *value).is_some() {
                    return Err(AsmError::Redefinition {
                        line: *line,
                        name: name.clone(),
                    });
                }
                trace!("assembler: defined constant {} as {}", name, value);
            }
        }
        Ok(())
    }

    // Pass to resolve labels to addresses
    fn resolve_label_pass(&mut self, ast: &Ast) -> AsmResult<()> {
        self.ptr = 0;

        for node in ast {
            if let Node::Label { name, line } = node {
                if self.consts.contains_key(name)
                    || self.labels.insert(name.clone(), self.ptr).is_some()
                {
                    return Err(AsmError::Redefinition {
                        line: *line,
                        name: name.clone(),
                    });
                }
                trace!("assembler: label {} at {:02X}", name, self.ptr);
            }

            self.ptr += node_size(node);
        }

        if self.ptr > RAM_SIZE {
            return Err(AsmError::TooLarge { len: self.ptr });
        }

        Ok(())
    }

    fn lookup(&self, name: &str, line: usize) -> AsmResult<u32> {
        self.consts
            .get(name)
            .copied()
            .or_else(|| self.labels.get(name).map(|&addr| addr as u32))
            .ok_or_else(|| AsmError::Undefined {
                line,
                name: name.into(),
            })
    }

    /// Integer or named value as a single byte; `None` for other operand kinds.
    fn resolve_byte(&self, operand: &Operand, line: usize) -> Option<AsmResult<u8>> {
        let value = match operand {
            Operand::Int(value) => Ok(*value),
            Operand::Ident(name) => self.lookup(name, line),
            Operand::Register(_) | Operand::Str(_) => return None,
        };

        Some(value.and_then(|value| {
            u8::try_from(value).map_err(|_| AsmError::OutOfRange { line, value })
        }))
    }

    fn emit(&mut self, byte: u8) {
        self.buffer.push(byte);
        self.ptr += 1;
    }

    fn visit_instruction(
        &mut self,
        instr: Instruction,
        args: &[Operand],
        line: usize,
    ) -> AsmResult<()> {
        let kinds = operand_kinds(instr);
        if args.len() != kinds.len() {
            return Err(AsmError::Arity {
                line,
                mnemonic: instr.mnemonic(),
                expected: kinds.len(),
                found: args.len(),
            });
        }

        self.emit(instr.opcode().0);

        for (index, (arg, kind)) in args.iter().zip(&kinds).enumerate() {
            let resolved = match (kind, arg) {
                (Expect::Register, Operand::Register(r)) => Some(Ok(*r)),
                (Expect::Immediate, _) => self.resolve_byte(arg, line),
                _ => None,
            };

            let byte = match resolved {
                Some(byte) => byte?,
                None => {
                    return Err(AsmError::OperandKind {
                        line,
                        mnemonic: instr.mnemonic(),
                        index: index + 1,
                        expected: kind.describe(),
                    });
                }
            };
            self.emit(byte);
        }

        Ok(())
    }

    fn visit_directive(&mut self, directive: &Directive, line: usize) -> AsmResult<()> {
        match directive {
            Directive::Bytes(values) => {
                for value in values {
                    let byte = self.resolve_byte(value, line).ok_or_else(|| {
                        AsmError::UnexpectedToken {
                            line,
                            expected: "byte value".into(),
                            found: value.to_string(),
                        }
                    })??;
                    self.emit(byte);
                }
            }

            Directive::String(s) => {
                for byte in s.bytes() {
                    self.emit(byte);
                }
            }

            // Consumed by earlier passes
            Directive::Define(..) | Directive::Include(_) => {}
        }

        Ok(())
    }

    fn visit_node(&mut self, node: &Node) -> AsmResult<()> {
        if node_size(node) > 0 {
            self.notes.insert(self.ptr, node.to_string());
        }

        match node {
            Node::Instruction { instr, args, line } => self.visit_instruction(*instr, args, *line),
            Node::Directive { directive, line } => self.visit_directive(directive, *line),
            // Resolved in the label pass
            Node::Label { .. } => Ok(()),
        }
    }

    pub fn assemble(&mut self, ast: &Ast) -> AsmResult<Image> {
        self.labels.clear();
        self.consts.clear();
        self.buffer.clear();
        self.notes.clear();

        let ast = self.expand_includes(ast, &self.root_path, 0)?;

        // First pass: collect constants and label addresses (no output)
        debug!("assembler: performing first pass");
        self.resolve_const_pass(&ast)?;
        self.resolve_label_pass(&ast)?;
        debug!("assembler: {} labels, {} bytes", self.labels.len(), self.ptr);

        // Second pass: generate bytes
        debug!("assembler: performing second pass");
        self.ptr = 0;
        for node in &ast {
            self.visit_node(node)?;
        }

        Ok(Image {
            bytes: std::mem::take(&mut self.buffer),
            notes: std::mem::take(&mut self.notes),
        })
    }
}
