//! Assembler for LS-8 programs
//!
//! Parser for the Assembly syntax
//!
//! One statement per line: an optional `label:` followed by an instruction or a
//! directive. Operands are separated by commas and are registers (`R0`-`R7`),
//! integers, or identifiers naming a label or a `%define` constant.

use std::fmt;
use std::iter::Peekable;

use ls8::Instruction;

use crate::error::{AsmError, AsmResult};
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone)]
pub struct Parser<I>
where
    I: Iterator<Item = Token>,
{
    pub tokens: Peekable<I>,
    pub ast: Ast,
}

// --------------------------------------------
// AST definition

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(u8),
    Int(u32),
    Ident(String),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Define(String, u32),   // %define LIMIT 42
    Include(String),       // %include "file.asm"
    Bytes(Vec<Operand>),   // %bytes 0x01 0x02 label
    String(String),        // %string "hello"
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Instruction {
        instr: Instruction,
        args: Vec<Operand>,
        line: usize,
    },
    Directive {
        directive: Directive,
        line: usize,
    },
    Label {
        name: String,
        line: usize,
    },
}

pub type Ast = Vec<Node>;

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "R{}", r),
            Operand::Int(value) => write!(f, "{}", value),
            Operand::Ident(name) => write!(f, "{}", name),
            Operand::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Define(name, value) => write!(f, "%define {} {}", name, value),
            Directive::Include(path) => write!(f, "%include {:?}", path),
            Directive::Bytes(values) => {
                write!(f, "%bytes")?;
                for value in values {
                    write!(f, " {}", value)?;
                }
                Ok(())
            }
            Directive::String(s) => write!(f, "%string {:?}", s),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Instruction { instr, args, .. } => {
                write!(f, "{}", instr.mnemonic())?;
                for (i, arg) in args.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{}{}", sep, arg)?;
                }
                Ok(())
            }
            Node::Directive { directive, .. } => write!(f, "{}", directive),
            Node::Label { name, .. } => write!(f, "{}:", name),
        }
    }
}

// --------------------------------------------
// Parsing

impl<I> Parser<I>
where
    I: Iterator<Item = Token>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens: tokens.peekable(),
            ast: Vec::new(),
        }
    }

    fn unexpected(expected: &str, token: Option<Token>) -> AsmError {
        match token {
            Some(token) => AsmError::UnexpectedToken {
                line: token.line,
                expected: expected.into(),
                found: token.kind.describe(),
            },
            None => AsmError::UnexpectedEof {
                expected: expected.into(),
            },
        }
    }

    /// Statements end at a line break or at the end of input
    fn expect_end(&mut self) -> AsmResult<()> {
        match self.tokens.next() {
            None => Ok(()),
            Some(token) if token.kind == TokenKind::Newline => Ok(()),
            other => Err(Self::unexpected("end of line", other)),
        }
    }

    fn parse_operand(&mut self) -> AsmResult<Operand> {
        let token = self.tokens.next();
        match token.as_ref().map(|t| &t.kind) {
            Some(TokenKind::Register(r)) => Ok(Operand::Register(*r)),
            Some(TokenKind::Int(value)) => Ok(Operand::Int(*value)),
            Some(TokenKind::Ident(name)) => Ok(Operand::Ident(name.clone())),
            Some(TokenKind::String(s)) => Ok(Operand::Str(s.clone())),
            _ => Err(Self::unexpected("operand", token)),
        }
    }

    fn at_operand(&mut self) -> bool {
        matches!(
            self.tokens.peek().map(|t| &t.kind),
            Some(
                TokenKind::Register(_)
                    | TokenKind::Int(_)
                    | TokenKind::Ident(_)
                    | TokenKind::String(_)
            )
        )
    }

    // Operands up to the end of the line. Commas are separators and may be left
    // out between directive values, but never trail.
    fn parse_args(&mut self) -> AsmResult<Vec<Operand>> {
        let mut args = Vec::new();
        while self.at_operand() {
            args.push(self.parse_operand()?);

            if matches!(self.tokens.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
                self.tokens.next();
                if !self.at_operand() {
                    return Err(Self::unexpected("operand", self.tokens.next()));
                }
            }
        }

        Ok(args)
    }

    fn parse_instruction(&mut self, instr: Instruction, line: usize) -> AsmResult<Node> {
        let args = self.parse_args()?;
        self.expect_end()?;

        Ok(Node::Instruction { instr, args, line })
    }

    // Assembler Directives
    // --------------------
    // %define <name> <value>:      define constant
    // %include "file":             include file by cut and paste
    // %bytes 0x1 0x2 label:        raw bytes
    // %string "hello":             ASCII bytes, no terminator
    // --------------------------------------

    fn parse_directive(&mut self, name: &str, line: usize) -> AsmResult<Node> {
        let args = self.parse_args()?;

        let directive = match (name, args.as_slice()) {
            ("define", [Operand::Ident(name), Operand::Int(value)]) => {
                Directive::Define(name.clone(), *value)
            }
            ("define", _) => {
                return Err(AsmError::UnexpectedToken {
                    line,
                    expected: "%define <name> <integer>".into(),
                    found: format!("{} operand(s)", args.len()),
                });
            }
            ("include", [Operand::Str(path)]) => Directive::Include(path.clone()),
            ("include", _) => {
                return Err(AsmError::UnexpectedToken {
                    line,
                    expected: "%include \"<file>\"".into(),
                    found: format!("{} operand(s)", args.len()),
                });
            }
            ("string", [Operand::Str(s)]) => Directive::String(s.clone()),
            ("string", _) => {
                return Err(AsmError::UnexpectedToken {
                    line,
                    expected: "%string \"<text>\"".into(),
                    found: format!("{} operand(s)", args.len()),
                });
            }
            ("bytes", _) => Directive::Bytes(args),
            _ => {
                return Err(AsmError::UnknownDirective {
                    line,
                    name: name.into(),
                });
            }
        };

        self.expect_end()?;
        Ok(Node::Directive { directive, line })
    }

    // --------------------------------------

    pub fn parse(&mut self) -> AsmResult<Ast> {
        while let Some(token) = self.tokens.next() {
            let line = token.line;
            match token.kind {
                TokenKind::Newline => {}
                TokenKind::Label(name) => self.ast.push(Node::Label { name, line }),
                TokenKind::Instruction(instr) => {
                    let node = self.parse_instruction(instr, line)?;
                    self.ast.push(node);
                }
                TokenKind::Directive(name) => {
                    let node = self.parse_directive(&name, line)?;
                    self.ast.push(node);
                }
                TokenKind::Ident(name) => {
                    return Err(AsmError::UnknownInstruction { line, name });
                }
                _ => {
                    return Err(Self::unexpected(
                        "instruction, directive or label",
                        Some(token),
                    ));
                }
            }
        }

        Ok(std::mem::take(&mut self.ast))
    }
}

pub fn parse_source(src: &str) -> AsmResult<Ast> {
    let tokens = crate::lexer::Lexer::new(src).lex()?;
    Parser::new(tokens.into_iter()).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ls8::{AluOp, Op};

    #[test]
    fn parses_instruction() {
        let ast = parse_source("ADD R0, R1").unwrap();
        assert_eq!(ast, [Node::Instruction {
            instr: Instruction::Alu(AluOp::ADD),
            args: vec![Operand::Register(0), Operand::Register(1)],
            line: 1,
        }]);
    }

    #[test]
    fn parses_label_on_same_line() {
        let ast = parse_source("start: HLT\n").unwrap();
        assert_eq!(ast.len(), 2);
        assert!(matches!(&ast[0], Node::Label { name, .. } if name == "start"));
        assert!(matches!(
            ast[1],
            Node::Instruction { instr: Instruction::General(Op::HLT), .. }
        ));
    }

    #[test]
    fn parses_directives() {
        let ast = parse_source(
            "%define LIMIT 0x10\n%include \"lib.asm\"\n%bytes 1 2, end\n%string \"ok\"",
        )
        .unwrap();

        let directives: Vec<_> = ast
            .into_iter()
            .map(|node| match node {
                Node::Directive { directive, .. } => directive,
                other => panic!("expected directive, got {:?}", other),
            })
            .collect();

        assert_eq!(directives, [
            Directive::Define("LIMIT".into(), 16),
            Directive::Include("lib.asm".into()),
            Directive::Bytes(vec![
                Operand::Int(1),
                Operand::Int(2),
                Operand::Ident("end".into())
            ]),
            Directive::String("ok".into()),
        ]);
    }

    #[test]
    fn rejects_unknown_mnemonic() {
        let err = parse_source("NOP\nDIV R0, R1").unwrap_err();
        assert!(matches!(err, AsmError::UnknownInstruction { line: 2, ref name } if name == "DIV"));
    }

    #[test]
    fn rejects_trailing_comma() {
        assert!(matches!(
            parse_source("PRN R0,\nHLT"),
            Err(AsmError::UnexpectedToken { line: 1, .. })
        ));
    }

    #[test]
    fn rejects_two_statements_on_one_line() {
        assert!(matches!(
            parse_source("NOP HLT"),
            Err(AsmError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn rejects_bad_directives() {
        assert!(matches!(
            parse_source("%define 4"),
            Err(AsmError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_source("%org 10"),
            Err(AsmError::UnknownDirective { .. })
        ));
    }

    #[test]
    fn displays_canonical_form() {
        let ast = parse_source("ldi r1, double_print\n%bytes 1 2").unwrap();
        assert_eq!(ast[0].to_string(), "LDI R1, double_print");
        assert_eq!(ast[1].to_string(), "%bytes 1 2");
    }
}
