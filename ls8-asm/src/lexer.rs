//! Assembler for LS-8 programs
//!
//! Lexer for the Assembly syntax

use ls8::Instruction;

use crate::error::{AsmError, AsmResult};

#[derive(Debug, Clone)]
pub struct Lexer {
    chars: Vec<char>,
    pub pos: usize,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Comma,   // ,
    Newline, // statements end at line breaks

    Instruction(Instruction), // LDI, prn, ...
    Directive(String),        // %define
    Label(String),            // name:

    Register(u8), // R0-R7
    Int(u32),
    Ident(String),
    String(String),
}

impl TokenKind {
    /// Human readable name used in parse errors
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Comma => "`,`".into(),
            TokenKind::Newline => "end of line".into(),
            TokenKind::Instruction(instr) => format!("instruction {}", instr.mnemonic()),
            TokenKind::Directive(name) => format!("directive %{}", name),
            TokenKind::Label(name) => format!("label {}:", name),
            TokenKind::Register(r) => format!("register R{}", r),
            TokenKind::Int(value) => format!("integer {}", value),
            TokenKind::Ident(name) => format!("identifier `{}`", name),
            TokenKind::String(_) => "string literal".into(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_register(ident: &str) -> Option<u8> {
    let mut chars = ident.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('r' | 'R'), Some(d @ '0'..='7'), None) => Some(d as u8 - b'0'),
        _ => None,
    }
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Lexer {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    /// Peek at the next character without consuming it.
    fn peek(&self) -> char {
        self.peek_ahead(0)
    }

    fn peek_ahead(&self, offset: usize) -> char {
        self.chars.get(self.pos + offset).copied().unwrap_or('\0')
    }

    /// Peek, advance and return the peeked character.
    fn advance(&mut self) -> char {
        let peeked = self.peek();
        self.pos += 1;
        peeked
    }

    fn token(&self, kind: TokenKind, literal: impl Into<String>) -> Token {
        Token {
            kind,
            literal: literal.into(),
            line: self.line,
        }
    }

    fn skip_comment(&mut self) {
        while self.peek() != '\n' && self.peek() != '\0' {
            self.advance();
        }
    }

    fn take_ident(&mut self) -> String {
        let mut ident = String::new();
        while is_ident_char(self.peek()) {
            ident.push(self.advance());
        }
        ident
    }

    fn lex_number(&mut self) -> AsmResult<Token> {
        let literal = self.take_ident();
        let digits = literal.replace('_', "");

        let (base, body) = match digits.get(..2) {
            Some("0x" | "0X") => (16, &digits[2..]),
            Some("0b" | "0B") => (2, &digits[2..]),
            Some("0o" | "0O") => (8, &digits[2..]),
            _ => (10, digits.as_str()),
        };

        let value = u32::from_str_radix(body, base).map_err(|_| AsmError::InvalidNumber {
            line: self.line,
            literal: literal.clone(),
        })?;

        Ok(self.token(TokenKind::Int(value), literal))
    }

    fn lex_string(&mut self) -> AsmResult<Token> {
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            match self.advance() {
                '"' => break,
                '\0' | '\n' => return Err(AsmError::UnterminatedString { line: self.line }),
                '\\' => match self.advance() {
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    '0' => value.push('\0'),
                    '\0' | '\n' => {
                        return Err(AsmError::UnterminatedString { line: self.line });
                    }
                    c => value.push(c),
                },
                c => value.push(c),
            }
        }

        Ok(self.token(TokenKind::String(value.clone()), value))
    }

    // Lex things that are *like* identifiers: labels, registers and mnemonics
    fn lex_ident_like(&mut self) -> Token {
        let ident = self.take_ident();

        if self.peek() == ':' {
            self.advance();
            return self.token(TokenKind::Label(ident.clone()), ident);
        }

        if let Some(r) = parse_register(&ident) {
            return self.token(TokenKind::Register(r), ident);
        }

        if let Some(instr) = Instruction::from_mnemonic(&ident) {
            return self.token(TokenKind::Instruction(instr), ident);
        }

        self.token(TokenKind::Ident(ident.clone()), ident)
    }

    fn lex_directive(&mut self) -> Token {
        self.advance(); // '%'
        let name = self.take_ident();
        self.token(TokenKind::Directive(name.to_ascii_lowercase()), name)
    }

    pub fn lex(&mut self) -> AsmResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let c = self.peek();
            match c {
                '\0' => break,
                ';' => self.skip_comment(),
                '/' if self.peek_ahead(1) == '/' => self.skip_comment(),
                '\n' => {
                    tokens.push(self.token(TokenKind::Newline, "\n"));
                    self.advance();
                    self.line += 1;
                }
                _ if c.is_whitespace() => {
                    self.advance();
                }
                ',' => {
                    self.advance();
                    tokens.push(self.token(TokenKind::Comma, ","));
                }
                '"' => tokens.push(self.lex_string()?),
                '%' => tokens.push(self.lex_directive()),
                '0'..='9' => tokens.push(self.lex_number()?),
                _ if c.is_ascii_alphabetic() || c == '_' => tokens.push(self.lex_ident_like()),
                _ => {
                    return Err(AsmError::UnexpectedChar {
                        line: self.line,
                        ch: c,
                    });
                }
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ls8::{AluOp, Op};

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .lex()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lex_skips_comments() {
        assert_eq!(kinds("; comment\n123 // trailing"), [
            TokenKind::Newline,
            TokenKind::Int(123)
        ]);
    }

    #[test]
    fn lex_number() {
        assert_eq!(kinds("123 0xff 0b0010 0o17 1_000"), [
            TokenKind::Int(123),
            TokenKind::Int(0xFF),
            TokenKind::Int(0b0010),
            TokenKind::Int(0o17),
            TokenKind::Int(1000),
        ]);
    }

    #[test]
    fn lex_bad_number() {
        let err = Lexer::new("\n0x").lex().unwrap_err();
        assert!(matches!(err, AsmError::InvalidNumber { line: 2, .. }));

        assert!(Lexer::new("12ab").lex().is_err());
    }

    #[test]
    fn lex_string() {
        assert_eq!(kinds(r#""hi\n" "a\"b""#), [
            TokenKind::String("hi\n".into()),
            TokenKind::String("a\"b".into()),
        ]);

        let err = Lexer::new("\"open\nline").lex().unwrap_err();
        assert!(matches!(err, AsmError::UnterminatedString { line: 1 }));
    }

    #[test]
    fn lex_instruction_line() {
        assert_eq!(kinds("loop: ldi r3, Done"), [
            TokenKind::Label("loop".into()),
            TokenKind::Instruction(Instruction::General(Op::LDI)),
            TokenKind::Register(3),
            TokenKind::Comma,
            TokenKind::Ident("Done".into()),
        ]);

        assert_eq!(kinds("CMP R0,R1"), [
            TokenKind::Instruction(Instruction::Alu(AluOp::CMP)),
            TokenKind::Register(0),
            TokenKind::Comma,
            TokenKind::Register(1),
        ]);
    }

    #[test]
    fn out_of_range_register_is_an_ident() {
        assert_eq!(kinds("R8"), [TokenKind::Ident("R8".into())]);
    }

    #[test]
    fn lex_directive() {
        assert_eq!(kinds("%DEFINE size 4"), [
            TokenKind::Directive("define".into()),
            TokenKind::Ident("size".into()),
            TokenKind::Int(4),
        ]);
    }

    #[test]
    fn tracks_lines() {
        let tokens = Lexer::new("NOP\n\nHLT").lex().unwrap();
        assert_eq!(tokens.last().map(|t| t.line), Some(3));
    }

    #[test]
    fn rejects_stray_characters() {
        let err = Lexer::new("LDI R0, $4").lex().unwrap_err();
        assert!(matches!(err, AsmError::UnexpectedChar { ch: '$', .. }));
    }
}
