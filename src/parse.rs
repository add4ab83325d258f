//! Parsing token streams into instructions.
//!
//! The [`Parser`] walks the token stream one instruction at a time: an
//! optional label, an opcode or pseudo-op, and a comma-separated operand
//! list. [`parse_instructions`] is the entry point; on the first error it
//! reports a diagnostic through the sink and surrenders a vector holding a
//! single [`Opcode::Unknown`] instruction, the sentinel callers check with
//! [`Instruction::is_unknown`].

pub mod lex;

use self::lex::{Lexer, Token, TokenKind};
use crate::ast::{Instruction, Opcode, Operand, OperandError};
use crate::err::{Diagnostic, DiagnosticSink};

/// Parses LC-3 source into a list of instructions.
///
/// On failure, the returned vector contains exactly one instruction whose
/// opcode is [`Opcode::Unknown`] and the reason has been reported to
/// `sink`.
///
/// ```
/// use lc3_assembler::parse::parse_instructions;
///
/// let mut diagnostics = Vec::new();
/// let instructions = parse_instructions("LOOP AND R3, R3, #0\n.END", &mut diagnostics);
///
/// assert!(diagnostics.is_empty());
/// assert_eq!(instructions.len(), 2);
/// assert_eq!(instructions[0].to_string(), "LOOP AND R3, R3, #0");
/// ```
pub fn parse_instructions<'s>(
    src: &'s str,
    sink: &mut dyn DiagnosticSink,
) -> Vec<Instruction<'s>> {
    Parser::new(src).parse_instructions(sink)
}

/// A parser over a token stream.
///
/// The parser always holds one current token; [`Parser::next_token`]
/// replaces it with the next one from the lexer.
pub struct Parser<'s> {
    lexer: Lexer<'s>,
    cur: Token,
}

impl<'s> Parser<'s> {
    /// Creates a parser over the given source, positioned at the first
    /// token.
    pub fn new(src: &'s str) -> Self {
        let mut lexer = Lexer::new(src);
        let cur = lexer.next_token();
        Parser { lexer, cur }
    }

    /// The token the parser is currently looking at.
    pub fn current_token(&self) -> &Token {
        &self.cur
    }

    /// Advances to and returns the next token.
    pub fn next_token(&mut self) -> &Token {
        self.cur = self.lexer.next_token();
        &self.cur
    }

    fn source(&self) -> &'s str {
        self.lexer.source()
    }

    /// Parses instructions until the end of the source or a successfully
    /// parsed `.END` (which is included in the result).
    pub fn parse_instructions(mut self, sink: &mut dyn DiagnosticSink) -> Vec<Instruction<'s>> {
        let mut instructions = Vec::new();

        loop {
            match self.cur.kind {
                TokenKind::Eol => {
                    self.next_token();
                }
                TokenKind::End => return instructions,
                _ => {
                    let Some(instr) = self.parse_instruction(sink) else {
                        // The error is already reported; surrender the
                        // sentinel vector.
                        return vec![Instruction::unknown()];
                    };

                    let done = instr.opcode() == Opcode::END;
                    instructions.push(instr);
                    if done {
                        return instructions;
                    }
                }
            }
        }
    }

    /// Parses one instruction starting at the current token. Returns
    /// `None` after reporting a diagnostic.
    fn parse_instruction(&mut self, sink: &mut dyn DiagnosticSink) -> Option<Instruction<'s>> {
        let mut label = None;
        if self.cur.kind == TokenKind::Label {
            label = Some(self.cur.lexeme(self.source()));
            self.next_token();
        }

        // A label may stand on a line of its own, above its instruction.
        while self.cur.kind == TokenKind::Eol {
            self.next_token();
        }

        if !matches!(self.cur.kind, TokenKind::Opcode | TokenKind::Pseudo) {
            sink.report(Diagnostic::OpcodeExpected {
                content: self.cur.display_content(self.source()),
                found: self.cur.kind,
            });
            return None;
        }

        let opcode = match Opcode::from_mnemonic(self.cur.lexeme(self.source())) {
            Some(opcode) => opcode,
            None => unreachable!("the lexer only classifies known mnemonics"),
        };
        self.next_token();

        self.parse_operand_list(Instruction::new(label, opcode), sink)
    }

    /// Parses the comma-separated operand list into `instr`.
    ///
    /// LC-3 syntax has no marker for the start of an operand list and some
    /// instructions take none, so a current token that cannot be an
    /// operand simply means the list is empty. After the first operand,
    /// though, every comma must be followed by a valid operand.
    fn parse_operand_list(
        &mut self,
        mut instr: Instruction<'s>,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<Instruction<'s>> {
        match Operand::from_token(&self.cur, self.source()) {
            Ok(operand) => instr.push_operand(operand),
            Err(OperandError::InvalidTokenKind) => return Some(instr),
            Err(error) => {
                self.report_operand_error(error, sink);
                return None;
            }
        }

        loop {
            if self.next_token().kind != TokenKind::Comma {
                break;
            }
            self.next_token();

            match Operand::from_token(&self.cur, self.source()) {
                Ok(operand) => instr.push_operand(operand),
                Err(error) => {
                    self.report_operand_error(error, sink);
                    return None;
                }
            }
        }

        // The trailing EOL is left for the instruction loop.
        Some(instr)
    }

    fn report_operand_error(&self, error: OperandError, sink: &mut dyn DiagnosticSink) {
        sink.report(Diagnostic::MalformedOperand {
            content: self.cur.display_content(self.source()),
            error,
        });
    }
}
