//! An LC-3 parser and two-pass assembler.
//!
//! Source text is tokenized ([`parse::lex`]), parsed into a list of
//! instructions ([`parse`]), then validated and assembled into addressed
//! machine words ([`asm`]). Errors at every stage are structured
//! [`err::Diagnostic`] events delivered to a caller-provided
//! [`err::DiagnosticSink`], so rendering is entirely the caller's concern.
//!
//! # Usage
//!
//! ```
//! use lc3_assembler::asm::assemble;
//! use lc3_assembler::err::Diagnostic;
//! use lc3_assembler::parse::parse_instructions;
//!
//! let src = "
//! .ORIG x3000
//! LOOP ADD R1, R1, #-1
//!      BRp LOOP
//! .END
//! ";
//!
//! let mut diagnostics: Vec<Diagnostic> = Vec::new();
//! let instructions = parse_instructions(src, &mut diagnostics);
//! let words = assemble(instructions, &mut diagnostics).expect("assembly should succeed");
//!
//! assert!(diagnostics.is_empty());
//! assert_eq!(words[0], (0x3000, 0x127F));
//! assert_eq!(words[1], (0x3001, 0x03FE));
//! ```
#![warn(missing_docs)]

pub mod asm;
pub mod ast;
pub mod err;
pub mod parse;
