//! Structured diagnostics and the sink they are delivered through.
//!
//! Every stage of the pipeline reports errors as [`Diagnostic`] values
//! through a [`DiagnosticSink`] the caller passes in. The sink decouples
//! error *production* from error *rendering*: the CLI installs a reporter
//! that prints to stderr, while tests collect into a `Vec<Diagnostic>` and
//! assert on the exact events.

use std::borrow::Cow;
use std::fmt;

use crate::ast::{OperandError, OperandType};
use crate::parse::lex::TokenKind;

/// A structured error event produced by the parser, the validator, or the
/// assembler.
///
/// Variants carry their context pre-rendered (token content, the display
/// form of the offending instruction, label names) so that a diagnostic
/// can outlive the source buffer it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A token that cannot begin an instruction appeared where an opcode or
    /// pseudo-op was required.
    OpcodeExpected {
        /// Display-escaped content of the offending token.
        content: String,
        /// Kind of the offending token.
        found: TokenKind,
    },
    /// A token in operand position could not be turned into an operand.
    MalformedOperand {
        /// Display-escaped content of the offending token.
        content: String,
        /// Why operand construction failed.
        error: OperandError,
    },
    /// A label was attached to an instruction that does not allow one.
    LabelNotAllowed {
        /// Display form of the offending instruction.
        instr: String,
    },
    /// An instruction carried the wrong number of operands.
    OperandArityMismatch {
        /// Display form of the offending instruction.
        instr: String,
        /// How many operands the opcode requires.
        expected: usize,
        /// How many operands were written.
        found: usize,
    },
    /// An operand's type matched none of the opcode's accepted tuples.
    /// Reported against the last tuple tried.
    OperandTypeMismatch {
        /// Display form of the offending instruction.
        instr: String,
        /// Zero-based index of the first mismatched operand.
        index: usize,
        /// The type the last tuple tried expected at that position.
        expected: OperandType,
        /// The type actually written.
        found: OperandType,
    },
    /// An immediate or number operand fell outside its opcode's range.
    ImmediateOutOfRange {
        /// Display form of the offending operand.
        operand: String,
        /// Display form of the offending instruction.
        instr: String,
        /// Lower bound of the accepted range.
        min: i16,
        /// Upper bound of the accepted range.
        max: i16,
    },
    /// The instruction sequence did not begin with `.ORIG`.
    OrigMissing {
        /// Display form of the actual first instruction, if there was one.
        found: Option<String>,
    },
    /// More than one `.ORIG` appeared in the sequence.
    OrigDuplicate,
    /// The same label was attached to two instructions.
    LabelRedefined {
        /// The label in question.
        label: String,
        /// Display form of the redefining instruction.
        instr: String,
    },
    /// A label operand never appeared as a definition.
    LabelNotFound {
        /// The label in question.
        label: String,
        /// Display form of the instruction using it.
        instr: String,
    },
    /// A PC-relative offset did not fit its instruction's bit field.
    OffsetOutOfRange {
        /// The target label.
        label: String,
        /// Display form of the instruction using it.
        instr: String,
        /// The computed offset.
        offset: i16,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpcodeExpected { content, found } => {
                write!(f, "at token `{content}`: expected an opcode or pseudo-op, but got `{found}`")
            }
            Self::MalformedOperand { content, error } => {
                write!(f, "cannot construct an operand from `{content}`: {error}")
            }
            Self::LabelNotAllowed { instr } => {
                write!(f, "instruction `{instr}` does not allow a label")
            }
            Self::OperandArityMismatch { instr, expected, found } => {
                write!(f, "instruction `{instr}` expects {expected} operand(s), but got {found} operand(s)")
            }
            Self::OperandTypeMismatch { instr, index, expected, found } => {
                write!(
                    f,
                    "operand {} of instruction `{instr}` should be of type `{expected}`, but got `{found}`",
                    index + 1
                )
            }
            Self::ImmediateOutOfRange { operand, instr, min, max } => {
                write!(f, "immediate operand {operand} of instruction `{instr}` is out of range [{min}, {max}]")
            }
            Self::OrigMissing { found: Some(instr) } => {
                write!(f, "expected the first instruction to be `.ORIG`, but got `{instr}`")
            }
            Self::OrigMissing { found: None } => {
                f.write_str("expected the first instruction to be `.ORIG`")
            }
            Self::OrigDuplicate => f.write_str("multiple `.ORIG` pseudo-instructions found"),
            Self::LabelRedefined { label, instr } => {
                write!(f, "label `{label}` redefined by instruction `{instr}`")
            }
            Self::LabelNotFound { label, instr } => {
                write!(f, "label `{label}` in instruction `{instr}` not found")
            }
            Self::OffsetOutOfRange { label, instr, offset } => {
                write!(f, "offset {offset} of label `{label}` in instruction `{instr}` is out of range")
            }
        }
    }
}

impl std::error::Error for Diagnostic {}

impl Diagnostic {
    /// A hint worth printing under the error message, when one exists.
    pub fn help(&self) -> Option<Cow<'static, str>> {
        match self {
            Self::OpcodeExpected { .. } => {
                Some("every line takes the form `LABEL OPCODE OPERANDS`, with the label optional".into())
            }
            Self::MalformedOperand { error, .. } => match error {
                OperandError::InvalidTokenKind => None,
                OperandError::InvalidNumber => {
                    Some("numeric operands look like `#10`, `x3000`, `b101`, or a bare decimal".into())
                }
                OperandError::IntegerOverflow => {
                    Some(format!("the accepted range for integer literals is [{}, {}]", i16::MIN, u16::MAX).into())
                }
                OperandError::MissingQuote => {
                    Some("add a quote to the end of the string literal".into())
                }
            },
            Self::LabelNotAllowed { .. } => {
                Some("`.ORIG` and `.END` cannot be labeled; attach the label to the next instruction".into())
            }
            Self::OrigMissing { .. } => {
                Some("start the program with an `.ORIG` directive, such as `.ORIG x3000`".into())
            }
            Self::LabelRedefined { .. } => {
                Some("labels must be unique within a file; try renaming one of them".into())
            }
            Self::LabelNotFound { .. } => {
                Some("try adding this label before an instruction or directive".into())
            }
            Self::OffsetOutOfRange { .. } => {
                Some("the target must be within reach of this instruction's PC-relative field".into())
            }
            _ => None,
        }
    }
}

/// Receives diagnostics as they are produced.
///
/// Diagnostics arrive in the order the offending constructs appear in the
/// source; every stage stops at its first error, so a failing run reports
/// the earliest problem it found.
pub trait DiagnosticSink {
    /// Delivers one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::Diagnostic;
    use crate::ast::OperandError;
    use crate::parse::lex::TokenKind;

    #[test]
    fn test_display() {
        let diag = Diagnostic::OpcodeExpected {
            content: "#3".to_string(),
            found: TokenKind::Immediate,
        };
        assert_eq!(
            diag.to_string(),
            "at token `#3`: expected an opcode or pseudo-op, but got `Immediate`"
        );

        let diag = Diagnostic::LabelRedefined {
            label: "FOO".to_string(),
            instr: "FOO .FILL x2".to_string(),
        };
        assert_eq!(diag.to_string(), "label `FOO` redefined by instruction `FOO .FILL x2`");

        let diag = Diagnostic::OrigMissing { found: None };
        assert_eq!(diag.to_string(), "expected the first instruction to be `.ORIG`");
    }

    #[test]
    fn test_help() {
        let diag = Diagnostic::MalformedOperand {
            content: "\"oops".to_string(),
            error: OperandError::MissingQuote,
        };
        assert_eq!(diag.help().as_deref(), Some("add a quote to the end of the string literal"));

        let diag = Diagnostic::OrigDuplicate;
        assert_eq!(diag.help(), None);
    }

    #[test]
    fn test_vec_sink_preserves_order() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        super::DiagnosticSink::report(&mut sink, Diagnostic::OrigDuplicate);
        super::DiagnosticSink::report(&mut sink, Diagnostic::OrigMissing { found: None });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0], Diagnostic::OrigDuplicate);
    }
}
