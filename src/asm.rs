//! Validating and assembling parsed instructions into machine words.
//!
//! The assembler module notably consists of:
//! - [`assemble`]: the main function which turns a parsed instruction list
//!   into a stream of `(address, word)` pairs
//! - [`Assembler`]: the driver owning the instruction list and symbol
//!   table, exposing the individual passes through [`Assembler::run`]
//! - [`SymbolTable`]: the label-to-address mapping built by the second
//!   pass's label scan
//!
//! Assembly proceeds in the classic two passes: pass 1 assigns an address
//! to every instruction starting from the `.ORIG` operand; pass 2 first
//! scans labels into the symbol table (2a), then encodes every
//! instruction, resolving PC-relative label references (2b). Validation
//! runs before either pass, so the encoder only ever sees well-formed
//! operand lists.

pub mod encoding;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::ast::{IOffset, Instruction, Opcode, Operand, OperandType};
use crate::err::{Diagnostic, DiagnosticSink};

/// Assembles a parsed instruction list into `(address, word)` pairs.
///
/// Validation, address assignment, label scanning, and encoding run in
/// order; the first error is reported to `sink` and yields `None`. A
/// valid program that emits no words (just `.ORIG` and `.END`) yields
/// `Some` of an empty vector.
///
/// # Example
/// ```
/// use lc3_assembler::asm::assemble;
/// use lc3_assembler::parse::parse_instructions;
///
/// let src = ".ORIG x3000\nADD R1, R2, R3\n.END\n";
///
/// let mut diagnostics = Vec::new();
/// let instructions = parse_instructions(src, &mut diagnostics);
/// let words = assemble(instructions, &mut diagnostics);
///
/// assert_eq!(words, Some(vec![(0x3000, 0x1283)]));
/// ```
pub fn assemble<'s>(
    instructions: Vec<Instruction<'s>>,
    sink: &mut dyn DiagnosticSink,
) -> Option<Vec<(u16, u16)>> {
    Assembler::new(instructions).run(sink)
}

/// The symbol table built by the label scan.
///
/// Maps each label to the address of the instruction it is attached to.
/// Labels are unique and, like mnemonics, case-sensitive. The table is
/// filled once and read-only afterwards.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct SymbolTable<'s> {
    labels: HashMap<&'s str, u16>,
}

impl<'s> SymbolTable<'s> {
    /// Gets the memory address of a given label (if it exists).
    pub fn lookup_label(&self, label: &str) -> Option<u16> {
        self.labels.get(label).copied()
    }

    /// Gets an iterable of the mapping from labels to addresses.
    pub fn label_iter(&self) -> impl Iterator<Item = (&'s str, u16)> + '_ {
        self.labels.iter().map(|(&label, &addr)| (label, addr))
    }

    /// Adds a label. Returns `false` if the label was already present.
    fn add_label(&mut self, label: &'s str, address: u16) -> bool {
        match self.labels.entry(label) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert(address);
                true
            }
        }
    }
}

/// Accepted operand type tuples, per opcode.
///
/// Some opcodes admit more than one tuple (`ADD` takes a register or an
/// immediate in its last position); all tuples of an opcode have the same
/// length, so the first one also determines the arity.
fn operand_signatures(opcode: Opcode) -> &'static [&'static [OperandType]] {
    use Opcode::*;
    use OperandType::*;

    match opcode {
        ADD | AND => &[
            &[Register, Register, Register],
            &[Register, Register, Immediate],
        ],
        BR | BRn | BRz | BRp | BRzp | BRnp | BRnz | BRnzp | JSR => &[&[Label], &[Immediate]],
        JMP | JSRR => &[&[Register]],
        LD | LDI | LEA | ST | STI => &[&[Register, Label]],
        LDR | STR => &[&[Register, Register, Immediate]],
        NOT => &[&[Register, Register]],
        TRAP | ORIG | FILL => &[&[Immediate]],
        BLKW => &[&[Number]],
        STRINGZ => &[&[StringLiteral]],
        RET | RTI | GETC | OUT | PUTS | IN | PUTSP | HALT | END | Unknown => &[&[]],
    }
}

/// The accepted range for an opcode's immediate or number operand, taken
/// from the bit field the value ends up in.
fn immediate_range(opcode: Opcode) -> (i16, i16) {
    use Opcode::*;

    match opcode {
        // imm5
        ADD | AND => (IOffset::<5>::MIN, IOffset::<5>::MAX),
        // PCoffset9
        BR | BRn | BRz | BRp | BRzp | BRnp | BRnz | BRnzp => (IOffset::<9>::MIN, IOffset::<9>::MAX),
        LD | LDI | LEA | ST | STI => (IOffset::<9>::MIN, IOffset::<9>::MAX),
        // offset6
        LDR | STR => (IOffset::<6>::MIN, IOffset::<6>::MAX),
        // PCoffset11
        JSR => (IOffset::<11>::MIN, IOffset::<11>::MAX),
        // trapvect8
        TRAP => (0, 255),
        // Anything a 16-bit word can hold.
        _ => (i16::MIN, i16::MAX),
    }
}

/// Checks one instruction: label permission, operand arity, operand types
/// (the first matching tuple wins), and immediate range.
fn validate_instruction(instr: &Instruction) -> Result<(), Diagnostic> {
    if matches!(instr.opcode(), Opcode::ORIG | Opcode::END) && instr.label().is_some() {
        return Err(Diagnostic::LabelNotAllowed { instr: instr.to_string() });
    }

    let signatures = operand_signatures(instr.opcode());
    let operands = instr.operands();

    let expected = signatures[0].len();
    if operands.len() != expected {
        return Err(Diagnostic::OperandArityMismatch {
            instr: instr.to_string(),
            expected,
            found: operands.len(),
        });
    }

    // Try each tuple; on full mismatch, report against the last one tried.
    let mut mismatch = None;
    for signature in signatures {
        match operands.iter().zip(signature.iter()).position(|(op, &ty)| op.operand_type() != ty) {
            None => {
                mismatch = None;
                break;
            }
            Some(index) => mismatch = Some((index, signature[index])),
        }
    }
    if let Some((index, expected)) = mismatch {
        return Err(Diagnostic::OperandTypeMismatch {
            instr: instr.to_string(),
            index,
            expected,
            found: operands[index].operand_type(),
        });
    }

    // Range-check the first immediate-or-number operand, if there is one.
    let numeric = operands.iter().find_map(|op| match *op {
        Operand::Immediate(value) | Operand::Number(value) => Some((*op, value)),
        _ => None,
    });
    if let Some((operand, value)) = numeric {
        let (min, max) = immediate_range(instr.opcode());
        if value < min || value > max {
            return Err(Diagnostic::ImmediateOutOfRange {
                operand: operand.to_string(),
                instr: instr.to_string(),
                min,
                max,
            });
        }
    }

    Ok(())
}

/// How many words of memory an instruction occupies.
fn word_len(instr: &Instruction) -> u16 {
    match instr.opcode() {
        Opcode::ORIG | Opcode::END => 0,
        Opcode::FILL => 1,
        Opcode::BLKW => match instr.operands()[0] {
            Operand::Number(count) => count as u16,
            _ => unreachable!("`.BLKW` was validated to carry a number"),
        },
        Opcode::STRINGZ => match instr.operands()[0] {
            // One word per byte, plus the NUL terminator.
            Operand::StringLiteral(literal) => (literal.len() as u16).wrapping_add(1),
            _ => unreachable!("`.STRINGZ` was validated to carry a string literal"),
        },
        _ => 1,
    }
}

/// Owns the validated instruction list plus the symbol table, and drives
/// the assembly passes.
///
/// After a successful [`Assembler::run`], the instruction list carries
/// the assigned addresses and [`Assembler::symbol_table`] exposes the
/// label mapping, which is occasionally useful for inspection.
pub struct Assembler<'s> {
    instructions: Vec<Instruction<'s>>,
    symbols: SymbolTable<'s>,
}

impl<'s> Assembler<'s> {
    /// Creates an assembler over a parsed instruction list.
    pub fn new(instructions: Vec<Instruction<'s>>) -> Self {
        Assembler { instructions, symbols: SymbolTable::default() }
    }

    /// The instruction list, with addresses assigned once [`Assembler::run`]
    /// has made it past pass 1.
    pub fn instructions(&self) -> &[Instruction<'s>] {
        &self.instructions
    }

    /// The symbol table, filled once [`Assembler::run`] has made it past
    /// pass 2a.
    pub fn symbol_table(&self) -> &SymbolTable<'s> {
        &self.symbols
    }

    /// Runs validation and all assembly passes.
    ///
    /// Returns the emitted `(address, word)` stream, or `None` after
    /// reporting the first error to `sink`.
    pub fn run(&mut self, sink: &mut dyn DiagnosticSink) -> Option<Vec<(u16, u16)>> {
        if let Err(diagnostic) = self.check_program() {
            sink.report(diagnostic);
            return None;
        }

        self.assign_addresses();

        if let Err(diagnostic) = self.scan_labels() {
            sink.report(diagnostic);
            return None;
        }

        match self.encode_program() {
            Ok(words) => Some(words),
            Err(diagnostic) => {
                sink.report(diagnostic);
                None
            }
        }
    }

    /// Validates each instruction in order, then the program shape: the
    /// sequence must begin with `.ORIG` and contain exactly one.
    fn check_program(&self) -> Result<(), Diagnostic> {
        for instr in &self.instructions {
            validate_instruction(instr)?;
        }

        match self.instructions.first() {
            Some(first) if first.opcode() == Opcode::ORIG => {}
            Some(first) => {
                return Err(Diagnostic::OrigMissing { found: Some(first.to_string()) });
            }
            None => return Err(Diagnostic::OrigMissing { found: None }),
        }

        if self.instructions[1..].iter().any(|instr| instr.opcode() == Opcode::ORIG) {
            return Err(Diagnostic::OrigDuplicate);
        }

        Ok(())
    }

    /// Pass 1: assigns every instruction its address.
    ///
    /// The origin is the `.ORIG` operand. `.ORIG` and `.END` occupy no
    /// words, so each instruction's assigned address is exactly the
    /// address its first emitted word lands at. Address arithmetic wraps
    /// at 16 bits.
    fn assign_addresses(&mut self) {
        let mut address = match self.instructions[0].operands()[0] {
            Operand::Immediate(origin) => origin as u16,
            _ => unreachable!("the leading `.ORIG` was validated to carry an immediate"),
        };

        for instr in &mut self.instructions {
            instr.set_address(address);
            address = address.wrapping_add(word_len(instr));
        }
    }

    /// Pass 2a: collects every label into the symbol table.
    fn scan_labels(&mut self) -> Result<(), Diagnostic> {
        for instr in &self.instructions {
            if let Some(label) = instr.label() {
                if !self.symbols.add_label(label, instr.address()) {
                    return Err(Diagnostic::LabelRedefined {
                        label: label.to_string(),
                        instr: instr.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Pass 2b: encodes every instruction into addressed words.
    fn encode_program(&self) -> Result<Vec<(u16, u16)>, Diagnostic> {
        let mut words = Vec::with_capacity(self.instructions.len());

        for instr in &self.instructions {
            match instr.opcode() {
                Opcode::ORIG | Opcode::END => {}
                Opcode::FILL => match instr.operands()[0] {
                    Operand::Immediate(value) => words.push((instr.address(), value as u16)),
                    _ => unreachable!("`.FILL` was validated to carry an immediate"),
                },
                Opcode::BLKW => {
                    let count = match instr.operands()[0] {
                        Operand::Number(count) => count as u16,
                        _ => unreachable!("`.BLKW` was validated to carry a number"),
                    };
                    for i in 0..count {
                        words.push((instr.address().wrapping_add(i), 0));
                    }
                }
                Opcode::STRINGZ => {
                    let literal = match instr.operands()[0] {
                        Operand::StringLiteral(literal) => literal,
                        _ => unreachable!("`.STRINGZ` was validated to carry a string literal"),
                    };
                    let mut address = instr.address();
                    for byte in literal.bytes() {
                        words.push((address, u16::from(byte)));
                        address = address.wrapping_add(1);
                    }
                    words.push((address, 0));
                }
                _ => {
                    let word = encoding::encode_instruction(instr, &self.symbols)?;
                    words.push((instr.address(), word));
                }
            }
        }

        Ok(words)
    }
}
