//! Tokenizing LC-3 assembly.
//!
//! This module holds the tokens that characterize LC-3 assembly
//! ([`Token`], [`TokenKind`]) and the [`Lexer`] that produces them.
//!
//! A token is pure data: a kind plus the source range it covers. It never
//! owns its text, so the source buffer must outlive every token derived
//! from it. The lexer itself never fails; source bytes that fit no token
//! class come out as [`TokenKind::Unknown`] and are diagnosed by whoever
//! consumes them.

use logos::{Logos, Span};

use crate::ast::Opcode;

/// The kind of a [`Token`].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TokenKind {
    /// An unrecognized or erroneous piece of source, such as a stray `?`
    /// or a `.`-prefixed word that is not a pseudo-op.
    Unknown,
    /// The end of a line. Every `\n` produces one; all other whitespace is
    /// invisible.
    Eol,
    /// The end of the source. Once produced, the lexer keeps producing it.
    End,
    /// A real instruction mnemonic, such as `ADD` or `BRnzp`.
    Opcode,
    /// An identifier that is neither a mnemonic nor a register, such as
    /// `LOOP`.
    Label,
    /// A register name, `R0` through `R7`. Anything beyond that range
    /// (say, `R8`) is a [`TokenKind::Label`].
    Register,
    /// A pseudo-op, such as `.ORIG` or `.STRINGZ`.
    Pseudo,
    /// A prefixed integer literal: `#-5`, `x3000`, `b101`.
    Immediate,
    /// A bare decimal number, used as the `.BLKW` count.
    Number,
    /// A string literal, such as `"Hello"`.
    String,
    /// A comma, which separates operands.
    Comma,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("Unknown"),
            Self::Eol => f.write_str("EOL"),
            Self::End => f.write_str("End"),
            Self::Opcode => f.write_str("Opcode"),
            Self::Label => f.write_str("Label"),
            Self::Register => f.write_str("Register"),
            Self::Pseudo => f.write_str("Pseudo"),
            Self::Immediate => f.write_str("Immediate"),
            Self::Number => f.write_str("Number"),
            Self::String => f.write_str("String"),
            Self::Comma => f.write_str("Comma"),
        }
    }
}

/// A unit of information in LC-3 source code: a kind and the range of the
/// source it was read from.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    /// What this token is.
    pub kind: TokenKind,
    /// The source range this token covers. Always a subrange of the source
    /// buffer, with `start <= end`.
    pub span: Span,
}

impl Token {
    /// Reads this token's text out of the source it was produced over.
    pub fn lexeme<'s>(&self, src: &'s str) -> &'s str {
        &src[self.span.clone()]
    }

    /// This token's text, formatted for diagnostic messages: `\0`, `\n`,
    /// and `\t` are escaped so a token never breaks the line it is printed
    /// on.
    pub fn display_content(&self, src: &str) -> String {
        let lexeme = self.lexeme(src);
        let mut result = String::with_capacity(lexeme.len());
        for ch in lexeme.chars() {
            match ch {
                '\0' => result.push_str("\\0"),
                '\n' => result.push_str("\\n"),
                '\t' => result.push_str("\\t"),
                ch => result.push(ch),
            }
        }
        result
    }
}

/// The raw lexeme classes recognized by the scanner.
///
/// These are deliberately coarser than [`TokenKind`]: a letter-initiated
/// run ([`Lexeme::Word`]) may turn out to be an opcode, a register, a hex
/// or binary immediate, or a label, and a `.`-run ([`Lexeme::Dot`]) may or
/// may not name a pseudo-op. That reclassification happens on the lexeme
/// text in [`Lexer::next_token`], so the scanner itself never backtracks.
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
#[logos(skip r"[ \t\r\x0B\x0C]+")]
enum Lexeme {
    /// A letter followed by any run of alphanumerics.
    #[regex(r"[A-Za-z][0-9A-Za-z]*")]
    Word,

    /// A `#`-prefixed decimal literal. The sign and digits are optional
    /// here; a bare `#` or `#-` is rejected at operand construction.
    #[regex(r"#[+-]?[0-9]*")]
    Immediate,

    /// A bare decimal number, with an optional leading sign. A leading
    /// sign or digit can never start an identifier, opcode, or register,
    /// so this class is unambiguous.
    #[regex(r"[0-9]+")]
    #[regex(r"[+-][0-9]*")]
    Number,

    /// A `.` followed by any run of alphanumerics.
    #[regex(r"\.[0-9A-Za-z]*")]
    Dot,

    /// A string literal. The callback consumes through the closing quote,
    /// or stops short of the end of the line if there is none.
    #[token("\"", lex_string_literal)]
    Str,

    #[token(",")]
    Comma,

    #[token("\n")]
    Eol,

    /// A comment, from a semicolon to the end of the line. The newline is
    /// left for the next token.
    #[regex(r";[^\n]*")]
    Comment,
}

/// Consumes the remainder of a string literal: everything up to and
/// including the closing quote, or up to (not including) a newline, or to
/// the end of the source.
fn lex_string_literal(lx: &mut logos::Lexer<'_, Lexeme>) {
    let rem = lx.remainder();
    match rem.find(['"', '\n']) {
        Some(n) if rem.as_bytes()[n] == b'"' => lx.bump(n + 1),
        Some(n) => lx.bump(n),
        None => lx.bump(rem.len()),
    }
}

/// Reclassifies a letter-initiated alphanumeric run.
///
/// The checks run in order and the first that accepts the lexeme decides
/// the kind. Note that the hex and binary checks accept an empty tail, so
/// a lone `x` or `b` is an (invalid) immediate rather than a label; the
/// invalidity is caught at operand construction.
fn classify_word(word: &str) -> TokenKind {
    if Opcode::from_mnemonic(word).is_some() {
        return TokenKind::Opcode;
    }

    let bytes = word.as_bytes();
    if bytes.len() == 2 && bytes[0] == b'R' && (b'0'..=b'7').contains(&bytes[1]) {
        return TokenKind::Register;
    }

    if let Some(tail) = word.strip_prefix('x') {
        if tail.bytes().all(|b| b.is_ascii_hexdigit()) {
            return TokenKind::Immediate;
        }
    }
    if let Some(tail) = word.strip_prefix('b') {
        if tail.bytes().all(|b| matches!(b, b'0' | b'1')) {
            return TokenKind::Immediate;
        }
    }

    TokenKind::Label
}

/// The lexer. Owns a cursor into the source and produces one [`Token`]
/// per [`Lexer::next_token`] call.
pub struct Lexer<'s> {
    inner: logos::Lexer<'s, Lexeme>,
}

impl<'s> Lexer<'s> {
    /// Creates a lexer over the given source.
    pub fn new(src: &'s str) -> Self {
        Lexer { inner: Lexeme::lexer(src) }
    }

    /// The source this lexer reads from.
    pub fn source(&self) -> &'s str {
        self.inner.source()
    }

    /// Produces the next token.
    ///
    /// Idempotent at the end of the source: every call from then on
    /// returns an [`TokenKind::End`] token with an empty span at
    /// `source.len()`.
    pub fn next_token(&mut self) -> Token {
        loop {
            let (kind, span) = match self.inner.next() {
                Some(Ok(Lexeme::Comment)) => continue,
                Some(Ok(lexeme)) => (self.classify(lexeme), self.inner.span()),
                Some(Err(_)) => (TokenKind::Unknown, self.inner.span()),
                None => {
                    let end = self.inner.source().len();
                    (TokenKind::End, end..end)
                }
            };
            return Token { kind, span };
        }
    }

    fn classify(&self, lexeme: Lexeme) -> TokenKind {
        match lexeme {
            Lexeme::Word => classify_word(self.inner.slice()),
            Lexeme::Dot => match Opcode::from_mnemonic(self.inner.slice()) {
                Some(_) => TokenKind::Pseudo,
                None => TokenKind::Unknown,
            },
            Lexeme::Immediate => TokenKind::Immediate,
            Lexeme::Number => TokenKind::Number,
            Lexeme::Str => TokenKind::String,
            Lexeme::Comma => TokenKind::Comma,
            Lexeme::Eol => TokenKind::Eol,
            Lexeme::Comment => unreachable!("comments are skipped before classification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, Token, TokenKind};

    /// Collects (kind, lexeme) pairs up to and excluding the End token.
    fn tokens<'s>(src: &'s str) -> Vec<(TokenKind, &'s str)> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::End {
                return out;
            }
            out.push((token.kind, token.lexeme(src)));
        }
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut lexer = Lexer::new("");
        for _ in 0..4 {
            assert_eq!(lexer.next_token(), Token { kind: TokenKind::End, span: 0..0 });
        }

        // Trailing whitespace is invisible; the End span sits at the very end.
        let mut lexer = Lexer::new(" ");
        for _ in 0..4 {
            assert_eq!(lexer.next_token(), Token { kind: TokenKind::End, span: 1..1 });
        }
    }

    #[test]
    fn test_eol_and_whitespace() {
        let src = "\n\n \n \n ";
        let mut lexer = Lexer::new(src);
        assert_eq!(lexer.next_token(), Token { kind: TokenKind::Eol, span: 0..1 });
        assert_eq!(lexer.next_token(), Token { kind: TokenKind::Eol, span: 1..2 });
        assert_eq!(lexer.next_token(), Token { kind: TokenKind::Eol, span: 3..4 });
        assert_eq!(lexer.next_token(), Token { kind: TokenKind::Eol, span: 5..6 });
        assert_eq!(lexer.next_token(), Token { kind: TokenKind::End, span: 7..7 });

        // CR, FF, and VT are whitespace too; only `\n` makes a token.
        assert_eq!(tokens("\r \t\x0B\x0C"), vec![]);
        assert_eq!(tokens("a\r\nb"), vec![
            (TokenKind::Label, "a"),
            (TokenKind::Eol, "\n"),
            (TokenKind::Label, "b"),
        ]);
    }

    #[test]
    fn test_comments() {
        let mut lexer = Lexer::new("; Hello world!");
        assert_eq!(lexer.next_token(), Token { kind: TokenKind::End, span: 14..14 });

        // The newline ending a comment still produces its EOL.
        let src = " \n ; Hello world!\n ";
        let mut lexer = Lexer::new(src);
        assert_eq!(lexer.next_token(), Token { kind: TokenKind::Eol, span: 1..2 });
        assert_eq!(lexer.next_token(), Token { kind: TokenKind::Eol, span: 17..18 });
        assert_eq!(lexer.next_token(), Token { kind: TokenKind::End, span: 19..19 });
    }

    #[test]
    fn test_opcodes() {
        let src = "ADD AND BR BRn BRz BRp BRzp BRnp BRnz BRnzp JMP JSR JSRR LD LDI LDR LEA \
                   NOT RET RTI ST STI STR TRAP GETC OUT PUTS IN PUTSP HALT";
        for (kind, lexeme) in tokens(src) {
            assert_eq!(kind, TokenKind::Opcode, "expected {lexeme} to be an opcode");
        }
    }

    #[test]
    fn test_opcodes_are_case_sensitive() {
        assert_eq!(tokens("add"), vec![(TokenKind::Label, "add")]);
        assert_eq!(tokens("Add"), vec![(TokenKind::Label, "Add")]);
        assert_eq!(tokens("halt"), vec![(TokenKind::Label, "halt")]);
        assert_eq!(tokens("BRN"), vec![(TokenKind::Label, "BRN")]);
        // A longer run containing a mnemonic is still one label.
        assert_eq!(tokens("ADD1"), vec![(TokenKind::Label, "ADD1")]);
    }

    #[test]
    fn test_pseudos() {
        assert_eq!(tokens(".ORIG .FILL .BLKW .STRINGZ .END"), vec![
            (TokenKind::Pseudo, ".ORIG"),
            (TokenKind::Pseudo, ".FILL"),
            (TokenKind::Pseudo, ".BLKW"),
            (TokenKind::Pseudo, ".STRINGZ"),
            (TokenKind::Pseudo, ".END"),
        ]);

        // Anything else behind a dot is a single Unknown token.
        assert_eq!(tokens(".orig"), vec![(TokenKind::Unknown, ".orig")]);
        assert_eq!(tokens(".End"), vec![(TokenKind::Unknown, ".End")]);
        assert_eq!(tokens(".ORIGIN"), vec![(TokenKind::Unknown, ".ORIGIN")]);
        assert_eq!(tokens("."), vec![(TokenKind::Unknown, ".")]);
    }

    #[test]
    fn test_registers() {
        assert_eq!(tokens("R0 R1 R2 R3 R4 R5 R6 R7"), vec![
            (TokenKind::Register, "R0"),
            (TokenKind::Register, "R1"),
            (TokenKind::Register, "R2"),
            (TokenKind::Register, "R3"),
            (TokenKind::Register, "R4"),
            (TokenKind::Register, "R5"),
            (TokenKind::Register, "R6"),
            (TokenKind::Register, "R7"),
        ]);

        // Out-of-range or longer names are labels.
        assert_eq!(tokens("R8"), vec![(TokenKind::Label, "R8")]);
        assert_eq!(tokens("R10"), vec![(TokenKind::Label, "R10")]);
        assert_eq!(tokens("R2D2"), vec![(TokenKind::Label, "R2D2")]);
        assert_eq!(tokens("r0"), vec![(TokenKind::Label, "r0")]);
    }

    #[test]
    fn test_immediates() {
        assert_eq!(tokens("#0 #-12 #+4 x3000 xAbC b101"), vec![
            (TokenKind::Immediate, "#0"),
            (TokenKind::Immediate, "#-12"),
            (TokenKind::Immediate, "#+4"),
            (TokenKind::Immediate, "x3000"),
            (TokenKind::Immediate, "xAbC"),
            (TokenKind::Immediate, "b101"),
        ]);

        // Prefix-only immediates lex fine; operand construction rejects them.
        assert_eq!(tokens("# #- x b"), vec![
            (TokenKind::Immediate, "#"),
            (TokenKind::Immediate, "#-"),
            (TokenKind::Immediate, "x"),
            (TokenKind::Immediate, "b"),
        ]);

        // The `x`/`b` classes are case-sensitive and digit-strict.
        assert_eq!(tokens("X1234"), vec![(TokenKind::Label, "X1234")]);
        assert_eq!(tokens("xG"), vec![(TokenKind::Label, "xG")]);
        assert_eq!(tokens("b102"), vec![(TokenKind::Label, "b102")]);
        assert_eq!(tokens("B101"), vec![(TokenKind::Label, "B101")]);

        // A sign stops the alphanumeric run, so `x-5` is two tokens.
        assert_eq!(tokens("x-5"), vec![
            (TokenKind::Immediate, "x"),
            (TokenKind::Number, "-5"),
        ]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("123 +5 -7 + -"), vec![
            (TokenKind::Number, "123"),
            (TokenKind::Number, "+5"),
            (TokenKind::Number, "-7"),
            (TokenKind::Number, "+"),
            (TokenKind::Number, "-"),
        ]);

        // Digits stop at the first non-digit.
        assert_eq!(tokens("3D5"), vec![
            (TokenKind::Number, "3"),
            (TokenKind::Label, "D5"),
        ]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(tokens(r#""Hello""#), vec![(TokenKind::String, r#""Hello""#)]);
        assert_eq!(tokens(r#""""#), vec![(TokenKind::String, r#""""#)]);
        assert_eq!(tokens(r#""a b, c;d""#), vec![(TokenKind::String, r#""a b, c;d""#)]);

        // An unterminated literal stops before the newline and keeps no
        // closing quote, which operand construction flags later.
        assert_eq!(tokens("\"oops\nx"), vec![
            (TokenKind::String, "\"oops"),
            (TokenKind::Eol, "\n"),
            (TokenKind::Immediate, "x"),
        ]);
        assert_eq!(tokens("\"oops"), vec![(TokenKind::String, "\"oops")]);
        assert_eq!(tokens("\""), vec![(TokenKind::String, "\"")]);
    }

    #[test]
    fn test_commas_and_unknown() {
        assert_eq!(tokens("R0,R1 , R2"), vec![
            (TokenKind::Register, "R0"),
            (TokenKind::Comma, ","),
            (TokenKind::Register, "R1"),
            (TokenKind::Comma, ","),
            (TokenKind::Register, "R2"),
        ]);

        let toks = tokens("@");
        assert_eq!(toks, vec![(TokenKind::Unknown, "@")]);
    }

    #[test]
    fn test_instruction_line() {
        // The worked example from the token docs.
        assert_eq!(tokens("LOOP AND R3, R3, #0,  ; Clear R3\n"), vec![
            (TokenKind::Label, "LOOP"),
            (TokenKind::Opcode, "AND"),
            (TokenKind::Register, "R3"),
            (TokenKind::Comma, ","),
            (TokenKind::Register, "R3"),
            (TokenKind::Comma, ","),
            (TokenKind::Immediate, "#0"),
            (TokenKind::Comma, ","),
            (TokenKind::Eol, "\n"),
        ]);
    }

    #[test]
    fn test_spans_cover_the_source() {
        let src = "LOOP ADD R1, R1, #-1 ; decrement\n.END";
        let mut lexer = Lexer::new(src);
        let mut last_end = 0;
        loop {
            let token = lexer.next_token();
            assert!(token.span.start <= token.span.end);
            assert!(token.span.end <= src.len());
            // Tokens appear in source order without overlap.
            assert!(token.span.start >= last_end);
            last_end = token.span.end;
            if token.kind == TokenKind::End {
                break;
            }
        }
    }

    #[test]
    fn test_display_content_escapes() {
        let src = "\n";
        let mut lexer = Lexer::new(src);
        let token = lexer.next_token();
        assert_eq!(token.display_content(src), "\\n");
    }

    #[test]
    fn test_lexing_is_deterministic() {
        let src = "LOOP ADD R1, R1, #-1\nBRp LOOP\n.END\n";
        assert_eq!(tokens(src), tokens(src));
    }
}
