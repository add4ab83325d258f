//! The command-line front end: file I/O, flag handling, and diagnostic
//! rendering around the `lc3_assembler` library.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_print::ceprintln;

use lc3_assembler::asm::assemble;
use lc3_assembler::err::{Diagnostic, DiagnosticSink};
use lc3_assembler::parse::lex::{Lexer, TokenKind};
use lc3_assembler::parse::parse_instructions;

#[derive(Parser, Debug)]
#[command(name = "lc3-assembler", version, about = "Assembler for the LC-3 educational ISA")]
struct Args {
    /// Path to the input assembly file
    input: PathBuf,

    /// Path to the output file (defaults to standard output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print all tokens produced by the lexer and stop
    #[arg(short, long)]
    tokens: bool,

    /// Print all parsed instructions and stop
    #[arg(short = 'I', long)]
    instructions: bool,
}

/// Renders diagnostics to stderr as they are reported.
struct StderrReporter;

impl DiagnosticSink for StderrReporter {
    fn report(&mut self, diagnostic: Diagnostic) {
        ceprintln!("<red,bold>error</>: {}", diagnostic);
        if let Some(help) = diagnostic.help() {
            ceprintln!("<green,bold>help</>: {}", help);
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            ceprintln!("<red,bold>error</>: cannot open file '{}': {}", args.input.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => match fs::File::create(path) {
            Ok(file) => Box::new(file),
            Err(err) => {
                ceprintln!("<red,bold>error</>: cannot open file '{}': {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(io::stdout().lock()),
    };

    match run(&args, &source, &mut out) {
        Ok(code) => code,
        Err(err) => {
            ceprintln!("<red,bold>error</>: cannot write output: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, source: &str, out: &mut dyn Write) -> io::Result<ExitCode> {
    if args.tokens {
        let mut lexer = Lexer::new(source);
        loop {
            let token = lexer.next_token();
            writeln!(out, "Token {{ {}, '{}' }}", token.kind, token.display_content(source))?;
            if token.kind == TokenKind::End {
                return Ok(ExitCode::SUCCESS);
            }
        }
    }

    let mut reporter = StderrReporter;
    let instructions = parse_instructions(source, &mut reporter);
    if instructions.len() == 1 && instructions[0].is_unknown() {
        return Ok(ExitCode::FAILURE);
    }

    if args.instructions {
        for instruction in &instructions {
            writeln!(out, "{instruction}")?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(words) = assemble(instructions, &mut reporter) else {
        return Ok(ExitCode::FAILURE);
    };

    for (address, word) in words {
        writeln!(out, "({address:X}) {word:016b}")?;
    }
    Ok(ExitCode::SUCCESS)
}
