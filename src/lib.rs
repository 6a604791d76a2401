//! tacc compiles a small C-like language down to three-address code and a
//! simplified register machine assembly.
//!
//! The pipeline runs `Scanner` -> `Parser` (semantic checks and TAC emission
//! happen inline) -> `AssemblyCodeGenerator`. Each call to [`compile`] owns
//! fresh state for every stage.
pub mod codegen;
pub mod ir;
pub mod parser;
pub mod scanner;
pub mod sema;
pub mod token;

use thiserror::Error;

use crate::codegen::{AsmInstruction, AssemblyCodeGenerator, RegisterAllocator};
use crate::ir::Instruction;
use crate::parser::{ParseError, Parser};
use crate::scanner::{ScanError, Scanner};
use crate::sema::Symbol;
use crate::token::Token;

/// First error raised by the pipeline, compilation stops at the first
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Output of a successful compilation.
#[derive(Debug, Clone)]
pub struct Compilation {
    tokens: Vec<Token>,
    // Global symbols left in the table once parsing completes.
    symbols: Vec<Symbol>,
    tac: Vec<Instruction>,
    asm: Vec<AsmInstruction>,
    registers: RegisterAllocator,
}

impl Compilation {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Returns the three-address code in emission order.
    pub fn tac(&self) -> &[Instruction] {
        &self.tac
    }

    /// Returns the lowered assembly.
    pub fn asm(&self) -> &[AsmInstruction] {
        &self.asm
    }

    /// Returns the register assigned to every TAC name.
    pub const fn registers(&self) -> &RegisterAllocator {
        &self.registers
    }

    /// Renders the TAC one instruction per line.
    pub fn tac_listing(&self) -> String {
        listing(&self.tac)
    }

    /// Renders the assembly one instruction per line.
    pub fn asm_listing(&self) -> String {
        listing(&self.asm)
    }
}

fn listing<T: std::fmt::Display>(code: &[T]) -> String {
    code.iter().map(|inst| format!("{inst}\n")).collect()
}

/// Compile `source` returning its TAC and assembly.
/// # Errors
/// Returns the first lexical, syntax or semantic error.
pub fn compile(source: &str) -> Result<Compilation, CompileError> {
    let tokens = Scanner::new(source).scan()?;
    let mut parser = Parser::new(&tokens);
    parser.parse()?;
    let symbols = parser.symbols().symbols().to_vec();
    let tac = parser.into_code();
    let mut generator = AssemblyCodeGenerator::new(&tac);
    generator.gen();
    let (asm, registers) = generator.finish();
    Ok(Compilation {
        tokens,
        symbols,
        tac,
        asm,
        registers,
    })
}
