//! Semantic analysis support.
//!
//! Checks run inline while parsing, this module only owns the symbol table
//! and the semantic error taxonomy. Scopes are numbered from `0` (global)
//! upwards and symbols are purged when their scope exits.
use std::fmt;

use thiserror::Error;

/// Declared types, `int` is the only scalar type of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    // Fixed size array of `int` elements.
    IntArray(u32),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::IntArray(size) => write!(f, "int[{size}]"),
        }
    }
}

/// Errors raised by semantic checks, each carries the offending name or
/// lexeme and its source line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("semantic error: variable '{name}' is already declared at line {line}")]
    AlreadyDeclared { name: String, line: usize },
    #[error("semantic error: variable '{name}' is not declared at line {line}")]
    Undeclared { name: String, line: usize },
    #[error("semantic error: division by constant zero '{lexeme}' at line {line}")]
    DivisionByZero { lexeme: String, line: usize },
    #[error("semantic error: variable '{name}' is not an array at line {line}")]
    NotAnArray { name: String, line: usize },
    #[error("semantic error: array '{name}' used as a scalar at line {line}")]
    NotAScalar { name: String, line: usize },
    #[error("semantic error: invalid size '{lexeme}' for array '{name}' at line {line}")]
    InvalidArraySize {
        name: String,
        lexeme: String,
        line: usize,
    },
}

/// A declared identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    name: String,
    t: Type,
    scope: usize,
    // Name used for the symbol in the generated code, differs from `name`
    // only when the declaration shadows a symbol of an enclosing scope.
    storage: String,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn t(&self) -> Type {
        self.t
    }

    pub fn scope(&self) -> usize {
        self.scope
    }

    /// Returns the storage location name used in three-address code.
    pub fn storage(&self) -> &str {
        &self.storage
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} @{}", self.storage, self.t, self.scope)
    }
}

/// `SymbolTable` tracks declared identifiers, symbols are kept in
/// declaration order so lookups walk it backwards to find the innermost
/// visible declaration.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scope: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scope level, `0` is the global scope.
    pub fn scope(&self) -> usize {
        self.scope
    }

    /// Enter a new lexical scope.
    pub fn enter_scope(&mut self) {
        self.scope += 1;
    }

    /// Exit the current scope, purging every symbol it declared. Exiting the
    /// global scope does nothing.
    pub fn exit_scope(&mut self) {
        if self.scope == 0 {
            return;
        }
        let scope = self.scope;
        self.symbols.retain(|symbol| symbol.scope != scope);
        self.scope -= 1;
    }

    /// Declare `name` in the current scope.
    /// # Errors
    /// Returns `AlreadyDeclared` if `name` exists in the current scope.
    pub fn declare(&mut self, name: &str, t: Type, line: usize) -> Result<&Symbol, SemanticError> {
        let storage = match self.lookup(name) {
            Some(symbol) if symbol.scope == self.scope => {
                return Err(SemanticError::AlreadyDeclared {
                    name: name.to_string(),
                    line,
                })
            }
            Some(_) => format!("{name}.{}", self.scope),
            None => name.to_string(),
        };
        self.symbols.push(Symbol {
            name: name.to_string(),
            t,
            scope: self.scope,
            storage,
        });
        let index = self.symbols.len() - 1;
        Ok(&self.symbols[index])
    }

    /// Resolve `name` to its innermost visible declaration.
    /// # Errors
    /// Returns `Undeclared` when no visible declaration exists.
    pub fn resolve(&self, name: &str, line: usize) -> Result<&Symbol, SemanticError> {
        self.lookup(name).ok_or_else(|| SemanticError::Undeclared {
            name: name.to_string(),
            line,
        })
    }

    /// Returns the declared type of `name`.
    /// # Errors
    /// Returns `Undeclared` when no visible declaration exists.
    pub fn type_of(&self, name: &str, line: usize) -> Result<Type, SemanticError> {
        self.resolve(name, line).map(Symbol::t)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Returns the visible symbols, outermost first.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().rev().find(|symbol| symbol.name == name)
    }
}
