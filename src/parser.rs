//! Recursive descent parser for the tacc language.
//!
//! There is no syntax tree: semantic checks and three-address code emission
//! happen while productions are recognized. Every expression production
//! returns the `Operand` holding its result so callers can chain it.
//!
//! The grammar is :
//! ```text
//! statement   := declaration | assignment | ifStmt | whileStmt | forStmt
//!              | returnStmt | block
//! declaration := "int" identifier ( "[" number "]" | "=" expression )? ";"
//! assignment  := identifier ( "[" expression "]" )? "=" expression ";"
//! ifStmt      := "if" "(" expression ")" statement ( "else" statement )?
//! whileStmt   := "while" "(" expression ")" statement
//! forStmt     := "for" "(" ( declaration | assignment ) expression ";"
//!                assignment-without-";" ")" statement
//! returnStmt  := "return" expression ";"
//! block       := "{" statement* "}"
//! expression  := term ( ( "+" | "-" ) term )* ( relop expression )?
//! term        := factor ( ( "*" | "/" ) factor )*
//! factor      := number | identifier ( "[" expression "]" )? | "(" expression ")"
//! ```
use thiserror::Error;

use crate::ir::{ArraySize, BinaryOp, Instruction, IntermediateCodeGenerator, Location, Value};
use crate::sema::{SemanticError, Symbol, SymbolTable, Type};
use crate::token::{Token, TokenKind};

/// Raised when the token stream does not match the expected production.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error: expected {expected}, found {found} at line {line}")]
pub struct SyntaxError {
    pub expected: String,
    pub found: String,
    pub line: usize,
}

/// Errors returned by `Parser::parse`, the first error aborts parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

/// Result of an expression production: the value holding the result and,
/// when it can be computed at compile time, its known value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Operand {
    value: Value,
    known: Option<i32>,
}

/// Parser implements a recursive descent parser driving semantic checks and
/// code emission.
pub struct Parser {
    // Input tokens to process.
    tokens: Vec<Token>,
    // Cursor in the tokens list.
    cursor: usize,
    symbols: SymbolTable,
    icg: IntermediateCodeGenerator,
}

impl Parser {
    /// Returns a new `Parser` instance by creating an owned version `tokens`,
    /// an `Eof` token is appended if the list doesn't end with one.
    #[must_use]
    pub fn new(tokens: &[Token]) -> Self {
        let mut tokens = tokens.to_owned();
        if tokens.last().map(Token::kind) != Some(TokenKind::Eof) {
            let line = tokens.last().map_or(1, Token::line);
            tokens.push(Token::new(TokenKind::Eof, "", line));
        }
        Self {
            tokens,
            cursor: 0usize,
            symbols: SymbolTable::new(),
            icg: IntermediateCodeGenerator::new(),
        }
    }

    /// Return a reference to the symbol table.
    #[must_use]
    pub const fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Return a view of the instructions emitted so far.
    #[must_use]
    pub fn code(&self) -> &[Instruction] {
        self.icg.code()
    }

    /// Consume the parser returning the emitted instructions.
    #[must_use]
    pub fn into_code(self) -> Vec<Instruction> {
        self.icg.into_code()
    }

    /// Parse the whole token list.
    /// # Errors
    /// Returns the first syntax or semantic error encountered.
    pub fn parse(&mut self) -> Result<(), ParseError> {
        while !self.eof() {
            self.statement()?;
        }
        Ok(())
    }

    /// Parse a statement.
    fn statement(&mut self) -> Result<(), ParseError> {
        match self.peek().kind() {
            TokenKind::Int => self.declaration(),
            TokenKind::Identifier => self.assignment(true),
            TokenKind::If => self.if_stmt(),
            TokenKind::While => self.while_stmt(),
            TokenKind::For => self.for_stmt(),
            TokenKind::Return => self.return_stmt(),
            TokenKind::LBrace => self.block(),
            _ => Err(self.unexpected("a statement").into()),
        }
    }

    /// Parse a scalar or array declaration.
    fn declaration(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Int)?;
        let ident = self.expect(TokenKind::Identifier)?;

        match self.peek().kind() {
            // Array declaration.
            TokenKind::LBracket => {
                self.advance();
                let literal = self.expect(TokenKind::IntLiteral)?;
                self.expect(TokenKind::RBracket)?;
                self.expect(TokenKind::SemiColon)?;
                // Sizes must be positive and their storage must fit an `i32`.
                let size = match literal.lexeme().parse::<u32>().ok().and_then(ArraySize::new) {
                    Some(array_size) => array_size,
                    None => {
                        return Err(SemanticError::InvalidArraySize {
                            name: ident.lexeme().to_string(),
                            lexeme: literal.lexeme().to_string(),
                            line: literal.line(),
                        }
                        .into())
                    }
                };
                let symbol =
                    self.symbols
                        .declare(ident.lexeme(), Type::IntArray(size.count()), ident.line())?;
                let inst = Instruction::ArrayDecl(symbol.storage().to_string(), size);
                self.icg.emit(inst);
            }
            // Declaration with an initializer, the initializer is evaluated
            // before the name is in scope.
            TokenKind::Equal => {
                self.advance();
                let value = self.expression()?;
                self.expect(TokenKind::SemiColon)?;
                let symbol = self
                    .symbols
                    .declare(ident.lexeme(), Type::Int, ident.line())?;
                let dst = Location::Named(symbol.storage().to_string());
                self.icg.emit(Instruction::Assign(dst, value.value));
            }
            _ => {
                self.expect(TokenKind::SemiColon)?;
                self.symbols
                    .declare(ident.lexeme(), Type::Int, ident.line())?;
            }
        }
        Ok(())
    }

    /// Parse an assignment to a variable or an array element, `terminated`
    /// controls whether a trailing semicolon is expected.
    fn assignment(&mut self, terminated: bool) -> Result<(), ParseError> {
        let ident = self.expect(TokenKind::Identifier)?;
        let symbol = self.resolve(&ident)?;

        if self.eat(TokenKind::LBracket).is_some() {
            Self::array(&symbol, &ident)?;
            let index = self.expression()?;
            self.expect(TokenKind::RBracket)?;
            self.expect(TokenKind::Equal)?;
            let value = self.expression()?;
            self.icg.emit(Instruction::ArrayStore(
                symbol.storage().to_string(),
                index.value,
                value.value,
            ));
        } else {
            Self::scalar(&symbol, &ident)?;
            self.expect(TokenKind::Equal)?;
            let value = self.expression()?;
            let dst = Location::Named(symbol.storage().to_string());
            self.icg.emit(Instruction::Assign(dst, value.value));
        }

        if terminated {
            self.expect(TokenKind::SemiColon)?;
        }
        Ok(())
    }

    /// Parse an if statement.
    fn if_stmt(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.expression()?;
        self.expect(TokenKind::RParen)?;

        let then_label = self.icg.new_label();
        let else_label = self.icg.new_label();
        self.icg.emit(Instruction::Branch(condition.value, then_label));
        self.icg.emit(Instruction::Jump(else_label));
        self.icg.emit(Instruction::Label(then_label));
        self.scoped_statement()?;

        if self.eat(TokenKind::Else).is_some() {
            let end_label = self.icg.new_label();
            self.icg.emit(Instruction::Jump(end_label));
            self.icg.emit(Instruction::Label(else_label));
            self.scoped_statement()?;
            self.icg.emit(Instruction::Label(end_label));
        } else {
            self.icg.emit(Instruction::Label(else_label));
        }
        Ok(())
    }

    /// Parse a while loop, the condition is re-evaluated at the loop head on
    /// every iteration.
    fn while_stmt(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;

        let start_label = self.icg.new_label();
        let end_label = self.icg.new_label();
        self.icg.emit(Instruction::Label(start_label));
        let condition = self.expression()?;
        self.expect(TokenKind::RParen)?;
        self.icg.emit(Instruction::BranchIfFalse(condition.value, end_label));

        self.scoped_statement()?;
        self.icg.emit(Instruction::Jump(start_label));
        self.icg.emit(Instruction::Label(end_label));
        Ok(())
    }

    /// Parse a for loop.
    ///
    /// The update clause precedes the body in the source but must be emitted
    /// after it, so its tokens are skipped on the first pass and the cursor
    /// is rewound to them once the body has been parsed.
    fn for_stmt(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;
        // Variables declared in the initializer are local to the loop.
        self.symbols.enter_scope();

        match self.peek().kind() {
            TokenKind::Int => self.declaration()?,
            TokenKind::Identifier => self.assignment(true)?,
            _ => return Err(self.unexpected("an assignment").into()),
        }

        let start_label = self.icg.new_label();
        let end_label = self.icg.new_label();
        self.icg.emit(Instruction::Label(start_label));
        let condition = self.expression()?;
        self.expect(TokenKind::SemiColon)?;
        self.icg.emit(Instruction::BranchIfFalse(condition.value, end_label));

        let update = self.cursor;
        self.skip_to_closing_paren()?;
        self.expect(TokenKind::RParen)?;
        // The update is parsed once the body scope is closed, so it resolves
        // names the way it reads in the source.
        self.scoped_statement()?;

        let resume = self.cursor;
        self.cursor = update;
        self.assignment(false)?;
        self.expect(TokenKind::RParen)?;
        self.cursor = resume;

        self.icg.emit(Instruction::Jump(start_label));
        self.icg.emit(Instruction::Label(end_label));
        self.symbols.exit_scope();
        Ok(())
    }

    /// Parse the statement controlled by an `if`, `else`, `while` or `for`
    /// in its own scope, a bare declaration never outlives it.
    fn scoped_statement(&mut self) -> Result<(), ParseError> {
        self.symbols.enter_scope();
        self.statement()?;
        self.symbols.exit_scope();
        Ok(())
    }

    /// Parse a return statement.
    fn return_stmt(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::Return)?;
        let value = self.expression()?;
        self.expect(TokenKind::SemiColon)?;
        self.icg.emit(Instruction::Return(value.value));
        Ok(())
    }

    /// Parse a block, each block opens a new scope.
    fn block(&mut self) -> Result<(), ParseError> {
        self.expect(TokenKind::LBrace)?;
        self.symbols.enter_scope();
        while !self.at(TokenKind::RBrace) && !self.eof() {
            self.statement()?;
        }
        self.expect(TokenKind::RBrace)?;
        self.symbols.exit_scope();
        Ok(())
    }

    /// Parse an expression, additive operators are left associative and a
    /// single trailing comparison takes the rest of the expression as its
    /// right handside.
    fn expression(&mut self) -> Result<Operand, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let operator = match self.peek().kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.term()?;
            lhs = self.binary(operator, lhs, rhs);
        }

        let operator = match self.peek().kind() {
            TokenKind::Greater => BinaryOp::Gt,
            TokenKind::Lesser => BinaryOp::Lt,
            TokenKind::EqualEqual => BinaryOp::Eq,
            TokenKind::BangEqual => BinaryOp::Neq,
            TokenKind::GreaterEqual => BinaryOp::Gte,
            TokenKind::LesserEqual => BinaryOp::Lte,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.expression()?;
        Ok(self.binary(operator, lhs, rhs))
    }

    /// Parse a term, multiplicative operators are left associative.
    fn term(&mut self) -> Result<Operand, ParseError> {
        let mut lhs = self.factor()?;
        loop {
            let operator = match self.peek().kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let line = self.advance().line();
            let start = self.cursor;
            let rhs = self.factor()?;
            if operator == BinaryOp::Div && rhs.known == Some(0) {
                return Err(SemanticError::DivisionByZero {
                    lexeme: self.source_text(start, self.cursor),
                    line,
                }
                .into());
            }
            lhs = self.binary(operator, lhs, rhs);
        }
        Ok(lhs)
    }

    /// Parse a factor, integer literals are materialized into temporaries.
    fn factor(&mut self) -> Result<Operand, ParseError> {
        match self.peek().kind() {
            TokenKind::IntLiteral => {
                let literal = self.advance().clone();
                let value = literal.lexeme().parse::<i32>().map_err(|_| SyntaxError {
                    expected: "an integer literal".to_string(),
                    found: literal.to_string(),
                    line: literal.line(),
                })?;
                let dst = self.icg.new_temp();
                self.icg.emit(Instruction::Assign(
                    Location::Temp(dst),
                    Value::ConstantLiteral(value),
                ));
                Ok(Operand {
                    value: dst.into(),
                    known: Some(value),
                })
            }
            TokenKind::Identifier => {
                let ident = self.advance().clone();
                let symbol = self.resolve(&ident)?;
                if self.eat(TokenKind::LBracket).is_some() {
                    Self::array(&symbol, &ident)?;
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    let dst = self.icg.new_temp();
                    self.icg.emit(Instruction::ArrayLoad(
                        Location::Temp(dst),
                        symbol.storage().to_string(),
                        index.value,
                    ));
                    Ok(Operand {
                        value: dst.into(),
                        known: None,
                    })
                } else {
                    Self::scalar(&symbol, &ident)?;
                    Ok(Operand {
                        value: Value::named(symbol.storage()),
                        known: None,
                    })
                }
            }
            TokenKind::LParen => {
                self.advance();
                let operand = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(operand)
            }
            _ => Err(self.unexpected("an expression").into()),
        }
    }

    /// Emit a binary operation into a fresh temporary.
    fn binary(&mut self, operator: BinaryOp, lhs: Operand, rhs: Operand) -> Operand {
        let known = match (lhs.known, rhs.known) {
            (Some(lhs), Some(rhs)) => operator.evaluate(lhs, rhs),
            _ => None,
        };
        let dst = self.icg.new_temp();
        self.icg.emit(Instruction::BinOp(
            Location::Temp(dst),
            operator,
            lhs.value,
            rhs.value,
        ));
        Operand {
            value: dst.into(),
            known,
        }
    }

    /// Resolve an identifier token against the symbol table.
    fn resolve(&self, ident: &Token) -> Result<Symbol, SemanticError> {
        self.symbols
            .resolve(ident.lexeme(), ident.line())
            .cloned()
    }

    // Ensure the symbol can be indexed.
    fn array(symbol: &Symbol, ident: &Token) -> Result<(), SemanticError> {
        match symbol.t() {
            Type::IntArray(_) => Ok(()),
            Type::Int => Err(SemanticError::NotAnArray {
                name: ident.lexeme().to_string(),
                line: ident.line(),
            }),
        }
    }

    // Ensure the symbol can be used as a scalar.
    fn scalar(symbol: &Symbol, ident: &Token) -> Result<(), SemanticError> {
        match symbol.t() {
            Type::Int => Ok(()),
            Type::IntArray(_) => Err(SemanticError::NotAScalar {
                name: ident.lexeme().to_string(),
                line: ident.line(),
            }),
        }
    }

    /// Move the cursor to the `)` closing the current parenthesis without
    /// consuming it.
    fn skip_to_closing_paren(&mut self) -> Result<(), SyntaxError> {
        let mut depth = 0usize;
        loop {
            match self.peek().kind() {
                TokenKind::RParen if depth == 0 => return Ok(()),
                TokenKind::RParen => depth -= 1,
                TokenKind::LParen => depth += 1,
                TokenKind::Eof => return Err(self.unexpected("')'")),
                _ => (),
            }
            self.advance();
        }
    }

    /// Concatenated lexemes of the tokens in `start..end`.
    fn source_text(&self, start: usize, end: usize) -> String {
        self.tokens[start..end]
            .iter()
            .map(Token::lexeme)
            .collect::<String>()
    }

    /// Consume the current token if it is of the given kind, otherwise
    /// report a syntax error.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.at(kind) {
            return Ok(self.advance().clone());
        }
        Err(self.unexpected(&format!("'{kind}'")))
    }

    /// Match the current token against the given kind, if they match
    /// consume the token and return it. Otherwise returns `None`.
    fn eat(&mut self, kind: TokenKind) -> Option<&Token> {
        if self.at(kind) {
            return Some(self.advance());
        }
        None
    }

    /// Build a syntax error for the current token.
    fn unexpected(&self, expected: &str) -> SyntaxError {
        let found = self.peek();
        SyntaxError {
            expected: expected.to_string(),
            found: found.to_string(),
            line: found.line(),
        }
    }

    /// Check if the current token is of the expected kind.
    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind() == kind
    }

    /// Advance cursor and return previous token unless we reach `Eof`.
    fn advance(&mut self) -> &Token {
        if !self.eof() {
            self.cursor += 1;
        }
        self.prev()
    }

    /// Peek and return a reference to the next token without moving the cursor
    /// position.
    fn peek(&self) -> &Token {
        &self.tokens[self.cursor]
    }

    /// Return the previously consumed token.
    fn prev(&self) -> &Token {
        &self.tokens[self.cursor.saturating_sub(1)]
    }

    /// Returns true if the next token is `Eof`.
    fn eof(&self) -> bool {
        self.peek().kind() == TokenKind::Eof
    }
}
