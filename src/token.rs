//! Implementation of language tokens.
use std::fmt::{self};

/// Language defined keywords and their token kinds.
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("int", TokenKind::Int),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("for", TokenKind::For),
    ("return", TokenKind::Return),
];

/// The kind of a token, the lexeme itself is carried by `Token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords.
    Int,
    If,
    Else,
    While,
    For,
    Return,
    Identifier,
    IntLiteral,
    // Arithmetic operators.
    Plus,
    Minus,
    Star,
    Slash,
    // Comparison operators.
    Greater,
    Lesser,
    EqualEqual,
    BangEqual,
    GreaterEqual,
    LesserEqual,
    Equal,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    SemiColon,
    // Eof token used to signal the end of file.
    Eof,
}

impl TokenKind {
    /// Returns the keyword kind matching `word`, if any.
    pub fn keyword(word: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(keyword, _)| *keyword == word)
            .map(|(_, kind)| *kind)
    }
}

/// Displays the kind the way a diagnostic refers to it.
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::If => write!(f, "if"),
            Self::Else => write!(f, "else"),
            Self::While => write!(f, "while"),
            Self::For => write!(f, "for"),
            Self::Return => write!(f, "return"),
            Self::Identifier => write!(f, "identifier"),
            Self::IntLiteral => write!(f, "number"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Greater => write!(f, ">"),
            Self::Lesser => write!(f, "<"),
            Self::EqualEqual => write!(f, "=="),
            Self::BangEqual => write!(f, "!="),
            Self::GreaterEqual => write!(f, ">="),
            Self::LesserEqual => write!(f, "<="),
            Self::Equal => write!(f, "="),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::LBrace => write!(f, "{{"),
            Self::RBrace => write!(f, "}}"),
            Self::LBracket => write!(f, "["),
            Self::RBracket => write!(f, "]"),
            Self::SemiColon => write!(f, ";"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// Token represents the individual language tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    lexeme: String,
    line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: &str, line: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.to_string(),
            line,
        }
    }

    pub const fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Returns the source text the token was scanned from, empty for `Eof`.
    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }

    pub const fn line(&self) -> usize {
        self.line
    }
}

/// Implementing display trait for tokens, used when reporting the token found
/// in place of an expected one.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Identifier => write!(f, "IDENT({})", self.lexeme),
            TokenKind::IntLiteral => write!(f, "INT({})", self.lexeme),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}
