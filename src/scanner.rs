//! Lexical analysis module responsible for building tokens out of source
//! code.
use crate::token::{Token, TokenKind};
use thiserror::Error;

/// Scanner is responsible for building a list tokens out of a `String`.
///
/// Lexemes are copied into the tokens so the token list can outlive the
/// source buffer.
pub struct Scanner {
    // Starting position of the token we are currently processing.
    start: usize,
    // Walking cursor used to walk and process tokens.
    cursor: usize,
    // Line in the input we're currently processing, incremented
    // on newlines.
    line: usize,
    // Vec of individual chars of the input.
    source: Vec<char>,
}

/// Scanner error type is used to report scanning errors to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("lexical error: unexpected character '{character}' at line {line}")]
    UnexpectedCharacter { character: char, line: usize },
    #[error("lexical error: unterminated comment starting at line {line}")]
    UnterminatedComment { line: usize },
    #[error("lexical error: integer literal '{lexeme}' out of range at line {line}")]
    IntegerOverflow { lexeme: String, line: usize },
}

impl Scanner {
    /// Creates a new lexer instance from a given `source` string.
    pub fn new(source: &str) -> Self {
        Self {
            start: 0,
            cursor: 0,
            line: 1,
            source: source.chars().collect(),
        }
    }

    /// Lex the passed source code and returns a list of tokens terminated by
    /// exactly one `Eof` token.
    /// # Errors
    /// Returns an error when it encounters an unknown character, an
    /// unterminated block comment or an out of range integer literal.
    pub fn scan(&mut self) -> Result<Vec<Token>, ScanError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.next() {
            // Grab the first lexeme as we will need to used it to scan
            // multi-character tokens such as identifiers and numbers.
            self.start = self.cursor - 1;
            let kind = match ch {
                '!' if self.consume('=') => TokenKind::BangEqual,
                '=' if self.consume('=') => TokenKind::EqualEqual,
                '>' if self.consume('=') => TokenKind::GreaterEqual,
                '<' if self.consume('=') => TokenKind::LesserEqual,
                '/' if self.consume('/') => {
                    self.line_comment();
                    continue;
                }
                '/' if self.consume('*') => {
                    self.block_comment()?;
                    continue;
                }
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ';' => TokenKind::SemiColon,
                '<' => TokenKind::Lesser,
                '>' => TokenKind::Greater,
                '=' => TokenKind::Equal,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '0'..='9' => self.integer()?,
                'a'..='z' | 'A'..='Z' => self.identifier(),
                // Do nothing on whitespace.
                ' ' | '\r' | '\t' => continue,
                // Increment line number on newlines.
                '\n' => {
                    self.line += 1;
                    continue;
                }
                _ => {
                    return Err(ScanError::UnexpectedCharacter {
                        character: ch,
                        line: self.line,
                    })
                }
            };
            tokens.push(Token::new(kind, &self.lexeme(), self.line));
        }
        tokens.push(Token::new(TokenKind::Eof, "", self.line));
        Ok(tokens)
    }

    // Return next char and increment cursor position.
    fn next(&mut self) -> Option<char> {
        if !self.eof() {
            self.cursor += 1;
            return Some(self.source[self.cursor - 1]);
        }
        None
    }

    // Match current character, advancing the cursor if we match `expected`.
    fn consume(&mut self, expected: char) -> bool {
        if self.eof() || self.source[self.cursor] != expected {
            return false;
        }
        self.cursor += 1;
        true
    }

    // Peek next character without advancing the cursor
    fn peek(&self) -> char {
        if self.eof() {
            return '\0';
        }
        self.source[self.cursor]
    }

    // Consume a `//` comment, the newline is left for the main loop.
    fn line_comment(&mut self) {
        while self.peek() != '\n' && !self.eof() {
            self.next();
        }
    }

    // Consume a `/* */` comment, the opening delimiter is already consumed.
    fn block_comment(&mut self) -> Result<(), ScanError> {
        let opened_at = self.line;
        while let Some(ch) = self.next() {
            match ch {
                '*' if self.consume('/') => return Ok(()),
                '\n' => self.line += 1,
                _ => (),
            }
        }
        Err(ScanError::UnterminatedComment { line: opened_at })
    }

    // Source text of the token being scanned.
    fn lexeme(&self) -> String {
        self.source[self.start..self.cursor].iter().collect()
    }

    // Scan integer literal.
    fn integer(&mut self) -> Result<TokenKind, ScanError> {
        while self.peek().is_ascii_digit() {
            self.next();
        }

        let lexeme = self.lexeme();
        match lexeme.parse::<i32>() {
            Ok(_) => Ok(TokenKind::IntLiteral),
            Err(_) => Err(ScanError::IntegerOverflow {
                lexeme,
                line: self.line,
            }),
        }
    }

    // Scan identifiers, keywords are identifiers that match an entry in
    // `KEYWORDS` once the maximal run has been consumed.
    fn identifier(&mut self) -> TokenKind {
        while self.peek().is_ascii_alphanumeric() {
            self.next();
        }

        TokenKind::keyword(&self.lexeme()).unwrap_or(TokenKind::Identifier)
    }

    // Check if we reached the end of the source.
    fn eof(&self) -> bool {
        self.cursor >= self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::scanner::{ScanError, Scanner};
    use crate::token::TokenKind;

    // Macro to generate test cases.
    macro_rules! test_scanner {
        ($name:ident, $source:expr, $expected:expr) => {
            #[test]
            fn $name() {
                let source = $source;
                let mut scanner = Scanner::new(source);
                let tokens = scanner.scan().unwrap();
                let kinds = tokens.iter().map(|t| t.kind()).collect::<Vec<_>>();
                assert_eq!(&kinds, $expected);
            }
        };
    }

    test_scanner!(
        can_scan_return_statements,
        "return 0;",
        &vec![
            TokenKind::Return,
            TokenKind::IntLiteral,
            TokenKind::SemiColon,
            TokenKind::Eof
        ]
    );

    test_scanner!(
        can_scan_declarations_with_initializer,
        "int x = 42;",
        &vec![
            TokenKind::Int,
            TokenKind::Identifier,
            TokenKind::Equal,
            TokenKind::IntLiteral,
            TokenKind::SemiColon,
            TokenKind::Eof
        ]
    );

    test_scanner!(
        can_scan_two_character_operators,
        "a == b != c <= d >= e < f > g = h",
        &vec![
            TokenKind::Identifier,
            TokenKind::EqualEqual,
            TokenKind::Identifier,
            TokenKind::BangEqual,
            TokenKind::Identifier,
            TokenKind::LesserEqual,
            TokenKind::Identifier,
            TokenKind::GreaterEqual,
            TokenKind::Identifier,
            TokenKind::Lesser,
            TokenKind::Identifier,
            TokenKind::Greater,
            TokenKind::Identifier,
            TokenKind::Equal,
            TokenKind::Identifier,
            TokenKind::Eof
        ]
    );

    test_scanner!(
        can_skip_comments,
        "// leading comment\nx /* inline */ = 1; // trailing",
        &vec![
            TokenKind::Identifier,
            TokenKind::Equal,
            TokenKind::IntLiteral,
            TokenKind::SemiColon,
            TokenKind::Eof
        ]
    );

    test_scanner!(
        keywords_need_an_exact_match,
        "iffy while1 for",
        &vec![
            TokenKind::Identifier,
            TokenKind::Identifier,
            TokenKind::For,
            TokenKind::Eof
        ]
    );

    test_scanner!(
        can_scan_array_access,
        "a[i] = a[2] / 3;",
        &vec![
            TokenKind::Identifier,
            TokenKind::LBracket,
            TokenKind::Identifier,
            TokenKind::RBracket,
            TokenKind::Equal,
            TokenKind::Identifier,
            TokenKind::LBracket,
            TokenKind::IntLiteral,
            TokenKind::RBracket,
            TokenKind::Slash,
            TokenKind::IntLiteral,
            TokenKind::SemiColon,
            TokenKind::Eof
        ]
    );

    test_scanner!(empty_source_is_a_single_eof, "  \n\t ", &vec![TokenKind::Eof]);

    #[test]
    fn maximal_munch_keeps_lexemes() {
        let tokens = Scanner::new("count12 = 1234;").scan().unwrap();
        assert_eq!(tokens[0].lexeme(), "count12");
        assert_eq!(tokens[2].lexeme(), "1234");
    }

    #[test]
    fn tracks_line_numbers() {
        let tokens = Scanner::new("int x;\n/* two\nlines */\nx = 1;")
            .scan()
            .unwrap();
        let lines = tokens.iter().map(|t| t.line()).collect::<Vec<_>>();
        assert_eq!(lines, vec![1, 1, 1, 4, 4, 4, 4, 4]);
    }

    #[test]
    fn only_the_last_token_is_eof() {
        let tokens = Scanner::new("int x; if (x > 1) { x = 2; }").scan().unwrap();
        let eofs = tokens
            .iter()
            .filter(|t| t.kind() == TokenKind::Eof)
            .count();
        assert_eq!(eofs, 1);
        assert_eq!(tokens.last().map(|t| t.kind()), Some(TokenKind::Eof));
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = Scanner::new("int x;\nx = 1 @ 2;").scan().unwrap_err();
        assert_eq!(
            err,
            ScanError::UnexpectedCharacter {
                character: '@',
                line: 2
            }
        );
        assert_eq!(
            err.to_string(),
            "lexical error: unexpected character '@' at line 2"
        );
    }

    #[test]
    fn rejects_unterminated_block_comments() {
        let err = Scanner::new("int x;\n/* never\nclosed").scan().unwrap_err();
        assert_eq!(err, ScanError::UnterminatedComment { line: 2 });
    }

    #[test]
    fn rejects_out_of_range_literals() {
        let err = Scanner::new("x = 99999999999;").scan().unwrap_err();
        assert!(matches!(err, ScanError::IntegerOverflow { line: 1, .. }));
    }

    #[test]
    fn rejects_float_literals() {
        let err = Scanner::new("x = 1.5;").scan().unwrap_err();
        assert_eq!(
            err,
            ScanError::UnexpectedCharacter {
                character: '.',
                line: 1
            }
        );
    }
}
