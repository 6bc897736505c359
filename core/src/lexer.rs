use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::LispError;
use crate::language::SourceLocation;

static FLOAT_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:[0-9]+\.[0-9]*|\.[0-9]+)$").expect("float pattern"));
static INT_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("int pattern"));

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Quote,
    Dot,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub row: u32,
    pub col: u32,
}

// ============================================================================
// Lexer
// ============================================================================

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    row: u32,
    col: u32,
    file: Rc<str>,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '\'' | '"' | ';')
}

impl Lexer {
    pub fn new(input: &str, file: Rc<str>) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            row: 1,
            col: 1,
            file,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char() {
            self.position += 1;
            if c == '\n' {
                self.row += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn location(&self, row: u32, col: u32) -> SourceLocation {
        SourceLocation::new(Rc::clone(&self.file), row, col)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char() {
            if c.is_whitespace() {
                self.advance();
            } else if c == ';' {
                // Comment runs to end of line
                while let Some(c) = self.current_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Split the whole input into tokens.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LispError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let Some(c) = self.current_char() else {
                return Ok(tokens);
            };
            let (row, col) = (self.row, self.col);

            let kind = match c {
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                '\'' => {
                    self.advance();
                    TokenKind::Quote
                }
                '"' => self.read_string(row, col)?,
                _ => self.read_word(row, col)?,
            };

            tokens.push(Token { kind, row, col });
        }
    }

    fn read_string(&mut self, row: u32, col: u32) -> Result<TokenKind, LispError> {
        self.advance();
        let mut content = String::new();

        loop {
            match self.current_char() {
                None => {
                    return Err(LispError::parse("unterminated string")
                        .with_location(self.location(row, col)));
                }
                Some('"') => {
                    self.advance();
                    return Ok(TokenKind::Str(content));
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => content.push('\n'),
                        Some('t') => content.push('\t'),
                        Some('r') => content.push('\r'),
                        Some('\\') => content.push('\\'),
                        Some('"') => content.push('"'),
                        Some(other) => {
                            content.push('\\');
                            content.push(other);
                        }
                        None => continue,
                    }
                    self.advance();
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_word(&mut self, row: u32, col: u32) -> Result<TokenKind, LispError> {
        let mut word = String::new();
        while let Some(c) = self.current_char() {
            if is_delimiter(c) {
                break;
            }
            word.push(c);
            self.advance();
        }

        classify(&word).map_err(|e| e.with_location(self.location(row, col)))
    }
}

/// Decide what a bare word is: a float iff it is numeric with a decimal
/// point, an int iff it is numeric without one, otherwise a symbol.
fn classify(word: &str) -> Result<TokenKind, LispError> {
    if word == "." {
        return Ok(TokenKind::Dot);
    }
    if word.starts_with('#') {
        return match word {
            "#t" => Ok(TokenKind::Bool(true)),
            "#f" => Ok(TokenKind::Bool(false)),
            _ => Err(LispError::parse(format!("unknown literal '{word}'"))),
        };
    }
    if FLOAT_LITERAL.is_match(word) {
        return word
            .parse::<f64>()
            .map(TokenKind::Float)
            .map_err(|e| LispError::parse(format!("bad float literal '{word}': {e}")));
    }
    if INT_LITERAL.is_match(word) {
        return word
            .parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|_| LispError::parse(format!("integer literal out of range '{word}'")));
    }
    Ok(TokenKind::Symbol(word.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input, Rc::from("test"))
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_numeric_disambiguation() {
        assert_eq!(kinds("7"), vec![TokenKind::Int(7)]);
        assert_eq!(kinds("-17"), vec![TokenKind::Int(-17)]);
        assert_eq!(kinds("1."), vec![TokenKind::Float(1.0)]);
        assert_eq!(kinds(".125"), vec![TokenKind::Float(0.125)]);
        assert_eq!(kinds("+2.5"), vec![TokenKind::Float(2.5)]);
        assert_eq!(kinds("aks..."), vec![TokenKind::Symbol("aks...".into())]);
        assert_eq!(kinds("+"), vec![TokenKind::Symbol("+".into())]);
        assert_eq!(kinds("1+"), vec![TokenKind::Symbol("1+".into())]);
        assert_eq!(kinds("."), vec![TokenKind::Dot]);
    }

    #[test]
    fn test_booleans() {
        assert_eq!(kinds("#t #f"), vec![TokenKind::Bool(true), TokenKind::Bool(false)]);
        assert!(Lexer::new("#x", Rc::from("test")).tokenize().is_err());
    }

    #[test]
    fn test_int_out_of_range() {
        let err = Lexer::new("99999999999999999999", Rc::from("test"))
            .tokenize()
            .unwrap_err();
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#""a (b) \"c\"\n""#),
            vec![TokenKind::Str("a (b) \"c\"\n".into())]
        );
    }

    #[test]
    fn test_unterminated_string_reports_start() {
        let err = Lexer::new("(\n  \"abc", Rc::from("f.lisp"))
            .tokenize()
            .unwrap_err();
        assert_eq!(err.message, "unterminated string");
        assert_eq!(err.location, Some(SourceLocation::new("f.lisp", 2, 3)));
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("; header\n(a ; trailing\n b)"),
            vec![
                TokenKind::LParen,
                TokenKind::Symbol("a".into()),
                TokenKind::Symbol("b".into()),
                TokenKind::RParen
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("(a\n  'b)", Rc::from("test")).tokenize().unwrap();
        let positions: Vec<(u32, u32)> = tokens.iter().map(|t| (t.row, t.col)).collect();
        assert_eq!(positions, vec![(1, 1), (1, 2), (2, 3), (2, 4), (2, 5)]);
    }

    #[test]
    fn test_quote_is_a_delimiter() {
        assert_eq!(
            kinds("a'b"),
            vec![
                TokenKind::Symbol("a".into()),
                TokenKind::Quote,
                TokenKind::Symbol("b".into())
            ]
        );
    }
}
