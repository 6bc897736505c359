use std::rc::Rc;

use crate::error::LispError;
use crate::interner::InternedSymbol;
use crate::language::{AtomType, Datum, Provenance, SourceLocation, Value};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::numeric::NumericType;

/// File name recorded for values read from an in-memory string.
pub const STRING_SOURCE: &str = "<string>";

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    file: Rc<str>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn provenance(&self, token: &Token) -> Provenance {
        Provenance::at(Rc::clone(&self.file), token.row, token.col)
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> LispError {
        LispError::parse(message)
            .with_location(SourceLocation::new(Rc::clone(&self.file), token.row, token.col))
    }

    fn eof_error(&self, message: impl Into<String>) -> LispError {
        let err = LispError::parse(message);
        match self.tokens.last() {
            Some(last) => err.with_location(SourceLocation::new(
                Rc::clone(&self.file),
                last.row,
                last.col,
            )),
            None => err,
        }
    }

    fn parse_form(&mut self) -> Result<Value, LispError> {
        let token = self
            .next()
            .ok_or_else(|| self.eof_error("unexpected end of input"))?;
        let provenance = self.provenance(&token);

        let datum = match token.kind {
            TokenKind::Int(n) => Datum::Atom(AtomType::Number(NumericType::Int(n))),
            TokenKind::Float(x) => Datum::Atom(AtomType::Number(NumericType::Float(x))),
            TokenKind::Bool(b) => Datum::Atom(AtomType::Bool(b)),
            TokenKind::Str(ref s) => Datum::Atom(AtomType::String(s.clone())),
            TokenKind::Symbol(ref s) => Datum::Atom(AtomType::Symbol(InternedSymbol::new(s))),
            TokenKind::Quote => {
                if self.peek().is_none() {
                    return Err(self.error_at(&token, "quote at end of input"));
                }
                let quoted = self.parse_form()?;
                let tail = Value::pair(quoted, None).with_provenance(provenance.clone());
                let head = Value::symbol("quote").with_provenance(provenance.clone());
                return Ok(Value::pair(head, Some(tail)).with_provenance(provenance));
            }
            TokenKind::LParen => return self.parse_list(&token),
            TokenKind::RParen => return Err(self.error_at(&token, "unexpected ')'")),
            TokenKind::Dot => return Err(self.error_at(&token, "unexpected '.'")),
        };

        Ok(Value::new(datum, provenance))
    }

    fn parse_list(&mut self, open: &Token) -> Result<Value, LispError> {
        let mut items = Vec::new();
        let mut tail = None;

        loop {
            let Some(token) = self.peek().cloned() else {
                return Err(self.error_at(open, "unclosed parenthesis"));
            };

            match token.kind {
                TokenKind::RParen => {
                    self.position += 1;
                    break;
                }
                TokenKind::Dot => {
                    if items.is_empty() {
                        return Err(self.error_at(&token, "'.' with no preceding form"));
                    }
                    self.position += 1;
                    match self.peek().map(|t| &t.kind) {
                        None => return Err(self.error_at(open, "unclosed parenthesis")),
                        Some(TokenKind::RParen) => {
                            return Err(self.error_at(&token, "'.' must be followed by a form"));
                        }
                        Some(_) => {}
                    }
                    tail = Some(self.parse_form()?);
                    match self.next() {
                        Some(Token {
                            kind: TokenKind::RParen,
                            ..
                        }) => break,
                        Some(extra) => {
                            return Err(self.error_at(&extra, "more than one form after '.'"));
                        }
                        None => return Err(self.error_at(open, "unclosed parenthesis")),
                    }
                }
                _ => items.push(self.parse_form()?),
            }
        }

        if items.is_empty() {
            return Ok(Value::null().with_provenance(self.provenance(open)));
        }

        // `(a . ())` folds into `(a)`
        let mut rest = tail.filter(|v| !v.is_nil());
        let count = items.len();
        for (i, item) in items.into_iter().rev().enumerate() {
            let provenance = if i + 1 == count {
                self.provenance(open)
            } else {
                item.provenance.clone()
            };
            rest = Some(Value::pair(item, rest).with_provenance(provenance));
        }
        rest.ok_or_else(|| LispError::internal("empty list after non-empty parse"))
    }
}

/// Parse every top-level form in `input`, tagging values with `file`.
pub fn parse_source(input: &str, file: &str) -> Result<Vec<Value>, LispError> {
    let file: Rc<str> = Rc::from(file);
    let tokens = Lexer::new(input, Rc::clone(&file)).tokenize()?;
    let mut parser = Parser {
        tokens,
        position: 0,
        file,
    };

    let mut forms = Vec::new();
    while parser.peek().is_some() {
        let form = parser.parse_form()?;
        log::trace!("read {} at {}", form, form.provenance.location);
        forms.push(form);
    }
    Ok(forms)
}

/// Parse every top-level form in an in-memory string.
pub fn parse(input: &str) -> Result<Vec<Value>, LispError> {
    parse_source(input, STRING_SOURCE)
}
