//! Structured errors raised by the reader, evaluator, and primitives.

use std::fmt;

use crate::language::{Provenance, SourceLocation};

/// Categories of evaluation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong number of arguments to a primitive, lambda, or special form
    Arity,
    /// An argument's variant does not match what the operation requires
    Type,
    /// Symbol lookup failed in every frame
    UnboundSymbol,
    /// Malformed source text
    Parse,
    /// Non-fatal assertion raised by `warn`
    Warn,
    /// Fatal assertion raised by `assert`, or a broken internal invariant
    Internal,
}

impl ErrorKind {
    /// The kebab-case tag used when reporting the error.
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::Arity => "arity-error",
            ErrorKind::Type => "type-error",
            ErrorKind::UnboundSymbol => "unbound-symbol",
            ErrorKind::Parse => "parse-error",
            ErrorKind::Warn => "warn",
            ErrorKind::Internal => "internal-error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What a top-level sequence does when a form raises a `warn` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarnPolicy {
    /// Stop the sequence and report the warning like any other error
    #[default]
    Abort,
    /// Log the warning and carry on with the next form
    Continue,
}

/// An error with its kind, a message, and where it happened (if known).
#[derive(Debug, Clone, PartialEq)]
pub struct LispError {
    /// The category of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Source location of the value that triggered the error
    pub location: Option<SourceLocation>,
}

impl LispError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a source location, replacing any previous one.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the location from `provenance` unless the error already has
    /// one or the provenance is synthetic.
    pub fn locate(mut self, provenance: &Provenance) -> Self {
        if self.location.is_none() && provenance.location.is_known() {
            self.location = Some(provenance.location.clone());
        }
        self
    }

    pub fn arity(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::Arity, what)
    }

    pub fn type_error(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, what)
    }

    pub fn unbound(name: impl fmt::Display) -> Self {
        Self::new(ErrorKind::UnboundSymbol, format!("unbound symbol: {name}"))
    }

    pub fn parse(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, what)
    }

    pub fn warning(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::Warn, what)
    }

    pub fn internal(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, what)
    }

    /// Everything except `warn` aborts the surrounding sequence, whatever
    /// the `WarnPolicy`.
    pub fn is_fatal(&self) -> bool {
        self.kind != ErrorKind::Warn
    }
}

impl fmt::Display for LispError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(ref location) = self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LispError {}

impl From<LispError> for String {
    fn from(err: LispError) -> String {
        err.to_string()
    }
}
