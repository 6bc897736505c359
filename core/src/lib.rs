//! Core language definition for paren
//!
//! This crate contains the value model, reader, environment, and error
//! types for the paren Lisp dialect. It does not evaluate anything: the
//! evaluator and primitive library live in the `cons` crate.

pub mod environment;
pub mod error;
pub mod interner;
pub mod language;
pub mod lexer;
pub mod numeric;
pub mod parser;

// Re-export commonly used items for convenience
pub use environment::Environment;
pub use error::{ErrorKind, LispError, WarnPolicy};
pub use interner::InternedSymbol;
pub use language::{
    AtomType, ConsCell, Datum, HashKey, HashTable, LambdaCell, NativeFn, Provenance,
    SourceLocation, Value, cons, equal, list_length, list_to_vec, vec_to_list,
};
pub use numeric::NumericType;
pub use parser::{parse, parse_source};
