//! Native function utilities and helpers
//!
//! Primitives receive their arguments as a Lisp list. These helpers check
//! the list's length and pull out typed arguments, producing `arity-error`
//! and `type-error` failures in a uniform format.

use std::cell::RefCell;
use std::rc::Rc;

use paren::{
    ConsCell, Datum, HashTable, LispError, NumericType, Value, list_length, list_to_vec,
};

// ============================================================================
// Argument Checking Helpers
// ============================================================================

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Check that `args` holds exactly `expected` values and return them.
pub fn arguments(name: &str, args: &Value, expected: usize) -> Result<Vec<Value>, LispError> {
    let count = list_length(args)?;
    if count != expected {
        return Err(LispError::arity(format!(
            "{name}: expected {expected} argument{}, got {count}",
            plural(expected)
        )));
    }
    list_to_vec(args)
}

/// Extract the single argument of a one-argument primitive.
pub fn single_argument(name: &str, args: &Value) -> Result<Value, LispError> {
    let mut values = arguments(name, args, 1)?;
    values
        .pop()
        .ok_or_else(|| LispError::internal(format!("{name}: argument list vanished")))
}

fn type_mismatch(name: &str, expected: &str, value: &Value) -> LispError {
    LispError::type_error(format!(
        "{name}: expected {expected}, got {}",
        value.type_name()
    ))
    .locate(&value.provenance)
}

// ============================================================================
// Value Extraction Helpers
// ============================================================================

pub fn extract_bool(name: &str, value: &Value) -> Result<bool, LispError> {
    value
        .as_bool()
        .ok_or_else(|| type_mismatch(name, "bool", value))
}

pub fn extract_number(name: &str, value: &Value) -> Result<NumericType, LispError> {
    value
        .as_number()
        .ok_or_else(|| type_mismatch(name, "number", value))
}

pub fn extract_string(name: &str, value: &Value) -> Result<String, LispError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| type_mismatch(name, "str", value))
}

pub fn extract_pair(name: &str, value: &Value) -> Result<Rc<RefCell<ConsCell>>, LispError> {
    value
        .as_pair()
        .cloned()
        .ok_or_else(|| type_mismatch(name, "pair", value))
}

pub fn extract_hash(name: &str, value: &Value) -> Result<Rc<RefCell<HashTable>>, LispError> {
    match &value.datum {
        Datum::Hash(table) => Ok(Rc::clone(table)),
        _ => Err(type_mismatch(name, "hash", value)),
    }
}

/// Accept `()` or a pair; anything else is a type error.
pub fn expect_list(name: &str, value: &Value) -> Result<(), LispError> {
    if value.is_nil() || value.is_pair() {
        Ok(())
    } else {
        Err(type_mismatch(name, "list", value))
    }
}
