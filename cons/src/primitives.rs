//! Primitive library
//!
//! Every primitive receives the caller's environment and its evaluated
//! arguments as a list, and validates arity and argument types before
//! doing anything else.

use std::fs;

use paren::{
    Datum, Environment, HashKey, LispError, NumericType, Value, equal, list_length, list_to_vec,
    parse_source,
};

use crate::interpreter::eval_toplevel;
use crate::native::{
    arguments, expect_list, extract_bool, extract_hash, extract_number, extract_pair,
    extract_string, single_argument,
};

// ============================================================================
// Predicates
// ============================================================================

/// (null? x) => #t when x is ()
pub fn null_p(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("null?", args)?;
    Ok(Value::bool(arg.is_nil()))
}

/// (symbol? x)
pub fn symbol_p(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("symbol?", args)?;
    Ok(Value::bool(arg.as_symbol().is_some()))
}

/// (atom? x) => #t for anything but a pair
pub fn atom_p(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("atom?", args)?;
    Ok(Value::bool(!arg.is_pair()))
}

/// (pair? x), also registered as cons?
pub fn pair_p(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("pair?", args)?;
    Ok(Value::bool(arg.is_pair()))
}

/// (list? x) => #t for a pair or ()
pub fn list_p(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("list?", args)?;
    Ok(Value::bool(arg.is_pair() || arg.is_nil()))
}

pub fn equal_p(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let args = arguments("equal?", args, 2)?;
    Ok(Value::bool(equal(&args[0], &args[1])))
}

// ============================================================================
// Arithmetic
// ============================================================================

/// (+ n...) sums its arguments. The sum stays an int until the first float
/// argument, after which it is a float for the rest of the list.
pub fn add(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let mut sum = NumericType::Int(0);
    for arg in list_to_vec(args)? {
        sum = sum.add(&extract_number("+", &arg)?);
    }
    Ok(Value::number(sum))
}

// ============================================================================
// Logic and Assertions
// ============================================================================

pub fn not(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("not", args)?;
    Ok(Value::bool(!extract_bool("not", &arg)?))
}

/// (assert b) raises a fatal internal-error when b is #f
pub fn assert(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("assert", args)?;
    if !extract_bool("assert", &arg)? {
        return Err(LispError::internal("assert: assertion failed"));
    }
    Ok(Value::null())
}

/// (warn b) raises a non-fatal warn error when b is #f
pub fn warn(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("warn", args)?;
    if !extract_bool("warn", &arg)? {
        return Err(LispError::warning("warn: warning raised"));
    }
    Ok(Value::null())
}

// ============================================================================
// List Operations
// ============================================================================

/// (car l). The car of () is () itself rather than an error.
pub fn car(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("car", args)?;
    expect_list("car", &arg)?;
    Ok(arg.car().unwrap_or(arg))
}

/// (cdr l). Both () and a pair without a cdr give ().
pub fn cdr(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("cdr", args)?;
    expect_list("cdr", &arg)?;
    Ok(arg.cdr().unwrap_or_else(Value::null))
}

pub fn cons_fn(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let mut args = arguments("cons", args, 2)?;
    let cdr = args.pop().unwrap_or_else(Value::null);
    let car = args.pop().unwrap_or_else(Value::null);
    Ok(Value::cons(car, cdr))
}

/// (list x...) returns its arguments
pub fn list(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    Ok(args.clone())
}

pub fn length(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("length", args)?;
    let count = list_length(&arg).map_err(|e| {
        LispError::type_error(format!("length: {}", e.message)).locate(&arg.provenance)
    })?;
    Ok(Value::int(count as i64))
}

// ============================================================================
// Mutation
// ============================================================================

/// (set-car! p v) replaces p's car in place
pub fn set_car(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let args = arguments("set-car!", args, 2)?;
    let cell = extract_pair("set-car!", &args[0])?;
    cell.borrow_mut().car = args[1].clone();
    Ok(Value::null())
}

/// (set-cdr! p v) replaces p's cdr in place; v of () clears it
pub fn set_cdr(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let args = arguments("set-cdr!", args, 2)?;
    let cell = extract_pair("set-cdr!", &args[0])?;
    cell.borrow_mut().set_cdr(args[1].clone());
    Ok(Value::null())
}

// ============================================================================
// Hash Tables
// ============================================================================

pub fn make_hash(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    arguments("make-hash", args, 0)?;
    Ok(Value::hash())
}

/// (hash-set! h key value)
pub fn hash_set(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let args = arguments("hash-set!", args, 3)?;
    let table = extract_hash("hash-set!", &args[0])?;
    let key = HashKey::from_value(&args[1]).map_err(|e| e.locate(&args[1].provenance))?;
    table.borrow_mut().insert(key, args[2].clone());
    Ok(Value::null())
}

/// (hash-ref h key) => the stored value, or () when missing
pub fn hash_ref(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let args = arguments("hash-ref", args, 2)?;
    let table = extract_hash("hash-ref", &args[0])?;
    let key = HashKey::from_value(&args[1]).map_err(|e| e.locate(&args[1].provenance))?;
    let value = table.borrow().get(&key).cloned();
    Ok(value.unwrap_or_else(Value::null))
}

// ============================================================================
// Inspection and Loading
// ============================================================================

/// Human-readable description of a value's variant, origin, and binding.
pub fn describe(value: &Value) -> String {
    let location = &value.provenance.location;
    let mut text = match &value.datum {
        Datum::NativeFn(_) => "type: built-in function".to_string(),
        Datum::Lambda(_) if location.is_known() => format!("type: lambda, declared at {location}"),
        Datum::Lambda(_) => "type: lambda".to_string(),
        _ if location.is_known() => format!("type: {} {location}", value.type_name()),
        _ => format!("type: {}", value.type_name()),
    };
    if let Some(bound) = value.provenance.bound {
        text.push_str(&format!(", bound to: {bound}"));
    }
    text
}

pub fn inspect(_env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("inspect", args)?;
    Ok(Value::string(describe(&arg)))
}

/// (load "path") evaluates every form in the file in the caller's
/// environment and returns the last result. `warn` errors follow the
/// session's warn policy, as they do for top-level forms.
pub fn load(env: &Environment, args: &Value) -> Result<Value, LispError> {
    let arg = single_argument("load", args)?;
    let path = extract_string("load", &arg)?;

    log::debug!("loading {path}");
    let source = fs::read_to_string(&path).map_err(|e| {
        LispError::internal(format!("load: failed to read '{path}': {e}")).locate(&arg.provenance)
    })?;
    let forms = parse_source(&source, &path)?;
    eval_toplevel(&forms, env)
}

// ============================================================================
// Registration
// ============================================================================

/// Bind every primitive in `env`.
pub fn register_primitives(env: &Environment) {
    // Predicates
    env.define_native("null?", null_p);
    env.define_native("symbol?", symbol_p);
    env.define_native("atom?", atom_p);
    env.define_native("pair?", pair_p);
    env.define_native("cons?", pair_p);
    env.define_native("list?", list_p);
    env.define_native("equal?", equal_p);

    // Arithmetic
    env.define_native("+", add);

    // Logic and assertions
    env.define_native("not", not);
    env.define_native("assert", assert);
    env.define_native("warn", warn);

    // Lists
    env.define_native("car", car);
    env.define_native("cdr", cdr);
    env.define_native("cons", cons_fn);
    env.define_native("list", list);
    env.define_native("length", length);

    // Mutation
    env.define_native("set-car!", set_car);
    env.define_native("set-cdr!", set_cdr);

    // Hash tables
    env.define_native("make-hash", make_hash);
    env.define_native("hash-set!", hash_set);
    env.define_native("hash-ref", hash_ref);

    // Inspection and loading
    env.define_native("inspect", inspect);
    env.define_native("load", load);
}
