use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::environment::Environment;
use crate::error::LispError;
use crate::interner::InternedSymbol;
use crate::numeric::NumericType;

// ============================================================================
// Provenance
// ============================================================================

const UNKNOWN_FILE: &str = "unknown";

/// Where a value came from in source text. Rows and columns are 1-based;
/// row 0 marks a value synthesized at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Rc<str>,
    pub row: u32,
    pub col: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<Rc<str>>, row: u32, col: u32) -> Self {
        SourceLocation {
            file: file.into(),
            row,
            col,
        }
    }

    pub fn unknown() -> Self {
        SourceLocation::new(UNKNOWN_FILE, 0, 0)
    }

    pub fn is_known(&self) -> bool {
        self.row != 0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.row, self.col)
    }
}

/// Diagnostic metadata carried by every value. Never consulted by
/// evaluation or equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub location: SourceLocation,
    /// Name of the binding this value was stored under by `define`
    pub bound: Option<InternedSymbol>,
}

impl Provenance {
    pub fn unknown() -> Self {
        Provenance {
            location: SourceLocation::unknown(),
            bound: None,
        }
    }

    pub fn at(file: impl Into<Rc<str>>, row: u32, col: u32) -> Self {
        Provenance {
            location: SourceLocation::new(file, row, col),
            bound: None,
        }
    }
}

impl From<SourceLocation> for Provenance {
    fn from(location: SourceLocation) -> Self {
        Provenance {
            location,
            bound: None,
        }
    }
}

// ============================================================================
// Core Type System
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AtomType {
    Symbol(InternedSymbol),
    Number(NumericType),
    String(String),
    Bool(bool),
}

#[derive(Debug)]
pub struct ConsCell {
    pub car: Value,
    /// `None` terminates a proper list
    pub cdr: Option<Value>,
}

impl ConsCell {
    /// Replace the cdr. Storing `()` clears it, so every proper list ends
    /// the same way.
    pub fn set_cdr(&mut self, cdr: Value) {
        self.cdr = if cdr.is_nil() { None } else { Some(cdr) };
    }
}

/// Unlinks the cdr chain iteratively so long lists do not exhaust the stack.
/// The walk stops at the first tail still shared with another owner.
impl Drop for ConsCell {
    fn drop(&mut self) {
        let mut next = self.cdr.take();
        while let Some(Value {
            datum: Datum::Cons(cell),
            ..
        }) = next
        {
            next = match Rc::try_unwrap(cell) {
                Ok(cell) => cell.into_inner().cdr.take(),
                Err(_) => None,
            };
        }
    }
}

pub struct LambdaCell {
    pub params: Vec<InternedSymbol>,
    pub body: Vec<Value>,
    pub env: Environment,
}

impl fmt::Debug for LambdaCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaCell")
            .field("params", &self.params)
            .field("body", &self.body)
            .field("env", &"<environment>")
            .finish()
    }
}

/// Key of a hash table entry. Only immutable atoms can be keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Int(i64),
    Bool(bool),
    Symbol(InternedSymbol),
    String(String),
}

impl HashKey {
    pub fn from_value(value: &Value) -> Result<HashKey, LispError> {
        match &value.datum {
            Datum::Atom(AtomType::Number(NumericType::Int(n))) => Ok(HashKey::Int(*n)),
            Datum::Atom(AtomType::Bool(b)) => Ok(HashKey::Bool(*b)),
            Datum::Atom(AtomType::Symbol(s)) => Ok(HashKey::Symbol(*s)),
            Datum::Atom(AtomType::String(s)) => Ok(HashKey::String(s.clone())),
            _ => Err(LispError::type_error(format!(
                "{} cannot be used as a hash key",
                value.type_name()
            ))),
        }
    }
}

pub type HashTable = FxHashMap<HashKey, Value>;

/// Native function type. Arguments arrive as a pair-chain (or `()`).
pub type NativeFn = fn(&Environment, &Value) -> Result<Value, LispError>;

#[derive(Debug, Clone)]
pub enum Datum {
    Nil,
    Cons(Rc<RefCell<ConsCell>>),
    Atom(AtomType),
    Lambda(Rc<LambdaCell>),
    NativeFn(NativeFn),
    Hash(Rc<RefCell<HashTable>>),
}

#[derive(Clone)]
pub struct Value {
    pub datum: Datum,
    pub provenance: Provenance,
}

// ============================================================================
// Constructors
// ============================================================================

impl Value {
    pub fn new(datum: Datum, provenance: Provenance) -> Self {
        Value { datum, provenance }
    }

    fn synthetic(datum: Datum) -> Self {
        Value::new(datum, Provenance::unknown())
    }

    pub fn null() -> Self {
        Value::synthetic(Datum::Nil)
    }

    /// A pair with an explicit cdr slot. `Some(())` is folded like `None`.
    pub fn pair(car: Value, cdr: Option<Value>) -> Self {
        Value::cons(car, cdr.unwrap_or_else(Value::null))
    }

    /// A pair whose `()` cdr is folded into an absent one.
    pub fn cons(car: Value, cdr: Value) -> Self {
        let mut cell = ConsCell { car, cdr: None };
        cell.set_cdr(cdr);
        Value::synthetic(Datum::Cons(Rc::new(RefCell::new(cell))))
    }

    pub fn int(n: i64) -> Self {
        Value::number(NumericType::Int(n))
    }

    pub fn float(x: f64) -> Self {
        Value::number(NumericType::Float(x))
    }

    pub fn number(n: NumericType) -> Self {
        Value::synthetic(Datum::Atom(AtomType::Number(n)))
    }

    pub fn bool(b: bool) -> Self {
        Value::synthetic(Datum::Atom(AtomType::Bool(b)))
    }

    pub fn symbol(name: &str) -> Self {
        Value::synthetic(Datum::Atom(AtomType::Symbol(InternedSymbol::new(name))))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::synthetic(Datum::Atom(AtomType::String(s.into())))
    }

    pub fn native(f: NativeFn) -> Self {
        Value::synthetic(Datum::NativeFn(f))
    }

    pub fn lambda(params: Vec<InternedSymbol>, body: Vec<Value>, env: Environment) -> Self {
        Value::synthetic(Datum::Lambda(Rc::new(LambdaCell { params, body, env })))
    }

    pub fn hash() -> Self {
        Value::synthetic(Datum::Hash(Rc::new(RefCell::new(HashTable::default()))))
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.provenance.location = location;
        self
    }

    /// Record the binding name this value is stored under.
    pub fn with_bound(mut self, name: InternedSymbol) -> Self {
        self.provenance.bound = Some(name);
        self
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Name of the variant, as shown by `inspect`.
    pub fn type_name(&self) -> &'static str {
        match &self.datum {
            Datum::Nil => "null",
            Datum::Cons(_) => "pair",
            Datum::Atom(AtomType::Number(NumericType::Int(_))) => "int",
            Datum::Atom(AtomType::Number(NumericType::Float(_))) => "float",
            Datum::Atom(AtomType::Bool(_)) => "bool",
            Datum::Atom(AtomType::Symbol(_)) => "sym",
            Datum::Atom(AtomType::String(_)) => "str",
            Datum::Lambda(_) | Datum::NativeFn(_) => "fn",
            Datum::Hash(_) => "hash",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.datum, Datum::Nil)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self.datum, Datum::Cons(_))
    }

    pub fn as_pair(&self) -> Option<&Rc<RefCell<ConsCell>>> {
        match &self.datum {
            Datum::Cons(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<InternedSymbol> {
        match &self.datum {
            Datum::Atom(AtomType::Symbol(s)) => Some(*s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.datum {
            Datum::Atom(AtomType::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<NumericType> {
        match &self.datum {
            Datum::Atom(AtomType::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.datum {
            Datum::Atom(AtomType::String(s)) => Some(s),
            _ => None,
        }
    }

    /// The car of a pair
    pub fn car(&self) -> Option<Value> {
        self.as_pair().map(|cell| cell.borrow().car.clone())
    }

    /// The cdr slot of a pair; `None` for non-pairs and for absent cdrs
    pub fn cdr(&self) -> Option<Value> {
        self.as_pair().and_then(|cell| cell.borrow().cdr.clone())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({self} @ {})", self.provenance.location)
    }
}

// ============================================================================
// Display Implementation
// ============================================================================

fn escape_string(s: &str) -> String {
    let mut result = String::new();
    for c in s.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            c => result.push(c),
        }
    }
    result
}

impl fmt::Display for AtomType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AtomType::Symbol(s) => write!(f, "{s}"),
            AtomType::Number(n) => write!(f, "{n}"),
            AtomType::String(s) => write!(f, "\"{}\"", escape_string(s)),
            AtomType::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
        }
    }
}

fn cell_id(cell: &Rc<RefCell<ConsCell>>) -> usize {
    Rc::as_ptr(cell) as usize
}

/// Writes a value, printing `...` where a pair re-enters itself.
/// `path` holds the pairs currently being printed.
fn write_value(f: &mut fmt::Formatter, value: &Value, path: &mut FxHashSet<usize>) -> fmt::Result {
    let Datum::Cons(head) = &value.datum else {
        return match &value.datum {
            Datum::Nil => write!(f, "()"),
            Datum::Atom(atom) => write!(f, "{atom}"),
            Datum::Lambda(_) => write!(f, "<lambda>"),
            Datum::NativeFn(_) => write!(f, "<native-fn>"),
            Datum::Hash(_) => write!(f, "<hash>"),
            Datum::Cons(_) => Ok(()),
        };
    };

    if path.contains(&cell_id(head)) {
        return write!(f, "...");
    }

    let mut entered = Vec::new();
    let mut current = Rc::clone(head);
    write!(f, "(")?;
    loop {
        path.insert(cell_id(&current));
        entered.push(cell_id(&current));

        let next = {
            let cell = current.borrow();
            write_value(f, &cell.car, path)?;
            cell.cdr.clone()
        };

        match next {
            None => break,
            Some(Value {
                datum: Datum::Cons(next),
                ..
            }) => {
                if path.contains(&cell_id(&next)) {
                    write!(f, " . ...")?;
                    break;
                }
                write!(f, " ")?;
                current = next;
            }
            Some(Value {
                datum: Datum::Nil, ..
            }) => break,
            Some(other) => {
                write!(f, " . ")?;
                write_value(f, &other, path)?;
                break;
            }
        }
    }
    for id in entered {
        path.remove(&id);
    }
    write!(f, ")")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_value(f, self, &mut FxHashSet::default())
    }
}

// ============================================================================
// Primitive Operations
// ============================================================================

pub fn cons(car: Value, cdr: Value) -> Value {
    Value::cons(car, cdr)
}

/// Deep structural equality.
///
/// Booleans compare by value. Pairs compare car first, then cdr, and a pair
/// with a cdr never equals one without. A pair comparison that is already
/// in progress is assumed equal, so cyclic structures terminate.
pub fn equal(a: &Value, b: &Value) -> bool {
    let mut pending = vec![(a.clone(), b.clone())];
    let mut assumed: FxHashSet<(usize, usize)> = FxHashSet::default();

    while let Some((x, y)) = pending.pop() {
        match (&x.datum, &y.datum) {
            (Datum::Nil, Datum::Nil) => {}
            (Datum::Atom(p), Datum::Atom(q)) => {
                if p != q {
                    return false;
                }
            }
            (Datum::NativeFn(p), Datum::NativeFn(q)) => {
                if *p as usize != *q as usize {
                    return false;
                }
            }
            (Datum::Lambda(p), Datum::Lambda(q)) => {
                if !Rc::ptr_eq(p, q) {
                    return false;
                }
            }
            (Datum::Hash(p), Datum::Hash(q)) => {
                if !Rc::ptr_eq(p, q) {
                    return false;
                }
            }
            (Datum::Cons(p), Datum::Cons(q)) => {
                if Rc::ptr_eq(p, q) || !assumed.insert((cell_id(p), cell_id(q))) {
                    continue;
                }
                let (p, q) = (p.borrow(), q.borrow());
                match (&p.cdr, &q.cdr) {
                    (Some(pc), Some(qc)) => pending.push((pc.clone(), qc.clone())),
                    (None, None) => {}
                    _ => return false,
                }
                pending.push((p.car.clone(), q.car.clone()));
            }
            _ => return false,
        }
    }
    true
}

// ============================================================================
// List Helpers
// ============================================================================

/// Visit each element of a proper list, returning how many there were.
/// Improper tails and cycles are type errors.
fn walk_list(list: &Value, mut visit: impl FnMut(&Value)) -> Result<usize, LispError> {
    let mut count = 0;
    let mut seen = FxHashSet::default();
    let mut current = match &list.datum {
        Datum::Nil => return Ok(0),
        Datum::Cons(cell) => Rc::clone(cell),
        _ => {
            return Err(LispError::type_error(format!(
                "expected list, got {}",
                list.type_name()
            )));
        }
    };

    loop {
        if !seen.insert(cell_id(&current)) {
            return Err(LispError::type_error("circular list"));
        }
        count += 1;
        let next = {
            let cell = current.borrow();
            visit(&cell.car);
            cell.cdr.clone()
        };
        match next.map(|v| v.datum) {
            None | Some(Datum::Nil) => return Ok(count),
            Some(Datum::Cons(cell)) => current = cell,
            Some(_) => return Err(LispError::type_error("expected proper list")),
        }
    }
}

/// Number of elements in a proper list.
pub fn list_length(list: &Value) -> Result<usize, LispError> {
    walk_list(list, |_| {})
}

/// Convert a proper list to a Vec<Value>
pub fn list_to_vec(list: &Value) -> Result<Vec<Value>, LispError> {
    let mut result = Vec::new();
    walk_list(list, |item| result.push(item.clone()))?;
    Ok(result)
}

/// Convert a Vec<Value> to a proper list ending in an absent cdr
pub fn vec_to_list(items: Vec<Value>) -> Value {
    items
        .into_iter()
        .rev()
        .fold(Value::null(), |acc, item| Value::cons(item, acc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cons_folds_null_cdr() {
        let pair = cons(Value::int(1), Value::null());
        assert!(pair.cdr().is_none());
        assert_eq!(pair.to_string(), "(1)");
    }

    #[test]
    fn test_display_lists() {
        let list = vec_to_list(vec![Value::int(1), Value::symbol("a"), Value::string("s")]);
        assert_eq!(list.to_string(), "(1 a \"s\")");
        assert_eq!(cons(Value::int(1), Value::int(2)).to_string(), "(1 . 2)");
        assert_eq!(Value::null().to_string(), "()");
        assert_eq!(Value::bool(true).to_string(), "#t");
        assert_eq!(Value::float(6.0).to_string(), "6.0");
    }

    #[test]
    fn test_display_escapes_strings() {
        assert_eq!(Value::string("a\"b\n").to_string(), "\"a\\\"b\\n\"");
    }

    #[test]
    fn test_display_cycle() {
        let pair = cons(Value::int(1), Value::null());
        if let Some(cell) = pair.as_pair() {
            cell.borrow_mut().set_cdr(pair.clone());
        }
        assert_eq!(pair.to_string(), "(1 . ...)");
    }

    #[test]
    fn test_display_shared_substructure_is_not_a_cycle() {
        let shared = vec_to_list(vec![Value::int(1)]);
        let outer = vec_to_list(vec![shared.clone(), shared]);
        assert_eq!(outer.to_string(), "((1) (1))");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::null().type_name(), "null");
        assert_eq!(Value::int(1).type_name(), "int");
        assert_eq!(Value::float(1.0).type_name(), "float");
        assert_eq!(Value::bool(false).type_name(), "bool");
        assert_eq!(Value::symbol("x").type_name(), "sym");
        assert_eq!(Value::string("x").type_name(), "str");
        assert_eq!(Value::hash().type_name(), "hash");
        assert_eq!(cons(Value::int(1), Value::int(2)).type_name(), "pair");
    }

    #[test]
    fn test_equal_pairs() {
        let a = cons(Value::int(1), Value::int(2));
        let b = cons(Value::int(1), Value::int(2));
        let c = cons(Value::int(1), Value::int(3));
        assert!(equal(&a, &b));
        assert!(!equal(&a, &c));
    }

    #[test]
    fn test_pair_folds_null_cdr() {
        let pair = Value::pair(Value::int(1), Some(Value::null()));
        assert!(pair.cdr().is_none());
        assert!(equal(&pair, &Value::pair(Value::int(1), None)));
    }

    #[test]
    fn test_drop_stops_at_shared_tail() {
        let tail = vec_to_list(vec![Value::int(2), Value::int(3)]);
        let head = cons(Value::int(1), tail.clone());
        drop(head);
        assert_eq!(tail.to_string(), "(2 3)");
        assert_eq!(list_length(&tail).ok(), Some(2));
    }

    #[test]
    fn test_drop_long_list() {
        let list = vec_to_list((0..200_000).map(Value::int).collect());
        assert_eq!(list_length(&list).ok(), Some(200_000));
        drop(list);
    }

    #[test]
    fn test_equal_cdr_presence_mismatch() {
        let a = Value::pair(Value::int(1), None);
        let b = Value::pair(Value::int(1), Some(Value::int(1)));
        assert!(!equal(&a, &b));
    }

    #[test]
    fn test_equal_booleans_are_symmetric() {
        assert!(equal(&Value::bool(true), &Value::bool(true)));
        assert!(equal(&Value::bool(false), &Value::bool(false)));
        assert!(!equal(&Value::bool(true), &Value::bool(false)));
        assert!(!equal(&Value::bool(false), &Value::bool(true)));
    }

    #[test]
    fn test_equal_ignores_provenance() {
        let a = Value::int(7).with_provenance(Provenance::at("a.lisp", 1, 1));
        let b = Value::int(7).with_provenance(Provenance::at("b.lisp", 4, 2));
        assert!(equal(&a, &b));
    }

    #[test]
    fn test_equal_int_and_float_differ() {
        assert!(!equal(&Value::int(1), &Value::float(1.0)));
    }

    #[test]
    fn test_equal_cyclic_lists_terminates() {
        let a = cons(Value::int(1), Value::null());
        let b = cons(Value::int(1), Value::null());
        if let (Some(ca), Some(cb)) = (a.as_pair(), b.as_pair()) {
            ca.borrow_mut().set_cdr(a.clone());
            cb.borrow_mut().set_cdr(b.clone());
        }
        assert!(equal(&a, &b));
    }

    #[test]
    fn test_list_length() {
        assert_eq!(list_length(&Value::null()).ok(), Some(0));
        let list = vec_to_list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(list_length(&list).ok(), Some(3));
        assert!(list_length(&cons(Value::int(1), Value::int(2))).is_err());
        assert!(list_length(&Value::int(4)).is_err());
    }

    #[test]
    fn test_list_length_detects_cycles() {
        let pair = cons(Value::int(1), Value::null());
        if let Some(cell) = pair.as_pair() {
            cell.borrow_mut().set_cdr(pair.clone());
        }
        let err = list_length(&pair).unwrap_err();
        assert_eq!(err.message, "circular list");
    }

    #[test]
    fn test_list_to_vec_round_trip() {
        let items = vec![Value::int(1), Value::bool(true)];
        let list = vec_to_list(items);
        let back = list_to_vec(&list).unwrap();
        assert_eq!(back.len(), 2);
        assert!(equal(&back[1], &Value::bool(true)));
    }

    #[test]
    fn test_hash_key_rejects_pairs() {
        assert!(HashKey::from_value(&Value::symbol("k")).is_ok());
        assert!(HashKey::from_value(&cons(Value::int(1), Value::int(2))).is_err());
        assert!(HashKey::from_value(&Value::float(1.5)).is_err());
    }
}
