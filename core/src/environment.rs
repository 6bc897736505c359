//! Environment for variable bindings
//!
//! An Environment is a chain of frames. Lookup walks from the innermost
//! frame outward; `define` only ever writes to the innermost frame.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::WarnPolicy;
use crate::interner::InternedSymbol;
use crate::language::{NativeFn, Value};

// ============================================================================
// Environment
// ============================================================================

struct Frame {
    bindings: FxHashMap<InternedSymbol, Value>,
    parent: Option<Environment>,
    /// Only read on the global frame
    warn_policy: WarnPolicy,
}

/// Handle to one frame of the chain.
///
/// Cloning is an `Rc` increment: closures and active calls share frames, and
/// a frame is dropped when the last of them goes away.
#[derive(Clone)]
pub struct Environment {
    frame: Rc<RefCell<Frame>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Create a new, empty global environment
    pub fn new() -> Self {
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                bindings: FxHashMap::default(),
                parent: None,
                warn_policy: WarnPolicy::default(),
            })),
        }
    }

    /// Create a child frame binding `params` positionally to `args`.
    /// Callers check arity first; extra entries on either side are ignored.
    pub fn extend(&self, params: &[InternedSymbol], args: Vec<Value>) -> Self {
        let bindings = params.iter().copied().zip(args).collect();
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                bindings,
                parent: Some(self.clone()),
                warn_policy: WarnPolicy::default(),
            })),
        }
    }

    /// Bind `name` in this frame, shadowing any outer binding.
    pub fn define(&self, name: InternedSymbol, value: Value) {
        self.frame.borrow_mut().bindings.insert(name, value);
    }

    pub fn define_native(&self, name: &str, f: NativeFn) {
        let symbol = InternedSymbol::new(name);
        self.define(symbol, Value::native(f).with_bound(symbol));
    }

    /// Look up a variable, walking up the parent chain
    pub fn lookup(&self, name: InternedSymbol) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let parent = {
                let frame = current.frame.borrow();
                if let Some(value) = frame.bindings.get(&name) {
                    return Some(value.clone());
                }
                frame.parent.clone()
            };
            current = parent?;
        }
    }

    fn global(&self) -> Environment {
        let mut current = self.clone();
        loop {
            let parent = current.frame.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// How top-level sequences treat `warn` errors, as set on the global frame
    pub fn warn_policy(&self) -> WarnPolicy {
        self.global().frame.borrow().warn_policy
    }

    pub fn set_warn_policy(&self, policy: WarnPolicy) {
        self.global().frame.borrow_mut().warn_policy = policy;
    }
}
