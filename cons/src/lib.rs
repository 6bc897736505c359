//! paren runtime - evaluator and primitive library
//!
//! This crate provides the execution side of paren:
//! - Tree-walking evaluator with special forms
//! - Primitive library (list operations, predicates, arithmetic, mutation)
//! - Sessions that run source text against a global environment

pub mod interpreter;
pub mod native;
pub mod primitives;
pub mod session;

// Re-export interpreter entry points
pub use interpreter::{apply, eval, eval_sequence, eval_toplevel};

// Re-export primitive registration
pub use primitives::register_primitives;

pub use session::{Session, SessionConfig, WarnPolicy};
