//! Top-level evaluation sessions.
//!
//! A session owns the global environment and is the boundary at which
//! errors surface to the caller. Its warn policy is installed on the global
//! frame, so files pulled in by `load` follow it too.

use std::fs;
use std::path::{Path, PathBuf};

pub use paren::WarnPolicy;
use paren::{Environment, LispError, Value, parse_source};

use crate::interpreter::eval_toplevel;
use crate::primitives::register_primitives;

const HISTORY_FILE: &str = ".cons_history";

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub warn_policy: WarnPolicy,
    /// REPL history file; `None` disables history
    pub history: Option<PathBuf>,
}

impl SessionConfig {
    /// `~/.cons_history`, when a home directory exists
    pub fn default_history_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(HISTORY_FILE))
    }
}

pub struct Session {
    env: Environment,
    config: SessionConfig,
}

impl Session {
    /// A session with every primitive bound in its global environment.
    pub fn new(config: SessionConfig) -> Self {
        let env = Environment::new();
        env.set_warn_policy(config.warn_policy);
        register_primitives(&env);
        Session { env, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Read and evaluate every form in `input`, returning the last result.
    pub fn run_source(&self, input: &str, file: &str) -> Result<Value, LispError> {
        let forms = parse_source(input, file)?;
        eval_toplevel(&forms, &self.env)
    }

    pub fn run_file(&self, path: &Path) -> Result<Value, LispError> {
        let source = fs::read_to_string(path).map_err(|e| {
            LispError::internal(format!("failed to read '{}': {e}", path.display()))
        })?;
        log::debug!("running {}", path.display());
        self.run_source(&source, &path.to_string_lossy())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
