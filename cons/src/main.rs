use std::path::PathBuf;
use std::process;

use clap::Parser;
use cons::{Session, SessionConfig, WarnPolicy};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

const REPL_SOURCE: &str = "<repl>";

/// cons runs paren programs, or starts an interactive session when no file
/// is given.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Program to run. The result of its last form is printed.
    file: Option<PathBuf>,

    /// Log `warn` errors and continue with the next top-level form.
    #[arg(long)]
    keep_going_on_warn: bool,

    /// Do not read or write REPL history.
    #[arg(long, conflicts_with = "history")]
    no_history: bool,

    /// REPL history file (defaults to ~/.cons_history).
    #[arg(long, value_name = "PATH")]
    history: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> SessionConfig {
        let warn_policy = if self.keep_going_on_warn {
            WarnPolicy::Continue
        } else {
            WarnPolicy::Abort
        };
        let history = if self.no_history {
            None
        } else {
            self.history
                .clone()
                .or_else(SessionConfig::default_history_path)
        };
        SessionConfig {
            warn_policy,
            history,
        }
    }
}

fn repl(session: &Session) -> rustyline::Result<()> {
    let mut editor = DefaultEditor::new()?;
    if let Some(path) = &session.config().history {
        // A missing history file is normal on first run
        if editor.load_history(path).is_err() {
            log::debug!("no history at {}", path.display());
        }
    }

    println!("paren REPL");
    println!("Type expressions to evaluate, or (exit) to quit");
    println!();

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        editor.add_history_entry(input)?;

        if input == "(exit)" {
            break;
        }

        match session.run_source(input, REPL_SOURCE) {
            Ok(result) => println!("{result}"),
            Err(e) => eprintln!("{e}"),
        }
    }

    if let Some(path) = &session.config().history {
        if let Err(e) = editor.save_history(path) {
            log::warn!("could not save history to {}: {e}", path.display());
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let session = Session::new(cli.config());

    match &cli.file {
        Some(path) => match session.run_file(path) {
            Ok(result) => println!("{result}"),
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => {
            if let Err(e) = repl(&session) {
                eprintln!("repl: {e}");
                process::exit(1);
            }
        }
    }
}
