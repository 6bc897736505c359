use std::fs;
use std::path::PathBuf;

use cons::{Session, SessionConfig, WarnPolicy};
use paren::ErrorKind;

// Helper function to write a temp file that is removed on drop
struct TempLisp(PathBuf);

impl TempLisp {
    fn new(content: &str) -> Self {
        let path = std::env::temp_dir().join(format!("paren_load_{}.lisp", rand::random::<u32>()));
        fs::write(&path, content).unwrap();
        TempLisp(path)
    }

    fn path_str(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl Drop for TempLisp {
    fn drop(&mut self) {
        fs::remove_file(&self.0).ok();
    }
}

fn load_expr(path: &str) -> String {
    format!("(load \"{}\")", path.replace('\\', "\\\\"))
}

#[test]
fn test_load_returns_last_result() {
    let file = TempLisp::new("(define a 1)\n(define b 2)\n(cons a b)\n");
    let session = Session::default();
    let result = session.run_source(&load_expr(&file.path_str()), "<test>").unwrap();
    assert_eq!(result.to_string(), "(1 . 2)");
}

#[test]
fn test_load_defines_in_callers_environment() {
    let file = TempLisp::new("(define loaded-value 'from-file)");
    let session = Session::default();
    let source = format!("{} loaded-value", load_expr(&file.path_str()));
    let result = session.run_source(&source, "<test>").unwrap();
    assert_eq!(result.to_string(), "from-file");
}

#[test]
fn test_loaded_values_remember_their_file() {
    let file = TempLisp::new("\n(define f (lambda () 1))");
    let session = Session::default();
    let source = format!("{} (inspect f)", load_expr(&file.path_str()));
    let described = session.run_source(&source, "<test>").unwrap().to_string();
    let expected = format!("declared at {}:2:11", file.path_str());
    assert!(described.contains(&expected), "got {described}");
}

#[test]
fn test_load_continues_past_warn_when_asked() {
    let file = TempLisp::new("(warn #f)\n(define after-warn 1)");
    let session = Session::new(SessionConfig {
        warn_policy: WarnPolicy::Continue,
        history: None,
    });
    let source = format!("{} after-warn", load_expr(&file.path_str()));
    let result = session.run_source(&source, "<test>").unwrap();
    assert_eq!(result.to_string(), "1");
}

#[test]
fn test_load_stops_at_warn_by_default() {
    let file = TempLisp::new("(warn #f)\n(define after-warn 1)");
    let session = Session::default();
    let err = session
        .run_source(&load_expr(&file.path_str()), "<test>")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Warn);
    assert!(session.run_source("after-warn", "<test>").is_err());
}

#[test]
fn test_load_empty_file_is_null() {
    let file = TempLisp::new("; nothing but a comment\n");
    let session = Session::default();
    let result = session.run_source(&load_expr(&file.path_str()), "<test>").unwrap();
    assert!(result.is_nil());
}

#[test]
fn test_load_parse_error_points_into_file() {
    let file = TempLisp::new("(cons 1\n");
    let session = Session::default();
    let err = session
        .run_source(&load_expr(&file.path_str()), "<test>")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert_eq!(&*err.location.unwrap().file, file.path_str());
}

#[test]
fn test_load_missing_file() {
    let session = Session::default();
    let err = session
        .run_source("(load \"/no/such/dir/missing.lisp\")", "<test>")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
    assert!(err.message.starts_with("load: failed to read"));
}

#[test]
fn test_load_requires_string() {
    let session = Session::default();
    let err = session.run_source("(load 'file)", "<test>").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn test_run_file() {
    let file = TempLisp::new("(+ 1 2)\n(+ 3 4.5)");
    let session = Session::default();
    let result = session.run_file(&file.0).unwrap();
    assert_eq!(result.to_string(), "7.5");
}
