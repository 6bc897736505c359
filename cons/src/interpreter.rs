use paren::{
    AtomType, Datum, Environment, InternedSymbol, LispError, Value, WarnPolicy, list_to_vec,
    vec_to_list,
};

// ============================================================================
// Special Forms
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialForm {
    Quote,
    If,
    Cond,
    Define,
    Lambda,
    Begin,
}

impl SpecialForm {
    fn from_symbol(name: InternedSymbol) -> Option<Self> {
        name.with_str(|s| match s {
            "quote" => Some(SpecialForm::Quote),
            "if" => Some(SpecialForm::If),
            "cond" => Some(SpecialForm::Cond),
            "define" => Some(SpecialForm::Define),
            "lambda" => Some(SpecialForm::Lambda),
            "begin" => Some(SpecialForm::Begin),
            _ => None,
        })
    }
}

/// Elements of the list following a form's head.
fn operands(rest: Option<Value>) -> Result<Vec<Value>, LispError> {
    match rest {
        None => Ok(Vec::new()),
        Some(list) => list_to_vec(&list),
    }
}

fn expect_operands(
    form: &str,
    operands: &[Value],
    min: usize,
    max: usize,
) -> Result<(), LispError> {
    if operands.len() < min || operands.len() > max {
        let expected = if min == max {
            format!("{min}")
        } else if max == usize::MAX {
            format!("at least {min}")
        } else {
            format!("{min}-{max}")
        };
        return Err(LispError::arity(format!(
            "{form}: expected {expected} operand{}, got {}",
            if min == 1 && max == 1 { "" } else { "s" },
            operands.len()
        )));
    }
    Ok(())
}

fn expect_bool(form: &str, value: &Value) -> Result<bool, LispError> {
    value.as_bool().ok_or_else(|| {
        LispError::type_error(format!(
            "{form}: test must be a boolean, got {}",
            value.type_name()
        ))
    })
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluate a single form.
///
/// Errors that carry no location yet are tagged with the location of the
/// innermost form being evaluated when they were raised.
pub fn eval(expr: &Value, env: &Environment) -> Result<Value, LispError> {
    eval_form(expr, env).map_err(|e| e.locate(&expr.provenance))
}

/// Evaluate forms in order against the same environment, returning the
/// last result (or `()` for no forms).
pub fn eval_sequence(forms: &[Value], env: &Environment) -> Result<Value, LispError> {
    let mut result = Value::null();
    for form in forms {
        result = eval(form, env)?;
    }
    Ok(result)
}

/// Evaluate the forms of a source file or REPL line. Like `eval_sequence`,
/// except that a `warn` error is logged and skipped when the environment's
/// warn policy is `Continue`.
pub fn eval_toplevel(forms: &[Value], env: &Environment) -> Result<Value, LispError> {
    let policy = env.warn_policy();
    let mut result = Value::null();
    for form in forms {
        match eval(form, env) {
            Ok(value) => result = value,
            Err(e) if !e.is_fatal() && policy == WarnPolicy::Continue => {
                log::warn!("{e}");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(result)
}

fn eval_form(expr: &Value, env: &Environment) -> Result<Value, LispError> {
    match &expr.datum {
        // Symbol lookup
        Datum::Atom(AtomType::Symbol(name)) => {
            env.lookup(*name).ok_or_else(|| LispError::unbound(name))
        }

        // List evaluation
        Datum::Cons(cell) => {
            let (head, rest) = {
                let cell = cell.borrow();
                (cell.car.clone(), cell.cdr.clone())
            };

            if let Some(form) = head.as_symbol().and_then(SpecialForm::from_symbol) {
                return eval_special(form, expr, operands(rest)?, env);
            }

            let func = eval(&head, env)?;

            // Arguments are evaluated left to right in the caller's environment
            let mut args = Vec::new();
            for arg in operands(rest)? {
                args.push(eval(&arg, env)?);
            }

            apply(&func, args, env)
        }

        // Everything else is self-evaluating
        Datum::Nil
        | Datum::Atom(_)
        | Datum::Lambda(_)
        | Datum::NativeFn(_)
        | Datum::Hash(_) => Ok(expr.clone()),
    }
}

/// Apply a function value to already-evaluated arguments.
pub fn apply(func: &Value, args: Vec<Value>, env: &Environment) -> Result<Value, LispError> {
    match &func.datum {
        Datum::NativeFn(native) => native(env, &vec_to_list(args)),
        Datum::Lambda(lambda) => {
            if args.len() != lambda.params.len() {
                return Err(LispError::arity(format!(
                    "lambda: expected {} argument{}, got {}",
                    lambda.params.len(),
                    if lambda.params.len() == 1 { "" } else { "s" },
                    args.len()
                )));
            }

            let frame = lambda.env.extend(&lambda.params, args);
            eval_sequence(&lambda.body, &frame)
        }
        _ => Err(LispError::type_error(format!(
            "cannot apply {}: {func}",
            func.type_name()
        ))),
    }
}

fn eval_special(
    form: SpecialForm,
    expr: &Value,
    operands: Vec<Value>,
    env: &Environment,
) -> Result<Value, LispError> {
    match form {
        SpecialForm::Quote => {
            expect_operands("quote", &operands, 1, 1)?;
            Ok(operands[0].clone())
        }

        SpecialForm::If => {
            expect_operands("if", &operands, 2, 3)?;
            let test = eval(&operands[0], env)?;
            if expect_bool("if", &test)? {
                eval(&operands[1], env)
            } else if let Some(alternative) = operands.get(2) {
                eval(alternative, env)
            } else {
                Ok(Value::null())
            }
        }

        SpecialForm::Cond => {
            for clause in &operands {
                let parts = list_to_vec(clause)?;
                let Some((test_expr, body)) = parts.split_first() else {
                    return Err(LispError::type_error("cond: empty clause"));
                };

                let is_else = test_expr.as_symbol().is_some_and(|s| s.is("else"));
                let test = if is_else {
                    Value::bool(true)
                } else {
                    eval(test_expr, env)?
                };

                if expect_bool("cond", &test)? {
                    if body.is_empty() {
                        return Ok(test);
                    }
                    return eval_sequence(body, env);
                }
            }
            Ok(Value::null())
        }

        SpecialForm::Define => {
            expect_operands("define", &operands, 2, 2)?;
            let name = operands[0].as_symbol().ok_or_else(|| {
                LispError::type_error(format!(
                    "define: name must be a symbol, got {}",
                    operands[0].type_name()
                ))
            })?;

            let value = eval(&operands[1], env)?.with_bound(name);
            log::debug!("define {name} as {}", value.type_name());
            env.define(name, value.clone());
            Ok(value)
        }

        SpecialForm::Lambda => {
            expect_operands("lambda", &operands, 2, usize::MAX)?;

            // Extract parameter names
            let mut params: Vec<InternedSymbol> = Vec::new();
            for param in list_to_vec(&operands[0])? {
                let Some(name) = param.as_symbol() else {
                    return Err(LispError::type_error(format!(
                        "lambda: parameters must be symbols, got {}",
                        param.type_name()
                    ))
                    .locate(&param.provenance));
                };
                if params.contains(&name) {
                    return Err(LispError::type_error(format!(
                        "lambda: duplicate parameter {name}"
                    ))
                    .locate(&param.provenance));
                }
                params.push(name);
            }

            let body = operands[1..].to_vec();
            let mut provenance = expr.provenance.clone();
            provenance.bound = None;
            Ok(Value::lambda(params, body, env.clone()).with_provenance(provenance))
        }

        SpecialForm::Begin => eval_sequence(&operands, env),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paren::{ErrorKind, NumericType, equal, parse};

    fn run(input: &str) -> Result<Value, LispError> {
        let env = Environment::new();
        eval_sequence(&parse(input)?, &env)
    }

    #[test]
    fn test_self_evaluating() {
        assert_eq!(run("42").unwrap().as_number(), Some(NumericType::Int(42)));
        assert_eq!(run("2.5").unwrap().as_number(), Some(NumericType::Float(2.5)));
        assert_eq!(run("#f").unwrap().as_bool(), Some(false));
        assert_eq!(run("\"hi\"").unwrap().as_str(), Some("hi"));
        assert!(run("()").unwrap().is_nil());
    }

    #[test]
    fn test_empty_sequence_is_null() {
        assert!(eval_sequence(&[], &Environment::new()).unwrap().is_nil());
    }

    #[test]
    fn test_quote() {
        assert_eq!(run("'(a b . c)").unwrap().to_string(), "(a b . c)");
        assert_eq!(run("(quote x)").unwrap().to_string(), "x");
    }

    #[test]
    fn test_quote_arity() {
        let err = run("(quote a b)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);
    }

    #[test]
    fn test_unbound_symbol() {
        let err = run("nowhere").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnboundSymbol);
        assert_eq!(err.location.map(|l| (l.row, l.col)), Some((1, 1)));
    }

    #[test]
    fn test_define_and_sequence() {
        let result = run("(define x 5) (define y x) y").unwrap();
        assert_eq!(result.as_number(), Some(NumericType::Int(5)));
    }

    #[test]
    fn test_define_records_bound_name() {
        let result = run("(define answer 42) answer").unwrap();
        assert!(result.provenance.bound.unwrap().is("answer"));
    }

    #[test]
    fn test_if_requires_boolean() {
        assert_eq!(run("(if #t 1 2)").unwrap().as_number(), Some(NumericType::Int(1)));
        assert_eq!(run("(if #f 1 2)").unwrap().as_number(), Some(NumericType::Int(2)));
        assert!(run("(if #f 1)").unwrap().is_nil());
        assert_eq!(run("(if 0 1 2)").unwrap_err().kind, ErrorKind::Type);
    }

    #[test]
    fn test_cond() {
        let result = run("(cond (#f 'no) (else 'yes))").unwrap();
        assert_eq!(result.to_string(), "yes");
        assert!(run("(cond (#f 1))").unwrap().is_nil());
    }

    #[test]
    fn test_lambda_application() {
        let result = run("((lambda (x y) y) 1 2)").unwrap();
        assert_eq!(result.as_number(), Some(NumericType::Int(2)));
    }

    #[test]
    fn test_lambda_arity_error() {
        let err = run("((lambda (x) x) 1 2)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);
        assert_eq!(err.message, "lambda: expected 1 argument, got 2");
    }

    #[test]
    fn test_lambda_parameters_must_be_symbols() {
        assert_eq!(run("(lambda (1) 1)").unwrap_err().kind, ErrorKind::Type);
        assert_eq!(run("(lambda (a a) a)").unwrap_err().kind, ErrorKind::Type);
    }

    #[test]
    fn test_closures_capture_environment() {
        let result = run(
            "(define make-const (lambda (v) (lambda () v)))
             (define one (make-const 1))
             (define two (make-const 2))
             (one)",
        )
        .unwrap();
        assert_eq!(result.as_number(), Some(NumericType::Int(1)));
    }

    #[test]
    fn test_fresh_frame_per_call() {
        let result = run(
            "(define pick (lambda (a b) (if b a ((lambda (a) a) 'inner))))
             (define outer (pick 'outer #t))
             (pick 'ignored #f)
             outer",
        )
        .unwrap();
        assert_eq!(result.to_string(), "outer");
    }

    #[test]
    fn test_applying_non_function() {
        let err = run("(1 2)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_toplevel_follows_warn_policy() {
        let env = Environment::new();
        env.define_native("fail", |_, _| Err(LispError::warning("fail: warned")));
        let forms = parse("(fail) 'next").unwrap();

        let err = eval_toplevel(&forms, &env).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Warn);

        env.set_warn_policy(WarnPolicy::Continue);
        let result = eval_toplevel(&forms, &env).unwrap();
        assert_eq!(result.to_string(), "next");
    }

    #[test]
    fn test_begin() {
        let result = run("(begin 1 2 3)").unwrap();
        assert!(equal(&result, &Value::int(3)));
        assert!(run("(begin)").unwrap().is_nil());
    }

    #[test]
    fn test_error_location_points_at_innermost_form() {
        let err = run("(begin\n  (undefined-fn 1))").unwrap_err();
        let location = err.location.unwrap();
        assert_eq!((location.row, location.col), (2, 4));
    }
}
