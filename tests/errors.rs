use danfe::expr::{EvalError, Val};
use danfe::interpreter::{InterpretErr, Interpreter};
use danfe::keyword::Keyword;
use danfe::parser::ParseErrType;
use danfe::scanner::LexError;
use danfe::token::Position;
use pretty_assertions::assert_eq;

fn run_err(code: &str) -> InterpretErr {
    let mut interp = Interpreter::with_output(Vec::new());
    interp.run(code).unwrap_err()
}

#[test]
fn scopes_separated() {
    let err = run_err(
        "
{
    x = \"foo bar\"
    y = \"baz\"
    println(\"x: \" + x + \" y: \" + y)
}

{
    x = \"bar\"
    println(x)
    z = x + y
}
",
    );

    match err {
        InterpretErr::Eval(EvalError::UnboundName { name, pos }) => {
            assert_eq!(&*name, "y");
            assert_eq!(pos, Position::new(11, 13));
        }
        x => panic!("{x:?} should not be reported here."),
    }
}

#[test]
fn unexpected_character() {
    let err = run_err("x = 1\ny = $");
    assert!(matches!(
        err,
        InterpretErr::Lex(LexError::UnexpectedCharacter { found: '$', .. })
    ));
    assert_eq!(err.pos(), Some(Position::new(2, 5)));
    assert_eq!(
        err.to_string(),
        "lex error: [line 2, column 5] Unexpected character '$'."
    );
}

#[test]
fn integer_literal_too_large() {
    let err = run_err("x = 99999999999999999999");
    assert!(matches!(err, InterpretErr::Lex(LexError::OutOfRange { .. })));
}

#[test]
fn lex_error_runs_nothing() {
    let mut interp = Interpreter::with_output(Vec::new());
    assert!(interp.run("println(1)\n\"open").is_err());
    assert!(interp.output().is_empty());
}

#[test]
fn parse_error_runs_nothing() {
    let mut interp = Interpreter::with_output(Vec::new());
    let err = interp.run("x = 1\nprintln(x)\nbreak").unwrap_err();

    match err {
        InterpretErr::Parse(e) => {
            assert_eq!(e.data, ParseErrType::LoopControlOutsideLoop(Keyword::Break));
        }
        x => panic!("{x:?} should not be reported here."),
    }
    assert!(interp.output().is_empty());
    assert_eq!(interp.get_global("x"), None);
}

#[test]
fn continue_outside_loop_names_spelling() {
    let err = run_err("xod");
    assert_eq!(
        err.to_string(),
        "parse error: [line 1, column 1] 'xod' outside of a loop."
    );
}

#[test]
fn divide_by_zero() {
    let err = run_err("zero = 0\nx = 10 / zero");
    match err {
        InterpretErr::Eval(EvalError::DivideByZero { pos }) => {
            assert_eq!(pos, Position::new(2, 8));
        }
        x => panic!("{x:?} should not be reported here."),
    }

    assert!(matches!(
        run_err("x = 10 % 0"),
        InterpretErr::Eval(EvalError::DivideByZero { .. })
    ));
}

#[test]
fn not_callable() {
    let err = run_err("x = 5\nx(1)");
    match err {
        InterpretErr::Eval(EvalError::NotCallable { ty, pos }) => {
            assert_eq!(ty, "int");
            assert_eq!(pos, Position::new(2, 1));
        }
        x => panic!("{x:?} should not be reported here."),
    }
}

#[test]
fn type_mismatch() {
    let err = run_err("x = true - 1");
    assert_eq!(
        err.to_string(),
        "runtime error: [line 1, column 10] Operator '-' cannot be applied to bool and int."
    );

    assert!(matches!(
        run_err("x = -\"a\""),
        InterpretErr::Eval(EvalError::TypeMismatch { .. })
    ));
    assert!(matches!(
        run_err("x = 1 < \"a\""),
        InterpretErr::Eval(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn overflow() {
    assert!(matches!(
        run_err("x = 9223372036854775807 + 1"),
        InterpretErr::Eval(EvalError::Overflow { .. })
    ));
    assert!(matches!(
        run_err("x = -9223372036854775807 - 2"),
        InterpretErr::Eval(EvalError::Overflow { .. })
    ));
}

#[test]
fn wrong_argument_count() {
    let err = run_err("fn f(a, b) {\n return a\n}\nf(1)");
    assert!(matches!(
        err,
        InterpretErr::Eval(EvalError::WrongArgumentCount {
            expected: 2,
            got: 1,
            ..
        })
    ));

    assert!(matches!(
        run_err("println(1, 2)"),
        InterpretErr::Eval(EvalError::WrongArgumentCount {
            expected: 1,
            got: 2,
            ..
        })
    ));
}

#[test]
fn evaluation_stops_at_first_error() {
    let mut interp = Interpreter::with_output(Vec::new());
    let err = interp
        .run("println(\"before\")\nx = missing\nprintln(\"after\")")
        .unwrap_err();

    assert!(matches!(err, InterpretErr::Eval(EvalError::UnboundName { .. })));
    assert_eq!(String::from_utf8(interp.output().clone()).unwrap(), "before\n");
}

#[test]
fn same_input_same_error() {
    let code = "i = 0\nfor i < 3 {\n i = i + 1\n}\ny = i / (i - 3)";
    let first = run_err(code).to_string();
    let second = run_err(code).to_string();
    assert_eq!(first, second);
}

#[test]
fn reserved_words_cannot_be_rebound() {
    assert!(matches!(run_err("ghum = 1"), InterpretErr::Parse(_)));
    assert!(matches!(run_err("println = 1"), InterpretErr::Parse(_)));

    let mut interp = Interpreter::with_output(Vec::new());
    interp.run("value = sahi").unwrap();
    assert_eq!(interp.get_global("value"), Some(Val::Bool(true)));
}

#[test]
fn nesting_too_deep() {
    let code = format!("x = {}1{}", "(".repeat(2000), ")".repeat(2000));
    match run_err(&code) {
        InterpretErr::Parse(e) => assert_eq!(e.data, ParseErrType::NestingTooDeep),
        x => panic!("{x:?} should not be reported here."),
    }

    let blocks = format!("{}{}", "ghum {".repeat(1000), "}".repeat(1000));
    assert!(run_err(&blocks).to_string().ends_with("Nesting deeper than 256 levels."));
}
