use danfe::expr::{EvalError, Val};
use danfe::interpreter::{InterpretErr, Interpreter, MAX_CALL_DEPTH};
use danfe::parser::MAX_NESTING;
use pretty_assertions::assert_eq;

fn output(interp: &Interpreter<Vec<u8>>) -> String {
    String::from_utf8(interp.output().clone()).unwrap()
}

#[test]
fn loop_sum() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
sum = 0
i = 0

for i < 100 {     # loop until i is less than 100
    sum = sum + i
    i = i + 1
}

println(sum)      # \"4950\"
",
        )
        .unwrap();

    assert_eq!(output(&interp), "4950\n");
    assert_eq!(interp.get_global("i"), Some(Val::Int(100)));
}

#[test]
fn loop_sum_nepali() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
sum = 0
i = 0

ghum i < 100 {
    sum = sum + i
    i = i + 1
}

dekhauln(sum)
",
        )
        .unwrap();

    assert_eq!(output(&interp), "4950\n");
}

#[test]
fn false_condition_runs_zero_times() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
ran = 0
for 1 > 2 {
    ran = ran + 1
    println(\"never\")
}
",
        )
        .unwrap();

    assert_eq!(interp.get_global("ran"), Some(Val::Int(0)));
    assert_eq!(output(&interp), "");
}

#[test]
fn bare_for_until_break() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
num = 0

for {
    num = num + 2
    if num > 10 {
        break
    }
}

println(num)
",
        )
        .unwrap();

    assert_eq!(output(&interp), "12\n");
}

#[test]
fn continue_skips_rest_of_iteration() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
num = 0

ghum {
    num = num + 1
    yedi num % 2  {  # num % 2 != 0
        xod
    }
    yedi num > 10 {
        todh
    }
    dekhau(num)
}
",
        )
        .unwrap();

    assert_eq!(output(&interp), "2\n4\n6\n8\n10\n");
}

#[test]
fn break_leaves_innermost_loop_only() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
outer = 0
breaks = 0
for {
    outer = outer + 1
    inner = 0
    for {
        inner = inner + 1
        if inner == 3 {
            breaks = breaks + 1
            break
        }
    }
    if outer == 2 {
        break
    }
}
",
        )
        .unwrap();

    assert_eq!(interp.get_global("breaks"), Some(Val::Int(2)));
    assert_eq!(interp.get_global("outer"), Some(Val::Int(2)));
    assert_eq!(interp.get_global("inner"), None);
}

#[test]
fn assignment_writes_through_blocks() {
    let mut interp = Interpreter::with_output(Vec::new());
    let last = interp.run("x = 1; { x = 2 }; x").unwrap();

    assert_eq!(last, Some(Val::Int(2)));
}

#[test]
fn new_names_stay_in_their_block() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
result = 0
{
    local = 40
    result = local + 2
}
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result"), Some(Val::Int(42)));
    assert_eq!(interp.get_global("local"), None);
}

#[test]
fn loop_body_bindings_do_not_leak_between_iterations() {
    let mut interp = Interpreter::with_output(Vec::new());
    let err = interp
        .run(
            "
i = 0
for i < 2 {
    i = i + 1
    if i == 2 {
        seen = local
    }
    local = i
}
",
        )
        .unwrap_err();

    match err {
        InterpretErr::Eval(EvalError::UnboundName { name, .. }) => assert_eq!(&*name, "local"),
        x => panic!("{x:?} should not be reported here."),
    }
    assert_eq!(interp.get_global("i"), Some(Val::Int(2)));
}

#[test]
fn comment() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
result = 6
# result = 42
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result"), Some(Val::Int(6)));
}

#[test]
fn if_without_else() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
result = \"bar\"
if true || false {
    result = \"foo\"
}
other = \"bar\"
yedi sahi && galat {
    other = \"foo\"
}
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result"), Some(Val::Str("foo".into())));
    assert_eq!(interp.get_global("other"), Some(Val::Str("bar".into())));
}

#[test]
fn simple_function() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
fn foo(bar) {
    a = 1
    if a > 1 {
        a = a + 1
    }
    return bar + a
}

result = foo(1)
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result"), Some(Val::Int(2)));
    assert_eq!(interp.get_global("a"), None);
}

#[test]
fn recursion() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
kaam fib(n) {
    yedi n < 2 {
        farkau n
    }
    farkau fib(n - 1) + fib(n - 2)
}

result = fib(15)
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result"), Some(Val::Int(610)));
}

#[test]
fn return_from_inside_loop() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
fn first_square_over(limit) {
    n = 0
    for {
        n = n + 1
        if n * n > limit {
            return n
        }
    }
}

result = first_square_over(50)
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result"), Some(Val::Int(8)));
}

#[test]
fn function_without_return_yields_none() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
fn quiet() {
    x = 1
}
println(quiet())
println(println)
println(quiet)
",
        )
        .unwrap();

    assert_eq!(output(&interp), "none\n<native println>\n<fn quiet>\n");
}

#[test]
fn return_local_function() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
fn returns_fun() {
    fn inner(foo) {
        return foo + 1
    }

    return inner
}

result = returns_fun()(1)
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result"), Some(Val::Int(2)));
}

#[test]
fn closure_shares_captured_frame() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
fn make_counter() {
    count = 0
    fn next() {
        count = count + 1
        return count
    }
    return next
}

a = make_counter()
b = make_counter()
a()
a()
result_a = a()
result_b = b()
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result_a"), Some(Val::Int(3)));
    assert_eq!(interp.get_global("result_b"), Some(Val::Int(1)));
    assert_eq!(interp.get_global("count"), None);
}

#[test]
fn closure_sees_later_global_updates() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
a = \"global\"
fn show_a() {
    return a
}
result1 = show_a()
a = \"changed\"
result2 = show_a()
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result1"), Some(Val::Str("global".into())));
    assert_eq!(interp.get_global("result2"), Some(Val::Str("changed".into())));
}

#[test]
fn integer_arithmetic() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
println(7 / 2)
println(-7 / 2)
println(-7 % 2)
println(2 + 3 * 4 - 1)
println((2 + 3) * 4)
",
        )
        .unwrap();

    assert_eq!(output(&interp), "3\n-3\n-1\n13\n20\n");
}

#[test]
fn strings_and_comparisons() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
println(\"sum: \" + 4950)
println(1 + \"x\")
println(\"abc\" < \"abd\")
println(1 == \"1\")
println(none == khali)
println(!0)
",
        )
        .unwrap();

    assert_eq!(output(&interp), "sum: 4950\n1x\ntrue\nfalse\ntrue\ntrue\n");
}

#[test]
fn logic_short_circuits() {
    let mut interp = Interpreter::with_output(Vec::new());
    let last = interp.run("false && missing() || true").unwrap();

    assert_eq!(last, Some(Val::Bool(true)));
}

#[test]
fn last_expression_value() {
    let mut interp = Interpreter::with_output(Vec::new());
    assert_eq!(interp.run("x = 5").unwrap(), None);
    assert_eq!(interp.run("x + 1").unwrap(), Some(Val::Int(6)));
    assert_eq!(interp.run("x * 2\ny = 1").unwrap(), None);
}

#[test]
fn step_limit_bounds_infinite_loop() {
    let mut interp = Interpreter::with_output(Vec::new()).with_step_limit(1000);
    let err = interp.run("n = 0\nfor {\n n = n + 1\n}").unwrap_err();

    assert!(matches!(
        err,
        InterpretErr::Eval(EvalError::StepLimitExceeded { limit: 1000, .. })
    ));
    assert_eq!(interp.get_global("n"), Some(Val::Int(1000)));
}

#[test]
fn runaway_recursion_is_an_error() {
    let mut interp = Interpreter::with_output(Vec::new());
    let err = interp
        .run("fn down(n) {\n return down(n + 1)\n}\ndown(0)")
        .unwrap_err();

    assert!(matches!(
        err,
        InterpretErr::Eval(EvalError::CallDepthExceeded { limit: MAX_CALL_DEPTH, .. })
    ));
}

#[test]
fn recursion_up_to_call_depth_limit() {
    let mut interp = Interpreter::with_output(Vec::new());
    interp
        .run(
            "
fn down(n) {
    if n == 0 {
        return 0
    }
    return down(n - 1) + 1
}
result = down(190)
",
        )
        .unwrap();

    assert_eq!(interp.get_global("result"), Some(Val::Int(190)));
}

#[test]
fn deeply_nested_program_runs() {
    // Blocks and parentheses share one nesting budget.
    let depth = MAX_NESTING / 2 - 1;
    let code = format!(
        "x = 0\n{}x = {}1{}\n{}",
        "{".repeat(depth),
        "(".repeat(depth),
        ")".repeat(depth),
        "}".repeat(depth)
    );
    let mut interp = Interpreter::with_output(Vec::new());
    interp.run(&code).unwrap();

    assert_eq!(interp.get_global("x"), Some(Val::Int(1)));
}

#[test]
fn minus_on_next_line_is_a_new_statement() {
    let mut interp = Interpreter::with_output(Vec::new());
    let last = interp.run("x = 5\n-1\ny = 2\nz = x -\n 1\n-z").unwrap();

    assert_eq!(interp.get_global("x"), Some(Val::Int(5)));
    assert_eq!(interp.get_global("z"), Some(Val::Int(4)));
    assert_eq!(last, Some(Val::Int(-4)));
}
