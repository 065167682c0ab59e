mod common;

use common::*;
use dachs_lang::ast::Expression;
use dachs_lang::typechecker::types::Type;
use dachs_lang::typechecker::TypeCheckError;

// func foo(i : int); end
// func main; foo(1.0); end
#[test]
fn call_with_wrong_argument_type_is_not_found() {
    let program = program(vec![
        func(func_def("foo", vec![param("i", Some("int"), 1)], vec![], 1)),
        main_fn(vec![call_stmt("foo", vec![float(1.0, 4)], 4)], 3),
    ]);

    let errors = expect_errors(&program);
    let found = errors.iter().any(|e| match e {
        TypeCheckError::FunctionNotFound(inner, _) => inner.signature == "foo(float)",
        _ => false,
    });
    assert!(found, "expected foo(float) not to resolve: {errors:?}");
}

// The overload winner does not depend on declaration order.
#[test]
fn overload_resolution_is_order_independent() {
    let run = |int_first: bool| {
        let int_overload = func_def("pick", vec![param("v", Some("int"), 1)], vec![], 1);
        let float_overload = func_def("pick", vec![param("v", Some("float"), 2)], vec![], 2);
        let call_expr = call("pick", vec![int(7, 5)], 5);

        let defs = if int_first {
            vec![func(int_overload), func(float_overload)]
        } else {
            vec![func(float_overload), func(int_overload)]
        };
        let mut defs = defs;
        defs.push(main_fn(
            vec![dachs_lang::ast::Statement::Expression(call_expr.clone())],
            4,
        ));

        analyze(&program(defs)).expect("overloaded call must analyze");

        let Expression::Invocation(inv) = &call_expr else {
            unreachable!()
        };
        let callee = inv.callee.borrow().upgrade().unwrap();
        let param_type = callee.borrow().params[0].borrow().ty.clone();
        param_type.unwrap()
    };

    assert_eq!(run(true), Type::int());
    assert_eq!(run(false), Type::int());
}

// A template parameter scores weaker than an exact match.
#[test]
fn exact_match_beats_template() {
    let template = func_def("f", vec![param("v", None, 1)], vec![], 1);
    let exact = func_def("f", vec![param("v", Some("int"), 2)], vec![], 2);
    let call_expr = call("f", vec![int(1, 5)], 5);

    let program = program(vec![
        func(template.clone()),
        func(exact),
        main_fn(
            vec![dachs_lang::ast::Statement::Expression(call_expr.clone())],
            4,
        ),
    ]);
    analyze(&program).expect("must analyze");

    // The template was never instantiated; the exact overload won.
    assert!(template.instantiated.borrow().is_empty());
}

// f(_, b : int) and f(a : int, _) tie on f(1, 2).
#[test]
fn ambiguous_call_is_rejected() {
    let program = program(vec![
        func(func_def(
            "f",
            vec![param("a", None, 1), param("b", Some("int"), 1)],
            vec![],
            1,
        )),
        func(func_def(
            "f",
            vec![param("a", Some("int"), 2), param("b", None, 2)],
            vec![],
            2,
        )),
        main_fn(vec![call_stmt("f", vec![int(1, 5), int(2, 5)], 5)], 4),
    ]);

    let errors = expect_errors(&program);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeCheckError::AmbiguousCall(..))),
        "{errors:?}"
    );
}

// Two identical signatures in the same scope fail the forward pass.
#[test]
fn duplicate_overloads_are_rejected() {
    let program = program(vec![
        func(func_def("dup", vec![param("a", Some("int"), 1)], vec![], 1)),
        func(func_def("dup", vec![param("a", Some("int"), 2)], vec![], 2)),
        main_fn(vec![], 4),
    ]);

    match analyze(&program) {
        Err(dachs_lang::CheckError::Semantic(failure)) => {
            assert_eq!(failure.pass, "forward symbol resolution");
            assert!(failure
                .errors
                .iter()
                .any(|e| matches!(e, TypeCheckError::RedefinedFunction(..))));
        }
        other => panic!("expected forward failure, got {other:?}"),
    }
}

// Template positions collide only with template positions.
#[test]
fn template_and_concrete_overloads_coexist() {
    let program = program(vec![
        func(func_def("g", vec![param("a", None, 1)], vec![], 1)),
        func(func_def("g", vec![param("a", Some("int"), 2)], vec![], 2)),
        main_fn(vec![], 4),
    ]);
    analyze(&program).expect("no duplication expected");
}

#[test]
fn missing_main_is_an_error() {
    let program = program(vec![func(func_def("helper", vec![], vec![], 1))]);
    let errors = expect_errors(&program);
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::MissingMainFunction(..))));
}

#[test]
fn overloaded_main_is_rejected() {
    let program = program(vec![
        main_fn(vec![], 1),
        func(func_def("main", vec![param("x", Some("int"), 3)], vec![], 3)),
    ]);
    let errors = expect_errors(&program);
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::MainCannotBeOverloaded(..))));
}

#[test]
fn invoking_main_is_rejected() {
    let program = program(vec![
        func(func_def("g", vec![], vec![call_stmt("main", vec![], 2)], 1)),
        main_fn(vec![], 4),
    ]);
    let errors = expect_errors(&program);
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::CannotInvokeMain(..))));
}

#[test]
fn proc_cannot_return_a_value() {
    let body = vec![ret(vec![int(42, 2)], 2)];
    let proc = dachs_lang::ast::FunctionDefinition::proc("p", vec![], block(body, 1), sp(1, 1));
    let program = program(vec![func(proc), main_fn(vec![], 4)]);
    let errors = expect_errors(&program);
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::ProcReturnsValue(..))));
}

#[test]
fn query_function_must_return_bool() {
    let good = func_def("even?", vec![param("n", Some("int"), 1)], vec![ret(vec![boolean(true, 2)], 2)], 1);
    let program_ok = program(vec![
        func(good),
        main_fn(vec![call_stmt("even?", vec![int(2, 5)], 5)], 4),
    ]);
    analyze(&program_ok).expect("bool query must analyze");

    let bad = func_def("odd?", vec![param("n", Some("int"), 1)], vec![ret(vec![int(1, 2)], 2)], 1);
    let program_bad = program(vec![func(bad), main_fn(vec![], 4)]);
    let errors = expect_errors(&program_bad);
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::QueryFuncMustReturnBool(..))));
}
