mod common;

use common::*;
use dachs_lang::ast::{DoStmt, Statement};
use dachs_lang::typechecker::TypeCheckError;

// func main
//     let a := 42 in println(a)
//     println(a)
// end
#[test]
fn let_binding_goes_out_of_scope() {
    let program = program(vec![main_fn(
        vec![
            let_stmt(
                vec![("a", int(42, 2))],
                call_stmt("println", vec![var("a", 2)], 2),
                2,
            ),
            call_stmt("println", vec![var("a", 3)], 3),
        ],
        1,
    )]);

    let errors = expect_errors(&program);
    assert!(
        errors.iter().any(|e| match e {
            TypeCheckError::UndefinedSymbol(inner, _) => inner.name == "a",
            _ => false,
        }),
        "{errors:?}"
    );
}

// func main
//     do
//         a := 42
//         println(a)
//     end
//     println(a)
// end
#[test]
fn do_block_scopes_its_bindings() {
    let program = program(vec![main_fn(
        vec![
            DoStmt::new(
                block(
                    vec![
                        init("a", int(42, 3), 3),
                        call_stmt("println", vec![var("a", 4)], 4),
                    ],
                    2,
                ),
                sp(2, 1),
            ),
            call_stmt("println", vec![var("a", 6)], 6),
        ],
        1,
    )]);

    let errors = expect_errors(&program);
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::UndefinedSymbol(..))));
}

// Shadowing across nested scopes is fine; redefinition in the same
// scope is not.
#[test]
fn shadowing_is_allowed_redefinition_is_not() {
    let shadowing = program(vec![main_fn(
        vec![
            init("x", int(1, 2), 2),
            DoStmt::new(block(vec![init("x", boolean(true, 4), 4)], 3), sp(3, 1)),
        ],
        1,
    )]);
    analyze(&shadowing).expect("shadowing must analyze");

    let redefinition = program(vec![main_fn(
        vec![init("x", int(1, 2), 2), init("x", int(2, 3), 3)],
        1,
    )]);
    let errors = expect_errors(&redefinition);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeCheckError::RedefinedSymbol(..))),
        "{errors:?}"
    );
}

// Forward references work: main may call a function declared after it.
#[test]
fn forward_references_resolve() {
    let program = program(vec![
        main_fn(vec![call_stmt("later", vec![int(1, 2)], 2)], 1),
        func(func_def("later", vec![param("x", Some("int"), 4)], vec![], 4)),
    ]);
    analyze(&program).expect("forward reference must analyze");
}

// `_` on the left of an assignment resolves to nothing and is never a
// symbol clash.
#[test]
fn underscore_is_ignored() {
    let program = program(vec![main_fn(
        vec![
            init("x", int(1, 2), 2),
            assign(var("_", 3), int(2, 3), 3),
            assign(var("_", 4), boolean(true, 4), 4),
        ],
        1,
    )]);
    analyze(&program).expect("underscore must analyze");
}

#[test]
fn undefined_symbol_is_reported() {
    let program = program(vec![main_fn(
        vec![Statement::Expression(var("nowhere", 2))],
        1,
    )]);
    let errors = expect_errors(&program);
    assert!(errors.iter().any(|e| match e {
        TypeCheckError::UndefinedSymbol(inner, _) => inner.name == "nowhere",
        _ => false,
    }));
}
