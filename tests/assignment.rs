mod common;

use common::*;
use dachs_lang::ast::{AssignmentStmt, Expression};
use dachs_lang::typechecker::TypeCheckError;

// func main
//     var i := 42
//     i = "foo"
// end
#[test]
fn assignment_type_mismatch_is_rejected() {
    let program = program(vec![main_fn(
        vec![
            init_var("i", int(42, 2), 2),
            assign(var("i", 3), string("foo", 3), 3),
        ],
        1,
    )]);

    let errors = expect_errors(&program);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeCheckError::TypeMismatch(..))),
        "{errors:?}"
    );
}

#[test]
fn immutable_binding_cannot_be_reassigned() {
    let program = program(vec![main_fn(
        vec![init("i", int(42, 2), 2), assign(var("i", 3), int(0, 3), 3)],
        1,
    )]);

    let errors = expect_errors(&program);
    assert!(errors.iter().any(|e| match e {
        TypeCheckError::ImmutableReassign(inner, _) => inner.name == "i",
        _ => false,
    }));
}

#[test]
fn mutable_binding_can_be_reassigned() {
    let program = program(vec![main_fn(
        vec![init_var("i", int(1, 2), 2), assign(var("i", 3), int(2, 3), 3)],
        1,
    )]);
    analyze(&program).expect("mutable reassignment must analyze");
}

// a, b = 1, 2 in parallel.
#[test]
fn parallel_assignment_checks_each_pair() {
    let program = program(vec![main_fn(
        vec![
            init_var("a", int(1, 2), 2),
            init_var("b", int(2, 3), 3),
            AssignmentStmt::new(
                vec![var("a", 4), var("b", 4)],
                vec![int(3, 4), int(4, 4)],
                sp(4, 1),
            ),
        ],
        1,
    )]);
    analyze(&program).expect("parallel assignment must analyze");

    let mismatched = program_with_arity_mismatch();
    let errors = expect_errors(&mismatched);
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::AssignmentArityMismatch(..))));
}

fn program_with_arity_mismatch() -> dachs_lang::ast::Program {
    program(vec![main_fn(
        vec![
            init_var("a", int(1, 2), 2),
            init_var("b", int(2, 3), 3),
            AssignmentStmt::new(
                vec![var("a", 4), var("b", 4)],
                vec![int(3, 4), int(4, 4), int(5, 4)],
                sp(4, 1),
            ),
        ],
        1,
    )])
}

// A single tuple on the right distributes across the left-hand sides.
#[test]
fn tuple_destructuring_initialization() {
    let tuple = Expression::tuple(vec![int(1, 2), boolean(true, 2)], sp(2, 7));
    let a_ref = var("a", 3);
    let b_ref = var("b", 4);
    let program = program(vec![main_fn(
        vec![
            init_multi(vec!["a", "b"], vec![tuple], 2),
            dachs_lang::ast::Statement::Expression(a_ref.clone()),
            dachs_lang::ast::Statement::Expression(b_ref.clone()),
        ],
        1,
    )]);
    analyze(&program).expect("destructuring must analyze");

    use dachs_lang::typechecker::types::Type;
    assert_eq!(a_ref.ty(), Some(Type::int()));
    assert_eq!(b_ref.ty(), Some(Type::boolean()));
}

// Assigning through an instance variable requires a mutable receiver.
#[test]
fn instance_var_assignment_requires_mutable_receiver() {
    let x = class_def(
        "X",
        vec![instance_var("a", None, 2)],
        vec![ctor(vec!["a"], vec![], 3)],
        1,
    );
    let program = program(vec![
        class(x),
        main_fn(
            vec![
                init("f", new_class("X", vec![int(1, 8)], 8), 8),
                assign(member(var("f", 9), "a", 9), int(2, 9), 9),
            ],
            7,
        ),
    ]);
    let errors = expect_errors(&program);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeCheckError::ImmutableReassign(..))),
        "{errors:?}"
    );
}
