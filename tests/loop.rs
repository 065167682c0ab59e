mod common;

use common::*;
use dachs_lang::ast::{CaseStmt, Expression, ForStmt, Parameter, Statement, WhileStmt};
use dachs_lang::typechecker::types::Type;
use dachs_lang::typechecker::TypeCheckError;

// func main
//     arr := [1, 2, 3]
//     for i in arr
//         println(i)
//     end
// end
#[test]
fn for_over_array_class_resolves_size_and_index() {
    let iter_var = Parameter::new("i", false, None, sp(3, 5));
    let for_stmt = ForStmt::new(
        vec![iter_var.clone()],
        var("arr", 3),
        block(vec![call_stmt("println", vec![var("i", 4)], 4)], 3),
        sp(3, 1),
    );
    let program = program(vec![main_fn(
        vec![
            init(
                "arr",
                Expression::array(vec![int(1, 2), int(2, 2), int(3, 2)], sp(2, 8)),
                2,
            ),
            for_stmt.clone(),
        ],
        1,
    )]);
    analyze(&program).expect("for loop must analyze");

    // The iteration variable takes the element type, and the size/index
    // member functions are cached on the node.
    assert_eq!(*iter_var.ty.borrow(), Some(Type::int()));
    let Statement::For(node) = &for_stmt else {
        unreachable!()
    };
    let size = node.size_callee.borrow().upgrade().expect("size cached");
    assert_eq!(size.borrow().name, "size");
    let index = node.index_callee.borrow().upgrade().expect("[] cached");
    assert_eq!(index.borrow().name, "[]");
}

#[test]
fn for_over_non_iterable_is_rejected() {
    let for_stmt = ForStmt::new(
        vec![Parameter::new("i", false, None, sp(2, 5))],
        int(42, 2),
        block(vec![], 2),
        sp(2, 1),
    );
    let errors = expect_errors(&program(vec![main_fn(vec![for_stmt], 1)]));
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::NotIterable(..))));
}

// case without a scrutinee takes boolean guards.
#[test]
fn case_guards_must_be_bool() {
    let good = CaseStmt::new(
        vec![(boolean(true, 2), block(vec![], 2))],
        Some(block(vec![], 3)),
        sp(2, 1),
    );
    analyze(&program(vec![main_fn(vec![good], 1)])).expect("case must analyze");

    let bad = CaseStmt::new(vec![(int(1, 2), block(vec![], 2))], None, sp(2, 1));
    let errors = expect_errors(&program(vec![main_fn(vec![bad], 1)]));
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::ConditionNotBool(..))));
}

// Builtin scrutinees compare with builtin equality; mismatched `when`
// values are rejected.
#[test]
fn switch_values_must_match_the_scrutinee() {
    let good = switch(
        int(1, 2),
        vec![(vec![int(0, 3), int(1, 3)], vec![])],
        Some(vec![]),
        2,
    );
    analyze(&program(vec![main_fn(vec![good], 1)])).expect("switch must analyze");

    let bad = switch(int(1, 2), vec![(vec![boolean(true, 3)], vec![])], None, 2);
    let errors = expect_errors(&program(vec![main_fn(vec![bad], 1)]));
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::TypeMismatch(..))));
}

// A class scrutinee resolves a user `==` returning bool; the string
// class ships one.
#[test]
fn switch_over_strings_uses_the_eq_overload() {
    let switch_stmt = switch(
        var("s", 3),
        vec![(vec![string("b", 3)], vec![call_stmt("println", vec![int(1, 4)], 4)])],
        None,
        3,
    );
    let program = program(vec![main_fn(
        vec![init("s", string("a", 2), 2), switch_stmt.clone()],
        1,
    )]);
    analyze(&program).expect("string switch must analyze");

    let Statement::Switch(node) = &switch_stmt else {
        unreachable!()
    };
    let callees = node.eq_callees.borrow();
    assert_eq!(callees.len(), 1);
    let eq = callees[0].upgrade().unwrap();
    assert_eq!(eq.borrow().name, "==");
    assert_eq!(eq.borrow().ret_type, Some(Type::boolean()));
}

#[test]
fn while_condition_must_be_bool() {
    let good = WhileStmt::new(boolean(true, 2), block(vec![], 2), sp(2, 1));
    analyze(&program(vec![main_fn(vec![good], 1)])).expect("while must analyze");

    let bad = WhileStmt::new(int(1, 2), block(vec![], 2), sp(2, 1));
    let errors = expect_errors(&program(vec![main_fn(vec![bad], 1)]));
    assert!(errors
        .iter()
        .any(|e| matches!(e, TypeCheckError::ConditionNotBool(..))));
}
