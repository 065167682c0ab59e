mod common;

use common::*;
use dachs_lang::ast::{Expression, Statement};
use dachs_lang::typechecker::types::Type;

// func main
//     x := 42
//     f := -> ret x
//     f()
// end
#[test]
fn free_variables_become_captures() {
    let the_lambda = lambda(vec![], vec![ret(vec![var("x", 3)], 3)], 3, 10);
    let Expression::Lambda(lambda_node) = &the_lambda else {
        unreachable!()
    };
    let program = program(vec![main_fn(
        vec![
            init("x", int(42, 2), 2),
            init("f", the_lambda.clone(), 3),
            Statement::Expression(call("f", vec![], 4)),
        ],
        1,
    )]);

    let semantics = analyze(&program).expect("lambda must analyze");

    let captures = semantics
        .captures
        .get(&lambda_node.def.id)
        .expect("lambda must have a capture record");
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].outer.borrow().name, "x");
    assert_eq!(captures[0].introduced.borrow().name, "x");
    assert_eq!(captures[0].introduced.borrow().ty, Some(Type::int()));

    // The lambda was lifted into the global function set under its
    // positional name.
    let name = lambda_node.def.name();
    assert!(name.starts_with("lambda."));
    assert!(semantics
        .global
        .borrow()
        .functions
        .iter()
        .any(|f| f.borrow().name == name));
}

// Parameters and locals of the lambda itself are not captures.
#[test]
fn own_bindings_are_not_captured() {
    let the_lambda = lambda(
        vec![param("a", Some("int"), 3)],
        vec![
            init("local", int(1, 4), 4),
            ret(
                vec![binary(
                    dachs_lang::ast::BinaryOperator::Add,
                    var("a", 5),
                    var("local", 5),
                    5,
                )],
                5,
            ),
        ],
        3,
        10,
    );
    let Expression::Lambda(lambda_node) = &the_lambda else {
        unreachable!()
    };
    let program = program(vec![main_fn(
        vec![
            init("f", the_lambda.clone(), 3),
            Statement::Expression(call("f", vec![int(1, 6)], 6)),
        ],
        1,
    )]);

    let semantics = analyze(&program).expect("lambda must analyze");
    let captures = semantics.captures.get(&lambda_node.def.id).unwrap();
    assert!(captures.is_empty());
}

// A lambda with an unannotated parameter is a function template; calling
// it instantiates an anonymous function, which gets its own captures.
#[test]
fn template_lambdas_are_instantiated_per_call() {
    let the_lambda = lambda(
        vec![param("a", None, 3)],
        vec![ret(
            vec![binary(
                dachs_lang::ast::BinaryOperator::Add,
                var("a", 4),
                var("offset", 4),
                4,
            )],
            4,
        )],
        3,
        10,
    );
    let Expression::Lambda(lambda_node) = &the_lambda else {
        unreachable!()
    };
    let program = program(vec![main_fn(
        vec![
            init("offset", int(10, 2), 2),
            init("f", the_lambda.clone(), 3),
            Statement::Expression(call("f", vec![int(1, 5)], 5)),
        ],
        1,
    )]);

    let semantics = analyze(&program).expect("template lambda must analyze");

    let instantiated = lambda_node.def.instantiated.borrow();
    assert_eq!(instantiated.len(), 1);
    assert_eq!(*instantiated[0].ret_type.borrow(), Some(Type::int()));

    // The capture record belongs to the instantiation.
    let captures = semantics.captures.get(&instantiated[0].id).unwrap();
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].outer.borrow().name, "offset");
}

// Two syntactically distinct lambdas never collide: the position is part
// of the name.
#[test]
fn lambda_names_are_position_based() {
    let first = lambda(vec![], vec![ret(vec![int(1, 2)], 2)], 2, 10);
    let second = lambda(vec![], vec![ret(vec![int(2, 3)], 3)], 3, 12);
    let (Expression::Lambda(first_node), Expression::Lambda(second_node)) = (&first, &second)
    else {
        unreachable!()
    };

    let program = program(vec![main_fn(
        vec![init("f", first.clone(), 2), init("g", second.clone(), 3)],
        1,
    )]);
    analyze(&program).expect("lambdas must analyze");

    assert_eq!(first_node.def.name(), "lambda.2.10.10");
    assert_eq!(second_node.def.name(), "lambda.3.12.10");
}
