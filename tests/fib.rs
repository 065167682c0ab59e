mod common;

use common::*;
use dachs_lang::ast::BinaryOperator;
use dachs_lang::typechecker::types::Type;

// func fib(n)
//     case n
//     when 0, 1
//         ret 1
//     else
//         ret fib(n-1) + fib(n-2)
//     end
// end
//
// func main
//     print(fib(10))
// end
#[test]
fn recursive_return_type_deduction() {
    let recursive_sum = binary(
        BinaryOperator::Add,
        call(
            "fib",
            vec![binary(BinaryOperator::Sub, var("n", 5), int(1, 5), 5)],
            5,
        ),
        call(
            "fib",
            vec![binary(BinaryOperator::Sub, var("n", 5), int(2, 5), 5)],
            5,
        ),
        5,
    );
    let fib = func_def(
        "fib",
        vec![param("n", None, 1)],
        vec![switch(
            var("n", 2),
            vec![(vec![int(0, 3), int(1, 3)], vec![ret(vec![int(1, 3)], 3)])],
            Some(vec![ret(vec![recursive_sum], 5)]),
            2,
        )],
        1,
    );

    let program = program(vec![
        func(fib.clone()),
        main_fn(
            vec![call_stmt("print", vec![call("fib", vec![int(10, 9)], 9)], 9)],
            9,
        ),
    ]);

    analyze(&program).expect("fib must analyze");

    // The template itself stays untyped; its int instantiation deduced
    // its return type through the recursive rule.
    let instantiated = fib.instantiated.borrow();
    assert_eq!(instantiated.len(), 1);
    assert_eq!(*instantiated[0].ret_type.borrow(), Some(Type::int()));
}

// Instantiating the same template twice with the same argument types
// reuses the first instantiation.
#[test]
fn template_instantiations_are_deduplicated() {
    let square = func_def(
        "square",
        vec![param("x", None, 1)],
        vec![ret(
            vec![binary(BinaryOperator::Mul, var("x", 2), var("x", 2), 2)],
            2,
        )],
        1,
    );

    let program = program(vec![
        func(square.clone()),
        main_fn(
            vec![
                call_stmt("print", vec![call("square", vec![int(2, 5)], 5)], 5),
                call_stmt("print", vec![call("square", vec![int(3, 6)], 6)], 6),
                call_stmt("print", vec![call("square", vec![float(1.5, 7)], 7)], 7),
            ],
            4,
        ),
    ]);

    analyze(&program).expect("square must analyze");

    let instantiated = square.instantiated.borrow();
    assert_eq!(instantiated.len(), 2);
    assert_eq!(*instantiated[0].ret_type.borrow(), Some(Type::int()));
    assert_eq!(*instantiated[1].ret_type.borrow(), Some(Type::float()));
}
