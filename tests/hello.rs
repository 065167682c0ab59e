mod common;

use common::*;
use dachs_lang::ast::Expression;

// func main
//     print("Hello, Dachs!\n")
// end
#[test]
fn analyze_hello_world() {
    let greeting = call("print", vec![string("Hello, Dachs!\n", 2)], 2);
    let program = program(vec![main_fn(
        vec![dachs_lang::ast::Statement::Expression(greeting.clone())],
        1,
    )]);

    let semantics = analyze(&program).expect("hello world must analyze");

    let mains: Vec<_> = semantics
        .global
        .borrow()
        .functions
        .iter()
        .filter(|f| f.borrow().is_main_func())
        .cloned()
        .collect();
    assert_eq!(mains.len(), 1);

    // The call is bound to the builtin print taking the string class.
    let Expression::Invocation(inv) = &greeting else {
        unreachable!()
    };
    let callee = inv.callee.borrow().upgrade().expect("callee must be bound");
    assert_eq!(callee.borrow().name, "print");
    assert!(callee.borrow().is_builtin);

    let arg_type = inv.args.borrow()[0].ty().expect("argument must be typed");
    assert_eq!(arg_type.to_string(), "string");
}
