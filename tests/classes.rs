mod common;

use std::rc::Rc;

use common::*;
use dachs_lang::ast::{Expression, InitializeStmt, Statement, TypeName, VariableDecl};
use dachs_lang::typechecker::types::Type;
use dachs_lang::typechecker::TypeCheckError;

// class X
//     a
//     init(@a)
//     end
// end
//
// func main
//     new X{42}
// end
#[test]
fn class_template_instantiated_through_constructor() {
    let x = class_def("X", vec![instance_var("a", None, 2)], vec![ctor(vec!["a"], vec![], 3)], 1);
    let construct = new_class("X", vec![int(42, 8)], 8);

    let program = program(vec![
        class(x.clone()),
        main_fn(vec![Statement::Expression(construct.clone())], 7),
    ]);
    analyze(&program).expect("construction must analyze");

    // One instantiation, with the template variable substituted by int.
    let instantiated = x.instantiated.borrow();
    assert_eq!(instantiated.len(), 1);
    let scope = instantiated[0].scope.borrow().upgrade().unwrap();
    assert_eq!(
        scope.borrow().instance_var_types(),
        vec![Some(Type::int())]
    );

    // The expression is typed with the instantiated class and bound to
    // its constructor taking (X(int), int).
    let Expression::Construct(node) = &construct else {
        unreachable!()
    };
    let ctor_scope = node.callee_ctor.borrow().upgrade().expect("ctor bound");
    let param_types: Vec<_> = ctor_scope
        .borrow()
        .params
        .iter()
        .map(|p| p.borrow().ty.clone().unwrap())
        .collect();
    assert_eq!(param_types[1], Type::int());
    assert!(ctor_scope.borrow().is_ctor);
}

#[test]
fn same_substitution_reuses_the_instantiation() {
    let x = class_def("X", vec![instance_var("a", None, 2)], vec![ctor(vec!["a"], vec![], 3)], 1);
    let program = program(vec![
        class(x.clone()),
        main_fn(
            vec![
                Statement::Expression(new_class("X", vec![int(1, 8)], 8)),
                Statement::Expression(new_class("X", vec![int(2, 9)], 9)),
                Statement::Expression(new_class("X", vec![boolean(true, 10)], 10)),
            ],
            7,
        ),
    ]);
    analyze(&program).expect("must analyze");
    assert_eq!(x.instantiated.borrow().len(), 2);
}

// class X
//     - a
//     init(@a)
//     end
// end
//
// func main
//     f := new X{42}
//     f.a
// end
#[test]
fn private_instance_var_is_rejected_outside_the_class() {
    let x = class_def(
        "X",
        vec![instance_var("-a", None, 2)],
        vec![ctor(vec!["a"], vec![], 3)],
        1,
    );
    let program = program(vec![
        class(x),
        main_fn(
            vec![
                init("f", new_class("X", vec![int(42, 8)], 8), 8),
                Statement::Expression(member(var("f", 9), "a", 9)),
            ],
            7,
        ),
    ]);
    let errors = expect_errors(&program);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeCheckError::PrivateInstanceVar(..))),
        "{errors:?}"
    );
}

#[test]
fn private_member_function_is_rejected_outside_the_class() {
    let foo = class_def(
        "Foo",
        vec![],
        vec![ctor(vec![], vec![], 2), private_method("hidden", vec![], vec![], 3)],
        1,
    );
    let program = program(vec![
        class(foo),
        main_fn(
            vec![
                init("f", new_class("Foo", vec![], 8), 8),
                Statement::Expression(method_call(var("f", 9), "hidden", vec![], 9)),
            ],
            7,
        ),
    ]);
    let errors = expect_errors(&program);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeCheckError::PrivateMemberFunction(..))),
        "{errors:?}"
    );
}

// A private method is callable from another method of the same class.
#[test]
fn private_member_function_is_callable_from_the_class() {
    let foo = class_def(
        "Foo",
        vec![],
        vec![
            ctor(vec![], vec![], 2),
            private_method("hidden", vec![], vec![], 3),
            method(
                "visible",
                vec![],
                vec![Statement::Expression(method_call(
                    var("self", 5),
                    "hidden",
                    vec![],
                    5,
                ))],
                4,
            ),
        ],
        1,
    );
    let program = program(vec![
        class(foo),
        main_fn(
            vec![
                init("f", new_class("Foo", vec![], 8), 8),
                Statement::Expression(method_call(var("f", 9), "visible", vec![], 9)),
            ],
            7,
        ),
    ]);
    analyze(&program).expect("same-class private call must analyze");
}

fn instance_init(name: &str, expr: Expression, line: usize) -> Statement {
    Statement::Initialize(InitializeStmt::new(
        vec![VariableDecl::new(false, name, None, sp(line, 1))],
        Some(vec![expr]),
        sp(line, 1),
    ))
}

// Initializing the same instance variable from both the parameter list
// and the body is rejected.
#[test]
fn double_initialization_is_rejected() {
    let x = class_def(
        "X",
        vec![instance_var("a", None, 2)],
        vec![ctor(vec!["a"], vec![instance_init("@a", int(0, 4), 4)], 3)],
        1,
    );
    let program = program(vec![
        class(x),
        main_fn(vec![Statement::Expression(new_class("X", vec![int(1, 8)], 8))], 7),
    ]);
    let errors = expect_errors(&program);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeCheckError::DoubleInit(..))),
        "{errors:?}"
    );
}

// Reading `self` before every instance variable is initialized is
// rejected.
#[test]
fn self_access_before_initialization_is_rejected() {
    let body = vec![
        instance_init("y", member(var("self", 4), "a", 4), 4),
        instance_init("@a", int(1, 5), 5),
    ];
    let x = class_def(
        "X",
        vec![instance_var("a", None, 2)],
        vec![ctor(vec![], body, 3)],
        1,
    );
    let program = program(vec![
        class(x),
        main_fn(vec![Statement::Expression(new_class("X", vec![], 8))], 7),
    ]);
    let errors = expect_errors(&program);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeCheckError::SelfAccessBeforeInit(..))),
        "{errors:?}"
    );
}

// A class without a constructor gets a synthesized default constructor;
// its declared-typed variables must be default constructible.
#[test]
fn default_constructor_is_synthesized() {
    let d = class_def("D", vec![instance_var("a", Some("int"), 2)], vec![], 1);
    let program = program(vec![
        class(d.clone()),
        main_fn(vec![init("x", new_class("D", vec![], 8), 8)], 7),
    ]);
    analyze(&program).expect("default construction must analyze");
    assert!(d.member_funcs.borrow().iter().any(|f| f.is_ctor()));
}

#[test]
fn non_default_constructible_member_must_be_initialized() {
    let ptr_var: Rc<VariableDecl> = VariableDecl::new(
        false,
        "p",
        Some(TypeName::pointer(
            Some(TypeName::primary("char", sp(2, 1))),
            sp(2, 1),
        )),
        sp(2, 1),
    );
    let x = class_def("X", vec![ptr_var], vec![ctor(vec![], vec![], 3)], 1);
    let program = program(vec![
        class(x),
        main_fn(vec![Statement::Expression(new_class("X", vec![], 8))], 7),
    ]);
    let errors = expect_errors(&program);
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, TypeCheckError::NotDefaultConstructible(..))),
        "{errors:?}"
    );
}

// Methods of an instantiated class resolve against the instantiation,
// and UFCS member access reads instance variables.
#[test]
fn methods_and_member_access_on_instantiated_class() {
    let getter = method("value", vec![], vec![ret(vec![member(var("self", 5), "a", 5)], 5)], 4);
    let x = class_def(
        "X",
        vec![instance_var("a", None, 2)],
        vec![ctor(vec!["a"], vec![], 3)],
        1,
    );
    x.member_funcs.borrow_mut().push(getter);

    let read_method = method_call(var("f", 9), "value", vec![], 9);
    let read_field = member(var("f", 10), "a", 10);
    let program = program(vec![
        class(x),
        main_fn(
            vec![
                init("f", new_class("X", vec![int(42, 8)], 8), 8),
                Statement::Expression(read_method.clone()),
                Statement::Expression(read_field.clone()),
            ],
            7,
        ),
    ]);
    analyze(&program).expect("member access must analyze");

    assert_eq!(read_method.ty(), Some(Type::int()));
    assert_eq!(read_field.ty(), Some(Type::int()));
}
