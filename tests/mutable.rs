mod common;

use std::rc::Rc;

use common::*;
use dachs_lang::ast::{Statement, TypeName, VariableDecl};
use dachs_lang::typechecker::TypeCheckError;

// class Counter
//     var n : int
//
//     init(@n); end
//     func value;      ret @n;     end     # const
//     func increment;  @n = @n + 1  end    # mutates the receiver
//     func show;       println(self.value())  end   # const through value
//     func tick;       self.increment()       end   # non-const through increment
// end
fn counter_class() -> Rc<dachs_lang::ast::ClassDefinition> {
    let n = Rc::new(VariableDecl {
        is_var: true,
        name: "n".into(),
        maybe_type: Some(TypeName::primary("int", sp(2, 5))),
        accessibility: dachs_lang::ast::Accessibility::Public,
        span: sp(2, 5),
        id: dachs_lang::ast::NodeId::fresh(),
        symbol: Default::default(),
    });

    let value = method("value", vec![], vec![ret(vec![var("@n", 4)], 4)], 4);
    let increment = method(
        "increment",
        vec![],
        vec![assign(
            var("@n", 5),
            binary(
                dachs_lang::ast::BinaryOperator::Add,
                var("@n", 5),
                int(1, 5),
                5,
            ),
            5,
        )],
        5,
    );
    let show = method(
        "show",
        vec![],
        vec![call_stmt(
            "println",
            vec![method_call(var("self", 6), "value", vec![], 6)],
            6,
        )],
        6,
    );
    let tick = method(
        "tick",
        vec![],
        vec![Statement::Expression(method_call(
            var("self", 7),
            "increment",
            vec![],
            7,
        ))],
        7,
    );

    class_def(
        "Counter",
        vec![n],
        vec![ctor(vec!["n"], vec![], 3), value, increment, show, tick],
        1,
    )
}

fn member_is_const(class: &Rc<dachs_lang::ast::ClassDefinition>, name: &str) -> Option<bool> {
    let scope = class.scope.borrow().upgrade()?;
    let member = scope
        .borrow()
        .member_funcs
        .iter()
        .find(|f| f.borrow().name == name)
        .cloned()?;
    let result = member.borrow().is_const;
    result
}

#[test]
fn const_ness_is_inferred_transitively() {
    let counter = counter_class();
    let program = program(vec![
        class(counter.clone()),
        main_fn(
            vec![
                init_var("c", new_class("Counter", vec![int(0, 10)], 10), 10),
                Statement::Expression(method_call(var("c", 11), "show", vec![], 11)),
                Statement::Expression(method_call(var("c", 12), "tick", vec![], 12)),
            ],
            9,
        ),
    ]);
    analyze(&program).expect("counter must analyze");

    assert_eq!(member_is_const(&counter, "value"), Some(true));
    assert_eq!(member_is_const(&counter, "increment"), Some(false));
    // Transitivity: show only calls the const value, tick calls the
    // mutating increment.
    assert_eq!(member_is_const(&counter, "show"), Some(true));
    assert_eq!(member_is_const(&counter, "tick"), Some(false));
}

#[test]
fn non_const_method_on_immutable_binding_is_rejected() {
    let counter = counter_class();
    let program = program(vec![
        class(counter),
        main_fn(
            vec![
                init("c", new_class("Counter", vec![int(0, 10)], 10), 10),
                Statement::Expression(method_call(var("c", 11), "increment", vec![], 11)),
            ],
            9,
        ),
    ]);
    let errors = expect_errors(&program);
    assert!(
        errors.iter().any(|e| match e {
            TypeCheckError::ConstViolation(inner, _) => inner.binding == "c",
            _ => false,
        }),
        "{errors:?}"
    );
}

#[test]
fn const_method_on_immutable_binding_is_fine() {
    let counter = counter_class();
    let program = program(vec![
        class(counter),
        main_fn(
            vec![
                init("c", new_class("Counter", vec![int(0, 10)], 10), 10),
                Statement::Expression(method_call(var("c", 11), "value", vec![], 11)),
            ],
            9,
        ),
    ]);
    analyze(&program).expect("const call on immutable binding must analyze");
}
