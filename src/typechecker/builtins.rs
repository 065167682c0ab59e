//! The predeclared runtime surface.
//!
//! The analyzer does not read the runtime library from disk; it receives
//! it as input. Builtin functions (`print`, `println`, `fatal` and the
//! `__builtin_` intrinsics) are registered directly as function scopes
//! with trusted signatures, and the runtime classes (`array`, `string`,
//! `argv`) are synthesized as ordinary class definitions that flow
//! through the same forward and analysis passes as user code. Array and
//! string literals are rewritten into constructions of these classes.

use std::rc::Rc;

use log::trace;

use crate::ast::{
    Definition, Expression, FunctionDefinition, Parameter, Statement, StatementBlock, TypeName,
};
use crate::span::Span;
use crate::typechecker::context::Context;
use crate::typechecker::scope::{FuncScope, VarSymbol, WeakScopeRef};
use crate::typechecker::types::Type;

const BUILTIN_FILE: &str = "<builtin>";

fn sp(line: usize) -> Span {
    Span::new(BUILTIN_FILE, line, 1, 0)
}

/// Register every builtin before the forward pass runs; the synthesized
/// class definitions land in the context's prelude.
pub fn predeclare(ctx: &mut Context) {
    let template_arg = |line: usize| Type::template(crate::ast::NodeId::fresh(), sp(line));

    declare_builtin_func(ctx, "print", vec![("value", template_arg(1))], Type::unit());
    declare_builtin_func(ctx, "println", vec![("value", template_arg(2))], Type::unit());
    declare_builtin_func(ctx, "fatal", vec![], Type::unit());
    declare_builtin_func(ctx, "fatal", vec![("reason", template_arg(3))], Type::unit());
    declare_builtin_func(ctx, "__builtin_getchar", vec![], Type::char_type());
    declare_builtin_func(ctx, "__builtin_abort", vec![], Type::unit());
    declare_builtin_func(
        ctx,
        "__builtin_string_eq",
        vec![
            ("lhs", Type::pointer(Type::char_type())),
            ("rhs", Type::pointer(Type::char_type())),
        ],
        Type::boolean(),
    );

    ctx.prelude = vec![
        Definition::Class(array_class()),
        Definition::Class(string_class()),
        Definition::Class(argv_class()),
    ];
}

fn declare_builtin_func(ctx: &mut Context, name: &str, params: Vec<(&str, Type)>, ret: Type) {
    let scope = FuncScope::create(name, WeakScopeRef::Global(Rc::downgrade(&ctx.global)), None);
    {
        let mut s = scope.borrow_mut();
        s.is_builtin = true;
        s.ret_type = Some(ret);
    }
    for (param_name, ty) in params {
        let sym = VarSymbol::with_type(param_name, ty, true, sp(0));
        sym.borrow_mut().is_builtin = true;
        scope.borrow_mut().define_param(sym);
    }

    let constant = VarSymbol::with_type(name, scope.borrow().ty.clone(), true, sp(0));
    {
        let mut c = constant.borrow_mut();
        c.is_global = true;
        c.is_builtin = true;
    }

    let mut global = ctx.global.borrow_mut();
    global.define_function(scope);
    global.define_global_constant(constant);
    trace!("predeclared builtin function '{name}'");
}

fn ret_member(receiver: &str, member: &str, line: usize) -> Statement {
    crate::ast::ReturnStmt::new(
        vec![Expression::ufcs(
            Expression::var_ref(receiver, sp(line)),
            member,
            sp(line),
        )],
        sp(line),
    )
}

/// ```text
/// class array
///     buf          # pointer to the element storage, drives the template
///     len : uint
///
///     init(@buf, @len : uint); end
///     func size;        ret self.len;      end
///     func [](idx : uint); ret self.buf[idx]; end
/// end
/// ```
fn array_class() -> Rc<crate::ast::ClassDefinition> {
    let buf = crate::ast::VariableDecl::new(
        false,
        "buf",
        Some(TypeName::pointer(None, sp(10))),
        sp(10),
    );
    let len = crate::ast::VariableDecl::new(
        false,
        "len",
        Some(TypeName::primary("uint", sp(11))),
        sp(11),
    );

    let ctor = FunctionDefinition::func(
        "init",
        vec![
            Parameter::self_param(sp(12)),
            Parameter::new("@buf", false, None, sp(12)),
            Parameter::new("@len", false, Some(TypeName::primary("uint", sp(12))), sp(12)),
        ],
        None,
        StatementBlock::new(vec![], sp(12)),
        sp(12),
    );

    let size = FunctionDefinition::func(
        "size",
        vec![Parameter::self_param(sp(13))],
        Some(TypeName::primary("uint", sp(13))),
        StatementBlock::new(vec![ret_member("self", "len", 13)], sp(13)),
        sp(13),
    );

    let index = FunctionDefinition::func(
        "[]",
        vec![
            Parameter::self_param(sp(14)),
            Parameter::new("idx", false, Some(TypeName::primary("uint", sp(14))), sp(14)),
        ],
        None,
        StatementBlock::new(
            vec![crate::ast::ReturnStmt::new(
                vec![Expression::index(
                    Expression::ufcs(Expression::var_ref("self", sp(14)), "buf", sp(14)),
                    Expression::var_ref("idx", sp(14)),
                    sp(14),
                )],
                sp(14),
            )],
            sp(14),
        ),
        sp(14),
    );

    crate::ast::ClassDefinition::new("array", vec![buf, len], vec![ctor, size, index], sp(9))
}

/// ```text
/// class string
///     data : pointer(char)
///     len : uint
///
///     init(@data : pointer(char), @len : uint); end
///     func size;         ret self.len;       end
///     func [](idx : uint);  ret self.data[idx]; end
///     func ==(rhs : string); ret __builtin_string_eq(self.data, rhs.data); end
/// end
/// ```
fn string_class() -> Rc<crate::ast::ClassDefinition> {
    let char_ptr = |line| TypeName::pointer(Some(TypeName::primary("char", sp(line))), sp(line));

    let data = crate::ast::VariableDecl::new(false, "data", Some(char_ptr(20)), sp(20));
    let len = crate::ast::VariableDecl::new(
        false,
        "len",
        Some(TypeName::primary("uint", sp(21))),
        sp(21),
    );

    let ctor = FunctionDefinition::func(
        "init",
        vec![
            Parameter::self_param(sp(22)),
            Parameter::new("@data", false, Some(char_ptr(22)), sp(22)),
            Parameter::new("@len", false, Some(TypeName::primary("uint", sp(22))), sp(22)),
        ],
        None,
        StatementBlock::new(vec![], sp(22)),
        sp(22),
    );

    let size = FunctionDefinition::func(
        "size",
        vec![Parameter::self_param(sp(23))],
        Some(TypeName::primary("uint", sp(23))),
        StatementBlock::new(vec![ret_member("self", "len", 23)], sp(23)),
        sp(23),
    );

    let index = FunctionDefinition::func(
        "[]",
        vec![
            Parameter::self_param(sp(24)),
            Parameter::new("idx", false, Some(TypeName::primary("uint", sp(24))), sp(24)),
        ],
        None,
        StatementBlock::new(
            vec![crate::ast::ReturnStmt::new(
                vec![Expression::index(
                    Expression::ufcs(Expression::var_ref("self", sp(24)), "data", sp(24)),
                    Expression::var_ref("idx", sp(24)),
                    sp(24),
                )],
                sp(24),
            )],
            sp(24),
        ),
        sp(24),
    );

    let eq = FunctionDefinition::func(
        "==",
        vec![
            Parameter::self_param(sp(25)),
            Parameter::new(
                "rhs",
                false,
                Some(TypeName::primary("string", sp(25))),
                sp(25),
            ),
        ],
        Some(TypeName::primary("bool", sp(25))),
        StatementBlock::new(
            vec![crate::ast::ReturnStmt::new(
                vec![Expression::invocation(
                    Expression::var_ref("__builtin_string_eq", sp(25)),
                    vec![
                        Expression::ufcs(Expression::var_ref("self", sp(25)), "data", sp(25)),
                        Expression::ufcs(Expression::var_ref("rhs", sp(25)), "data", sp(25)),
                    ],
                    sp(25),
                )],
                sp(25),
            )],
            sp(25),
        ),
        sp(25),
    );

    crate::ast::ClassDefinition::new("string", vec![data, len], vec![ctor, size, index, eq], sp(19))
}

/// ```text
/// class argv
///     argc : uint
///     args : pointer(pointer(char))
///
///     init(@argc : uint, @args : pointer(pointer(char))); end
///     func size; ret self.argc; end
/// end
/// ```
fn argv_class() -> Rc<crate::ast::ClassDefinition> {
    let char_ptr_ptr = |line: usize| {
        TypeName::pointer(
            Some(TypeName::pointer(
                Some(TypeName::primary("char", sp(line))),
                sp(line),
            )),
            sp(line),
        )
    };

    let argc = crate::ast::VariableDecl::new(
        false,
        "argc",
        Some(TypeName::primary("uint", sp(30))),
        sp(30),
    );
    let args = crate::ast::VariableDecl::new(false, "args", Some(char_ptr_ptr(31)), sp(31));

    let ctor = FunctionDefinition::func(
        "init",
        vec![
            Parameter::self_param(sp(32)),
            Parameter::new("@argc", false, Some(TypeName::primary("uint", sp(32))), sp(32)),
            Parameter::new("@args", false, Some(char_ptr_ptr(32)), sp(32)),
        ],
        None,
        StatementBlock::new(vec![], sp(32)),
        sp(32),
    );

    let size = FunctionDefinition::func(
        "size",
        vec![Parameter::self_param(sp(33))],
        Some(TypeName::primary("uint", sp(33))),
        StatementBlock::new(vec![ret_member("self", "argc", 33)], sp(33)),
        sp(33),
    );

    crate::ast::ClassDefinition::new("argv", vec![argc, args], vec![ctor, size], sp(29))
}

#[cfg(test)]
mod tests {
    use super::predeclare;
    use crate::typechecker::context::Context;
    use crate::typechecker::types::Type;

    #[test]
    fn test_builtin_functions_are_in_scope() {
        let mut ctx = Context::new();
        predeclare(&mut ctx);

        let print = ctx.current().resolve_var("print");
        assert!(print.is_some());
        assert!(matches!(
            print.unwrap().borrow().ty,
            Some(Type::GenericFunc(_))
        ));

        // fatal is overloaded: niladic and unary.
        let fatals = ctx.current().func_candidates("fatal");
        assert_eq!(fatals.len(), 2);
    }

    #[test]
    fn test_prelude_classes() {
        let mut ctx = Context::new();
        predeclare(&mut ctx);
        let names: Vec<String> = ctx
            .prelude
            .iter()
            .map(|d| match d {
                crate::ast::Definition::Class(c) => c.name.clone(),
                crate::ast::Definition::Function(f) => f.name(),
            })
            .collect();
        assert_eq!(names, vec!["array", "string", "argv"]);
    }
}
