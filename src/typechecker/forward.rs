//! The forward pass: one walk over every declaration that builds the
//! scope tree before any body is analyzed.
//!
//! Classes are declared before everything else so that parameter and
//! return type annotations can refer to any class in the program
//! regardless of declaration order. Function signatures are recorded
//! (unannotated parameters become fresh template variables), blocks and
//! `let`/`for` statements get their local scopes, lambdas are named, and
//! signature-level duplication is diagnosed.
//!
//! Template instantiation re-enters this module on deep-copied
//! definitions to give each instantiation its own scope subtree.

use std::rc::Rc;

use log::trace;

use crate::ast::{
    self, ClassDefinition, Definition, Expression, FunctionDefinition, LambdaExpr, Parameter,
    Statement, StatementBlock,
};
use crate::ast::Visitor;
use crate::internal_compiler_error;
use crate::span::Span;
use crate::typechecker::context::Context;
use crate::typechecker::error::{
    InstanceVarInitNotAllowed, NotImplemented, ProcWithReturnType, RedefinedFunction,
    RedefinedSymbol, TypeCheckError,
};
use crate::typechecker::scope::{
    signatures_collide, ClassScope, ClassScopeRef, FuncScope, FuncScopeRef, LocalScope,
    LocalScopeRef, ScopeRef, VarSymbol, VarSymbolRef,
};
use crate::typechecker::types::{self, Type};

/// Entry point for the whole-program forward pass.
pub fn declare_definitions(definitions: &[Definition], ctx: &mut Context) {
    // Class names first: annotations may reference classes declared later.
    for def in definitions {
        if let Definition::Class(class_def) = def {
            declare_class_name(class_def, ctx);
        }
    }

    for def in definitions {
        match def {
            Definition::Class(class_def) => declare_class_members(class_def, ctx),
            Definition::Function(func_def) => {
                let enclosing = ctx.current();
                declare_function(func_def, enclosing, ctx);
            }
        }
    }

    check_global_duplication(ctx);
}

fn check_global_duplication(ctx: &mut Context) {
    let functions = ctx.global.borrow().functions.clone();
    let mut duplicates = vec![];
    for (i, left) in functions.iter().enumerate() {
        if left.borrow().is_anonymous() {
            continue;
        }
        for right in functions.iter().skip(i + 1) {
            if right.borrow().is_anonymous() {
                continue;
            }
            if signatures_collide(left, right) {
                let previous = left
                    .borrow()
                    .get_ast_node()
                    .map(|d| d.span.clone())
                    .unwrap_or_default();
                let at = right
                    .borrow()
                    .get_ast_node()
                    .map(|d| d.span.clone())
                    .unwrap_or_default();
                duplicates.push(TypeCheckError::RedefinedFunction(
                    RedefinedFunction {
                        situation: "global scope".into(),
                        signature: right.borrow().to_string(),
                        previous,
                    },
                    at,
                ));
            }
        }
    }
    for err in duplicates {
        ctx.error(err);
    }
}

/// Create the class scope and register it globally; members follow in a
/// second phase.
pub fn declare_class_name(def: &Rc<ClassDefinition>, ctx: &mut Context) -> ClassScopeRef {
    let scope = ClassScope::create(&def.name, &ctx.global, def);
    *def.scope.borrow_mut() = Rc::downgrade(&scope);
    ctx.global.borrow_mut().define_class(scope.clone());
    trace!("declared class '{}'", def.name);
    scope
}

/// Declare instance variables and member functions of an already named
/// class, check member duplication and synthesize the default
/// constructor when no constructor was written.
pub fn declare_class_members(def: &Rc<ClassDefinition>, ctx: &mut Context) {
    let Some(scope) = def.scope.borrow().upgrade() else {
        internal_compiler_error!("class '{}' has no scope", def.name);
    };

    for decl in &def.instance_vars {
        let sym = VarSymbol::new(&decl.name, !decl.is_var, decl.span.clone());
        {
            let mut sym_mut = sym.borrow_mut();
            sym_mut.is_public = decl.accessibility == ast::Accessibility::Public;
            sym_mut.decl = Some(decl.id);
            sym_mut.ty = match &decl.maybe_type {
                Some(name) => types::resolve_type_node(name, ctx),
                None => Some(Type::template(decl.id, decl.span.clone())),
            };
        }
        *decl.symbol.borrow_mut() = Rc::downgrade(&sym);
        scope.borrow_mut().instance_var_symbols.push(sym);
    }

    let has_ctor = def.member_funcs.borrow().iter().any(|f| f.is_ctor());
    if !has_ctor {
        let span = def.span.clone();
        let body = StatementBlock::new(vec![], span.clone());
        let ctor = FunctionDefinition::func(
            "init",
            vec![Parameter::self_param(span)],
            None,
            body,
            def.span.clone(),
        );
        def.member_funcs.borrow_mut().push(ctor);
    }

    let members = def.member_funcs.borrow().clone();
    for func in &members {
        declare_function(func, ScopeRef::Class(scope.clone()), ctx);
    }

    let member_scopes = scope.borrow().member_funcs.clone();
    let mut duplicates = vec![];
    for (i, left) in member_scopes.iter().enumerate() {
        for right in member_scopes.iter().skip(i + 1) {
            if signatures_collide(left, right) {
                let previous = left
                    .borrow()
                    .get_ast_node()
                    .map(|d| d.span.clone())
                    .unwrap_or_default();
                let at = right
                    .borrow()
                    .get_ast_node()
                    .map(|d| d.span.clone())
                    .unwrap_or_default();
                duplicates.push(TypeCheckError::RedefinedFunction(
                    RedefinedFunction {
                        situation: format!("class scope '{}'", def.name),
                        signature: right.borrow().to_string(),
                        previous,
                    },
                    at,
                ));
            }
        }
    }
    for err in duplicates {
        ctx.error(err);
    }
}

/// Declare one function: scope, parameter symbols, declared return type
/// and the local scope skeleton of its body.
pub fn declare_function(
    def: &Rc<FunctionDefinition>,
    enclosing: ScopeRef,
    ctx: &mut Context,
) -> FuncScopeRef {
    let scope = FuncScope::create(def.name(), enclosing.downgrade(), Some(def));
    *def.scope.borrow_mut() = Rc::downgrade(&scope);

    let enclosing_class = match &enclosing {
        ScopeRef::Class(class) => {
            let mut s = scope.borrow_mut();
            s.is_member_func = true;
            s.is_ctor = def.is_ctor();
            Some(class.clone())
        }
        _ => None,
    };

    if def.kind == ast::FuncKind::Proc && def.return_type.is_some() {
        ctx.error(TypeCheckError::ProcWithReturnType(
            ProcWithReturnType {
                function: def.name(),
            },
            def.span.clone(),
        ));
        return scope;
    }

    if let Some(ret) = &def.return_type {
        let ret_type = ctx.with_scope(enclosing.clone(), |ctx| types::resolve_type_node(ret, ctx));
        if let Some(ret_type) = ret_type {
            scope.borrow_mut().ret_type = Some(ret_type.clone());
            *def.ret_type.borrow_mut() = Some(ret_type);
        }
    }

    match &enclosing {
        ScopeRef::Global(global) => {
            let func_var = VarSymbol::new(def.name(), true, def.span.clone());
            {
                let mut var = func_var.borrow_mut();
                var.ty = Some(scope.borrow().ty.clone());
                var.is_global = true;
                var.decl = Some(def.id);
            }
            let mut global = global.borrow_mut();
            global.define_function(scope.clone());
            global.define_global_constant(func_var);
        }
        ScopeRef::Local(local) => {
            local.borrow_mut().define_unnamed_func(scope.clone());
        }
        ScopeRef::Class(class) => {
            class.borrow_mut().member_funcs.push(scope.clone());
            // Member function names must resolve as values too: a UFCS
            // call site refers to the method by bare name.
            if !scope.borrow().is_ctor {
                let func_var = VarSymbol::new(def.name(), true, def.span.clone());
                {
                    let mut var = func_var.borrow_mut();
                    var.ty = Some(scope.borrow().ty.clone());
                    var.is_global = true;
                    var.decl = Some(def.id);
                }
                ctx.global.borrow_mut().define_global_constant(func_var);
            }
        }
        ScopeRef::Func(_) => {
            internal_compiler_error!("function '{}' declared directly inside a function", def.name())
        }
    }

    ctx.with_scope(enclosing.clone(), |ctx| {
        for param in &def.params {
            declare_parameter(param, &scope, enclosing_class.as_ref(), ctx);
        }
    });

    declare_block(&def.body, ScopeRef::Func(scope.clone()), ctx);

    trace!("declared function '{}'", scope.borrow().to_string());
    scope
}

fn declare_parameter(
    param: &Rc<Parameter>,
    func: &FuncScopeRef,
    enclosing_class: Option<&ClassScopeRef>,
    ctx: &mut Context,
) {
    // "_" parameters take part in overloading but are unreachable by
    // name, so each gets a unique stand-in name and duplication is
    // permitted.
    let name = if param.name == "_" {
        format!("_{}", param.id.raw())
    } else {
        param.name.clone()
    };

    let sym: VarSymbolRef = VarSymbol::new(name, !param.is_var, param.span.clone());
    sym.borrow_mut().decl = Some(param.id);

    let is_ctor = func.borrow().is_ctor;
    if param.is_instance_var_init() && !is_ctor {
        ctx.error(TypeCheckError::InstanceVarInitNotAllowed(
            InstanceVarInitNotAllowed {
                name: param.name.clone(),
            },
            param.span.clone(),
        ));
    }

    let ty = if param.name == "self" {
        match enclosing_class {
            Some(class) => Some(class.borrow().ty.clone()),
            None => Some(Type::template(param.id, param.span.clone())),
        }
    } else {
        match &param.type_name {
            Some(name) => types::resolve_type_node(name, ctx),
            None => Some(Type::template(param.id, param.span.clone())),
        }
    };

    if let Some(ty) = ty {
        sym.borrow_mut().ty = Some(ty.clone());
        *param.ty.borrow_mut() = Some(ty);
    }
    *param.symbol.borrow_mut() = Rc::downgrade(&sym);

    if !func.borrow_mut().define_param(sym) {
        ctx.error(TypeCheckError::RedefinedSymbol(
            RedefinedSymbol {
                name: param.name.clone(),
            },
            param.span.clone(),
        ));
    }
}

/// Create the local scope of a block and walk its statements for nested
/// declarations.
pub fn declare_block(
    block: &Rc<StatementBlock>,
    enclosing: ScopeRef,
    ctx: &mut Context,
) -> LocalScopeRef {
    let local = LocalScope::create(enclosing.downgrade());
    *block.scope.borrow_mut() = Rc::downgrade(&local);

    match &enclosing {
        ScopeRef::Local(parent) => parent.borrow_mut().define_child(local.clone()),
        ScopeRef::Func(func) => func.borrow_mut().body = Some(local.clone()),
        _ => internal_compiler_error!("statement block outside a function"),
    }

    let statements = block.statements.borrow().clone();
    ctx.with_scope(ScopeRef::Local(local.clone()), |ctx| {
        for stmt in &statements {
            declare_statement(stmt, ctx);
        }
    });

    local
}

fn declare_statement(stmt: &Statement, ctx: &mut Context) {
    match stmt {
        Statement::Expression(e) => declare_in_expression(e, ctx),
        Statement::Assignment(a) => {
            for e in a.assignees.iter().chain(a.rhs_exprs.iter()) {
                declare_in_expression(e, ctx);
            }
        }
        Statement::Initialize(init) => {
            if let Some(exprs) = init.rhs_exprs.borrow().as_ref() {
                for e in exprs {
                    declare_in_expression(e, ctx);
                }
            }
        }
        Statement::If(i) => {
            declare_in_expression(&i.condition, ctx);
            declare_block(&i.then_block, ctx.current(), ctx);
            for (cond, block) in &i.elseif_blocks {
                declare_in_expression(cond, ctx);
                declare_block(block, ctx.current(), ctx);
            }
            if let Some(block) = &i.else_block {
                declare_block(block, ctx.current(), ctx);
            }
        }
        Statement::Case(c) => {
            for (guard, block) in &c.when_blocks {
                declare_in_expression(guard, ctx);
                declare_block(block, ctx.current(), ctx);
            }
            if let Some(block) = &c.else_block {
                declare_block(block, ctx.current(), ctx);
            }
        }
        Statement::Switch(s) => {
            declare_in_expression(&s.target, ctx);
            for (values, block) in &s.when_blocks {
                for value in values {
                    declare_in_expression(value, ctx);
                }
                declare_block(block, ctx.current(), ctx);
            }
            if let Some(block) = &s.else_block {
                declare_block(block, ctx.current(), ctx);
            }
        }
        Statement::For(f) => {
            declare_in_expression(&f.range_expr, ctx);
            let body = declare_block(&f.body, ctx.current(), ctx);
            // Iteration variables live in the body scope; their types
            // come later, from the range.
            for var in &f.iter_vars {
                let name = if var.name == "_" {
                    format!("_{}", var.id.raw())
                } else {
                    var.name.clone()
                };
                let sym = VarSymbol::new(name, !var.is_var, var.span.clone());
                sym.borrow_mut().decl = Some(var.id);
                *var.symbol.borrow_mut() = Rc::downgrade(&sym);
                if !body.borrow_mut().define_variable(sym) {
                    ctx.error(TypeCheckError::RedefinedSymbol(
                        RedefinedSymbol {
                            name: var.name.clone(),
                        },
                        var.span.clone(),
                    ));
                }
            }
        }
        Statement::While(w) => {
            declare_in_expression(&w.condition, ctx);
            declare_block(&w.body, ctx.current(), ctx);
        }
        Statement::Return(r) => {
            for e in &r.exprs {
                declare_in_expression(e, ctx);
            }
        }
        Statement::PostfixIf(p) => {
            declare_statement(&p.body, ctx);
            declare_in_expression(&p.condition, ctx);
        }
        Statement::Let(l) => {
            let outer = ctx.current();
            let local = LocalScope::create(outer.downgrade());
            *l.scope.borrow_mut() = Rc::downgrade(&local);
            match &outer {
                ScopeRef::Local(parent) => parent.borrow_mut().define_child(local.clone()),
                _ => internal_compiler_error!("'let' outside a function body"),
            }
            ctx.with_scope(ScopeRef::Local(local), |ctx| {
                for init in &l.inits {
                    if let Some(exprs) = init.rhs_exprs.borrow().as_ref() {
                        for e in exprs {
                            declare_in_expression(e, ctx);
                        }
                    }
                }
                declare_statement(&l.child, ctx);
            });
        }
        Statement::Do(d) => {
            declare_block(&d.body, ctx.current(), ctx);
        }
        Statement::Block(b) => {
            declare_block(b, ctx.current(), ctx);
        }
        Statement::Function(f) => {
            let enclosing = ctx.current();
            declare_function(f, enclosing, ctx);
        }
        Statement::Class(c) => {
            ctx.error(TypeCheckError::NotImplemented(
                NotImplemented {
                    feature: "nested class definition",
                },
                c.span.clone(),
            ));
        }
    }
}

/// Walk an expression to find lambda definitions, which become named
/// anonymous functions hosted by the current local scope.
fn declare_in_expression(expr: &Expression, ctx: &mut Context) {
    struct LambdaDeclarer<'a> {
        ctx: &'a mut Context,
    }

    impl ast::Visitor for LambdaDeclarer<'_> {
        fn visit_expression(&mut self, expr: &Expression) {
            if let Expression::Lambda(lambda) = expr {
                declare_lambda(lambda, self.ctx);
                return;
            }
            ast::walk_expression(self, expr);
        }
    }

    let mut declarer = LambdaDeclarer { ctx };
    declarer.visit_expression(expr);
}

/// Lambdas are named after their position so two distinct lambdas never
/// collide: `lambda.<line>.<col>.<length>`.
pub fn lambda_name(span: &Span) -> String {
    format!("lambda.{}.{}.{}", span.line, span.col, span.length)
}

pub fn declare_lambda(lambda: &Rc<LambdaExpr>, ctx: &mut Context) {
    *lambda.def.name.borrow_mut() = lambda_name(&lambda.span);
    let enclosing = ctx.current();
    declare_function(&lambda.def, enclosing, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, FuncKind};
    use crate::typechecker::types::Type;

    fn empty_body() -> Rc<StatementBlock> {
        StatementBlock::new(vec![], Span::default())
    }

    #[test]
    fn test_declare_function_records_signature() {
        let mut ctx = Context::new();
        let def = FunctionDefinition::func(
            "foo",
            vec![
                Parameter::new("a", false, Some(crate::ast::TypeName::primary("int", Span::default())), Span::default()),
                Parameter::new("b", false, None, Span::default()),
            ],
            None,
            empty_body(),
            Span::default(),
        );
        let enclosing = ctx.current();
        let scope = declare_function(&def, enclosing, &mut ctx);

        assert_eq!(ctx.error_count(), 0);
        let scope = scope.borrow();
        assert_eq!(scope.params.len(), 2);
        assert_eq!(scope.params[0].borrow().ty, Some(Type::int()));
        assert!(matches!(
            scope.params[1].borrow().ty,
            Some(Type::Template(_))
        ));
        assert!(scope.is_template());
        assert!(ctx.current().resolve_var("foo").is_some());
    }

    #[test]
    fn test_proc_with_return_type_is_rejected() {
        let mut ctx = Context::new();
        let def = FunctionDefinition::new(
            FuncKind::Proc,
            "p",
            vec![],
            Some(crate::ast::TypeName::primary("int", Span::default())),
            empty_body(),
            crate::ast::Accessibility::Public,
            Span::default(),
        );
        let enclosing = ctx.current();
        declare_function(&def, enclosing, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn test_duplicate_parameter_is_rejected() {
        let mut ctx = Context::new();
        let def = FunctionDefinition::func(
            "foo",
            vec![
                Parameter::new("a", false, None, Span::default()),
                Parameter::new("a", false, None, Span::default()),
            ],
            None,
            empty_body(),
            Span::default(),
        );
        let enclosing = ctx.current();
        declare_function(&def, enclosing, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn test_underscore_parameters_do_not_collide() {
        let mut ctx = Context::new();
        let def = FunctionDefinition::func(
            "foo",
            vec![
                Parameter::new("_", false, None, Span::default()),
                Parameter::new("_", false, None, Span::default()),
            ],
            None,
            empty_body(),
            Span::default(),
        );
        let enclosing = ctx.current();
        declare_function(&def, enclosing, &mut ctx);
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn test_duplicate_concrete_overloads_are_detected() {
        let mut ctx = Context::new();
        let make = || {
            FunctionDefinition::func(
                "foo",
                vec![Parameter::new(
                    "a",
                    false,
                    Some(crate::ast::TypeName::primary("int", Span::default())),
                    Span::default(),
                )],
                None,
                empty_body(),
                Span::default(),
            )
        };
        let defs = vec![
            Definition::Function(make()),
            Definition::Function(make()),
        ];
        declare_definitions(&defs, &mut ctx);
        assert_eq!(ctx.error_count(), 1);
    }

    #[test]
    fn test_lambda_naming() {
        let mut ctx = Context::new();
        let def = FunctionDefinition::func("", vec![], None, empty_body(), Span::default());
        let lambda_span = Span::new("t.dcs", 4, 9, 17);
        let Expression::Lambda(lambda) = Expression::lambda(def, lambda_span) else {
            unreachable!()
        };
        // Lambdas only appear inside function bodies; fake that here.
        let outer = FunctionDefinition::func("outer", vec![], None, empty_body(), Span::default());
        let enclosing = ctx.current();
        let outer_scope = declare_function(&outer, enclosing, &mut ctx);
        let body = outer_scope.borrow().body.clone().unwrap();
        ctx.with_scope(ScopeRef::Local(body), |ctx| {
            declare_lambda(&lambda, ctx);
        });
        assert_eq!(lambda.def.name(), "lambda.4.9.17");
        assert!(lambda.def.scope.borrow().upgrade().is_some());
    }
}
