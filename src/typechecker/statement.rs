//! Statement analysis and function-definition checking.
//!
//! This is where return types are deduced. A function body is analyzed
//! exactly once; re-entering a definition that is still being analyzed
//! (mutual or self recursion) triggers the recursive rule: gather the
//! `ret` statements that already carry a type and, when they agree, take
//! that as the return type. This is what lets simple recursion
//! type-check without annotations.

use std::rc::Rc;

use log::trace;

use crate::ast::{
    self, AssignmentStmt, ClassDefinition, Definition, Expression, ForStmt, FuncKind,
    FunctionDefinition, InitializeStmt, Statement, StatementBlock, SwitchStmt, VariableDecl,
};
use crate::span::Span;
use crate::typechecker::call;
use crate::typechecker::class;
use crate::typechecker::const_check;
use crate::typechecker::context::Context;
use crate::typechecker::error::*;
use crate::typechecker::expression::{check_expression, report_const_violation};
use crate::typechecker::scope::ScopeRef;
use crate::typechecker::types::Type;

pub fn check_definitions(definitions: &[Definition], ctx: &mut Context) {
    for def in definitions {
        match def {
            Definition::Function(f) => check_function_definition(f, ctx),
            Definition::Class(c) => check_class_definition(c, ctx),
        }
    }
}

pub fn check_class_definition(def: &Rc<ClassDefinition>, ctx: &mut Context) {
    if !ctx.visited_classes.insert(def.id) {
        return;
    }
    let Some(scope) = def.scope.borrow().upgrade() else {
        return;
    };

    if scope
        .borrow()
        .instance_var_types()
        .iter()
        .any(|t| t.is_none())
    {
        return;
    }

    if scope.borrow().is_template() {
        // Templates are never emitted; member functions are analyzed on
        // the instantiated copies instead.
        return;
    }

    let members = def.member_funcs.borrow().clone();
    ctx.with_scope(ScopeRef::Class(scope), |ctx| {
        for func in &members {
            check_function_definition(func, ctx);
        }
    });
}

/// Collects the types of `ret` statements in a body, without descending
/// into nested function definitions.
struct ReturnGatherer {
    results: Vec<(Option<Type>, Span)>,
}

impl ast::Visitor for ReturnGatherer {
    fn visit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Return(ret) => {
                self.results.push((ret.ty.borrow().clone(), ret.span.clone()));
            }
            Statement::Function(_) => {}
            _ => ast::walk_statement(self, stmt),
        }
    }

    fn visit_expression(&mut self, expr: &Expression) {
        if matches!(expr, Expression::Lambda(_)) {
            return;
        }
        ast::walk_expression(self, expr);
    }
}

fn gather_return_types(def: &FunctionDefinition) -> Vec<(Option<Type>, Span)> {
    let mut gatherer = ReturnGatherer { results: vec![] };
    ast::walk_block(&mut gatherer, &def.body);
    gatherer.results
}

/// Re-entry on a definition whose analysis has not produced a return
/// type yet: deduce it from the `ret` statements typed so far.
fn resolve_recursive_return_type(def: &Rc<FunctionDefinition>, ctx: &mut Context) {
    if def.ret_type.borrow().is_some() || def.kind == FuncKind::Proc {
        return;
    }
    let Some(scope) = def.scope.borrow().upgrade() else {
        return;
    };
    if scope.borrow().is_template() {
        return;
    }

    let typed: Vec<Type> = gather_return_types(def)
        .into_iter()
        .filter_map(|(ty, _)| ty)
        .collect();

    let Some(first) = typed.first().cloned() else {
        ctx.error(TypeCheckError::CannotDeduceReturnType(
            CannotDeduceReturnType {
                function: def.name(),
            },
            def.span.clone(),
        ));
        return;
    };

    if typed.iter().any(|t| *t != first) {
        ctx.error(TypeCheckError::ConflictingReturnTypes(
            ConflictingReturnTypes {
                function: def.name(),
                candidates: typed,
            },
            def.span.clone(),
        ));
        return;
    }

    trace!("recursively deduced return type of '{}': {first}", def.name());
    *def.ret_type.borrow_mut() = Some(first.clone());
    scope.borrow_mut().ret_type = Some(first);
}

pub fn check_function_definition(def: &Rc<FunctionDefinition>, ctx: &mut Context) {
    if ctx.visited_functions.contains(&def.id) {
        resolve_recursive_return_type(def, ctx);
        return;
    }
    ctx.visited_functions.insert(def.id);

    let Some(scope) = def.scope.borrow().upgrade() else {
        return;
    };

    if def.kind == FuncKind::Proc && def.is_query() {
        ctx.error(TypeCheckError::QueryFuncMustReturnBool(
            QueryFuncMustReturnBool {
                function: def.name(),
            },
            def.span.clone(),
        ));
        return;
    }

    if scope.borrow().is_ctor {
        *def.ret_type.borrow_mut() = Some(Type::unit());
        scope.borrow_mut().ret_type = Some(Type::unit());
    }

    if scope.borrow().is_template() {
        // Only instantiations are analyzed; the template exists for
        // overload resolution.
        return;
    }

    // Parameter annotations mentioning class templates with explicit
    // arguments instantiate them here.
    let params = scope.borrow().params.clone();
    for (param, sym) in def.params.iter().zip(params.iter()) {
        let ty = sym.borrow().ty.clone();
        if let Some(ty) = ty {
            if let Some(instantiated) = class::instantiate_in_type(&ty, &param.span, ctx) {
                sym.borrow_mut().ty = Some(instantiated.clone());
                *param.ty.borrow_mut() = Some(instantiated);
            }
        }
    }

    ctx.function_depth += 1;
    ctx.with_scope(ScopeRef::Func(scope.clone()), |ctx| {
        check_block(&def.body, ctx);
    });
    ctx.function_depth -= 1;

    deduce_return_type(def, &scope, ctx);

    let is_member = scope.borrow().is_member_func;
    let is_ctor = scope.borrow().is_ctor;
    if is_member && !is_ctor {
        const_check::ensure_const(&scope, ctx);
    }
}

fn deduce_return_type(
    def: &Rc<FunctionDefinition>,
    scope: &crate::typechecker::scope::FuncScopeRef,
    ctx: &mut Context,
) {
    let gathered = gather_return_types(def);

    if let Some((_, span)) = gathered.iter().find(|(ty, _)| ty.is_none()) {
        ctx.error(TypeCheckError::CannotDeduceReturnType(
            CannotDeduceReturnType {
                function: def.name(),
            },
            span.clone(),
        ));
        return;
    }

    let result_types: Vec<Type> = gathered.into_iter().filter_map(|(ty, _)| ty).collect();
    let declared = def.ret_type.borrow().clone();

    if let Some(first) = result_types.first().cloned() {
        if def.kind == FuncKind::Proc && (result_types.len() != 1 || !first.is_unit()) {
            ctx.error(TypeCheckError::ProcReturnsValue(
                ProcReturnsValue {
                    function: def.name(),
                },
                def.span.clone(),
            ));
            return;
        }

        if result_types.iter().any(|t| *t != first) {
            ctx.error(TypeCheckError::ConflictingReturnTypes(
                ConflictingReturnTypes {
                    function: def.name(),
                    candidates: result_types,
                },
                def.span.clone(),
            ));
            return;
        }

        if let Some(declared) = &declared {
            let matches = if declared.is_template() {
                first.is_instantiated_from(declared)
            } else {
                *declared == first
            };
            if !matches {
                ctx.error(TypeCheckError::ReturnTypeMismatch(
                    ReturnTypeMismatch {
                        function: def.name(),
                        specified: declared.clone(),
                        deduced: first,
                    },
                    def.span.clone(),
                ));
                return;
            }
        }

        *def.ret_type.borrow_mut() = Some(first.clone());
        scope.borrow_mut().ret_type = Some(first.clone());

        if def.is_query() && first != Type::boolean() {
            ctx.error(TypeCheckError::QueryFuncMustReturnBool(
                QueryFuncMustReturnBool {
                    function: def.name(),
                },
                def.span.clone(),
            ));
        }
    } else {
        if let Some(declared) = &declared {
            if !declared.is_unit() {
                ctx.error(TypeCheckError::ReturnTypeMismatch(
                    ReturnTypeMismatch {
                        function: def.name(),
                        specified: declared.clone(),
                        deduced: Type::unit(),
                    },
                    def.span.clone(),
                ));
                return;
            }
        }
        *def.ret_type.borrow_mut() = Some(Type::unit());
        scope.borrow_mut().ret_type = Some(Type::unit());

        if def.is_query() {
            ctx.error(TypeCheckError::QueryFuncMustReturnBool(
                QueryFuncMustReturnBool {
                    function: def.name(),
                },
                def.span.clone(),
            ));
        }
    }
}

pub fn check_block(block: &Rc<StatementBlock>, ctx: &mut Context) {
    let Some(scope) = block.scope.borrow().upgrade() else {
        return;
    };
    let statements = block.statements.borrow().clone();
    ctx.with_scope(ScopeRef::Local(scope), |ctx| {
        for stmt in &statements {
            check_statement(stmt, ctx);
        }
    });
}

pub fn check_statement(stmt: &Statement, ctx: &mut Context) {
    match stmt {
        Statement::Expression(e) => check_expression(e, ctx),
        Statement::Assignment(assign) => check_assignment(assign, ctx),
        Statement::Initialize(init) => check_initialize(init, ctx),
        Statement::If(if_stmt) => {
            check_condition(&if_stmt.condition, ctx);
            check_block(&if_stmt.then_block, ctx);
            for (cond, block) in &if_stmt.elseif_blocks {
                check_condition(cond, ctx);
                check_block(block, ctx);
            }
            if let Some(block) = &if_stmt.else_block {
                check_block(block, ctx);
            }
        }
        Statement::Case(case) => {
            for (guard, block) in &case.when_blocks {
                check_condition(guard, ctx);
                check_block(block, ctx);
            }
            if let Some(block) = &case.else_block {
                check_block(block, ctx);
            }
        }
        Statement::Switch(switch) => check_switch(switch, ctx),
        Statement::For(for_stmt) => check_for(for_stmt, ctx),
        Statement::While(while_stmt) => {
            check_condition(&while_stmt.condition, ctx);
            check_block(&while_stmt.body, ctx);
        }
        Statement::Return(ret) => {
            for e in &ret.exprs {
                check_expression(e, ctx);
            }
            let ty = match ret.exprs.len() {
                0 => Some(Type::unit()),
                1 => ret.exprs[0].ty(),
                _ => ret
                    .exprs
                    .iter()
                    .map(|e| e.ty())
                    .collect::<Option<Vec<_>>>()
                    .map(Type::Tuple),
            };
            *ret.ty.borrow_mut() = ty;
        }
        Statement::PostfixIf(postfix) => {
            check_statement(&postfix.body, ctx);
            check_condition(&postfix.condition, ctx);
        }
        Statement::Let(let_stmt) => {
            let Some(scope) = let_stmt.scope.borrow().upgrade() else {
                return;
            };
            ctx.with_scope(ScopeRef::Local(scope), |ctx| {
                for init in &let_stmt.inits {
                    check_initialize(init, ctx);
                }
                check_statement(&let_stmt.child, ctx);
            });
        }
        Statement::Do(do_stmt) => check_block(&do_stmt.body, ctx),
        Statement::Block(block) => check_block(block, ctx),
        Statement::Function(def) => check_function_definition(def, ctx),
        Statement::Class(_) => {
            // Rejected by the forward pass already.
        }
    }
}

fn check_condition(cond: &Expression, ctx: &mut Context) {
    check_expression(cond, ctx);
    if let Some(ty) = cond.ty() {
        if ty != Type::boolean() {
            ctx.error(TypeCheckError::ConditionNotBool(
                ConditionNotBool { ty },
                cond.span(),
            ));
        }
    }
}

fn check_switch(switch: &Rc<SwitchStmt>, ctx: &mut Context) {
    check_expression(&switch.target, ctx);
    let target_type = switch.target.ty();

    for (values, block) in &switch.when_blocks {
        for value in values {
            check_expression(value, ctx);
            let (Some(target_type), Some(value_type)) = (target_type.clone(), value.ty()) else {
                continue;
            };

            if target_type.is_builtin() {
                if value_type != target_type {
                    ctx.error(TypeCheckError::TypeMismatch(
                        TypeMismatch {
                            expected: target_type,
                            actual: value_type,
                        },
                        value.span(),
                    ));
                }
                continue;
            }

            // Comparison dispatches to a user '==' returning bool.
            match call::resolve_func_call(
                "==",
                &[target_type, value_type],
                &value.span(),
                ctx,
            ) {
                Ok(eq) => {
                    let ret = eq.borrow().ret_type.clone();
                    if ret.as_ref().map(|t| *t != Type::boolean()).unwrap_or(true) {
                        ctx.error(TypeCheckError::EqMustReturnBool(
                            EqMustReturnBool {
                                signature: eq.borrow().to_string(),
                                actual: ret.unwrap_or_else(Type::unit),
                            },
                            value.span(),
                        ));
                    } else {
                        switch.eq_callees.borrow_mut().push(Rc::downgrade(&eq));
                    }
                }
                Err(err) => ctx.error(err),
            }
        }
        check_block(block, ctx);
    }

    if let Some(block) = &switch.else_block {
        check_block(block, ctx);
    }
}

fn check_for(for_stmt: &Rc<ForStmt>, ctx: &mut Context) {
    check_expression(&for_stmt.range_expr, ctx);
    let Some(range_type) = for_stmt.range_expr.ty() else {
        return;
    };

    let element_type = match &range_type {
        Type::Array { element, .. } => Some((**element).clone()),
        Type::Class(_) => {
            // The range must offer `size : () -> uint` and `[](uint)`;
            // both are resolved once and cached on the node.
            let size = call::resolve_func_call(
                "size",
                std::slice::from_ref(&range_type),
                &for_stmt.span,
                ctx,
            );
            let index = call::resolve_func_call(
                "[]",
                &[range_type.clone(), Type::uint()],
                &for_stmt.span,
                ctx,
            );
            match (size, index) {
                (Ok(size), Ok(index)) => {
                    let size_ret = size.borrow().ret_type.clone();
                    if size_ret != Some(Type::uint()) {
                        ctx.error(TypeCheckError::NotIterable(
                            NotIterable { ty: range_type },
                            for_stmt.span.clone(),
                        ));
                        None
                    } else {
                        *for_stmt.size_callee.borrow_mut() = Rc::downgrade(&size);
                        *for_stmt.index_callee.borrow_mut() = Rc::downgrade(&index);
                        index.borrow().ret_type.clone()
                    }
                }
                _ => {
                    ctx.error(TypeCheckError::NotIterable(
                        NotIterable { ty: range_type },
                        for_stmt.span.clone(),
                    ));
                    None
                }
            }
        }
        _ => {
            ctx.error(TypeCheckError::NotIterable(
                NotIterable { ty: range_type },
                for_stmt.span.clone(),
            ));
            None
        }
    };

    if let Some(element_type) = element_type {
        bind_iteration_vars(for_stmt, element_type, ctx);
    }

    check_block(&for_stmt.body, ctx);
}

fn bind_iteration_vars(for_stmt: &Rc<ForStmt>, element_type: Type, ctx: &mut Context) {
    let set = |param: &Rc<ast::Parameter>, ty: Type| {
        if let Some(sym) = param.symbol.borrow().upgrade() {
            sym.borrow_mut().ty = Some(ty.clone());
        }
        *param.ty.borrow_mut() = Some(ty);
    };

    match (&element_type, for_stmt.iter_vars.len()) {
        (_, 1) => set(&for_stmt.iter_vars[0], element_type),
        (Type::Tuple(elements), n) if elements.len() == n => {
            for (var, elem) in for_stmt.iter_vars.iter().zip(elements.iter()) {
                set(var, elem.clone());
            }
        }
        (Type::Tuple(elements), n) => {
            ctx.error(TypeCheckError::IterationArityMismatch(
                IterationArityMismatch {
                    vars: n,
                    elems: elements.len(),
                },
                for_stmt.span.clone(),
            ));
        }
        (_, n) => {
            ctx.error(TypeCheckError::IterationArityMismatch(
                IterationArityMismatch { vars: n, elems: 1 },
                for_stmt.span.clone(),
            ));
        }
    }
}

fn check_initialize(init: &Rc<InitializeStmt>, ctx: &mut Context) {
    let rhs = init.rhs_exprs.borrow().clone();

    let Some(exprs) = rhs else {
        // No initializer: the declared types must allow default
        // construction; class defaults become synthesized constructions.
        let mut constructs = vec![];
        for decl in &init.var_decls {
            let Some(type_name) = &decl.maybe_type else {
                ctx.error(TypeCheckError::MissingTypeAnnotation(
                    MissingTypeAnnotation {
                        name: decl.name.clone(),
                    },
                    decl.span.clone(),
                ));
                continue;
            };
            let Some(ty) = class::resolve_and_instantiate(type_name, ctx) else {
                continue;
            };
            if !ty.is_default_constructible() {
                ctx.error(TypeCheckError::InvalidConstruction(
                    InvalidConstruction {
                        ty,
                        note: "the type is not default constructible".into(),
                    },
                    decl.span.clone(),
                ));
                continue;
            }
            if matches!(ty, Type::Class(_)) {
                let construct =
                    Expression::construct(type_name.clone(), vec![], decl.span.clone());
                check_expression(&construct, ctx);
                constructs.push(construct);
            }
            define_var_decl(decl, Some(ty), ctx);
        }
        if !constructs.is_empty() && constructs.len() == init.var_decls.len() {
            *init.rhs_exprs.borrow_mut() = Some(constructs);
        }
        return;
    };

    for e in &exprs {
        check_expression(e, ctx);
    }
    let Some(mut rhs_types) = exprs.iter().map(|e| e.ty()).collect::<Option<Vec<Type>>>() else {
        return;
    };

    if init.var_decls.len() != rhs_types.len() {
        if rhs_types.len() == 1 {
            match &rhs_types[0] {
                Type::Tuple(elements) if elements.len() == init.var_decls.len() => {
                    rhs_types = elements.clone();
                }
                _ => {
                    ctx.error(TypeCheckError::InitializeArityMismatch(
                        InitializeArityMismatch {
                            lhs: init.var_decls.len(),
                            rhs: rhs_types.len(),
                        },
                        init.span.clone(),
                    ));
                    return;
                }
            }
        } else {
            ctx.error(TypeCheckError::InitializeArityMismatch(
                InitializeArityMismatch {
                    lhs: init.var_decls.len(),
                    rhs: rhs_types.len(),
                },
                init.span.clone(),
            ));
            return;
        }
    }

    for (decl, rhs_type) in init.var_decls.iter().zip(rhs_types.into_iter()) {
        define_var_decl(decl, Some(rhs_type), ctx);
    }
}

fn define_var_decl(decl: &Rc<VariableDecl>, rhs_type: Option<Type>, ctx: &mut Context) {
    if decl.name == "_" {
        return;
    }

    if decl.is_instance_var() {
        let Some(ctor) = ctx.enclosing_ctor() else {
            ctx.error(TypeCheckError::InstanceVarOutsideCtor(
                InstanceVarOutsideCtor {
                    name: decl.name.clone(),
                },
                decl.span.clone(),
            ));
            return;
        };
        let receiver = ctor.borrow().receiver_class();
        let Some(receiver) = receiver else {
            return;
        };
        if receiver
            .borrow()
            .resolve_instance_var(decl.instance_var_name())
            .is_none()
        {
            ctx.error(TypeCheckError::InstanceVarNotFound(
                InstanceVarNotFound {
                    name: decl.name.clone(),
                    class: receiver.borrow().name.clone(),
                },
                decl.span.clone(),
            ));
            return;
        }
    }

    let sym = crate::typechecker::scope::VarSymbol::new(
        &decl.name,
        !decl.is_var,
        decl.span.clone(),
    );
    sym.borrow_mut().decl = Some(decl.id);

    let declared = match &decl.maybe_type {
        Some(type_name) => class::resolve_and_instantiate(type_name, ctx),
        None => None,
    };

    let ty = match (declared, rhs_type) {
        (Some(declared), Some(rhs)) => {
            if rhs == declared || rhs.is_instantiated_from(&declared) {
                Some(rhs)
            } else {
                ctx.error(TypeCheckError::TypeMismatch(
                    TypeMismatch {
                        expected: declared,
                        actual: rhs,
                    },
                    decl.span.clone(),
                ));
                return;
            }
        }
        (Some(declared), None) => Some(declared),
        (None, rhs) => rhs,
    };
    sym.borrow_mut().ty = ty;

    *decl.symbol.borrow_mut() = Rc::downgrade(&sym);

    match ctx.current() {
        ScopeRef::Local(local) => {
            if !local.borrow_mut().define_variable(sym) {
                ctx.error(TypeCheckError::RedefinedSymbol(
                    RedefinedSymbol {
                        name: decl.name.clone(),
                    },
                    decl.span.clone(),
                ));
            }
        }
        _ => {
            crate::internal_compiler_error!(
                "variable '{}' declared outside a local scope",
                decl.name
            );
        }
    }
}

fn mark_assignee(expr: &Expression) {
    match expr {
        Expression::VarRef(var) => var.is_lhs_of_assignment.set(true),
        Expression::Index(index) => index.is_assign.set(true),
        Expression::Ufcs(ufcs) => ufcs.is_assign.set(true),
        _ => {}
    }
}

/// The immutable binding an assignment target is rooted at, if any.
fn assignee_root_immutable(expr: &Expression) -> Option<String> {
    match expr {
        Expression::VarRef(var) => {
            let sym = var.symbol.borrow().upgrade()?;
            let sym = sym.borrow();
            sym.immutable.then(|| sym.name.clone())
        }
        Expression::Index(index) => assignee_root_immutable(&index.child),
        Expression::Ufcs(ufcs) => assignee_root_immutable(&ufcs.child),
        _ => None,
    }
}

fn check_assignment(assign: &Rc<AssignmentStmt>, ctx: &mut Context) {
    for assignee in &assign.assignees {
        mark_assignee(assignee);
        check_expression(assignee, ctx);
    }
    for rhs in &assign.rhs_exprs {
        check_expression(rhs, ctx);
    }

    let Some(mut rhs_types) = assign
        .rhs_exprs
        .iter()
        .map(|e| e.ty())
        .collect::<Option<Vec<Type>>>()
    else {
        return;
    };

    if assign.assignees.len() != rhs_types.len() {
        if rhs_types.len() == 1 {
            match &rhs_types[0] {
                Type::Tuple(elements) if elements.len() == assign.assignees.len() => {
                    rhs_types = elements.clone();
                }
                _ => {
                    ctx.error(TypeCheckError::AssignmentArityMismatch(
                        AssignmentArityMismatch {
                            lhs: assign.assignees.len(),
                            rhs: rhs_types.len(),
                        },
                        assign.span.clone(),
                    ));
                    return;
                }
            }
        } else {
            ctx.error(TypeCheckError::AssignmentArityMismatch(
                AssignmentArityMismatch {
                    lhs: assign.assignees.len(),
                    rhs: rhs_types.len(),
                },
                assign.span.clone(),
            ));
            return;
        }
    }

    for (assignee, rhs_type) in assign.assignees.iter().zip(rhs_types.into_iter()) {
        check_single_assignment(assignee, rhs_type, assign, ctx);
    }
}

fn check_single_assignment(
    assignee: &Expression,
    rhs_type: Type,
    assign: &Rc<AssignmentStmt>,
    ctx: &mut Context,
) {
    match assignee {
        Expression::VarRef(var) => {
            if var.name == "_" {
                return;
            }
            if let Some(name) = assignee_root_immutable(assignee) {
                ctx.error(TypeCheckError::ImmutableReassign(
                    ImmutableReassign { name },
                    var.span.clone(),
                ));
                return;
            }
            if let Some(lhs_type) = assignee.ty() {
                if lhs_type != rhs_type {
                    ctx.error(TypeCheckError::TypeMismatch(
                        TypeMismatch {
                            expected: lhs_type,
                            actual: rhs_type,
                        },
                        assign.span.clone(),
                    ));
                }
            }
        }
        Expression::Index(index) => {
            match assignee.ty() {
                // Builtin containers: the element type is already on the
                // node, only the value type needs checking.
                Some(element_type) => {
                    if element_type != rhs_type {
                        ctx.error(TypeCheckError::TypeMismatch(
                            TypeMismatch {
                                expected: element_type,
                                actual: rhs_type,
                            },
                            assign.span.clone(),
                        ));
                        return;
                    }
                    if let Some(name) = assignee_root_immutable(assignee) {
                        ctx.error(TypeCheckError::ImmutableReassign(
                            ImmutableReassign { name },
                            index.span.clone(),
                        ));
                    }
                }
                // A class container dispatches to its `[]=` overload.
                None => {
                    let (Some(child_type), Some(index_type)) =
                        (index.child.ty(), index.index.ty())
                    else {
                        return;
                    };
                    match call::bind_invocation(
                        "[]=",
                        &[child_type, index_type, rhs_type],
                        &index.span,
                        &index.ty,
                        &index.callee,
                        ctx,
                    ) {
                        Ok(callee) => {
                            report_const_violation(&callee, &index.child, &index.span, ctx)
                        }
                        Err(err) => ctx.error(err),
                    }
                }
            }
        }
        Expression::Ufcs(ufcs) => {
            if !ufcs.is_instance_var_access.get() {
                return;
            }
            if let Some(name) = assignee_root_immutable(assignee) {
                ctx.error(TypeCheckError::ImmutableReassign(
                    ImmutableReassign { name },
                    ufcs.span.clone(),
                ));
                return;
            }
            // The field itself must be a `var` as well.
            let field_immutable = ufcs
                .child
                .ty()
                .as_ref()
                .and_then(|t| t.as_class())
                .and_then(|c| c.scope.upgrade())
                .and_then(|class| class.borrow().resolve_instance_var(&ufcs.member_name))
                .map(|sym| sym.borrow().immutable)
                .unwrap_or(false);
            if field_immutable {
                ctx.error(TypeCheckError::ImmutableReassign(
                    ImmutableReassign {
                        name: ufcs.member_name.clone(),
                    },
                    ufcs.span.clone(),
                ));
                return;
            }
            if let Some(lhs_type) = assignee.ty() {
                if lhs_type != rhs_type {
                    ctx.error(TypeCheckError::TypeMismatch(
                        TypeMismatch {
                            expected: lhs_type,
                            actual: rhs_type,
                        },
                        assign.span.clone(),
                    ));
                }
            }
        }
        _ => {
            ctx.error(TypeCheckError::InvalidAssignee(
                InvalidAssignee,
                assignee.span(),
            ));
        }
    }
}
