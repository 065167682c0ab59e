//! Object construction, constructor validation and class template
//! instantiation.
//!
//! Construction drives class templates: the constructor is analyzed (and,
//! when templated, partially instantiated against the argument types)
//! first, so that its `@field` parameters and `@field := ...` statements
//! determine the instance-variable types. The resulting instantiation map
//! must cover every instance variable exactly once; uncovered variables
//! need to be default constructible and get a synthesized default
//! construction at the top of the body. Until the last `@field`
//! initialization has run, the body must not read `self` or call methods
//! on it.

use std::collections::HashSet;
use std::rc::Rc;

use log::debug;

use crate::ast::{
    self, Expression, FunctionDefinition, InitializeStmt, LiteralValue, ObjectConstruct,
    Statement, TypeName, VariableDecl,
};
use crate::ast::Visitor;
use crate::internal_compiler_error;
use crate::span::Span;
use crate::typechecker::call;
use crate::typechecker::context::Context;
use crate::typechecker::error::*;
use crate::typechecker::expression::check_expression;
use crate::typechecker::forward;
use crate::typechecker::scope::{ClassScopeRef, FuncScopeRef, ScopeRef, VarSymbol};
use crate::typechecker::statement;
use crate::typechecker::types::{self, Type};
use crate::typechecker::TypeResult;

/// Instance variable name to known type; `None` marks a still-unresolved
/// template variable.
type InstantiationMap = Vec<(String, Option<Type>)>;

fn generate_instantiation_map(scope: &ClassScopeRef) -> InstantiationMap {
    scope
        .borrow()
        .instance_var_symbols
        .iter()
        .map(|sym| {
            let sym = sym.borrow();
            let ty = match &sym.ty {
                Some(Type::Template(_)) | None => None,
                Some(ty) => Some(ty.clone()),
            };
            (sym.name.clone(), ty)
        })
        .collect()
}

fn map_get_mut<'a>(map: &'a mut InstantiationMap, name: &str) -> Option<&'a mut Option<Type>> {
    map.iter_mut()
        .find(|(n, _)| n == name)
        .map(|(_, ty)| ty)
}

/// Resolve a type node and instantiate any class template mentioned with
/// explicit arguments (`Foo(int)` in type position).
pub fn resolve_and_instantiate(node: &TypeName, ctx: &mut Context) -> Option<Type> {
    let ty = types::resolve_type_node(node, ctx)?;
    instantiate_in_type(&ty, &node.span(), ctx)
}

/// Replace every `Class` with explicit template arguments inside `ty`
/// by its instantiation. `None` means instantiation failed (reported).
pub fn instantiate_in_type(ty: &Type, span: &Span, ctx: &mut Context) -> Option<Type> {
    match ty {
        Type::Class(c) if !c.args.is_empty() => {
            let scope = c.scope.upgrade()?;
            if !scope.borrow().is_template() {
                return Some(ty.clone());
            }
            let mut args = vec![];
            for arg in &c.args {
                args.push(instantiate_in_type(arg, span, ctx)?);
            }
            match instantiate_class_from_specified(&scope, &args, span, ctx) {
                Ok(instantiated) => Some(instantiated.borrow().ty.clone()),
                Err(err) => {
                    ctx.error(err);
                    None
                }
            }
        }
        Type::Array { element, size } => Some(Type::Array {
            element: Box::new(instantiate_in_type(element, span, ctx)?),
            size: *size,
        }),
        Type::Pointer(pointee) => {
            Some(Type::pointer(instantiate_in_type(pointee, span, ctx)?))
        }
        Type::Maybe(inner) => Some(Type::maybe(instantiate_in_type(inner, span, ctx)?)),
        Type::Tuple(elements) => {
            let mut out = vec![];
            for element in elements {
                out.push(instantiate_in_type(element, span, ctx)?);
            }
            Some(Type::Tuple(out))
        }
        _ => Some(ty.clone()),
    }
}

/// Instantiate a class template from explicitly specified template
/// parameter types, in instance-variable order.
pub fn instantiate_class_from_specified(
    scope: &ClassScopeRef,
    specified: &[Type],
    span: &Span,
    ctx: &mut Context,
) -> TypeResult<ClassScopeRef> {
    let template_count = scope
        .borrow()
        .instance_var_types()
        .iter()
        .filter(|t| matches!(t, Some(Type::Template(_)) | None))
        .count();

    if specified.len() != template_count {
        return Err(TypeCheckError::TemplateArityMismatch(
            TemplateArityMismatch {
                class: scope.borrow().name.clone(),
                specified: specified.len(),
                templates: template_count,
            },
            span.clone(),
        ));
    }

    let mut map = generate_instantiation_map(scope);
    {
        let mut specified = specified.iter();
        for (_, ty) in map.iter_mut() {
            if ty.is_none() {
                *ty = specified.next().cloned();
            }
        }
    }

    let Some(def) = scope.borrow().get_ast_node() else {
        internal_compiler_error!("class '{}' without AST", scope.borrow().name);
    };
    let instantiated = prepare_class_from_template(&def, &map, ctx);
    let Some(instantiated_scope) = instantiated.scope.borrow().upgrade() else {
        internal_compiler_error!("instantiated class lost its scope");
    };
    Ok(instantiated_scope)
}

fn already_instantiated_class(
    def: &Rc<ast::ClassDefinition>,
    map: &InstantiationMap,
) -> Option<Rc<ast::ClassDefinition>> {
    let instantiated = def.instantiated.borrow().clone();
    for candidate in instantiated {
        let Some(scope) = candidate.scope.borrow().upgrade() else {
            continue;
        };
        let matches = scope.borrow().instance_var_symbols.iter().all(|sym| {
            let sym = sym.borrow();
            map.iter()
                .find(|(name, _)| *name == sym.name)
                .map(|(_, ty)| ty.as_ref() == sym.ty.as_ref())
                .unwrap_or(false)
        });
        if matches {
            return Some(candidate);
        }
    }
    None
}

/// Deep-copy the class template, substitute the instance-variable types
/// from the map and analyze the copy. Reuses an existing instantiation
/// with the same substitutions.
fn prepare_class_from_template(
    def: &Rc<ast::ClassDefinition>,
    map: &InstantiationMap,
    ctx: &mut Context,
) -> Rc<ast::ClassDefinition> {
    if let Some(existing) = already_instantiated_class(def, map) {
        return existing;
    }

    let copied = ast::copy_class_definition(def);
    let global = ScopeRef::Global(ctx.global.clone());
    ctx.with_scope(global.clone(), |ctx| {
        forward::declare_class_name(&copied, ctx);
        forward::declare_class_members(&copied, ctx);
    });

    let Some(copied_scope) = copied.scope.borrow().upgrade() else {
        internal_compiler_error!("copied class '{}' has no scope", copied.name);
    };

    // Substitute instance variables first, then the matching `@field`
    // constructor parameters.
    for sym in copied_scope.borrow().instance_var_symbols.iter() {
        let name = sym.borrow().name.clone();
        let is_template = matches!(sym.borrow().ty, Some(Type::Template(_)) | None);
        if is_template {
            let substituted = map
                .iter()
                .find(|(n, _)| *n == name)
                .and_then(|(_, ty)| ty.clone());
            if let Some(substituted) = substituted {
                sym.borrow_mut().ty = Some(substituted);
            }
        }
    }

    for func in copied.member_funcs.borrow().iter() {
        if !func.is_ctor() {
            continue;
        }
        let Some(func_scope) = func.scope.borrow().upgrade() else {
            continue;
        };
        let params = func_scope.borrow().params.clone();
        for (param, sym) in func.params.iter().zip(params.iter()) {
            if !param.is_instance_var_init() {
                continue;
            }
            if !matches!(sym.borrow().ty, Some(Type::Template(_)) | None) {
                continue;
            }
            let substituted = map
                .iter()
                .find(|(n, _)| n == param.instance_var_name())
                .and_then(|(_, ty)| ty.clone());
            if let Some(substituted) = substituted {
                sym.borrow_mut().ty = Some(substituted.clone());
                *param.ty.borrow_mut() = Some(substituted);
            }
        }
    }

    def.instantiated.borrow_mut().push(copied.clone());
    debug!(
        "instantiated class '{}' as '{}'",
        def.name,
        copied_scope.borrow().name
    );

    ctx.with_scope(global, |ctx| {
        statement::check_class_definition(&copied, ctx);
    });

    copied
}

/// Temporarily substitute the constructor's `@field` parameter types into
/// the class template's instance variables and analyze the body, so the
/// `@field := ...` statements inside it get types. The template is
/// restored afterwards.
fn walk_ctor_body_to_infer(
    class_scope: &ClassScopeRef,
    ctor: &FuncScopeRef,
    ctor_def: &Rc<FunctionDefinition>,
    ctx: &mut Context,
) {
    let vars = class_scope.borrow().instance_var_symbols.clone();
    let saved: Vec<Option<Type>> = vars.iter().map(|v| v.borrow().ty.clone()).collect();

    let params = ctor.borrow().params.clone();
    for (param, sym) in ctor_def.params.iter().zip(params.iter()) {
        if !param.is_instance_var_init() {
            continue;
        }
        if let Some(var) = vars
            .iter()
            .find(|v| v.borrow().name == param.instance_var_name())
        {
            var.borrow_mut().ty = sym.borrow().ty.clone();
        }
    }

    ctx.function_depth += 1;
    ctx.with_scope(ScopeRef::Func(ctor.clone()), |ctx| {
        statement::check_block(&ctor_def.body, ctx);
    });
    ctx.function_depth -= 1;

    for (var, old) in vars.iter().zip(saved.into_iter()) {
        var.borrow_mut().ty = old;
    }
}

/// Statements reading `self` (or members through it) before construction
/// finished.
struct SelfAccessChecker {
    /// `(member name, is function call)`; `None` member is bare `self`.
    violation: Option<(Option<String>, bool)>,
}

impl SelfAccessChecker {
    fn record(&mut self, member: Option<String>, is_func: bool) {
        if self.violation.is_none() {
            self.violation = Some((member, is_func));
        }
    }
}

impl ast::Visitor for SelfAccessChecker {
    fn visit_expression(&mut self, expr: &Expression) {
        if self.violation.is_some() {
            return;
        }
        match expr {
            Expression::VarRef(var) if var.name == "self" => self.record(None, false),
            Expression::VarRef(var) if var.name.starts_with('@') => {
                self.record(Some(var.name.trim_start_matches('@').into()), false);
            }
            Expression::Ufcs(ufcs) => {
                if let Expression::VarRef(var) = &ufcs.child {
                    if var.name == "self" {
                        self.record(Some(ufcs.member_name.clone()), false);
                        return;
                    }
                }
                ast::walk_expression(self, expr);
            }
            Expression::Invocation(inv) if inv.is_ufcs => {
                let receiver_is_self = inv
                    .args
                    .borrow()
                    .first()
                    .map(|a| matches!(a, Expression::VarRef(v) if v.name == "self"))
                    .unwrap_or(false);
                if receiver_is_self {
                    if let Expression::VarRef(callee) = &*inv.child.borrow() {
                        self.record(Some(callee.name.clone()), true);
                        return;
                    }
                }
                ast::walk_expression(self, expr);
            }
            _ => ast::walk_expression(self, expr),
        }
    }
}

/// Validate the constructor against the class's instance variables and
/// complete the instantiation map. Returns the fully resolved map, or
/// `None` after reporting what went wrong.
fn check_ctor_instantiation(
    mut map: InstantiationMap,
    class_name: &str,
    ctor: &FuncScopeRef,
    ctor_def: &Rc<FunctionDefinition>,
    ctx: &mut Context,
) -> Option<Vec<(String, Type)>> {
    let mut initialized: HashSet<String> = HashSet::new();
    let mut first_init: Vec<(String, Span)> = vec![];
    let mut failed = false;

    let mut unify = |map: &mut InstantiationMap,
                     name: &str,
                     actual: Option<Type>,
                     span: &Span,
                     ctx: &mut Context|
     -> bool {
        let Some(slot) = map_get_mut(map, name) else {
            ctx.error(TypeCheckError::InstanceVarNotFound(
                InstanceVarNotFound {
                    name: format!("@{name}"),
                    class: class_name.into(),
                },
                span.clone(),
            ));
            return false;
        };
        let Some(actual) = actual else {
            return false;
        };
        match slot {
            None => {
                *slot = Some(actual);
                true
            }
            Some(expected) if actual.is_instantiated_from(expected) => {
                *slot = Some(actual);
                true
            }
            Some(expected) if *expected != actual => {
                ctx.error(TypeCheckError::InstanceVarTypeMismatch(
                    InstanceVarTypeMismatch {
                        name: format!("@{name}"),
                        expected: expected.clone(),
                        actual,
                    },
                    span.clone(),
                ));
                false
            }
            Some(_) => true,
        }
    };

    // `@field` parameters initialize their variables on entry.
    let param_syms = ctor.borrow().params.clone();
    for (param, sym) in ctor_def.params.iter().zip(param_syms.iter()) {
        if !param.is_instance_var_init() {
            continue;
        }
        let name = param.instance_var_name().to_string();
        let actual = sym.borrow().ty.clone();
        if unify(&mut map, &name, actual, &param.span, ctx) {
            initialized.insert(name.clone());
            first_init.push((name, param.span.clone()));
        } else {
            failed = true;
        }
    }

    let body_stmts = ctor_def.body.statements.borrow().clone();

    // Index one past the last statement initializing an instance
    // variable; self access is restricted up to there.
    let init_end_point = body_stmts
        .iter()
        .rposition(|stmt| match stmt {
            Statement::Initialize(init) => {
                init.var_decls.iter().any(|d| d.is_instance_var())
            }
            _ => false,
        })
        .map(|idx| idx + 1)
        .unwrap_or(0);

    for (idx, stmt) in body_stmts.iter().enumerate() {
        if idx < init_end_point && initialized.len() < map.len() {
            let mut checker = SelfAccessChecker { violation: None };
            checker.visit_statement(stmt);
            if let Some((member, is_func)) = checker.violation {
                let not_yet = member
                    .as_ref()
                    .map(|m| !initialized.contains(m))
                    .unwrap_or(true);
                if not_yet {
                    ctx.error(TypeCheckError::SelfAccessBeforeInit(
                        SelfAccessBeforeInit { member, is_func },
                        ctor_def.span.clone(),
                    ));
                    failed = true;
                }
            }
        }

        let Statement::Initialize(init) = stmt else {
            continue;
        };
        for decl in &init.var_decls {
            if !decl.is_instance_var() {
                continue;
            }
            let name = decl.instance_var_name().to_string();
            if let Some((_, first)) = first_init.iter().find(|(n, _)| *n == name) {
                ctx.error(TypeCheckError::DoubleInit(
                    DoubleInit {
                        name: decl.name.clone(),
                        first: first.clone(),
                    },
                    decl.span.clone(),
                ));
                failed = true;
                continue;
            }
            let actual = decl
                .symbol
                .borrow()
                .upgrade()
                .and_then(|s| s.borrow().ty.clone());
            if unify(&mut map, &name, actual, &decl.span, ctx) {
                initialized.insert(name.clone());
                first_init.push((name, decl.span.clone()));
            } else {
                failed = true;
            }
        }
    }

    for (name, ty) in &map {
        if ty.is_none() {
            ctx.error(TypeCheckError::CannotDetermineInstanceVarType(
                CannotDetermineInstanceVarType {
                    class: class_name.into(),
                    name: name.clone(),
                },
                ctor_def.span.clone(),
            ));
            failed = true;
        }
    }

    // Variables the constructor leaves untouched must be default
    // constructible; classes get an explicit default construction
    // synthesized at the top of the body.
    for (name, ty) in &map {
        if initialized.contains(name) {
            continue;
        }
        let Some(ty) = ty else {
            continue;
        };
        if !ty.is_default_constructible() {
            ctx.error(TypeCheckError::NotDefaultConstructible(
                NotDefaultConstructible {
                    name: name.clone(),
                    ty: ty.clone(),
                },
                ctor_def.span.clone(),
            ));
            failed = true;
            continue;
        }
        if let Type::Class(_) = ty {
            if let Some(init) =
                synthesize_default_init(name, ty, ctor, &ctor_def.span, ctx)
            {
                ctor_def
                    .body
                    .statements
                    .borrow_mut()
                    .insert(0, Statement::Initialize(init));
            } else {
                failed = true;
            }
        }
    }

    if failed {
        return None;
    }
    map.into_iter()
        .map(|(name, ty)| ty.map(|ty| (name, ty)))
        .collect()
}

/// `@name := new C` inserted at the top of a constructor body. The
/// construction is resolved right here; the statement carries filled
/// slots rather than going through another analysis round.
fn synthesize_default_init(
    name: &str,
    ty: &Type,
    ctor: &FuncScopeRef,
    span: &Span,
    ctx: &mut Context,
) -> Option<Rc<InitializeStmt>> {
    let class_scope = ty.as_class()?.scope.upgrade()?;
    let receiver = class_scope.borrow().ty.clone();
    let (constructed, callee) = match construct_class(&class_scope, vec![receiver], span, ctx) {
        Ok(pair) => pair,
        Err(err) => {
            ctx.error(err);
            return None;
        }
    };

    let type_name = TypeName::primary(&class_scope.borrow().name, span.clone());
    let construct = Expression::construct(type_name, vec![], span.clone());
    if let Expression::Construct(node) = &construct {
        *node.constructed_class.borrow_mut() = Rc::downgrade(&constructed);
        *node.callee_ctor.borrow_mut() = Rc::downgrade(&callee);
    }
    construct.set_type(constructed.borrow().ty.clone());

    let decl = VariableDecl::new(false, format!("@{name}"), None, span.clone());
    let sym = VarSymbol::with_type(format!("@{name}"), construct.ty()?, true, span.clone());
    sym.borrow_mut().decl = Some(decl.id);
    *decl.symbol.borrow_mut() = Rc::downgrade(&sym);
    if let Some(body) = ctor.borrow().body.clone() {
        body.borrow_mut().define_variable(sym);
    }

    Some(InitializeStmt::new(
        vec![decl],
        Some(vec![construct]),
        span.clone(),
    ))
}

/// The full construction path shared by `new` expressions, literal
/// rewriting and the synthesized `main` argument: resolve the
/// constructor, analyze it, drive class/function template instantiation
/// and return the concrete class scope plus the constructor to call.
pub fn construct_class(
    scope: &ClassScopeRef,
    mut arg_types: Vec<Type>,
    span: &Span,
    ctx: &mut Context,
) -> TypeResult<(ClassScopeRef, FuncScopeRef)> {
    let class_name = scope.borrow().name.clone();

    let candidates = scope.borrow().resolve_ctor(&arg_types);
    if candidates.is_empty() {
        return Err(TypeCheckError::CtorNotFound(
            CtorNotFound { class: class_name },
            span.clone(),
        ));
    }
    if candidates.len() > 1 {
        return Err(TypeCheckError::AmbiguousCall(
            AmbiguousCall {
                signature: call::func_signature("init", &arg_types),
                candidates: candidates.iter().map(|c| c.borrow().to_string()).collect(),
            },
            span.clone(),
        ));
    }

    let mut ctor = candidates.into_iter().next().unwrap();
    let Some(mut ctor_def) = ctor.borrow().get_ast_node() else {
        internal_compiler_error!("constructor of '{class_name}' without AST");
    };

    // Analyze the constructor before reading its initializations.
    if !ctx.visited_functions.contains(&ctor_def.id) {
        let Some(enclosing) = ctor.borrow().enclosing.upgrade() else {
            internal_compiler_error!("constructor of '{class_name}' lost its class");
        };
        ctx.with_scope(enclosing, |ctx| {
            statement::check_function_definition(&ctor_def, ctx);
        });
    }

    if ctor.borrow().is_template() {
        let (inst_def, inst_ctor) = call::instantiate_function(&ctor_def, &arg_types, ctx)?;
        ctor_def = inst_def;
        ctor = inst_ctor;
    }

    let class_is_template = scope.borrow().is_template();

    if ctor.borrow().is_template()
        && class_is_template
        && !ctx.visited_ctor_bodies.contains(&ctor_def.id)
    {
        // The constructor stayed templated because its receiver is a
        // class template; its initializations are still needed to decide
        // the instantiation, so the body is walked with the parameter
        // types temporarily substituted in.
        walk_ctor_body_to_infer(scope, &ctor, &ctor_def, ctx);
        ctx.visited_ctor_bodies.insert(ctor_def.id);
    }

    let map = generate_instantiation_map(scope);
    let Some(map) = check_ctor_instantiation(map, &class_name, &ctor, &ctor_def, ctx) else {
        return Err(TypeCheckError::ClassInstantiationFailure(
            ClassInstantiationFailure {
                class: class_name,
                ctor: ctor.borrow().to_string(),
            },
            span.clone(),
        ));
    };

    if !class_is_template {
        return Ok((scope.clone(), ctor));
    }

    // Instantiate the class, then re-resolve the constructor against the
    // instantiated receiver.
    let Some(template_def) = scope.borrow().get_ast_node() else {
        internal_compiler_error!("class template '{class_name}' without AST");
    };
    let map: InstantiationMap = map.into_iter().map(|(n, t)| (n, Some(t))).collect();
    let instantiated = prepare_class_from_template(&template_def, &map, ctx);
    let Some(instantiated_scope) = instantiated.scope.borrow().upgrade() else {
        internal_compiler_error!("instantiated class lost its scope");
    };

    arg_types[0] = instantiated_scope.borrow().ty.clone();
    let ctors = instantiated_scope.borrow().resolve_ctor(&arg_types);
    let Some(mut final_ctor) = ctors.into_iter().next() else {
        return Err(TypeCheckError::CtorNotFound(
            CtorNotFound {
                class: instantiated_scope.borrow().name.clone(),
            },
            span.clone(),
        ));
    };

    let Some(mut final_def) = final_ctor.borrow().get_ast_node() else {
        internal_compiler_error!("instantiated constructor without AST");
    };
    if final_ctor.borrow().is_template() {
        let (inst_def, inst_ctor) = call::instantiate_function(&final_def, &arg_types, ctx)?;
        final_def = inst_def;
        final_ctor = inst_ctor;
    }

    // The final constructor needs its own validation pass so default
    // initializations land in the body that is actually emitted.
    let final_map = generate_instantiation_map(&instantiated_scope);
    let class_name = instantiated_scope.borrow().name.clone();
    if check_ctor_instantiation(final_map, &class_name, &final_ctor, &final_def, ctx).is_none() {
        return Err(TypeCheckError::ClassInstantiationFailure(
            ClassInstantiationFailure {
                class: class_name,
                ctor: final_ctor.borrow().to_string(),
            },
            span.clone(),
        ));
    }

    Ok((instantiated_scope, final_ctor))
}

/// `new T{...}` for every kind of `T`: classes go through constructor
/// resolution, arrays and pointers have a small builtin rule, and other
/// builtins accept zero arguments or a single copy.
pub fn check_object_construct(node: &Rc<ObjectConstruct>, ctx: &mut Context) {
    let Some(ty) = resolve_and_instantiate(&node.type_name, ctx) else {
        return;
    };

    for arg in &node.args {
        check_expression(arg, ctx);
    }

    if let Type::Class(class) = &ty {
        let Some(scope) = class.scope.upgrade() else {
            internal_compiler_error!("class type '{}' without scope", class.name);
        };
        let mut arg_types = vec![scope.borrow().ty.clone()];
        for arg in &node.args {
            let Some(arg_ty) = arg.ty() else {
                return;
            };
            arg_types.push(arg_ty);
        }
        match construct_class(&scope, arg_types, &node.span, ctx) {
            Ok((constructed, ctor)) => {
                let result = constructed.borrow().ty.clone();
                *node.constructed_class.borrow_mut() = Rc::downgrade(&constructed);
                *node.callee_ctor.borrow_mut() = Rc::downgrade(&ctor);
                *node.ty.borrow_mut() = Some(result);
            }
            Err(err) => ctx.error(err),
        }
        return;
    }

    if let Some(result) = check_builtin_construct(&ty, node, ctx) {
        *node.ty.borrow_mut() = Some(result);
    }
}

fn check_builtin_construct(
    ty: &Type,
    node: &Rc<ObjectConstruct>,
    ctx: &mut Context,
) -> Option<Type> {
    let error = |ctx: &mut Context, note: &str| {
        ctx.error(TypeCheckError::InvalidConstruction(
            InvalidConstruction {
                ty: ty.clone(),
                note: note.into(),
            },
            node.span.clone(),
        ));
        None
    };

    let arg_types: Option<Vec<Type>> = node.args.iter().map(|a| a.ty()).collect();
    let arg_types = arg_types?;

    match ty {
        Type::Array { element, .. } => {
            // 0..2 arguments: a constant uint size and an optional
            // initial value.
            if node.args.len() > 2 {
                return error(ctx, "array construction takes at most two arguments");
            }
            let mut size = None;
            if let Some(size_arg) = node.args.first() {
                let constant = match size_arg {
                    Expression::Literal(lit) => match lit.value {
                        LiteralValue::UInt(v) => Some(v),
                        LiteralValue::Int(v) if v >= 0 => Some(v as u64),
                        _ => None,
                    },
                    _ => None,
                };
                let Some(constant) = constant else {
                    return error(ctx, "size of array must be a constant unsigned integer");
                };
                size = Some(constant);
            }
            if let Some(init_ty) = arg_types.get(1) {
                if init_ty != element.as_ref() {
                    return error(ctx, "initial value type mismatches the element type");
                }
            }
            Some(Type::Array {
                element: element.clone(),
                size,
            })
        }
        Type::Pointer(_) => {
            if arg_types.len() != 1 || !arg_types[0].is_int_or_uint() {
                return error(ctx, "pointer construction takes one uint count");
            }
            Some(ty.clone())
        }
        Type::Builtin(_) => match arg_types.len() {
            0 => Some(ty.clone()),
            1 if arg_types[0] == *ty => Some(ty.clone()),
            _ => error(ctx, "builtin construction takes zero arguments or one value"),
        },
        Type::Tuple(elements) => {
            if arg_types.is_empty() || arg_types == *elements {
                Some(ty.clone())
            } else {
                error(ctx, "tuple construction arguments mismatch the element types")
            }
        }
        Type::Maybe(inner) => match arg_types.len() {
            0 => Some(ty.clone()),
            1 if arg_types[0] == **inner => Some(ty.clone()),
            _ => error(ctx, "maybe construction takes zero arguments or one value"),
        },
        _ => error(ctx, "the type is not constructible"),
    }
}

/// Whole-program entry point validation plus the synthesized
/// construction of `main`'s command-line argument.
pub fn analyze_main_func(ctx: &mut Context) {
    let mains: Vec<FuncScopeRef> = ctx
        .global
        .borrow()
        .functions
        .iter()
        .filter(|f| f.borrow().is_main_func())
        .cloned()
        .collect();

    let Some(main) = mains.first().cloned() else {
        ctx.error(TypeCheckError::MissingMainFunction(
            MissingMainFunction,
            Span::start_of_file(""),
        ));
        return;
    };

    if mains.len() > 1 {
        let span = mains[1]
            .borrow()
            .get_ast_node()
            .map(|d| d.span.clone())
            .unwrap_or_default();
        ctx.error(TypeCheckError::MainCannotBeOverloaded(
            MainCannotBeOverloaded {
                candidates: mains.iter().map(|m| m.borrow().to_string()).collect(),
            },
            span,
        ));
        return;
    }

    let span = main
        .borrow()
        .get_ast_node()
        .map(|d| d.span.clone())
        .unwrap_or_default();

    let params = main.borrow().params.clone();
    match params.len() {
        0 => {}
        1 => {
            let param = params[0].borrow().clone();
            if !param.immutable {
                ctx.error(TypeCheckError::MainParamMustBeImmutable(
                    MainParamMustBeImmutable { name: param.name },
                    span,
                ));
                return;
            }
            let is_argv = param
                .ty
                .as_ref()
                .and_then(|t| t.as_class())
                .map(|c| c.name == "argv" && c.scope.upgrade().is_some())
                .unwrap_or(false);
            if !is_argv {
                ctx.error(TypeCheckError::InvalidMainSignature(
                    InvalidMainSignature {
                        signature: main.borrow().to_string(),
                    },
                    span,
                ));
                return;
            }
            synthesize_main_arg(ctx, &span);
        }
        _ => {
            ctx.error(TypeCheckError::InvalidMainSignature(
                InvalidMainSignature {
                    signature: main.borrow().to_string(),
                },
                span,
            ));
        }
    }
}

/// `main(args)` receives an `argv` object built from the runtime's
/// argument count and vector.
fn synthesize_main_arg(ctx: &mut Context, span: &Span) {
    let Some(argv_class) = ctx.current().resolve_class("argv") else {
        ctx.error(TypeCheckError::UndefinedType(
            UndefinedType {
                name: "argv".into(),
            },
            span.clone(),
        ));
        return;
    };

    let receiver = argv_class.borrow().ty.clone();
    let arg_types = vec![
        receiver,
        Type::uint(),
        Type::pointer(Type::pointer(Type::char_type())),
    ];
    match construct_class(&argv_class, arg_types, span, ctx) {
        Ok((_, ctor)) => ctx.main_arg_ctor = Some(ctor),
        Err(err) => ctx.error(err),
    }
}
