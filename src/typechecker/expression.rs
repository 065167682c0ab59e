//! Expression-type deduction.
//!
//! Children are analyzed first, then the node's own rule runs: literals
//! get their builtin types (array and string literals are rewritten into
//! constructions of the runtime classes), operators split into the
//! builtin path and the overloaded path, invocations go through overload
//! resolution, and `new` expressions hand over to object construction.
//! A node that cannot be typed reports a diagnostic and leaves its type
//! slot empty; parents bail out quietly on untyped children so one error
//! does not cascade.

use std::rc::Rc;

use crate::ast::{
    self, BinaryExpr, Expression, FuncInvocation, IndexAccess, LambdaExpr, LiteralValue,
    TypedExpr, UfcsInvocation, UnaryExpr,
};
use crate::typechecker::call;
use crate::typechecker::class;
use crate::typechecker::const_check;
use crate::typechecker::context::Context;
use crate::typechecker::error::*;
use crate::typechecker::forward;
use crate::typechecker::scope::ClassScopeRef;
use crate::typechecker::statement;
use crate::typechecker::types::{BuiltinType, Type};

pub fn check_expression(expr: &Expression, ctx: &mut Context) {
    if expr.ty().is_some() {
        return;
    }

    match expr {
        Expression::Literal(lit) => match &lit.value {
            LiteralValue::Int(_) => expr.set_type(Type::int()),
            LiteralValue::UInt(_) => expr.set_type(Type::uint()),
            LiteralValue::Float(_) => expr.set_type(Type::float()),
            LiteralValue::Char(_) => expr.set_type(Type::char_type()),
            LiteralValue::Bool(_) => expr.set_type(Type::boolean()),
            LiteralValue::Str(_) => {
                // "..." is sugar for constructing the string class from
                // the raw character data and its length.
                let Some(string_class) = ctx.current().resolve_class("string") else {
                    ctx.error(TypeCheckError::UndefinedType(
                        UndefinedType {
                            name: "string".into(),
                        },
                        lit.span.clone(),
                    ));
                    return;
                };
                let receiver = string_class.borrow().ty.clone();
                let args = vec![receiver, Type::pointer(Type::char_type()), Type::uint()];
                match class::construct_class(&string_class, args, &lit.span, ctx) {
                    Ok((class_scope, ctor)) => {
                        let ty = class_scope.borrow().ty.clone();
                        *lit.constructed_class.borrow_mut() = Rc::downgrade(&class_scope);
                        *lit.callee_ctor.borrow_mut() = Rc::downgrade(&ctor);
                        expr.set_type(ty);
                    }
                    Err(err) => ctx.error(err),
                }
            }
        },
        Expression::Symbol(_) => expr.set_type(Type::symbol()),
        Expression::Array(arr) => {
            for element in &arr.elements {
                check_expression(element, ctx);
            }
            let Some(elem_types) = types_of(&arr.elements) else {
                return;
            };

            let Some(first) = elem_types.first() else {
                // An empty literal is only typable through a ':'
                // annotation, which fills the slot before we get here.
                ctx.error(TypeCheckError::EmptyArrayLiteral(
                    EmptyArrayLiteral,
                    arr.span.clone(),
                ));
                return;
            };

            for other in &elem_types[1..] {
                if other != first {
                    ctx.error(TypeCheckError::ArrayElementMismatch(
                        ArrayElementMismatch {
                            expected: first.clone(),
                            actual: other.clone(),
                        },
                        arr.span.clone(),
                    ));
                    return;
                }
            }

            construct_array_literal(arr, first.clone(), ctx);
        }
        Expression::Tuple(tuple) => {
            for element in &tuple.elements {
                check_expression(element, ctx);
            }
            if tuple.elements.len() == 1 {
                ctx.error(TypeCheckError::SingleElementTuple(
                    SingleElementTuple,
                    tuple.span.clone(),
                ));
                return;
            }
            if let Some(elem_types) = types_of(&tuple.elements) {
                expr.set_type(Type::Tuple(elem_types));
            }
        }
        Expression::Dict(dict) => {
            for (key, value) in &dict.entries {
                check_expression(key, ctx);
                check_expression(value, ctx);
            }
            ctx.error(TypeCheckError::NotImplemented(
                NotImplemented {
                    feature: "dict literal",
                },
                dict.span.clone(),
            ));
        }
        Expression::Lambda(lambda) => check_lambda(lambda, ctx),
        Expression::VarRef(var) => check_var_ref(expr, var, ctx),
        Expression::Unary(unary) => check_unary(expr, unary, ctx),
        Expression::Binary(binary) => check_binary(expr, binary, ctx),
        Expression::Cast(cast) => {
            check_expression(&cast.expr, ctx);
            if let Some(target) = class::resolve_and_instantiate(&cast.target, ctx) {
                // A user-defined cast function is not consulted; the
                // expression takes the declared type as-is.
                expr.set_type(target);
            }
        }
        Expression::Typed(typed) => check_typed(expr, typed, ctx),
        Expression::If(if_expr) => {
            check_expression(&if_expr.condition, ctx);
            check_expression(&if_expr.then_expr, ctx);
            check_expression(&if_expr.else_expr, ctx);

            let (Some(cond), Some(then_type), Some(else_type)) = (
                if_expr.condition.ty(),
                if_expr.then_expr.ty(),
                if_expr.else_expr.ty(),
            ) else {
                return;
            };

            if cond != Type::boolean() {
                ctx.error(TypeCheckError::ConditionNotBool(
                    ConditionNotBool { ty: cond },
                    if_expr.span.clone(),
                ));
                return;
            }
            if then_type != else_type {
                ctx.error(TypeCheckError::IfBranchMismatch(
                    IfBranchMismatch {
                        then_type,
                        else_type,
                    },
                    if_expr.span.clone(),
                ));
                return;
            }
            expr.set_type(then_type);
        }
        Expression::Index(index) => check_index(expr, index, ctx),
        Expression::Invocation(inv) => check_invocation(inv, ctx),
        Expression::Ufcs(ufcs) => check_ufcs(expr, ufcs, ctx),
        Expression::Construct(construct) => class::check_object_construct(construct, ctx),
    }
}

fn types_of(exprs: &[Expression]) -> Option<Vec<Type>> {
    exprs.iter().map(|e| e.ty()).collect()
}

/// Rewrite `[e1, e2, ...]` into `array` class construction with the
/// deduced element type, driving the same resolution and instantiation
/// path as user-written construction.
pub fn construct_array_literal(arr: &Rc<ast::ArrayLiteral>, elem_type: Type, ctx: &mut Context) {
    let Some(array_class) = ctx.current().resolve_class("array") else {
        ctx.error(TypeCheckError::UndefinedType(
            UndefinedType {
                name: "array".into(),
            },
            arr.span.clone(),
        ));
        return;
    };

    let receiver = array_class.borrow().ty.clone();
    let args = vec![receiver, Type::pointer(elem_type), Type::uint()];
    match class::construct_class(&array_class, args, &arr.span, ctx) {
        Ok((class_scope, ctor)) => {
            let ty = class_scope.borrow().ty.clone();
            *arr.constructed_class.borrow_mut() = Rc::downgrade(&class_scope);
            *arr.callee_ctor.borrow_mut() = Rc::downgrade(&ctor);
            *arr.ty.borrow_mut() = Some(ty);
        }
        Err(err) => ctx.error(err),
    }
}

fn check_lambda(lambda: &Rc<LambdaExpr>, ctx: &mut Context) {
    // Lambdas inside `typeof` reach the analyzer without having met the
    // forward pass.
    if lambda.def.scope.borrow().upgrade().is_none() {
        forward::declare_lambda(lambda, ctx);
    }

    statement::check_function_definition(&lambda.def, ctx);

    let Some(scope) = lambda.def.scope.borrow().upgrade() else {
        return;
    };
    ctx.global.borrow_mut().define_function(scope.clone());
    *lambda.ty.borrow_mut() = Some(Type::generic_func(&scope));
    ctx.lambdas.push(lambda.clone());
}

fn check_var_ref(expr: &Expression, var: &Rc<ast::VarRef>, ctx: &mut Context) {
    if var.is_lhs_of_assignment.get() && var.name == "_" {
        return;
    }

    let symbol = match ctx.current().resolve_var(&var.name) {
        Some(sym) => Some(sym),
        None if var.name.starts_with('@') => {
            // Instance variable sugar inside a member function.
            ctx.enclosing_receiver_class()
                .and_then(|class: ClassScopeRef| {
                    class
                        .borrow()
                        .resolve_instance_var(var.name.trim_start_matches('@'))
                })
        }
        None => None,
    };

    let Some(symbol) = symbol else {
        ctx.error(TypeCheckError::UndefinedSymbol(
            UndefinedSymbol {
                name: var.name.clone(),
            },
            var.span.clone(),
        ));
        return;
    };

    *var.symbol.borrow_mut() = Rc::downgrade(&symbol);

    // Cloning the type matters for generic function references: the
    // invocation updates the reference to the instantiated function on
    // the node without touching the defining symbol.
    let ty = symbol.borrow().ty.clone();
    if let Some(ty) = ty {
        expr.set_type(ty);
    }
}

fn check_unary(expr: &Expression, unary: &Rc<UnaryExpr>, ctx: &mut Context) {
    check_expression(&unary.operand, ctx);
    let Some(operand_type) = unary.operand.ty() else {
        return;
    };

    if operand_type.is_builtin() {
        if unary.op == ast::UnaryOperator::Not {
            if operand_type != Type::boolean() {
                ctx.error(TypeCheckError::InvalidBuiltinOperator(
                    InvalidBuiltinOperator {
                        op: unary.op.as_str().into(),
                        ty: operand_type,
                    },
                    unary.span.clone(),
                ));
                return;
            }
            expr.set_type(Type::boolean());
        } else {
            expr.set_type(operand_type);
        }
        return;
    }

    match call::bind_invocation(
        unary.op.as_str(),
        &[operand_type],
        &unary.span,
        &unary.ty,
        &unary.callee,
        ctx,
    ) {
        Ok(callee) => report_const_violation(&callee, &unary.operand, &unary.span, ctx),
        Err(err) => ctx.error(err),
    }
}

fn check_binary(expr: &Expression, binary: &Rc<BinaryExpr>, ctx: &mut Context) {
    check_expression(&binary.lhs, ctx);
    check_expression(&binary.rhs, ctx);
    let (Some(lhs_type), Some(rhs_type)) = (binary.lhs.ty(), binary.rhs.ty()) else {
        return;
    };

    if lhs_type.is_builtin() && rhs_type.is_builtin() {
        if lhs_type != rhs_type {
            ctx.error(TypeCheckError::BuiltinOperatorMismatch(
                BuiltinOperatorMismatch {
                    op: binary.op.as_str().into(),
                    lhs: lhs_type,
                    rhs: rhs_type,
                },
                binary.span.clone(),
            ));
            return;
        }
        if binary.op.is_comparison() {
            expr.set_type(Type::boolean());
        } else if binary.op.is_logical() {
            if lhs_type != Type::boolean() {
                ctx.error(TypeCheckError::InvalidBuiltinOperator(
                    InvalidBuiltinOperator {
                        op: binary.op.as_str().into(),
                        ty: lhs_type,
                    },
                    binary.span.clone(),
                ));
                return;
            }
            expr.set_type(Type::boolean());
        } else {
            expr.set_type(lhs_type);
        }
        return;
    }

    match call::bind_invocation(
        binary.op.as_str(),
        &[lhs_type, rhs_type],
        &binary.span,
        &binary.ty,
        &binary.callee,
        ctx,
    ) {
        Ok(callee) => report_const_violation(&callee, &binary.lhs, &binary.span, ctx),
        Err(err) => ctx.error(err),
    }
}

fn check_typed(expr: &Expression, typed: &Rc<TypedExpr>, ctx: &mut Context) {
    // `[] : [T]` is the one place an empty array literal is legal; the
    // annotation supplies the element type before the literal is
    // rewritten.
    if let Expression::Array(arr) = &typed.expr {
        if arr.elements.is_empty() {
            let Some(specified) = class::resolve_and_instantiate(&typed.specified, ctx) else {
                return;
            };
            match specified {
                Type::Array { element, .. } => {
                    construct_array_literal(arr, *element, ctx);
                    if let Some(ty) = typed.expr.ty() {
                        expr.set_type(ty);
                    }
                }
                other => ctx.error(TypeCheckError::TypeMismatch(
                    TypeMismatch {
                        expected: other,
                        actual: Type::array(Type::template(arr.id, arr.span.clone())),
                    },
                    typed.span.clone(),
                )),
            }
            return;
        }
    }

    check_expression(&typed.expr, ctx);
    let Some(actual) = typed.expr.ty() else {
        return;
    };
    let Some(specified) = class::resolve_and_instantiate(&typed.specified, ctx) else {
        return;
    };

    let accepted = actual == specified
        || actual.is_instantiated_from(&specified)
        || arrays_differ_only_by_size(&actual, &specified);

    if accepted {
        expr.set_type(actual);
    } else {
        ctx.error(TypeCheckError::TypeMismatch(
            TypeMismatch {
                expected: specified,
                actual,
            },
            typed.span.clone(),
        ));
    }
}

fn arrays_differ_only_by_size(lhs: &Type, rhs: &Type) -> bool {
    match (lhs, rhs) {
        (
            Type::Array {
                element: le,
                size: ls,
            },
            Type::Array {
                element: re,
                size: rs,
            },
        ) => le == re && (ls.is_none() || rs.is_none()),
        _ => false,
    }
}

fn check_index(expr: &Expression, index: &Rc<IndexAccess>, ctx: &mut Context) {
    check_expression(&index.child, ctx);
    check_expression(&index.index, ctx);
    let (Some(child_type), Some(index_type)) = (index.child.ty(), index.index.ty()) else {
        return;
    };

    match &child_type {
        Type::Array { element, .. } => {
            if !index_type.is_int_or_uint() {
                ctx.error(TypeCheckError::InvalidIndexType(
                    InvalidIndexType {
                        container: child_type.clone(),
                        index: index_type,
                    },
                    index.span.clone(),
                ));
                return;
            }
            expr.set_type((**element).clone());
        }
        Type::Pointer(pointee) => {
            if !index_type.is_int_or_uint() {
                ctx.error(TypeCheckError::InvalidIndexType(
                    InvalidIndexType {
                        container: child_type.clone(),
                        index: index_type,
                    },
                    index.span.clone(),
                ));
                return;
            }
            expr.set_type((**pointee).clone());
        }
        Type::Tuple(elements) => {
            let constant = match &index.index {
                Expression::Literal(lit) => match lit.value {
                    LiteralValue::Int(v) if v >= 0 => Some(v as u64),
                    LiteralValue::UInt(v) => Some(v),
                    _ => None,
                },
                _ => None,
            };
            let Some(position) = constant else {
                ctx.error(TypeCheckError::InvalidTupleIndex(
                    InvalidTupleIndex {
                        detail: "Index of tuple must be int or uint literal".into(),
                    },
                    index.span.clone(),
                ));
                return;
            };
            let Some(element) = elements.get(position as usize) else {
                ctx.error(TypeCheckError::InvalidTupleIndex(
                    InvalidTupleIndex {
                        detail: format!(
                            "Index access is out of bounds\n  Note: Index is {position}"
                        ),
                    },
                    index.span.clone(),
                ));
                return;
            };
            expr.set_type(element.clone());
        }
        Type::Builtin(BuiltinType::String) => {
            if !index_type.is_int_or_uint() {
                ctx.error(TypeCheckError::InvalidIndexType(
                    InvalidIndexType {
                        container: child_type.clone(),
                        index: index_type,
                    },
                    index.span.clone(),
                ));
                return;
            }
            expr.set_type(Type::char_type());
        }
        _ => {
            if index.is_assign.get() {
                // Resolved by assignment analysis as `[]=` once the
                // right-hand side type is known.
                return;
            }
            match call::bind_invocation(
                "[]",
                &[child_type, index_type],
                &index.span,
                &index.ty,
                &index.callee,
                ctx,
            ) {
                Ok(callee) => report_const_violation(&callee, &index.child, &index.span, ctx),
                Err(err) => ctx.error(err),
            }
        }
    }
}

/// `recv.name(...)` where `name` is actually an instance variable holding
/// a function reference: turn the callee into a member access and call
/// through it instead of treating the member name as a function.
fn rewrite_instance_var_invocation(inv: &Rc<FuncInvocation>) {
    let member = match &*inv.child.borrow() {
        Expression::VarRef(var) => var.name.clone(),
        _ => return,
    };

    let receiver_type = {
        let args = inv.args.borrow();
        let Some(receiver) = args.first() else {
            return;
        };
        receiver.ty()
    };
    let Some(receiver_type) = receiver_type else {
        return;
    };
    let Some(class) = receiver_type.as_class().and_then(|c| c.scope.upgrade()) else {
        return;
    };

    let Some(instance_var) = class.borrow().resolve_instance_var(&member) else {
        return;
    };
    let var_type = instance_var.borrow().ty.clone();
    let Some(var_type @ Type::GenericFunc(_)) = var_type else {
        return;
    };

    let receiver = inv.args.borrow_mut().remove(0);
    let access = Expression::ufcs(receiver, &member, inv.span.clone());
    if let Expression::Ufcs(ufcs) = &access {
        ufcs.is_instance_var_access.set(true);
    }
    access.set_type(var_type);
    *inv.child.borrow_mut() = access;
}

fn check_invocation(inv: &Rc<FuncInvocation>, ctx: &mut Context) {
    let child = inv.child.borrow().clone();
    check_expression(&child, ctx);
    let args_snapshot = inv.args.borrow().clone();
    for arg in &args_snapshot {
        check_expression(arg, ctx);
    }

    if inv.is_ufcs {
        rewrite_instance_var_invocation(inv);
    }

    let child = inv.child.borrow().clone();
    let Some(child_type) = child.ty() else {
        return;
    };

    let Some(generic) = child_type.as_generic_func() else {
        ctx.error(TypeCheckError::NotCallable(
            NotCallable { ty: child_type },
            inv.span.clone(),
        ));
        return;
    };
    let Some(callee_hint) = generic.scope.upgrade() else {
        ctx.error(TypeCheckError::InvalidFunctionReference(
            InvalidFunctionReference { ty: child_type },
            inv.span.clone(),
        ));
        return;
    };

    let args = inv.args.borrow().clone();
    let Some(arg_types) = types_of(&args) else {
        return;
    };

    let name = callee_hint.borrow().name.clone();
    let was_template = callee_hint.borrow().is_template();
    let resolved = if callee_hint.borrow().is_anonymous() {
        call::bind_anonymous_invocation(
            &callee_hint,
            &arg_types,
            &inv.span,
            &inv.ty,
            &inv.callee,
            ctx,
        )
    } else {
        call::bind_invocation(&name, &arg_types, &inv.span, &inv.ty, &inv.callee, ctx)
    };
    let callee = match resolved {
        Ok(callee) => callee,
        Err(err) => {
            ctx.error(err);
            return;
        }
    };

    if was_template {
        // Point the callable expression at the instantiation so code
        // generation finds the right lambda captures.
        child.set_type(Type::generic_func(&callee));
    }

    if let Some(receiver) = args.first() {
        report_const_violation(&callee, receiver, &inv.span, ctx);
    }

    if callee.borrow().is_main_func() {
        ctx.error(TypeCheckError::CannotInvokeMain(
            CannotInvokeMain,
            inv.span.clone(),
        ));
    }
}

fn check_ufcs(expr: &Expression, ufcs: &Rc<UfcsInvocation>, ctx: &mut Context) {
    check_expression(&ufcs.child, ctx);
    let Some(child_type) = ufcs.child.ty() else {
        return;
    };

    let mut private_access_rejected: Option<String> = None;
    if let Some(class) = child_type.as_class().and_then(|c| c.scope.upgrade()) {
        if let Some(instance_var) = class.borrow().resolve_instance_var(&ufcs.member_name) {
            let accessible = instance_var.borrow().is_public
                || ctx
                    .enclosing_receiver_class()
                    .map(|c| c.borrow().name == class.borrow().name)
                    .unwrap_or(false);
            if accessible {
                ufcs.is_instance_var_access.set(true);
                if let Some(ty) = instance_var.borrow().ty.clone() {
                    expr.set_type(ty);
                }
                return;
            }
            private_access_rejected = Some(class.borrow().name.clone());
        }
    }

    // Builtin data members: raw arrays know their size.
    if let Type::Array { .. } = &child_type {
        if ufcs.member_name == "size" {
            expr.set_type(Type::uint());
            return;
        }
    }

    if ufcs.is_assign.get() {
        ctx.error(TypeCheckError::MemberNotFound(
            MemberNotFound {
                name: ufcs.member_name.clone(),
                ty: child_type,
            },
            ufcs.span.clone(),
        ));
        return;
    }

    // `a.foo` falls back to the call `foo(a)`.
    match call::bind_invocation(
        &ufcs.member_name,
        &[child_type],
        &ufcs.span,
        &ufcs.ty,
        &ufcs.callee,
        ctx,
    ) {
        Ok(callee) => report_const_violation(&callee, &ufcs.child, &ufcs.span, ctx),
        Err(err) => {
            ctx.error(err);
            if let Some(class) = private_access_rejected {
                ctx.error(TypeCheckError::PrivateInstanceVar(
                    PrivateInstanceVar {
                        name: ufcs.member_name.clone(),
                        class,
                    },
                    ufcs.span.clone(),
                ));
            }
        }
    }
}

pub(crate) fn report_const_violation(
    callee: &crate::typechecker::scope::FuncScopeRef,
    receiver: &Expression,
    span: &crate::span::Span,
    ctx: &mut Context,
) {
    if let Some(violated) = const_check::const_violated_binding(callee, receiver, ctx) {
        ctx.error(TypeCheckError::ConstViolation(
            ConstViolation {
                callee: callee.borrow().to_string(),
                binding: violated.borrow().name.clone(),
            },
            span.clone(),
        ));
    }
}
