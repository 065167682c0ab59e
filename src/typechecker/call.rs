//! Call resolution: overload selection, on-demand analysis of callees and
//! function template instantiation.
//!
//! Resolving a call may recurse into the callee's body when its return
//! type is not known yet; the visited-set in the context breaks cycles
//! and re-entry on an unfinished function falls back to recursive
//! return-type deduction (see [`super::statement`]).

use std::rc::Rc;

use log::debug;

use crate::ast::{self, FunctionDefinition, TypeSlot};
use crate::internal_compiler_error;
use crate::span::Span;
use crate::typechecker::context::Context;
use crate::typechecker::error::{
    AmbiguousCall, CannotDeduceReturnType, FunctionNotFound, PrivateMemberFunction, TypeCheckError,
};
use crate::typechecker::scope::FuncScopeRef;
use crate::typechecker::types::Type;
use crate::typechecker::{forward, statement, TypeResult};

/// `name(t1,t2)` as shown in diagnostics.
pub fn func_signature(name: &str, arg_types: &[Type]) -> String {
    let args = arg_types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}({args})")
}

/// Resolve a call to a unique function scope, instantiating templates and
/// analyzing the callee body first when its return type is still
/// unknown.
pub fn resolve_func_call(
    name: &str,
    arg_types: &[Type],
    span: &Span,
    ctx: &mut Context,
) -> TypeResult<FuncScopeRef> {
    let candidates = ctx.current().resolve_func(name, arg_types);

    if candidates.is_empty() {
        return Err(TypeCheckError::FunctionNotFound(
            FunctionNotFound {
                signature: func_signature(name, arg_types),
            },
            span.clone(),
        ));
    }
    if candidates.len() > 1 {
        return Err(TypeCheckError::AmbiguousCall(
            AmbiguousCall {
                signature: func_signature(name, arg_types),
                candidates: candidates.iter().map(|c| c.borrow().to_string()).collect(),
            },
            span.clone(),
        ));
    }

    let mut func = candidates.into_iter().next().unwrap();

    if func.borrow().is_builtin {
        return Ok(func);
    }

    let Some(mut def) = func.borrow().get_ast_node() else {
        internal_compiler_error!("non-builtin function '{}' without AST", func.borrow().name);
    };

    if func.borrow().is_template() {
        let (inst_def, inst_func) = instantiate_function(&def, arg_types, ctx)?;
        def = inst_def;
        func = inst_func;
    }

    if def.ret_type.borrow().is_none() {
        let Some(enclosing) = func.borrow().enclosing.upgrade() else {
            internal_compiler_error!("enclosing scope of '{}' is gone", func.borrow().name);
        };
        ctx.with_scope(enclosing, |ctx| {
            statement::check_function_definition(&def, ctx);
        });
    }

    if func.borrow().ret_type.is_none() {
        return Err(TypeCheckError::CannotDeduceReturnType(
            CannotDeduceReturnType {
                function: func.borrow().to_string(),
            },
            span.clone(),
        ));
    }

    // Private member functions are callable only from methods of the
    // same class.
    if !def.is_public() {
        let receiver_class = func
            .borrow()
            .receiver_class()
            .map(|c| c.borrow().name.clone());
        let Some(receiver_class) = receiver_class else {
            internal_compiler_error!("private non-member function '{}'", func.borrow().name);
        };

        let caller_class = ctx
            .current()
            .enclosing_func()
            .and_then(|f| f.borrow().receiver_class())
            .map(|c| c.borrow().name.clone());

        if caller_class.as_deref() != Some(receiver_class.as_str()) {
            return Err(TypeCheckError::PrivateMemberFunction(
                PrivateMemberFunction {
                    signature: func.borrow().to_string(),
                    class: receiver_class,
                },
                span.clone(),
            ));
        }
    }

    Ok(func)
}

/// Calls through a reference to an anonymous function bind to exactly
/// that function (generic-function references compare by identity, and
/// two distinct lambdas may share a positional name after template
/// instantiation). Templates are instantiated against the arguments;
/// everything else skips name lookup entirely.
pub fn bind_anonymous_invocation(
    hint: &FuncScopeRef,
    arg_types: &[Type],
    span: &Span,
    ty_slot: &TypeSlot,
    callee_slot: &ast::CalleeSlot,
    ctx: &mut Context,
) -> TypeResult<FuncScopeRef> {
    let name = hint.borrow().name.clone();
    if crate::typechecker::scope::overload_score(hint, arg_types) == 0 {
        return Err(TypeCheckError::FunctionNotFound(
            FunctionNotFound {
                signature: func_signature(&name, arg_types),
            },
            span.clone(),
        ));
    }

    let Some(def) = hint.borrow().get_ast_node() else {
        internal_compiler_error!("anonymous function '{name}' without AST");
    };

    let (def, func) = if hint.borrow().is_template() {
        instantiate_function(&def, arg_types, ctx)?
    } else {
        (def, hint.clone())
    };

    if def.ret_type.borrow().is_none() {
        let Some(enclosing) = func.borrow().enclosing.upgrade() else {
            internal_compiler_error!("enclosing scope of '{name}' is gone");
        };
        ctx.with_scope(enclosing, |ctx| {
            statement::check_function_definition(&def, ctx);
        });
    }

    let Some(ret) = func.borrow().ret_type.clone() else {
        return Err(TypeCheckError::CannotDeduceReturnType(
            CannotDeduceReturnType {
                function: func.borrow().to_string(),
            },
            span.clone(),
        ));
    };

    *ty_slot.borrow_mut() = Some(ret);
    *callee_slot.borrow_mut() = Rc::downgrade(&func);
    Ok(func)
}

/// Resolve a call and fill the node's type and callee slots.
pub fn bind_invocation(
    name: &str,
    arg_types: &[Type],
    span: &Span,
    ty_slot: &TypeSlot,
    callee_slot: &ast::CalleeSlot,
    ctx: &mut Context,
) -> TypeResult<FuncScopeRef> {
    let func = resolve_func_call(name, arg_types, span, ctx)?;
    let ret = func
        .borrow()
        .ret_type
        .clone()
        .unwrap_or_else(Type::unit);
    *ty_slot.borrow_mut() = Some(ret);
    *callee_slot.borrow_mut() = Rc::downgrade(&func);
    Ok(func)
}

/// Search this definition and its instantiations for one whose parameter
/// types match the argument types exactly.
pub fn already_instantiated_func(
    def: &Rc<FunctionDefinition>,
    arg_types: &[Type],
) -> Option<Rc<FunctionDefinition>> {
    if let Some(scope) = def.scope.borrow().upgrade() {
        let scope = scope.borrow();
        if scope.params.len() == arg_types.len() {
            let matches = scope
                .params
                .iter()
                .zip(arg_types.iter())
                .all(|(p, a)| p.borrow().ty.as_ref() == Some(a));
            if matches {
                return Some(def.clone());
            }
        }
    }

    let children = def.instantiated.borrow().clone();
    for child in &children {
        if let Some(found) = already_instantiated_func(child, arg_types) {
            return Some(found);
        }
    }
    None
}

/// Instantiate a function template for the given argument types, reusing
/// an existing instantiation when one matches.
///
/// The copy runs through the forward pass under the template's enclosing
/// scope (which also registers it for overload resolution), template
/// parameters are substituted with the actual argument types, and the
/// body is analyzed. The result can itself still be a template: a
/// constructor whose receiver is a class template stays templated until
/// the class is instantiated.
pub fn instantiate_function(
    template_def: &Rc<FunctionDefinition>,
    arg_types: &[Type],
    ctx: &mut Context,
) -> TypeResult<(Rc<FunctionDefinition>, FuncScopeRef)> {
    if let Some(existing) = already_instantiated_func(template_def, arg_types) {
        let Some(scope) = existing.scope.borrow().upgrade() else {
            internal_compiler_error!("instantiated function lost its scope");
        };
        debug!(
            "reusing instantiation '{}' for {}",
            scope.borrow().to_string(),
            func_signature(&template_def.name(), arg_types)
        );
        return Ok((existing, scope));
    }

    let Some(template_scope) = template_def.scope.borrow().upgrade() else {
        internal_compiler_error!("template '{}' has no scope", template_def.name());
    };
    let Some(enclosing) = template_scope.borrow().enclosing.upgrade() else {
        internal_compiler_error!("template '{}' lost its enclosing scope", template_def.name());
    };

    let instantiated_def = ast::copy_function_definition(template_def);
    let instantiated_scope = forward::declare_function(&instantiated_def, enclosing.clone(), ctx);

    if instantiated_def.params.len() != arg_types.len() {
        internal_compiler_error!(
            "arity mismatch while instantiating '{}'",
            template_def.name()
        );
    }

    {
        let scope = instantiated_scope.borrow();
        for ((param, sym), arg) in instantiated_def
            .params
            .iter()
            .zip(scope.params.iter())
            .zip(arg_types.iter())
        {
            let declared = param.ty.borrow().clone();
            let replace = match &declared {
                Some(t) => matches!(t, Type::Template(_)) || t.is_class_template(),
                None => true,
            };
            if replace {
                *param.ty.borrow_mut() = Some(arg.clone());
                sym.borrow_mut().ty = Some(arg.clone());
            } else if declared.as_ref() != Some(arg) {
                internal_compiler_error!(
                    "overload resolution accepted mismatching argument for '{}'",
                    template_def.name()
                );
            }
        }
    }

    ctx.with_scope(enclosing, |ctx| {
        statement::check_function_definition(&instantiated_def, ctx);
    });

    template_def
        .instantiated
        .borrow_mut()
        .push(instantiated_def.clone());

    if instantiated_scope.borrow().is_anonymous() {
        // Anonymous functions live in local scopes which overload
        // resolution does not search; lift the instantiation globally
        // like the lambda itself.
        ctx.global
            .borrow_mut()
            .define_function(instantiated_scope.clone());
    }

    debug!(
        "instantiated '{}' as '{}'",
        template_def.name(),
        instantiated_scope.borrow().to_string()
    );

    Ok((instantiated_def, instantiated_scope))
}

#[cfg(test)]
mod tests {
    use super::func_signature;
    use crate::typechecker::types::Type;

    #[test]
    fn test_func_signature_rendering() {
        assert_eq!(func_signature("foo", &[Type::float()]), "foo(float)");
        assert_eq!(
            func_signature("bar", &[Type::int(), Type::boolean()]),
            "bar(int,bool)"
        );
        assert_eq!(func_signature("baz", &[]), "baz()");
    }
}
