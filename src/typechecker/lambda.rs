//! Lambda capture resolution.
//!
//! Runs after the main analysis pass. Every lambda body is walked once
//! more: a resolved variable reference whose symbol is not defined inside
//! the lambda's own scope subtree is a free variable and becomes a
//! capture, mapping the outer symbol to a fresh symbol living in the
//! lambda's function scope. Finally every lambda is lifted into the
//! global function set so code generation sees it like any other
//! function.

use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::ast::{self, Expression, NodeId};
use crate::typechecker::context::Context;
use crate::typechecker::error::{NoCaptureFound, TypeCheckError};
use crate::typechecker::scope::{FuncScopeRef, LocalScopeRef, VarSymbol, VarSymbolRef};

/// One captured variable: the symbol in the enclosing function and the
/// stand-in introduced inside the lambda.
#[derive(Clone, Debug)]
pub struct Capture {
    pub outer: VarSymbolRef,
    pub introduced: VarSymbolRef,
}

/// Captures per lambda function definition.
pub type CaptureMap = HashMap<NodeId, Vec<Capture>>;

pub fn resolve_lambdas(ctx: &mut Context) -> CaptureMap {
    let lambdas = ctx.lambdas.clone();
    let mut captures = CaptureMap::new();

    for lambda in &lambdas {
        let Some(scope) = lambda.def.scope.borrow().upgrade() else {
            continue;
        };

        ctx.global.borrow_mut().define_function(scope.clone());

        if scope.borrow().is_template() {
            // The template itself is never emitted, but each of its
            // instantiations is an anonymous function of its own.
            let instantiated = lambda.def.instantiated.borrow().clone();
            for def in &instantiated {
                resolve_one(def, &mut captures, ctx);
            }
            continue;
        }

        resolve_one(&lambda.def, &mut captures, ctx);
    }

    captures
}

fn resolve_one(
    def: &Rc<crate::ast::FunctionDefinition>,
    captures: &mut CaptureMap,
    ctx: &mut Context,
) {
    let Some(scope) = def.scope.borrow().upgrade() else {
        return;
    };
    ctx.global.borrow_mut().define_function(scope.clone());

    let owned = collect_owned_symbols(&scope);
    let mut collector = CaptureCollector {
        owned,
        lambda_scope: scope.clone(),
        lambda_name: scope.borrow().name.clone(),
        captures: vec![],
        errors: vec![],
    };
    ast::walk_block(&mut collector, &def.body);

    for err in collector.errors {
        ctx.error(err);
    }
    trace!(
        "lambda '{}' captures {} variable(s)",
        scope.borrow().name,
        collector.captures.len()
    );
    captures.insert(def.id, collector.captures);
}

/// Every symbol defined anywhere under the lambda's own function scope:
/// parameters, body locals, and everything inside nested anonymous
/// functions.
fn collect_owned_symbols(scope: &FuncScopeRef) -> Vec<VarSymbolRef> {
    fn collect_local(local: &LocalScopeRef, out: &mut Vec<VarSymbolRef>) {
        let local = local.borrow();
        out.extend(local.vars.iter().cloned());
        for child in &local.children {
            collect_local(child, out);
        }
        for func in &local.unnamed_funcs {
            collect_func(func, out);
        }
    }

    fn collect_func(func: &FuncScopeRef, out: &mut Vec<VarSymbolRef>) {
        let body = {
            let func = func.borrow();
            out.extend(func.params.iter().cloned());
            func.body.clone()
        };
        if let Some(body) = body {
            collect_local(&body, out);
        }
    }

    let mut out = vec![];
    collect_func(scope, &mut out);
    out
}

struct CaptureCollector {
    owned: Vec<VarSymbolRef>,
    lambda_scope: FuncScopeRef,
    lambda_name: String,
    captures: Vec<Capture>,
    errors: Vec<TypeCheckError>,
}

impl ast::Visitor for CaptureCollector {
    fn visit_expression(&mut self, expr: &Expression) {
        if let Expression::VarRef(var) = expr {
            if var.name == "_" {
                return;
            }
            let Some(sym) = var.symbol.borrow().upgrade() else {
                self.errors.push(TypeCheckError::NoCaptureFound(
                    NoCaptureFound {
                        name: var.name.clone(),
                        lambda: self.lambda_name.clone(),
                    },
                    var.span.clone(),
                ));
                return;
            };

            {
                let s = sym.borrow();
                if s.is_global || s.is_builtin {
                    return;
                }
            }
            if self.owned.iter().any(|o| Rc::ptr_eq(o, &sym)) {
                return;
            }
            if self
                .captures
                .iter()
                .any(|c| Rc::ptr_eq(&c.outer, &sym))
            {
                return;
            }

            let introduced = {
                let outer = sym.borrow();
                let introduced = VarSymbol::new(&outer.name, outer.immutable, outer.span.clone());
                introduced.borrow_mut().ty = outer.ty.clone();
                introduced
            };
            if let Some(body) = self.lambda_scope.borrow().body.clone() {
                body.borrow_mut().vars.push(introduced.clone());
            }
            self.captures.push(Capture {
                outer: sym,
                introduced,
            });
            return;
        }
        ast::walk_expression(self, expr);
    }
}
