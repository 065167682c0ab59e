//! Const-method inference.
//!
//! A member function is const iff it never assigns to an instance
//! variable of its receiver, never calls a non-const method on the
//! receiver's class, and, transitively, every member function of the same
//! class it calls is const as well. The result is memoized on the
//! function scope; computation happens lazily the first time a call site
//! needs it. Calling a non-const method on an immutable binding is the
//! const violation reported at the call site.

use std::rc::Rc;

use crate::ast::Visitor;
use crate::ast::{self, Expression, Statement};
use crate::typechecker::context::Context;
use crate::typechecker::scope::{FuncScopeRef, VarSymbolRef};
use crate::typechecker::statement;
use crate::typechecker::types::Type;

/// Memoized const-ness of a member function, analyzing its body first
/// when necessary. Non-members, constructors, templates and builtins are
/// never const.
pub fn ensure_const(func: &FuncScopeRef, ctx: &mut Context) -> bool {
    if let Some(known) = func.borrow().is_const {
        return known;
    }

    let (eligible, def) = {
        let f = func.borrow();
        (
            f.is_member_func && !f.is_ctor && !f.is_builtin && !f.is_template(),
            f.get_ast_node(),
        )
    };
    let Some(def) = def else {
        func.borrow_mut().is_const = Some(false);
        return false;
    };
    if !eligible {
        func.borrow_mut().is_const = Some(false);
        return false;
    }

    // Cycles between mutually recursive methods: the re-entered method is
    // treated as const; the outer computation settles the flag.
    if ctx.const_in_progress.contains(&def.id) {
        return true;
    }
    ctx.const_in_progress.insert(def.id);

    // The body must have been analyzed for callee slots to exist.
    if !ctx.visited_functions.contains(&def.id) {
        if let Some(enclosing) = func.borrow().enclosing.upgrade() {
            ctx.with_scope(enclosing, |ctx| {
                statement::check_function_definition(&def, ctx);
            });
        }
    }

    let receiver_type = func.borrow().receiver_type();
    let result = match receiver_type {
        Some(receiver_type) => {
            let mut checker = ConstChecker {
                ctx,
                this_func: func.clone(),
                receiver_type,
                is_const: true,
            };
            ast::walk_block(&mut checker, &def.body);
            checker.is_const
        }
        None => false,
    };

    ctx.const_in_progress.remove(&def.id);
    func.borrow_mut().is_const = Some(result);
    result
}

struct ConstChecker<'a> {
    ctx: &'a mut Context,
    this_func: FuncScopeRef,
    receiver_type: Type,
    is_const: bool,
}

impl ConstChecker<'_> {
    fn visit_callee(&mut self, callee: &ast::CalleeSlot) {
        let Some(callee) = callee.borrow().upgrade() else {
            return;
        };
        if Rc::ptr_eq(&callee, &self.this_func) {
            return;
        }
        let receiver = callee.borrow().receiver_type();
        let Some(receiver) = receiver else {
            return;
        };
        if !callee.borrow().is_member_func || receiver != self.receiver_type {
            return;
        }
        if !ensure_const(&callee, self.ctx) {
            self.is_const = false;
        }
    }

    /// Does an assignment target reach an instance variable of the
    /// receiver?
    fn visit_assignee(&mut self, expr: &Expression) {
        match expr {
            Expression::Ufcs(ufcs) if ufcs.is_instance_var_access.get() => {
                self.visit_assignee(&ufcs.child);
            }
            Expression::Index(index) => self.visit_assignee(&index.child),
            Expression::VarRef(var) => {
                let Some(sym) = var.symbol.borrow().upgrade() else {
                    return;
                };
                let is_receiver = sym.borrow().ty.as_ref() == Some(&self.receiver_type);
                let is_instance_var = var.name.starts_with('@')
                    && self.receiver_instance_var(&sym).is_some();
                if is_receiver || is_instance_var {
                    self.is_const = false;
                }
            }
            _ => {}
        }
    }

    fn receiver_instance_var(&self, sym: &VarSymbolRef) -> Option<()> {
        let class = self.receiver_type.as_class()?.scope.upgrade()?;
        let found = class
            .borrow()
            .instance_var_symbols
            .iter()
            .any(|v| Rc::ptr_eq(v, sym));
        found.then_some(())
    }
}

impl ast::Visitor for ConstChecker<'_> {
    fn visit_statement(&mut self, stmt: &Statement) {
        if !self.is_const {
            return;
        }
        if let Statement::Assignment(assign) = stmt {
            for assignee in &assign.assignees {
                self.visit_assignee(assignee);
            }
            for rhs in &assign.rhs_exprs {
                self.visit_expression(rhs);
            }
            return;
        }
        ast::walk_statement(self, stmt);
    }

    fn visit_expression(&mut self, expr: &Expression) {
        if !self.is_const {
            return;
        }
        match expr {
            Expression::Invocation(inv) => self.visit_callee(&inv.callee),
            Expression::Ufcs(ufcs) if !ufcs.is_instance_var_access.get() => {
                self.visit_callee(&ufcs.callee)
            }
            Expression::Binary(bin) => self.visit_callee(&bin.callee),
            Expression::Unary(unary) => self.visit_callee(&unary.callee),
            Expression::Index(index) => self.visit_callee(&index.callee),
            _ => {}
        }
        ast::walk_expression(self, expr);
    }
}

/// When the callee mutates its receiver, find the immutable binding the
/// call would violate. The receiver expression is the first argument of
/// a UFCS call, the child of a member access or the left operand of an
/// operator call.
pub fn const_violated_binding(
    callee: &FuncScopeRef,
    receiver: &Expression,
    ctx: &mut Context,
) -> Option<VarSymbolRef> {
    if !callee.borrow().is_member_func || callee.borrow().is_ctor {
        return None;
    }
    if ensure_const(callee, ctx) {
        return None;
    }

    struct ImmutableFinder {
        found: Option<VarSymbolRef>,
    }

    impl ast::Visitor for ImmutableFinder {
        fn visit_expression(&mut self, expr: &Expression) {
            if self.found.is_some() {
                return;
            }
            match expr {
                Expression::VarRef(var) => {
                    if let Some(sym) = var.symbol.borrow().upgrade() {
                        if sym.borrow().immutable {
                            self.found = Some(sym);
                        }
                    }
                }
                // References inside an index expression do not make the
                // container immutable.
                Expression::Index(index) => self.visit_expression(&index.child),
                _ => ast::walk_expression(self, expr),
            }
        }
    }

    let mut finder = ImmutableFinder { found: None };
    finder.visit_expression(receiver);
    finder.found
}
