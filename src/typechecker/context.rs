//! Shared state threaded through every pass.
//!
//! The context owns the scope tree root, tracks the scope currently being
//! analyzed, accumulates diagnostics and remembers which definitions have
//! already been visited so that on-demand analysis of callees can recurse
//! without looping. A re-entry on an unfinished function is what triggers
//! recursive return-type deduction.

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::{Definition, LambdaExpr, NodeId};
use crate::diagnostics;
use crate::typechecker::error::TypeCheckError;
use crate::typechecker::scope::{
    ClassScopeRef, FuncScopeRef, GlobalScope, GlobalScopeRef, ScopeRef,
};

pub struct Context {
    pub global: GlobalScopeRef,
    current: ScopeRef,
    errors: Vec<TypeCheckError>,
    /// Builtin definitions injected before user code; walked by the same
    /// passes as the program itself.
    pub(crate) prelude: Vec<Definition>,
    pub(crate) visited_functions: HashSet<NodeId>,
    pub(crate) visited_classes: HashSet<NodeId>,
    /// Constructor bodies pre-walked for class template inference.
    pub(crate) visited_ctor_bodies: HashSet<NodeId>,
    /// Functions whose const-ness is being computed right now; guards
    /// against mutual recursion.
    pub(crate) const_in_progress: HashSet<NodeId>,
    /// Every lambda expression seen during analysis, in visiting order;
    /// the lambda resolver consumes this queue.
    pub(crate) lambdas: Vec<Rc<LambdaExpr>>,
    pub(crate) main_arg_ctor: Option<FuncScopeRef>,
    /// Depth of function bodies currently being analyzed; `typeof` is
    /// only permitted when this is non-zero.
    pub(crate) function_depth: usize,
}

impl Context {
    pub fn new() -> Context {
        let global = GlobalScope::create();
        Context {
            current: ScopeRef::Global(global.clone()),
            global,
            errors: vec![],
            prelude: vec![],
            visited_functions: HashSet::new(),
            visited_classes: HashSet::new(),
            visited_ctor_bodies: HashSet::new(),
            const_in_progress: HashSet::new(),
            lambdas: vec![],
            main_arg_ctor: None,
            function_depth: 0,
        }
    }

    /// Record a diagnostic. It is written to stderr right away and kept
    /// for the pass failure summary.
    pub fn error(&mut self, err: TypeCheckError) {
        diagnostics::emit(&err);
        self.errors.push(err);
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn take_errors(&mut self) -> Vec<TypeCheckError> {
        std::mem::take(&mut self.errors)
    }

    pub fn current(&self) -> ScopeRef {
        self.current.clone()
    }

    /// Run `f` with `scope` as the current scope, restoring the previous
    /// one afterwards.
    pub fn with_scope<T>(&mut self, scope: ScopeRef, f: impl FnOnce(&mut Context) -> T) -> T {
        let saved = std::mem::replace(&mut self.current, scope);
        let result = f(self);
        self.current = saved;
        result
    }

    pub fn in_function_body(&self) -> bool {
        self.function_depth > 0
    }

    /// The constructor whose body encloses the current scope, if any.
    pub fn enclosing_ctor(&self) -> Option<FuncScopeRef> {
        let func = self.current.enclosing_func()?;
        if func.borrow().is_ctor {
            Some(func)
        } else {
            None
        }
    }

    /// The receiver class of the member function enclosing the current
    /// scope, if any.
    pub fn enclosing_receiver_class(&self) -> Option<ClassScopeRef> {
        let func = self.current.enclosing_func()?;
        let func = func.borrow();
        if !func.is_member_func {
            return None;
        }
        func.receiver_class()
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}
