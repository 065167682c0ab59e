//! The scope tree and its symbols.
//!
//! Four scope kinds form a tree rooted at the global scope: classes and
//! functions hang off it, local scopes nest inside function bodies. Every
//! scope strongly owns its children and weakly references its parent, so
//! the tree is free of ownership cycles; type values and AST slots point
//! back into it weakly as well.
//!
//! Overload resolution lives here because it is a pure function of the
//! scope tree: candidates are scored per parameter (template match 1,
//! class-template match 2, exact match 3, multiplied), and the resolver
//! returns every candidate sharing the maximal non-zero score so the
//! analyzer can distinguish "not found" from "ambiguous".

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::trace;

use crate::ast::{ClassDefinition, FunctionDefinition, NodeId};
use crate::span::Span;
use crate::typechecker::types::Type;

pub type VarSymbolRef = Rc<RefCell<VarSymbol>>;
pub type GlobalScopeRef = Rc<RefCell<GlobalScope>>;
pub type ClassScopeRef = Rc<RefCell<ClassScope>>;
pub type FuncScopeRef = Rc<RefCell<FuncScope>>;
pub type LocalScopeRef = Rc<RefCell<LocalScope>>;

pub type WeakGlobalScope = Weak<RefCell<GlobalScope>>;
pub type WeakClassScope = Weak<RefCell<ClassScope>>;
pub type WeakFuncScope = Weak<RefCell<FuncScope>>;
pub type WeakLocalScope = Weak<RefCell<LocalScope>>;

/// A named value binding: local variable, parameter, instance variable or
/// global constant.
#[derive(Clone, Debug)]
pub struct VarSymbol {
    pub name: String,
    pub ty: Option<Type>,
    pub immutable: bool,
    pub is_global: bool,
    pub is_public: bool,
    pub is_builtin: bool,
    pub span: Span,
    pub decl: Option<NodeId>,
}

impl VarSymbol {
    pub fn new(name: impl ToString, immutable: bool, span: Span) -> VarSymbolRef {
        Rc::new(RefCell::new(VarSymbol {
            name: name.to_string(),
            ty: None,
            immutable,
            is_global: false,
            is_public: true,
            is_builtin: false,
            span,
            decl: None,
        }))
    }

    pub fn with_type(name: impl ToString, ty: Type, immutable: bool, span: Span) -> VarSymbolRef {
        let sym = VarSymbol::new(name, immutable, span);
        sym.borrow_mut().ty = Some(ty);
        sym
    }
}

/// Handle to any scope in the tree.
#[derive(Clone, Debug)]
pub enum ScopeRef {
    Global(GlobalScopeRef),
    Class(ClassScopeRef),
    Func(FuncScopeRef),
    Local(LocalScopeRef),
}

/// Non-owning parent link.
#[derive(Clone, Debug)]
pub enum WeakScopeRef {
    Global(WeakGlobalScope),
    Class(WeakClassScope),
    Func(WeakFuncScope),
    Local(WeakLocalScope),
}

impl WeakScopeRef {
    pub fn upgrade(&self) -> Option<ScopeRef> {
        match self {
            WeakScopeRef::Global(w) => w.upgrade().map(ScopeRef::Global),
            WeakScopeRef::Class(w) => w.upgrade().map(ScopeRef::Class),
            WeakScopeRef::Func(w) => w.upgrade().map(ScopeRef::Func),
            WeakScopeRef::Local(w) => w.upgrade().map(ScopeRef::Local),
        }
    }
}

impl ScopeRef {
    pub fn downgrade(&self) -> WeakScopeRef {
        match self {
            ScopeRef::Global(s) => WeakScopeRef::Global(Rc::downgrade(s)),
            ScopeRef::Class(s) => WeakScopeRef::Class(Rc::downgrade(s)),
            ScopeRef::Func(s) => WeakScopeRef::Func(Rc::downgrade(s)),
            ScopeRef::Local(s) => WeakScopeRef::Local(Rc::downgrade(s)),
        }
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        match self {
            ScopeRef::Global(_) => None,
            ScopeRef::Class(s) => Some(ScopeRef::Global(s.borrow().enclosing.upgrade()?)),
            ScopeRef::Func(s) => s.borrow().enclosing.upgrade(),
            ScopeRef::Local(s) => s.borrow().enclosing.upgrade(),
        }
    }

    /// The root of the tree this scope belongs to.
    pub fn global(&self) -> GlobalScopeRef {
        let mut current = self.clone();
        loop {
            match current {
                ScopeRef::Global(g) => return g,
                other => {
                    current = other
                        .parent()
                        .expect("scope tree must be rooted at a global scope");
                }
            }
        }
    }

    /// The function this scope sits in, if any.
    pub fn enclosing_func(&self) -> Option<FuncScopeRef> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if let ScopeRef::Func(f) = &scope {
                return Some(f.clone());
            }
            current = scope.parent();
        }
        None
    }

    /// Walk the chain resolving a value name. Class scopes do not inject
    /// instance variables here; those are only reachable through `self`
    /// or the `@` sugar.
    pub fn resolve_var(&self, name: &str) -> Option<VarSymbolRef> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let found = match &scope {
                ScopeRef::Local(s) => s
                    .borrow()
                    .vars
                    .iter()
                    .find(|v| v.borrow().name == name)
                    .cloned(),
                ScopeRef::Func(s) => s
                    .borrow()
                    .params
                    .iter()
                    .find(|v| v.borrow().name == name)
                    .cloned(),
                ScopeRef::Class(_) => None,
                ScopeRef::Global(s) => s
                    .borrow()
                    .const_symbols
                    .iter()
                    .find(|v| v.borrow().name == name)
                    .cloned(),
            };
            if found.is_some() {
                return found;
            }
            current = scope.parent();
        }
        None
    }

    /// Resolve a class by name anywhere in reach.
    pub fn resolve_class(&self, name: &str) -> Option<ClassScopeRef> {
        self.global().borrow().resolve_class(name)
    }

    /// All function scopes a call in this scope may refer to: anonymous
    /// functions hosted in enclosing locals, global functions and member
    /// functions of every known class. Constructors are excluded; they
    /// are reachable only through object construction.
    pub fn func_candidates(&self, name: &str) -> Vec<FuncScopeRef> {
        let mut out: Vec<FuncScopeRef> = vec![];
        let mut push = |f: &FuncScopeRef| {
            if !out.iter().any(|o| Rc::ptr_eq(o, f)) {
                out.push(f.clone());
            }
        };

        let mut current = Some(self.clone());
        while let Some(scope) = current {
            match &scope {
                ScopeRef::Local(s) => {
                    for f in s.borrow().unnamed_funcs.iter() {
                        if f.borrow().name == name {
                            push(f);
                        }
                    }
                }
                ScopeRef::Global(g) => {
                    let g = g.borrow();
                    for f in g.functions.iter() {
                        if !f.borrow().is_ctor && f.borrow().name == name {
                            push(f);
                        }
                    }
                    for class in g.classes.iter() {
                        for f in class.borrow().member_funcs.iter() {
                            if !f.borrow().is_ctor && f.borrow().name == name {
                                push(f);
                            }
                        }
                    }
                }
                _ => {}
            }
            current = scope.parent();
        }

        out
    }

    /// Overload resolution: every candidate sharing the maximal non-zero
    /// score.
    pub fn resolve_func(&self, name: &str, arg_types: &[Type]) -> Vec<FuncScopeRef> {
        let winners = best_overloads(self.func_candidates(name), arg_types);
        trace!(
            "overload resolution for '{name}' with {} argument(s): {} winner(s)",
            arg_types.len(),
            winners.len()
        );
        winners
    }
}

fn best_overloads(candidates: Vec<FuncScopeRef>, arg_types: &[Type]) -> Vec<FuncScopeRef> {
    let mut best = 0usize;
    let mut winners: Vec<FuncScopeRef> = vec![];
    for func in candidates {
        let score = overload_score(&func, arg_types);
        if score == 0 {
            continue;
        }
        if score > best {
            best = score;
            winners = vec![func];
        } else if score == best {
            winners.push(func);
        }
    }
    winners
}

/// Per-parameter match quality, multiplied over all parameters:
/// template parameters accept anything (1), class templates accept
/// instantiations of the same class (2), equal types match exactly (3),
/// anything else rejects the whole candidate.
pub fn overload_score(func: &FuncScopeRef, arg_types: &[Type]) -> usize {
    let func = func.borrow();
    if arg_types.len() != func.params.len() {
        return 0;
    }

    let mut score = 1usize;
    for (param, arg) in func.params.iter().zip(arg_types.iter()) {
        let Some(param_type) = param.borrow().ty.clone() else {
            return 0;
        };

        let factor = if matches!(param_type, Type::Template(_)) {
            1
        } else if param_type.is_class_template() {
            match (param_type.as_class(), arg.as_class()) {
                (Some(p), Some(a)) if p.name == a.name => 2,
                _ => {
                    if param_type == *arg {
                        3
                    } else {
                        0
                    }
                }
            }
        } else if param_type == *arg {
            3
        } else {
            0
        };

        if factor == 0 {
            return 0;
        }
        score *= factor;
    }

    score
}

/// Signature collision as used by the duplicate-definition check. A
/// template position collides only with another template position; two
/// annotated positions collide when their types are equal.
pub fn signatures_collide(lhs: &FuncScopeRef, rhs: &FuncScopeRef) -> bool {
    let l = lhs.borrow();
    let r = rhs.borrow();
    if l.name != r.name || l.params.len() != r.params.len() {
        return false;
    }

    for (lp, rp) in l.params.iter().zip(r.params.iter()) {
        let lt = lp.borrow().ty.clone();
        let rt = rp.borrow().ty.clone();
        let l_is_template = matches!(lt, Some(Type::Template(_)));
        let r_is_template = matches!(rt, Some(Type::Template(_)));
        match (l_is_template, r_is_template) {
            (true, true) => continue,
            (false, false) => match (lt, rt) {
                (Some(lt), Some(rt)) if lt == rt => continue,
                _ => return false,
            },
            _ => return false,
        }
    }

    true
}

/// The root scope. Owns every function (including instantiations and
/// lifted lambdas), every class and the global constants.
#[derive(Debug, Default)]
pub struct GlobalScope {
    pub functions: Vec<FuncScopeRef>,
    pub classes: Vec<ClassScopeRef>,
    pub const_symbols: Vec<VarSymbolRef>,
}

impl GlobalScope {
    pub fn create() -> GlobalScopeRef {
        Rc::new(RefCell::new(GlobalScope::default()))
    }

    pub fn define_function(&mut self, func: FuncScopeRef) {
        if self.functions.iter().any(|f| Rc::ptr_eq(f, &func)) {
            return;
        }
        self.functions.push(func);
    }

    pub fn define_class(&mut self, class: ClassScopeRef) {
        self.classes.push(class);
    }

    pub fn define_global_constant(&mut self, sym: VarSymbolRef) {
        self.const_symbols.push(sym);
    }

    pub fn resolve_class(&self, name: &str) -> Option<ClassScopeRef> {
        self.classes
            .iter()
            .find(|c| c.borrow().name == name)
            .cloned()
    }
}

/// A class scope: instance variables plus member functions (constructors
/// included).
#[derive(Debug)]
pub struct ClassScope {
    pub name: String,
    pub enclosing: WeakGlobalScope,
    pub instance_var_symbols: Vec<VarSymbolRef>,
    pub member_funcs: Vec<FuncScopeRef>,
    pub ast: Weak<ClassDefinition>,
    /// `Class` type referring back to this scope.
    pub ty: Type,
}

impl ClassScope {
    pub fn create(
        name: impl ToString,
        enclosing: &GlobalScopeRef,
        ast: &Rc<ClassDefinition>,
    ) -> ClassScopeRef {
        let name = name.to_string();
        let scope = Rc::new(RefCell::new(ClassScope {
            name: name.clone(),
            enclosing: Rc::downgrade(enclosing),
            instance_var_symbols: vec![],
            member_funcs: vec![],
            ast: Rc::downgrade(ast),
            ty: Type::unit(),
        }));
        let ty = Type::Class(crate::typechecker::types::ClassType {
            name,
            scope: Rc::downgrade(&scope),
            args: vec![],
        });
        scope.borrow_mut().ty = ty;
        scope
    }

    pub fn get_ast_node(&self) -> Option<Rc<ClassDefinition>> {
        self.ast.upgrade()
    }

    pub fn instance_var_types(&self) -> Vec<Option<Type>> {
        self.instance_var_symbols
            .iter()
            .map(|s| s.borrow().ty.clone())
            .collect()
    }

    pub fn resolve_instance_var(&self, name: &str) -> Option<VarSymbolRef> {
        self.instance_var_symbols
            .iter()
            .find(|s| s.borrow().name == name)
            .cloned()
    }

    /// A class is a template while any instance variable still has an
    /// unresolved type.
    pub fn is_template(&self) -> bool {
        self.instance_var_symbols.iter().any(|s| {
            s.borrow()
                .ty
                .as_ref()
                .map(|t| matches!(t, Type::Template(_)))
                .unwrap_or(true)
        })
    }

    pub fn ctors(&self) -> Vec<FuncScopeRef> {
        self.member_funcs
            .iter()
            .filter(|f| f.borrow().is_ctor)
            .cloned()
            .collect()
    }

    /// Constructor overload resolution; `arg_types[0]` is the receiver.
    pub fn resolve_ctor(&self, arg_types: &[Type]) -> Vec<FuncScopeRef> {
        best_overloads(self.ctors(), arg_types)
    }

    pub fn has_default_ctor(&self) -> bool {
        let receiver = vec![self.ty.clone()];
        !self.resolve_ctor(&receiver).is_empty()
    }
}

/// A function scope doubles as the function symbol: parameters, body,
/// deduced return type and the flags overload resolution and the
/// const-method checker need.
#[derive(Debug)]
pub struct FuncScope {
    pub name: String,
    pub enclosing: WeakScopeRef,
    pub params: Vec<VarSymbolRef>,
    pub body: Option<LocalScopeRef>,
    pub ret_type: Option<Type>,
    /// Lazily computed by const inference; `None` while undetermined.
    pub is_const: Option<bool>,
    pub is_builtin: bool,
    pub is_ctor: bool,
    pub is_member_func: bool,
    pub ast: Weak<FunctionDefinition>,
    /// `GenericFunc` type referring back to this scope.
    pub ty: Type,
}

impl FuncScope {
    pub fn create(
        name: impl ToString,
        enclosing: WeakScopeRef,
        ast: Option<&Rc<FunctionDefinition>>,
    ) -> FuncScopeRef {
        let scope = Rc::new(RefCell::new(FuncScope {
            name: name.to_string(),
            enclosing,
            params: vec![],
            body: None,
            ret_type: None,
            is_const: None,
            is_builtin: false,
            is_ctor: false,
            is_member_func: false,
            ast: ast.map(Rc::downgrade).unwrap_or_default(),
            ty: Type::unit(),
        }));
        let ty = Type::generic_func(&scope);
        scope.borrow_mut().ty = ty;
        scope
    }

    pub fn get_ast_node(&self) -> Option<Rc<FunctionDefinition>> {
        self.ast.upgrade()
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.starts_with("lambda.")
    }

    pub fn is_main_func(&self) -> bool {
        self.name == "main" && !self.is_member_func
    }

    /// A function is a template while any parameter type still contains
    /// an unresolved type variable (a member function of a class template
    /// is a template through its receiver).
    pub fn is_template(&self) -> bool {
        self.params.iter().any(|p| {
            p.borrow()
                .ty
                .as_ref()
                .map(Type::is_template)
                .unwrap_or(true)
        })
    }

    pub fn define_param(&mut self, sym: VarSymbolRef) -> bool {
        let name = sym.borrow().name.clone();
        if self.params.iter().any(|p| p.borrow().name == name) {
            return false;
        }
        self.params.push(sym);
        true
    }

    /// The class of the receiver when this is a member function.
    pub fn receiver_class(&self) -> Option<ClassScopeRef> {
        let first = self.params.first()?;
        let ty = first.borrow().ty.clone()?;
        ty.as_class()?.scope.upgrade()
    }

    pub fn receiver_type(&self) -> Option<Type> {
        self.params.first().and_then(|p| p.borrow().ty.clone())
    }

    pub fn is_const(&self) -> bool {
        self.is_const.unwrap_or(false)
    }

    /// Human readable signature for diagnostics.
    pub fn to_string(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| {
                p.borrow()
                    .ty
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "_".into())
            })
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = format!("func {}({params})", self.name);
        if let Some(ret) = &self.ret_type {
            out.push_str(&format!(": {ret}"));
        }
        out
    }
}

/// A local scope inside a function body. Hosts locally declared
/// variables, nested local scopes and anonymous (lambda) functions.
#[derive(Debug)]
pub struct LocalScope {
    pub enclosing: WeakScopeRef,
    pub vars: Vec<VarSymbolRef>,
    pub children: Vec<LocalScopeRef>,
    pub unnamed_funcs: Vec<FuncScopeRef>,
}

impl LocalScope {
    pub fn create(enclosing: WeakScopeRef) -> LocalScopeRef {
        Rc::new(RefCell::new(LocalScope {
            enclosing,
            vars: vec![],
            children: vec![],
            unnamed_funcs: vec![],
        }))
    }

    /// Fails when the name is already taken in this scope; shadowing an
    /// outer binding is fine.
    pub fn define_variable(&mut self, sym: VarSymbolRef) -> bool {
        let name = sym.borrow().name.clone();
        if self.vars.iter().any(|v| v.borrow().name == name) {
            return false;
        }
        self.vars.push(sym);
        true
    }

    pub fn define_child(&mut self, child: LocalScopeRef) {
        self.children.push(child);
    }

    pub fn define_unnamed_func(&mut self, func: FuncScopeRef) {
        self.unnamed_funcs.push(func);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn func_with_params(name: &str, param_types: Vec<Type>) -> FuncScopeRef {
        let global = GlobalScope::create();
        let func = FuncScope::create(
            name,
            WeakScopeRef::Global(Rc::downgrade(&global)),
            None,
        );
        for (i, ty) in param_types.into_iter().enumerate() {
            let sym = VarSymbol::with_type(format!("p{i}"), ty, true, Span::default());
            func.borrow_mut().define_param(sym);
        }
        func
    }

    #[test]
    fn test_overload_score_prefers_exact_match() {
        let exact = func_with_params("foo", vec![Type::int()]);
        let template = func_with_params(
            "foo",
            vec![Type::template(crate::ast::NodeId::fresh(), Span::default())],
        );

        assert_eq!(overload_score(&exact, &[Type::int()]), 3);
        assert_eq!(overload_score(&template, &[Type::int()]), 1);
        assert_eq!(overload_score(&exact, &[Type::float()]), 0);
    }

    #[test]
    fn test_overload_score_arity_mismatch() {
        let f = func_with_params("foo", vec![Type::int()]);
        assert_eq!(overload_score(&f, &[]), 0);
        assert_eq!(overload_score(&f, &[Type::int(), Type::int()]), 0);
    }

    #[test]
    fn test_signatures_collide_only_when_both_template() {
        let template_a = func_with_params(
            "foo",
            vec![Type::template(crate::ast::NodeId::fresh(), Span::default())],
        );
        let template_b = func_with_params(
            "foo",
            vec![Type::template(crate::ast::NodeId::fresh(), Span::default())],
        );
        let concrete = func_with_params("foo", vec![Type::int()]);

        assert!(signatures_collide(&template_a, &template_b));
        assert!(!signatures_collide(&template_a, &concrete));
        assert!(signatures_collide(&concrete, &concrete.clone()));
    }

    #[test]
    fn test_variable_resolution_walks_outward() {
        let global = GlobalScope::create();
        let func = FuncScope::create(
            "f",
            WeakScopeRef::Global(Rc::downgrade(&global)),
            None,
        );
        let body = LocalScope::create(WeakScopeRef::Func(Rc::downgrade(&func)));
        func.borrow_mut().body = Some(body.clone());

        let param = VarSymbol::with_type("x", Type::int(), true, Span::default());
        func.borrow_mut().define_param(param);

        let scope = ScopeRef::Local(body.clone());
        assert!(scope.resolve_var("x").is_some());
        assert!(scope.resolve_var("y").is_none());

        let local = VarSymbol::with_type("y", Type::uint(), false, Span::default());
        body.borrow_mut().define_variable(local);
        assert!(scope.resolve_var("y").is_some());
    }

    #[test]
    fn test_define_variable_rejects_duplicates_in_same_scope() {
        let global = GlobalScope::create();
        let func = FuncScope::create(
            "f",
            WeakScopeRef::Global(Rc::downgrade(&global)),
            None,
        );
        let body = LocalScope::create(WeakScopeRef::Func(Rc::downgrade(&func)));

        assert!(body
            .borrow_mut()
            .define_variable(VarSymbol::new("x", true, Span::default())));
        assert!(!body
            .borrow_mut()
            .define_variable(VarSymbol::new("x", true, Span::default())));
    }
}
