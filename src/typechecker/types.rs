//! Semantic types.
//!
//! A [`Type`] is a cheap value; scopes it mentions are referenced weakly so
//! type values never keep the scope tree alive (the global scope owns it).
//! The unit type is the empty tuple and every "no value" position uses it.
//!
//! Equality is deliberately not plain structural equality:
//! - two class types are equal iff their names match and their instance
//!   variables match element-wise, where a template position on either
//!   side matches anything,
//! - two generic-function types are equal iff they reference the same
//!   function scope,
//! - everything else compares structurally.

use std::collections::HashMap;
use std::fmt::Display;
use std::rc::Weak;

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};

use crate::ast::NodeId;
use crate::span::Span;

use super::scope::{ClassScopeRef, FuncScopeRef, WeakClassScope, WeakFuncScope};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BuiltinType {
    Int,
    UInt,
    Float,
    Char,
    Bool,
    Symbol,
    /// The raw string representation. Not denotable in source ("string"
    /// names the runtime class); it survives for the low-level indexing
    /// rule and the data the string class wraps.
    String,
}

impl BuiltinType {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Int => "int",
            BuiltinType::UInt => "uint",
            BuiltinType::Float => "float",
            BuiltinType::Char => "char",
            BuiltinType::Bool => "bool",
            BuiltinType::Symbol => "symbol",
            BuiltinType::String => "string",
        }
    }
}

/// Builtin names a primary type node may resolve to without consulting
/// the class list.
pub static BUILTIN_TYPE_NAMES: Lazy<HashMap<&'static str, BuiltinType>> = Lazy::new(|| {
    [
        ("int", BuiltinType::Int),
        ("uint", BuiltinType::UInt),
        ("float", BuiltinType::Float),
        ("char", BuiltinType::Char),
        ("bool", BuiltinType::Bool),
        ("symbol", BuiltinType::Symbol),
    ]
    .into_iter()
    .collect()
});

#[derive(Clone, Debug)]
pub struct ClassType {
    pub name: String,
    pub scope: WeakClassScope,
    /// Explicitly specified template arguments (`Foo(int)` in a type
    /// position); empty for ordinary references and constructor-driven
    /// instantiations.
    pub args: Vec<Type>,
}

#[derive(Clone, Debug)]
pub struct GenericFuncType {
    pub scope: WeakFuncScope,
}

/// An unresolved type variable introduced for an unannotated parameter or
/// an element-less array/pointer type node.
#[derive(Clone, Debug)]
pub struct TemplateType {
    pub node: NodeId,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Type {
    Builtin(BuiltinType),
    Class(ClassType),
    Tuple(Vec<Type>),
    Func {
        params: Vec<Type>,
        ret: Option<Box<Type>>,
    },
    GenericFunc(GenericFuncType),
    Array {
        element: Box<Type>,
        size: Option<u64>,
    },
    Pointer(Box<Type>),
    Maybe(Box<Type>),
    Template(TemplateType),
}

impl Type {
    pub fn int() -> Type {
        Type::Builtin(BuiltinType::Int)
    }

    pub fn uint() -> Type {
        Type::Builtin(BuiltinType::UInt)
    }

    pub fn float() -> Type {
        Type::Builtin(BuiltinType::Float)
    }

    pub fn char_type() -> Type {
        Type::Builtin(BuiltinType::Char)
    }

    pub fn boolean() -> Type {
        Type::Builtin(BuiltinType::Bool)
    }

    pub fn symbol() -> Type {
        Type::Builtin(BuiltinType::Symbol)
    }

    pub fn raw_string() -> Type {
        Type::Builtin(BuiltinType::String)
    }

    /// The canonical "no value" type.
    pub fn unit() -> Type {
        Type::Tuple(vec![])
    }

    pub fn array(element: Type) -> Type {
        Type::Array {
            element: Box::new(element),
            size: None,
        }
    }

    pub fn sized_array(element: Type, size: u64) -> Type {
        Type::Array {
            element: Box::new(element),
            size: Some(size),
        }
    }

    pub fn pointer(pointee: Type) -> Type {
        Type::Pointer(Box::new(pointee))
    }

    pub fn maybe(inner: Type) -> Type {
        Type::Maybe(Box::new(inner))
    }

    pub fn template(node: NodeId, span: Span) -> Type {
        Type::Template(TemplateType { node, span })
    }

    pub fn generic_func(scope: &FuncScopeRef) -> Type {
        Type::GenericFunc(GenericFuncType {
            scope: std::rc::Rc::downgrade(scope),
        })
    }

    pub fn class(scope: &ClassScopeRef) -> Type {
        Type::class_with_args(scope, vec![])
    }

    pub fn class_with_args(scope: &ClassScopeRef, args: Vec<Type>) -> Type {
        let name = scope.borrow().name.clone();
        Type::Class(ClassType {
            name,
            scope: std::rc::Rc::downgrade(scope),
            args,
        })
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Type::Tuple(elems) if elems.is_empty())
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Type::Builtin(_))
    }

    pub fn is_builtin_of(&self, builtin: BuiltinType) -> bool {
        matches!(self, Type::Builtin(b) if *b == builtin)
    }

    pub fn is_int_or_uint(&self) -> bool {
        self.is_builtin_of(BuiltinType::Int) || self.is_builtin_of(BuiltinType::UInt)
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Type::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_generic_func(&self) -> Option<&GenericFuncType> {
        match self {
            Type::GenericFunc(g) => Some(g),
            _ => None,
        }
    }

    /// Does this type still contain an unresolved template variable?
    /// Mirrors the coarse rule used for overload scoring: classes, arrays
    /// and pointers are inspected, plain templates are templates, and
    /// everything else is considered resolved.
    pub fn is_template(&self) -> bool {
        match self {
            Type::Template(_) => true,
            Type::Class(c) => match c.scope.upgrade() {
                Some(scope) => scope.borrow().is_template(),
                None => c.args.iter().any(Type::is_template),
            },
            Type::Array { element, .. } => element.is_template(),
            Type::Pointer(pointee) => pointee.is_template(),
            Type::Maybe(inner) => inner.is_template(),
            _ => false,
        }
    }

    /// A class template (or an array of one), as opposed to a bare
    /// template variable. Such a parameter scores weaker than an exact
    /// match but stronger than a plain template during overload
    /// resolution.
    pub fn is_class_template(&self) -> bool {
        match self {
            Type::Class(c) => c
                .scope
                .upgrade()
                .map(|s| s.borrow().is_template())
                .unwrap_or(false),
            Type::Array { element, .. } => element.is_class_template(),
            _ => false,
        }
    }

    /// Is `self` the result of substituting template variables in `from`?
    pub fn is_instantiated_from(&self, from: &Type) -> bool {
        match (self, from) {
            (_, Type::Template(_)) => true,
            (Type::Class(lhs), Type::Class(rhs)) => {
                if lhs.name != rhs.name {
                    return false;
                }
                let (Some(l), Some(r)) = (lhs.scope.upgrade(), rhs.scope.upgrade()) else {
                    return false;
                };
                if !r.borrow().is_template() {
                    return false;
                }
                let lvars = l.borrow().instance_var_types();
                let rvars = r.borrow().instance_var_types();
                if lvars.len() != rvars.len() {
                    return false;
                }
                lvars.iter().zip(rvars.iter()).all(|(lt, rt)| match (lt, rt) {
                    (Some(lt), Some(rt)) => {
                        matches!(rt, Type::Template(_)) || lt == rt || lt.is_instantiated_from(rt)
                    }
                    _ => false,
                })
            }
            (Type::Array { element: l, .. }, Type::Array { element: r, .. }) => {
                r.is_template() && (matches!(**r, Type::Template(_)) || l.is_instantiated_from(r))
            }
            (Type::Pointer(l), Type::Pointer(r)) => {
                r.is_template() && (matches!(**r, Type::Template(_)) || l.is_instantiated_from(r))
            }
            _ => false,
        }
    }

    /// Can a value of this type be created without any constructor
    /// argument?
    pub fn is_default_constructible(&self) -> bool {
        match self {
            Type::Builtin(_) => true,
            Type::Tuple(elems) => elems.iter().all(Type::is_default_constructible),
            Type::Array { element, .. } => element.is_default_constructible(),
            Type::Maybe(_) => true,
            Type::Class(c) => {
                let Some(scope) = c.scope.upgrade() else {
                    return false;
                };
                let scope = scope.borrow();
                if scope.is_template() {
                    return false;
                }
                scope.has_default_ctor()
            }
            Type::Pointer(_) | Type::Func { .. } | Type::GenericFunc(_) | Type::Template(_) => {
                false
            }
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Builtin(l), Type::Builtin(r)) => l == r,
            (Type::Tuple(l), Type::Tuple(r)) => l == r,
            (
                Type::Func {
                    params: lp,
                    ret: lr,
                },
                Type::Func {
                    params: rp,
                    ret: rr,
                },
            ) => lp == rp && lr == rr,
            (Type::GenericFunc(l), Type::GenericFunc(r)) => Weak::ptr_eq(&l.scope, &r.scope),
            (
                Type::Array {
                    element: le,
                    size: ls,
                },
                Type::Array {
                    element: re,
                    size: rs,
                },
            ) => le == re && ls == rs,
            (Type::Pointer(l), Type::Pointer(r)) => l == r,
            (Type::Maybe(l), Type::Maybe(r)) => l == r,
            (Type::Template(l), Type::Template(r)) => l.node == r.node,
            (Type::Class(l), Type::Class(r)) => class_types_equal(l, r),
            _ => false,
        }
    }
}

/// Class equality: names first, then instance variables element-wise with
/// template positions acting as wildcards.
fn class_types_equal(lhs: &ClassType, rhs: &ClassType) -> bool {
    if lhs.name != rhs.name {
        return false;
    }

    match (lhs.scope.upgrade(), rhs.scope.upgrade()) {
        (Some(l), Some(r)) => {
            if std::rc::Rc::ptr_eq(&l, &r) {
                return true;
            }
            let lvars = l.borrow().instance_var_types();
            let rvars = r.borrow().instance_var_types();
            if lvars.len() != rvars.len() {
                return false;
            }
            lvars.iter().zip(rvars.iter()).all(|(lt, rt)| match (lt, rt) {
                (Some(Type::Template(_)), _) | (_, Some(Type::Template(_))) => true,
                (Some(lt), Some(rt)) => lt == rt,
                _ => true,
            })
        }
        // A dangling reference can only mean the scope tree is gone;
        // fall back to the name match.
        _ => true,
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Builtin(b) => write!(f, "{}", b.name()),
            Type::Class(c) => {
                write!(f, "{}", c.name)?;
                if !c.args.is_empty() {
                    let args = c
                        .args
                        .iter()
                        .map(|a| a.to_string())
                        .collect::<Vec<_>>()
                        .join(",");
                    write!(f, "({args})")?;
                }
                Ok(())
            }
            Type::Tuple(elems) => {
                let elems = elems
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "({elems})")
            }
            Type::Func { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                match ret {
                    Some(ret) => write!(f, "func({params}): {ret}"),
                    None => write!(f, "func({params})"),
                }
            }
            Type::GenericFunc(g) => match g.scope.upgrade() {
                Some(scope) => write!(f, "<func:{}>", scope.borrow().name),
                None => write!(f, "<func:?>"),
            },
            Type::Array { element, size } => match size {
                Some(size) => write!(f, "[{element},{size}]"),
                None => write!(f, "[{element}]"),
            },
            Type::Pointer(pointee) => write!(f, "pointer({pointee})"),
            Type::Maybe(inner) => write!(f, "{inner}?"),
            Type::Template(t) => write!(f, "<template:{}:{}>", t.span.line, t.span.col),
        }
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Resolve a syntactic type node against the current scope chain.
///
/// Builtin names win over classes; anything else must name a class in
/// reach. Element-less array/pointer nodes produce fresh template
/// variables bound to the node. `typeof(expr)` re-enters the analyzer,
/// which is only permitted inside a function body.
pub fn from_type_name(
    node: &crate::ast::TypeName,
    ctx: &mut crate::typechecker::context::Context,
) -> crate::typechecker::TypeResult<Type> {
    use crate::ast::TypeName;
    use crate::typechecker::error::{
        NotImplemented, TypeCheckError, TypeofOutsideFunction, UndefinedType,
    };

    match node {
        TypeName::Primary(n) => {
            if let Some(builtin) = BUILTIN_TYPE_NAMES.get(n.name.as_str()) {
                if !n.args.is_empty() {
                    return Err(TypeCheckError::UndefinedType(
                        UndefinedType {
                            name: node.to_string(),
                        },
                        n.span.clone(),
                    ));
                }
                return Ok(Type::Builtin(*builtin));
            }

            let Some(class) = ctx.current().resolve_class(&n.name) else {
                return Err(TypeCheckError::UndefinedType(
                    UndefinedType {
                        name: n.name.clone(),
                    },
                    n.span.clone(),
                ));
            };

            let mut args = vec![];
            for arg in &n.args {
                args.push(from_type_name(arg, ctx)?);
            }
            Ok(Type::class_with_args(&class, args))
        }
        TypeName::Array(n) => match &n.element {
            Some(element) => Ok(Type::array(from_type_name(element, ctx)?)),
            None => Ok(Type::array(Type::template(n.id, n.span.clone()))),
        },
        TypeName::Pointer(n) => match &n.pointee {
            Some(pointee) => Ok(Type::pointer(from_type_name(pointee, ctx)?)),
            None => Ok(Type::pointer(Type::template(n.id, n.span.clone()))),
        },
        TypeName::Tuple(n) => {
            let mut elements = vec![];
            for element in &n.elements {
                elements.push(from_type_name(element, ctx)?);
            }
            Ok(Type::Tuple(elements))
        }
        TypeName::Func(n) => {
            let mut params = vec![];
            for param in &n.params {
                params.push(from_type_name(param, ctx)?);
            }
            let ret = match &n.ret {
                Some(ret) => Some(Box::new(from_type_name(ret, ctx)?)),
                None => None,
            };
            Ok(Type::Func { params, ret })
        }
        TypeName::Maybe(n) => Ok(Type::maybe(from_type_name(&n.inner, ctx)?)),
        TypeName::Dict(n) => Err(TypeCheckError::NotImplemented(
            NotImplemented {
                feature: "dict type",
            },
            n.span.clone(),
        )),
        TypeName::Typeof(n) => {
            if !ctx.in_function_body() {
                return Err(TypeCheckError::TypeofOutsideFunction(
                    TypeofOutsideFunction,
                    n.span.clone(),
                ));
            }
            crate::typechecker::expression::check_expression(&n.expr, ctx);
            n.expr.ty().ok_or_else(|| {
                TypeCheckError::UndefinedType(
                    UndefinedType {
                        name: "typeof(...)".into(),
                    },
                    n.span.clone(),
                )
            })
        }
    }
}

/// Resolve a type node, reporting failures into the context; `None`
/// means an error was recorded.
pub fn resolve_type_node(
    node: &crate::ast::TypeName,
    ctx: &mut crate::typechecker::context::Context,
) -> Option<Type> {
    match from_type_name(node, ctx) {
        Ok(ty) => Some(ty),
        Err(err) => {
            ctx.error(err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BuiltinType, Type};
    use crate::ast::NodeId;
    use crate::span::Span;

    #[test]
    fn test_unit_is_canonical() {
        assert_eq!(Type::unit(), Type::unit());
        assert!(Type::unit().is_unit());
        assert_ne!(Type::unit(), Type::Tuple(vec![Type::int()]));
    }

    #[test]
    fn test_builtin_equality() {
        assert_eq!(Type::int(), Type::int());
        assert_ne!(Type::int(), Type::uint());
        assert!(Type::int().is_builtin_of(BuiltinType::Int));
    }

    #[test]
    fn test_array_equality_considers_size() {
        assert_eq!(Type::array(Type::int()), Type::array(Type::int()));
        assert_ne!(Type::array(Type::int()), Type::sized_array(Type::int(), 4));
        assert_ne!(Type::array(Type::int()), Type::array(Type::float()));
    }

    #[test]
    fn test_template_matches_by_node() {
        let a = NodeId::fresh();
        let b = NodeId::fresh();
        assert_eq!(
            Type::template(a, Span::default()),
            Type::template(a, Span::default())
        );
        assert_ne!(
            Type::template(a, Span::default()),
            Type::template(b, Span::default())
        );
    }

    #[test]
    fn test_instantiated_from_bare_template() {
        let t = Type::template(NodeId::fresh(), Span::default());
        assert!(Type::int().is_instantiated_from(&t));
        assert!(Type::array(Type::int())
            .is_instantiated_from(&Type::array(Type::template(NodeId::fresh(), Span::default()))));
        assert!(!Type::int().is_instantiated_from(&Type::uint()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::unit().to_string(), "()");
        assert_eq!(Type::array(Type::int()).to_string(), "[int]");
        assert_eq!(Type::pointer(Type::char_type()).to_string(), "pointer(char)");
        assert_eq!(
            Type::Func {
                params: vec![Type::int()],
                ret: Some(Box::new(Type::boolean())),
            }
            .to_string(),
            "func(int): bool"
        );
    }

    #[test]
    fn test_default_constructible() {
        assert!(Type::int().is_default_constructible());
        assert!(Type::unit().is_default_constructible());
        assert!(!Type::pointer(Type::int()).is_default_constructible());
        assert!(!Type::template(NodeId::fresh(), Span::default()).is_default_constructible());
    }
}
