//! Syntactic type nodes.
//!
//! These are what the parser saw after a `:` or inside `new`; resolving
//! them into semantic [`crate::typechecker::types::Type`] values is the
//! type resolver's job and needs the scope tree, so nothing here carries
//! semantic meaning on its own.

use std::fmt::Display;
use std::rc::Rc;

use serde::Serialize;

use super::{Expression, NodeId};
use crate::span::Span;

#[derive(Clone, Debug, Serialize)]
pub enum TypeName {
    Primary(Rc<PrimaryTypeName>),
    Array(Rc<ArrayTypeName>),
    Dict(Rc<DictTypeName>),
    Pointer(Rc<PointerTypeName>),
    Tuple(Rc<TupleTypeName>),
    Func(Rc<FuncTypeName>),
    Maybe(Rc<MaybeTypeName>),
    Typeof(Rc<TypeofTypeName>),
}

/// A (possibly templated) name: `int`, `Foo` or `Foo(int, char)`.
#[derive(Clone, Debug, Serialize)]
pub struct PrimaryTypeName {
    pub name: String,
    pub args: Vec<TypeName>,
    pub span: Span,
    pub id: NodeId,
}

/// `[T]`; an absent element type stands for "to be inferred".
#[derive(Clone, Debug, Serialize)]
pub struct ArrayTypeName {
    pub element: Option<TypeName>,
    pub span: Span,
    pub id: NodeId,
}

/// `{K => V}`. Parsed but rejected by the analyzer as unimplemented.
#[derive(Clone, Debug, Serialize)]
pub struct DictTypeName {
    pub key: TypeName,
    pub value: TypeName,
    pub span: Span,
    pub id: NodeId,
}

/// `pointer(T)`; an absent pointee stands for "to be inferred".
#[derive(Clone, Debug, Serialize)]
pub struct PointerTypeName {
    pub pointee: Option<TypeName>,
    pub span: Span,
    pub id: NodeId,
}

#[derive(Clone, Debug, Serialize)]
pub struct TupleTypeName {
    pub elements: Vec<TypeName>,
    pub span: Span,
    pub id: NodeId,
}

#[derive(Clone, Debug, Serialize)]
pub struct FuncTypeName {
    pub params: Vec<TypeName>,
    pub ret: Option<Box<TypeName>>,
    pub span: Span,
    pub id: NodeId,
}

/// `T?`, the only qualified form.
#[derive(Clone, Debug, Serialize)]
pub struct MaybeTypeName {
    pub inner: TypeName,
    pub span: Span,
    pub id: NodeId,
}

/// `typeof(expr)`. The single place where a type node triggers expression
/// analysis; only legal inside a function body.
#[derive(Clone, Debug, Serialize)]
pub struct TypeofTypeName {
    pub expr: Expression,
    pub span: Span,
    pub id: NodeId,
}

impl TypeName {
    pub fn primary(name: impl ToString, span: Span) -> TypeName {
        TypeName::Primary(Rc::new(PrimaryTypeName {
            name: name.to_string(),
            args: vec![],
            span,
            id: NodeId::fresh(),
        }))
    }

    pub fn primary_with_args(name: impl ToString, args: Vec<TypeName>, span: Span) -> TypeName {
        TypeName::Primary(Rc::new(PrimaryTypeName {
            name: name.to_string(),
            args,
            span,
            id: NodeId::fresh(),
        }))
    }

    pub fn array(element: Option<TypeName>, span: Span) -> TypeName {
        TypeName::Array(Rc::new(ArrayTypeName {
            element,
            span,
            id: NodeId::fresh(),
        }))
    }

    pub fn dict(key: TypeName, value: TypeName, span: Span) -> TypeName {
        TypeName::Dict(Rc::new(DictTypeName {
            key,
            value,
            span,
            id: NodeId::fresh(),
        }))
    }

    pub fn pointer(pointee: Option<TypeName>, span: Span) -> TypeName {
        TypeName::Pointer(Rc::new(PointerTypeName {
            pointee,
            span,
            id: NodeId::fresh(),
        }))
    }

    pub fn tuple(elements: Vec<TypeName>, span: Span) -> TypeName {
        TypeName::Tuple(Rc::new(TupleTypeName {
            elements,
            span,
            id: NodeId::fresh(),
        }))
    }

    pub fn func(params: Vec<TypeName>, ret: Option<TypeName>, span: Span) -> TypeName {
        TypeName::Func(Rc::new(FuncTypeName {
            params,
            ret: ret.map(Box::new),
            span,
            id: NodeId::fresh(),
        }))
    }

    pub fn maybe(inner: TypeName, span: Span) -> TypeName {
        TypeName::Maybe(Rc::new(MaybeTypeName {
            inner,
            span,
            id: NodeId::fresh(),
        }))
    }

    pub fn typeof_(expr: Expression, span: Span) -> TypeName {
        TypeName::Typeof(Rc::new(TypeofTypeName {
            expr,
            span,
            id: NodeId::fresh(),
        }))
    }

    pub fn span(&self) -> Span {
        match self {
            TypeName::Primary(n) => n.span.clone(),
            TypeName::Array(n) => n.span.clone(),
            TypeName::Dict(n) => n.span.clone(),
            TypeName::Pointer(n) => n.span.clone(),
            TypeName::Tuple(n) => n.span.clone(),
            TypeName::Func(n) => n.span.clone(),
            TypeName::Maybe(n) => n.span.clone(),
            TypeName::Typeof(n) => n.span.clone(),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            TypeName::Primary(n) => n.id,
            TypeName::Array(n) => n.id,
            TypeName::Dict(n) => n.id,
            TypeName::Pointer(n) => n.id,
            TypeName::Tuple(n) => n.id,
            TypeName::Func(n) => n.id,
            TypeName::Maybe(n) => n.id,
            TypeName::Typeof(n) => n.id,
        }
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeName::Primary(n) => {
                write!(f, "{}", n.name)?;
                if !n.args.is_empty() {
                    let args = n
                        .args
                        .iter()
                        .map(|a| a.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "({args})")?;
                }
                Ok(())
            }
            TypeName::Array(n) => match &n.element {
                Some(e) => write!(f, "[{e}]"),
                None => write!(f, "[_]"),
            },
            TypeName::Dict(n) => write!(f, "{{{} => {}}}", n.key, n.value),
            TypeName::Pointer(n) => match &n.pointee {
                Some(p) => write!(f, "pointer({p})"),
                None => write!(f, "pointer(_)"),
            },
            TypeName::Tuple(n) => {
                let elems = n
                    .elements
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "({elems})")
            }
            TypeName::Func(n) => {
                let params = n
                    .params
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                match &n.ret {
                    Some(ret) => write!(f, "func({params}): {ret}"),
                    None => write!(f, "func({params})"),
                }
            }
            TypeName::Maybe(n) => write!(f, "{}?", n.inner),
            TypeName::Typeof(_) => write!(f, "typeof(...)"),
        }
    }
}
