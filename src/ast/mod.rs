//! The abstract syntax tree the analyzer operates on.
//!
//! The tree is produced by the external parser (see [`crate::importer`])
//! and handed over as a [`Program`]. Nodes are shared behind `Rc` and carry
//! interior-mutable slots which the analyzer fills in place: every
//! expression owns a type slot, invocation-like nodes own a callee slot and
//! constructor-capable nodes own a constructed-class slot. Structure is
//! never mutated after parsing, with two deliberate exceptions: UFCS calls
//! on callable instance variables are rebound, and constructors receive
//! synthesized default initializations.
//!
//! Template instantiation never touches these shared nodes; it goes through
//! [`copy_function_definition`]/[`copy_class_definition`] which produce an
//! independent tree with fresh ids and empty slots.

mod copy;
mod expression;
mod statement;
mod type_name;
mod walk;

pub use self::copy::{copy_class_definition, copy_function_definition};
pub use self::expression::*;
pub use self::statement::*;
pub use self::type_name::*;
pub use self::walk::{walk_block, walk_expression, walk_statement, Visitor};

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::span::Span;
use crate::typechecker::scope::{ClassScope, FuncScope, LocalScope, VarSymbol};
use crate::typechecker::types::Type;

/// Identity of an AST node, unique for the lifetime of the process.
/// Deep copies allocate fresh ids, so a template and its instantiations
/// never share one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn fresh() -> NodeId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Shared mutable slot holding the inferred type of an expression.
pub type TypeSlot = Rc<RefCell<Option<Type>>>;

/// Slot pointing back at the variable symbol a reference resolved to.
pub type SymbolSlot = RefCell<Weak<RefCell<VarSymbol>>>;

/// Non-owning reference to a function scope.
pub type WeakFuncScope = Weak<RefCell<FuncScope>>;

/// Slot filled by overload resolution with the winning function scope.
pub type CalleeSlot = RefCell<Weak<RefCell<FuncScope>>>;

/// Slot filled by object construction with the (instantiated) class scope.
pub type ClassSlot = RefCell<Weak<RefCell<ClassScope>>>;

/// Slot pointing at the local scope created for a block.
pub type LocalScopeSlot = RefCell<Weak<RefCell<LocalScope>>>;

pub fn empty_type_slot() -> TypeSlot {
    Rc::new(RefCell::new(None))
}

/// A whole translation unit after imports have been merged in.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Program {
    pub imports: Vec<Rc<ImportDecl>>,
    pub definitions: Vec<Definition>,
}

impl Program {
    pub fn new(definitions: Vec<Definition>) -> Program {
        Program {
            imports: vec![],
            definitions,
        }
    }

    /// JSON rendering of the syntactic tree, the surface behind the
    /// driver's AST dump flag. Inference slots are not serialized.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// `import a.b.c` as delivered by the parser. The importer maps the path
/// to a parsed sub-AST whose definitions are merged into the program.
#[derive(Clone, Debug, Serialize)]
pub struct ImportDecl {
    pub path: Vec<String>,
    pub span: Span,
    pub id: NodeId,
}

impl ImportDecl {
    pub fn new(path: Vec<String>, span: Span) -> Rc<ImportDecl> {
        Rc::new(ImportDecl {
            path,
            span,
            id: NodeId::fresh(),
        })
    }

    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// Top-level declaration.
#[derive(Clone, Debug, Serialize)]
pub enum Definition {
    Function(Rc<FunctionDefinition>),
    Class(Rc<ClassDefinition>),
}
