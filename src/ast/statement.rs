//! Statement nodes, plus function and class definitions.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use super::{
    empty_type_slot, CalleeSlot, ClassSlot, Expression, LocalScopeSlot, NodeId, SymbolSlot,
    TypeName, TypeSlot,
};
use crate::span::Span;

#[derive(Clone, Debug, Serialize)]
pub enum Statement {
    /// An expression evaluated for its effect, e.g. a `print(...)` call.
    Expression(Expression),
    Assignment(Rc<AssignmentStmt>),
    Initialize(Rc<InitializeStmt>),
    If(Rc<IfStmt>),
    Case(Rc<CaseStmt>),
    Switch(Rc<SwitchStmt>),
    For(Rc<ForStmt>),
    While(Rc<WhileStmt>),
    Return(Rc<ReturnStmt>),
    PostfixIf(Rc<PostfixIf>),
    Let(Rc<LetStmt>),
    Do(Rc<DoStmt>),
    Block(Rc<StatementBlock>),
    Function(Rc<FunctionDefinition>),
    Class(Rc<ClassDefinition>),
}

/// A braceless sequence of statements with its own local scope. The
/// statement list is interior-mutable because constructor analysis
/// prepends synthesized default initializations.
#[derive(Clone, Debug, Serialize)]
pub struct StatementBlock {
    pub statements: RefCell<Vec<Statement>>,
    pub span: Span,
    pub id: NodeId,
    #[serde(skip)]
    pub scope: LocalScopeSlot,
}

impl StatementBlock {
    pub fn new(statements: Vec<Statement>, span: Span) -> Rc<StatementBlock> {
        Rc::new(StatementBlock {
            statements: RefCell::new(statements),
            span,
            id: NodeId::fresh(),
            scope: LocalScopeSlot::default(),
        })
    }
}

/// Parallel assignment: `a, b = x, y` or `a = x`.
#[derive(Clone, Debug, Serialize)]
pub struct AssignmentStmt {
    pub assignees: Vec<Expression>,
    pub rhs_exprs: Vec<Expression>,
    pub span: Span,
    pub id: NodeId,
}

impl AssignmentStmt {
    pub fn new(assignees: Vec<Expression>, rhs_exprs: Vec<Expression>, span: Span) -> Statement {
        Statement::Assignment(Rc::new(AssignmentStmt {
            assignees,
            rhs_exprs,
            span,
            id: NodeId::fresh(),
        }))
    }
}

/// `a := 42`, `var a : int`, `a, b := t` and, in constructors, `@x := e`.
/// The right-hand sides are interior-mutable so the analyzer can insert a
/// synthesized default construction when they are absent.
#[derive(Clone, Debug, Serialize)]
pub struct InitializeStmt {
    pub var_decls: Vec<Rc<VariableDecl>>,
    pub rhs_exprs: RefCell<Option<Vec<Expression>>>,
    pub span: Span,
    pub id: NodeId,
}

impl InitializeStmt {
    pub fn new(
        var_decls: Vec<Rc<VariableDecl>>,
        rhs_exprs: Option<Vec<Expression>>,
        span: Span,
    ) -> Rc<InitializeStmt> {
        Rc::new(InitializeStmt {
            var_decls,
            rhs_exprs: RefCell::new(rhs_exprs),
            span,
            id: NodeId::fresh(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Accessibility {
    #[default]
    Public,
    Private,
}

/// A single declared name: local variable, instance variable (`@`-prefixed
/// inside constructors and class bodies) or global constant.
#[derive(Clone, Debug, Serialize)]
pub struct VariableDecl {
    /// `var` makes the binding mutable; the default is immutable.
    pub is_var: bool,
    pub name: String,
    pub maybe_type: Option<TypeName>,
    pub accessibility: Accessibility,
    pub span: Span,
    pub id: NodeId,
    #[serde(skip)]
    pub symbol: SymbolSlot,
}

impl VariableDecl {
    pub fn new(
        is_var: bool,
        name: impl ToString,
        maybe_type: Option<TypeName>,
        span: Span,
    ) -> Rc<VariableDecl> {
        Rc::new(VariableDecl {
            is_var,
            name: name.to_string(),
            maybe_type,
            accessibility: Accessibility::Public,
            span,
            id: NodeId::fresh(),
            symbol: SymbolSlot::default(),
        })
    }

    pub fn private(
        is_var: bool,
        name: impl ToString,
        maybe_type: Option<TypeName>,
        span: Span,
    ) -> Rc<VariableDecl> {
        Rc::new(VariableDecl {
            is_var,
            name: name.to_string(),
            maybe_type,
            accessibility: Accessibility::Private,
            span,
            id: NodeId::fresh(),
            symbol: SymbolSlot::default(),
        })
    }

    /// `@x` targets an instance variable of the receiver.
    pub fn is_instance_var(&self) -> bool {
        self.name.starts_with('@')
    }

    /// The instance variable name without the `@` marker.
    pub fn instance_var_name(&self) -> &str {
        self.name.trim_start_matches('@')
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IfKind {
    If,
    Unless,
}

#[derive(Clone, Debug, Serialize)]
pub struct IfStmt {
    pub kind: IfKind,
    pub condition: Expression,
    pub then_block: Rc<StatementBlock>,
    pub elseif_blocks: Vec<(Expression, Rc<StatementBlock>)>,
    pub else_block: Option<Rc<StatementBlock>>,
    pub span: Span,
    pub id: NodeId,
}

impl IfStmt {
    pub fn new(
        kind: IfKind,
        condition: Expression,
        then_block: Rc<StatementBlock>,
        else_block: Option<Rc<StatementBlock>>,
        span: Span,
    ) -> Statement {
        Statement::If(Rc::new(IfStmt {
            kind,
            condition,
            then_block,
            elseif_blocks: vec![],
            else_block,
            span,
            id: NodeId::fresh(),
        }))
    }
}

/// `case` without a scrutinee: every `when` carries a boolean guard.
#[derive(Clone, Debug, Serialize)]
pub struct CaseStmt {
    pub when_blocks: Vec<(Expression, Rc<StatementBlock>)>,
    pub else_block: Option<Rc<StatementBlock>>,
    pub span: Span,
    pub id: NodeId,
}

impl CaseStmt {
    pub fn new(
        when_blocks: Vec<(Expression, Rc<StatementBlock>)>,
        else_block: Option<Rc<StatementBlock>>,
        span: Span,
    ) -> Statement {
        Statement::Case(Rc::new(CaseStmt {
            when_blocks,
            else_block,
            span,
            id: NodeId::fresh(),
        }))
    }
}

/// `case expr` with value lists: each `when` value is compared against the
/// scrutinee, via builtin equality or a user `==` overload.
#[derive(Clone, Debug, Serialize)]
pub struct SwitchStmt {
    pub target: Expression,
    pub when_blocks: Vec<(Vec<Expression>, Rc<StatementBlock>)>,
    pub else_block: Option<Rc<StatementBlock>>,
    pub span: Span,
    pub id: NodeId,
    /// Resolved `==` overloads, one per non-builtin `when` value, in
    /// visiting order.
    #[serde(skip)]
    pub eq_callees: RefCell<Vec<super::WeakFuncScope>>,
}

impl SwitchStmt {
    pub fn new(
        target: Expression,
        when_blocks: Vec<(Vec<Expression>, Rc<StatementBlock>)>,
        else_block: Option<Rc<StatementBlock>>,
        span: Span,
    ) -> Statement {
        Statement::Switch(Rc::new(SwitchStmt {
            target,
            when_blocks,
            else_block,
            span,
            id: NodeId::fresh(),
            eq_callees: RefCell::new(vec![]),
        }))
    }
}

/// `for x in range`. Iterating a non-array resolves the range class's
/// `size`/`[]` methods once and caches them here for the emitter.
#[derive(Clone, Debug, Serialize)]
pub struct ForStmt {
    pub iter_vars: Vec<Rc<Parameter>>,
    pub range_expr: Expression,
    pub body: Rc<StatementBlock>,
    pub span: Span,
    pub id: NodeId,
    #[serde(skip)]
    pub size_callee: CalleeSlot,
    #[serde(skip)]
    pub index_callee: CalleeSlot,
}

impl ForStmt {
    pub fn new(
        iter_vars: Vec<Rc<Parameter>>,
        range_expr: Expression,
        body: Rc<StatementBlock>,
        span: Span,
    ) -> Statement {
        Statement::For(Rc::new(ForStmt {
            iter_vars,
            range_expr,
            body,
            span,
            id: NodeId::fresh(),
            size_callee: CalleeSlot::default(),
            index_callee: CalleeSlot::default(),
        }))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WhileStmt {
    pub condition: Expression,
    pub body: Rc<StatementBlock>,
    pub span: Span,
    pub id: NodeId,
}

impl WhileStmt {
    pub fn new(condition: Expression, body: Rc<StatementBlock>, span: Span) -> Statement {
        Statement::While(Rc::new(WhileStmt {
            condition,
            body,
            span,
            id: NodeId::fresh(),
        }))
    }
}

/// `ret`, `ret e` or `ret a, b`. The type slot holds the type the
/// statement contributes to return type deduction.
#[derive(Clone, Debug, Serialize)]
pub struct ReturnStmt {
    pub exprs: Vec<Expression>,
    pub span: Span,
    pub id: NodeId,
    #[serde(skip)]
    pub ty: TypeSlot,
}

impl ReturnStmt {
    pub fn new(exprs: Vec<Expression>, span: Span) -> Statement {
        Statement::Return(Rc::new(ReturnStmt {
            exprs,
            span,
            id: NodeId::fresh(),
            ty: empty_type_slot(),
        }))
    }
}

/// `stmt if cond` / `stmt unless cond`.
#[derive(Clone, Debug, Serialize)]
pub struct PostfixIf {
    pub body: Box<Statement>,
    pub kind: IfKind,
    pub condition: Expression,
    pub span: Span,
    pub id: NodeId,
}

impl PostfixIf {
    pub fn new(body: Statement, kind: IfKind, condition: Expression, span: Span) -> Statement {
        Statement::PostfixIf(Rc::new(PostfixIf {
            body: Box::new(body),
            kind,
            condition,
            span,
            id: NodeId::fresh(),
        }))
    }
}

/// `let a := e1, b := e2 in stmt`; the bindings live only inside `stmt`.
#[derive(Clone, Debug, Serialize)]
pub struct LetStmt {
    pub inits: Vec<Rc<InitializeStmt>>,
    pub child: Box<Statement>,
    pub span: Span,
    pub id: NodeId,
    #[serde(skip)]
    pub scope: LocalScopeSlot,
}

impl LetStmt {
    pub fn new(inits: Vec<Rc<InitializeStmt>>, child: Statement, span: Span) -> Statement {
        Statement::Let(Rc::new(LetStmt {
            inits,
            child: Box::new(child),
            span,
            id: NodeId::fresh(),
            scope: LocalScopeSlot::default(),
        }))
    }
}

/// `do ... end`, a block statement introducing its own scope.
#[derive(Clone, Debug, Serialize)]
pub struct DoStmt {
    pub body: Rc<StatementBlock>,
    pub span: Span,
    pub id: NodeId,
}

impl DoStmt {
    pub fn new(body: Rc<StatementBlock>, span: Span) -> Statement {
        Statement::Do(Rc::new(DoStmt {
            body,
            span,
            id: NodeId::fresh(),
        }))
    }
}

/// Formal parameter. `self` receivers and `@x` initializer parameters are
/// ordinary parameters whose names carry the meaning; the forward pass
/// types them accordingly.
#[derive(Clone, Debug, Serialize)]
pub struct Parameter {
    pub name: String,
    pub is_var: bool,
    pub type_name: Option<TypeName>,
    pub span: Span,
    pub id: NodeId,
    #[serde(skip)]
    pub ty: TypeSlot,
    #[serde(skip)]
    pub symbol: SymbolSlot,
}

impl Parameter {
    pub fn new(
        name: impl ToString,
        is_var: bool,
        type_name: Option<TypeName>,
        span: Span,
    ) -> Rc<Parameter> {
        Rc::new(Parameter {
            name: name.to_string(),
            is_var,
            type_name,
            span,
            id: NodeId::fresh(),
            ty: empty_type_slot(),
            symbol: SymbolSlot::default(),
        })
    }

    /// The method receiver.
    pub fn self_param(span: Span) -> Rc<Parameter> {
        Parameter::new("self", false, None, span)
    }

    /// `@x` on a constructor initializes the instance variable `x`.
    pub fn is_instance_var_init(&self) -> bool {
        self.name.starts_with('@')
    }

    pub fn instance_var_name(&self) -> &str {
        self.name.trim_start_matches('@')
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FuncKind {
    Func,
    /// `proc` never returns a value.
    Proc,
}

/// A function definition: global, member, constructor or lambda. The name
/// is interior-mutable because lambdas are named by the forward pass.
#[derive(Clone, Debug, Serialize)]
pub struct FunctionDefinition {
    pub kind: FuncKind,
    pub name: RefCell<String>,
    pub params: Vec<Rc<Parameter>>,
    pub return_type: Option<TypeName>,
    pub body: Rc<StatementBlock>,
    pub accessibility: Accessibility,
    pub span: Span,
    pub id: NodeId,
    #[serde(skip)]
    pub scope: CalleeSlot,
    #[serde(skip)]
    pub ret_type: RefCell<Option<crate::typechecker::types::Type>>,
    /// Instantiations derived from this template, append-only.
    #[serde(skip)]
    pub instantiated: RefCell<Vec<Rc<FunctionDefinition>>>,
}

impl FunctionDefinition {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: FuncKind,
        name: impl ToString,
        params: Vec<Rc<Parameter>>,
        return_type: Option<TypeName>,
        body: Rc<StatementBlock>,
        accessibility: Accessibility,
        span: Span,
    ) -> Rc<FunctionDefinition> {
        Rc::new(FunctionDefinition {
            kind,
            name: RefCell::new(name.to_string()),
            params,
            return_type,
            body,
            accessibility,
            span,
            id: NodeId::fresh(),
            scope: CalleeSlot::default(),
            ret_type: RefCell::new(None),
            instantiated: RefCell::new(vec![]),
        })
    }

    pub fn func(
        name: impl ToString,
        params: Vec<Rc<Parameter>>,
        return_type: Option<TypeName>,
        body: Rc<StatementBlock>,
        span: Span,
    ) -> Rc<FunctionDefinition> {
        FunctionDefinition::new(
            FuncKind::Func,
            name,
            params,
            return_type,
            body,
            Accessibility::Public,
            span,
        )
    }

    pub fn proc(
        name: impl ToString,
        params: Vec<Rc<Parameter>>,
        body: Rc<StatementBlock>,
        span: Span,
    ) -> Rc<FunctionDefinition> {
        FunctionDefinition::new(
            FuncKind::Proc,
            name,
            params,
            None,
            body,
            Accessibility::Public,
            span,
        )
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn is_ctor(&self) -> bool {
        *self.name.borrow() == "init"
    }

    /// Query functions (`even?`) must return bool.
    pub fn is_query(&self) -> bool {
        self.name.borrow().contains('?')
    }

    pub fn is_public(&self) -> bool {
        self.accessibility == Accessibility::Public
    }
}

/// A class definition. Member functions are interior-mutable because a
/// default constructor is synthesized when none is declared.
#[derive(Clone, Debug, Serialize)]
pub struct ClassDefinition {
    pub name: String,
    pub instance_vars: Vec<Rc<VariableDecl>>,
    pub member_funcs: RefCell<Vec<Rc<FunctionDefinition>>>,
    pub span: Span,
    pub id: NodeId,
    #[serde(skip)]
    pub scope: ClassSlot,
    /// Instantiations derived from this template, append-only.
    #[serde(skip)]
    pub instantiated: RefCell<Vec<Rc<ClassDefinition>>>,
}

impl ClassDefinition {
    pub fn new(
        name: impl ToString,
        instance_vars: Vec<Rc<VariableDecl>>,
        member_funcs: Vec<Rc<FunctionDefinition>>,
        span: Span,
    ) -> Rc<ClassDefinition> {
        Rc::new(ClassDefinition {
            name: name.to_string(),
            instance_vars,
            member_funcs: RefCell::new(member_funcs),
            span,
            id: NodeId::fresh(),
            scope: ClassSlot::default(),
            instantiated: RefCell::new(vec![]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Parameter, VariableDecl};
    use crate::span::Span;

    #[test]
    fn test_instance_var_marker() {
        let decl = VariableDecl::new(false, "@size", None, Span::default());
        assert!(decl.is_instance_var());
        assert_eq!(decl.instance_var_name(), "size");

        let plain = VariableDecl::new(false, "size", None, Span::default());
        assert!(!plain.is_instance_var());
    }

    #[test]
    fn test_ctor_param_marker() {
        let param = Parameter::new("@buf", false, None, Span::default());
        assert!(param.is_instance_var_init());
        assert_eq!(param.instance_var_name(), "buf");
    }
}
