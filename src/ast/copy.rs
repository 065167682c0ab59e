//! Structural deep copy for template instantiation.
//!
//! Copies allocate fresh node ids and leave every inference slot empty, so
//! an instantiation can be re-analyzed without disturbing the template it
//! came from. Spans are kept: diagnostics in instantiated code still point
//! at the template's source.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::*;

pub fn copy_function_definition(def: &FunctionDefinition) -> Rc<FunctionDefinition> {
    Rc::new(FunctionDefinition {
        kind: def.kind,
        name: RefCell::new(def.name()),
        params: def.params.iter().map(|p| copy_parameter(p)).collect(),
        return_type: def.return_type.as_ref().map(copy_type_name),
        body: copy_block(&def.body),
        accessibility: def.accessibility,
        span: def.span.clone(),
        id: NodeId::fresh(),
        scope: CalleeSlot::default(),
        ret_type: RefCell::new(None),
        instantiated: RefCell::new(vec![]),
    })
}

pub fn copy_class_definition(def: &ClassDefinition) -> Rc<ClassDefinition> {
    Rc::new(ClassDefinition {
        name: def.name.clone(),
        instance_vars: def.instance_vars.iter().map(|v| copy_variable_decl(v)).collect(),
        member_funcs: RefCell::new(
            def.member_funcs
                .borrow()
                .iter()
                .map(|f| copy_function_definition(f))
                .collect(),
        ),
        span: def.span.clone(),
        id: NodeId::fresh(),
        scope: ClassSlot::default(),
        instantiated: RefCell::new(vec![]),
    })
}

fn copy_parameter(param: &Parameter) -> Rc<Parameter> {
    Rc::new(Parameter {
        name: param.name.clone(),
        is_var: param.is_var,
        type_name: param.type_name.as_ref().map(copy_type_name),
        span: param.span.clone(),
        id: NodeId::fresh(),
        ty: empty_type_slot(),
        symbol: SymbolSlot::default(),
    })
}

fn copy_variable_decl(decl: &VariableDecl) -> Rc<VariableDecl> {
    Rc::new(VariableDecl {
        is_var: decl.is_var,
        name: decl.name.clone(),
        maybe_type: decl.maybe_type.as_ref().map(copy_type_name),
        accessibility: decl.accessibility,
        span: decl.span.clone(),
        id: NodeId::fresh(),
        symbol: SymbolSlot::default(),
    })
}

fn copy_block(block: &StatementBlock) -> Rc<StatementBlock> {
    Rc::new(StatementBlock {
        statements: RefCell::new(block.statements.borrow().iter().map(copy_statement).collect()),
        span: block.span.clone(),
        id: NodeId::fresh(),
        scope: LocalScopeSlot::default(),
    })
}

fn copy_initialize(init: &InitializeStmt) -> Rc<InitializeStmt> {
    Rc::new(InitializeStmt {
        var_decls: init.var_decls.iter().map(|d| copy_variable_decl(d)).collect(),
        rhs_exprs: RefCell::new(
            init.rhs_exprs
                .borrow()
                .as_ref()
                .map(|exprs| exprs.iter().map(copy_expression).collect()),
        ),
        span: init.span.clone(),
        id: NodeId::fresh(),
    })
}

fn copy_statement(stmt: &Statement) -> Statement {
    match stmt {
        Statement::Expression(e) => Statement::Expression(copy_expression(e)),
        Statement::Assignment(a) => Statement::Assignment(Rc::new(AssignmentStmt {
            assignees: a.assignees.iter().map(copy_expression).collect(),
            rhs_exprs: a.rhs_exprs.iter().map(copy_expression).collect(),
            span: a.span.clone(),
            id: NodeId::fresh(),
        })),
        Statement::Initialize(i) => Statement::Initialize(copy_initialize(i)),
        Statement::If(i) => Statement::If(Rc::new(IfStmt {
            kind: i.kind,
            condition: copy_expression(&i.condition),
            then_block: copy_block(&i.then_block),
            elseif_blocks: i
                .elseif_blocks
                .iter()
                .map(|(c, b)| (copy_expression(c), copy_block(b)))
                .collect(),
            else_block: i.else_block.as_ref().map(|b| copy_block(b)),
            span: i.span.clone(),
            id: NodeId::fresh(),
        })),
        Statement::Case(c) => Statement::Case(Rc::new(CaseStmt {
            when_blocks: c
                .when_blocks
                .iter()
                .map(|(g, b)| (copy_expression(g), copy_block(b)))
                .collect(),
            else_block: c.else_block.as_ref().map(|b| copy_block(b)),
            span: c.span.clone(),
            id: NodeId::fresh(),
        })),
        Statement::Switch(s) => Statement::Switch(Rc::new(SwitchStmt {
            target: copy_expression(&s.target),
            when_blocks: s
                .when_blocks
                .iter()
                .map(|(vs, b)| (vs.iter().map(copy_expression).collect(), copy_block(b)))
                .collect(),
            else_block: s.else_block.as_ref().map(|b| copy_block(b)),
            span: s.span.clone(),
            id: NodeId::fresh(),
            eq_callees: RefCell::new(vec![]),
        })),
        Statement::For(f) => Statement::For(Rc::new(ForStmt {
            iter_vars: f.iter_vars.iter().map(|p| copy_parameter(p)).collect(),
            range_expr: copy_expression(&f.range_expr),
            body: copy_block(&f.body),
            span: f.span.clone(),
            id: NodeId::fresh(),
            size_callee: CalleeSlot::default(),
            index_callee: CalleeSlot::default(),
        })),
        Statement::While(w) => Statement::While(Rc::new(WhileStmt {
            condition: copy_expression(&w.condition),
            body: copy_block(&w.body),
            span: w.span.clone(),
            id: NodeId::fresh(),
        })),
        Statement::Return(r) => Statement::Return(Rc::new(ReturnStmt {
            exprs: r.exprs.iter().map(copy_expression).collect(),
            span: r.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
        })),
        Statement::PostfixIf(p) => Statement::PostfixIf(Rc::new(PostfixIf {
            body: Box::new(copy_statement(&p.body)),
            kind: p.kind,
            condition: copy_expression(&p.condition),
            span: p.span.clone(),
            id: NodeId::fresh(),
        })),
        Statement::Let(l) => Statement::Let(Rc::new(LetStmt {
            inits: l.inits.iter().map(|i| copy_initialize(i)).collect(),
            child: Box::new(copy_statement(&l.child)),
            span: l.span.clone(),
            id: NodeId::fresh(),
            scope: LocalScopeSlot::default(),
        })),
        Statement::Do(d) => Statement::Do(Rc::new(DoStmt {
            body: copy_block(&d.body),
            span: d.span.clone(),
            id: NodeId::fresh(),
        })),
        Statement::Block(b) => Statement::Block(copy_block(b)),
        Statement::Function(f) => Statement::Function(copy_function_definition(f)),
        Statement::Class(c) => Statement::Class(copy_class_definition(c)),
    }
}

fn copy_type_name(name: &TypeName) -> TypeName {
    match name {
        TypeName::Primary(n) => TypeName::Primary(Rc::new(PrimaryTypeName {
            name: n.name.clone(),
            args: n.args.iter().map(copy_type_name).collect(),
            span: n.span.clone(),
            id: NodeId::fresh(),
        })),
        TypeName::Array(n) => TypeName::Array(Rc::new(ArrayTypeName {
            element: n.element.as_ref().map(copy_type_name),
            span: n.span.clone(),
            id: NodeId::fresh(),
        })),
        TypeName::Dict(n) => TypeName::Dict(Rc::new(DictTypeName {
            key: copy_type_name(&n.key),
            value: copy_type_name(&n.value),
            span: n.span.clone(),
            id: NodeId::fresh(),
        })),
        TypeName::Pointer(n) => TypeName::Pointer(Rc::new(PointerTypeName {
            pointee: n.pointee.as_ref().map(copy_type_name),
            span: n.span.clone(),
            id: NodeId::fresh(),
        })),
        TypeName::Tuple(n) => TypeName::Tuple(Rc::new(TupleTypeName {
            elements: n.elements.iter().map(copy_type_name).collect(),
            span: n.span.clone(),
            id: NodeId::fresh(),
        })),
        TypeName::Func(n) => TypeName::Func(Rc::new(FuncTypeName {
            params: n.params.iter().map(copy_type_name).collect(),
            ret: n.ret.as_ref().map(|r| Box::new(copy_type_name(r))),
            span: n.span.clone(),
            id: NodeId::fresh(),
        })),
        TypeName::Maybe(n) => TypeName::Maybe(Rc::new(MaybeTypeName {
            inner: copy_type_name(&n.inner),
            span: n.span.clone(),
            id: NodeId::fresh(),
        })),
        TypeName::Typeof(n) => TypeName::Typeof(Rc::new(TypeofTypeName {
            expr: copy_expression(&n.expr),
            span: n.span.clone(),
            id: NodeId::fresh(),
        })),
    }
}

fn copy_expression(expr: &Expression) -> Expression {
    match expr {
        Expression::Literal(l) => Expression::Literal(Rc::new(Literal {
            value: l.value.clone(),
            span: l.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
            constructed_class: ClassSlot::default(),
            callee_ctor: CalleeSlot::default(),
        })),
        Expression::Symbol(s) => Expression::Symbol(Rc::new(SymbolLiteral {
            name: s.name.clone(),
            span: s.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
        })),
        Expression::Array(a) => Expression::Array(Rc::new(ArrayLiteral {
            elements: a.elements.iter().map(copy_expression).collect(),
            span: a.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
            constructed_class: ClassSlot::default(),
            callee_ctor: CalleeSlot::default(),
        })),
        Expression::Tuple(t) => Expression::Tuple(Rc::new(TupleLiteral {
            elements: t.elements.iter().map(copy_expression).collect(),
            span: t.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
        })),
        Expression::Dict(d) => Expression::Dict(Rc::new(DictLiteral {
            entries: d
                .entries
                .iter()
                .map(|(k, v)| (copy_expression(k), copy_expression(v)))
                .collect(),
            span: d.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
        })),
        Expression::Lambda(l) => Expression::Lambda(Rc::new(LambdaExpr {
            def: copy_function_definition(&l.def),
            span: l.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
        })),
        Expression::VarRef(v) => Expression::VarRef(Rc::new(VarRef {
            name: v.name.clone(),
            span: v.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
            symbol: SymbolSlot::default(),
            is_lhs_of_assignment: Cell::new(false),
        })),
        Expression::Unary(u) => Expression::Unary(Rc::new(UnaryExpr {
            op: u.op,
            operand: copy_expression(&u.operand),
            span: u.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
            callee: CalleeSlot::default(),
        })),
        Expression::Binary(b) => Expression::Binary(Rc::new(BinaryExpr {
            op: b.op,
            lhs: copy_expression(&b.lhs),
            rhs: copy_expression(&b.rhs),
            span: b.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
            callee: CalleeSlot::default(),
        })),
        Expression::Cast(c) => Expression::Cast(Rc::new(CastExpr {
            expr: copy_expression(&c.expr),
            target: copy_type_name(&c.target),
            span: c.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
        })),
        Expression::Typed(t) => Expression::Typed(Rc::new(TypedExpr {
            expr: copy_expression(&t.expr),
            specified: copy_type_name(&t.specified),
            span: t.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
        })),
        Expression::If(i) => Expression::If(Rc::new(IfExpr {
            condition: copy_expression(&i.condition),
            then_expr: copy_expression(&i.then_expr),
            else_expr: copy_expression(&i.else_expr),
            span: i.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
        })),
        Expression::Index(ix) => Expression::Index(Rc::new(IndexAccess {
            child: copy_expression(&ix.child),
            index: copy_expression(&ix.index),
            span: ix.span.clone(),
            id: NodeId::fresh(),
            is_assign: Cell::new(false),
            ty: empty_type_slot(),
            callee: CalleeSlot::default(),
        })),
        Expression::Invocation(inv) => Expression::Invocation(Rc::new(FuncInvocation {
            child: RefCell::new(copy_expression(&inv.child.borrow())),
            args: RefCell::new(inv.args.borrow().iter().map(copy_expression).collect()),
            is_ufcs: inv.is_ufcs,
            span: inv.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
            callee: CalleeSlot::default(),
        })),
        Expression::Ufcs(u) => Expression::Ufcs(Rc::new(UfcsInvocation {
            child: copy_expression(&u.child),
            member_name: u.member_name.clone(),
            span: u.span.clone(),
            id: NodeId::fresh(),
            is_assign: Cell::new(false),
            is_instance_var_access: Cell::new(false),
            ty: empty_type_slot(),
            callee: CalleeSlot::default(),
        })),
        Expression::Construct(c) => Expression::Construct(Rc::new(ObjectConstruct {
            type_name: copy_type_name(&c.type_name),
            args: c.args.iter().map(copy_expression).collect(),
            span: c.span.clone(),
            id: NodeId::fresh(),
            ty: empty_type_slot(),
            constructed_class: ClassSlot::default(),
            callee_ctor: CalleeSlot::default(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn test_copy_gets_fresh_ids_and_empty_slots() {
        let body = StatementBlock::new(
            vec![Statement::Return(Rc::new(ReturnStmt {
                exprs: vec![Expression::int(1, Span::default())],
                span: Span::default(),
                id: NodeId::fresh(),
                ty: empty_type_slot(),
            }))],
            Span::default(),
        );
        let def = FunctionDefinition::func(
            "id",
            vec![Parameter::new("x", false, None, Span::default())],
            None,
            body,
            Span::default(),
        );

        let copied = copy_function_definition(&def);
        assert_ne!(copied.id, def.id);
        assert_ne!(copied.params[0].id, def.params[0].id);
        assert_eq!(copied.name(), "id");
        assert!(copied.params[0].ty.borrow().is_none());
        assert!(copied.instantiated.borrow().is_empty());
    }

    #[test]
    fn test_copy_does_not_share_nested_blocks() {
        let block = StatementBlock::new(vec![], Span::default());
        let def = FunctionDefinition::func("f", vec![], None, block.clone(), Span::default());
        let copied = copy_function_definition(&def);
        copied
            .body
            .statements
            .borrow_mut()
            .push(Statement::Expression(Expression::int(0, Span::default())));
        assert!(block.statements.borrow().is_empty());
    }
}
