//! A small recursive walker over statements and expressions.
//!
//! Checkers that only care about a handful of node kinds (return
//! gathering, self-access discipline, const inference, capture discovery)
//! implement [`Visitor`] and override the cases they need; the default
//! implementation recurses into children, including nested lambda bodies.

use super::{Expression, Statement, StatementBlock};

pub trait Visitor {
    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr);
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &StatementBlock) {
    let statements = block.statements.borrow().clone();
    for stmt in &statements {
        visitor.visit_statement(stmt);
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Expression(e) => visitor.visit_expression(e),
        Statement::Assignment(a) => {
            for lhs in &a.assignees {
                visitor.visit_expression(lhs);
            }
            for rhs in &a.rhs_exprs {
                visitor.visit_expression(rhs);
            }
        }
        Statement::Initialize(init) => {
            if let Some(exprs) = init.rhs_exprs.borrow().as_ref() {
                for e in exprs {
                    visitor.visit_expression(e);
                }
            }
        }
        Statement::If(i) => {
            visitor.visit_expression(&i.condition);
            walk_block(visitor, &i.then_block);
            for (cond, block) in &i.elseif_blocks {
                visitor.visit_expression(cond);
                walk_block(visitor, block);
            }
            if let Some(block) = &i.else_block {
                walk_block(visitor, block);
            }
        }
        Statement::Case(c) => {
            for (guard, block) in &c.when_blocks {
                visitor.visit_expression(guard);
                walk_block(visitor, block);
            }
            if let Some(block) = &c.else_block {
                walk_block(visitor, block);
            }
        }
        Statement::Switch(s) => {
            visitor.visit_expression(&s.target);
            for (values, block) in &s.when_blocks {
                for value in values {
                    visitor.visit_expression(value);
                }
                walk_block(visitor, block);
            }
            if let Some(block) = &s.else_block {
                walk_block(visitor, block);
            }
        }
        Statement::For(f) => {
            visitor.visit_expression(&f.range_expr);
            walk_block(visitor, &f.body);
        }
        Statement::While(w) => {
            visitor.visit_expression(&w.condition);
            walk_block(visitor, &w.body);
        }
        Statement::Return(r) => {
            for e in &r.exprs {
                visitor.visit_expression(e);
            }
        }
        Statement::PostfixIf(p) => {
            visitor.visit_statement(&p.body);
            visitor.visit_expression(&p.condition);
        }
        Statement::Let(l) => {
            for init in &l.inits {
                if let Some(exprs) = init.rhs_exprs.borrow().as_ref() {
                    for e in exprs {
                        visitor.visit_expression(e);
                    }
                }
            }
            visitor.visit_statement(&l.child);
        }
        Statement::Do(d) => walk_block(visitor, &d.body),
        Statement::Block(b) => walk_block(visitor, b),
        Statement::Function(f) => walk_block(visitor, &f.body),
        Statement::Class(c) => {
            for f in c.member_funcs.borrow().iter() {
                walk_block(visitor, &f.body);
            }
        }
    }
}

pub fn walk_expression<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expression) {
    match expr {
        Expression::Literal(_) | Expression::Symbol(_) | Expression::VarRef(_) => {}
        Expression::Array(a) => {
            for e in &a.elements {
                visitor.visit_expression(e);
            }
        }
        Expression::Tuple(t) => {
            for e in &t.elements {
                visitor.visit_expression(e);
            }
        }
        Expression::Dict(d) => {
            for (k, v) in &d.entries {
                visitor.visit_expression(k);
                visitor.visit_expression(v);
            }
        }
        Expression::Lambda(l) => walk_block(visitor, &l.def.body),
        Expression::Unary(u) => visitor.visit_expression(&u.operand),
        Expression::Binary(b) => {
            visitor.visit_expression(&b.lhs);
            visitor.visit_expression(&b.rhs);
        }
        Expression::Cast(c) => visitor.visit_expression(&c.expr),
        Expression::Typed(t) => visitor.visit_expression(&t.expr),
        Expression::If(i) => {
            visitor.visit_expression(&i.condition);
            visitor.visit_expression(&i.then_expr);
            visitor.visit_expression(&i.else_expr);
        }
        Expression::Index(ix) => {
            visitor.visit_expression(&ix.child);
            visitor.visit_expression(&ix.index);
        }
        Expression::Invocation(inv) => {
            visitor.visit_expression(&inv.child.borrow().clone());
            let args = inv.args.borrow().clone();
            for arg in &args {
                visitor.visit_expression(arg);
            }
        }
        Expression::Ufcs(u) => visitor.visit_expression(&u.child),
        Expression::Construct(c) => {
            for arg in &c.args {
                visitor.visit_expression(arg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{walk_statement, Visitor};
    use crate::ast::{Expression, Statement, StatementBlock};
    use crate::span::Span;

    struct VarCounter {
        count: usize,
    }

    impl Visitor for VarCounter {
        fn visit_expression(&mut self, expr: &Expression) {
            if matches!(expr, Expression::VarRef(_)) {
                self.count += 1;
            }
            super::walk_expression(self, expr);
        }
    }

    #[test]
    fn test_walk_finds_nested_var_refs() {
        let body = StatementBlock::new(
            vec![Statement::Expression(Expression::invocation(
                Expression::var_ref("f", Span::default()),
                vec![Expression::var_ref("x", Span::default())],
                Span::default(),
            ))],
            Span::default(),
        );
        let mut counter = VarCounter { count: 0 };
        walk_statement(&mut counter, &Statement::Block(body));
        assert_eq!(counter.count, 2);
    }
}
