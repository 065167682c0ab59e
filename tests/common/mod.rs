//! Builders for the programs the integration tests analyze.
//!
//! The parser lives outside this crate, so tests construct the same AST
//! it would deliver, through the public node constructors. Lines are
//! threaded through so diagnostics and lambda names stay distinct.

#![allow(dead_code)]

use std::rc::Rc;

use dachs_lang::ast::*;
use dachs_lang::importer::NoImports;
use dachs_lang::span::Span;
use dachs_lang::typechecker::{check, CheckError, SemanticContext, TypeCheckError};

pub fn sp(line: usize, col: usize) -> Span {
    Span::new("test.dcs", line, col, 1)
}

pub fn analyze(program: &Program) -> Result<SemanticContext, CheckError> {
    let _ = simple_logger::SimpleLogger::new().init();
    check(program, &mut NoImports)
}

/// The semantic errors of a program expected to be rejected.
pub fn expect_errors(program: &Program) -> Vec<TypeCheckError> {
    match analyze(program) {
        Ok(_) => panic!("analysis unexpectedly succeeded"),
        Err(CheckError::Semantic(failure)) => failure.errors,
        Err(CheckError::Parse(err)) => panic!("unexpected parse error: {err}"),
    }
}

pub fn program(definitions: Vec<Definition>) -> Program {
    Program::new(definitions)
}

pub fn func(def: Rc<FunctionDefinition>) -> Definition {
    Definition::Function(def)
}

pub fn class(def: Rc<ClassDefinition>) -> Definition {
    Definition::Class(def)
}

pub fn block(statements: Vec<Statement>, line: usize) -> Rc<StatementBlock> {
    StatementBlock::new(statements, sp(line, 1))
}

pub fn func_def(
    name: &str,
    params: Vec<Rc<Parameter>>,
    statements: Vec<Statement>,
    line: usize,
) -> Rc<FunctionDefinition> {
    FunctionDefinition::func(name, params, None, block(statements, line), sp(line, 1))
}

pub fn func_def_ret(
    name: &str,
    params: Vec<Rc<Parameter>>,
    ret: &str,
    statements: Vec<Statement>,
    line: usize,
) -> Rc<FunctionDefinition> {
    FunctionDefinition::func(
        name,
        params,
        Some(TypeName::primary(ret, sp(line, 1))),
        block(statements, line),
        sp(line, 1),
    )
}

pub fn main_fn(statements: Vec<Statement>, line: usize) -> Definition {
    func(func_def("main", vec![], statements, line))
}

/// Parameter with an optional primary type annotation.
pub fn param(name: &str, ty: Option<&str>, line: usize) -> Rc<Parameter> {
    Parameter::new(
        name,
        false,
        ty.map(|t| TypeName::primary(t, sp(line, 1))),
        sp(line, 1),
    )
}

pub fn int(value: i64, line: usize) -> Expression {
    Expression::int(value, sp(line, 5))
}

pub fn uint(value: u64, line: usize) -> Expression {
    Expression::uint(value, sp(line, 5))
}

pub fn float(value: f64, line: usize) -> Expression {
    Expression::float(value, sp(line, 5))
}

pub fn boolean(value: bool, line: usize) -> Expression {
    Expression::bool_lit(value, sp(line, 5))
}

pub fn string(value: &str, line: usize) -> Expression {
    Expression::string(value, sp(line, 5))
}

pub fn var(name: &str, line: usize) -> Expression {
    Expression::var_ref(name, sp(line, 5))
}

/// `name(args...)`
pub fn call(name: &str, args: Vec<Expression>, line: usize) -> Expression {
    Expression::invocation(Expression::var_ref(name, sp(line, 3)), args, sp(line, 3))
}

pub fn call_stmt(name: &str, args: Vec<Expression>, line: usize) -> Statement {
    Statement::Expression(call(name, args, line))
}

/// `recv.name(args...)`
pub fn method_call(recv: Expression, name: &str, args: Vec<Expression>, line: usize) -> Expression {
    Expression::ufcs_invocation(recv, name, args, sp(line, 3))
}

/// `recv.name`
pub fn member(recv: Expression, name: &str, line: usize) -> Expression {
    Expression::ufcs(recv, name, sp(line, 3))
}

pub fn binary(op: BinaryOperator, lhs: Expression, rhs: Expression, line: usize) -> Expression {
    Expression::binary(op, lhs, rhs, sp(line, 4))
}

pub fn ret(exprs: Vec<Expression>, line: usize) -> Statement {
    ReturnStmt::new(exprs, sp(line, 3))
}

/// `name := expr`
pub fn init(name: &str, expr: Expression, line: usize) -> Statement {
    Statement::Initialize(InitializeStmt::new(
        vec![VariableDecl::new(false, name, None, sp(line, 1))],
        Some(vec![expr]),
        sp(line, 1),
    ))
}

/// `var name := expr`
pub fn init_var(name: &str, expr: Expression, line: usize) -> Statement {
    Statement::Initialize(InitializeStmt::new(
        vec![VariableDecl::new(true, name, None, sp(line, 1))],
        Some(vec![expr]),
        sp(line, 1),
    ))
}

/// `a, b := expr`
pub fn init_multi(names: Vec<&str>, exprs: Vec<Expression>, line: usize) -> Statement {
    Statement::Initialize(InitializeStmt::new(
        names
            .into_iter()
            .map(|n| VariableDecl::new(false, n, None, sp(line, 1)))
            .collect(),
        Some(exprs),
        sp(line, 1),
    ))
}

/// `lhs = rhs`
pub fn assign(lhs: Expression, rhs: Expression, line: usize) -> Statement {
    AssignmentStmt::new(vec![lhs], vec![rhs], sp(line, 1))
}

/// `let <bindings> in stmt`
pub fn let_stmt(bindings: Vec<(&str, Expression)>, child: Statement, line: usize) -> Statement {
    let inits = bindings
        .into_iter()
        .map(|(name, expr)| {
            InitializeStmt::new(
                vec![VariableDecl::new(false, name, None, sp(line, 1))],
                Some(vec![expr]),
                sp(line, 1),
            )
        })
        .collect();
    LetStmt::new(inits, child, sp(line, 1))
}

/// `case expr; when v, ... ; else ...` (value dispatch).
pub fn switch(
    target: Expression,
    whens: Vec<(Vec<Expression>, Vec<Statement>)>,
    else_stmts: Option<Vec<Statement>>,
    line: usize,
) -> Statement {
    SwitchStmt::new(
        target,
        whens
            .into_iter()
            .map(|(values, stmts)| (values, block(stmts, line)))
            .collect(),
        else_stmts.map(|stmts| block(stmts, line)),
        sp(line, 1),
    )
}

/// Instance variable declaration for a class; a leading `-` makes it
/// private, following the surface syntax.
pub fn instance_var(name: &str, ty: Option<&str>, line: usize) -> Rc<VariableDecl> {
    let type_name = ty.map(|t| TypeName::primary(t, sp(line, 1)));
    match name.strip_prefix('-') {
        Some(name) => VariableDecl::private(false, name, type_name, sp(line, 1)),
        None => VariableDecl::new(false, name, type_name, sp(line, 1)),
    }
}

/// `init(@a, @b, ...)` with an optional body.
pub fn ctor(field_params: Vec<&str>, statements: Vec<Statement>, line: usize) -> Rc<FunctionDefinition> {
    let mut params = vec![Parameter::self_param(sp(line, 1))];
    for name in field_params {
        params.push(Parameter::new(format!("@{name}"), false, None, sp(line, 2)));
    }
    FunctionDefinition::func("init", params, None, block(statements, line), sp(line, 1))
}

/// Member function; the receiver parameter is added up front.
pub fn method(
    name: &str,
    extra_params: Vec<Rc<Parameter>>,
    statements: Vec<Statement>,
    line: usize,
) -> Rc<FunctionDefinition> {
    let mut params = vec![Parameter::self_param(sp(line, 1))];
    params.extend(extra_params);
    func_def(name, params, statements, line)
}

pub fn private_method(
    name: &str,
    extra_params: Vec<Rc<Parameter>>,
    statements: Vec<Statement>,
    line: usize,
) -> Rc<FunctionDefinition> {
    let mut params = vec![Parameter::self_param(sp(line, 1))];
    params.extend(extra_params);
    FunctionDefinition::new(
        FuncKind::Func,
        name,
        params,
        None,
        block(statements, line),
        Accessibility::Private,
        sp(line, 1),
    )
}

pub fn class_def(
    name: &str,
    vars: Vec<Rc<VariableDecl>>,
    members: Vec<Rc<FunctionDefinition>>,
    line: usize,
) -> Rc<ClassDefinition> {
    ClassDefinition::new(name, vars, members, sp(line, 1))
}

/// `new Name{args...}`
pub fn new_class(name: &str, args: Vec<Expression>, line: usize) -> Expression {
    Expression::construct(TypeName::primary(name, sp(line, 7)), args, sp(line, 3))
}

/// A lambda whose body is a single statement list; distinct lines keep
/// the generated names distinct.
pub fn lambda(
    params: Vec<Rc<Parameter>>,
    statements: Vec<Statement>,
    line: usize,
    col: usize,
) -> Expression {
    let span = Span::new("test.dcs", line, col, 10);
    let def = FunctionDefinition::func(
        "",
        params,
        None,
        StatementBlock::new(statements, span.clone()),
        span.clone(),
    );
    Expression::lambda(def, span)
}
