//! The semantic core: scope construction, symbol resolution, type
//! inference with overload resolution, template instantiation, and lambda
//! capture resolution.
//!
//! Analysis runs in three strictly ordered passes over a merged
//! [`Program`]:
//!
//! 1. **Forward pass** ([`forward`]): one walk that creates the scope
//!    tree, attaches every declaration and records signatures, so forward
//!    references and overload sets exist before any body is analyzed.
//! 2. **Deep analysis** ([`expression`], [`statement`], [`call`],
//!    [`class`]): the recursive core. Assigns a type to every expression,
//!    rewrites literal sugar, resolves overloads, instantiates templates
//!    on demand and validates constructors. Callees may be analyzed
//!    before their call site returns; cycles are broken by recursive
//!    return-type deduction.
//! 3. **Lambda resolution** ([`lambda`]): discovers captures in analyzed
//!    lambda bodies and lifts the lambdas into the global function set.
//!
//! Each pass accumulates diagnostics and fails at its end when any were
//! recorded; a failing pass prevents later passes from running.

pub mod builtins;
pub mod call;
pub mod class;
pub mod const_check;
pub mod context;
pub mod error;
pub mod expression;
pub mod forward;
pub mod lambda;
pub mod scope;
pub mod statement;
pub mod types;

use std::error::Error;
use std::fmt::Display;

use log::debug;

use crate::ast::{Definition, Program};
use crate::importer::{Importer, ParseError};

pub use self::context::Context;
pub use self::error::{SemanticCheckFailure, TypeCheckError};
pub use self::lambda::{Capture, CaptureMap};
use self::scope::{FuncScopeRef, GlobalScopeRef};

pub type TypeResult<T> = Result<T, TypeCheckError>;

/// Everything code generation consumes: the scope tree (the global scope
/// owns all functions, including instantiations and lifted lambdas), the
/// per-lambda capture map and the constructor synthesized for `main`'s
/// command-line argument, when `main` takes one.
#[derive(Debug)]
pub struct SemanticContext {
    pub global: GlobalScopeRef,
    pub captures: CaptureMap,
    pub main_arg_ctor: Option<FuncScopeRef>,
}

/// Failure of the whole front half of the compiler: either a dependency
/// failed to parse while importing, or a pass diagnosed semantic errors.
#[derive(Clone, Debug, PartialEq)]
pub enum CheckError {
    Parse(ParseError),
    Semantic(SemanticCheckFailure),
}

impl Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckError::Parse(e) => e.fmt(f),
            CheckError::Semantic(e) => e.fmt(f),
        }
    }
}

impl Error for CheckError {}

impl From<ParseError> for CheckError {
    fn from(value: ParseError) -> Self {
        CheckError::Parse(value)
    }
}

impl From<SemanticCheckFailure> for CheckError {
    fn from(value: SemanticCheckFailure) -> Self {
        CheckError::Semantic(value)
    }
}

/// Run the full semantic analysis over a program.
pub fn check(
    program: &Program,
    importer: &mut dyn Importer,
) -> Result<SemanticContext, CheckError> {
    let mut ctx = Context::new();

    builtins::predeclare(&mut ctx);

    let mut definitions: Vec<Definition> = ctx.prelude.clone();
    for import in &program.imports {
        debug!("importing '{}'", import.dotted_path());
        definitions.extend(importer.import(import)?);
    }
    definitions.extend(program.definitions.iter().cloned());

    debug!("forward pass over {} definition(s)", definitions.len());
    forward::declare_definitions(&definitions, &mut ctx);
    finish_pass(&mut ctx, "forward symbol resolution")?;

    debug!("deep analysis");
    statement::check_definitions(&definitions, &mut ctx);
    class::analyze_main_func(&mut ctx);
    finish_pass(&mut ctx, "symbol resolution")?;

    debug!("lambda resolution");
    let captures = lambda::resolve_lambdas(&mut ctx);
    finish_pass(&mut ctx, "lambda resolution")?;

    Ok(SemanticContext {
        global: ctx.global.clone(),
        captures,
        main_arg_ctor: ctx.main_arg_ctor.clone(),
    })
}

fn finish_pass(ctx: &mut Context, pass: &'static str) -> Result<(), SemanticCheckFailure> {
    if ctx.error_count() == 0 {
        return Ok(());
    }
    let failure = SemanticCheckFailure::new(pass, ctx.take_errors());
    crate::diagnostics::emit_failure(&failure);
    Err(failure)
}
