//! Diagnostic rendering.
//!
//! Semantic errors are written to stderr as they are recorded:
//!
//! ```text
//! Error in <file>:<line>:<col>
//!   <message>
//! ```
//!
//! The header is bold red when stderr is a terminal; `colored` handles
//! the TTY detection and `NO_COLOR`.

use colored::Colorize;

use crate::typechecker::error::{SemanticCheckFailure, TypeCheckError};

pub fn emit(err: &TypeCheckError) {
    let span = err.span();
    let header = format!("Error in {span}");
    eprintln!("{}", header.red().bold());
    for line in err.message().lines() {
        eprintln!("  {line}");
    }
    eprintln!();
}

/// Final summary once a pass has failed.
pub fn emit_failure(failure: &SemanticCheckFailure) {
    eprintln!("{}", failure.to_string().red().bold());
}

/// Abort on an impossible state, pointing at the compiler source.
#[macro_export]
macro_rules! internal_compiler_error {
    ($($arg:tt)*) => {
        panic!(
            "internal compiler error at {}:{}: {}",
            file!(),
            line!(),
            format!($($arg)*)
        )
    };
}
