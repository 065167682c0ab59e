//! Contracts for the external collaborators of the semantic core.
//!
//! Parsing and module file discovery live outside this crate. The driver
//! wires a [`Parser`] and an [`Importer`] up and hands the analyzer a
//! merged [`Program`]; the analyzer only ever talks to these traits.

use std::error::Error;
use std::fmt::Display;

use crate::ast::{Definition, ImportDecl, Program};

/// Produced by the parser (or by the importer for a failing dependency).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
}

impl ParseError {
    pub fn new(line: usize, col: usize) -> ParseError {
        ParseError { line, col }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error generated at line:{}, col:{}",
            self.line, self.col
        )
    }
}

impl Error for ParseError {}

/// The source-text front end.
pub trait Parser {
    fn parse(&mut self, source: &str, file_name: &str) -> Result<Program, ParseError>;

    fn check_syntax(&mut self, source: &str) -> Result<(), ParseError>;
}

/// Resolves `import a.b.c` against the search list (system library, user
/// supplied import directories, the source's own directory), parses the
/// file and yields its declarations. Must be idempotent on paths already
/// imported: a repeated import yields no new declarations.
pub trait Importer {
    fn import(&mut self, decl: &ImportDecl) -> Result<Vec<Definition>, ParseError>;
}

/// Importer for programs without imports; any import is a missing-file
/// error.
#[derive(Debug, Default)]
pub struct NoImports;

impl Importer for NoImports {
    fn import(&mut self, decl: &ImportDecl) -> Result<Vec<Definition>, ParseError> {
        Err(ParseError::new(decl.span.line, decl.span.col))
    }
}

#[cfg(test)]
mod tests {
    use super::{Importer, NoImports, ParseError};
    use crate::ast::ImportDecl;
    use crate::span::Span;

    #[test]
    fn test_parse_error_message() {
        assert_eq!(
            ParseError::new(3, 9).to_string(),
            "Parse error generated at line:3, col:9"
        );
    }

    #[test]
    fn test_no_imports_rejects_everything() {
        let decl = ImportDecl::new(vec!["std".into(), "io".into()], Span::new("m.dcs", 1, 1, 9));
        assert!(NoImports.import(&decl).is_err());
    }
}
