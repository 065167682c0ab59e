//! Source positions as delivered by the external parser.
//!
//! Every AST node carries a [`Span`] naming the file it came from and the
//! line/column/length of the token range that produced it. The analyzer
//! never opens source files itself; the span is only threaded into
//! diagnostics.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub length: usize,
}

impl Span {
    pub fn new(file: impl ToString, line: usize, col: usize, length: usize) -> Span {
        Span {
            file: file.to_string(),
            line,
            col,
            length,
        }
    }

    /// The position diagnostics fall back to when no node is available,
    /// e.g. "entry point is missing" errors.
    pub fn start_of_file(file: impl ToString) -> Span {
        Span::new(file, 1, 1, 0)
    }

    /// Render a message anchored at this span the way it is written to
    /// stderr (without any coloring).
    pub fn to_string(&self, msg: impl Display) -> String {
        format!("Error in {}:{}:{}\n  {}\n", self.file, self.line, self.col, msg)
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::Span;

    #[test]
    fn test_render_with_message() {
        let span = Span::new("main.dcs", 3, 7, 4);
        assert_eq!(
            span.to_string("Symbol 'foo' is not found"),
            "Error in main.dcs:3:7\n  Symbol 'foo' is not found\n"
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Span::new("a.dcs", 1, 2, 0)), "a.dcs:1:2");
    }

    #[test]
    fn test_start_of_file() {
        let span = Span::start_of_file("m.dcs");
        assert_eq!((span.line, span.col, span.length), (1, 1, 0));
    }
}
