//! Detects interpolations in heredoc literals that are not brace-wrapped.
//!
//! Compiled templates embed their output in heredoc strings, and the
//! template compiler is expected to wrap every interpolated expression in
//! explicit `{...}` delimiters. An unwrapped interpolation means the
//! compiler mis-scoped the expression, so the rendered output may differ
//! from what the template author wrote.

use tracing::error;

use crate::ast::{Ast, NodeRef, Visit};

/// Node kinds that make up the plain text of a heredoc literal.
fn is_string_part(kind: &str) -> bool {
    matches!(
        kind,
        "heredoc_body" | "heredoc_start" | "heredoc_end" | "string_content" | "escape_sequence"
    )
}

/// State machine over the traversal events.
///
/// Inside a heredoc, any node that is not a plain string part is an
/// interpolated sub-expression. A brace-wrapped interpolation has exactly
/// one token (the opening delimiter) between the previous node's first
/// token and its own, so a start-token gap other than 2 means the braces
/// are missing.
struct BraceScanner {
    in_heredoc: bool,
    last_token: usize,
    /// Ids of interpolation nodes we descended into, for symmetric state
    /// restoration on leave.
    heredoc_children: Vec<usize>,
    violations: Vec<String>,
}

impl BraceScanner {
    fn new() -> Self {
        Self {
            in_heredoc: false,
            last_token: 0,
            heredoc_children: Vec::new(),
            violations: Vec::new(),
        }
    }
}

impl Visit for BraceScanner {
    fn enter(&mut self, node: &NodeRef<'_>) {
        if node.kind() == "heredoc" {
            self.in_heredoc = true;
        } else if self.in_heredoc && !is_string_part(node.kind()) {
            self.in_heredoc = false;
            self.heredoc_children.push(node.id);
            if node.start_token != self.last_token + 2 {
                self.violations.push(node.text().to_string());
            }
        }
        self.last_token = node.start_token;
    }

    fn leave(&mut self, node: &NodeRef<'_>) {
        if node.kind() == "heredoc" {
            self.in_heredoc = false;
        } else if self.heredoc_children.last() == Some(&node.id) {
            self.heredoc_children.pop();
            // Back among the enclosing literal's remaining fragments.
            self.in_heredoc = true;
        }
    }
}

/// Scan compiled template code for unbraced interpolations. Violations are
/// the expressions' source text, in document order. An unparseable fragment
/// is logged and degrades to no findings.
///
/// The theme compiler emits a bare statement list, but a compiler seam may
/// also hand back a whole method; both shapes are accepted.
pub fn check(compiled: &str) -> Vec<String> {
    let ast = match Ast::parse_source(compiled).or_else(|_| Ast::parse_fragment(compiled)) {
        Ok(ast) => ast,
        Err(e) => {
            error!(error = %e, "failed to parse compiled template");
            return Vec::new();
        }
    };
    let mut scanner = BraceScanner::new();
    ast.walk(&mut scanner);
    scanner.violations
}
