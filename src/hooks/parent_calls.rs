//! Locates calls from hook code into its base implementation.

use tracing::error;

use crate::ast::{Ast, NodeRef, Visit};

/// A `parent::method()` call site, with a file-absolute line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentCall {
    pub method: String,
    pub line: usize,
}

/// Visitor that accumulates parent-call sites.
///
/// The scanner operates on a method body extracted from its file, so it
/// carries a fixed offset mapping fragment lines back to file lines.
pub struct ParentCallScanner {
    offset: usize,
    calls: Vec<ParentCall>,
}

impl ParentCallScanner {
    /// `first_line` is the method's first line in its enclosing file.
    pub fn new(first_line: usize) -> Self {
        Self {
            offset: first_line.saturating_sub(1),
            calls: Vec::new(),
        }
    }

    pub fn into_calls(self) -> Vec<ParentCall> {
        self.calls
    }
}

impl Visit for ParentCallScanner {
    fn enter(&mut self, node: &NodeRef<'_>) {
        if node.kind() != "scoped_call_expression" {
            return;
        }
        // Only literal `parent::` counts, not arbitrary class names, and the
        // method name must be a plain identifier to be resolvable.
        if node.field_kind("scope") != Some("relative_scope")
            || node.field_text("scope") != Some("parent")
        {
            return;
        }
        if node.field_kind("name") != Some("name") {
            return;
        }
        if let Some(method) = node.field_text("name") {
            self.calls.push(ParentCall {
                method: method.to_string(),
                line: self.offset + node.start_line() - 1,
            });
        }
    }
}

/// Parse a method body and collect every call into the base implementation.
/// An unparseable body is logged and yields no calls.
pub fn find_parent_calls(body: &str, first_line: usize) -> Vec<ParentCall> {
    let ast = match Ast::parse_fragment(body) {
        Ok(ast) => ast,
        Err(e) => {
            error!(error = %e, "failed to parse method body");
            return Vec::new();
        }
    };
    let mut scanner = ParentCallScanner::new(first_line);
    ast.walk(&mut scanner);
    scanner.into_calls()
}
