//! Structural method signatures.
//!
//! These are plain value types populated once per lookup by a
//! [`provider::SignatureProvider`] and treated as immutable data afterwards.
//! They carry exactly the shape the compatibility checks need: visibility,
//! static-ness, return-type presence, and the ordered parameter list.

use std::collections::BTreeSet;

pub mod provider;
pub mod runtime;
pub mod static_php;

/// PHP method visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Recognized `@ips-lint` doc-comment pragmas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocTag {
    /// Exclude the method (or the whole hook, on the class) from all checks.
    Ignore,
    /// Suppress the parameter-rename check for this method.
    NoCheckRenames,
}

/// The set of pragmas found in one doc comment, parsed once per declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocTags(BTreeSet<DocTag>);

impl DocTags {
    /// Scan a doc comment for `@ips-lint` pragmas. Matching is
    /// case-insensitive, like the pragmas' historical free-text handling.
    pub fn parse(doc_comment: &str) -> Self {
        let lowered = doc_comment.to_lowercase();
        let mut tags = BTreeSet::new();
        if lowered.contains("@ips-lint ignore") {
            tags.insert(DocTag::Ignore);
        }
        if lowered.contains("@ips-lint no-check-renames") {
            tags.insert(DocTag::NoCheckRenames);
        }
        DocTags(tags)
    }

    pub fn contains(&self, tag: DocTag) -> bool {
        self.0.contains(&tag)
    }
}

/// One positional parameter of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub position: usize,
    /// Declared type, if any. Only presence takes part in compatibility
    /// checks; the name is used in messages.
    pub type_name: Option<String>,
    /// Whether the parameter can be omitted at the call site (it has a
    /// default value, or is variadic).
    pub optional: bool,
}

impl Parameter {
    pub fn has_type(&self) -> bool {
        self.type_name.is_some()
    }
}

/// The structural shape of one method, independent of its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    /// Declared return type, if any.
    pub return_type: Option<String>,
    pub parameters: Vec<Parameter>,
    pub doc_tags: DocTags,
    /// First and last line of the declaration in its source file, used to
    /// slice the method body back out for body-level scans.
    pub start_line: usize,
    pub end_line: usize,
}

impl MethodSignature {
    pub fn has_return_type(&self) -> bool {
        self.return_type.is_some()
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }
}

/// A declared class: its class-level pragmas and methods in source order.
#[derive(Debug, Clone, Default)]
pub struct ClassShape {
    pub doc_tags: DocTags,
    pub methods: Vec<MethodSignature>,
}
