//! Best-effort structural signature provider.
//!
//! This backend never executes any PHP. Hook declaration is a straight
//! structural parse of the hook source; class resolution reads the class's
//! file out of the host install, located through a lazily-built classmap
//! scan. It misses anything the host constructs dynamically, which is the
//! accepted trade-off for not having to boot the host runtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use tree_sitter::Node;
use walkdir::WalkDir;

use crate::ast::{Ast, AstError};

use super::provider::{DeclareError, ProviderError, SignatureProvider};
use super::{ClassShape, DocTags, MethodSignature, Parameter, Visibility};

static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*namespace\s+([\w\\]+)\s*;").unwrap());
static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:abstract\s+|final\s+)?class\s+(\w+)").unwrap());

/// Extract the shape of the first class declared in `source`.
pub fn signatures_from_source(source: &str) -> Result<ClassShape, DeclareError> {
    let ast = parse_for_declare(source)?;
    let class = find_class(ast.root(), source, None)
        .ok_or_else(|| DeclareError::Declaration("no class declaration in source".into()))?;
    Ok(shape_of_class(&ast, class))
}

fn parse_for_declare(source: &str) -> Result<Ast, DeclareError> {
    Ast::parse_source(source).map_err(|e| match e {
        AstError::Syntax { line } => DeclareError::Parse {
            message: format!("syntax error at line {line}"),
            line: Some(line),
        },
        other => DeclareError::Parse {
            message: other.to_string(),
            line: None,
        },
    })
}

/// First `class_declaration` in document order, optionally restricted to a
/// declared name (compared without the IPS underscore prefix).
fn find_class<'a>(root: Node<'a>, source: &str, wanted: Option<&str>) -> Option<Node<'a>> {
    let mut cursor = root.walk();
    let children: Vec<Node> = root.children(&mut cursor).collect();
    for child in children {
        match child.kind() {
            "class_declaration" => {
                let matches = match wanted {
                    None => true,
                    Some(w) => child
                        .child_by_field_name("name")
                        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
                        .map(|name| name.trim_start_matches('_').eq_ignore_ascii_case(w))
                        .unwrap_or(false),
                };
                if matches {
                    return Some(child);
                }
            }
            // Braced namespaces nest declarations one level down.
            "namespace_definition" => {
                if let Some(body) = child.child_by_field_name("body") {
                    if let Some(found) = find_class(body, source, wanted) {
                        return Some(found);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn shape_of_class(ast: &Ast, class: Node<'_>) -> ClassShape {
    let source = ast.source();
    let mut shape = ClassShape {
        doc_tags: doc_tags_of(class, source),
        methods: Vec::new(),
    };
    let Some(body) = class.child_by_field_name("body") else {
        return shape;
    };
    let mut cursor = body.walk();
    let members: Vec<Node> = body.children(&mut cursor).collect();
    for member in members {
        if member.kind() == "method_declaration" {
            if let Some(sig) = method_signature(member, source) {
                shape.methods.push(sig);
            }
        }
    }
    shape
}

/// Pragmas from the doc comment directly preceding a declaration.
fn doc_tags_of(node: Node<'_>, source: &str) -> DocTags {
    match node.prev_named_sibling() {
        Some(prev) if prev.kind() == "comment" => {
            DocTags::parse(prev.utf8_text(source.as_bytes()).unwrap_or(""))
        }
        _ => DocTags::default(),
    }
}

fn method_signature(method: Node<'_>, source: &str) -> Option<MethodSignature> {
    let name = method
        .child_by_field_name("name")?
        .utf8_text(source.as_bytes())
        .ok()?
        .to_string();

    let mut visibility = Visibility::Public;
    let mut is_static = false;
    let mut cursor = method.walk();
    let children: Vec<Node> = method.children(&mut cursor).collect();
    for child in &children {
        match child.kind() {
            "visibility_modifier" => {
                let text = child.utf8_text(source.as_bytes()).unwrap_or("");
                if let Some(v) = Visibility::parse(text) {
                    visibility = v;
                }
            }
            "static_modifier" => is_static = true,
            _ => {}
        }
    }

    let return_type = method
        .child_by_field_name("return_type")
        .map(|n| n.utf8_text(source.as_bytes()).unwrap_or("").to_string());

    let mut parameters = Vec::new();
    if let Some(list) = method.child_by_field_name("parameters") {
        let mut cursor = list.walk();
        let params: Vec<Node> = list.children(&mut cursor).collect();
        for param in params {
            match param.kind() {
                "simple_parameter" | "property_promotion_parameter" => {
                    parameters.push(parameter(param, parameters.len(), source, false));
                }
                "variadic_parameter" => {
                    parameters.push(parameter(param, parameters.len(), source, true));
                }
                _ => {}
            }
        }
    }

    Some(MethodSignature {
        name,
        visibility,
        is_static,
        return_type,
        parameters,
        doc_tags: doc_tags_of(method, source),
        start_line: method.start_position().row + 1,
        end_line: method.end_position().row + 1,
    })
}

fn parameter(node: Node<'_>, position: usize, source: &str, variadic: bool) -> Parameter {
    let name = node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .unwrap_or("")
        .trim_start_matches('$')
        .to_string();
    let type_name = node
        .child_by_field_name("type")
        .map(|n| n.utf8_text(source.as_bytes()).unwrap_or("").to_string());
    let optional = variadic || node.child_by_field_name("default_value").is_some();
    Parameter {
        name,
        position,
        type_name,
        optional,
    }
}

/// Maps lowercased qualified class names to the files declaring them.
///
/// IPS declares its classes with a leading underscore (`class _Theme` in
/// `namespace IPS`, loadable as `\IPS\Theme`), so the underscore is stripped
/// when building keys.
#[derive(Debug, Default)]
pub struct ClassMap {
    classes: HashMap<String, PathBuf>,
}

impl ClassMap {
    pub fn scan(root: &Path) -> Self {
        let mut classes = HashMap::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                // The root itself may be dot-prefixed (temp dirs often are);
                // only hidden directories below it are skipped.
                e.depth() == 0
                    || !(e.file_type().is_dir()
                        && e.file_name().to_string_lossy().starts_with('.'))
            })
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("php") {
                continue;
            }
            let Ok(contents) = std::fs::read_to_string(path) else {
                continue;
            };
            let namespace = NAMESPACE_RE
                .captures(&contents)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            for captures in CLASS_RE.captures_iter(&contents) {
                let declared = captures[1].trim_start_matches('_');
                let qualified = if namespace.is_empty() {
                    declared.to_string()
                } else {
                    format!("{namespace}\\{declared}")
                };
                classes
                    .entry(qualified.to_lowercase())
                    .or_insert_with(|| path.to_path_buf());
            }
        }
        debug!(count = classes.len(), "scanned classmap");
        Self { classes }
    }

    pub fn lookup(&self, class: &str) -> Option<&Path> {
        self.classes
            .get(&class.trim_start_matches('\\').to_lowercase())
            .map(PathBuf::as_path)
    }
}

/// Signature provider backed by structural parsing only.
pub struct AstSignatureProvider {
    install_root: PathBuf,
    classmap: Option<ClassMap>,
}

impl AstSignatureProvider {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            classmap: None,
        }
    }

    fn classmap(&mut self) -> &ClassMap {
        if self.classmap.is_none() {
            self.classmap = Some(ClassMap::scan(&self.install_root));
        }
        self.classmap.as_ref().unwrap()
    }
}

impl SignatureProvider for AstSignatureProvider {
    fn resolve(&mut self, class: &str) -> Result<Option<Vec<MethodSignature>>, ProviderError> {
        let Some(path) = self.classmap().lookup(class).map(Path::to_path_buf) else {
            return Ok(None);
        };
        let contents = std::fs::read_to_string(&path)?;
        let ast = match Ast::parse_source(&contents) {
            Ok(ast) => ast,
            Err(e) => {
                warn!(class, path = %path.display(), error = %e, "could not parse class file");
                return Ok(None);
            }
        };
        let wanted = class
            .trim_start_matches('\\')
            .rsplit('\\')
            .next()
            .unwrap_or(class);
        match find_class(ast.root(), &contents, Some(wanted)) {
            Some(node) => Ok(Some(shape_of_class(&ast, node).methods)),
            None => Ok(None),
        }
    }

    fn declare(&mut self, source: &str) -> Result<ClassShape, DeclareError> {
        signatures_from_source(source)
    }
}
