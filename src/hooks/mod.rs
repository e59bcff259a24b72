//! Hook compatibility validation.
//!
//! For every hook in every resource, obtains the hook's own method
//! signatures and the overlaid base class's signatures through a
//! [`SignatureProvider`], diffs them method by method, and reports
//! diagnostics. All failures are recovered per hook or per method; nothing
//! aborts the overall run.

pub mod parent_calls;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::conf::Conf;
use crate::ips::{Hook, Resource};
use crate::lint::{Diagnostic, ErrorCode};
use crate::sig::provider::{DeclareError, SignatureProvider};
use crate::sig::{DocTag, MethodSignature};

use parent_calls::find_parent_calls;

static HOOK_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"class \S+ extends _HOOK_CLASS_").unwrap());

/// Replace the manifest placeholder with a synthetic class bound to an inert
/// base, so declaring the hook never requires the real target class to
/// exist. The replacement stays on the same line, keeping line numbers
/// stable.
fn substitute_placeholder(source: &str) -> String {
    HOOK_CLASS_RE
        .replace(source, "class __lint_subject extends __lint_base")
        .into_owned()
}

/// Inclusive 1-based line slice of `source`.
fn extract_lines(source: &str, start: usize, end: usize) -> Option<String> {
    if start == 0 || end < start {
        return None;
    }
    let lines: Vec<&str> = source.lines().collect();
    if start > lines.len() {
        return None;
    }
    let end = end.min(lines.len());
    Some(lines[start - 1..end].join("\n"))
}

pub struct HooksValidator<'a, P> {
    resources: &'a [Resource],
    provider: P,
    conf: &'a Conf,
}

impl<'a, P: SignatureProvider> HooksValidator<'a, P> {
    pub fn new(resources: &'a [Resource], provider: P, conf: &'a Conf) -> Self {
        Self {
            resources,
            provider,
            conf,
        }
    }

    /// Validate every hook of every resource, in declared order.
    pub fn validate(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let resources = self.resources;
        for resource in resources {
            debug!(resource = resource.name(), "processing resource");
            let hooks = match resource.hooks() {
                Ok(hooks) => hooks,
                Err(e) => {
                    warn!(resource = resource.name(), error = %e, "skipping resource");
                    continue;
                }
            };
            for hook in &hooks {
                debug!(
                    hook = hook.name.as_str(),
                    resource = resource.name(),
                    "processing hook"
                );
                self.validate_hook(hook, resource, &mut diagnostics);
            }
        }
        diagnostics
    }

    fn validate_hook(&mut self, hook: &Hook, resource: &Resource, out: &mut Vec<Diagnostic>) {
        if !hook.path.exists() {
            out.push(
                Diagnostic::new(
                    format!("Hook file {} does not exist", hook.path.display()),
                    ErrorCode::FileMissing,
                    resource.name(),
                )
                .with_file(resource.hooks_manifest_path()),
            );
            return;
        }

        // Theme hooks customize presentation only; they have no base class
        // relationship to check.
        if hook.theme_hook {
            return;
        }

        let raw = match std::fs::read_to_string(&hook.path) {
            Ok(raw) => raw,
            Err(e) => {
                out.push(
                    Diagnostic::new(
                        format!("Hook file {} is unreadable: {e}", hook.path.display()),
                        ErrorCode::FileMissing,
                        resource.name(),
                    )
                    .with_file(resource.hooks_manifest_path()),
                );
                return;
            }
        };
        let source = substitute_placeholder(&raw);

        let shape = match self.provider.declare(&source) {
            Ok(shape) => shape,
            Err(DeclareError::Parse { message, line }) => {
                let mut diag = Diagnostic::new(
                    format!("ParseError while parsing hook: {message}"),
                    ErrorCode::ParseError,
                    resource.name(),
                )
                .with_file(&hook.path);
                if let Some(line) = line {
                    diag = diag.with_line(line);
                }
                out.push(diag);
                return;
            }
            Err(e) => {
                out.push(
                    Diagnostic::new(
                        format!("Failed to declare hook: {e}"),
                        ErrorCode::DeclarationError,
                        resource.name(),
                    )
                    .with_file(&hook.path),
                );
                return;
            }
        };

        if shape.doc_tags.contains(DocTag::Ignore) {
            info!(hook = hook.name.as_str(), "hook carries the ignore tag");
            return;
        }

        let base = match self.provider.resolve(&hook.class) {
            Ok(Some(methods)) => methods,
            Ok(None) => {
                out.push(
                    Diagnostic::new(
                        format!("Hooked class {} does not exist", hook.class),
                        ErrorCode::ParentMissing,
                        resource.name(),
                    )
                    .with_file(&hook.path),
                );
                return;
            }
            Err(e) => {
                out.push(
                    Diagnostic::new(
                        format!("Hooked class {} could not be resolved: {e}", hook.class),
                        ErrorCode::ParentMissing,
                        resource.name(),
                    )
                    .with_file(&hook.path),
                );
                return;
            }
        };

        // PHP method names are case-insensitive.
        let by_name: HashMap<String, &MethodSignature> = base
            .iter()
            .map(|m| (m.name.to_lowercase(), m))
            .collect();

        for method in &shape.methods {
            if method.doc_tags.contains(DocTag::Ignore) {
                continue;
            }
            match by_name.get(&method.name.to_lowercase()) {
                Some(base_method) => {
                    if let Some(diag) = check_method(method, base_method, hook, resource, self.conf)
                    {
                        out.push(diag);
                    }
                }
                None => {
                    // A hook may freely add new methods; it only becomes a
                    // finding when the method assumes a base implementation
                    // that isn't there.
                    let Some(body) = extract_lines(&source, method.start_line, method.end_line)
                    else {
                        continue;
                    };
                    let calls = find_parent_calls(&body, method.start_line);
                    if calls.is_empty() {
                        info!(
                            method = method.name.as_str(),
                            class = hook.class.as_str(),
                            "method missing in base but never calls parent, ignoring"
                        );
                        continue;
                    }
                    out.push(
                        Diagnostic::new(
                            format!("Method {} does not exist in {}", method.name, hook.class),
                            ErrorCode::ParentMethodMissing,
                            resource.name(),
                        )
                        .with_file(&hook.path)
                        .with_line(calls[0].line),
                    );
                }
            }
        }
    }
}

/// Signature comparison. Checks run in a fixed priority order and the first
/// violation wins; at most one diagnostic per method.
fn check_method(
    hook_method: &MethodSignature,
    base_method: &MethodSignature,
    hook: &Hook,
    resource: &Resource,
    conf: &Conf,
) -> Option<Diagnostic> {
    let diag = |message: String, code: ErrorCode| {
        Some(
            Diagnostic::new(message, code, resource.name())
                .with_file(&hook.path)
                .with_line(hook_method.start_line),
        )
    };

    if base_method.is_private() {
        return diag(
            format!(
                "Method {} is private in {}",
                hook_method.name, hook.class
            ),
            ErrorCode::ParentIncompatible,
        );
    }
    if base_method.is_public() && !hook_method.is_public() {
        return diag(
            format!(
                "Method {} is public in {}, but not in the hook",
                hook_method.name, hook.class
            ),
            ErrorCode::VisibilityChanged,
        );
    }
    if base_method.is_static && !hook_method.is_static {
        return diag(
            format!(
                "Method {} is static in {}, but not in the hook",
                hook_method.name, hook.class
            ),
            ErrorCode::ParentIncompatible,
        );
    }
    if !base_method.is_static && hook_method.is_static {
        return diag(
            format!(
                "{} is an instance method in {}, but static in the hook",
                hook_method.name, hook.class
            ),
            ErrorCode::ParentIncompatible,
        );
    }
    if base_method.has_return_type() && !hook_method.has_return_type() {
        return diag(
            format!(
                "{} has a return type of {} in {}, but no return type in the hook",
                hook_method.name,
                base_method.return_type.as_deref().unwrap_or(""),
                hook.class
            ),
            ErrorCode::IncompatibleReturnType,
        );
    }

    check_parameters(hook_method, base_method, hook, resource, conf)
}

/// Positional parameter reconciliation. Parameters are zipped by index up to
/// the longer list; names are only a heuristic signal for the rename check,
/// never the join key.
fn check_parameters(
    hook_method: &MethodSignature,
    base_method: &MethodSignature,
    hook: &Hook,
    resource: &Resource,
    conf: &Conf,
) -> Option<Diagnostic> {
    let diag = |message: String, code: ErrorCode| {
        Some(
            Diagnostic::new(message, code, resource.name())
                .with_file(&hook.path)
                .with_line(hook_method.start_line),
        )
    };
    let check_renames =
        conf.check_renames && !hook_method.doc_tags.contains(DocTag::NoCheckRenames);
    let qualified = format!("{}::{}", hook.class, base_method.name);

    let len = hook_method.parameters.len().max(base_method.parameters.len());
    for position in 0..len {
        let base = base_method.parameters.get(position);
        let Some(hooked) = hook_method.parameters.get(position) else {
            // The hook ran out of parameters before the base did.
            let missing: Vec<&str> = base_method.parameters[position..]
                .iter()
                .map(|p| p.name.as_str())
                .collect();
            return diag(
                format!(
                    "Method {} is missing parameters {} (defined in {})",
                    base_method.name,
                    missing.join(", "),
                    hook.class
                ),
                ErrorCode::MissingParameter,
            );
        };

        if !hooked.optional {
            match base {
                None => {
                    return diag(
                        format!(
                            "Parameter {} does not exist in {qualified}, but is required in the hook",
                            hooked.name
                        ),
                        ErrorCode::ExtraRequiredParameter,
                    );
                }
                Some(b) if b.optional => {
                    return diag(
                        format!(
                            "Parameter {} is optional in {qualified}, but is required in the hook",
                            hooked.name
                        ),
                        ErrorCode::ExtraRequiredParameter,
                    );
                }
                _ => {}
            }
        }

        if hooked.has_type() && !base.is_some_and(|b| b.has_type()) {
            return diag(
                format!(
                    "Parameter {} is untyped in {qualified}, but has type {} in the hook",
                    hooked.name,
                    hooked.type_name.as_deref().unwrap_or("")
                ),
                ErrorCode::IncompatibleParameterType,
            );
        }

        if check_renames {
            if let Some(b) = base {
                if hooked.name != b.name
                    && !conf.is_rename_ignored(&hooked.name)
                    && !conf.is_rename_ignored(&b.name)
                {
                    return diag(
                        format!(
                            "Hook parameter of {} does not match original parameter of {} declared in {qualified}",
                            hooked.name, b.name
                        ),
                        ErrorCode::ParameterRenamed,
                    );
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_substitution_keeps_lines_stable() {
        let source = "//<?php\n\nclass hook_render extends _HOOK_CLASS_\n{\n}\n";
        let substituted = substitute_placeholder(source);
        assert!(substituted.contains("class __lint_subject extends __lint_base"));
        assert_eq!(source.lines().count(), substituted.lines().count());
    }

    #[test]
    fn placeholder_substitution_leaves_other_classes_alone() {
        let source = "class plain extends \\IPS\\Theme {}";
        assert_eq!(substitute_placeholder(source), source);
    }

    #[test]
    fn extract_lines_is_inclusive_and_one_based() {
        let text = "one\ntwo\nthree\nfour";
        assert_eq!(extract_lines(text, 2, 3).as_deref(), Some("two\nthree"));
        assert_eq!(extract_lines(text, 4, 4).as_deref(), Some("four"));
        assert_eq!(extract_lines(text, 2, 10).as_deref(), Some("two\nthree\nfour"));
        assert_eq!(extract_lines(text, 0, 2), None);
        assert_eq!(extract_lines(text, 5, 6), None);
    }
}
