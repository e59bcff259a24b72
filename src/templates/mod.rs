//! Template validation.
//!
//! Templates are compiled into PHP by the host's theme compiler; the
//! validator only inspects the compiled output, looking for interpolations
//! the compiler failed to brace-wrap. Compilation itself is a boundary
//! trait so the validator never depends on how (or whether) the host
//! runtime is involved.

pub mod braces;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::ips::Resource;
use crate::lint::{Diagnostic, ErrorCode};

const COMPILE_HELPER: &str = include_str!("compile.php");

/// Turns raw template text (header already stripped) into compiled PHP.
pub trait TemplateCompiler {
    fn compile(&mut self, template: &str) -> anyhow::Result<String>;
}

/// Closures stand in for the real compiler in tests.
impl<F> TemplateCompiler for F
where
    F: FnMut(&str) -> anyhow::Result<String>,
{
    fn compile(&mut self, template: &str) -> anyhow::Result<String> {
        self(template)
    }
}

/// Compiler backend that shells out to the host's theme compiler.
pub struct PhpTemplateCompiler {
    php_binary: String,
    install_root: PathBuf,
    helper: NamedTempFile,
}

impl PhpTemplateCompiler {
    pub fn new(php_binary: impl Into<String>, install_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let mut helper = tempfile::Builder::new()
            .prefix("ips-lint-compile")
            .suffix(".php")
            .tempfile()?;
        helper.write_all(COMPILE_HELPER.as_bytes())?;
        helper.flush()?;
        Ok(Self {
            php_binary: php_binary.into(),
            install_root: install_root.into(),
            helper,
        })
    }
}

impl TemplateCompiler for PhpTemplateCompiler {
    fn compile(&mut self, template: &str) -> anyhow::Result<String> {
        let mut child = Command::new(&self.php_binary)
            .arg(self.helper.path())
            .arg(&self.install_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(template.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.php_binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Drop the non-semantic header line templates carry.
fn strip_header(raw: &str) -> &str {
    match raw.split_once('\n') {
        Some((_, rest)) => rest,
        None => "",
    }
}

pub struct TemplatesValidator<'a, C> {
    resources: &'a [Resource],
    compiler: C,
}

impl<'a, C: TemplateCompiler> TemplatesValidator<'a, C> {
    pub fn new(resources: &'a [Resource], compiler: C) -> Self {
        Self {
            resources,
            compiler,
        }
    }

    /// Validate every template of every resource. Per-template failures are
    /// logged and skipped; nothing aborts the run.
    pub fn validate(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let resources = self.resources;
        for resource in resources {
            debug!(resource = resource.name(), "processing resource");
            for template in resource.templates() {
                debug!(
                    template = %template.display(),
                    resource = resource.name(),
                    "processing template"
                );
                self.validate_template(&template, resource, &mut diagnostics);
            }
        }
        diagnostics
    }

    fn validate_template(
        &mut self,
        template: &Path,
        resource: &Resource,
        out: &mut Vec<Diagnostic>,
    ) {
        let raw = match std::fs::read_to_string(template) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(template = %template.display(), error = %e, "unreadable template");
                return;
            }
        };
        let compiled = match self.compiler.compile(strip_header(&raw)) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(template = %template.display(), error = %e, "failed to compile template");
                return;
            }
        };
        for expression in braces::check(&compiled) {
            out.push(
                Diagnostic::new(
                    format!("Interpolated expression must be wrapped in braces: {expression}"),
                    ErrorCode::InterpolationNotBraced,
                    resource.name(),
                )
                .with_file(template),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_line_is_stripped() {
        assert_eq!(
            strip_header("<ips:template parameters=\"$item\" />\n<p>body</p>"),
            "<p>body</p>"
        );
        assert_eq!(strip_header("header only"), "");
    }
}
