//! Signature provider that executes the host's PHP runtime.
//!
//! Each call shells out to a `php` binary running an embedded reflection
//! helper which boots the host install in recovery mode, evals the hook
//! source against an inert base class, and reports signatures as JSON.
//! Declaring a hook has observable side effects inside that PHP process,
//! which is why the provider contract is `&mut self`.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::debug;

use super::provider::{DeclareError, ProviderError, SignatureProvider};
use super::{ClassShape, DocTags, MethodSignature, Parameter, Visibility};

const REFLECT_HELPER: &str = include_str!("reflect.php");

/// Shell-out backend for signature lookups.
pub struct PhpRuntimeProvider {
    php_binary: String,
    install_root: Option<PathBuf>,
    /// Helper script on disk; kept alive so the temp file outlives us.
    helper: NamedTempFile,
}

impl PhpRuntimeProvider {
    pub fn new(
        php_binary: impl Into<String>,
        install_root: Option<PathBuf>,
    ) -> Result<Self, ProviderError> {
        let mut helper = tempfile::Builder::new()
            .prefix("ips-lint-reflect")
            .suffix(".php")
            .tempfile()?;
        helper.write_all(REFLECT_HELPER.as_bytes())?;
        helper.flush()?;
        Ok(Self {
            php_binary: php_binary.into(),
            install_root,
            helper,
        })
    }

    fn run(&self, mode: &str, subject: &str) -> Result<Reply, ProviderError> {
        let install = self
            .install_root
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(mode, subject, "invoking php reflection helper");
        let output = Command::new(&self.php_binary)
            .arg(self.helper.path())
            .arg(mode)
            .arg(install)
            .arg(subject)
            .output()?;
        if !output.status.success() {
            return Err(ProviderError::Php(format!(
                "{} exited with {}: {}",
                self.php_binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| ProviderError::Protocol(e.to_string()))
    }
}

impl SignatureProvider for PhpRuntimeProvider {
    fn resolve(&mut self, class: &str) -> Result<Option<Vec<MethodSignature>>, ProviderError> {
        match self.run("resolve", class)? {
            Reply::Ok { methods, .. } => Ok(Some(
                methods.into_iter().map(MethodReply::into_signature).collect(),
            )),
            Reply::NotFound => Ok(None),
            other => Err(ProviderError::Protocol(format!(
                "unexpected resolve reply: {other:?}"
            ))),
        }
    }

    fn declare(&mut self, source: &str) -> Result<ClassShape, DeclareError> {
        let mut hook_file = tempfile::Builder::new()
            .prefix("ips-lint-hook")
            .suffix(".php")
            .tempfile()
            .map_err(ProviderError::from)?;
        hook_file
            .write_all(source.as_bytes())
            .and_then(|()| hook_file.flush())
            .map_err(ProviderError::from)?;

        let subject = hook_file.path().to_string_lossy().into_owned();
        match self.run("declare", &subject)? {
            Reply::Ok {
                doc_comment,
                methods,
            } => Ok(ClassShape {
                doc_tags: DocTags::parse(&doc_comment),
                methods: methods.into_iter().map(MethodReply::into_signature).collect(),
            }),
            Reply::ParseError { message, line } => Err(DeclareError::Parse { message, line }),
            Reply::DeclareError { message } => Err(DeclareError::Declaration(message)),
            Reply::NotFound => Err(DeclareError::Declaration(
                "declared class not found".into(),
            )),
        }
    }
}

/// Wire format of the reflection helper.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Reply {
    Ok {
        #[serde(default)]
        doc_comment: String,
        methods: Vec<MethodReply>,
    },
    NotFound,
    ParseError {
        message: String,
        #[serde(default)]
        line: Option<usize>,
    },
    DeclareError {
        message: String,
    },
}

#[derive(Debug, Deserialize)]
struct MethodReply {
    name: String,
    visibility: String,
    #[serde(rename = "static")]
    is_static: bool,
    return_type: Option<String>,
    #[serde(default)]
    doc_comment: String,
    start_line: usize,
    end_line: usize,
    params: Vec<ParamReply>,
}

#[derive(Debug, Deserialize)]
struct ParamReply {
    name: String,
    position: usize,
    #[serde(rename = "type")]
    type_name: Option<String>,
    optional: bool,
}

impl MethodReply {
    fn into_signature(self) -> MethodSignature {
        MethodSignature {
            name: self.name,
            visibility: Visibility::parse(&self.visibility).unwrap_or(Visibility::Public),
            is_static: self.is_static,
            return_type: self.return_type,
            parameters: self
                .params
                .into_iter()
                .map(|p| Parameter {
                    name: p.name,
                    position: p.position,
                    type_name: p.type_name,
                    optional: p.optional,
                })
                .collect(),
            doc_tags: DocTags::parse(&self.doc_comment),
            start_line: self.start_line,
            end_line: self.end_line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig::DocTag;

    #[test]
    fn decodes_an_ok_reply() {
        let raw = r#"{
            "status": "ok",
            "doc_comment": "",
            "methods": [{
                "name": "build",
                "visibility": "protected",
                "static": true,
                "return_type": "string",
                "doc_comment": "/** @ips-lint no-check-renames */",
                "start_line": 7,
                "end_line": 12,
                "params": [
                    {"name": "count", "position": 0, "type": null, "optional": false},
                    {"name": "limit", "position": 1, "type": "int", "optional": true}
                ]
            }]
        }"#;
        let reply: Reply = serde_json::from_str(raw).unwrap();
        let Reply::Ok { methods, .. } = reply else {
            panic!("expected ok reply");
        };
        let sig = methods.into_iter().next().unwrap().into_signature();
        assert_eq!(sig.visibility, Visibility::Protected);
        assert!(sig.is_static);
        assert!(sig.has_return_type());
        assert!(sig.doc_tags.contains(DocTag::NoCheckRenames));
        assert_eq!(sig.parameters.len(), 2);
        assert!(sig.parameters[1].optional);
    }

    #[test]
    fn decodes_failure_replies() {
        let reply: Reply =
            serde_json::from_str(r#"{"status": "not_found"}"#).unwrap();
        assert!(matches!(reply, Reply::NotFound));

        let reply: Reply = serde_json::from_str(
            r#"{"status": "parse_error", "message": "unexpected '}'", "line": 41}"#,
        )
        .unwrap();
        match reply {
            Reply::ParseError { line, .. } => assert_eq!(line, Some(41)),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
