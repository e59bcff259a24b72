//! The signature provider boundary.
//!
//! Obtaining a class's structural shape may mean anything from executing the
//! host application's runtime to a standalone structural parse. The
//! validator treats the provider purely as an oracle and never inspects how
//! signatures are computed. Two backends ship with the crate:
//! [`super::static_php::AstSignatureProvider`] and
//! [`super::runtime::PhpRuntimeProvider`].

use thiserror::Error;

use super::{ClassShape, MethodSignature};

/// Failure while resolving an already-loadable class.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("php process failed: {0}")]
    Php(String),
    #[error("malformed provider output: {0}")]
    Protocol(String),
}

/// Failure while declaring a hook's own source.
#[derive(Debug, Error)]
pub enum DeclareError {
    /// The hook source is not parseable.
    #[error("{message}")]
    Parse {
        message: String,
        line: Option<usize>,
    },
    /// The source parsed but its shape could not be obtained (eval or
    /// reflection failure in the runtime backend, no class declaration in
    /// the static backend).
    #[error("{0}")]
    Declaration(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Oracle turning class names and hook sources into signature lists.
///
/// Declaring one hook's source may have observable side effects on
/// subsequent lookups in a runtime-backed implementation, so the provider is
/// a non-re-entrant resource: calls take `&mut self` and are inherently
/// serialized per provider instance.
pub trait SignatureProvider {
    /// Look up the structural shape of a named class. `Ok(None)` means the
    /// class does not exist.
    fn resolve(&mut self, class: &str) -> Result<Option<Vec<MethodSignature>>, ProviderError>;

    /// Declare a hook's source (with the base-class placeholder already
    /// substituted) and return its structural shape.
    fn declare(&mut self, source: &str) -> Result<ClassShape, DeclareError>;
}
