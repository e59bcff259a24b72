//! Static compatibility linter for IPS extensions.
//!
//! Validates two things about an application or plugin against the install
//! it targets: that its hook classes remain signature-compatible with the
//! classes they overlay, and that its templates never leave an interpolated
//! expression unbraced.

pub mod ast;
pub mod cli;
pub mod conf;
pub mod hooks;
pub mod ips;
pub mod lint;
pub mod report;
pub mod sig;
pub mod templates;

pub use conf::Conf;
pub use hooks::HooksValidator;
pub use ips::{find_resources, locate_install, Resource, ResourceKind};
pub use lint::{Diagnostic, ErrorCode, Severity};
pub use templates::TemplatesValidator;
