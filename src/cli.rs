//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::conf::Conf;
use crate::hooks::HooksValidator;
use crate::ips::{find_resources, locate_install, Resource};
use crate::lint::Diagnostic;
use crate::report;
use crate::sig::provider::SignatureProvider;
use crate::sig::runtime::PhpRuntimeProvider;
use crate::sig::static_php::AstSignatureProvider;
use crate::templates::{PhpTemplateCompiler, TemplatesValidator};

/// Clean run, no findings.
pub const EXIT_SUCCESS: i32 = 0;
/// Run completed and produced findings.
pub const EXIT_FAILED: i32 = 1;
/// The run itself could not complete.
pub const EXIT_ERROR: i32 = 2;

#[derive(Parser)]
#[command(name = "ips-lint", version, about = "Compatibility linter for IPS extensions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check hook classes against the classes they overlay
    ValidateHooks(ValidateArgs),
    /// Check raw templates for unbraced interpolations
    ValidateTemplates(ValidateArgs),
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Resource directory (or a tree of them) to validate
    pub path: PathBuf,

    /// IPS install root; located by searching upward from PATH if omitted
    #[arg(long)]
    pub suite: Option<PathBuf>,

    /// Signature backend for hook validation
    #[arg(long, value_enum, default_value_t = ProviderKind::Static)]
    pub provider: ProviderKind,

    /// PHP interpreter to shell out to
    #[arg(long, default_value = "php")]
    pub php: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Pretty)]
    pub format: Format,

    /// Configuration file (defaults to ips-lint.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Structural parsing only; never executes PHP
    Static,
    /// Reflection through the host's PHP runtime
    Php,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Pretty,
    Json,
}

pub fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::ValidateHooks(args) => run_validate_hooks(args),
        Commands::ValidateTemplates(args) => run_validate_templates(args),
    }
}

fn run_validate_hooks(args: ValidateArgs) -> anyhow::Result<i32> {
    let conf = Conf::load(args.config.as_deref())?;
    let install = locate_install(args.suite.as_deref(), &args.path)?;
    info!(install = %install.display(), "using install root");
    let resources = find_resources(&args.path)?;

    let diagnostics = match args.provider {
        ProviderKind::Static => {
            let provider = AstSignatureProvider::new(&install);
            hook_diagnostics(&resources, provider, &conf)
        }
        ProviderKind::Php => {
            let provider = PhpRuntimeProvider::new(&args.php, Some(install))?;
            hook_diagnostics(&resources, provider, &conf)
        }
    };
    report_and_exit(&diagnostics, args.format)
}

fn hook_diagnostics<P: SignatureProvider>(
    resources: &[Resource],
    provider: P,
    conf: &Conf,
) -> Vec<Diagnostic> {
    HooksValidator::new(resources, provider, conf).validate()
}

fn run_validate_templates(args: ValidateArgs) -> anyhow::Result<i32> {
    let install = locate_install(args.suite.as_deref(), &args.path)?;
    info!(install = %install.display(), "using install root");
    let resources = find_resources(&args.path)?;

    let compiler = PhpTemplateCompiler::new(&args.php, &install)?;
    let diagnostics = TemplatesValidator::new(&resources, compiler).validate();
    report_and_exit(&diagnostics, args.format)
}

fn report_and_exit(diagnostics: &[Diagnostic], format: Format) -> anyhow::Result<i32> {
    match format {
        Format::Pretty => report::write_pretty(diagnostics),
        Format::Json => report::write_json(diagnostics)?,
    }
    Ok(if diagnostics.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILED
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_validate_hooks_defaults() {
        let cli = Cli::parse_from(["ips-lint", "validate-hooks", "applications/forums"]);
        let Commands::ValidateHooks(args) = cli.command else {
            panic!("expected validate-hooks");
        };
        assert_eq!(args.path, PathBuf::from("applications/forums"));
        assert!(args.suite.is_none());
        assert_eq!(args.provider, ProviderKind::Static);
        assert_eq!(args.php, "php");
        assert_eq!(args.format, Format::Pretty);
    }

    #[test]
    fn parses_provider_and_format_overrides() {
        let cli = Cli::parse_from([
            "ips-lint",
            "validate-hooks",
            "plugins/myplugin",
            "--suite",
            "/var/www/ips",
            "--provider",
            "php",
            "--php",
            "php8.1",
            "--format",
            "json",
        ]);
        let Commands::ValidateHooks(args) = cli.command else {
            panic!("expected validate-hooks");
        };
        assert_eq!(args.suite, Some(PathBuf::from("/var/www/ips")));
        assert_eq!(args.provider, ProviderKind::Php);
        assert_eq!(args.php, "php8.1");
        assert_eq!(args.format, Format::Json);
    }
}
