//! Command dispatch logic for verifykit

use super::common::GlobalArgs;
use super::{Host, InitArgs, InspectArgs, LintArgs, ReportArgs, Result, init_config, inspect_job, lint_package, report_job};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "verifykit", version, author, long_about = None)]
#[command(about = "Lint metric packages and report on verification jobs")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: VerifySubcommand,
}

#[derive(Subcommand, Debug)]
enum VerifySubcommand {
    /// Check that a metrics package parses and its specifications match its metrics
    Lint(LintArgs),
    /// Summarize a job document
    Inspect(InspectArgs),
    /// Evaluate a job's measurements against specifications
    Report(Box<ReportArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or if the executed command fails
pub fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    // init runs without loading the configuration it may be replacing
    match &cli.command {
        VerifySubcommand::Lint(lint_args) => lint_package(host, lint_args, &cli.global.setup()?),
        VerifySubcommand::Inspect(inspect_args) => {
            let _ = cli.global.setup()?;
            inspect_job(host, inspect_args)
        }
        VerifySubcommand::Report(report_args) => report_job(host, report_args, &cli.global.setup()?, cli.global.color),
        VerifySubcommand::Init(init_args) => init_config(host, init_args),
    }
}
