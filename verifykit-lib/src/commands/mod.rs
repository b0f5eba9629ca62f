//! Command-line interface for verifykit
//!
//! # Implementation Model
//!
//! The module is organized around four commands:
//!
//! - **lint**: Load a metrics package, check that its metric and specification
//!   documents parse, and cross-check specifications against metrics
//! - **inspect**: Summarize the contents of a job document
//! - **report**: Evaluate the measurements of a job document against its
//!   specifications, or those of a metrics package, and print a table
//! - **init**: Generate a default configuration file
//!
//! The `run` function parses command-line arguments using clap and routes to
//! the matching handler. Options shared by every command (configuration file,
//! log level, color) live on the top-level parser and are handled in `common`.
//!
//! Handlers write through a [`Host`] so tests can capture their output, and
//! report failures as `ohno::AppError` values carrying context.

mod common;
mod config;
mod host;
mod init;
mod inspect;
mod lint;
mod report;
mod run;

#[cfg(debug_assertions)]
pub use config::Config;

pub use host::Host;
pub use init::{InitArgs, init_config};
pub use inspect::{InspectArgs, inspect_job};
pub use lint::{LintArgs, lint_package};
pub use report::{ReportArgs, report_job};
pub use run::run;

type Result<T, E = ohno::AppError> = core::result::Result<T, E>;
