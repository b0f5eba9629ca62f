use super::common::ColorMode;
use super::config::Config;
use super::{Host, Result};
use crate::job::Job;
use crate::naming::Name;
use crate::report::Status;
use crate::specs::SpecFilter;
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::{IntoAppError, app_err};
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Job document holding the measurements to evaluate
    #[arg(value_name = "JOB_JSON")]
    pub job: Utf8PathBuf,

    /// Evaluate against the specifications of this metrics package instead of those stored in the job
    /// (default from configuration)
    #[arg(long, value_name = "DIR")]
    pub package: Option<Utf8PathBuf>,

    /// Only report specifications of this package, metric, or specification name
    #[arg(long, value_name = "NAME")]
    pub spec: Option<Name>,

    /// Only report specifications carrying this tag (repeatable, default from configuration)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Only report specifications whose metric carries this tag (repeatable)
    #[arg(long = "metric-tag", value_name = "TAG")]
    pub metric_tags: Vec<String>,

    /// Only report specifications whose metadata query matches the job's metadata
    #[arg(long)]
    pub match_meta: bool,

    /// Exit with status code 1 if any specification fails or cannot be evaluated
    #[arg(long)]
    pub error_if_failed: bool,
}

pub fn report_job<H: Host>(host: &mut H, args: &ReportArgs, config: &Config, color: ColorMode) -> Result<()> {
    let mut job = Job::read(&args.job).into_app_err_with(|| format!("reading job document '{}'", args.job))?;

    if let Some(package) = args.package.as_ref().or(config.metrics_package.as_ref()) {
        job.reload_metrics_package(package)
            .into_app_err_with(|| format!("loading metrics package '{package}'"))?;
    }

    let tags = if args.tags.is_empty() { &config.spec_tags } else { &args.tags };
    let filter = SpecFilter {
        name: args.spec.as_ref(),
        meta: args.match_meta.then_some(job.meta()),
        required_meta: None,
        spec_tags: tags,
        metric_tags: &args.metric_tags,
        metrics: None,
    };

    let mut report = job.report(&filter);
    if !config.show_unavailable {
        report = report.without_unavailable();
    }

    let mut rendered = String::new();
    let _ = report.render(&mut rendered, color.use_colors());
    let _ = write!(host.output(), "{rendered}");

    let failed = report.count(Status::Fail) + report.count(Status::Error);
    if args.error_if_failed && failed > 0 {
        host.exit(1);
        return Err(app_err!("{failed} specification(s) did not pass"));
    }

    Ok(())
}
