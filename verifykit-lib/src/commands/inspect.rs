use super::{Host, Result};
use crate::job::Job;
use camino::Utf8PathBuf;
use clap::Parser;
use core::fmt::Write as _;
use ohno::IntoAppError;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Job document to summarize
    #[arg(value_name = "JOB_JSON")]
    pub job: Utf8PathBuf,
}

pub fn inspect_job<H: Host>(host: &mut H, args: &InspectArgs) -> Result<()> {
    let job = Job::read(&args.job).into_app_err_with(|| format!("reading job document '{}'", args.job))?;
    let _ = write!(host.output(), "{}", summarize(&job));
    Ok(())
}

fn summarize(job: &Job) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Metadata ({}):", job.meta().len());
    for (key, value) in job.meta().iter() {
        let _ = writeln!(out, "  {key}: {value}");
    }

    let _ = writeln!(out, "Measurements ({}):", job.measurements().len());
    for measurement in job.measurements() {
        let _ = writeln!(out, "  {measurement}");
        for id in measurement.blob_ids() {
            match job.blob(id) {
                Ok(blob) => {
                    let _ = writeln!(out, "    blob {} ({id}): {} fields", blob.name(), blob.len());
                }
                Err(_) => {
                    let _ = writeln!(out, "    blob {id}: missing");
                }
            }
        }
        for (key, datum) in measurement.notes().iter() {
            let _ = writeln!(out, "    note {key} = {}", datum.value());
        }
    }

    let _ = writeln!(out, "Blobs: {}", job.blobs().len());
    let _ = writeln!(out, "Metrics: {}", job.metrics().len());
    let _ = writeln!(out, "Specifications: {}", job.specs().len());
    out
}
