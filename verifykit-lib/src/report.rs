//! Evaluating measurements against specifications
//!
//! A [`Report`] has one row per specification whose metric was measured, in
//! specification name order. Each row records the [`Status`] of the check along
//! with display forms of the measurement and of the test applied to it.

use crate::measurements::MeasurementSet;
use crate::naming::Name;
use crate::specs::{Outcome, SpecificationSet};
use core::fmt::{Result as FmtResult, Write};
use owo_colors::OwoColorize;
use strum::Display as StrumDisplay;

/// The result shown for one specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Unavailable,

    /// The specification could not be evaluated, for example because of a unit mismatch.
    Error,
}

impl From<Outcome> for Status {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Pass => Self::Pass,
            Outcome::Fail => Self::Fail,
            Outcome::Unavailable => Self::Unavailable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub spec: Name,
    pub status: Status,
    pub measurement: String,
    pub test: String,
    pub spec_tags: Vec<String>,
    pub metric_tags: Vec<String>,

    /// Why the specification could not be evaluated, for [`Status::Error`] rows.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    /// Evaluate every specification in `specs` that has a measurement of its metric.
    #[must_use]
    pub fn new(measurements: &MeasurementSet, specs: &SpecificationSet) -> Self {
        let rows = specs
            .iter()
            .filter_map(|spec| {
                let measurement = measurements.get(spec.metric_name()).ok()?;
                let (status, error) = match spec.evaluate(measurement) {
                    Ok(outcome) => (Status::from(outcome), None),
                    Err(e) => (Status::Error, Some(e.to_string())),
                };

                let measurement_text = measurement.quantity().map_or_else(|| "n/a".to_string(), ToString::to_string);
                let metric_tags = measurement
                    .metric()
                    .map(|metric| metric.tags().iter().cloned().collect())
                    .unwrap_or_default();

                Some(ReportRow {
                    spec: spec.name().clone(),
                    status,
                    measurement: measurement_text,
                    test: spec.to_string(),
                    spec_tags: spec.tags().iter().cloned().collect(),
                    metric_tags,
                    error,
                })
            })
            .collect();

        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn count(&self, status: Status) -> usize {
        self.rows.iter().filter(|row| row.status == status).count()
    }

    /// Whether every row passed. An empty report passes.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.rows.iter().all(|row| row.status == Status::Pass)
    }

    /// Drop the rows of specifications whose measurement is unavailable.
    #[must_use]
    pub fn without_unavailable(mut self) -> Self {
        self.rows.retain(|row| row.status != Status::Unavailable);
        self
    }

    /// Write the report as an aligned text table followed by a summary line.
    pub fn render<W: Write>(&self, writer: &mut W, use_colors: bool) -> FmtResult {
        if self.rows.is_empty() {
            return writeln!(writer, "No specifications apply to the measurements.");
        }

        let spec_width = column_width("Specification", self.rows.iter().map(|r| r.spec.to_string().len()));
        let status_width = column_width("Status", self.rows.iter().map(|r| r.status.to_string().len()));
        let measurement_width = column_width("Measurement", self.rows.iter().map(|r| r.measurement.chars().count()));

        writeln!(
            writer,
            "{:<spec_width$}  {:<status_width$}  {:<measurement_width$}  Test",
            "Specification", "Status", "Measurement"
        )?;

        for row in &self.rows {
            let status = format!("{:<status_width$}", row.status.to_string());
            let status = if use_colors {
                match row.status {
                    Status::Pass => status.green().bold().to_string(),
                    Status::Fail => status.red().bold().to_string(),
                    Status::Unavailable => status.yellow().to_string(),
                    Status::Error => status.magenta().bold().to_string(),
                }
            } else {
                status
            };

            writeln!(
                writer,
                "{:<spec_width$}  {status}  {:<measurement_width$}  {}",
                row.spec.to_string(),
                row.measurement,
                row.test
            )?;

            if let Some(error) = &row.error {
                writeln!(writer, "    {error}")?;
            }
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "{} passed, {} failed, {} unavailable, {} errors",
            self.count(Status::Pass),
            self.count(Status::Fail),
            self.count(Status::Unavailable),
            self.count(Status::Error)
        )
    }
}

fn column_width(header: &str, widths: impl Iterator<Item = usize>) -> usize {
    widths.max().unwrap_or(0).max(header.len())
}
