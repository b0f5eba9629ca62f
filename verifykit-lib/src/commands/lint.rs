use super::common::package_dir;
use super::config::Config;
use super::{Host, Result};
use crate::metrics::MetricSet;
use crate::specs::SpecificationSet;
use camino::Utf8PathBuf;
use clap::Parser;
use core::fmt::Write as _;
use ohno::app_err;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct LintArgs {
    /// Metrics package directory, holding `metrics/` and `specs/` (default is the configured package)
    #[arg(value_name = "PACKAGE_DIR")]
    pub package: Option<Utf8PathBuf>,
}

/// Load every metric and specification of a package and cross-check them.
///
/// Each section is reported as it passes; failures go to the error stream and
/// the host exits with status 1.
pub fn lint_package<H: Host>(host: &mut H, args: &LintArgs, config: &Config) -> Result<()> {
    let dir = package_dir(args.package.as_ref(), config);
    let mut out = String::new();
    let mut failures = String::new();

    let _ = writeln!(out, "Linting {dir}.");

    let metrics = match MetricSet::load_metrics_package(&dir) {
        Ok(metrics) => {
            let _ = writeln!(out, "Passed: metrics/");
            let _ = writeln!(out, "\tParsed {} metrics.", metrics.len());
            Some(metrics)
        }
        Err(e) => {
            let _ = writeln!(failures, "Failed: metrics/\n\t{e}");
            None
        }
    };

    let specs = match SpecificationSet::load_metrics_package(&dir) {
        Ok(specs) => {
            let _ = writeln!(out, "Passed: specs/");
            let _ = writeln!(out, "\tParsed {} specifications.", specs.len());
            Some(specs)
        }
        Err(e) => {
            let _ = writeln!(failures, "Failed: specs/\n\t{e}");
            None
        }
    };

    if let (Some(metrics), Some(specs)) = (&metrics, &specs) {
        match specs.validate_against(metrics) {
            Ok(()) => {
                let _ = writeln!(out, "Passed: cross-check");
                let _ = writeln!(out, "\tAll specifications refer to known metrics with compatible units.");
            }
            Err(e) => {
                let _ = writeln!(failures, "Failed: cross-check\n\t{e}");
            }
        }
    }

    if failures.is_empty() {
        let _ = writeln!(out, "All tests passed.");
        let _ = write!(host.output(), "{out}");
        return Ok(());
    }

    let _ = write!(host.output(), "{out}");
    let _ = write!(host.error(), "{failures}");
    host.exit(1);
    Err(app_err!("linting '{dir}' failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;
    use std::fs;

    fn package(specs: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("metrics")).unwrap();
        fs::create_dir_all(root.join("specs/pkg")).unwrap();
        fs::write(root.join("metrics/pkg.yaml"), "PA1:\n  unit: mmag\n  description: Photometric repeatability.\n").unwrap();
        fs::write(root.join("specs/pkg/PA1.yaml"), specs).unwrap();
        (tmp, root)
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_lint_passes() {
        let (_tmp, root) = package("design: {operator: '<=', value: 5, unit: mmag}\nstretch: {operator: '<=', value: 3, unit: mmag}\n");
        let mut host = TestHost::new();
        lint_package(&mut host, &LintArgs { package: Some(root.clone()) }, &Config::default()).unwrap();

        let out = host.output_str().replace(root.as_str(), "<pkg>");
        insta::assert_snapshot!(out, @r"
        Linting <pkg>.
        Passed: metrics/
        	Parsed 1 metrics.
        Passed: specs/
        	Parsed 2 specifications.
        Passed: cross-check
        	All specifications refer to known metrics with compatible units.
        All tests passed.
        ");
        assert!(host.error_str().is_empty());
        assert_eq!(host.exit_code, None);
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_lint_reports_bad_spec_file() {
        let (_tmp, root) = package("design: [not, a, mapping]\n");
        let mut host = TestHost::new();
        let result = lint_package(&mut host, &LintArgs { package: Some(root) }, &Config::default());

        assert!(result.is_err());
        assert_eq!(host.exit_code, Some(1));
        assert!(host.output_str().contains("Passed: metrics/"));
        assert!(!host.output_str().contains("All tests passed."));
        assert!(host.error_str().contains("Failed: specs/"));
        assert!(host.error_str().contains("PA1.yaml"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_lint_reports_incompatible_units() {
        let (_tmp, root) = package("design: {operator: '<=', value: 5, unit: arcsec}\n");
        let mut host = TestHost::new();
        assert!(lint_package(&mut host, &LintArgs { package: Some(root) }, &Config::default()).is_err());
        assert!(host.error_str().contains("Failed: cross-check"));
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_lint_missing_package() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let mut host = TestHost::new();
        assert!(lint_package(&mut host, &LintArgs { package: Some(root) }, &Config::default()).is_err());
        assert!(host.error_str().contains("Failed: metrics/"));
        assert!(host.error_str().contains("Failed: specs/"));
    }
}
