//! Preflight checks for an image configuration.
//!
//! Validates the configuration produced by the script before the image file
//! is touched, so mistakes surface as one readable report instead of a
//! half-written image.

mod checks;
mod types;

use anyhow::{bail, Result};

use crate::config::Configuration;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(config: &Configuration) -> PreflightReport {
    let mut report = PreflightReport::default();

    report.checks.push(checks::check_image_name(config));
    report.checks.push(checks::check_first_sector(config));
    report.checks.push(checks::check_layout(config));
    report.checks.extend(checks::check_bootsector(config));
    report.checks.extend(checks::check_partitions(config));

    report
}

/// Run preflight, print the report and bail if any check failed.
pub fn run_preflight_or_fail(config: &Configuration) -> Result<()> {
    let report = run_preflight(config);
    report.print();

    if !report.all_passed() {
        let failed: Vec<String> = report.failures().map(CheckResult::summary).collect();
        bail!(
            "configuration check failed ({} problem(s)):\n  {}",
            failed.len(),
            failed.join("\n  ")
        );
    }
    Ok(())
}
