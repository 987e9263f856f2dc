//! Preflight check results and the report printed before a build.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    /// The build would fail or produce a broken image.
    Fail,
    /// Buildable, but probably not what the script meant.
    Warn,
}

impl CheckStatus {
    fn marker(self) -> &'static str {
        match self {
            CheckStatus::Pass => "✓",
            CheckStatus::Fail => "✗",
            CheckStatus::Warn => "⚠",
        }
    }
}

/// Outcome of one check against one part of the configuration.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            details,
        }
    }

    pub fn pass(name: &str) -> Self {
        Self::new(name, CheckStatus::Pass, None)
    }

    pub fn pass_with(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Pass, Some(details.into()))
    }

    pub fn fail(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Fail, Some(details.into()))
    }

    pub fn warn(name: &str, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warn, Some(details.into()))
    }

    /// One-line form used in the printed report and in error messages.
    pub fn summary(&self) -> String {
        match &self.details {
            Some(details) => format!("{}: {}", self.name, details),
            None => self.name.clone(),
        }
    }
}

/// All check results for one configuration, in the order they ran.
#[derive(Debug, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    pub fn all_passed(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.with_status(CheckStatus::Fail)
    }

    pub fn fail_count(&self) -> usize {
        self.failures().count()
    }

    pub fn warn_count(&self) -> usize {
        self.with_status(CheckStatus::Warn).count()
    }

    fn with_status(&self, status: CheckStatus) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(move |c| c.status == status)
    }

    pub fn print(&self) {
        println!("Checking configuration...");
        for check in &self.checks {
            println!("  {} {}", check.status.marker(), check.summary());
        }

        let passed = self.with_status(CheckStatus::Pass).count();
        print!("  {}/{} checks passed", passed, self.checks.len());
        match (self.fail_count(), self.warn_count()) {
            (0, 0) => println!(),
            (0, w) => println!(", {} warning(s)", w),
            (f, w) => println!(", {} failed, {} warning(s)", f, w),
        }
        println!();
    }
}
