//! Top-level orchestration: load, link, scan, aggregate, signal.

use std::io;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::config;
use crate::error::Result;
use crate::policy;
use crate::report::{self, ScanReport};
use crate::scanner::{TrivyRunner, full_reference};

/// Final gate verdict after every declared scan has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Clean,
    VulnerabilitiesFound,
}

/// Aggregation context threaded through the scan loop.
///
/// Replaces hidden cross-call state: the reports accumulate in encounter
/// order and the violation flag is inspected exactly once at the end.
#[derive(Debug, Default)]
pub struct ScanContext {
    reports: Vec<ScanReport>,
    vulnerabilities_found: bool,
}

impl ScanContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: ScanReport) {
        if report.has_vulnerabilities() {
            self.vulnerabilities_found = true;
        }
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[ScanReport] {
        &self.reports
    }

    pub fn vulnerabilities_found(&self) -> bool {
        self.vulnerabilities_found
    }
}

/// Run the full gate: every declared scan completes before the verdict.
///
/// Vulnerabilities never short-circuit the loop; only operational errors
/// (unreadable documents, scanner failure) abort the run.
pub fn run(cli: &Cli) -> Result<GateOutcome> {
    let docs = config::load_documents(&cli.rules_path(), &cli.image_path())?;
    let linked = policy::link_policies(docs.images, &docs.policies);

    let runner = TrivyRunner::new(&cli.working_directory);
    let mut ctx = ScanContext::new();

    for entry in &linked {
        for (arch, digest) in entry.image.digests.entries() {
            let reference = full_reference(entry.image.registry.as_deref(), &entry.image.name, digest);
            info!(reference = %reference, arch, "Trivy scanning image");
            let report = runner.scan_reference(&reference, &entry.policy)?;
            ctx.record(report);
        }
    }

    report::emit_output(io::stdout().lock(), ctx.reports())?;

    if ctx.vulnerabilities_found() {
        warn!("Unexpected severity found.");
        Ok(GateOutcome::VulnerabilitiesFound)
    } else {
        info!(scans = ctx.reports().len(), "All scans clean");
        Ok(GateOutcome::Clean)
    }
}
