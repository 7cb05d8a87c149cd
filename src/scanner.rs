//! Trivy subprocess invocation.
//!
//! One blocking invocation per image reference. The JSON output file and the
//! ignore list get unique per-invocation temp paths and are removed when the
//! invocation scope ends, so one image's accepted CVEs can never leak into
//! the next image's scan.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::ImagePolicy;
use crate::error::{GateError, Result};
use crate::report::ScanReport;

/// Build the fully-qualified image reference: `[registry "/"] name "@" digest`.
pub fn full_reference(registry: Option<&str>, name: &str, digest: &str) -> String {
    match registry {
        Some(registry) if !registry.is_empty() => format!("{}/{}@{}", registry, name, digest),
        _ => format!("{}@{}", name, digest),
    }
}

/// Runs the external scanner against image references.
pub struct TrivyRunner {
    scanner_bin: String,
    working_dir: PathBuf,
}

impl TrivyRunner {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            scanner_bin: "trivy".to_string(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Override the scanner binary name or path.
    pub fn with_scanner_bin(mut self, bin: impl Into<String>) -> Self {
        self.scanner_bin = bin.into();
        self
    }

    /// Scan one image reference under the given policy.
    ///
    /// Fatal on scanner launch failure, non-zero scanner exit, or an
    /// unreadable/unparseable report. No retries.
    pub fn scan_reference(&self, reference: &str, policy: &ImagePolicy) -> Result<ScanReport> {
        let ignore_file = self.write_ignore_list(policy)?;
        let output_file = NamedTempFile::new().map_err(|e| GateError::TempFile {
            purpose: "scan output",
            source: e,
        })?;

        let severities = policy.severity_levels.join(",");
        let mut cmd = Command::new(&self.scanner_bin);
        cmd.current_dir(&self.working_dir);
        cmd.args(["image", "-s", &severities, "-f", "json", "-o"]);
        cmd.arg(output_file.path());
        if let Some(ref ignore) = ignore_file {
            cmd.arg("--ignorefile");
            cmd.arg(ignore.path());
        }
        cmd.arg(reference);

        info!("$ {}", render_command(&cmd));
        let output = cmd.output().map_err(|e| GateError::ScannerLaunch {
            command: self.scanner_bin.clone(),
            source: e,
        })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("{}", line);
        }

        if !output.status.success() {
            return Err(GateError::ScannerFailed {
                reference: reference.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let raw = fs::read_to_string(output_file.path()).map_err(|e| GateError::ReadFile {
            path: output_file.path().display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| GateError::ParseReport {
            reference: reference.to_string(),
            source: e,
        })
        // output_file and ignore_file are deleted on drop
    }

    /// Write the policy's accepted CVE ids to an ignore-list file, one per line.
    ///
    /// Returns `None` when the policy accepts nothing. The file lives only as
    /// long as the returned handle.
    fn write_ignore_list(&self, policy: &ImagePolicy) -> Result<Option<NamedTempFile>> {
        if policy.accepted.is_empty() {
            return Ok(None);
        }

        info!("Accepted severities:");
        for entry in &policy.accepted {
            info!("- {}: {}", entry.cve, entry.reason);
        }

        let mut file = NamedTempFile::new().map_err(|e| GateError::TempFile {
            purpose: "ignore list",
            source: e,
        })?;
        let joined = policy
            .accepted
            .iter()
            .map(|entry| entry.cve.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        file.write_all(joined.as_bytes())
            .and_then(|_| file.flush())
            .map_err(GateError::WriteIgnoreList)?;

        Ok(Some(file))
    }
}

fn render_command(cmd: &Command) -> String {
    let mut rendered = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcceptedVulnerability;
    use crate::policy::default_severity_levels;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_full_reference_with_registry() {
        assert_eq!(
            full_reference(Some("reg.example.com"), "app", "sha256:aaa"),
            "reg.example.com/app@sha256:aaa"
        );
    }

    #[test]
    fn test_full_reference_without_registry() {
        assert_eq!(full_reference(None, "app", "sha256:aaa"), "app@sha256:aaa");
        assert_eq!(
            full_reference(Some(""), "app", "sha256:aaa"),
            "app@sha256:aaa"
        );
    }

    fn policy_with_accepted(cves: &[&str]) -> ImagePolicy {
        ImagePolicy {
            name: "app".to_string(),
            severity_levels: default_severity_levels(),
            accepted: cves
                .iter()
                .map(|cve| AcceptedVulnerability {
                    cve: cve.to_string(),
                    reason: "x".to_string(),
                })
                .collect(),
            ignore_unfixed: false,
        }
    }

    #[test]
    fn test_ignore_list_skipped_without_accepted_entries() {
        let dir = TempDir::new().unwrap();
        let runner = TrivyRunner::new(dir.path());
        let file = runner.write_ignore_list(&policy_with_accepted(&[])).unwrap();
        assert!(file.is_none());
    }

    #[test]
    fn test_ignore_list_contains_one_cve_per_line() {
        let dir = TempDir::new().unwrap();
        let runner = TrivyRunner::new(dir.path());
        let file = runner
            .write_ignore_list(&policy_with_accepted(&["CVE-2020-1", "CVE-2021-2"]))
            .unwrap()
            .unwrap();
        let content = fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, "CVE-2020-1\nCVE-2021-2");
    }

    #[test]
    fn test_ignore_list_removed_when_handle_drops() {
        let dir = TempDir::new().unwrap();
        let runner = TrivyRunner::new(dir.path());
        let file = runner
            .write_ignore_list(&policy_with_accepted(&["CVE-2020-1"]))
            .unwrap()
            .unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }

    /// Install a stub scanner script that records its arguments and writes a
    /// canned report to the `-o` path.
    fn install_stub(dir: &Path, report: &str, exit_code: i32) -> (PathBuf, PathBuf) {
        let report_path = dir.join("stub_report.json");
        fs::write(&report_path, report).unwrap();
        let args_path = dir.join("stub_args.txt");

        let script = dir.join("stub-trivy");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\n\
                 printf '%s\\n' \"$*\" >> {args}\n\
                 out=\"\"\n\
                 prev=\"\"\n\
                 for arg in \"$@\"; do\n\
                 \tif [ \"$prev\" = \"-o\" ]; then out=\"$arg\"; fi\n\
                 \tprev=\"$arg\"\n\
                 done\n\
                 if [ {code} -ne 0 ]; then echo 'scan blew up' >&2; exit {code}; fi\n\
                 cp {report} \"$out\"\n",
                args = args_path.display(),
                code = exit_code,
                report = report_path.display(),
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        (script, args_path)
    }

    const CLEAN_REPORT: &str = r#"{"SchemaVersion": 2, "ArtifactName": "app@sha256:aaa", "Results": []}"#;

    #[test]
    fn test_scan_reference_parses_report() {
        let dir = TempDir::new().unwrap();
        let (script, args_path) = install_stub(dir.path(), CLEAN_REPORT, 0);

        let runner = TrivyRunner::new(dir.path()).with_scanner_bin(script.display().to_string());
        let report = runner
            .scan_reference("app@sha256:aaa", &policy_with_accepted(&[]))
            .unwrap();

        assert_eq!(report.schema_version, 2);
        assert!(!report.has_vulnerabilities());

        let args = fs::read_to_string(args_path).unwrap();
        assert!(args.starts_with("image -s MEDIUM,HIGH,CRITICAL -f json -o "));
        assert!(args.trim_end().ends_with("app@sha256:aaa"));
        assert!(!args.contains("--ignorefile"));
    }

    #[test]
    fn test_scan_reference_passes_ignore_file() {
        let dir = TempDir::new().unwrap();
        let (script, args_path) = install_stub(dir.path(), CLEAN_REPORT, 0);

        let runner = TrivyRunner::new(dir.path()).with_scanner_bin(script.display().to_string());
        runner
            .scan_reference("app@sha256:aaa", &policy_with_accepted(&["CVE-2020-1"]))
            .unwrap();

        let args = fs::read_to_string(args_path).unwrap();
        assert!(args.contains("--ignorefile"));
    }

    #[test]
    fn test_scan_reference_nonzero_exit_is_fatal() {
        let dir = TempDir::new().unwrap();
        let (script, _) = install_stub(dir.path(), CLEAN_REPORT, 3);

        let runner = TrivyRunner::new(dir.path()).with_scanner_bin(script.display().to_string());
        let err = runner
            .scan_reference("app@sha256:aaa", &policy_with_accepted(&[]))
            .unwrap_err();

        match err {
            GateError::ScannerFailed { reference, stderr, .. } => {
                assert_eq!(reference, "app@sha256:aaa");
                assert!(stderr.contains("scan blew up"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scan_reference_missing_binary_is_fatal() {
        let dir = TempDir::new().unwrap();
        let runner = TrivyRunner::new(dir.path()).with_scanner_bin("definitely-not-trivy");
        let err = runner
            .scan_reference("app@sha256:aaa", &policy_with_accepted(&[]))
            .unwrap_err();
        assert!(matches!(err, GateError::ScannerLaunch { .. }));
    }
}
