//! Trivy's JSON report schema and the aggregate pipeline output.
//!
//! Unlike the input documents, the report schema is owned by the scanner, so
//! parsing is lenient: unknown fields are ignored and missing fields default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::error::{GateError, Result};

/// One scanner invocation's structured output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ScanReport {
    pub schema_version: i64,
    pub artifact_name: String,
    pub artifact_type: String,
    pub metadata: Metadata,
    pub results: Vec<TargetResult>,
}

impl ScanReport {
    /// Whether any target carries at least one vulnerability record.
    ///
    /// The scanner has already applied the severity filter, so any record at
    /// all is a policy violation.
    pub fn has_vulnerabilities(&self) -> bool {
        self.results.iter().any(|r| !r.vulnerabilities.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Metadata {
    #[serde(rename = "OS")]
    pub os: OsInfo,
    #[serde(rename = "ImageID")]
    pub image_id: String,
    #[serde(rename = "DiffIDs")]
    pub diff_ids: Vec<String>,
    pub repo_digests: Vec<String>,
    pub image_config: ImageConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OsInfo {
    pub family: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub architecture: String,
    pub created: Option<DateTime<Utc>>,
    pub history: Vec<HistoryEntry>,
    pub os: String,
    pub rootfs: RootFs,
    pub config: ContainerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    pub created: Option<DateTime<Utc>>,
    pub created_by: String,
    pub empty_layer: bool,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub fs_type: String,
    pub diff_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContainerConfig {
    pub entrypoint: Vec<String>,
    pub env: Vec<String>,
}

/// One scan target (an OS package set or a language-specific lockfile).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TargetResult {
    pub target: String,
    pub class: String,
    #[serde(rename = "Type")]
    pub target_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<Vulnerability>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Vulnerability {
    #[serde(rename = "VulnerabilityID")]
    pub vulnerability_id: String,
    pub pkg_name: String,
    pub installed_version: String,
    pub fixed_version: String,
    pub layer: Layer,
    pub severity_source: String,
    #[serde(rename = "PrimaryURL")]
    pub primary_url: String,
    pub data_source: DataSource,
    pub title: String,
    pub description: String,
    pub severity: String,
    #[serde(rename = "CweIDs")]
    pub cwe_ids: Vec<String>,
    #[serde(rename = "CVSS")]
    pub cvss: Cvss,
    pub references: Vec<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Layer {
    #[serde(rename = "DiffID")]
    pub diff_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DataSource {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(rename = "URL")]
    pub url: String,
}

/// Per-vendor CVSS scores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cvss {
    pub nvd: CvssScore,
    pub redhat: CvssScore,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CvssScore {
    pub v2_vector: Option<String>,
    pub v3_vector: Option<String>,
    pub v2_score: Option<f64>,
    pub v3_score: Option<f64>,
}

/// Emit the aggregate report list as a CI output variable.
///
/// One line on stdout in the GitHub Actions output syntax; everything else
/// this tool prints goes to stderr.
pub fn emit_output<W: Write>(mut out: W, reports: &[ScanReport]) -> Result<()> {
    let json = serde_json::to_string(reports)?;
    writeln!(out, "::set-output name=trivy::{}", json).map_err(GateError::WriteOutput)
}
