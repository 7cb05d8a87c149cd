//! Declarative documents: the image list and the per-image acceptance policies.
//!
//! Both documents are parsed strictly: a field that is not part of the schema
//! fails the whole load, so a typo in a rule file cannot silently disable it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{GateError, Result};

/// A declared container image, identified by digest per architecture.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Image {
    /// Registry host, e.g. `reg.example.com`. Omitted for default-registry images.
    #[serde(default)]
    pub registry: Option<String>,
    /// Image name. Also the join key for policy matching.
    pub name: String,
    /// Per-architecture manifest digests.
    pub digests: Digests,
}

/// The fixed set of architecture digests declared per image.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Digests {
    pub amd64: String,
    pub arm64: String,
}

impl Digests {
    /// Architecture label and digest pairs, in scan order.
    pub fn entries(&self) -> [(&'static str, &str); 2] {
        [("amd64", &self.amd64), ("arm64", &self.arm64)]
    }
}

/// A vulnerability-acceptance policy for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagePolicy {
    /// Image name this policy applies to.
    pub name: String,
    /// Severity levels the scan should report. Normalized to uppercase when linked.
    #[serde(default, rename = "severityLevels")]
    pub severity_levels: Vec<String>,
    /// Individually accepted vulnerabilities, passed to the scanner as an ignore list.
    #[serde(default, rename = "acceptedSeverities")]
    pub accepted: Vec<AcceptedVulnerability>,
    /// Parsed for schema compatibility; not consumed by the orchestration.
    #[serde(default, rename = "ignoreUnfixed")]
    pub ignore_unfixed: bool,
}

/// One accepted vulnerability with its audit justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptedVulnerability {
    pub cve: String,
    pub reason: String,
}

/// The two parsed input documents.
#[derive(Debug)]
pub struct Documents {
    pub images: Vec<Image>,
    pub policies: Vec<ImagePolicy>,
}

/// Load the policy and image documents from the working directory.
///
/// A missing policy document is not an error: the run proceeds with default
/// policies for every image. A missing image document is fatal.
pub fn load_documents(rules_path: &Path, image_path: &Path) -> Result<Documents> {
    let policies = match read_document(rules_path) {
        Ok(content) => parse_yaml_list(rules_path, &content)?,
        Err(GateError::ReadFile { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            info!("No security rules found, proceeding with defaults.");
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    let content = read_document(image_path)?;
    let images = parse_yaml_list(image_path, &content)?;

    Ok(Documents { images, policies })
}

/// Read a document and log every line verbatim for the pipeline audit trail.
fn read_document(path: &Path) -> Result<String> {
    info!("Opening file from {}...", path.display());
    let content = fs::read_to_string(path).map_err(|e| GateError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    for line in content.lines() {
        info!("{}", line);
    }
    Ok(content)
}

/// Parse a YAML list document strictly. An empty document is an empty list.
fn parse_yaml_list<T: for<'de> Deserialize<'de>>(path: &Path, content: &str) -> Result<Vec<T>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(content).map_err(|e| GateError::ParseYaml {
        path: path.display().to_string(),
        source: e,
    })
}
