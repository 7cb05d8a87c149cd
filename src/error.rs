use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Failed to read file: {path}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML document: {path}")]
    ParseYaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to create temporary file for {purpose}")]
    TempFile {
        purpose: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write ignore list")]
    WriteIgnoreList(#[source] std::io::Error),

    #[error("Failed to launch scanner: {command}")]
    ScannerLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Scanner failed for {reference} ({status}): {stderr}")]
    ScannerFailed {
        reference: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Failed to parse scan report for {reference}")]
    ParseReport {
        reference: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write pipeline output")]
    WriteOutput(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GateError>;
