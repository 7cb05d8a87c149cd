use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "trivy-gate",
    version,
    about = "Vulnerability gate for container images in CI pipelines",
    long_about = "trivy-gate scans a declared set of container images with trivy, applies \
                  per-image acceptance policies, and fails the pipeline if any non-accepted \
                  vulnerability is found."
)]
pub struct Cli {
    /// Directory containing the image and policy documents
    #[arg(long, env = "WORKING_DIRECTORY", default_value = "/github/workspace")]
    pub working_directory: PathBuf,

    /// File name of the policy document, relative to the working directory
    #[arg(long, env = "RULES_FILE", default_value = "security_rules.yaml")]
    pub rules_file: String,

    /// File name of the image document, relative to the working directory
    #[arg(long, env = "IMAGE_FILE", default_value = "images.yaml")]
    pub image_file: String,
}

impl Cli {
    /// Path to the policy document.
    pub fn rules_path(&self) -> PathBuf {
        self.working_directory.join(&self.rules_file)
    }

    /// Path to the image document.
    pub fn image_path(&self) -> PathBuf {
        self.working_directory.join(&self.image_file)
    }
}
