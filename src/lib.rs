pub mod cli;
pub mod config;
pub mod error;
pub mod policy;
pub mod report;
pub mod run;
pub mod scanner;

pub use cli::Cli;
pub use config::{AcceptedVulnerability, Digests, Documents, Image, ImagePolicy};
pub use error::{GateError, Result};
pub use policy::{DEFAULT_SEVERITY_LEVELS, LinkedImage, link_policies};
pub use report::{ScanReport, emit_output};
pub use run::{GateOutcome, ScanContext, run};
pub use scanner::{TrivyRunner, full_reference};
