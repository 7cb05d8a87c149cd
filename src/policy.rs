//! Policy linking: every declared image ends up with exactly one resolved policy.

use tracing::debug;

use crate::config::{Image, ImagePolicy};

/// Severity levels applied when a policy declares none.
pub const DEFAULT_SEVERITY_LEVELS: [&str; 3] = ["MEDIUM", "HIGH", "CRITICAL"];

/// An image paired with its resolved acceptance policy.
#[derive(Debug, Clone)]
pub struct LinkedImage {
    pub image: Image,
    pub policy: ImagePolicy,
}

/// Link each image to a policy by exact name match.
///
/// First match wins. Images without a matching policy get a synthesized
/// default policy, so the result always maps 1:1.
pub fn link_policies(images: Vec<Image>, policies: &[ImagePolicy]) -> Vec<LinkedImage> {
    images
        .into_iter()
        .map(|image| {
            let policy = resolve_policy(&image, policies);
            LinkedImage { image, policy }
        })
        .collect()
}

fn resolve_policy(image: &Image, policies: &[ImagePolicy]) -> ImagePolicy {
    match policies.iter().find(|p| p.name == image.name) {
        Some(matched) => {
            let mut policy = matched.clone();
            for level in &mut policy.severity_levels {
                *level = level.to_uppercase();
            }
            if policy.severity_levels.is_empty() {
                policy.severity_levels = default_severity_levels();
            }
            debug!(image = %image.name, levels = ?policy.severity_levels, "Matched policy");
            policy
        }
        None => {
            debug!(image = %image.name, "No matching policy, using defaults");
            ImagePolicy {
                name: image.name.clone(),
                severity_levels: default_severity_levels(),
                accepted: Vec::new(),
                ignore_unfixed: false,
            }
        }
    }
}

/// The default severity set as owned strings.
pub fn default_severity_levels() -> Vec<String> {
    DEFAULT_SEVERITY_LEVELS.iter().map(|s| s.to_string()).collect()
}
