//! Deterministic artifact path scheme
//!
//! Every artifact in the target repository lives at a path derived from the
//! product name, so revision iterations overwrite the same file instead of
//! accumulating versioned copies. The producer/reviewer re-read-after-revise
//! protocol depends on this.

use tracing::debug;

/// Maximum slug length for artifact file names
const SLUG_MAX_LEN: usize = 30;

/// Directory in the target repo that holds pipeline artifacts
pub const DEV_TEAM_DIR: &str = ".dev-team";

/// Slugify a product name for use in file names
///
/// Lower-cased, spaces and slashes replaced with underscores, truncated.
pub fn safe_name(product_name: &str) -> String {
    debug!(%product_name, "safe_name: called");
    let slug: String = product_name.to_lowercase().replace([' ', '/'], "_");
    slug.chars().take(SLUG_MAX_LEN).collect()
}

/// Artifact locations for one product in the target repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Implementation file written by the Software Engineer
    pub code: String,

    /// Review file written by the Lead Engineer
    pub code_review: String,

    /// Review file written by the Security Engineer
    pub security_review: String,
}

impl ArtifactPaths {
    /// Derive the artifact paths for a product
    ///
    /// `extension` is the implementation file extension (no leading dot),
    /// chosen from the target language.
    pub fn for_product(product_name: &str, extension: &str) -> Self {
        debug!(%product_name, %extension, "ArtifactPaths::for_product: called");
        let slug = safe_name(product_name);

        Self {
            code: format!("{DEV_TEAM_DIR}/implementations/software_engineer_{slug}.{extension}"),
            code_review: format!("{DEV_TEAM_DIR}/code_reviews/lead_engineer_review_{slug}.md"),
            security_review: format!("{DEV_TEAM_DIR}/security_reviews/security_engineer_review_{slug}.md"),
        }
    }
}
