//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

// Role instruction documents
pub const PRODUCT_LEAD: &str = include_str!("../../prompts/product-lead.pmt");
pub const RESEARCH: &str = include_str!("../../prompts/research.pmt");
pub const LEAD_ENGINEER: &str = include_str!("../../prompts/lead-engineer.pmt");
pub const SOFTWARE_ENGINEER: &str = include_str!("../../prompts/software-engineer.pmt");
pub const SECURITY_ENGINEER: &str = include_str!("../../prompts/security-engineer.pmt");
pub const ANALYST: &str = include_str!("../../prompts/analyst.pmt");
pub const SYNTHESIZER: &str = include_str!("../../prompts/synthesizer.pmt");

// Stage prompts
pub const ANALYSIS: &str = include_str!("../../prompts/analysis.pmt");
pub const MARKET_RESEARCH: &str = include_str!("../../prompts/market-research.pmt");
pub const COMPETITOR_RESEARCH: &str = include_str!("../../prompts/competitor-research.pmt");
pub const SYNTHESIS: &str = include_str!("../../prompts/synthesis.pmt");
pub const PRD_PRODUCT: &str = include_str!("../../prompts/prd-product.pmt");
pub const PRD_FEATURE: &str = include_str!("../../prompts/prd-feature.pmt");
pub const ARCHITECTURE: &str = include_str!("../../prompts/architecture.pmt");
pub const DEVELOPMENT: &str = include_str!("../../prompts/development.pmt");
pub const DEVELOPMENT_REVISION: &str = include_str!("../../prompts/development-revision.pmt");
pub const CODE_REVIEW: &str = include_str!("../../prompts/code-review.pmt");
pub const SECURITY_REVIEW: &str = include_str!("../../prompts/security-review.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "product-lead" => Some(PRODUCT_LEAD),
        "research" => Some(RESEARCH),
        "lead-engineer" => Some(LEAD_ENGINEER),
        "software-engineer" => Some(SOFTWARE_ENGINEER),
        "security-engineer" => Some(SECURITY_ENGINEER),
        "analyst" => Some(ANALYST),
        "synthesizer" => Some(SYNTHESIZER),
        "analysis" => Some(ANALYSIS),
        "market-research" => Some(MARKET_RESEARCH),
        "competitor-research" => Some(COMPETITOR_RESEARCH),
        "synthesis" => Some(SYNTHESIS),
        "prd-product" => Some(PRD_PRODUCT),
        "prd-feature" => Some(PRD_FEATURE),
        "architecture" => Some(ARCHITECTURE),
        "development" => Some(DEVELOPMENT),
        "development-revision" => Some(DEVELOPMENT_REVISION),
        "code-review" => Some(CODE_REVIEW),
        "security-review" => Some(SECURITY_REVIEW),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_role_instructions_embedded() {
        for name in [
            "product-lead",
            "research",
            "lead-engineer",
            "software-engineer",
            "security-engineer",
            "analyst",
            "synthesizer",
        ] {
            assert!(get_embedded(name).is_some(), "missing instructions: {}", name);
        }
    }

    #[test]
    fn test_all_stage_prompts_embedded() {
        for name in [
            "analysis",
            "market-research",
            "competitor-research",
            "synthesis",
            "prd-product",
            "prd-feature",
            "architecture",
            "development",
            "development-revision",
            "code-review",
            "security-review",
        ] {
            assert!(get_embedded(name).is_some(), "missing stage prompt: {}", name);
        }
    }

    #[test]
    fn test_review_prompts_carry_status_markers() {
        assert!(get_embedded("code-review").unwrap().contains("CHANGES_REQUESTED"));
        assert!(get_embedded("security-review").unwrap().contains("CHANGES_REQUIRED"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
