//! Agent role definitions

use tracing::debug;

/// The delivery-team roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    /// Defines goals, boundaries, and requirements documents
    ProductLead,
    /// Market and competitor research
    Research,
    /// Technical architecture and code review
    LeadEngineer,
    /// Implementation and revisions
    SoftwareEngineer,
    /// Security review
    SecurityEngineer,
}

impl AgentRole {
    /// All roles in pipeline order
    pub fn all() -> [AgentRole; 5] {
        [
            AgentRole::ProductLead,
            AgentRole::Research,
            AgentRole::LeadEngineer,
            AgentRole::SoftwareEngineer,
            AgentRole::SecurityEngineer,
        ]
    }

    /// Display name for this role
    pub fn name(&self) -> &'static str {
        debug!(?self, "AgentRole::name: called");
        match self {
            Self::ProductLead => "Product Lead",
            Self::Research => "Research",
            Self::LeadEngineer => "Lead Engineer",
            Self::SoftwareEngineer => "Software Engineer",
            Self::SecurityEngineer => "Security Engineer",
        }
    }

    /// One-line role description
    pub fn description(&self) -> &'static str {
        debug!(?self, "AgentRole::description: called");
        match self {
            Self::ProductLead => "Defines goals and requirements, creates PRDs, sets scope boundaries",
            Self::Research => "Performs market analysis, competitor research, and information synthesis",
            Self::LeadEngineer => "Designs technical architecture, reviews code for quality and alignment",
            Self::SoftwareEngineer => "Implements code, fixes bugs, addresses review feedback",
            Self::SecurityEngineer => "Reviews code for vulnerabilities and secure coding practices",
        }
    }

    /// Name of the instruction template for this role
    pub fn instructions_template(&self) -> &'static str {
        debug!(?self, "AgentRole::instructions_template: called");
        match self {
            Self::ProductLead => "product-lead",
            Self::Research => "research",
            Self::LeadEngineer => "lead-engineer",
            Self::SoftwareEngineer => "software-engineer",
            Self::SecurityEngineer => "security-engineer",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_roles_have_metadata() {
        for role in AgentRole::all() {
            assert!(!role.name().is_empty());
            assert!(!role.description().is_empty());
            assert!(!role.instructions_template().is_empty());
        }
    }

    #[test]
    fn test_template_names_are_distinct() {
        let mut names: Vec<_> = AgentRole::all().iter().map(|r| r.instructions_template()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(AgentRole::SoftwareEngineer.to_string(), "Software Engineer");
    }
}
