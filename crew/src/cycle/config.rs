//! Approval loop configuration

use serde::{Deserialize, Serialize};

/// Default produce-review rounds before the loop gives up
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// What the loop does when a producer or reviewer step fails
///
/// A failed step is never silently counted as an approval. The policy
/// chooses between continuing conservatively and stopping the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// A failed reviewer counts as changes-requested for that iteration;
    /// a failed producer skips the iteration's reviews. The cap still bounds
    /// the run.
    #[default]
    Conservative,

    /// Any step failure aborts the run with the underlying error.
    Abort,
}

/// Configuration for one approval loop
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Maximum produce-review rounds
    pub max_iterations: u32,

    /// Step failure handling
    pub failure_policy: FailurePolicy,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            failure_policy: FailurePolicy::default(),
        }
    }
}
