//! Run identifier generation

use tracing::debug;
use uuid::Uuid;

/// Generate a time-ordered run identifier
///
/// UUIDv7 so ids sort by creation time in logs and listings.
pub fn generate_run_id() -> String {
    let id = format!("run-{}", Uuid::now_v7());
    debug!(%id, "generate_run_id: called");
    id
}
