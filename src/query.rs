//! Read-only key existence check.
//!
//! Purely a filesystem check: rc 0 with `{"exists": true}` on stdout when
//! the supplied key path exists, rc 2 ("unknown/not found", distinct from a
//! tool-execution failure) otherwise. No external process is invoked and
//! nothing is mutated.

use crate::config::InfoParams;
use crate::reconcile::ReconciliationResult;

pub const RC_FOUND: i32 = 0;
pub const RC_NOT_FOUND: i32 = 2;

pub fn key_info(params: &InfoParams) -> ReconciliationResult {
    let exists = params
        .user_key
        .as_deref()
        .map(|path| path.exists())
        .unwrap_or(false);

    if exists {
        ReconciliationResult {
            rc: RC_FOUND,
            stdout: serde_json::json!({ "exists": true }).to_string(),
            ..Default::default()
        }
    } else {
        ReconciliationResult {
            rc: RC_NOT_FOUND,
            ..Default::default()
        }
    }
}
