//! Convergence verification between host and mirror snapshots.
//!
//! Both sides can compute a [`StateDigest`] of what they hold. Equal
//! digests mean the mirror has caught up with the host; this is what the
//! fallback path (`REQUEST_FULL_STATE` → `STATE_UPDATE`) must restore.

use serde_json::Value;
use statebridge_core::StateDigest;

/// Result of comparing a mirror snapshot against the host's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Both sides hold identical state.
    Converged(StateDigest),
    /// The mirror has not received any snapshot yet.
    Uninitialized,
    /// The mirror is behind or diverged.
    Diverged {
        host: StateDigest,
        mirror: StateDigest,
    },
}

impl ConvergenceResult {
    /// Check if the mirror has converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged(_))
    }
}

/// Compare the host's authoritative snapshot with a mirror's.
pub fn verify_convergence(host: &Value, mirror: Option<&Value>) -> ConvergenceResult {
    let Some(mirror) = mirror else {
        return ConvergenceResult::Uninitialized;
    };

    let host_digest = StateDigest::of(host);
    let mirror_digest = StateDigest::of(mirror);
    if host_digest == mirror_digest {
        ConvergenceResult::Converged(host_digest)
    } else {
        ConvergenceResult::Diverged {
            host: host_digest,
            mirror: mirror_digest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_converged() {
        let state = json!({ "count": 1 });
        assert!(verify_convergence(&state, Some(&state)).is_converged());
    }

    #[test]
    fn test_diverged() {
        let result = verify_convergence(&json!({ "count": 2 }), Some(&json!({ "count": 1 })));
        assert!(matches!(result, ConvergenceResult::Diverged { .. }));
        assert!(!result.is_converged());
    }

    #[test]
    fn test_uninitialized() {
        assert_eq!(
            verify_convergence(&json!({}), None),
            ConvergenceResult::Uninitialized
        );
    }
}
