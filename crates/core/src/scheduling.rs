//! Job scheduling constants and state machines.
//!
//! This module lives in `core` (zero internal deps) so it can be used by
//! both the persistence layer and the dispatcher without either depending
//! on the other.

// ---------------------------------------------------------------------------
// Priority constants
// ---------------------------------------------------------------------------

/// Priority value for administrator-issued jobs. Dispatched before any
/// normal-priority job queued later, but never preempting a running one.
pub const PRIORITY_ADMIN: i32 = 10;

/// Priority value for normal jobs. Default.
pub const PRIORITY_NORMAL: i32 = 0;

// ---------------------------------------------------------------------------
// Job state machine
// ---------------------------------------------------------------------------

/// Job status IDs matching `job_statuses` seed data (1-based SMALLSERIAL).
///
/// The state machine is intentionally duplicated from the `db` crate's
/// `JobStatus` enum because `core` must have zero internal deps.
pub mod job_state {
    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Terminal states (Succeeded=3, Failed=4, Cancelled=5) return an empty
    /// slice because no further transitions are allowed. The transient-retry
    /// path stays inside Running and is not a status transition.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Queued -> Running, Cancelled
            1 => &[2, 5],
            // Running -> Succeeded, Failed
            2 => &[3, 4],
            // Terminal states: Succeeded, Failed, Cancelled
            3 | 4 | 5 => &[],
            // Unknown status: no transitions allowed
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Whether a status ID is terminal (succeeded, failed, or cancelled).
    pub fn is_terminal(status: i16) -> bool {
        matches!(status, 3 | 4 | 5)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            let from_name = status_name(from);
            let to_name = status_name(to);
            Err(format!(
                "Invalid transition: {from_name} ({from}) -> {to_name} ({to})"
            ))
        }
    }

    /// Human-readable name for a status ID (for error messages).
    fn status_name(id: i16) -> &'static str {
        match id {
            1 => "Queued",
            2 => "Running",
            3 => "Succeeded",
            4 => "Failed",
            5 => "Cancelled",
            _ => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Broadcast state machine
// ---------------------------------------------------------------------------

/// Broadcast status IDs matching `broadcast_statuses` seed data.
pub mod broadcast_state {
    /// Valid target statuses reachable from `from_status`.
    ///
    /// A broadcast finishes as Completed (3) only when every target
    /// delivered; any failed target makes it PartiallyFailed (4).
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            // Pending -> InProgress
            1 => &[2],
            // InProgress -> Completed, PartiallyFailed
            2 => &[3, 4],
            // Terminal: Completed, PartiallyFailed
            3 | 4 => &[],
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::broadcast_state;
    use super::job_state::*;

    // -- valid job transitions ----------------------------------------------

    #[test]
    fn queued_to_running() {
        assert!(can_transition(1, 2));
    }

    #[test]
    fn queued_to_cancelled() {
        assert!(can_transition(1, 5));
    }

    #[test]
    fn running_to_succeeded() {
        assert!(can_transition(2, 3));
    }

    #[test]
    fn running_to_failed() {
        assert!(can_transition(2, 4));
    }

    // -- terminal job states have no outgoing transitions -------------------

    #[test]
    fn succeeded_has_no_transitions() {
        assert!(valid_transitions(3).is_empty());
    }

    #[test]
    fn failed_has_no_transitions() {
        assert!(valid_transitions(4).is_empty());
    }

    #[test]
    fn cancelled_has_no_transitions() {
        assert!(valid_transitions(5).is_empty());
    }

    // -- invalid job transitions --------------------------------------------

    #[test]
    fn running_to_cancelled_invalid() {
        // Cancellation is queue-side only; a running job always resolves
        // through the provider call.
        assert!(!can_transition(2, 5));
    }

    #[test]
    fn queued_to_succeeded_invalid() {
        assert!(!can_transition(1, 3));
    }

    #[test]
    fn cancelled_to_running_invalid() {
        assert!(!can_transition(5, 2));
    }

    #[test]
    fn nothing_reenters_queued() {
        for from in 1..=5 {
            assert!(!can_transition(from, 1));
        }
    }

    // -- terminality ---------------------------------------------------------

    #[test]
    fn terminal_statuses() {
        assert!(!is_terminal(1));
        assert!(!is_terminal(2));
        assert!(is_terminal(3));
        assert!(is_terminal(4));
        assert!(is_terminal(5));
    }

    // -- validate_transition returns descriptive error -----------------------

    #[test]
    fn validate_transition_ok() {
        assert!(validate_transition(1, 2).is_ok());
    }

    #[test]
    fn validate_transition_err() {
        let err = validate_transition(3, 2).unwrap_err();
        assert!(err.contains("Succeeded"));
        assert!(err.contains("Running"));
    }

    #[test]
    fn unknown_status_has_no_transitions() {
        assert!(valid_transitions(99).is_empty());
    }

    // -- broadcast transitions ----------------------------------------------

    #[test]
    fn broadcast_pending_to_in_progress() {
        assert!(broadcast_state::can_transition(1, 2));
    }

    #[test]
    fn broadcast_in_progress_to_completed() {
        assert!(broadcast_state::can_transition(2, 3));
    }

    #[test]
    fn broadcast_in_progress_to_partially_failed() {
        assert!(broadcast_state::can_transition(2, 4));
    }

    #[test]
    fn broadcast_completed_is_terminal() {
        assert!(broadcast_state::valid_transitions(3).is_empty());
        assert!(broadcast_state::valid_transitions(4).is_empty());
    }

    #[test]
    fn broadcast_pending_cannot_complete_directly() {
        assert!(!broadcast_state::can_transition(1, 3));
    }
}
