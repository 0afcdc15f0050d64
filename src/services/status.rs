use chrono::NaiveDateTime;

use crate::models::{BookingStatus, STEPS};

/// Elapsed-minute thresholds driving the simulated dispatch timeline. The
/// defaults encode the demo "same-day, ~8 minute" promise; a real dispatch
/// system would supply its own numbers.
#[derive(Clone, Copy, Debug)]
pub struct AdvancePolicy {
    pub accepted_after_minutes: f64,
    pub in_progress_after_minutes: f64,
    pub completed_after_minutes: f64,
}

impl Default for AdvancePolicy {
    fn default() -> Self {
        Self {
            accepted_after_minutes: 2.0,
            in_progress_after_minutes: 4.0,
            completed_after_minutes: 8.0,
        }
    }
}

/// A pending transition computed from elapsed time. Applying it means writing
/// the new status/eta/note and appending exactly one history row.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    pub status: BookingStatus,
    pub eta_minutes: i64,
    pub note: &'static str,
}

/// Derives the status a booking should hold after `now - created_at` minutes.
/// Pure, so concurrent readers all compute the same target; re-applying a
/// result that matches the current status is a no-op by contract (None here).
/// Never yields `Cancelled` -- cancellation is a manual act only.
pub fn evaluate(
    policy: &AdvancePolicy,
    status: BookingStatus,
    created_at: &NaiveDateTime,
    now: &NaiveDateTime,
) -> Option<Advance> {
    if matches!(status, BookingStatus::Completed | BookingStatus::Cancelled) {
        return None;
    }

    let elapsed = (*now - *created_at).num_seconds() as f64 / 60.0;

    let next = if elapsed >= policy.completed_after_minutes {
        Advance {
            status: BookingStatus::Completed,
            eta_minutes: 0,
            note: "Work completed",
        }
    } else if elapsed >= policy.in_progress_after_minutes {
        Advance {
            status: BookingStatus::InProgress,
            eta_minutes: ((15.0 - elapsed * 2.0).ceil() as i64).max(5),
            note: "Worker en-route",
        }
    } else if elapsed >= policy.accepted_after_minutes {
        Advance {
            status: BookingStatus::Accepted,
            eta_minutes: ((25.0 - elapsed * 3.0).ceil() as i64).max(10),
            note: "Worker assigned",
        }
    } else {
        return None;
    };

    if next.status == status {
        return None;
    }
    Some(next)
}

/// Position in STEPS for progress displays; statuses outside the forward
/// sequence (cancelled) render as step 0.
pub fn current_step(status: BookingStatus) -> usize {
    STEPS.iter().position(|s| *s == status).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(created: NaiveDateTime, minutes: i64) -> NaiveDateTime {
        created + Duration::minutes(minutes)
    }

    fn created() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn holds_requested_before_first_threshold() {
        let policy = AdvancePolicy::default();
        let c = created();
        assert_eq!(
            evaluate(&policy, BookingStatus::Requested, &c, &at(c, 1)),
            None
        );
    }

    #[test]
    fn advances_through_thresholds() {
        let policy = AdvancePolicy::default();
        let c = created();

        let a = evaluate(&policy, BookingStatus::Requested, &c, &at(c, 3)).unwrap();
        assert_eq!(a.status, BookingStatus::Accepted);
        assert_eq!(a.note, "Worker assigned");
        // ceil(25 - 3*3) = 16
        assert_eq!(a.eta_minutes, 16);

        let a = evaluate(&policy, BookingStatus::Requested, &c, &at(c, 5)).unwrap();
        assert_eq!(a.status, BookingStatus::InProgress);
        assert_eq!(a.note, "Worker en-route");
        // ceil(15 - 5*2) = 5
        assert_eq!(a.eta_minutes, 5);

        let a = evaluate(&policy, BookingStatus::Requested, &c, &at(c, 9)).unwrap();
        assert_eq!(a.status, BookingStatus::Completed);
        assert_eq!(a.eta_minutes, 0);
        assert_eq!(a.note, "Work completed");
    }

    #[test]
    fn eta_is_clamped() {
        let policy = AdvancePolicy::default();
        let c = created();

        // At 7.9 minutes, 15 - 15.8 goes negative; clamp to 5.
        let now = c + Duration::seconds(7 * 60 + 54);
        let a = evaluate(&policy, BookingStatus::Accepted, &c, &now).unwrap();
        assert_eq!(a.status, BookingStatus::InProgress);
        assert_eq!(a.eta_minutes, 5);

        // Just shy of 4 minutes: still the accepted branch.
        // ceil(25 - 3.9833*3) = 14
        let now = c + Duration::seconds(3 * 60 + 59);
        let a = evaluate(&policy, BookingStatus::Requested, &c, &now).unwrap();
        assert_eq!(a.status, BookingStatus::Accepted);
        assert_eq!(a.eta_minutes, 14);
    }

    #[test]
    fn no_transition_when_target_equals_current() {
        let policy = AdvancePolicy::default();
        let c = created();
        assert_eq!(
            evaluate(&policy, BookingStatus::Accepted, &c, &at(c, 3)),
            None
        );
        assert_eq!(
            evaluate(&policy, BookingStatus::InProgress, &c, &at(c, 5)),
            None
        );
    }

    #[test]
    fn terminal_states_never_move() {
        let policy = AdvancePolicy::default();
        let c = created();
        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            assert_eq!(evaluate(&policy, status, &c, &at(c, 60)), None);
        }
    }

    #[test]
    fn never_advances_into_cancelled() {
        let policy = AdvancePolicy::default();
        let c = created();
        for minutes in 0..30 {
            if let Some(a) = evaluate(&policy, BookingStatus::Requested, &c, &at(c, minutes)) {
                assert_ne!(a.status, BookingStatus::Cancelled);
            }
        }
    }

    #[test]
    fn step_index_matches_steps_order() {
        assert_eq!(current_step(BookingStatus::Requested), 0);
        assert_eq!(current_step(BookingStatus::Accepted), 1);
        assert_eq!(current_step(BookingStatus::InProgress), 2);
        assert_eq!(current_step(BookingStatus::Completed), 3);
        assert_eq!(current_step(BookingStatus::Cancelled), 0);
    }
}
