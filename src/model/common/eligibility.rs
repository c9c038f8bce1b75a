//! Rules deciding who may join, leave, or vote in a poll, and when.
//!
//! Every rule takes the current time of day explicitly; nothing here reads a clock.

use chrono::NaiveTime;

use super::{PollWindow, VotingError};

/// Voters may only be registered while the poll is closed.
pub fn can_add_voter(window: &PollWindow, now: NaiveTime) -> Result<(), VotingError> {
    if window.contains(now) {
        Err(VotingError::PollActive)
    } else {
        Ok(())
    }
}

/// Voters may only be removed while the poll is closed, so that nobody is
/// struck off the roll mid-vote.
pub fn can_remove_voter(window: &PollWindow, now: NaiveTime) -> Result<(), VotingError> {
    can_add_voter(window, now)
}

/// May this voter cast a vote for this candidate right now?
///
/// Checks are made in a fixed order: a voter who has already voted is told so
/// even if the poll has since closed.
pub fn can_cast_vote(
    window: &PollWindow,
    already_voted: bool,
    candidate_in_poll: bool,
    candidate: &str,
    now: NaiveTime,
) -> Result<(), VotingError> {
    if already_voted {
        return Err(VotingError::AlreadyVoted);
    }
    if !window.contains(now) {
        return Err(VotingError::PollInactive);
    }
    if !candidate_in_poll {
        return Err(VotingError::CandidateNotFound(candidate.to_string()));
    }
    Ok(())
}

/// Work out the window a poll ends up with when an admin asks to change it to `requested`.
///
/// While the poll is open only the end time may move; the requested start
/// time is ignored. While it is closed both may move, but not to a start time
/// that has already passed today.
pub fn check_window_update(
    current: &PollWindow,
    requested: &PollWindow,
    now: NaiveTime,
) -> Result<PollWindow, VotingError> {
    if current.contains(now) {
        return PollWindow::new(current.start_time, requested.end_time);
    }
    if now > requested.start_time {
        return Err(VotingError::ValidationFailed(
            "Poll has already started. Start time can not be updated".to_string(),
        ));
    }
    PollWindow::new(requested.start_time, requested.end_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn window() -> PollWindow {
        PollWindow::new(hms(8, 0, 0), hms(16, 0, 0)).unwrap()
    }

    #[test]
    fn voters_added_only_while_closed() {
        assert_eq!(can_add_voter(&window(), hms(7, 0, 0)), Ok(()));
        assert_eq!(can_add_voter(&window(), hms(17, 0, 0)), Ok(()));
        assert_eq!(
            can_add_voter(&window(), hms(12, 0, 0)),
            Err(VotingError::PollActive)
        );
        // Boundaries follow the activity window.
        assert_eq!(
            can_add_voter(&window(), hms(8, 0, 0)),
            Err(VotingError::PollActive)
        );
        assert_eq!(
            can_add_voter(&window(), hms(16, 0, 0)),
            Err(VotingError::PollActive)
        );
    }

    #[test]
    fn voters_removed_only_while_closed() {
        assert_eq!(can_remove_voter(&window(), hms(7, 59, 59)), Ok(()));
        assert_eq!(
            can_remove_voter(&window(), hms(9, 30, 0)),
            Err(VotingError::PollActive)
        );
    }

    #[test]
    fn cast_allowed_in_window() {
        assert_eq!(
            can_cast_vote(&window(), false, true, "Alice", hms(10, 0, 0)),
            Ok(())
        );
    }

    #[test]
    fn cast_error_ordering() {
        // Already voted wins over everything.
        assert_eq!(
            can_cast_vote(&window(), true, false, "Alice", hms(20, 0, 0)),
            Err(VotingError::AlreadyVoted)
        );
        // Then inactivity.
        assert_eq!(
            can_cast_vote(&window(), false, false, "Alice", hms(20, 0, 0)),
            Err(VotingError::PollInactive)
        );
        // Then the candidate.
        assert_eq!(
            can_cast_vote(&window(), false, false, "Alice", hms(10, 0, 0)),
            Err(VotingError::CandidateNotFound("Alice".to_string()))
        );
    }

    #[test]
    fn update_while_open_only_moves_end() {
        let requested = PollWindow::new(hms(6, 0, 0), hms(18, 0, 0)).unwrap();
        let updated = check_window_update(&window(), &requested, hms(12, 0, 0)).unwrap();
        assert_eq!(updated.start_time, hms(8, 0, 0));
        assert_eq!(updated.end_time, hms(18, 0, 0));

        // The end can't be dragged before the start.
        let requested = PollWindow {
            start_time: hms(6, 0, 0),
            end_time: hms(7, 0, 0),
        };
        assert!(matches!(
            check_window_update(&window(), &requested, hms(12, 0, 0)),
            Err(VotingError::ValidationFailed(_))
        ));
    }

    #[test]
    fn update_while_closed() {
        let requested = PollWindow::new(hms(9, 0, 0), hms(17, 0, 0)).unwrap();
        assert_eq!(
            check_window_update(&window(), &requested, hms(7, 0, 0)),
            Ok(requested)
        );

        // A start time already behind us is refused.
        assert!(matches!(
            check_window_update(&window(), &requested, hms(18, 0, 0)),
            Err(VotingError::ValidationFailed(_))
        ));
    }
}
