use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::VotingError;

/// The daily window during which a poll accepts votes.
///
/// Both ends are times of day with no date component, compared against
/// a time of day taken from the same clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollWindow {
    /// Poll opens.
    pub start_time: NaiveTime,
    /// Poll closes.
    pub end_time: NaiveTime,
}

impl PollWindow {
    /// Create a window, rejecting any where the start is not strictly before the end.
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Result<Self, VotingError> {
        if start_time >= end_time {
            return Err(VotingError::ValidationFailed(format!(
                "start time {start_time} must be before end time {end_time}"
            )));
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    /// Is the poll open at `now`?
    ///
    /// Inclusive at both ends: a poll running 08:00-16:00 is open at exactly
    /// 08:00:00 and at exactly 16:00:00. A window whose start equals its end
    /// is open only at that instant; one whose start is after its end is
    /// never open.
    pub fn contains(&self, now: NaiveTime) -> bool {
        self.start_time <= now && now <= self.end_time
    }
}

impl Default for PollWindow {
    /// 08:00 to 16:00.
    fn default() -> Self {
        Self {
            start_time: NaiveTime::from_hms_opt(8, 0, 0).expect("08:00:00 is a valid time"),
            end_time: NaiveTime::from_hms_opt(16, 0, 0).expect("16:00:00 is a valid time"),
        }
    }
}

/// Is a poll with the given window open at `now`?
pub fn is_active(window: &PollWindow, now: NaiveTime) -> bool {
    window.contains(now)
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
    fn open_inside_window() {
        for now in [hms(8, 0, 1), hms(12, 0, 0), hms(15, 59, 59)] {
            assert!(is_active(&window(), now), "{now} should be active");
        }
    }

    #[test]
    fn closed_outside_window() {
        for now in [
            NaiveTime::MIN,
            hms(7, 59, 59),
            hms(16, 0, 1),
            hms(23, 59, 59),
        ] {
            assert!(!is_active(&window(), now), "{now} should be inactive");
        }
    }

    #[test]
    fn edges_are_inclusive() {
        assert!(is_active(&window(), hms(8, 0, 0)));
        assert!(is_active(&window(), hms(16, 0, 0)));
        let just_after = hms(16, 0, 0) + chrono::Duration::nanoseconds(1);
        assert!(!is_active(&window(), just_after));
    }

    #[test]
    fn degenerate_windows() {
        // Start equal to end: open only at that instant.
        let instant = PollWindow {
            start_time: hms(9, 0, 0),
            end_time: hms(9, 0, 0),
        };
        assert!(instant.contains(hms(9, 0, 0)));
        assert!(!instant.contains(hms(9, 0, 1)));
        assert!(!instant.contains(hms(8, 59, 59)));

        // Start after end: never open.
        let inverted = PollWindow {
            start_time: hms(16, 0, 0),
            end_time: hms(8, 0, 0),
        };
        for now in [hms(0, 0, 0), hms(8, 0, 0), hms(12, 0, 0), hms(16, 0, 0)] {
            assert!(!inverted.contains(now));
        }
    }

    #[test]
    fn new_rejects_bad_order() {
        assert!(matches!(
            PollWindow::new(hms(9, 0, 0), hms(9, 0, 0)),
            Err(VotingError::ValidationFailed(_))
        ));
        assert!(matches!(
            PollWindow::new(hms(10, 0, 0), hms(9, 0, 0)),
            Err(VotingError::ValidationFailed(_))
        ));
        assert!(PollWindow::new(hms(9, 0, 0), hms(9, 0, 1)).is_ok());
    }

    #[test]
    fn default_is_office_hours() {
        let default = PollWindow::default();
        assert_eq!(default, window());
    }
}
