//! Eligibility Gate
//!
//! Pure cooldown check against the ledger's view of an identity.

use chrono::{DateTime, Utc};

use crate::types::ClaimRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// Still inside the cooldown window; claims reopen at `until`.
    Blocked { until: DateTime<Utc> },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Decide whether an identity may claim at `now`.
///
/// An absent record is always eligible. A request landing exactly on the end
/// of the cooldown is eligible.
pub fn check_eligibility(
    record: Option<&ClaimRecord>,
    now: DateTime<Utc>,
    cooldown: chrono::Duration,
) -> Eligibility {
    let Some(record) = record else {
        return Eligibility::Eligible;
    };

    let until = record
        .last_claimed_at
        .checked_add_signed(cooldown)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    if now < until {
        Eligibility::Blocked { until }
    } else {
        Eligibility::Eligible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fid;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn absent_record_is_eligible() {
        assert_eq!(check_eligibility(None, t0(), Duration::hours(6)), Eligibility::Eligible);
    }

    #[test]
    fn blocked_inside_window() {
        let record = ClaimRecord::new(Fid(1), t0());
        let now = t0() + Duration::hours(1);
        assert_eq!(
            check_eligibility(Some(&record), now, Duration::hours(6)),
            Eligibility::Blocked { until: t0() + Duration::hours(6) }
        );
    }

    #[test]
    fn boundary_is_eligible() {
        let record = ClaimRecord::new(Fid(1), t0());
        let at_boundary = t0() + Duration::hours(6);
        assert!(check_eligibility(Some(&record), at_boundary, Duration::hours(6)).is_eligible());

        let just_before = at_boundary - Duration::milliseconds(1);
        assert!(!check_eligibility(Some(&record), just_before, Duration::hours(6)).is_eligible());
    }

    #[test]
    fn same_inputs_same_verdict() {
        let record = ClaimRecord::new(Fid(9), t0());
        let now = t0() + Duration::minutes(30);
        let first = check_eligibility(Some(&record), now, Duration::hours(6));
        for _ in 0..5 {
            assert_eq!(check_eligibility(Some(&record), now, Duration::hours(6)), first);
        }
    }

    #[test]
    fn overflowing_cooldown_blocks_forever() {
        let record = ClaimRecord::new(Fid(2), t0());
        let verdict = check_eligibility(Some(&record), t0(), Duration::MAX);
        assert!(!verdict.is_eligible());
    }
}
