//! Installment scheduling for institutional debts.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// How often an institutional debt's installment falls due.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }
}

impl TryFrom<&str> for Frequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::InvalidOperation(format!(
                "invalid frequency: {other}"
            ))),
        }
    }
}

/// Computes the next due date after the last applied installment.
///
/// The base is `last` when an installment has already been applied, otherwise
/// `start`; one period is added on top. Pure function, no side effects.
///
/// Monthly periods are calendar months (Jan 31 + 1 month = Feb 28/29), which
/// keeps long schedules anchored to the month rather than drifting by a fixed
/// day count.
pub fn next_occurrence(start: NaiveDate, frequency: Frequency, last: Option<NaiveDate>) -> NaiveDate {
    let base = last.unwrap_or(start);
    let next = match frequency {
        Frequency::Weekly => base.checked_add_days(Days::new(7)),
        Frequency::Biweekly => base.checked_add_days(Days::new(14)),
        Frequency::Monthly => base.checked_add_months(Months::new(1)),
    };
    // Out of chrono's range only near year 262143; saturate so catch-up
    // loops still terminate.
    next.unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_occurrence_is_one_period_after_start() {
        let start = date(2026, 1, 15);
        assert_eq!(
            next_occurrence(start, Frequency::Weekly, None),
            date(2026, 1, 22)
        );
        assert_eq!(
            next_occurrence(start, Frequency::Biweekly, None),
            date(2026, 1, 29)
        );
        assert_eq!(
            next_occurrence(start, Frequency::Monthly, None),
            date(2026, 2, 15)
        );
    }

    #[test]
    fn last_applied_date_wins_over_start() {
        let start = date(2026, 1, 1);
        assert_eq!(
            next_occurrence(start, Frequency::Monthly, Some(date(2026, 4, 1))),
            date(2026, 5, 1)
        );
    }

    #[test]
    fn monthly_clamps_to_end_of_shorter_month() {
        assert_eq!(
            next_occurrence(date(2026, 1, 31), Frequency::Monthly, None),
            date(2026, 2, 28)
        );
    }
}
