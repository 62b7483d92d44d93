//! Reporting period selectors and their resolution to absolute dates.
//!
//! Relative windows follow one calendar policy:
//!
//! - `last_N_days`: the N days ending yesterday, inclusive
//! - `this_month`: first of the current month through today
//! - `last_month`: first through last day of the previous calendar month
//!
//! Resolution is pure given `today`; callers re-resolve at submission time
//! instead of caching a range computed while the definition was built.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{ModelError, Result};

/// Length of the default custom window.
pub const DEFAULT_CUSTOM_DAYS: u64 = 7;

/// Symbolic period kind, as picked in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodSelector {
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_14_days")]
    Last14Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_90_days")]
    Last90Days,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "last_month")]
    LastMonth,
    #[serde(rename = "custom")]
    Custom,
}

impl PeriodSelector {
    pub const ALL: [PeriodSelector; 7] = [
        Self::Last7Days,
        Self::Last14Days,
        Self::Last30Days,
        Self::Last90Days,
        Self::ThisMonth,
        Self::LastMonth,
        Self::Custom,
    ];

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Last7Days => "last_7_days",
            Self::Last14Days => "last_14_days",
            Self::Last30Days => "last_30_days",
            Self::Last90Days => "last_90_days",
            Self::ThisMonth => "this_month",
            Self::LastMonth => "last_month",
            Self::Custom => "custom",
        }
    }

    const fn trailing_days(self) -> Option<u64> {
        match self {
            Self::Last7Days => Some(7),
            Self::Last14Days => Some(14),
            Self::Last30Days => Some(30),
            Self::Last90Days => Some(90),
            Self::ThisMonth | Self::LastMonth | Self::Custom => None,
        }
    }
}

impl fmt::Display for PeriodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for PeriodSelector {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|selector| selector.wire_name() == wanted)
            .ok_or_else(|| ModelError::UnknownPeriod(s.to_string()))
    }
}

/// What to do with a custom range that reaches past today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureDatePolicy {
    /// Future bounds are a validation error.
    #[default]
    Reject,
    /// Future bounds pass through; the fetch simply finds no data there.
    Allow,
}

/// Absolute, inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl DateRange {
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Result<Self> {
        if date_from > date_to {
            return Err(ModelError::InvertedRange { date_from, date_to });
        }
        Ok(Self { date_from, date_to })
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.date_to - self.date_from).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.date_from, self.date_to)
    }
}

/// The report's single shared period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Period {
    #[default]
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_14_days")]
    Last14Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_90_days")]
    Last90Days,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "last_month")]
    LastMonth,
    /// Explicit bounds; an unset bound falls back to the default window.
    #[serde(rename = "custom")]
    Custom {
        #[serde(default)]
        date_from: Option<NaiveDate>,
        #[serde(default)]
        date_to: Option<NaiveDate>,
    },
}

/// One broken invariant of a custom period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodViolation {
    /// `date_from` or `date_to`.
    pub field: &'static str,
    pub error: ModelError,
}

impl Period {
    pub fn from_selector(selector: PeriodSelector, custom: Option<(NaiveDate, NaiveDate)>) -> Self {
        match selector {
            PeriodSelector::Last7Days => Self::Last7Days,
            PeriodSelector::Last14Days => Self::Last14Days,
            PeriodSelector::Last30Days => Self::Last30Days,
            PeriodSelector::Last90Days => Self::Last90Days,
            PeriodSelector::ThisMonth => Self::ThisMonth,
            PeriodSelector::LastMonth => Self::LastMonth,
            PeriodSelector::Custom => Self::Custom {
                date_from: custom.map(|(from, _)| from),
                date_to: custom.map(|(_, to)| to),
            },
        }
    }

    pub fn custom(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self::Custom {
            date_from: Some(date_from),
            date_to: Some(date_to),
        }
    }

    pub fn selector(&self) -> PeriodSelector {
        match self {
            Self::Last7Days => PeriodSelector::Last7Days,
            Self::Last14Days => PeriodSelector::Last14Days,
            Self::Last30Days => PeriodSelector::Last30Days,
            Self::Last90Days => PeriodSelector::Last90Days,
            Self::ThisMonth => PeriodSelector::ThisMonth,
            Self::LastMonth => PeriodSelector::LastMonth,
            Self::Custom { .. } => PeriodSelector::Custom,
        }
    }

    /// Resolve to absolute dates as of `today`.
    pub fn resolve(&self, today: NaiveDate, policy: FutureDatePolicy) -> Result<DateRange> {
        match *self {
            Self::Custom { date_from, date_to } => {
                let (from, to) = custom_bounds(date_from, date_to, today)?;
                if let Some(violation) = check_custom(from, to, today, policy).into_iter().next() {
                    return Err(violation.error);
                }
                Ok(DateRange {
                    date_from: from,
                    date_to: to,
                })
            }
            Self::ThisMonth => Ok(DateRange {
                date_from: first_of_month(today)?,
                date_to: today,
            }),
            Self::LastMonth => {
                let last = first_of_month(today)?
                    .pred_opt()
                    .ok_or(ModelError::DateOutOfRange(today))?;
                Ok(DateRange {
                    date_from: first_of_month(last)?,
                    date_to: last,
                })
            }
            relative => {
                let days = relative
                    .selector()
                    .trailing_days()
                    .ok_or(ModelError::DateOutOfRange(today))?;
                Ok(DateRange {
                    date_from: minus_days(today, days)?,
                    date_to: minus_days(today, 1)?,
                })
            }
        }
    }

    /// Every invariant violation of a custom period, in field order.
    ///
    /// Relative selectors never violate anything.
    pub fn violations(&self, today: NaiveDate, policy: FutureDatePolicy) -> Vec<PeriodViolation> {
        let Self::Custom { date_from, date_to } = *self else {
            return Vec::new();
        };
        match custom_bounds(date_from, date_to, today) {
            Ok((from, to)) => check_custom(from, to, today, policy),
            Err(error) => vec![PeriodViolation {
                field: "date_from",
                error,
            }],
        }
    }

    /// Fill unset custom bounds with the default window ending yesterday.
    pub fn materialize(&self, today: NaiveDate) -> Result<Self> {
        match *self {
            Self::Custom { date_from, date_to } => {
                let (from, to) = custom_bounds(date_from, date_to, today)?;
                Ok(Self::custom(from, to))
            }
            other => Ok(other),
        }
    }
}

/// The 7 days ending yesterday.
pub fn default_custom_range(today: NaiveDate) -> Result<DateRange> {
    let date_to = minus_days(today, 1)?;
    let date_from = minus_days(date_to, DEFAULT_CUSTOM_DAYS - 1)?;
    Ok(DateRange { date_from, date_to })
}

fn custom_bounds(
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    match (date_from, date_to) {
        (Some(from), Some(to)) => Ok((from, to)),
        _ => {
            let default = default_custom_range(today)?;
            Ok((
                date_from.unwrap_or(default.date_from),
                date_to.unwrap_or(default.date_to),
            ))
        }
    }
}

fn check_custom(
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
    policy: FutureDatePolicy,
) -> Vec<PeriodViolation> {
    let mut violations = Vec::new();
    if from > to {
        violations.push(PeriodViolation {
            field: "date_from",
            error: ModelError::InvertedRange {
                date_from: from,
                date_to: to,
            },
        });
    }
    if policy == FutureDatePolicy::Reject {
        for (field, date) in [("date_from", from), ("date_to", to)] {
            if date > today {
                violations.push(PeriodViolation {
                    field,
                    error: ModelError::FutureDate { field, date, today },
                });
            }
        }
    }
    violations
}

fn first_of_month(date: NaiveDate) -> Result<NaiveDate> {
    date.with_day(1).ok_or(ModelError::DateOutOfRange(date))
}

fn minus_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(days))
        .ok_or(ModelError::DateOutOfRange(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn last_7_days_ends_yesterday() {
        let range = Period::Last7Days
            .resolve(date(2024, 3, 10), FutureDatePolicy::Reject)
            .unwrap();
        assert_eq!(range.date_from, date(2024, 3, 3));
        assert_eq!(range.date_to, date(2024, 3, 9));
        assert_eq!(range.days(), 7);
    }

    #[test]
    fn this_month_on_the_first_is_a_single_day() {
        let range = Period::ThisMonth
            .resolve(date(2024, 5, 1), FutureDatePolicy::Reject)
            .unwrap();
        assert_eq!(range.date_from, date(2024, 5, 1));
        assert_eq!(range.date_to, date(2024, 5, 1));
    }

    #[test]
    fn last_month_crosses_year_boundary() {
        let range = Period::LastMonth
            .resolve(date(2024, 1, 15), FutureDatePolicy::Reject)
            .unwrap();
        assert_eq!(range.date_from, date(2023, 12, 1));
        assert_eq!(range.date_to, date(2023, 12, 31));
    }

    #[test]
    fn last_month_handles_leap_february() {
        let range = Period::LastMonth
            .resolve(date(2024, 3, 31), FutureDatePolicy::Reject)
            .unwrap();
        assert_eq!(range.date_to, date(2024, 2, 29));
    }

    #[test]
    fn unset_custom_defaults_to_week_ending_yesterday() {
        let period = Period::Custom {
            date_from: None,
            date_to: None,
        };
        let range = period
            .resolve(date(2024, 3, 10), FutureDatePolicy::Reject)
            .unwrap();
        assert_eq!(range.date_from, date(2024, 3, 3));
        assert_eq!(range.date_to, date(2024, 3, 9));
    }

    #[test]
    fn inverted_custom_range_is_rejected() {
        let period = Period::custom(date(2024, 3, 5), date(2024, 3, 1));
        let err = period
            .resolve(date(2024, 4, 1), FutureDatePolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvertedRange { .. }));
    }

    #[test]
    fn future_dates_follow_policy() {
        let today = date(2024, 3, 10);
        let period = Period::custom(date(2024, 3, 9), date(2024, 3, 12));
        assert!(matches!(
            period.resolve(today, FutureDatePolicy::Reject),
            Err(ModelError::FutureDate {
                field: "date_to",
                ..
            })
        ));
        let range = period.resolve(today, FutureDatePolicy::Allow).unwrap();
        assert_eq!(range.date_to, date(2024, 3, 12));
    }

    #[test]
    fn violations_are_collected_not_short_circuited() {
        let today = date(2024, 3, 10);
        let period = Period::custom(date(2024, 4, 9), date(2024, 3, 12));
        let fields: Vec<_> = period
            .violations(today, FutureDatePolicy::Reject)
            .into_iter()
            .map(|v| v.field)
            .collect();
        assert_eq!(fields, vec!["date_from", "date_from", "date_to"]);
    }

    #[test]
    fn materialize_fills_only_custom() {
        let today = date(2024, 3, 10);
        assert_eq!(Period::ThisMonth.materialize(today).unwrap(), Period::ThisMonth);
        let filled = Period::Custom {
            date_from: Some(date(2024, 3, 1)),
            date_to: None,
        }
        .materialize(today)
        .unwrap();
        assert_eq!(filled, Period::custom(date(2024, 3, 1), date(2024, 3, 9)));
    }

    #[test]
    fn selector_parses_wire_names() {
        assert_eq!(
            "LAST_30_DAYS".parse::<PeriodSelector>().unwrap(),
            PeriodSelector::Last30Days
        );
        assert!("yesterday".parse::<PeriodSelector>().is_err());
    }
}
