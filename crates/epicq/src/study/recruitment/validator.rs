use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::study::domain::PeriodId;
use crate::study::locale::Locale;

/// Months are approximated as 30 days when spacing periods.
pub const DAYS_PER_MONTH: i64 = 30;

/// Recruitment window as seen by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    #[serde(default)]
    pub id: Option<PeriodId>,
    pub period_number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Business rules applied on top of the ordering and overlap checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodPolicy {
    /// Require a Monday start and a fixed window length.
    pub weekly_window: bool,
    pub window_days: i64,
    /// Minimum spacing, in 30-day months, between consecutive periods.
    pub min_gap_months: Option<i64>,
}

impl Default for PeriodPolicy {
    fn default() -> Self {
        Self {
            weekly_window: true,
            window_days: 7,
            min_gap_months: Some(4),
        }
    }
}

impl PeriodPolicy {
    pub fn overlap_only() -> Self {
        Self {
            weekly_window: false,
            window_days: 7,
            min_gap_months: None,
        }
    }
}

/// Why a proposed recruitment window was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodRejection {
    StartNotBeforeEnd {
        start: NaiveDate,
        end: NaiveDate,
    },
    Overlap {
        period_number: u32,
        start: NaiveDate,
        end: NaiveDate,
    },
    NotMonday {
        start: NaiveDate,
    },
    WrongLength {
        days: i64,
        expected: i64,
    },
    TooSoonAfterPrevious {
        period_number: u32,
        previous_end: NaiveDate,
        months: i64,
        required: i64,
    },
    TooCloseToNext {
        period_number: u32,
        next_start: NaiveDate,
        months: i64,
        required: i64,
    },
}

impl PeriodRejection {
    pub fn message(&self, locale: Locale) -> String {
        match (self, locale) {
            (Self::StartNotBeforeEnd { .. }, Locale::Es) => {
                "La fecha de inicio debe ser anterior a la fecha de fin".to_string()
            }
            (Self::StartNotBeforeEnd { .. }, Locale::En) => {
                "Start date must precede end date".to_string()
            }
            (
                Self::Overlap {
                    period_number,
                    start,
                    end,
                },
                Locale::Es,
            ) => format!(
                "El período se superpone con el período de reclutamiento {} ({})",
                period_number,
                locale.format_range(*start, *end)
            ),
            (
                Self::Overlap {
                    period_number,
                    start,
                    end,
                },
                Locale::En,
            ) => format!(
                "The period overlaps recruitment period {} ({})",
                period_number,
                locale.format_range(*start, *end)
            ),
            (Self::NotMonday { start }, Locale::Es) => format!(
                "Los períodos de reclutamiento deben comenzar un lunes ({} es {})",
                locale.format_date(*start),
                weekday_es(start.weekday())
            ),
            (Self::NotMonday { start }, Locale::En) => format!(
                "Recruitment periods must start on a Monday ({} is a {})",
                locale.format_date(*start),
                weekday_en(start.weekday())
            ),
            (Self::WrongLength { days, expected }, Locale::Es) => format!(
                "Los períodos de reclutamiento deben abarcar exactamente {expected} días consecutivos (se indicaron {days})"
            ),
            (Self::WrongLength { days, expected }, Locale::En) => format!(
                "Recruitment periods must span exactly {expected} consecutive days (got {days})"
            ),
            (
                Self::TooSoonAfterPrevious {
                    period_number,
                    previous_end,
                    months,
                    required,
                },
                Locale::Es,
            ) => format!(
                "Debe haber al menos {required} meses entre el fin del período {period_number} ({}) y el inicio del nuevo período (hay {months})",
                locale.format_date(*previous_end)
            ),
            (
                Self::TooSoonAfterPrevious {
                    period_number,
                    previous_end,
                    months,
                    required,
                },
                Locale::En,
            ) => format!(
                "The period must start at least {required} months after period {period_number} ended on {} ({months} apart)",
                locale.format_date(*previous_end)
            ),
            (
                Self::TooCloseToNext {
                    period_number,
                    next_start,
                    months,
                    required,
                },
                Locale::Es,
            ) => format!(
                "Debe haber al menos {required} meses entre el fin del período y el inicio del período {period_number} ({}) (hay {months})",
                locale.format_date(*next_start)
            ),
            (
                Self::TooCloseToNext {
                    period_number,
                    next_start,
                    months,
                    required,
                },
                Locale::En,
            ) => format!(
                "The period must end at least {required} months before period {period_number} starts on {} ({months} apart)",
                locale.format_date(*next_start)
            ),
        }
    }
}

impl fmt::Display for PeriodRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message(Locale::En))
    }
}

impl std::error::Error for PeriodRejection {}

/// Result shape returned to the recruitment UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PeriodValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn rejected(rejection: &PeriodRejection, locale: Locale) -> Self {
        Self {
            is_valid: false,
            message: Some(rejection.message(locale)),
        }
    }
}

/// Stateless validator for proposed recruitment windows.
#[derive(Debug, Clone, Default)]
pub struct PeriodOverlapValidator {
    policy: PeriodPolicy,
    locale: Locale,
}

impl PeriodOverlapValidator {
    pub fn new(policy: PeriodPolicy) -> Self {
        Self {
            policy,
            locale: Locale::default(),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn policy(&self) -> PeriodPolicy {
        self.policy
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn validate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        existing: &[PeriodWindow],
        exclude_id: Option<&PeriodId>,
    ) -> PeriodValidation {
        match self.check(start, end, existing, exclude_id) {
            Ok(()) => PeriodValidation::valid(),
            Err(rejection) => PeriodValidation::rejected(&rejection, self.locale),
        }
    }

    /// Applies the rules in order and reports the first one that fails.
    pub fn check(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        existing: &[PeriodWindow],
        exclude_id: Option<&PeriodId>,
    ) -> Result<(), PeriodRejection> {
        let number = candidate_number(existing, exclude_id);
        self.check_numbered(number, start, end, existing, exclude_id)
    }

    /// Same as [`check`](Self::check) for a candidate whose period number is already known.
    pub fn check_numbered(
        &self,
        number: u32,
        start: NaiveDate,
        end: NaiveDate,
        existing: &[PeriodWindow],
        exclude_id: Option<&PeriodId>,
    ) -> Result<(), PeriodRejection> {
        if start >= end {
            return Err(PeriodRejection::StartNotBeforeEnd { start, end });
        }

        let others: Vec<&PeriodWindow> = existing
            .iter()
            .filter(|window| !is_excluded(window, exclude_id))
            .collect();

        if let Some(collision) = others
            .iter()
            .find(|window| start <= window.end_date && end >= window.start_date)
        {
            return Err(PeriodRejection::Overlap {
                period_number: collision.period_number,
                start: collision.start_date,
                end: collision.end_date,
            });
        }

        if self.policy.weekly_window {
            if start.weekday() != Weekday::Mon {
                return Err(PeriodRejection::NotMonday { start });
            }
            let days = (end - start).num_days() + 1;
            if days != self.policy.window_days {
                return Err(PeriodRejection::WrongLength {
                    days,
                    expected: self.policy.window_days,
                });
            }
        }

        if let Some(required) = self.policy.min_gap_months {
            let previous = others
                .iter()
                .filter(|window| window.period_number < number)
                .max_by_key(|window| window.period_number);
            if let Some(previous) = previous {
                let months = months_between(previous.end_date, start);
                if months < required {
                    return Err(PeriodRejection::TooSoonAfterPrevious {
                        period_number: previous.period_number,
                        previous_end: previous.end_date,
                        months,
                        required,
                    });
                }
            }

            let next = others
                .iter()
                .filter(|window| window.period_number > number)
                .min_by_key(|window| window.period_number);
            if let Some(next) = next {
                let months = months_between(end, next.start_date);
                if months < required {
                    return Err(PeriodRejection::TooCloseToNext {
                        period_number: next.period_number,
                        next_start: next.start_date,
                        months,
                        required,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Whole 30-day months from `earlier` to `later`, rounded down.
pub fn months_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days().div_euclid(DAYS_PER_MONTH)
}

/// Number the candidate holds: its own when editing, the next free one otherwise.
pub fn candidate_number(existing: &[PeriodWindow], exclude_id: Option<&PeriodId>) -> u32 {
    if let Some(current) = existing
        .iter()
        .find(|window| is_excluded(window, exclude_id))
    {
        return current.period_number;
    }

    existing
        .iter()
        .map(|window| window.period_number)
        .max()
        .map_or(1, |max| max + 1)
}

fn is_excluded(window: &PeriodWindow, exclude_id: Option<&PeriodId>) -> bool {
    match (exclude_id, window.id.as_ref()) {
        (Some(excluded), Some(id)) => excluded == id,
        _ => false,
    }
}

fn weekday_es(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "lunes",
        Weekday::Tue => "martes",
        Weekday::Wed => "miércoles",
        Weekday::Thu => "jueves",
        Weekday::Fri => "viernes",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

fn weekday_en(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
