use chrono::{Duration, NaiveDate};
use serde_json::json;

use super::validator::candidate_number;
use super::*;
use crate::study::domain::PeriodId;
use crate::study::locale::Locale;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn window(id: &str, period_number: u32, start: NaiveDate, end: NaiveDate) -> PeriodWindow {
    PeriodWindow {
        id: Some(PeriodId(id.to_string())),
        period_number,
        start_date: start,
        end_date: end,
    }
}

fn overlap_only() -> PeriodOverlapValidator {
    PeriodOverlapValidator::new(PeriodPolicy::overlap_only()).with_locale(Locale::En)
}

fn full_rules() -> PeriodOverlapValidator {
    PeriodOverlapValidator::new(PeriodPolicy::default()).with_locale(Locale::En)
}

#[test]
fn adjacency_the_day_after_end_is_not_an_overlap() {
    let existing = vec![window("p-1", 1, date(2024, 1, 1), date(2024, 1, 7))];
    let validator = overlap_only();

    let next_day = validator.validate(date(2024, 1, 8), date(2024, 1, 14), &existing, None);
    assert!(next_day.is_valid);
    assert!(next_day.message.is_none());

    let same_day = validator.validate(date(2024, 1, 7), date(2024, 1, 13), &existing, None);
    assert!(!same_day.is_valid);
    assert_eq!(
        same_day.message.as_deref(),
        Some("The period overlaps recruitment period 1 (2024-01-01 to 2024-01-07)")
    );
}

#[test]
fn later_periods_overlap_exactly_when_they_start_before_the_prior_end() {
    let p1_start = date(2024, 1, 1);
    let p1_end = date(2024, 1, 7);
    let existing = vec![window("p-1", 1, p1_start, p1_end)];
    let validator = overlap_only();

    for offset in 0..30 {
        let start = p1_start + Duration::days(offset);
        let end = start + Duration::days(6);
        let result = validator.validate(start, end, &existing, None);
        assert_eq!(
            result.is_valid,
            start > p1_end,
            "start {start} produced {result:?}"
        );
    }
}

#[test]
fn start_must_precede_end() {
    let validator = overlap_only();
    let same = validator.check(date(2024, 1, 1), date(2024, 1, 1), &[], None);
    assert_eq!(
        same,
        Err(PeriodRejection::StartNotBeforeEnd {
            start: date(2024, 1, 1),
            end: date(2024, 1, 1),
        })
    );

    let reversed = validator.validate(date(2024, 1, 7), date(2024, 1, 1), &[], None);
    assert_eq!(
        reversed.message.as_deref(),
        Some("Start date must precede end date")
    );
}

#[test]
fn ordering_is_checked_before_overlap() {
    let existing = vec![window("p-1", 1, date(2024, 1, 1), date(2024, 1, 7))];
    let rejection = overlap_only()
        .check(date(2024, 1, 5), date(2024, 1, 2), &existing, None)
        .expect_err("reversed dates");
    assert!(matches!(rejection, PeriodRejection::StartNotBeforeEnd { .. }));
}

#[test]
fn editing_a_period_never_collides_with_itself() {
    let existing = vec![
        window("p-1", 1, date(2024, 1, 1), date(2024, 1, 7)),
        window("p-2", 2, date(2024, 5, 6), date(2024, 5, 12)),
    ];
    let own_id = PeriodId("p-2".to_string());

    let unchanged = full_rules().validate(
        date(2024, 5, 6),
        date(2024, 5, 12),
        &existing,
        Some(&own_id),
    );
    assert!(unchanged.is_valid, "{unchanged:?}");

    let without_exclusion =
        full_rules().validate(date(2024, 5, 6), date(2024, 5, 12), &existing, None);
    assert!(!without_exclusion.is_valid);
}

#[test]
fn weekly_window_requires_a_monday_start() {
    let rejection = full_rules()
        .check(date(2024, 1, 2), date(2024, 1, 8), &[], None)
        .expect_err("tuesday start");
    assert_eq!(rejection, PeriodRejection::NotMonday { start: date(2024, 1, 2) });
    assert_eq!(
        rejection.message(Locale::Es),
        "Los períodos de reclutamiento deben comenzar un lunes (02/01/2024 es martes)"
    );
    assert_eq!(
        rejection.message(Locale::En),
        "Recruitment periods must start on a Monday (2024-01-02 is a Tuesday)"
    );
}

#[test]
fn weekly_window_requires_exactly_seven_days() {
    let rejection = full_rules()
        .check(date(2024, 1, 1), date(2024, 1, 8), &[], None)
        .expect_err("eight day window");
    assert_eq!(
        rejection,
        PeriodRejection::WrongLength {
            days: 8,
            expected: 7,
        }
    );

    assert!(full_rules()
        .check(date(2024, 1, 1), date(2024, 1, 7), &[], None)
        .is_ok());
}

#[test]
fn consecutive_periods_need_four_thirty_day_months() {
    let existing = vec![window("p-1", 1, date(2024, 1, 1), date(2024, 1, 7))];

    // 113 days after the prior end: three 30-day months
    let too_soon = full_rules()
        .check(date(2024, 4, 29), date(2024, 5, 5), &existing, None)
        .expect_err("gap too short");
    assert_eq!(
        too_soon,
        PeriodRejection::TooSoonAfterPrevious {
            period_number: 1,
            previous_end: date(2024, 1, 7),
            months: 3,
            required: 4,
        }
    );

    // exactly 120 days
    assert!(full_rules()
        .check(date(2024, 5, 6), date(2024, 5, 12), &existing, None)
        .is_ok());
}

#[test]
fn moving_an_earlier_period_respects_the_following_one() {
    let existing = vec![
        window("p-1", 1, date(2024, 1, 1), date(2024, 1, 7)),
        window("p-2", 2, date(2024, 5, 6), date(2024, 5, 12)),
    ];
    let own_id = PeriodId("p-1".to_string());

    let rejection = full_rules()
        .check(date(2024, 2, 5), date(2024, 2, 11), &existing, Some(&own_id))
        .expect_err("too close to period 2");
    assert_eq!(
        rejection,
        PeriodRejection::TooCloseToNext {
            period_number: 2,
            next_start: date(2024, 5, 6),
            months: 2,
            required: 4,
        }
    );
}

#[test]
fn overlap_wins_over_weekly_and_spacing_rules() {
    let existing = vec![window("p-1", 1, date(2024, 1, 1), date(2024, 1, 7))];
    let rejection = full_rules()
        .check(date(2024, 1, 3), date(2024, 1, 20), &existing, None)
        .expect_err("overlaps and breaks every other rule");
    assert!(matches!(rejection, PeriodRejection::Overlap { period_number: 1, .. }));
}

#[test]
fn candidate_numbers_follow_existing_schedule() {
    let existing = vec![
        window("p-1", 1, date(2024, 1, 1), date(2024, 1, 7)),
        window("p-2", 2, date(2024, 5, 6), date(2024, 5, 12)),
    ];
    assert_eq!(candidate_number(&[], None), 1);
    assert_eq!(candidate_number(&existing, None), 3);
    assert_eq!(
        candidate_number(&existing, Some(&PeriodId("p-1".to_string()))),
        1
    );
}

#[test]
fn months_round_down_in_both_directions() {
    assert_eq!(months_between(date(2024, 1, 1), date(2024, 1, 31)), 1);
    assert_eq!(months_between(date(2024, 1, 1), date(2024, 1, 30)), 0);
    assert_eq!(months_between(date(2024, 1, 10), date(2024, 1, 1)), -1);
}

#[test]
fn validation_serializes_for_the_ui() {
    let valid = serde_json::to_value(PeriodValidation::valid()).expect("serializes");
    assert_eq!(valid, json!({ "isValid": true }));

    let rejection = PeriodRejection::StartNotBeforeEnd {
        start: date(2024, 1, 2),
        end: date(2024, 1, 1),
    };
    let invalid = serde_json::to_value(PeriodValidation::rejected(&rejection, Locale::Es))
        .expect("serializes");
    assert_eq!(
        invalid,
        json!({
            "isValid": false,
            "message": "La fecha de inicio debe ser anterior a la fecha de fin",
        })
    );
}
