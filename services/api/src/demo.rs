use crate::infra::{sample_hospitals, InMemoryOutbox, InMemoryStudyStore};
use chrono::{Local, NaiveDate, NaiveTime, Utc};
use clap::Args;
use epicq::config::StudyConfig;
use epicq::error::AppError;
use epicq::study::domain::parse_date;
use epicq::study::recruitment::{
    PeriodCheck, PeriodOverlapValidator, PeriodPolicy, PeriodScheduleChecker,
};
use epicq::study::{HospitalId, Locale, PeriodRequest, StudyService, StudyServiceError};
use std::path::PathBuf;
use std::sync::Arc;

fn parse_locale(raw: &str) -> Result<Locale, String> {
    Locale::parse(raw).ok_or_else(|| format!("unsupported locale '{raw}' (expected es or en)"))
}

#[derive(Args, Debug)]
pub(crate) struct PeriodsCheckArgs {
    /// CSV with period_number,start_date,end_date[,status] columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Language of the rejection messages (es or en)
    #[arg(long, value_parser = parse_locale, default_value = "es")]
    pub(crate) locale: Locale,
    /// Only check ordering and overlaps, skipping the weekly window and spacing rules
    #[arg(long)]
    pub(crate) overlap_only: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_periods_check(args: PeriodsCheckArgs) -> Result<(), AppError> {
    let policy = if args.overlap_only {
        PeriodPolicy::overlap_only()
    } else {
        PeriodPolicy::default()
    };
    let checker =
        PeriodScheduleChecker::new(PeriodOverlapValidator::new(policy).with_locale(args.locale));
    let checks = checker.check_path(&args.csv)?;

    println!("Recruitment schedule check: {}", args.csv.display());
    render_checks(&checks, args.locale);

    let rejected = checks
        .iter()
        .filter(|check| !check.validation.is_valid)
        .count();
    println!(
        "\n{} rows checked | {} accepted | {} rejected",
        checks.len(),
        checks.len() - rejected,
        rejected
    );
    Ok(())
}

fn render_checks(checks: &[PeriodCheck], locale: Locale) {
    for check in checks {
        let window = locale.format_range(check.start_date, check.end_date);
        match &check.validation.message {
            None => println!(
                "- line {}: period {} ({}, {}) ok",
                check.line,
                check.period_number,
                window,
                check.status.label()
            ),
            Some(message) => println!(
                "- line {}: period {} ({}) rejected: {}",
                check.line, check.period_number, window, message
            ),
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let now = today.and_time(NaiveTime::MIN).and_utc() + chrono::Duration::hours(12);
    if today != Utc::now().date_naive() {
        println!("Evaluating as of {today}");
    }

    let store = Arc::new(InMemoryStudyStore::seeded(sample_hospitals(now)));
    let outbox = Arc::new(InMemoryOutbox::default());
    let config = StudyConfig {
        locale: Locale::En,
        ..StudyConfig::default()
    };
    let service = StudyService::new(store.clone(), outbox.clone(), &config);

    println!("EPIC-Q study rules demo");

    println!("\nHospital form completion");
    for hospital_id in store.hospital_ids() {
        match service.coordinator_stats(&hospital_id, now) {
            Ok(stats) => {
                let status = &stats.hospital_form_status;
                println!(
                    "- {}: {} ({}/{} fields){}",
                    hospital_id,
                    config.locale.format_percentage(stats.form_completion),
                    status.completed_steps,
                    status.total_steps,
                    if status.is_urgent { " URGENT" } else { "" }
                );
                if !status.missing_fields.is_empty() {
                    println!("  Missing: {}", status.missing_fields.join(", "));
                }
            }
            Err(err) => println!("- {}: unavailable ({})", hospital_id, err),
        }
    }

    println!("\nRecruitment period scheduling");
    let scheduled = HospitalId("hosp-001".to_string());
    let first_monday = next_monday(today);
    let proposals = [
        ("first window", first_monday, 6),
        ("overlapping window", first_monday + chrono::Duration::days(3), 6),
        ("ten-day window", first_monday + chrono::Duration::weeks(20), 9),
        ("window six weeks later", first_monday + chrono::Duration::weeks(6), 6),
        ("window twenty weeks later", first_monday + chrono::Duration::weeks(20), 6),
    ];
    for (label, start, length) in proposals {
        let request = PeriodRequest {
            start_date: start,
            end_date: start + chrono::Duration::days(length),
            period_id: None,
            target_cases: Some(30),
            notes: None,
        };
        match service.save_period(&scheduled, request) {
            Ok(period) => println!(
                "- {}: accepted as period {} ({})",
                label,
                period.period_number,
                config
                    .locale
                    .format_range(period.start_date, period.end_date)
            ),
            Err(StudyServiceError::Rejected(rejection)) => {
                println!("- {}: rejected: {}", label, rejection.message(config.locale))
            }
            Err(err) => println!("- {}: failed ({})", label, err),
        }
    }

    println!("\nAlert evaluation");
    for hospital_id in store.hospital_ids() {
        match service.evaluate_alerts(&hospital_id, now) {
            Ok(summary) if summary.created.is_empty() => {
                println!("- {}: no new alerts", hospital_id)
            }
            Ok(summary) => {
                println!("- {}:", hospital_id);
                for alert in &summary.created {
                    println!(
                        "  [{}] {}: {}",
                        alert.severity.label(),
                        alert.title,
                        alert.message
                    );
                }
            }
            Err(err) => println!("- {}: evaluation failed ({})", hospital_id, err),
        }
    }

    let sent = outbox.sent();
    println!("\nCommunications queued: {}", sent.len());
    for communication in sent.iter().take(5) {
        println!(
            "- {:?} to {:?}: {}",
            communication.channel, communication.recipient, communication.subject
        );
    }

    Ok(())
}

fn next_monday(from: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    let offset = (7 - from.weekday().num_days_from_monday()) % 7;
    from + chrono::Duration::days(i64::from(offset))
}
