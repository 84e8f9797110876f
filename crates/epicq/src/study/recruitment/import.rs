use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;
use std::path::Path;

use super::domain::PeriodStatus;
use super::validator::{PeriodOverlapValidator, PeriodValidation, PeriodWindow};

#[derive(Debug, thiserror::Error)]
pub enum PeriodImportError {
    #[error("failed to read period export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid period CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: '{value}' is not a YYYY-MM-DD date")]
    InvalidDate { line: u64, value: String },
    #[error("line {line}: unknown period status '{value}'")]
    InvalidStatus { line: u64, value: String },
}

/// Outcome of validating one row of a period schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodCheck {
    pub line: u64,
    pub period_number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    pub validation: PeriodValidation,
}

/// Replays a hospital's period schedule through the validator, row by row.
///
/// Each row is checked against the rows accepted before it. Cancelled rows are
/// reported but never block later rows.
pub struct PeriodScheduleChecker {
    validator: PeriodOverlapValidator,
}

impl PeriodScheduleChecker {
    pub fn new(validator: PeriodOverlapValidator) -> Self {
        Self { validator }
    }

    pub fn check_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Vec<PeriodCheck>, PeriodImportError> {
        let file = std::fs::File::open(path)?;
        self.check_reader(file)
    }

    pub fn check_reader<R: Read>(&self, reader: R) -> Result<Vec<PeriodCheck>, PeriodImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut accepted: Vec<PeriodWindow> = Vec::new();
        let mut checks = Vec::new();

        for (index, row) in csv_reader.deserialize::<PeriodRow>().enumerate() {
            let row = row?;
            // header occupies line 1
            let line = index as u64 + 2;
            let start_date = parse_date(&row.start_date, line)?;
            let end_date = parse_date(&row.end_date, line)?;
            let status = match row.status.as_deref() {
                Some(raw) => PeriodStatus::parse(raw).ok_or_else(|| {
                    PeriodImportError::InvalidStatus {
                        line,
                        value: raw.to_string(),
                    }
                })?,
                None => PeriodStatus::Planned,
            };

            let validation = match self.validator.check_numbered(
                row.period_number,
                start_date,
                end_date,
                &accepted,
                None,
            ) {
                Ok(()) => {
                    if status != PeriodStatus::Cancelled {
                        accepted.push(PeriodWindow {
                            id: None,
                            period_number: row.period_number,
                            start_date,
                            end_date,
                        });
                    }
                    PeriodValidation::valid()
                }
                Err(rejection) => PeriodValidation::rejected(&rejection, self.validator.locale()),
            };

            checks.push(PeriodCheck {
                line,
                period_number: row.period_number,
                start_date,
                end_date,
                status,
                validation,
            });
        }

        Ok(checks)
    }
}

#[derive(Debug, Deserialize)]
struct PeriodRow {
    period_number: u32,
    start_date: String,
    end_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_date(value: &str, line: u64) -> Result<NaiveDate, PeriodImportError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        PeriodImportError::InvalidDate {
            line,
            value: value.to_string(),
        }
    })
}
