//! Recruitment periods: lifecycle, window validation and schedule imports.

pub mod domain;
pub mod import;
pub mod validator;

#[cfg(test)]
mod tests;

pub use domain::{PeriodStatus, PeriodTransitionError, RecruitmentPeriod};
pub use import::{PeriodCheck, PeriodImportError, PeriodScheduleChecker};
pub use validator::{
    candidate_number, months_between, PeriodOverlapValidator, PeriodPolicy, PeriodRejection,
    PeriodValidation, PeriodWindow, DAYS_PER_MONTH,
};
