//! Hospital form checklist and completion scoring.

mod fields;
mod scorer;


pub use fields::{FieldKey, FieldValue, HospitalFormField};
pub use scorer::{is_urgent, CompletionResult, HospitalCompletionScorer, HospitalFormStatus};
