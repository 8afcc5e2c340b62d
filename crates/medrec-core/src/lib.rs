pub mod collection;
pub mod error;
pub mod patient;
pub mod query;

pub use collection::{Collection, CollectionView};
pub use error::{CoreError, ErrorCategory, FieldIssue, Result, ValidationError};
pub use patient::{
    Gender, Patient, PatientAttributes, PatientPatch, PatientView, Verdict, apply_partial_update,
    validate,
};
pub use query::{SortField, SortOrder, find_by_id, sort_by};
