pub mod experience;
pub mod schema;

pub use experience::{
    ConsolidatedRecord, ExperienceSubmission, ExtractedRecord, ExtractionStatus, FieldValue,
    NormalizedDate, NormalizedTime, StoredExperience, UnresolvedField,
};
pub use schema::{ExtractionSchema, Field, FieldSpec, FieldType};
