pub mod metadata;
pub mod patient;
pub mod result;
pub mod schema;
pub mod vocab;

pub use metadata::{ModelInfo, ModelMetadata, ModelMetrics};
pub use patient::{FieldError, PatientRecord, PatientRequest};
pub use result::{ClassificationResult, TriageClassification};
pub use vocab::{CategoryKind, LabelSpace, VocabError, Vocabulary};
