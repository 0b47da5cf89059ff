//! Compliance stages: classification, checklist verification, red-flag
//! detection, annotation and reporting

pub mod annotator;
pub mod checklist;
pub mod classifier;
pub mod redflag;
pub mod report;
pub mod similarity;

pub use annotator::{AnnotationSummary, Annotator};
pub use checklist::{normalize_name, verify_against, Checklist, ChecklistVerifier};
pub use classifier::{Classification, ClassificationMethod, Classifier};
pub use redflag::{preview, split_sections, RedFlagDetector};
pub use report::{generate_report, load_report, write_report, NO_ANNOTATION};
