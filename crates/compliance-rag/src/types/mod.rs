//! Core types for the compliance checker

pub mod document;
pub mod entity;
pub mod finding;
pub mod report;

pub use document::{FileType, ParsedDocument, ReferenceChunk};
pub use entity::EntityType;
pub use finding::{Assessment, Finding, Severity};
pub use report::{ChecklistResult, ComplianceReport};
