//! Data model shared by the compliance console crates

pub mod query;
pub mod rules;
pub mod types;

pub use query::{
    PlanViolation, QueryOutcome, QueryResult, QueryStatus, SearchHit, SearchResults,
};
pub use rules::{RuleSet, RuleType, UnknownRuleType};
pub use types::{
    Ack, Document, DocumentId, ServiceInfo, UploadReceipt, UploadStatus, UploadedFile,
};
