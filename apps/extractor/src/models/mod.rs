pub mod document;
pub mod record;

pub use document::{DocumentInput, DocumentType};
pub use record::{FailureKind, LinkRecord, Platform, ResultRecord};
