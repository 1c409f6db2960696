//! Contact classifiers. Each one scans the transcript first and then merges
//! the structural hyperlinks the reader harvested.

pub mod emails;
pub mod phones;
pub mod platforms;
pub mod urls;

pub use platforms::PlatformTable;
pub use urls::UrlClassifier;
