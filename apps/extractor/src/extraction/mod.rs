pub mod handlers;
pub mod orchestrator;

pub use orchestrator::Extractor;
