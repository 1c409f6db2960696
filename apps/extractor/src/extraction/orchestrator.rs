use tracing::{info, warn};

use crate::classifiers::{emails, phones, PlatformTable, UrlClassifier};
use crate::models::{DocumentInput, ResultRecord};
use crate::reader;

/// Runs one document through the reader and the three classifiers.
///
/// Holds the platform table so it can be swapped in tests. Cheap to share:
/// `extract` takes `&self` and keeps no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    urls: UrlClassifier,
}

impl Extractor {
    pub fn new(platforms: PlatformTable) -> Self {
        Self {
            urls: UrlClassifier::new(platforms),
        }
    }

    /// Never fails: reader errors come back as a failure record.
    pub fn extract(&self, input: &DocumentInput) -> ResultRecord {
        let raw = match reader::read(&input.bytes, &input.content_type) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(file = %input.file_name, error = %e, "Document could not be read");
                return ResultRecord::failure(e.kind(), e.to_string());
            }
        };
        let found = self.urls.scan(&raw.text);
        let spans: Vec<_> = found.iter().map(|m| m.span.clone()).collect();
        let urls = self.urls.label(&found, &raw.hyperlinks);

        let mut emails = emails::classify(&raw.text, &spans);
        emails.extend_from_mailto(&raw.hyperlinks);
        let emails = emails.into_vec();

        let mut phones = phones::classify(&raw.text, &spans);
        phones::extend_from_tel(&mut phones, &raw.hyperlinks);

        let word_count = word_count(&raw.text);

        info!(
            file = %input.file_name,
            urls = urls.len(),
            emails = emails.len(),
            phones = phones.len(),
            word_count,
            "Extraction complete"
        );

        ResultRecord::success(raw.text, urls, emails, phones, word_count)
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
