use serde::{Deserialize, Serialize};

/// Platform a link was classified under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    LinkedIn,
    GitHub,
    #[serde(rename = "Twitter/X")]
    TwitterX,
    Portfolio,
    Medium,
    StackOverflow,
    Behance,
    Dribbble,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub platform: Platform,
    pub url: String,
}

/// Why an extraction produced a failure record. Not serialized; the HTTP layer
/// uses it to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnsupportedFormat,
    CorruptDocument,
    MissingDependency,
}

/// The single output value of one extraction call.
///
/// Either `success` is true and the data fields are populated, or it is false
/// and only `error` is set. `None` fields are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<LinkRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub failure: Option<FailureKind>,
}

impl ResultRecord {
    pub fn success(
        text: String,
        urls: Vec<LinkRecord>,
        emails: Vec<String>,
        phones: Vec<String>,
        word_count: usize,
    ) -> Self {
        Self {
            success: true,
            text: Some(text),
            urls: Some(urls),
            emails: Some(emails),
            phones: Some(phones),
            word_count: Some(word_count),
            error: None,
            failure: None,
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            text: None,
            urls: None,
            emails: None,
            phones: None,
            word_count: None,
            error: Some(message.into()),
            failure: Some(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_twitter_platform_label() {
        let value = serde_json::to_value(Platform::TwitterX).unwrap();
        assert_eq!(value, json!("Twitter/X"));
    }

    #[test]
    fn test_failure_record_has_only_success_and_error() {
        let record = ResultRecord::failure(FailureKind::CorruptDocument, "bad file");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({ "success": false, "error": "bad file" }));
    }

    #[test]
    fn test_success_record_shape() {
        let record = ResultRecord::success(
            "hi".to_string(),
            vec![LinkRecord {
                platform: Platform::GitHub,
                url: "https://github.com/alice".to_string(),
            }],
            vec![],
            vec![],
            1,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "text": "hi",
                "urls": [{ "platform": "GitHub", "url": "https://github.com/alice" }],
                "emails": [],
                "phones": [],
                "word_count": 1
            })
        );
    }
}
