use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key prefix under which resume records live in the key-value store.
pub const RECORD_KEY_PREFIX: &str = "resume:";

pub fn record_key(id: &str) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

/// Returns the resume id for a `resume:<id>` key.
pub fn id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(RECORD_KEY_PREFIX).filter(|id| !id.is_empty())
}

/// A resume submission as serialized into the key-value store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    pub resume_path: String,
    pub image_path: String,
    pub feedback: Feedback,
}

/// AI-generated feedback. Only the ATS section is required; everything the
/// generator adds beyond the known sections is kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(rename = "ATS")]
    pub ats: AtsFeedback,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone_and_style: Option<FeedbackSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FeedbackSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<FeedbackSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<FeedbackSection>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtsFeedback {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackSection {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TipKind {
    Good,
    Improve,
}

/// A single improvement tip, stored either as bare text or as a tagged object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Tip {
    Text(String),
    Detailed {
        #[serde(rename = "type")]
        kind: TipKind,
        tip: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
}

#[cfg(test)]
impl Tip {
    pub fn text(&self) -> &str {
        match self {
            Tip::Text(text) => text,
            Tip::Detailed { tip, .. } => tip,
        }
    }
}

/// One row of the home listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResumeSummary {
    pub id: String,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub overall_score: Option<f64>,
    pub ats_score: f64,
    pub image_path: String,
}
