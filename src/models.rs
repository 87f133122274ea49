use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One `![alt](target)` occurrence inside a document.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub raw_alt_text: String,
    pub raw_target: String,
    pub line_number: usize,
    pub source_document: PathBuf,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Remote,
    Local,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub kind: TargetKind,
    pub local_path: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Remote,
    HasAltText,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    NeedsCaption(ResolvedTarget),
    Skip(SkipReason),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CaptionPrompt {
    pub text: String,
    #[serde(default, rename = "model", skip_serializing_if = "Option::is_none")]
    pub model_hint: Option<String>,
}

impl CaptionPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model_hint: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_hint = Some(model.into());
        self
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CaptionStatus {
    Ok(String),
    FileNotFound,
    ToolError(String),
}

impl CaptionStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, CaptionStatus::Ok(_))
    }
}

/// Human-facing rendering; failures use the sentinels the reports have always shown.
impl fmt::Display for CaptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionStatus::Ok(text) => f.write_str(text),
            CaptionStatus::FileNotFound => f.write_str("ERROR file not found"),
            CaptionStatus::ToolError(detail) => write!(f, "ERROR running LLM: {}", detail),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct CaptionResult {
    /// 1-based position of the prompt in the configured list.
    pub prompt_index: usize,
    pub image_path: String,
    pub status: CaptionStatus,
}

/// A reference with missing alt text, as streamed by the selective pass.
#[derive(Debug, Serialize, Clone)]
pub struct Finding {
    pub reference: ImageReference,
    /// The whole source line, trimmed.
    pub line: String,
    pub target: ResolvedTarget,
    pub caption: Option<CaptionResult>,
}
