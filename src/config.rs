use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::models::CaptionPrompt;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_TOOL: &str = "llm";
pub const DEFAULT_MODEL: &str = "4o-mini";
pub const DEFAULT_PACING: Duration = Duration::from_secs(3);
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff"];

const ENV_TOOL: &str = "ALT_TEXT_TOOL";
const ENV_MODEL: &str = "ALT_TEXT_MODEL";
const ENV_PACING: &str = "ALT_TEXT_PACING_SECS";

const HELPFUL_PROMPT: &str = "You are a helpful alt-text generator assisting visually impaired users. Generate a clear and concise caption (15-30 words) that highlights the most important subject and action. Focus only on essential details, avoiding unnecessary background elements. Use simple, everyday language and avoid overly descriptive or poetic words.";
const SOCIAL_PROMPT: &str = "What's in this image? Be brief, it's for image alt description on a social network. Don't write in the first person.";
const SINGLE_LINE_PROMPT: &str = "You write alt text for any image pasted in by the user. Alt text is always presented on a single line so it can be used easily in Markdown images. All text on the image (for screenshots etc) must be exactly included. A short note describing the nature of the image itself should go first.";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read prompts file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid prompts file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("prompt list is empty")]
    EmptyPrompts,
    #[error("invalid pacing {0:?}: expected non-negative seconds")]
    InvalidPacing(String),
}

// ── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    pub tool_program: String,
    /// Full-pass prompts, in report order. Never empty.
    pub prompts: Vec<CaptionPrompt>,
    /// Selective-pass prompt.
    pub default_prompt: CaptionPrompt,
    /// Delay after each full-pass captioning call.
    pub pacing: Duration,
    pub image_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_program: DEFAULT_TOOL.to_string(),
            prompts: builtin_prompts(),
            default_prompt: CaptionPrompt::new(HELPFUL_PROMPT).with_model(DEFAULT_MODEL),
            pacing: DEFAULT_PACING,
            image_extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl Config {
    /// Defaults with `ALT_TEXT_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(tool) = lookup(ENV_TOOL).filter(|t| !t.trim().is_empty()) {
            config.tool_program = tool.trim().to_string();
        }

        if let Some(model) = lookup(ENV_MODEL) {
            let model = model.trim();
            config.default_prompt.model_hint = if model.is_empty() {
                None
            } else {
                Some(model.to_string())
            };
        }

        if let Some(pacing) = lookup(ENV_PACING) {
            config.pacing = parse_pacing(&pacing)?;
        }

        Ok(config)
    }

    pub fn with_prompts(mut self, prompts: Vec<CaptionPrompt>) -> Result<Self, ConfigError> {
        if prompts.is_empty() {
            return Err(ConfigError::EmptyPrompts);
        }
        self.prompts = prompts;
        Ok(self)
    }
}

pub fn builtin_prompts() -> Vec<CaptionPrompt> {
    [HELPFUL_PROMPT, SOCIAL_PROMPT, SINGLE_LINE_PROMPT]
        .into_iter()
        .map(CaptionPrompt::new)
        .collect()
}

pub fn parse_pacing(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| ConfigError::InvalidPacing(raw.to_string()))
}

// ── Prompt files ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum PromptEntry {
    Text(String),
    Full(CaptionPrompt),
}

/// Reads a JSON array whose entries are either prompt strings or
/// `{"text": ..., "model": ...}` objects.
pub fn load_prompts(path: &Path) -> Result<Vec<CaptionPrompt>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_prompts(&raw)
}

fn parse_prompts(raw: &str) -> Result<Vec<CaptionPrompt>, ConfigError> {
    let entries: Vec<PromptEntry> = serde_json::from_str(raw)?;
    if entries.is_empty() {
        return Err(ConfigError::EmptyPrompts);
    }
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            PromptEntry::Text(text) => CaptionPrompt::new(text),
            PromptEntry::Full(prompt) => prompt,
        })
        .collect())
}
