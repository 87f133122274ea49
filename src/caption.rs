use std::io;
use std::process::Stdio;

use tokio::process::Command;

use crate::models::{CaptionPrompt, CaptionResult, CaptionStatus};

// ── Tool capability ──────────────────────────────────────────────────────────

/// What the captioning tool left behind after one run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// `invoke(path, prompt, model?) -> (stdout, stderr, exit code)`.
///
/// An `Err` means the tool could not be launched at all.
pub trait CaptionTool {
    async fn invoke(
        &self,
        image_path: &str,
        prompt: &str,
        model: Option<&str>,
    ) -> io::Result<ToolOutput>;
}

/// Runs `<program> -a <image> [-m <model>] <prompt>` and captures both streams.
#[derive(Debug, Clone)]
pub struct LlmCommand {
    program: String,
}

impl LlmCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl CaptionTool for LlmCommand {
    async fn invoke(
        &self,
        image_path: &str,
        prompt: &str,
        model: Option<&str>,
    ) -> io::Result<ToolOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-a").arg(image_path);
        if let Some(model) = model {
            cmd.arg("-m").arg(model);
        }
        cmd.arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(program = %self.program, image_path, model, "spawning captioning tool");

        let output = cmd.output().await.map_err(|e| {
            io::Error::new(e.kind(), format!("failed to launch {}: {}", self.program, e))
        })?;

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

// ── Captioner ────────────────────────────────────────────────────────────────

pub struct Captioner<T> {
    tool: T,
}

impl<T: CaptionTool> Captioner<T> {
    pub fn new(tool: T) -> Self {
        Self { tool }
    }

    /// One image, one prompt, at most one tool run. Failures come back as a
    /// status on the result; nothing is retried.
    pub async fn caption(
        &self,
        image_path: &str,
        prompt_index: usize,
        prompt: &CaptionPrompt,
    ) -> CaptionResult {
        let status = self.caption_status(image_path, prompt).await;
        CaptionResult {
            prompt_index,
            image_path: image_path.to_string(),
            status,
        }
    }

    async fn caption_status(&self, image_path: &str, prompt: &CaptionPrompt) -> CaptionStatus {
        if !is_regular_file(image_path).await {
            tracing::warn!(image_path, "image file not found");
            return CaptionStatus::FileNotFound;
        }

        let output = match self
            .tool
            .invoke(image_path, &prompt.text, prompt.model_hint.as_deref())
            .await
        {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(image_path, error = %e, "captioning tool failed to launch");
                return CaptionStatus::ToolError(e.to_string());
            }
        };

        if !output.success() {
            let detail = failure_detail(&output);
            tracing::warn!(image_path, %detail, "captioning tool failed");
            return CaptionStatus::ToolError(detail);
        }

        CaptionStatus::Ok(output.stdout.trim().to_string())
    }
}

async fn is_regular_file(path: &str) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn failure_detail(output: &ToolOutput) -> String {
    let status = match output.exit_code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    };
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        status
    } else {
        format!("{}: {}", status, stderr)
    }
}

// ── Test double ──────────────────────────────────────────────────────────────
