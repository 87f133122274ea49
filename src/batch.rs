use std::path::PathBuf;

use crate::caption::{CaptionTool, Captioner};
use crate::classify::{classify, is_missing_alt_text, resolve_target};
use crate::config::Config;
use crate::models::{CaptionResult, Classification, Finding, SkipReason};
use crate::scan::scan_document;

/// Counters for one selective pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectiveSummary {
    pub documents_scanned: usize,
    pub documents_failed: usize,
    pub references: usize,
    pub missing_alt_text: usize,
    pub captioned: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectiveMode {
    /// Report missing alt text only, remote references included.
    ScanOnly,
    /// Report and caption every local reference missing alt text.
    Generate,
}

/// Drives scanning, classification and captioning one unit of work at a time.
pub struct BatchOrchestrator<T> {
    captioner: Captioner<T>,
    config: Config,
}

impl<T: CaptionTool> BatchOrchestrator<T> {
    pub fn new(tool: T, config: Config) -> Self {
        Self {
            captioner: Captioner::new(tool),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Every image against every configured prompt, image-major. Sleeps for
    /// the configured pacing after each call.
    pub async fn full_pass(&self, images: &[PathBuf]) -> Vec<CaptionResult> {
        let prompts = &self.config.prompts;
        let mut results = Vec::with_capacity(images.len() * prompts.len());

        for image in images {
            let image_path = image.to_string_lossy();
            let name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| image_path.to_string());

            for (idx, prompt) in prompts.iter().enumerate() {
                let prompt_index = idx + 1;
                tracing::info!("Generating alt text for {} with prompt {}...", name, prompt_index);
                results.push(self.captioner.caption(&image_path, prompt_index, prompt).await);
                tokio::time::sleep(self.config.pacing).await;
            }
        }

        results
    }

    /// Scans `documents` in order and hands every reference missing alt text
    /// to `on_finding` as soon as it is known. Unreadable documents are logged
    /// and skipped.
    pub async fn selective_pass<F>(
        &self,
        documents: &[PathBuf],
        base_path: &str,
        mode: SelectiveMode,
        mut on_finding: F,
    ) -> SelectiveSummary
    where
        F: FnMut(&Finding),
    {
        let mut summary = SelectiveSummary::default();

        for document in documents {
            let (lines, references) = match scan_document(document) {
                Ok(scanned) => scanned,
                Err(e) => {
                    tracing::warn!(error = %e, "Error processing {}", document.display());
                    summary.documents_failed += 1;
                    continue;
                }
            };
            summary.documents_scanned += 1;
            summary.references += references.len();

            for reference in references {
                let line = line_text(&lines, reference.line_number);
                let finding = match classify(&reference, base_path) {
                    Classification::Skip(SkipReason::HasAltText) => continue,
                    // Remote images are reported when only scanning, never captioned.
                    Classification::Skip(SkipReason::Remote) => {
                        if mode == SelectiveMode::Generate || !is_missing_alt_text(&reference) {
                            continue;
                        }
                        Finding {
                            target: resolve_target(&reference.raw_target, base_path),
                            reference,
                            line,
                            caption: None,
                        }
                    }
                    Classification::NeedsCaption(target) => {
                        let caption = match (mode, target.local_path.as_deref()) {
                            (SelectiveMode::Generate, Some(local_path)) => {
                                summary.captioned += 1;
                                Some(self.caption_default(local_path).await)
                            }
                            _ => None,
                        };
                        Finding {
                            reference,
                            line,
                            target,
                            caption,
                        }
                    }
                };
                summary.missing_alt_text += 1;
                on_finding(&finding);
            }
        }

        summary
    }

    async fn caption_default(&self, local_path: &str) -> CaptionResult {
        tracing::info!(
            model = self.config.default_prompt.model_hint.as_deref().unwrap_or("default"),
            "Generating alt text for image: {}",
            local_path
        );
        self.captioner
            .caption(local_path, 1, &self.config.default_prompt)
            .await
    }
}

fn line_text(lines: &[String], line_number: usize) -> String {
    lines
        .get(line_number.saturating_sub(1))
        .map(|l| l.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::fake::FakeTool;
    use crate::models::{CaptionPrompt, CaptionStatus, TargetKind};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    fn config(prompts: &[&str]) -> Config {
        Config {
            prompts: prompts.iter().map(|p| CaptionPrompt::new(*p)).collect(),
            default_prompt: CaptionPrompt::new("default").with_model("4o-mini"),
            pacing: Duration::ZERO,
            ..Config::default()
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"img").unwrap();
        path
    }

    #[tokio::test]
    async fn test_full_pass_is_image_major_prompt_minor() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![touch(dir.path(), "a.png"), touch(dir.path(), "b.png")];
        let tool = FakeTool::new();
        let orchestrator = BatchOrchestrator::new(&tool, config(&["p1", "p2", "p3"]));

        let results = orchestrator.full_pass(&images).await;

        assert_eq!(results.len(), 6);
        let order: Vec<(String, usize)> = results
            .iter()
            .map(|r| {
                let name = Path::new(&r.image_path).file_name().unwrap();
                (name.to_string_lossy().into_owned(), r.prompt_index)
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.png".to_string(), 1),
                ("a.png".to_string(), 2),
                ("a.png".to_string(), 3),
                ("b.png".to_string(), 1),
                ("b.png".to_string(), 2),
                ("b.png".to_string(), 3),
            ]
        );
        let prompts: Vec<String> = tool.calls().into_iter().map(|c| c.prompt).collect();
        assert_eq!(prompts, vec!["p1", "p2", "p3", "p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_full_pass_continues_after_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let images = vec![touch(dir.path(), "a.png"), touch(dir.path(), "b.png")];
        let tool = FakeTool::new().then_fail(1, "rate limited");
        let orchestrator = BatchOrchestrator::new(&tool, config(&["p1"]));

        let results = orchestrator.full_pass(&images).await;

        assert_eq!(results.len(), 2);
        assert!(
            matches!(&results[0].status, CaptionStatus::ToolError(d) if d.contains("rate limited"))
        );
        assert_eq!(results[1].status, CaptionStatus::Ok("caption 2".to_string()));
    }

    #[tokio::test]
    async fn test_full_pass_reports_missing_images_without_calls() {
        let tool = FakeTool::new();
        let orchestrator = BatchOrchestrator::new(&tool, config(&["p1", "p2"]));

        let results = orchestrator.full_pass(&[PathBuf::from("/nope/x.png")]).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status == CaptionStatus::FileNotFound));
        assert!(tool.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_pass_paces_every_call() {
        let tool = FakeTool::new();
        let mut cfg = config(&["p1", "p2", "p3"]);
        cfg.pacing = Duration::from_secs(3);
        let orchestrator = BatchOrchestrator::new(&tool, cfg);

        let start = tokio::time::Instant::now();
        orchestrator
            .full_pass(&[PathBuf::from("/nope/a.png"), PathBuf::from("/nope/b.png")])
            .await;

        assert!(start.elapsed() >= Duration::from_secs(18));
    }

    #[tokio::test]
    async fn test_selective_pass_captions_missing_local_references() {
        let dir = tempfile::tempdir().unwrap();
        let base = format!("{}/", dir.path().display());
        touch(dir.path(), "cat.png");
        let doc = dir.path().join("page.md");
        fs::write(
            &doc,
            "# Cats\n![](cat.png)\n![a dog](dog.png)\n  ![ ](http://example.com/x.png) ![](gone.png)\n",
        )
        .unwrap();

        let tool = FakeTool::new().then_ok("  A cat.  ");
        let orchestrator = BatchOrchestrator::new(&tool, config(&["unused"]));
        let mut findings = Vec::new();

        let summary = orchestrator
            .selective_pass(&[doc.clone()], &base, SelectiveMode::Generate, |f| {
                findings.push(f.clone())
            })
            .await;

        assert_eq!(
            summary,
            SelectiveSummary {
                documents_scanned: 1,
                documents_failed: 0,
                references: 4,
                missing_alt_text: 2,
                captioned: 2,
            }
        );
        assert_eq!(findings.len(), 2);

        assert_eq!(findings[0].reference.line_number, 2);
        assert_eq!(findings[0].line, "![](cat.png)");
        let first = findings[0].caption.as_ref().unwrap();
        assert_eq!(first.image_path, format!("{}cat.png", base));
        assert_eq!(first.status, CaptionStatus::Ok("A cat.".to_string()));

        assert!(findings
            .iter()
            .all(|f| f.target.kind == TargetKind::Local));

        let last = findings[1].caption.as_ref().unwrap();
        assert_eq!(last.status, CaptionStatus::FileNotFound);

        let calls = tool.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt, "default");
        assert_eq!(calls[0].model.as_deref(), Some("4o-mini"));
    }

    #[tokio::test]
    async fn test_remote_missing_alt_text_is_reported_only_when_scanning() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("page.md");
        fs::write(&doc, "![](https://example.com/x.png)\n![](http://example.com/y.png)\n").unwrap();

        let tool = FakeTool::new();
        let orchestrator = BatchOrchestrator::new(&tool, config(&["p"]));

        let mut scanned = Vec::new();
        let summary = orchestrator
            .selective_pass(&[doc.clone()], "/base/", SelectiveMode::ScanOnly, |f| {
                scanned.push(f.clone())
            })
            .await;
        assert_eq!(summary.missing_alt_text, 2);
        assert!(scanned
            .iter()
            .all(|f| f.target.kind == TargetKind::Remote && f.caption.is_none()));

        let mut generated = 0;
        let summary = orchestrator
            .selective_pass(&[doc], "/base/", SelectiveMode::Generate, |_| generated += 1)
            .await;
        assert_eq!(generated, 0);
        assert_eq!(summary.missing_alt_text, 0);
        assert_eq!(summary.references, 2);
        assert!(tool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_selective_pass_scan_only_never_captions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "cat.png");
        let doc = dir.path().join("page.md");
        fs::write(&doc, "![](cat.png)\n").unwrap();

        let tool = FakeTool::new();
        let orchestrator = BatchOrchestrator::new(&tool, config(&["p"]));
        let mut count = 0;

        let base = format!("{}/", dir.path().display());
        let summary = orchestrator
            .selective_pass(&[doc], &base, SelectiveMode::ScanOnly, |f| {
                assert!(f.caption.is_none());
                count += 1;
            })
            .await;

        assert_eq!(count, 1);
        assert_eq!(summary.captioned, 0);
        assert!(tool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_selective_pass_skips_unreadable_documents() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.md");
        fs::write(&bad, [0xff, 0xfe]).unwrap();
        let missing = dir.path().join("missing.md");
        let good = dir.path().join("good.md");
        fs::write(&good, "![](x.png)\n").unwrap();

        let tool = FakeTool::new();
        let orchestrator = BatchOrchestrator::new(&tool, config(&["p"]));
        let mut documents_seen = Vec::new();

        let summary = orchestrator
            .selective_pass(
                &[bad, missing, good.clone()],
                "/base/",
                SelectiveMode::ScanOnly,
                |f| documents_seen.push(f.reference.source_document.clone()),
            )
            .await;

        assert_eq!(summary.documents_failed, 2);
        assert_eq!(summary.documents_scanned, 1);
        assert_eq!(documents_seen, vec![good]);
    }
}
