use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use url::Url;

use crate::models::{CaptionResult, Finding, TargetKind};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

// ── HTML report ──────────────────────────────────────────────────────────────

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Image Alt Text Generator Results</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 20px; }
        .image-container { margin-bottom: 40px; border-bottom: 1px solid #ccc; padding-bottom: 20px; }
        .alt-text { margin: 10px 0; padding: 10px; background-color: #f9f9f9; border-left: 4px solid #4CAF50; }
        img { max-width: 600px; max-height: 400px; }
        h3 { color: #333; }
    </style>
</head>
<body>
    <h1>Image Alt Text Generator Results</h1>
"#;

const HTML_TAIL: &str = "</body>\n</html>\n";

/// One container per image, in result order; consecutive results for the same
/// image share a container.
pub fn render_html(results: &[CaptionResult]) -> String {
    let mut html = String::from(HTML_HEAD);

    for group in results.chunk_by(|a, b| a.image_path == b.image_path) {
        let image_path = &group[0].image_path;
        let name = Path::new(image_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_path.clone());

        html.push_str("<div class=\"image-container\">\n");
        let _ = writeln!(html, "    <h2>Image: {}</h2>", escape_html(&name));
        let _ = writeln!(
            html,
            "    <img src=\"{}\" alt=\"Original image\">",
            escape_html(&image_src(image_path))
        );
        for result in group {
            let _ = writeln!(html, "    <h3>Alt Text {}:</h3>", result.prompt_index);
            let _ = writeln!(
                html,
                "    <div class=\"alt-text\">{}</div>",
                escape_html(&result.status.to_string())
            );
        }
        html.push_str("</div>\n");
    }

    html.push_str(HTML_TAIL);
    html
}

fn image_src(image_path: &str) -> String {
    Url::from_file_path(image_path)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| image_path.to_string())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── JSON report ──────────────────────────────────────────────────────────────

pub fn render_json(results: &[CaptionResult]) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(results)?)
}

pub fn write_report(path: &Path, contents: &str) -> Result<(), ReportError> {
    fs::write(path, contents).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Selective findings ───────────────────────────────────────────────────────

pub fn render_finding(finding: &Finding) -> String {
    let mut out = format!(
        "\nFile: {}\nMissing alt text line {}: {}\n",
        finding.reference.source_document.display(),
        finding.reference.line_number,
        finding.line
    );
    match (&finding.caption, finding.target.kind) {
        (Some(caption), _) => {
            let _ = writeln!(out, "{}", caption.status);
        }
        (None, TargetKind::Remote) => out.push_str("(remote image, not captioned)\n"),
        (None, TargetKind::Local) => {}
    }
    out
}

pub fn render_finding_json(finding: &Finding) -> Result<String, ReportError> {
    Ok(serde_json::to_string(finding)?)
}
