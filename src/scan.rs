use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ImageReference;

// ── Constants ────────────────────────────────────────────────────────────────

const RAW_TAG_OPEN: &str = "<img";
const RAW_TAG_CLOSE: char = '>';

// ── Lazy static regexes ──────────────────────────────────────────────────────

// Non-greedy on both groups so `![](a.png) and ![](b.png)` yields two matches.
static IMAGE_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").unwrap());

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Reads a UTF-8 document and scans it. Invalid UTF-8 surfaces as a read error.
pub fn scan_document(path: &Path) -> Result<(Vec<String>, Vec<ImageReference>), ScanError> {
    let content = fs::read_to_string(path).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let lines = split_lines(&content);
    let references = scan(&lines, path);
    Ok((lines, references))
}

/// Finds every `![alt](target)` reference, in line order then left-to-right.
///
/// Lines carrying a raw `<img ...>` tag are skipped whole. Nested brackets and
/// escapes are not understood.
pub fn scan<S: AsRef<str>>(lines: &[S], source_document: &Path) -> Vec<ImageReference> {
    let mut references = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let line_number = idx + 1;

        if has_raw_image_tag(line) {
            tracing::debug!(
                document = %source_document.display(),
                line_number,
                "skipping line with raw image tag"
            );
            continue;
        }

        for cap in IMAGE_REF_RE.captures_iter(line) {
            references.push(ImageReference {
                raw_alt_text: cap[1].to_string(),
                raw_target: cap[2].to_string(),
                line_number,
                source_document: source_document.to_path_buf(),
            });
        }
    }

    references
}

/// Substring heuristic: `<img` and `>` both present, in any order.
fn has_raw_image_tag(line: &str) -> bool {
    line.contains(RAW_TAG_OPEN) && line.contains(RAW_TAG_CLOSE)
}

/// Universal newlines: `\r\n`, `\n` and a bare `\r` all end a line.
fn split_lines(content: &str) -> Vec<String> {
    content
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::to_string)
        .collect()
}
