use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    #[error("Path '{}' does not exist.", .0.display())]
    NotFound(PathBuf),
}

/// Unreadable entries below the root are logged and dropped.
fn readable(entry: walkdir::Result<DirEntry>) -> Option<DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(err) => {
            tracing::warn!(error = %err, "skipping unreadable entry");
            None
        }
    }
}

/// Every `*.md` file (case-insensitive) under `root`, sorted by path.
/// Symlinks are followed.
pub fn find_markdown_files(root: &Path) -> Result<Vec<PathBuf>, DiscoverError> {
    if !root.exists() {
        return Err(DiscoverError::NotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(readable)
    {
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .ends_with(".md")
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Image files directly inside `dir` whose extension is in `extensions`,
/// compared case-insensitively, sorted by path.
pub fn find_images(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, DiscoverError> {
    if !dir.exists() {
        return Err(DiscoverError::NotFound(dir.to_path_buf()));
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(readable)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let allowed = entry
            .path()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false);
        if allowed {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}
