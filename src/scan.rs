use crate::classify::is_image_file;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazily enumerate image files in `dir`.
///
/// Without `recursive` only direct children are considered. Hidden entries are
/// skipped, and entries that cannot be read are dropped silently, matching how
/// unknown files are treated.
pub fn scan_directory(dir: &Path, recursive: bool) -> impl Iterator<Item = PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir).min_depth(1)
    } else {
        WalkDir::new(dir).min_depth(1).max_depth(1)
    };

    walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_image_file(entry.path()))
        .map(|entry| entry.into_path())
}
