use crate::constants::{ARCHIVE_EXTENSIONS, IMAGE_EXTENSIONS};
use std::path::Path;

/// What an input path turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Image,
    Archive,
    Directory,
    Unknown,
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            allowed.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Check whether the file name carries one of the supported image extensions
pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// Check whether the file name carries one of the supported archive extensions
pub fn is_archive_file(path: &Path) -> bool {
    has_extension(path, ARCHIVE_EXTENSIONS)
}

/// Classify a path into exactly one [`PathKind`].
///
/// Directories are recognised through filesystem metadata and take precedence, so a
/// folder called `holiday.zip` is still scanned as a folder. Files are classified by
/// name only; nonexistent paths with an image or archive name are still reported as
/// such, and callers check existence separately.
pub fn classify(path: &Path) -> PathKind {
    if path.is_dir() {
        PathKind::Directory
    } else if is_archive_file(path) {
        PathKind::Archive
    } else if is_image_file(path) {
        PathKind::Image
    } else {
        PathKind::Unknown
    }
}
