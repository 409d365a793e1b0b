use std::time::Duration;

/// Image extensions accepted for compression (matched case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Archive extensions that are expanded before scanning (matched case-insensitively).
pub const ARCHIVE_EXTENSIONS: &[&str] = &["tar", "tgz", "zip"];

pub const DEFAULT_SERVICE_URL: &str = "https://tinypng.com";
pub const STORE_PATH: &str = "/backend/opt/store";
pub const PROCESS_PATH: &str = "/backend/opt/process";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Archive entries produced by macOS Finder that never carry user content.
pub const ARCHIVE_METADATA_MARKERS: &[&str] = &["__MACOSX", ".DS_Store"];

pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg} [{pos}/{len}] [{elapsed_precise}]";

// Common output message prefixes
pub const SUCCESS_PREFIX: &str = "✅";
pub const ERROR_PREFIX: &str = "❌";
pub const INFO_PREFIX: &str = "📋";
