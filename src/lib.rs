pub mod app;
pub mod archive;
pub mod batch;
pub mod classify;
pub mod cli;
pub mod client;
pub mod collect;
pub mod constants;
pub mod error;
pub mod formats;
pub mod locale;
pub mod logger;
pub mod options;
pub mod report;
pub mod scan;
pub mod utils;

pub use app::{run, RunSummary};
pub use archive::{archive_inputs, expand_archive, ArchiveMappings, ExtractedArchive};
pub use batch::{batch_compress_images, BatchOutcome};
pub use classify::{classify, is_archive_file, is_image_file, PathKind};
pub use client::{CompressionClient, CompressionMetrics, CompressionOutcome};
pub use collect::{collect_images, Collection, InputDiagnostic};
pub use error::{CompressionError, Result};
pub use formats::{ArchiveFormat, ConfirmedType, ImageType};
pub use locale::Language;
pub use options::{RunOptions, ServiceConfig};
pub use scan::scan_directory;
