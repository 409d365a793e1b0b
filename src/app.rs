use crate::archive::archive_inputs;
use crate::batch::{batch_compress_images, BatchOutcome};
use crate::classify::{classify, PathKind};
use crate::client::{CompressionClient, CompressionOutcome};
use crate::collect::{collect_images, InputDiagnostic};
use crate::constants::{ERROR_PREFIX, SUCCESS_PREFIX};
use crate::error::{CompressionError, Result};
use crate::locale::Message;
use crate::options::RunOptions;
use crate::report::render_results;
use crate::utils::create_progress_spinner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, warn};

/// What a run produced, for callers that want more than the printed table
#[derive(Debug)]
pub struct RunSummary {
    pub diagnostics: Vec<InputDiagnostic>,
    pub batch: BatchOutcome,
    /// `None` when archiving was not requested or nothing was compressed
    pub archives: Option<Result<Vec<PathBuf>>>,
}

/// Collect, compress, report and optionally archive.
///
/// Only failing to set up the HTTP client aborts the run; everything else is
/// reported per input or per image.
pub async fn run(options: &RunOptions) -> Result<RunSummary> {
    let language = options.language;
    let mut collection = collect_images(&options.paths, options.recursive).await;
    let client = Arc::new(CompressionClient::new(options.service.clone(), options.convert)?);

    let batch = if collection.images.is_empty() {
        warn!("{}", language.text(Message::NoImagesFound));
        BatchOutcome::default()
    } else {
        let spinner = create_progress_spinner(
            language.text(Message::StartCompressingImage),
            collection.images.len() as u64,
        );
        let batch = batch_compress_images(client, &collection.images, Some(&spinner)).await;
        match &batch.failure {
            None => spinner.finish_with_message(format!(
                "{} {}",
                SUCCESS_PREFIX,
                language.text(Message::CompressImageComplete)
            )),
            Some(e) => {
                spinner.abandon_with_message(format!(
                    "{} {}",
                    ERROR_PREFIX,
                    language.text(Message::CompressImageFailure)
                ));
                error!("{}: {}", language.text(Message::CompressImageFailure), e);
            }
        }
        batch
    };

    if !batch.outcomes.is_empty() {
        println!("{}", render_results(&batch, language));
    }

    let archives = match options.archive {
        Some(format) if !batch.outcomes.is_empty() => {
            let spinner = create_progress_spinner(
                language.text(Message::StartGeneratingArchive),
                options.paths.len() as u64,
            );
            let targets = archive_targets(&options.paths, &batch);
            let result = archive_inputs(&targets, format, &mut collection.archives).await;
            match &result {
                Ok(_) => spinner.finish_with_message(format!(
                    "{} {}",
                    SUCCESS_PREFIX,
                    language.text(Message::GenerateArchiveSuccess)
                )),
                Err(e) => {
                    spinner.abandon_with_message(format!(
                        "{} {}",
                        ERROR_PREFIX,
                        language.text(Message::GenerateArchiveFailure)
                    ));
                    warn!("{}: {}", language.text(Message::GenerateArchiveFailure), e);
                }
            }
            Some(result)
        }
        _ => None,
    };

    collection.archives.retain_outputs(
        batch
            .outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_success())
            .map(|(path, _)| path.as_path()),
    );
    collection.archives.cleanup();

    Ok(RunSummary {
        diagnostics: collection.diagnostics,
        batch,
        archives,
    })
}

/// Canonical form of a path that may no longer exist
fn canonical_lost_path(path: &Path) -> Option<PathBuf> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Some(parent.canonicalize().ok()?.join(path.file_name()?))
}

/// The inputs to archive, with image inputs renamed by a conversion replaced by
/// the path that now holds their compressed bytes
fn archive_targets(paths: &[PathBuf], batch: &BatchOutcome) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|input| {
            if input.exists() || classify(input) != PathKind::Image {
                return input.clone();
            }
            let Some(source) = canonical_lost_path(input) else {
                return input.clone();
            };
            batch
                .outcomes
                .iter()
                .find_map(|(path, outcome)| match outcome {
                    CompressionOutcome::Success(metrics) if metrics.source == source => Some(path.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| input.clone())
        })
        .collect()
}

impl RunSummary {
    /// First archive error, if archiving was attempted and failed
    pub fn archive_error(&self) -> Option<&CompressionError> {
        self.archives.as_ref().and_then(|r| r.as_ref().err())
    }
}
