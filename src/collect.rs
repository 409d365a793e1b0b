use crate::archive::{expand_archive, ArchiveMappings, ExtractedArchive};
use crate::classify::{classify, PathKind};
use crate::error::{CompressionError, Result};
use crate::scan::scan_directory;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// A problem with one input path; the rest of the run is unaffected
#[derive(Debug)]
pub struct InputDiagnostic {
    pub input: PathBuf,
    pub error: CompressionError,
}

/// Everything gathered from the invocation's input paths
#[derive(Debug, Default)]
pub struct Collection {
    /// Canonical image paths, each listed once
    pub images: BTreeSet<PathBuf>,
    /// Archives that were expanded to reach their images
    pub archives: ArchiveMappings,
    pub diagnostics: Vec<InputDiagnostic>,
}

struct Contribution {
    images: Vec<PathBuf>,
    extracted: Option<ExtractedArchive>,
}

fn resolve(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}

fn collect_input(input: &Path, recursive: bool) -> Result<Contribution> {
    if !input.exists() {
        return Err(CompressionError::FileNotFound(input.to_path_buf()));
    }

    let contribution = match classify(input) {
        PathKind::Archive => {
            let extracted = expand_archive(input)?;
            let images = scan_directory(&extracted.content_root, false).map(resolve).collect();
            Contribution {
                images,
                extracted: Some(extracted),
            }
        }
        PathKind::Directory => Contribution {
            images: scan_directory(input, recursive).map(resolve).collect(),
            extracted: None,
        },
        PathKind::Image => Contribution {
            images: vec![resolve(input.to_path_buf())],
            extracted: None,
        },
        PathKind::Unknown => {
            debug!("Skipping unsupported input {:?}", input);
            Contribution {
                images: Vec::new(),
                extracted: None,
            }
        }
    };

    Ok(contribution)
}

/// Turn the raw input paths into a deduplicated set of image files.
///
/// Every input is resolved on its own blocking task. Missing paths and broken
/// archives are logged and recorded as diagnostics without affecting other inputs.
pub async fn collect_images(inputs: &[PathBuf], recursive: bool) -> Collection {
    let handles: Vec<_> = inputs
        .iter()
        .cloned()
        .map(|input| {
            tokio::task::spawn_blocking(move || {
                let result = collect_input(&input, recursive);
                (input, result)
            })
        })
        .collect();

    let mut collection = Collection::default();

    for joined in futures::future::join_all(handles).await {
        let (input, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                error!("Input collection task failed: {}", e);
                continue;
            }
        };

        match result {
            Ok(contribution) => {
                debug!("{:?} contributed {} image(s)", input, contribution.images.len());
                collection.images.extend(contribution.images);
                if let Some(extracted) = contribution.extracted {
                    collection.archives.insert(extracted);
                }
            }
            Err(e) => {
                error!("{}", e);
                collection.diagnostics.push(InputDiagnostic { input, error: e });
            }
        }
    }

    collection
}
