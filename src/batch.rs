use crate::client::{CompressionClient, CompressionOutcome};
use crate::error::CompressionError;
use indicatif::ProgressBar;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

pub type Outcomes = BTreeMap<PathBuf, CompressionOutcome>;

/// Aggregated result of compressing a set of images
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub outcomes: Outcomes,
    /// Set when the aggregation itself broke down, e.g. a task panicked.
    /// Outcomes recorded before that stay valid.
    pub failure: Option<CompressionError>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Compress every image concurrently, one task per image.
///
/// There is no concurrency cap. Each task inserts its outcome into the shared map
/// exactly once after its pipeline settles; the function returns when all of
/// them have.
pub async fn batch_compress_images(
    client: Arc<CompressionClient>,
    images: &BTreeSet<PathBuf>,
    progress: Option<&ProgressBar>,
) -> BatchOutcome {
    let outcomes: Arc<Mutex<Outcomes>> = Arc::new(Mutex::new(BTreeMap::new()));

    let handles: Vec<_> = images
        .iter()
        .cloned()
        .map(|image| {
            let client = Arc::clone(&client);
            let outcomes = Arc::clone(&outcomes);
            let progress = progress.cloned();
            let task_image = image.clone();
            let handle = tokio::spawn(async move {
                let (path, outcome) = client.process(&task_image).await;
                debug!("{:?} settled (success: {})", path, outcome.is_success());
                outcomes.lock().await.insert(path, outcome);
                if let Some(progress) = progress {
                    progress.inc(1);
                }
            });
            (image, handle)
        })
        .collect();

    let (paths, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    let joined = futures::future::join_all(handles).await;

    let mut outcomes = std::mem::take(&mut *outcomes.lock().await);
    let mut failure = None;

    for (image, result) in paths.into_iter().zip(joined) {
        if let Err(e) = result {
            error!("Compression task for {:?} failed: {}", image, e);
            outcomes.insert(
                image,
                CompressionOutcome::Failure {
                    message: e.to_string(),
                },
            );
            failure.get_or_insert(CompressionError::Task(e));
        }
    }

    BatchOutcome { outcomes, failure }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ServiceConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_batch_empty_set() {
        let client = Arc::new(CompressionClient::new(ServiceConfig::default(), None).unwrap());
        let result = batch_compress_images(client, &BTreeSet::new(), None).await;
        assert!(result.outcomes.is_empty());
        assert!(result.failure.is_none());
    }

    #[tokio::test]
    async fn test_batch_records_one_outcome_per_image_on_failure() {
        // Nothing listens on port 9 locally, so every upload fails fast.
        let config = ServiceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(5),
        };
        let client = Arc::new(CompressionClient::new(config, None).unwrap());
        let temp_dir = tempfile::TempDir::new().unwrap();
        let images: BTreeSet<_> = ["a.png", "b.jpg", "c.webp"]
            .iter()
            .map(|name| {
                let path = temp_dir.path().join(name);
                std::fs::write(&path, b"data").unwrap();
                path
            })
            .collect();

        let result = batch_compress_images(client, &images, None).await;
        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.failed(), 3);
        assert!(result.failure.is_none());
        for image in &images {
            assert!(!result.outcomes[image].is_success());
        }
    }
}
