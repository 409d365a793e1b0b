use crate::constants::{FALLBACK_MIME_TYPE, PROCESS_PATH, STORE_PATH};
use crate::error::{CompressionError, Result};
use crate::formats::{ConfirmedType, ImageType};
use crate::options::ServiceConfig;
use crate::utils::{build_endpoint_url, random_forwarded_ip};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const FORWARDED_FOR: &str = "X-Forwarded-For";

/// Reply of the store endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct StoreResponse {
    pub key: String,
    pub url: String,
    pub size: u64,
}

/// Reply of the process endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResponse {
    pub key: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConvertDirective {
    #[serde(rename = "type")]
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest<'a> {
    key: &'a str,
    original_size: u64,
    original_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    convert: Option<ConvertDirective>,
}

/// Measurements of one successfully compressed image
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionMetrics {
    /// Path the image was read from; differs from the outcome key after a conversion
    pub source: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
    pub width: u32,
    pub height: u32,
    pub remote_key: String,
    pub url: String,
    /// Type implied by the file extension before upload
    pub declared_type: Option<ImageType>,
    /// Type sniffed from the downloaded bytes
    pub confirmed_type: ConfirmedType,
}

/// Terminal state of one image
#[derive(Debug, Clone, PartialEq)]
pub enum CompressionOutcome {
    Success(CompressionMetrics),
    Failure { message: String },
}

impl CompressionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompressionOutcome::Success(_))
    }
}

/// HTTP client for the TinyPNG web backend
#[derive(Debug, Clone)]
pub struct CompressionClient {
    http: reqwest::Client,
    config: ServiceConfig,
    convert: Option<ImageType>,
}

impl CompressionClient {
    pub fn new(config: ServiceConfig, convert: Option<ImageType>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            convert,
        })
    }

    /// Compress one image in place.
    ///
    /// Never fails: every error ends up as [`CompressionOutcome::Failure`] keyed by
    /// the input path. On success the key is the path that now holds the
    /// compressed bytes, which differs from the input when the format changed.
    pub async fn process(&self, image: &Path) -> (PathBuf, CompressionOutcome) {
        match self.try_process(image).await {
            Ok((path, metrics)) => (path, CompressionOutcome::Success(metrics)),
            Err(e) => {
                debug!("Compression of {:?} failed: {}", image, e);
                (
                    image.to_path_buf(),
                    CompressionOutcome::Failure {
                        message: e.to_string(),
                    },
                )
            }
        }
    }

    async fn try_process(&self, image: &Path) -> Result<(PathBuf, CompressionMetrics)> {
        let data = tokio::fs::read(image).await?;
        let declared_type = ImageType::from_path(image);
        let declared_mime = declared_type.map_or(FALLBACK_MIME_TYPE, |t| t.mime_type());

        let stored = self.store(data).await?;
        debug!("Stored {:?} as {} ({} bytes)", image, stored.key, stored.size);

        let processed = self.optimize(&stored, declared_mime).await?;
        let bytes = self.download(&processed.url).await?;

        let confirmed_type = ConfirmedType::sniff(&bytes)?;
        let final_path = if confirmed_type.mime_type() != declared_mime {
            image.with_extension(confirmed_type.extension())
        } else {
            image.to_path_buf()
        };

        let source = image.to_path_buf();
        let target = final_path.clone();
        tokio::task::spawn_blocking(move || replace_file(&source, &target, &bytes)).await??;

        Ok((
            final_path,
            CompressionMetrics {
                source: image.to_path_buf(),
                original_size: stored.size,
                compressed_size: processed.size,
                width: processed.width,
                height: processed.height,
                remote_key: processed.key,
                url: processed.url,
                declared_type,
                confirmed_type,
            },
        ))
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(CACHE_CONTROL, "no-cache")
            .header(FORWARDED_FOR, random_forwarded_ip())
    }

    async fn store(&self, data: Vec<u8>) -> Result<StoreResponse> {
        let url = build_endpoint_url(&self.config.base_url, STORE_PATH);
        let response = self
            .request(self.http.post(url))
            .header(CONTENT_TYPE, "multipart/form-data")
            .body(data)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(CompressionError::Rejected(response.text().await?));
        }
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }

    async fn optimize(&self, stored: &StoreResponse, original_type: &str) -> Result<ProcessResponse> {
        let convert = self
            .convert
            .filter(|target| target.mime_type() != original_type)
            .map(|target| ConvertDirective {
                mime_type: target.mime_type(),
            });
        let body = ProcessRequest {
            key: &stored.key,
            original_size: stored.size,
            original_type,
            convert,
        };

        let url = build_endpoint_url(&self.config.base_url, PROCESS_PATH);
        let response = self.request(self.http.post(url)).json(&body).send().await?;
        let status = response.status();
        let payload = response.bytes().await?;

        if status != StatusCode::CREATED {
            let message = serde_json::from_slice::<ErrorResponse>(&payload)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| String::from_utf8_lossy(&payload).into_owned());
            return Err(CompressionError::Rejected(message));
        }
        Ok(serde_json::from_slice(&payload)?)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .request(self.http.get(url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Write `bytes` to `target` in one step and drop `source` if the name changed.
///
/// The data goes to a temporary file beside the target which is then renamed over
/// it, so readers never observe a partially written image. A renamed output never
/// replaces a file that already exists under the new name.
fn replace_file(source: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    if let Ok(metadata) = fs::metadata(source) {
        fs::set_permissions(staged.path(), metadata.permissions())?;
    }
    let persisted = if source == target {
        staged.persist(target)
    } else {
        staged.persist_noclobber(target)
    };
    persisted.map_err(|e| match e.error.kind() {
        io::ErrorKind::AlreadyExists => CompressionError::TargetExists(target.to_path_buf()),
        _ => CompressionError::Io(e.error),
    })?;

    if source != target {
        fs::remove_file(source)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_process_request_omits_convert_when_absent() {
        let body = ProcessRequest {
            key: "abc",
            original_size: 42,
            original_type: "image/png",
            convert: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"key": "abc", "originalSize": 42, "originalType": "image/png"})
        );
    }

    #[test]
    fn test_process_request_with_convert() {
        let body = ProcessRequest {
            key: "abc",
            original_size: 42,
            original_type: "image/png",
            convert: Some(ConvertDirective {
                mime_type: "image/webp",
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["convert"]["type"], "image/webp");
    }

    #[test]
    fn test_process_response_deserializes_type_field() {
        let json = r#"{"key":"k","size":10,"type":"image/png","width":3,"height":4,"url":"http://x/y"}"#;
        let response: ProcessResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.mime_type, "image/png");
        assert_eq!((response.width, response.height), (3, 4));
    }

    #[test]
    fn test_replace_file_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.png");
        fs::write(&path, b"old contents").unwrap();

        replace_file(&path, &path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_replace_file_renames() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.png");
        let target = temp_dir.path().join("a.webp");
        fs::write(&source, b"old").unwrap();

        replace_file(&source, &target, b"new").unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_replace_file_refuses_to_overwrite_other_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.png");
        let target = temp_dir.path().join("a.jpg");
        fs::write(&source, b"png").unwrap();
        fs::write(&target, b"someone else").unwrap();

        let result = replace_file(&source, &target, b"converted");
        assert!(matches!(result, Err(CompressionError::TargetExists(ref p)) if p == &target));
        assert_eq!(fs::read(&source).unwrap(), b"png");
        assert_eq!(fs::read(&target).unwrap(), b"someone else");
    }

    #[tokio::test]
    async fn test_process_missing_file_is_failure() {
        let client = CompressionClient::new(ServiceConfig::default(), None).unwrap();
        let (path, outcome) = client.process(Path::new("/nonexistent/a.png")).await;
        assert_eq!(path, PathBuf::from("/nonexistent/a.png"));
        assert!(matches!(outcome, CompressionOutcome::Failure { .. }));
    }
}
