//! Multipart file upload and download link extraction

use std::path::Path;

use apkdrop_core::config::UploadConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::UploadError;

/// Sends a file to a hosting endpoint
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Endpoint the file is sent to
    fn endpoint(&self) -> &str;

    /// Upload the file and return the response body
    async fn upload(&self, path: &Path) -> Result<String, UploadError>;
}

/// Streams the file as a single multipart field over HTTP POST
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    endpoint: String,
    field_name: String,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            field_name: field_name.into(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.endpoint, &config.field_name)
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn upload(&self, path: &Path) -> Result<String, UploadError> {
        let read_err = |source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        };

        let file = tokio::fs::File::open(path).await.map_err(read_err)?;
        let length = file.metadata().await.map_err(read_err)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        info!(file = %path.display(), endpoint = %self.endpoint, bytes = length, "uploading file");

        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length).file_name(file_name);
        let form = Form::new().part(self.field_name.clone(), part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UploadError::Status {
                code: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(UploadError::Response)?;
        debug!(bytes = text.len(), "upload response received");
        Ok(text)
    }
}

/// Pull a download link out of one response line.
///
/// A line labelled `DL:` yields the URL after the label. Lines carrying any
/// other upper-case label (`MANAGE:`, `TOR:`) yield nothing. An unlabelled
/// line yields the first token containing `marker`, with trailing `%`
/// progress residue removed.
pub fn extract_download_link(line: &str, marker: &str) -> Option<String> {
    let line = line.trim();

    if let Some((label, rest)) = line.split_once(':') {
        let label = label.trim();
        if !label.is_empty() && label.chars().all(|c| c.is_ascii_uppercase()) {
            if label != "DL" {
                return None;
            }
            return rest.split_whitespace().next().map(clean_token);
        }
    }

    if marker.is_empty() {
        return None;
    }
    line.split_whitespace()
        .find(|token| token.contains(marker))
        .map(clean_token)
}

fn clean_token(token: &str) -> String {
    token.trim_end_matches('%').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Multipart, State};
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::post;
    use axum::Router;
    use tempfile::TempDir;

    const MARKER: &str = "https://oshi.at";

    #[derive(Debug, Clone, PartialEq)]
    struct ReceivedField {
        name: String,
        file_name: Option<String>,
        len: usize,
    }

    #[derive(Clone, Default)]
    struct Received(Arc<Mutex<Vec<ReceivedField>>>);

    async fn accept(State(received): State<Received>, mut multipart: Multipart) -> String {
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let len = field.bytes().await.unwrap().len();
            received.0.lock().unwrap().push(ReceivedField {
                name,
                file_name,
                len,
            });
        }
        "MANAGE: https://oshi.at/a/TjRi\nDL: https://oshi.at/TjRi/dev-build-apk.zip\n".to_string()
    }

    async fn reject() -> (HttpStatus, &'static str) {
        (HttpStatus::SERVICE_UNAVAILABLE, "try later")
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn payload(dir: &TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, vec![7u8; len]).unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_sends_single_named_field() {
        let received = Received::default();
        let router = Router::new()
            .route("/", post(accept))
            .with_state(received.clone());
        let endpoint = serve(router).await;

        let dir = TempDir::new().unwrap();
        let file = payload(&dir, "raf-build-apk.zip", 300);

        let body = HttpUploader::new(format!("{}/", endpoint), "f")
            .upload(&file)
            .await
            .unwrap();

        assert!(body.contains("DL: https://oshi.at/TjRi/dev-build-apk.zip"));
        let fields = received.0.lock().unwrap().clone();
        assert_eq!(
            fields,
            vec![ReceivedField {
                name: "f".to_string(),
                file_name: Some("raf-build-apk.zip".to_string()),
                len: 300,
            }]
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_non_200() {
        let endpoint = serve(Router::new().route("/", post(reject))).await;
        let dir = TempDir::new().unwrap();
        let file = payload(&dir, "raf-build-apk.zip", 16);

        let err = HttpUploader::new(format!("{}/", endpoint), "f")
            .upload(&file)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Status { code: 503 }));
        assert_eq!(err.to_string(), "Failed to upload file. Status code: 503");
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = HttpUploader::new("http://127.0.0.1:9", "f")
            .upload(&dir.path().join("missing.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));
    }

    #[test]
    fn test_extract_labelled_link() {
        assert_eq!(
            extract_download_link("DL: https://oshi.at/TjRi/dev-build-apk.zip", MARKER),
            Some("https://oshi.at/TjRi/dev-build-apk.zip".to_string())
        );
    }

    #[test]
    fn test_other_labels_are_not_links() {
        assert_eq!(
            extract_download_link("MANAGE: https://oshi.at/a/TjRi", MARKER),
            None
        );
        assert_eq!(extract_download_link("TOR: http://oshi.onion/TjRi", MARKER), None);
    }

    #[test]
    fn test_unlabelled_link_strips_progress_residue() {
        assert_eq!(
            extract_download_link("https://oshi.at/TjRi/raf-build-apk.zip%", MARKER),
            Some("https://oshi.at/TjRi/raf-build-apk.zip".to_string())
        );
        assert_eq!(extract_download_link("100 3061k  100", MARKER), None);
        assert_eq!(extract_download_link("", MARKER), None);
    }
}
