//! Image upload over HTTP.
//!
//! Images do not travel over the socket. They are posted as a multipart form
//! (`image` + `session_id`) to the upload endpoint; the server then announces
//! the stored image to both participants as an ordinary chat record carrying
//! `image_url`.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Url;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::protocol::UploadResponse;

/// Header carrying the CSRF token expected by the upload endpoint.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Default per-request timeout for uploads.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts images to the upload endpoint for one session.
#[derive(Debug, Clone)]
pub struct ImageUploader {
    client: reqwest::Client,
    url: Url,
    session_id: String,
    csrf_token: Option<String>,
}

impl ImageUploader {
    pub fn new(url: Url, session_id: impl Into<String>) -> Self {
        Self::with_timeout(url, session_id, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: Url, session_id: impl Into<String>, timeout: Duration) -> Self {
        // Builder failure falls back to a default client instead of panicking.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url,
            session_id: session_id.into(),
            csrf_token: None,
        }
    }

    /// Attach a CSRF token sent as [`CSRF_HEADER`] on every upload.
    pub fn csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Read `path` from disk and upload it.
    pub async fn upload_file(&self, path: &Path) -> Result<UploadResponse, ChatError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| ChatError::ImageRead {
            path: path.display().to_string(),
            source: e,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        self.upload_bytes(file_name, bytes).await
    }

    /// Upload raw image bytes under `file_name`.
    ///
    /// # Returns
    /// - `Ok(UploadResponse)` for any response whose body is JSON, including
    ///   non-2xx answers; the application error, if any, is in `error`.
    /// - `Err(ChatError::UploadTransport)` when the request never completes.
    /// - `Err(ChatError::UploadDecode)` when the body is not JSON.
    pub async fn upload_bytes(
        &self,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, ChatError> {
        let size = bytes.len();
        let form = Form::new()
            .part("image", Part::bytes(bytes).file_name(file_name.clone()))
            .text("session_id", self.session_id.clone());

        let mut request = self.client.post(self.url.clone()).multipart(form);
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }

        debug!(file = %file_name, size, url = %self.url, "uploading image");
        let resp = request.send().await.map_err(|e| ChatError::UploadTransport {
            url: self.url.to_string(),
            detail: e.to_string(),
        })?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| ChatError::UploadTransport {
            url: self.url.to_string(),
            detail: e.to_string(),
        })?;

        let parsed: UploadResponse =
            serde_json::from_slice(&body).map_err(|e| ChatError::UploadDecode {
                url: self.url.to_string(),
                detail: format!("HTTP {}: {e}", status.as_u16()),
            })?;

        if let Some(err) = &parsed.error {
            warn!(status = status.as_u16(), error = %err, "upload rejected by server");
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server: captures the raw request and answers with `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            // Read until the multipart terminator shows up.
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if text.contains("--\r\n") && text.contains("session_id") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (Url::parse(&format!("http://{addr}/chat/upload/")).unwrap(), handle)
    }

    #[tokio::test]
    async fn upload_posts_multipart_with_session_and_csrf() {
        let (url, server) = serve_once("200 OK", r#"{"status":"ok"}"#).await;
        let uploader = ImageUploader::new(url, "sess-1").csrf_token("tok");
        let resp = uploader
            .upload_bytes("x.png".to_string(), vec![1, 2, 3])
            .await
            .unwrap();
        assert!(resp.error.is_none());

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /chat/upload/"), "{raw}");
        assert!(raw.to_ascii_lowercase().contains("x-csrftoken: tok"), "{raw}");
        assert!(raw.contains(r#"name="image"; filename="x.png""#), "{raw}");
        assert!(raw.contains(r#"name="session_id""#), "{raw}");
        assert!(raw.contains("sess-1"), "{raw}");
    }

    #[tokio::test]
    async fn upload_surfaces_error_field() {
        let (url, _server) = serve_once("400 Bad Request", r#"{"error":"Invalid image"}"#).await;
        let uploader = ImageUploader::new(url, "s");
        let resp = uploader.upload_bytes("a.jpg".to_string(), vec![0]).await.unwrap();
        assert_eq!(resp.error.as_deref(), Some("Invalid image"));
    }

    #[tokio::test]
    async fn non_json_body_is_decode_error() {
        let (url, _server) = serve_once("500 Internal Server Error", "oops").await;
        let uploader = ImageUploader::new(url, "s");
        let err = uploader.upload_bytes("a.jpg".to_string(), vec![0]).await.unwrap_err();
        assert!(matches!(err, ChatError::UploadDecode { .. }), "{err}");
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let uploader = ImageUploader::new(Url::parse("http://127.0.0.1:1/").unwrap(), "s");
        let err = uploader
            .upload_file(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ImageRead { .. }));
    }
}
