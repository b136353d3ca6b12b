use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use url::Url;
use crate::config::UploadConfig;
use super::errors::{Result, UploadError};
use super::progress::ProgressReporter;
use super::progress_stream::ProgressStream;
use super::traits::Transport;

/// Streams a file to the configured endpoint as a single POST.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    headers: HeaderMap,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|err| UploadError::config(format!("invalid endpoint '{}': {}", config.endpoint, err)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            headers: Self::create_headers(config)?,
            chunk_size: config.chunk_size.max(1),
        })
    }

    pub fn create_headers(config: &UploadConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(&config.content_type)?);

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", config.token))?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        Ok(headers)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn open_source(source: &Path) -> Result<(File, u64)> {
        let missing = |err: std::io::Error| {
            if err.kind() == std::io::ErrorKind::NotFound {
                UploadError::SourceMissing(source.to_path_buf())
            } else {
                UploadError::Io(err)
            }
        };

        let file = File::open(source).await.map_err(missing)?;
        let file_size = file.metadata().await.map_err(missing)?.len();

        Ok((file, file_size))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(&self, source: &Path, progress: ProgressReporter) -> Result<()> {
        let upload_id = progress.upload_id();
        let (file, file_size) = Self::open_source(source).await?;

        let file_stream = ReaderStream::with_capacity(file, self.chunk_size);
        let body = Body::wrap_stream(ProgressStream::new(file_stream, file_size, progress));

        tracing::debug!(%upload_id, endpoint = %self.endpoint, file_size, "sending upload request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .header(CONTENT_LENGTH, file_size)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!(%upload_id, status_code = status.as_u16(), "upload rejected");
            return Err(UploadError::application_failure(status.as_u16(), message));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UploadConfig {
        UploadConfig {
            endpoint: "http://localhost:8080/upload".to_string(),
            content_type: "video/quicktime".to_string(),
            token: "secret".to_string(),
            timeout_secs: 30,
            chunk_size: 1024,
        }
    }

    #[test]
    fn test_create_headers() {
        let headers = HttpTransport::create_headers(&config()).unwrap();

        assert_eq!(headers[CONTENT_TYPE], "video/quicktime");
        assert_eq!(headers[AUTHORIZATION], "Bearer secret");
        assert!(headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let mut config = config();
        config.endpoint = "not a url".to_string();

        assert!(matches!(HttpTransport::new(&config), Err(UploadError::Config(_))));
    }

    #[test]
    fn test_rejects_invalid_token() {
        let mut config = config();
        config.token = "line\nbreak".to_string();

        assert!(matches!(HttpTransport::new(&config), Err(UploadError::InvalidHeaderValue(_))));
    }

    #[tokio::test]
    async fn test_missing_source_is_reported() {
        let transport = HttpTransport::new(&config()).unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(crate::upload::types::UploadId::new(), tx);

        let result = transport.upload(Path::new("/nonexistent/clip.mov"), reporter).await;
        assert!(matches!(result, Err(UploadError::SourceMissing(_))));
    }
}
