use anyhow::{Context, Result};
use reqwest::multipart;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::config::BotConfig;

/// One entry of a frame API search response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameResult {
    pub name: String,
    pub subtitle: String,
}

/// A frame with its image already fetched, ready to be sent to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub image: Vec<u8>,
    pub subtitle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
    Fuzzy(String),
    Random,
    Exact(String),
}

impl QueryMode {
    fn label(&self) -> &'static str {
        match self {
            QueryMode::Fuzzy(_) => "fuzzy",
            QueryMode::Random => "random",
            QueryMode::Exact(_) => "exact",
        }
    }
}

/// Result of pushing a local image to the frame API.
#[derive(Debug)]
pub enum UploadOutcome {
    /// The API accepted the image.
    Created,
    /// The API answered with a non-success status.
    Rejected { status: StatusCode, body: String },
    /// The request never produced a response (connect error, timeout, ...).
    Failed(anyhow::Error),
}

pub struct FrameApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl FrameApiClient {
    pub fn new(config: &BotConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base().to_string(),
        })
    }

    pub fn search_url(&self, mode: &QueryMode, count: u32) -> String {
        match mode {
            QueryMode::Fuzzy(text) => format!(
                "{}/frame/fuzzy/{}/{}",
                self.base_url,
                urlencoding::encode(text),
                count
            ),
            QueryMode::Random => format!("{}/frame/random/{}", self.base_url, count),
            QueryMode::Exact(text) => format!(
                "{}/frame/exact/{}/{}",
                self.base_url,
                urlencoding::encode(text),
                count
            ),
        }
    }

    pub fn image_url(&self, name: &str) -> String {
        format!("{}/frame/{}", self.base_url, urlencoding::encode(name))
    }

    pub fn upload_url(&self) -> String {
        format!("{}/frame", self.base_url)
    }

    /// Look up frames and download their images, preserving API order.
    ///
    /// An empty vector means "nothing found"; callers decide whether a failed
    /// lookup is worth telling the user about.
    pub async fn query(&self, mode: &QueryMode, count: u32) -> Result<Vec<Frame>> {
        let results = self.search(mode, count).await?;

        let mut frames = Vec::with_capacity(results.len());
        for result in results {
            let image = self.fetch_image(&result.name).await?;
            frames.push(Frame {
                image,
                subtitle: result.subtitle,
            });
        }

        Ok(frames)
    }

    pub async fn search(&self, mode: &QueryMode, count: u32) -> Result<Vec<FrameResult>> {
        let url = self.search_url(mode, count);
        debug!("Querying frame API ({}): {}", mode.label(), url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to frame API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Frame API error ({}): {}", status, error_body);
        }

        response
            .json::<Vec<FrameResult>>()
            .await
            .context("Failed to parse frame API response")
    }

    pub async fn fetch_image(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.image_url(name);
        debug!("Fetching frame image: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch frame image '{}'", name))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Frame API error ({}) fetching image '{}'", status, name);
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read frame image '{}'", name))?;
        Ok(bytes.to_vec())
    }

    /// POST a local image as the multipart field `image`.
    ///
    /// Reading the local file is a hard error; everything after that is
    /// folded into an [`UploadOutcome`].
    pub async fn upload(&self, path: &Path, file_name: &str) -> Result<UploadOutcome> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read upload file: {}", path.display()))?;

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))
            .context("Invalid MIME type for upload")?;
        let form = multipart::Form::new().part("image", part);

        let url = self.upload_url();
        debug!("Uploading {} to {}", file_name, url);

        let response = match self.client.post(&url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => return Ok(UploadOutcome::Failed(e.into())),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(UploadOutcome::Created);
        }

        let body = response.text().await.unwrap_or_default();
        Ok(UploadOutcome::Rejected { status, body })
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
