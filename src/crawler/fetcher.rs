//! HTTP fetcher implementation
//!
//! This module handles the crawl's side requests, the ones that never open a page:
//! - Building HTTP clients with proper user agent strings
//! - robots.txt and sitemap downloads
//! - Sitemap discovery probes
//! - PDF downloads for the external PDF pipeline

use reqwest::{header, redirect::Policy, Client};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use super::auth::BasicAuth;
use crate::config::UserAgentConfig;
use crate::{Result, SweepError};

/// Builds an HTTP client with proper configuration
///
/// Page loads handle redirects themselves so every hop can be scope-checked;
/// side requests let reqwest follow up to ten hops.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_sweep::config::UserAgentConfig;
/// use sumi_sweep::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiSweep".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30), false).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
    follow_redirects: bool,
) -> std::result::Result<Client, reqwest::Error> {
    let policy = if follow_redirects {
        Policy::limited(10)
    } else {
        Policy::none()
    };

    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(policy)
        .gzip(true)
        .brotli(true)
        .build()
}

/// A fully read text response
#[derive(Debug, Clone)]
pub struct TextResponse {
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl TextResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Side-request client shared by the robots cache, the sitemap resolver and
/// the PDF download step
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    auth: Option<BasicAuth>,
    extra_headers: HashMap<String, String>,
}

impl Fetcher {
    pub fn new(client: Client, auth: Option<BasicAuth>, extra_headers: HashMap<String, String>) -> Self {
        Self {
            client,
            auth,
            extra_headers,
        }
    }

    /// Headers every request to `url` must carry
    pub fn headers_for(&self, url: &Url) -> HashMap<String, String> {
        let mut headers = self.extra_headers.clone();
        if let Some(auth) = self.auth.as_ref().filter(|a| a.applies_to(url)) {
            headers.insert(
                header::AUTHORIZATION.as_str().to_string(),
                auth.header_value().to_string(),
            );
        }
        headers
    }

    fn get(&self, url: &Url) -> reqwest::RequestBuilder {
        self.headers_for(url)
            .into_iter()
            .fold(self.client.get(url.clone()), |builder, (k, v)| builder.header(k, v))
    }

    /// GETs a URL and reads the body as text, whatever the status
    pub async fn get_text(&self, url: &Url) -> Result<TextResponse> {
        let response = self.get(url).send().await.map_err(|e| classify_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = content_type_of(response.headers());
        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(TextResponse {
            final_url,
            status,
            content_type,
            body,
        })
    }

    /// Returns the status code a GET to `url` answers with
    pub async fn probe(&self, url: &Url) -> Result<u16> {
        let response = self.get(url).send().await.map_err(|e| classify_error(url, e))?;
        Ok(response.status().as_u16())
    }

    /// Downloads a binary resource into `dir`, named by a hash of its URL
    pub async fn download(&self, url: &Url, dir: &Path) -> Result<PathBuf> {
        let response = self.get(url).send().await.map_err(|e| classify_error(url, e))?;
        let response = response
            .error_for_status()
            .map_err(|e| classify_error(url, e))?;
        let bytes = response.bytes().await.map_err(|e| classify_error(url, e))?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(download_file_name(url));
        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!("Downloaded {} ({} bytes) to {}", url, bytes.len(), path.display());
        Ok(path)
    }
}

/// Content-addressed file name for a downloaded URL
fn download_file_name(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());

    let extension = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "pdf".to_string());

    format!("{}.{}", &digest[..16], extension)
}

/// Lowercase media type without parameters
pub fn content_type_of(headers: &header::HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

/// Maps reqwest failures onto crawl errors
pub fn classify_error(url: &Url, error: reqwest::Error) -> SweepError {
    if error.is_timeout() {
        SweepError::Timeout {
            url: url.to_string(),
        }
    } else {
        SweepError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
