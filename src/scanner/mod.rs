//! Seams to the collaborators that consume crawled pages
//!
//! The crawl engine never evaluates page content itself. Loaded HTML pages go to
//! a [`Scanner`]; downloaded PDFs go to a [`PdfHandoff`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::browser::PageSession;

/// Errors raised by a scanner implementation
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("page is no longer available: {0}")]
    PageClosed(String),

    #[error("scan failed: {0}")]
    Failed(String),
}

/// One rule outcome reported by the scanner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: Option<String>,
    /// Selectors of the affected elements
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Structured result of scanning one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub page_title: String,
    pub violations: Vec<Finding>,
    pub passes: Vec<Finding>,
    pub incomplete: Vec<Finding>,
}

/// Options forwarded to the scanner for every page
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Rule tags to evaluate; empty means the scanner's default set
    pub rule_tags: Vec<String>,
}

/// Evaluates a loaded page
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(
        &self,
        page: &mut dyn PageSession,
        options: &ScanOptions,
    ) -> Result<ScanResult, ScanError>;
}

/// Scanner that only records the page title
///
/// Used when no rule evaluator is plugged in, so a run still produces a
/// complete dataset of what was crawled.
#[derive(Debug, Clone, Default)]
pub struct PassthroughScanner;

#[async_trait]
impl Scanner for PassthroughScanner {
    async fn scan(
        &self,
        page: &mut dyn PageSession,
        _options: &ScanOptions,
    ) -> Result<ScanResult, ScanError> {
        let title = page
            .title()
            .await
            .map_err(|e| ScanError::PageClosed(e.to_string()))?;

        Ok(ScanResult {
            page_title: title.unwrap_or_default(),
            ..Default::default()
        })
    }
}

/// A downloaded PDF ready for the external PDF pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfDocument {
    pub url: String,
    pub downloaded_file_path: PathBuf,
}

impl PdfDocument {
    pub fn new(url: &Url, path: &Path) -> Self {
        Self {
            url: url.to_string(),
            downloaded_file_path: path.to_path_buf(),
        }
    }
}

/// Receives PDFs the crawl downloaded
#[async_trait]
pub trait PdfHandoff: Send + Sync {
    async fn hand_off(&self, document: PdfDocument);
}

/// Handoff that only logs what would be sent
#[derive(Debug, Clone, Default)]
pub struct LoggingPdfHandoff;

#[async_trait]
impl PdfHandoff for LoggingPdfHandoff {
    async fn hand_off(&self, document: PdfDocument) {
        tracing::info!(
            "PDF ready for scanning: {} -> {}",
            document.url,
            document.downloaded_file_path.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_result_json_shape() {
        let result = ScanResult {
            page_title: "Home".into(),
            violations: vec![Finding {
                rule_id: "image-alt".into(),
                description: "Images must have alternate text".into(),
                impact: Some("critical".into()),
                nodes: vec!["img.hero".into()],
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pageTitle"], "Home");
        assert_eq!(json["violations"][0]["ruleId"], "image-alt");
        assert!(json["passes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_pdf_document_serializes_path() {
        let url = Url::parse("https://example.com/a.pdf").unwrap();
        let doc = PdfDocument::new(&url, Path::new("/tmp/a.pdf"));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["downloadedFilePath"], "/tmp/a.pdf");
    }
}
