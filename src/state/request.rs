use serde::Serialize;
use std::collections::HashMap;
use url::Url;

use super::status;
use crate::scanner::ScanResult;

/// A unit of work in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// URL to load (never carries credentials)
    pub url: Url,
    /// The URL as it was enqueued; compared with the final URL to spot redirects
    pub label: String,
    /// Fetch bytes instead of opening a page (PDFs)
    pub skip_navigation: bool,
    /// Extra headers for this request
    pub headers: HashMap<String, String>,
}

impl Request {
    pub fn new(url: Url) -> Self {
        Self {
            label: url.to_string(),
            url,
            skip_navigation: false,
            headers: HashMap::new(),
        }
    }

    pub fn skip_navigation(mut self, skip: bool) -> Self {
        self.skip_navigation = skip;
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// The outcome record of one classified URL
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub url: String,
    pub actual_url: Option<String>,
    pub page_title: Option<String>,
    pub metadata: String,
    pub http_status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_result: Option<ScanResult>,
}

impl PageInfo {
    /// Builds a record for a status code, folding undocumented codes into the
    /// uncommon-status code while keeping the real value in the metadata text
    pub fn new(url: impl Into<String>, code: u16) -> Self {
        let normalized = status::normalize(code);
        let metadata = if normalized == code {
            status::describe(code).to_string()
        } else {
            format!("{} ({})", status::describe(normalized), code)
        };

        Self {
            url: url.into(),
            actual_url: None,
            page_title: None,
            metadata,
            http_status_code: normalized,
            scan_result: None,
        }
    }

    pub fn with_actual_url(mut self, actual_url: impl Into<String>) -> Self {
        self.actual_url = Some(actual_url.into());
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.page_title = title;
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn with_scan(mut self, result: ScanResult) -> Self {
        if self.page_title.is_none() && !result.page_title.is_empty() {
            self.page_title = Some(result.page_title.clone());
        }
        self.scan_result = Some(result);
        self
    }
}

/// A redirect that was followed and scanned under its final URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectPair {
    pub from_url: String,
    pub to_url: String,
}
