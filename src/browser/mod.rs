//! Page engines
//!
//! The crawl drives pages through two traits: a [`Browser`] opens one
//! [`PageSession`] per worker, and the session loads, reads and clicks pages.
//!
//! - [`HttpBrowser`]: reqwest-based engine with manual redirect handling
//! - `ChromiumBrowser` (feature `chromium`): a real headless browser

#[cfg(feature = "chromium")]
mod chromium;
mod http;
mod profile;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumBrowser;
pub use http::{HttpBrowser, RedirectScope};
pub use profile::WorkerProfile;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use crate::state::Request;
use crate::Result;

/// Channel that dynamically discovered URLs are pushed onto
pub type DiscoverySink = UnboundedSender<String>;

/// What a navigation ended on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    /// URL the page settled on, after redirects
    pub final_url: Url,
    /// HTTP status of the main document, when the engine knows it
    pub status: Option<u16>,
    /// Media type without parameters
    pub content_type: Option<String>,
    /// The response was a forced download rather than a document
    pub is_download: bool,
}

impl LoadedPage {
    /// True when the page holds an HTML document a scanner can read
    pub fn is_html(&self) -> bool {
        if self.is_download || self.final_url.as_str() == "about:blank" {
            return false;
        }
        match self.content_type.as_deref() {
            None => true,
            Some(ct) => ct == "text/html" || ct == "application/xhtml+xml",
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf") || crate::url::is_pdf_url(&self.final_url)
    }
}

/// An element that may navigate when clicked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickTarget {
    /// Position among the clickable elements of the current page
    pub index: usize,
    /// Navigation target readable without clicking
    pub static_target: Option<String>,
}

/// One open page owned by a single worker
#[async_trait]
pub trait PageSession: Send {
    /// Loads a request, applying its headers
    async fn navigate(&mut self, request: &Request) -> Result<LoadedPage>;

    /// Serialized DOM of the current page
    async fn content(&mut self) -> Result<String>;

    async fn title(&mut self) -> Result<Option<String>>;

    /// URL the page shows right now, including moves made by clicks
    async fn current_url(&mut self) -> Option<Url>;

    /// Clickable non-anchor elements matching `selectors`
    async fn clickable_targets(&mut self, selectors: &[&str]) -> Result<Vec<ClickTarget>>;

    /// Whether [`PageSession::click`] can do anything on this engine
    fn can_click(&self) -> bool {
        true
    }

    /// Clicks an element; URLs it opens or navigates to go to `sink`
    async fn click(&mut self, target: &ClickTarget, sink: &DiscoverySink) -> Result<()>;

    /// Brings the page back to `url` after a click moved it away
    async fn return_to(&mut self, url: &Url) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Opens page sessions for workers
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a session using the worker's private profile directory
    ///
    /// Failures here are launch errors and end the run.
    async fn open_session(&self, profile: &WorkerProfile) -> Result<Box<dyn PageSession>>;
}
