//! Shared fixtures for crawler unit tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::coordinator::CrawlContext;
use super::fetcher::Fetcher;
use super::parser::extract_title_from;
use super::scheduler::AbortController;
use crate::browser::{ClickTarget, DiscoverySink, LoadedPage, PageSession};
use crate::robots::RobotsCache;
use crate::scanner::{LoggingPdfHandoff, PassthroughScanner, ScanOptions};
use crate::state::{CrawlState, Request};
use crate::url::{Blacklist, ScopeStrategy};
use crate::{Result, SweepError};

pub(crate) fn test_context(seed: &str, state: Arc<CrawlState>) -> CrawlContext {
    let fetcher = Fetcher::new(reqwest::Client::new(), None, HashMap::new());
    CrawlContext {
        state,
        seed: Url::parse(seed).unwrap(),
        strategy: ScopeStrategy::SameDomain,
        blacklist: Blacklist::default(),
        robots: Arc::new(RobotsCache::new(fetcher.clone())),
        follow_robots: false,
        fetcher,
        scanner: Arc::new(PassthroughScanner),
        scan_options: ScanOptions::default(),
        pdf_handoff: Arc::new(LoggingPdfHandoff),
        pdf_log: None,
        include_pdfs: false,
        safe_mode: false,
        download_dir: PathBuf::from("downloads"),
        abort: AbortController::new(None),
    }
}

/// Scripted page session
#[derive(Default)]
pub(crate) struct MockPage {
    pub html: String,
    /// Returned by `navigate`; defaults to a 200 HTML page at the request URL
    pub loaded: Option<LoadedPage>,
    pub navigate_error: Option<fn(&Url) -> SweepError>,
    pub targets: Vec<ClickTarget>,
    pub click_results: HashMap<usize, String>,
    pub failing_clicks: HashSet<usize>,
    /// URL set by the last navigation or return
    pub current: Option<Url>,
    /// Where clicks moved the page since then
    pub location: Option<Url>,
    /// Delay before `content` answers
    pub delay: Option<Duration>,
    pub clicks: usize,
    pub returns: usize,
    pub navigations: Vec<Request>,
}

impl MockPage {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PageSession for MockPage {
    async fn navigate(&mut self, request: &Request) -> Result<LoadedPage> {
        self.navigations.push(request.clone());
        if let Some(fail) = self.navigate_error {
            return Err(fail(&request.url));
        }
        let loaded = self.loaded.clone().unwrap_or_else(|| LoadedPage {
            final_url: request.url.clone(),
            status: Some(200),
            content_type: Some("text/html".into()),
            is_download: false,
        });
        self.current = Some(loaded.final_url.clone());
        self.location = None;
        Ok(loaded)
    }

    async fn content(&mut self) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.html.clone())
    }

    async fn title(&mut self) -> Result<Option<String>> {
        Ok(extract_title_from(&self.html))
    }

    async fn current_url(&mut self) -> Option<Url> {
        self.location.clone().or_else(|| self.current.clone())
    }

    async fn clickable_targets(&mut self, _selectors: &[&str]) -> Result<Vec<ClickTarget>> {
        Ok(self.targets.clone())
    }

    async fn click(&mut self, target: &ClickTarget, sink: &DiscoverySink) -> Result<()> {
        self.clicks += 1;
        if self.failing_clicks.contains(&target.index) {
            return Err(SweepError::Navigation {
                url: "mock".into(),
                message: "element detached".into(),
            });
        }
        if let Some(result) = self.click_results.get(&target.index) {
            let _ = sink.send(result.clone());
            let moved = self.current.as_ref().and_then(|c| c.join(result).ok());
            if moved.is_some() {
                self.location = moved;
            }
        }
        Ok(())
    }

    async fn return_to(&mut self, url: &Url) -> Result<()> {
        self.returns += 1;
        self.current = Some(url.clone());
        self.location = None;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Browser whose sessions all serve the same scripted page
#[derive(Default)]
pub(crate) struct MockBrowser {
    pub html: String,
    pub fail_launch: bool,
    pub delay: Option<Duration>,
    pub sessions: Arc<AtomicUsize>,
}

#[async_trait]
impl crate::browser::Browser for MockBrowser {
    async fn open_session(&self, _profile: &crate::browser::WorkerProfile) -> Result<Box<dyn PageSession>> {
        if self.fail_launch {
            return Err(SweepError::Launch("no browser available".into()));
        }
        self.sessions.fetch_add(1, Ordering::SeqCst);
        let mut page = MockPage::new(&self.html);
        page.delay = self.delay;
        Ok(Box::new(page))
    }
}
