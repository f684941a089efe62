//! Headless Chromium engine
//!
//! Each worker launches its own browser on its private profile directory.
//! Dynamic link discovery uses real clicks: popups (`Page.windowOpen`) and
//! main-frame navigations (`Page.frameNavigated`) are forwarded to the
//! discovery channel while a click settles.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::{EventFrameNavigated, EventWindowOpen};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use url::Url;

use super::{Browser, ClickTarget, DiscoverySink, LoadedPage, PageSession, WorkerProfile};
use crate::config::ConcurrencyConfig;
use crate::crawler::clickable_elements;
use crate::state::Request;
use crate::{Result, SweepError};

/// Time given to a click to open a popup or navigate
const CLICK_SETTLE: Duration = Duration::from_millis(750);

/// Interval between DOM size samples
const STABILITY_POLL: Duration = Duration::from_millis(100);

const NAVIGATION_INFO_JS: &str = r#"(() => {
    const nav = performance.getEntriesByType('navigation')[0];
    return {
        status: nav && nav.responseStatus ? nav.responseStatus : null,
        contentType: document.contentType || null,
    };
})()"#;

const DOM_SIZE_JS: &str = "document.body ? document.body.innerHTML.length : 0";

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavigationInfo {
    status: Option<u16>,
    content_type: Option<String>,
}

/// Page engine driving a real Chromium per worker
#[derive(Debug, Clone)]
pub struct ChromiumBrowser {
    headless: bool,
    navigation_timeout: Duration,
    quiet_period: Duration,
    stability_ceiling: Duration,
}

impl ChromiumBrowser {
    pub fn new(headless: bool, concurrency: &ConcurrencyConfig) -> Self {
        Self {
            headless,
            navigation_timeout: Duration::from_millis(concurrency.navigation_timeout_ms),
            quiet_period: Duration::from_millis(concurrency.dom_quiet_period_ms),
            stability_ceiling: Duration::from_millis(concurrency.dom_stability_ceiling_ms),
        }
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open_session(&self, profile: &WorkerProfile) -> Result<Box<dyn PageSession>> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&profile.dir)
            .request_timeout(self.navigation_timeout)
            .arg("--disable-dev-shm-usage");
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(SweepError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| SweepError::Launch(e.to_string()))?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SweepError::Launch(e.to_string()))?;

        tracing::debug!("Worker {} launched Chromium on {}", profile.worker_id, profile.dir.display());
        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            engine: self.clone(),
            current: None,
            selectors: Vec::new(),
        }))
    }
}

/// One worker's browser and its single page
pub struct ChromiumSession {
    browser: CdpBrowser,
    page: Page,
    handler_task: JoinHandle<()>,
    engine: ChromiumBrowser,
    current: Option<Url>,
    /// Selectors the last target list was built from; click indexes refer to it
    selectors: Vec<String>,
}

fn navigation_error(url: &str, error: impl std::fmt::Display) -> SweepError {
    SweepError::Navigation {
        url: url.to_string(),
        message: error.to_string(),
    }
}

impl ChromiumSession {
    async fn page_url(&self) -> Option<Url> {
        self.page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
    }

    /// Waits until the body stops changing for the quiet period, or the ceiling
    async fn wait_for_stable_dom(&self) {
        let started = Instant::now();
        let mut last_size: Option<u64> = None;
        let mut quiet_since = Instant::now();

        while started.elapsed() < self.engine.stability_ceiling {
            let size = match self.page.evaluate(DOM_SIZE_JS).await {
                Ok(result) => result.into_value::<u64>().ok(),
                Err(_) => None,
            };
            if size != last_size {
                last_size = size;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= self.engine.quiet_period {
                return;
            }
            tokio::time::sleep(STABILITY_POLL).await;
        }
        tracing::trace!("DOM still changing after {:?}", self.engine.stability_ceiling);
    }

    async fn navigation_info(&self) -> NavigationInfo {
        match self.page.evaluate(NAVIGATION_INFO_JS).await {
            Ok(result) => result.into_value().unwrap_or(NavigationInfo {
                status: None,
                content_type: None,
            }),
            Err(_) => NavigationInfo {
                status: None,
                content_type: None,
            },
        }
    }

    async fn close_popups(&self) {
        let Ok(pages) = self.browser.pages().await else {
            return;
        };
        for page in pages {
            if page.target_id() != self.page.target_id() {
                let _ = page.close().await;
            }
        }
    }
}

fn click_script(selectors: &[String], index: usize) -> String {
    let selectors = serde_json::to_string(selectors).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
    const seen = new Set();
    const found = [];
    for (const sel of {selectors}) {{
        let nodes;
        try {{ nodes = document.querySelectorAll(sel); }} catch (e) {{ continue; }}
        for (const el of nodes) {{
            if ((el.tagName === 'A' && el.hasAttribute('href')) || seen.has(el)) continue;
            seen.add(el);
            found.push(el);
        }}
    }}
    const el = found[{index}];
    if (!el) return false;
    el.click();
    return true;
}})()"#
    )
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, request: &Request) -> Result<LoadedPage> {
        let url = request.url.as_str();

        let headers = serde_json::to_value(&request.headers).map_err(|e| navigation_error(url, e))?;
        self.page
            .execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
            .await
            .map_err(|e| navigation_error(url, e))?;

        match tokio::time::timeout(self.engine.navigation_timeout, self.page.goto(url)).await {
            Err(_) => {
                return Err(SweepError::Timeout {
                    url: url.to_string(),
                })
            }
            Ok(Err(e)) => return Err(navigation_error(url, e)),
            Ok(Ok(_)) => {}
        }

        self.wait_for_stable_dom().await;

        let final_url = self
            .page_url()
            .await
            .ok_or_else(|| navigation_error(url, "page has no URL"))?;
        self.current = Some(final_url.clone());
        let info = self.navigation_info().await;
        let content_type = info
            .content_type
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase());

        Ok(LoadedPage {
            is_download: final_url.as_str() == "about:blank",
            final_url,
            status: info.status,
            content_type,
        })
    }

    async fn content(&mut self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| navigation_error("current page", e))
    }

    async fn title(&mut self) -> Result<Option<String>> {
        self.page
            .get_title()
            .await
            .map_err(|e| navigation_error("current page", e))
    }

    async fn current_url(&mut self) -> Option<Url> {
        if let Some(live) = self.page_url().await {
            self.current = Some(live);
        }
        self.current.clone()
    }

    async fn clickable_targets(&mut self, selectors: &[&str]) -> Result<Vec<ClickTarget>> {
        let html = self.content().await?;
        self.selectors = selectors.iter().map(|s| s.to_string()).collect();
        Ok(clickable_elements(&html, selectors)
            .into_iter()
            .enumerate()
            .map(|(index, static_target)| ClickTarget {
                index,
                static_target,
            })
            .collect())
    }

    async fn click(&mut self, target: &ClickTarget, sink: &DiscoverySink) -> Result<()> {
        let mut popups = self
            .page
            .event_listener::<EventWindowOpen>()
            .await
            .map_err(|e| navigation_error("current page", e))?;
        let mut navigations = self
            .page
            .event_listener::<EventFrameNavigated>()
            .await
            .map_err(|e| navigation_error("current page", e))?;

        let popup_sink = sink.clone();
        let popup_task = tokio::spawn(async move {
            while let Some(event) = popups.next().await {
                let _ = popup_sink.send(event.url.clone());
            }
        });
        let nav_sink = sink.clone();
        let nav_task = tokio::spawn(async move {
            while let Some(event) = navigations.next().await {
                if event.frame.parent_id.is_none() {
                    let _ = nav_sink.send(event.frame.url.clone());
                }
            }
        });

        let script = click_script(&self.selectors, target.index);
        let clicked = self.page.evaluate(script).await;
        tokio::time::sleep(CLICK_SETTLE).await;

        popup_task.abort();
        nav_task.abort();
        self.close_popups().await;
        if let Some(live) = self.page_url().await {
            self.current = Some(live);
        }

        clicked
            .map(|_| ())
            .map_err(|e| navigation_error("current page", e))
    }

    async fn return_to(&mut self, url: &Url) -> Result<()> {
        if self.page_url().await.as_ref() == Some(url) {
            return Ok(());
        }
        self.page
            .goto(url.as_str())
            .await
            .map_err(|e| navigation_error(url.as_str(), e))?;
        self.wait_for_stable_dom().await;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close error: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}
