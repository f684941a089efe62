//! HTTP page engine
//!
//! Loads pages with reqwest and exposes the static DOM. Redirects are followed
//! by hand so every hop can be scope-checked: the engine never fetches a hop
//! that leaves the crawl's scope and reports that hop as the final URL instead.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::collections::HashSet;
use url::Url;

use super::{Browser, ClickTarget, DiscoverySink, LoadedPage, PageSession, WorkerProfile};
use crate::crawler::{clickable_elements, classify_error, content_type_of, extract_title_from};
use crate::state::Request;
use crate::url::{in_scope, ScopeStrategy};
use crate::{Result, SweepError};

/// Maximum redirect hops followed for one navigation
const MAX_REDIRECTS: usize = 10;

/// Decides which redirect hops the engine may follow
#[derive(Debug, Clone)]
pub struct RedirectScope {
    seed: Url,
    strategy: ScopeStrategy,
}

impl RedirectScope {
    pub fn new(seed: Url, strategy: ScopeStrategy) -> Self {
        Self { seed, strategy }
    }

    pub fn allows(&self, url: &Url) -> bool {
        in_scope(url, &self.seed, self.strategy)
    }
}

/// Page engine backed by a plain HTTP client
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    client: Client,
    scope: RedirectScope,
}

impl HttpBrowser {
    /// `client` must not follow redirects on its own
    pub fn new(client: Client, scope: RedirectScope) -> Self {
        Self { client, scope }
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn open_session(&self, profile: &WorkerProfile) -> Result<Box<dyn PageSession>> {
        tracing::debug!("Worker {} uses the HTTP engine", profile.worker_id);
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            scope: self.scope.clone(),
            current: None,
            html: None,
        }))
    }
}

/// One worker's view of the HTTP engine
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    scope: RedirectScope,
    current: Option<Url>,
    html: Option<String>,
}

impl HttpSession {
    fn html(&self) -> Result<&str> {
        self.html.as_deref().ok_or_else(|| SweepError::Navigation {
            url: self
                .current
                .as_ref()
                .map(Url::to_string)
                .unwrap_or_else(|| "about:blank".to_string()),
            message: "no document loaded".to_string(),
        })
    }

    fn build(&self, url: &Url, request: &Request) -> reqwest::RequestBuilder {
        let same_origin = url.origin() == request.url.origin();
        request
            .headers
            .iter()
            // Credentials never leave the origin they were given for
            .filter(|(name, _)| same_origin || !name.eq_ignore_ascii_case(header::AUTHORIZATION.as_str()))
            .fold(self.client.get(url.clone()), |builder, (name, value)| {
                builder.header(name.as_str(), value.as_str())
            })
    }
}

fn is_attachment(headers: &header::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_ascii_lowercase().starts_with("attachment"))
        .unwrap_or(false)
}

fn redirect_target(current: &Url, status: StatusCode, headers: &header::HeaderMap) -> Option<Url> {
    if !status.is_redirection() {
        return None;
    }
    headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|location| current.join(location.trim()).ok())
}

#[async_trait]
impl PageSession for HttpSession {
    async fn navigate(&mut self, request: &Request) -> Result<LoadedPage> {
        self.html = None;
        let mut url = request.url.clone();
        let mut seen = HashSet::from([url.to_string()]);

        for _ in 0..=MAX_REDIRECTS {
            let response = self
                .build(&url, request)
                .send()
                .await
                .map_err(|e| classify_error(&url, e))?;

            let status = response.status();

            if let Some(next) = redirect_target(&url, status, response.headers()) {
                if !seen.insert(next.to_string()) {
                    return Err(SweepError::RedirectLoop {
                        url: request.url.to_string(),
                    });
                }
                if !self.scope.allows(&next) {
                    tracing::debug!("Not following out-of-scope redirect {} -> {}", url, next);
                    self.current = Some(next.clone());
                    return Ok(LoadedPage {
                        final_url: next,
                        status: Some(status.as_u16()),
                        content_type: None,
                        is_download: false,
                    });
                }
                tracing::trace!("Redirect {} -> {}", url, next);
                url = next;
                continue;
            }

            let is_download = is_attachment(response.headers());
            let loaded = LoadedPage {
                final_url: url.clone(),
                status: Some(status.as_u16()),
                content_type: content_type_of(response.headers()),
                is_download,
            };

            if loaded.is_html() {
                let body = response.text().await.map_err(|e| classify_error(&url, e))?;
                self.html = Some(body);
            }
            self.current = Some(url);
            return Ok(loaded);
        }

        Err(SweepError::RedirectLimit {
            url: request.url.to_string(),
        })
    }

    async fn content(&mut self) -> Result<String> {
        self.html().map(str::to_string)
    }

    async fn title(&mut self) -> Result<Option<String>> {
        Ok(extract_title_from(self.html()?))
    }

    async fn current_url(&mut self) -> Option<Url> {
        self.current.clone()
    }

    async fn clickable_targets(&mut self, selectors: &[&str]) -> Result<Vec<ClickTarget>> {
        Ok(clickable_elements(self.html()?, selectors)
            .into_iter()
            .enumerate()
            .map(|(index, static_target)| ClickTarget {
                index,
                static_target,
            })
            .collect())
    }

    fn can_click(&self) -> bool {
        false
    }

    async fn click(&mut self, target: &ClickTarget, _sink: &DiscoverySink) -> Result<()> {
        Err(SweepError::Navigation {
            url: self
                .current
                .as_ref()
                .map(Url::to_string)
                .unwrap_or_default(),
            message: format!("HTTP engine cannot click element {}", target.index),
        })
    }

    async fn return_to(&mut self, _url: &Url) -> Result<()> {
        // Nothing a click could have changed
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.current = None;
        self.html = None;
        Ok(())
    }
}
