//! Link discovery: static anchors plus a click-based fallback
//!
//! Every candidate goes through [`offer_link`], which applies the scope
//! policy and the blacklist before touching the frontier.

use tokio::sync::mpsc;
use url::Url;

use super::coordinator::CrawlContext;
use super::parser::{parse_html, resolve_link};
use crate::browser::PageSession;
use crate::state::{status, Bucket, Enqueue, PageInfo, Request};
use crate::url::{dedup_key, in_scope, is_pdf_url, strip_tracking_params};

/// Elements that may navigate without being a plain link
pub const CLICKABLE_SELECTORS: &[&str] = &[
    "[role='button']",
    "[role='link']",
    "[onclick]",
    "[data-href]",
    "[data-path]",
    "[data-url]",
];

/// Upper bound on clickable elements tried per page
const MAX_CLICKS: usize = 25;

/// What happened to a discovered URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Queued,
    /// Already known to the frontier
    Known,
    OutOfScope,
    Excluded,
    OverCap,
}

/// Sends one discovered URL through scope, blacklist and dedup
pub fn offer_link(ctx: &CrawlContext, url: &Url) -> LinkOutcome {
    let url = strip_tracking_params(url);
    let state = &ctx.state;

    if !in_scope(&url, &ctx.seed, ctx.strategy) {
        let info = PageInfo::new(url.as_str(), status::STATUS_EXCLUDED).with_metadata("Outside the crawl scope");
        return if state.record_discovered(&url, Bucket::OutOfDomain, info) {
            LinkOutcome::OutOfScope
        } else {
            LinkOutcome::Known
        };
    }

    if ctx.blacklist.is_blacklisted(&url) && dedup_key(&url) != dedup_key(&ctx.seed) {
        let info = PageInfo::new(url.as_str(), status::STATUS_EXCLUDED).with_metadata("Excluded by blacklist");
        return if state.record_discovered(&url, Bucket::UserExcluded, info) {
            LinkOutcome::Excluded
        } else {
            LinkOutcome::Known
        };
    }

    let pdf = is_pdf_url(&url);
    match state.enqueue_if_new(Request::new(url).skip_navigation(pdf)) {
        Enqueue::Queued => LinkOutcome::Queued,
        Enqueue::OverCap => LinkOutcome::OverCap,
        Enqueue::Duplicate | Enqueue::Closed => LinkOutcome::Known,
    }
}

/// Discovers links on the loaded page and offers them to the frontier
///
/// Returns how many new requests were queued. Failures are logged and end
/// discovery for this page without affecting its classification.
pub async fn discover_links(ctx: &CrawlContext, page: &mut dyn PageSession, page_url: &Url) -> usize {
    let html = match page.content().await {
        Ok(html) => html,
        Err(e) => {
            tracing::debug!("No content to extract links from {}: {}", page_url, e);
            return 0;
        }
    };

    let mut queued = 0;
    for link in parse_html(&html, page_url).links {
        if offer_link(ctx, &link) == LinkOutcome::Queued {
            queued += 1;
        }
    }

    if !ctx.safe_mode {
        queued += click_discovery(ctx, page, page_url).await;
    }

    tracing::debug!("Queued {} new links from {}", queued, page_url);
    queued
}

async fn click_discovery(ctx: &CrawlContext, page: &mut dyn PageSession, page_url: &Url) -> usize {
    let targets = match page.clickable_targets(CLICKABLE_SELECTORS).await {
        Ok(targets) => targets,
        Err(e) => {
            tracing::debug!("Could not list clickable elements on {}: {}", page_url, e);
            return 0;
        }
    };

    let (sink, mut found) = mpsc::unbounded_channel::<String>();

    for target in targets.iter().take(MAX_CLICKS) {
        if let Some(href) = &target.static_target {
            let _ = sink.send(href.clone());
            continue;
        }
        if !page.can_click() {
            continue;
        }

        if let Err(e) = page.click(target, &sink).await {
            tracing::debug!("Click on element {} of {} failed: {}", target.index, page_url, e);
        }
        if page.current_url().await.as_ref() != Some(page_url) {
            if let Err(e) = page.return_to(page_url).await {
                tracing::debug!("Could not return to {}: {}", page_url, e);
                break;
            }
        }
    }
    drop(sink);

    let own_key = dedup_key(page_url);
    let mut queued = 0;
    while let Ok(raw) = found.try_recv() {
        let Some(url) = resolve_link(&raw, page_url) else {
            continue;
        };
        if dedup_key(&url) != own_key && offer_link(ctx, &url) == LinkOutcome::Queued {
            queued += 1;
        }
    }
    queued
}
