//! Crawl strategies
//!
//! The three entry points share one [`Crawler`] and therefore one crawl
//! state, so the intelligent strategy's sitemap pass and its domain-crawl
//! continuation never visit the same page twice.

use super::coordinator::Crawler;
use super::links::{offer_link, LinkOutcome};
use crate::state::{status, Bucket, PageInfo, Request};
use crate::Result;

/// Crawls outward from the seed, following in-scope links
pub async fn crawl_domain(crawler: &Crawler) -> Result<()> {
    let ctx = crawler.context();
    ctx.state.enqueue_if_new(Request::new(ctx.seed.clone()));
    crawler.run_pool(true).await
}

/// Visits exactly the pages a sitemap lists, without following links
pub async fn crawl_sitemap(crawler: &Crawler) -> Result<()> {
    let ctx = crawler.context();
    let sources = sitemap_sources(crawler).await;
    if sources.is_empty() {
        tracing::warn!("No sitemap found for {}", ctx.seed);
    }

    let mut queued = 0;
    for source in &sources {
        let budget = ctx.state.max_requests().saturating_sub(queued);
        if budget == 0 {
            break;
        }
        for request in crawler.sitemaps().resolve(source, budget, None).await {
            if enqueue_listed(crawler, request) {
                queued += 1;
            }
        }
    }

    tracing::info!("Sitemap crawl queued {} pages", queued);
    crawler.run_pool(false).await
}

/// Sitemap pages ranked by closeness to the seed first, then a domain crawl
/// for whatever budget remains
pub async fn crawl_intelligent(crawler: &Crawler) -> Result<()> {
    let ctx = crawler.context();
    let mut queued = 0;

    for source in sitemap_sources(crawler).await {
        let budget = ctx.state.max_requests().saturating_sub(queued);
        if budget == 0 {
            break;
        }
        for request in crawler.sitemaps().resolve(&source, budget, Some(&ctx.seed)).await {
            if offer_link(ctx, &request.url) == LinkOutcome::Queued {
                queued += 1;
            }
        }
    }

    tracing::info!("Intelligent crawl seeded {} pages from sitemaps", queued);
    crawl_domain(crawler).await
}

async fn sitemap_sources(crawler: &Crawler) -> Vec<String> {
    match crawler.explicit_sitemap() {
        Some(source) => vec![source.to_string()],
        None => {
            let ctx = crawler.context();
            crawler.sitemaps().discover(&ctx.seed, &ctx.robots).await
        }
    }
}

/// Enqueues a sitemap entry; only the blacklist applies since the sitemap
/// itself defines what is wanted
fn enqueue_listed(crawler: &Crawler, request: Request) -> bool {
    let ctx = crawler.context();
    if ctx.blacklist.is_blacklisted(&request.url) {
        let info = PageInfo::new(request.url.as_str(), status::STATUS_EXCLUDED).with_metadata("Excluded by blacklist");
        ctx.state.record_discovered(&request.url, Bucket::UserExcluded, info);
        return false;
    }
    ctx.state.enqueue_if_new(request) == crate::state::Enqueue::Queued
}
