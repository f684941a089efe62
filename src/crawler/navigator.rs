//! Per-page lifecycle: load, classify, scan
//!
//! [`process_request`] takes one dequeued request to a terminal bucket. The
//! checks run in a fixed order once the page has loaded:
//!
//! 1. Already scanned under another URL: dropped
//! 2. Disallowed by robots.txt: links discovered, page not scanned
//! 3. Not an HTML document: PDF handoff or unsupported
//! 4. Final URL blacklisted
//! 5. Redirected out of scope
//! 6. Status >= 300
//! 7. Scanned
//!
//! Per-page failures become bucket entries here. Only fatal errors are
//! returned to the worker.

use url::Url;

use super::coordinator::CrawlContext;
use super::links::discover_links;
use crate::browser::{LoadedPage, PageSession};
use crate::scanner::PdfDocument;
use crate::state::{status, Bucket, PageInfo, Request, ScanCommit};
use crate::url::{dedup_key, in_scope};
use crate::{Result, SweepError};

/// Processes one request to completion
///
/// Returns the bucket the request landed in, or `None` when it was dropped
/// because another worker already settled the same page.
pub async fn process_request(
    ctx: &CrawlContext,
    page: &mut dyn PageSession,
    request: Request,
    follow_links: bool,
) -> Result<Option<Bucket>> {
    let state = &ctx.state;

    if state.is_scanned(&request.url) {
        tracing::debug!("Skipping {}, already scanned", request.url);
        state.discard(&request);
        return Ok(None);
    }

    if request.skip_navigation {
        let target = request.url.clone();
        return handle_pdf(ctx, &request, &target).await;
    }

    let mut navigation = request.clone();
    navigation.headers = ctx.fetcher.headers_for(&request.url);
    navigation.headers.extend(request.headers.clone());

    let loaded = match page.navigate(&navigation).await {
        Ok(loaded) => loaded,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => return Ok(record_error(ctx, &request, &e)),
    };
    let final_url = loaded.final_url.clone();
    let redirected = final_url.as_str() != request.label;
    let final_in_scope = in_scope(&final_url, &ctx.seed, ctx.strategy);

    if ctx.follow_robots && ctx.robots.check(&request.url).await {
        if follow_links && final_in_scope && loaded.is_html() {
            discover_links(ctx, page, &final_url).await;
        }
        let info = PageInfo::new(request.url.as_str(), status::STATUS_EXCLUDED)
            .with_metadata("Disallowed by robots.txt");
        return Ok(settle(ctx, &request.url, Bucket::Forbidden, info));
    }

    if !loaded.is_html() {
        if loaded.is_pdf() && final_in_scope {
            return handle_pdf(ctx, &request, &final_url).await;
        }
        let info = with_final(
            PageInfo::new(request.url.as_str(), status::STATUS_UNSUPPORTED),
            redirected,
            &loaded,
        );
        return Ok(settle(ctx, &request.url, Bucket::Invalid, info));
    }

    if ctx.blacklist.is_blacklisted(&final_url) && dedup_key(&request.url) != dedup_key(&ctx.seed) {
        let info = with_final(
            PageInfo::new(request.url.as_str(), status::STATUS_EXCLUDED).with_metadata("Excluded by blacklist"),
            redirected,
            &loaded,
        );
        return Ok(settle(ctx, &request.url, Bucket::Blacklisted, info));
    }

    if redirected && !final_in_scope {
        let info = PageInfo::new(request.url.as_str(), status::STATUS_EXCLUDED)
            .with_actual_url(final_url.as_str())
            .with_metadata("Redirected outside the crawl scope");
        return Ok(settle(ctx, &request.url, Bucket::NotScannedRedirect, info));
    }

    let code = loaded.status.unwrap_or(200);
    if code >= 300 {
        let info = with_final(PageInfo::new(request.url.as_str(), code), redirected, &loaded);
        return Ok(settle(ctx, &request.url, Bucket::Invalid, info));
    }

    if redirected && state.is_scanned(&final_url) {
        let info = PageInfo::new(request.url.as_str(), status::STATUS_EXCLUDED)
            .with_actual_url(final_url.as_str())
            .with_metadata("Redirect target already scanned");
        return Ok(settle(ctx, &request.url, Bucket::NotScannedRedirect, info));
    }

    match ctx.scanner.scan(page, &ctx.scan_options).await {
        Ok(result) => {
            let info = with_final(PageInfo::new(request.url.as_str(), code), redirected, &loaded).with_scan(result);
            let bucket = commit(ctx, &request, &final_url, info);
            if bucket == Some(Bucket::Scanned) {
                tracing::info!("Scanned {} ({} total)", request.url, state.scanned_count());
                if follow_links {
                    discover_links(ctx, page, &final_url).await;
                }
            }
            Ok(bucket)
        }
        Err(e) => {
            let error = SweepError::Scan {
                url: request.url.to_string(),
                source: e,
            };
            Ok(record_error(ctx, &request, &error))
        }
    }
}

/// Downloads a PDF and hands it to the PDF pipeline
async fn handle_pdf(ctx: &CrawlContext, request: &Request, pdf_url: &Url) -> Result<Option<Bucket>> {
    if !ctx.include_pdfs {
        let info = PageInfo::new(request.url.as_str(), status::STATUS_UNSUPPORTED)
            .with_metadata("PDF scanning not requested");
        return Ok(settle(ctx, &request.url, Bucket::Invalid, info));
    }

    let path = match ctx.fetcher.download(pdf_url, &ctx.download_dir).await {
        Ok(path) => path,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => return Ok(record_error(ctx, request, &e)),
    };

    let document = PdfDocument::new(pdf_url, &path);
    ctx.pdf_handoff.hand_off(document.clone()).await;
    if let Some(log) = &ctx.pdf_log {
        let _ = log.send(document);
    }

    let mut info = PageInfo::new(request.url.as_str(), 200).with_metadata("PDF handed off");
    if pdf_url != &request.url {
        info = info.with_actual_url(pdf_url.as_str());
    }
    Ok(commit(ctx, request, pdf_url, info))
}

fn commit(ctx: &CrawlContext, request: &Request, final_url: &Url, info: PageInfo) -> Option<Bucket> {
    match ctx.state.commit_scan(request, final_url, info) {
        ScanCommit::Scanned => Some(Bucket::Scanned),
        ScanCommit::DuplicateTarget => Some(Bucket::NotScannedRedirect),
        ScanCommit::Lost => None,
    }
}

fn settle(ctx: &CrawlContext, url: &Url, bucket: Bucket, info: PageInfo) -> Option<Bucket> {
    ctx.state.classify(url, bucket, info).then_some(bucket)
}

fn record_error(ctx: &CrawlContext, request: &Request, error: &SweepError) -> Option<Bucket> {
    tracing::warn!("Failed to process {}: {}", request.url, error);
    let code = error.status_code().unwrap_or(status::STATUS_CRAWLER_ERROR);
    let info = PageInfo::new(request.url.as_str(), code);
    let info = PageInfo {
        metadata: format!("{}: {}", info.metadata, error),
        ..info
    };
    settle(ctx, &request.url, Bucket::Error, info)
}

fn with_final(info: PageInfo, redirected: bool, loaded: &LoadedPage) -> PageInfo {
    if redirected {
        info.with_actual_url(loaded.final_url.as_str())
    } else {
        info
    }
}
