//! Crawler coordinator - run orchestration
//!
//! This module ties a run together:
//! - Opening the dataset and streaming classifications into it
//! - Building the shared [`CrawlContext`] every worker reads
//! - Running the worker pool until the frontier drains or the crawl aborts
//! - Finalizing the crawl state and recording how the run ended

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;
use url::Url;

use super::auth::strip_credentials;
use super::fetcher::{build_http_client, Fetcher};
use super::navigator::process_request;
use super::scheduler::{AbortController, AbortReason, ConcurrencyController};
use super::strategy::{crawl_domain, crawl_intelligent, crawl_sitemap};
use crate::browser::{Browser, HttpBrowser, PageSession, RedirectScope, WorkerProfile};
use crate::config::{Config, CrawlMode, EngineKind};
use crate::robots::RobotsCache;
use crate::scanner::{PdfDocument, PdfHandoff, ScanOptions, Scanner};
use crate::sitemap::SitemapResolver;
use crate::state::{Bucket, ClassifiedPage, CrawlResults, CrawlState};
use crate::storage::{RunRecord, RunStatus, SqliteStorage, Storage, StorageError};
use crate::url::{parse_http_url, Blacklist, ScopeStrategy};
use crate::{Result, SweepError};

/// How long an idle worker waits before looking at the queue again
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Everything a worker needs to process a request
pub struct CrawlContext {
    pub state: Arc<CrawlState>,
    /// Seed without credentials; the scope reference
    pub seed: Url,
    pub strategy: ScopeStrategy,
    pub blacklist: Blacklist,
    pub robots: Arc<RobotsCache>,
    pub follow_robots: bool,
    pub fetcher: Fetcher,
    pub scanner: Arc<dyn Scanner>,
    pub scan_options: ScanOptions,
    pub pdf_handoff: Arc<dyn PdfHandoff>,
    pub pdf_log: Option<UnboundedSender<PdfDocument>>,
    pub include_pdfs: bool,
    pub safe_mode: bool,
    pub download_dir: PathBuf,
    pub abort: AbortController,
}

/// The external collaborators of a run
pub struct Collaborators {
    pub scanner: Arc<dyn Scanner>,
    pub pdf_handoff: Arc<dyn PdfHandoff>,
    /// Page engine override; built from the config when absent
    pub browser: Option<Arc<dyn Browser>>,
}

/// Outcome of a finished run
#[derive(Debug)]
pub struct CrawlReport {
    pub run: RunRecord,
    pub results: CrawlResults,
    pub abort_reason: Option<AbortReason>,
    pub elapsed: Duration,
}

/// Owns the shared pieces of one crawl and runs its worker pool
pub struct Crawler {
    ctx: Arc<CrawlContext>,
    browser: Arc<dyn Browser>,
    controller: Arc<ConcurrencyController>,
    sitemaps: SitemapResolver,
    explicit_sitemap: Option<String>,
    profile_root: PathBuf,
    run_token: String,
}

impl Crawler {
    /// Assembles a crawler over an existing state
    pub fn new(
        config: &Config,
        state: Arc<CrawlState>,
        collaborators: Collaborators,
        run_token: &str,
        pdf_log: Option<UnboundedSender<PdfDocument>>,
    ) -> Result<Self> {
        let crawl = &config.crawl;
        let concurrency = &config.concurrency;
        let navigation_timeout = Duration::from_millis(concurrency.navigation_timeout_ms);

        let (seed, auth) = strip_credentials(&parse_http_url(&crawl.seed)?);
        if auth.is_some() {
            tracing::info!("Using basic auth from the seed URL for {}", seed.origin().ascii_serialization());
        }

        let side_client = build_http_client(&config.user_agent, navigation_timeout, true)?;
        let fetcher = Fetcher::new(side_client, auth, config.headers.clone());

        let browser = match collaborators.browser {
            Some(browser) => browser,
            None => build_browser(config, &seed)?,
        };

        let ctx = CrawlContext {
            state,
            strategy: crawl.strategy,
            blacklist: Blacklist::new(&crawl.blacklist)?,
            robots: Arc::new(RobotsCache::new(fetcher.clone())),
            follow_robots: crawl.follow_robots,
            fetcher: fetcher.clone(),
            scanner: collaborators.scanner,
            scan_options: ScanOptions::default(),
            pdf_handoff: collaborators.pdf_handoff,
            pdf_log,
            include_pdfs: crawl.include_pdfs,
            safe_mode: crawl.safe_mode,
            download_dir: PathBuf::from(&config.output.download_dir),
            abort: AbortController::new(crawl.scan_duration()),
            seed,
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            browser,
            controller: Arc::new(ConcurrencyController::new(
                concurrency.min_concurrency,
                concurrency.max_concurrency,
                navigation_timeout / 4,
            )),
            sitemaps: SitemapResolver::new(fetcher),
            explicit_sitemap: crawl.sitemap.clone(),
            profile_root: PathBuf::from(&config.browser.profile_dir),
            run_token: run_token.to_string(),
        })
    }

    pub fn context(&self) -> &CrawlContext {
        &self.ctx
    }

    pub fn sitemaps(&self) -> &SitemapResolver {
        &self.sitemaps
    }

    /// Sitemap named in the config, if any
    pub fn explicit_sitemap(&self) -> Option<&str> {
        self.explicit_sitemap.as_deref()
    }

    /// Processes queued requests until the frontier drains or the crawl aborts
    ///
    /// Returns the first fatal error any worker hit; per-page failures never
    /// surface here.
    pub async fn run_pool(&self, follow_links: bool) -> Result<()> {
        let workers = self.controller.max();
        tracing::info!(
            "Starting pool of up to {} workers ({} pending)",
            workers,
            self.ctx.state.pending_count()
        );

        let active = Arc::new(AtomicUsize::new(0));
        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                active: Arc::clone(&active),
                ctx: Arc::clone(&self.ctx),
                browser: Arc::clone(&self.browser),
                controller: Arc::clone(&self.controller),
                profile_root: self.profile_root.clone(),
                run_token: self.run_token.clone(),
                follow_links,
            };
            set.spawn(worker.run());
        }

        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                Err(SweepError::Launch(format!("worker task failed: {}", e)))
            });
            if let Err(e) = outcome {
                tracing::error!("Worker stopped: {}", e);
                self.ctx.abort.abort(AbortReason::Fatal);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn build_browser(config: &Config, seed: &Url) -> Result<Arc<dyn Browser>> {
    match config.browser.engine {
        EngineKind::Http => {
            let timeout = Duration::from_millis(config.concurrency.navigation_timeout_ms);
            let client = build_http_client(&config.user_agent, timeout, false)?;
            Ok(Arc::new(HttpBrowser::new(
                client,
                RedirectScope::new(seed.clone(), config.crawl.strategy),
            )))
        }
        #[cfg(feature = "chromium")]
        EngineKind::Chromium => Ok(Arc::new(crate::browser::ChromiumBrowser::new(
            config.browser.headless,
            &config.concurrency,
        ))),
        #[cfg(not(feature = "chromium"))]
        EngineKind::Chromium => Err(SweepError::Launch(
            "this build has no chromium engine; rebuild with --features chromium".to_string(),
        )),
    }
}

/// Marks a worker as busy until dropped
struct Busy<'a>(&'a AtomicUsize);

impl<'a> Busy<'a> {
    fn enter(active: &'a AtomicUsize) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One member of the pool, owning at most one page session
struct Worker {
    id: usize,
    /// Workers between taking a request and finishing it, discovery included
    active: Arc<AtomicUsize>,
    ctx: Arc<CrawlContext>,
    browser: Arc<dyn Browser>,
    controller: Arc<ConcurrencyController>,
    profile_root: PathBuf,
    run_token: String,
    follow_links: bool,
}

impl Worker {
    async fn run(self) -> Result<()> {
        let mut session: Option<Box<dyn PageSession>> = None;
        let result = self.work(&mut session).await;

        if let Some(mut page) = session {
            if let Err(e) = page.close().await {
                tracing::debug!("Worker {} failed to close its page: {}", self.id, e);
            }
        }
        tracing::debug!("Worker {} finished", self.id);
        result
    }

    async fn work(&self, session: &mut Option<Box<dyn PageSession>>) -> Result<()> {
        let state = &self.ctx.state;

        loop {
            if self.ctx.abort.check(state).is_some() {
                return Ok(());
            }

            if !self.controller.allows(self.id) {
                if self.drained() {
                    return Ok(());
                }
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }

            let busy = Busy::enter(&self.active);
            let Some(request) = state.next_request() else {
                drop(busy);
                if self.drained() {
                    return Ok(());
                }
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            };

            if session.is_none() {
                match self.open_session().await {
                    Ok(page) => *session = Some(page),
                    Err(e) => {
                        state.requeue(request);
                        return Err(e);
                    }
                }
            }
            let Some(page) = session.as_mut() else {
                state.requeue(request);
                continue;
            };

            let started = Instant::now();
            match process_request(&self.ctx, &mut **page, request.clone(), self.follow_links).await {
                Ok(bucket) => self
                    .controller
                    .record(started.elapsed(), bucket != Some(Bucket::Error)),
                Err(e) => {
                    state.requeue(request);
                    return Err(e);
                }
            }
            drop(busy);
        }
    }

    /// No queued work and no worker that could still discover some
    fn drained(&self) -> bool {
        self.active.load(Ordering::SeqCst) == 0 && self.ctx.state.pending_count() == 0
    }

    async fn open_session(&self) -> Result<Box<dyn PageSession>> {
        let profile = WorkerProfile::prepare(&self.profile_root, &self.run_token, self.id).await?;
        self.browser.open_session(&profile).await
    }
}

/// Dataset writes produced during a crawl
enum DatasetEvent {
    Page(ClassifiedPage),
    Pdf(PdfDocument),
}

/// Writes dataset events on a blocking thread until every sender is gone
fn spawn_writer(
    mut storage: SqliteStorage,
    token: String,
    mut events: mpsc::UnboundedReceiver<DatasetEvent>,
) -> tokio::task::JoinHandle<(SqliteStorage, Option<StorageError>)> {
    tokio::task::spawn_blocking(move || {
        let mut first_error = None;
        while let Some(event) = events.blocking_recv() {
            let written = match &event {
                DatasetEvent::Page(page) => storage.record_page(&token, page.bucket, &page.info).map(|_| ()),
                DatasetEvent::Pdf(document) => storage.record_pdf_handoff(&token, document),
            };
            if let Err(e) = written {
                tracing::error!("Failed to persist record: {}", e);
                first_error.get_or_insert(e);
            }
        }
        (storage, first_error)
    })
}

/// Runs a complete crawl as configured
///
/// This is the main entry point for a crawl. It will:
/// 1. Open the dataset and create a run
/// 2. Build the crawler and its collaborators
/// 3. Run the configured strategy
/// 4. Finalize the crawl state and close the run
///
/// Only fatal errors (launch, profile directory, dataset) are returned; the
/// dataset still holds everything classified before the failure.
pub async fn run_crawl(config: Config, config_hash: &str, collaborators: Collaborators) -> Result<CrawlReport> {
    let started = Instant::now();
    let mut storage = SqliteStorage::new(std::path::Path::new(&config.output.database_path))?;

    let (seed, _) = strip_credentials(&parse_http_url(&config.crawl.seed)?);
    let run = storage.create_run(seed.as_str(), config_hash)?;
    tracing::info!("Starting run {} for {} ({:?} mode)", run.token, seed, config.crawl.mode);

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let writer = spawn_writer(storage, run.token.clone(), event_rx);

    let (page_tx, mut page_rx) = mpsc::unbounded_channel::<ClassifiedPage>();
    let page_events = event_tx.clone();
    let page_forwarder = tokio::spawn(async move {
        while let Some(page) = page_rx.recv().await {
            if page_events.send(DatasetEvent::Page(page)).is_err() {
                break;
            }
        }
    });

    let (pdf_tx, mut pdf_rx) = mpsc::unbounded_channel::<PdfDocument>();
    let pdf_forwarder = tokio::spawn(async move {
        while let Some(document) = pdf_rx.recv().await {
            if event_tx.send(DatasetEvent::Pdf(document)).is_err() {
                break;
            }
        }
    });

    let state = Arc::new(CrawlState::new(config.crawl.max_requests_per_crawl).with_recorder(page_tx));

    let (outcome, abort_reason) =
        match Crawler::new(&config, Arc::clone(&state), collaborators, &run.token, Some(pdf_tx)) {
            Ok(crawler) => {
                let outcome = match config.crawl.mode {
                    CrawlMode::Website => crawl_domain(&crawler).await,
                    CrawlMode::Sitemap => crawl_sitemap(&crawler).await,
                    CrawlMode::Intelligent => crawl_intelligent(&crawler).await,
                };
                (outcome, crawler.context().abort.reason())
            }
            Err(e) => (Err(e), None),
        };

    let results = state.finalize();
    drop(state);

    // Every sender is gone once the crawler and state are dropped
    let _ = page_forwarder.await;
    let _ = pdf_forwarder.await;
    let (mut storage, write_error) = writer
        .await
        .map_err(|e| SweepError::Launch(format!("dataset writer failed: {}", e)))?;

    let status = match (&outcome, write_error.is_some(), abort_reason) {
        (Err(_), _, _) | (_, true, _) => RunStatus::Failed,
        (Ok(()), false, Some(AbortReason::PageCap | AbortReason::TimeBudget)) => RunStatus::Aborted,
        _ => RunStatus::Completed,
    };
    storage.finish_run(&run.token, status)?;
    let run = storage.get_run(&run.token)?;

    tracing::info!(
        "Run {} {}: {} scanned, {} classified, {} discovered in {:?}",
        run.token,
        status.to_db_string(),
        results.count(Bucket::Scanned),
        results.total_classified(),
        results.discovered,
        started.elapsed()
    );

    outcome?;
    if let Some(e) = write_error {
        return Err(e.into());
    }

    Ok(CrawlReport {
        run,
        results,
        abort_reason,
        elapsed: started.elapsed(),
    })
}
