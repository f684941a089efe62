//! The frontier: dedup index, pending queue and outcome buckets
//!
//! A single [`CrawlState`] is created per run and passed by `Arc` to every
//! component that discovers or classifies URLs. All decisions about one URL
//! are taken under one lock, so two workers can never classify the same key.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use super::{status, Bucket, PageInfo, RedirectPair, Request};
use crate::url::dedup_key;

/// Where a dedup key currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending,
    InFlight,
    Classified(Bucket),
    /// Final URL of a scanned redirect; the same page as its origin
    Alias,
}

/// Result of [`CrawlState::enqueue_if_new`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Queued,
    Duplicate,
    /// Page cap reached; recorded as exceeded instead
    OverCap,
    /// The state has been finalized
    Closed,
}

/// Result of [`CrawlState::commit_scan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommit {
    Scanned,
    /// Redirect target was already scanned; recorded as not-scanned redirect
    DuplicateTarget,
    /// Another worker already classified this URL
    Lost,
}

/// A classification event streamed to the dataset writer
#[derive(Debug, Clone)]
pub struct ClassifiedPage {
    pub bucket: Bucket,
    pub info: PageInfo,
}

/// Immutable view of a finished crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlResults {
    pub buckets: BTreeMap<Bucket, Vec<PageInfo>>,
    pub scanned_redirects: Vec<RedirectPair>,
    pub discovered: usize,
}

impl CrawlResults {
    pub fn bucket(&self, bucket: Bucket) -> &[PageInfo] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.bucket(bucket).len()
    }

    pub fn total_classified(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Returns the bucket holding `url`, if any
    pub fn bucket_of(&self, url: &str) -> Option<Bucket> {
        self.buckets
            .iter()
            .find(|(_, pages)| pages.iter().any(|p| p.url == url))
            .map(|(bucket, _)| *bucket)
    }
}

#[derive(Debug, Default)]
struct Frontier {
    slots: HashMap<String, Slot>,
    queue: VecDeque<Request>,
    buckets: BTreeMap<Bucket, Vec<PageInfo>>,
    scanned_redirects: Vec<RedirectPair>,
    finalized: bool,
}

impl Frontier {
    fn scanned_len(&self) -> usize {
        self.buckets.get(&Bucket::Scanned).map_or(0, Vec::len)
    }

    fn is_open(&self, key: &str) -> bool {
        matches!(self.slots.get(key), None | Some(Slot::Pending) | Some(Slot::InFlight))
    }
}

/// Shared crawl state for one run
#[derive(Debug)]
pub struct CrawlState {
    inner: Mutex<Frontier>,
    max_requests: usize,
    recorder: Option<UnboundedSender<ClassifiedPage>>,
}

impl CrawlState {
    pub fn new(max_requests: usize) -> Self {
        Self {
            inner: Mutex::new(Frontier::default()),
            max_requests,
            recorder: None,
        }
    }

    /// Streams every classification to `recorder` as it happens
    pub fn with_recorder(mut self, recorder: UnboundedSender<ClassifiedPage>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Frontier> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Adds a request unless its dedup key has been seen before
    pub fn enqueue_if_new(&self, request: Request) -> Enqueue {
        let key = dedup_key(&request.url);
        let mut frontier = self.lock();

        if frontier.finalized {
            return Enqueue::Closed;
        }
        if frontier.slots.contains_key(&key) {
            return Enqueue::Duplicate;
        }

        if frontier.scanned_len() >= self.max_requests {
            let info = PageInfo::new(request.url.as_str(), status::STATUS_EXCLUDED)
                .with_metadata("Page cap reached before this URL was visited");
            self.place(&mut frontier, key, Bucket::ExceededRequests, info);
            return Enqueue::OverCap;
        }

        tracing::trace!("Queued {}", request.url);
        frontier.slots.insert(key, Slot::Pending);
        frontier.queue.push_back(request);
        Enqueue::Queued
    }

    /// Records a URL that is classified at discovery time without a visit
    ///
    /// Returns false if the URL was already known.
    pub fn record_discovered(&self, url: &Url, bucket: Bucket, info: PageInfo) -> bool {
        let key = dedup_key(url);
        let mut frontier = self.lock();

        if frontier.finalized || frontier.slots.contains_key(&key) {
            return false;
        }
        self.place(&mut frontier, key, bucket, info);
        true
    }

    /// Takes the next pending request and marks it in flight
    pub fn next_request(&self) -> Option<Request> {
        let mut frontier = self.lock();
        if frontier.finalized {
            return None;
        }

        while let Some(request) = frontier.queue.pop_front() {
            let key = dedup_key(&request.url);
            if let Some(slot) = frontier.slots.get_mut(&key) {
                if *slot == Slot::Pending {
                    *slot = Slot::InFlight;
                    return Some(request);
                }
            }
            // Merged into a scanned redirect while waiting
        }
        None
    }

    /// Puts an in-flight request back at the head of the queue
    pub fn requeue(&self, request: Request) {
        let key = dedup_key(&request.url);
        let mut frontier = self.lock();
        if let Some(slot) = frontier.slots.get_mut(&key) {
            if *slot == Slot::InFlight {
                *slot = Slot::Pending;
                frontier.queue.push_front(request);
            }
        }
    }

    /// Drops an in-flight request whose page turned out to be scanned already
    pub fn discard(&self, request: &Request) {
        let key = dedup_key(&request.url);
        let mut frontier = self.lock();
        if frontier.slots.get(&key) == Some(&Slot::InFlight) {
            frontier.slots.insert(key, Slot::Alias);
        }
    }

    /// Returns true if the page behind this URL has been scanned
    pub fn is_scanned(&self, url: &Url) -> bool {
        matches!(
            self.lock().slots.get(&dedup_key(url)),
            Some(Slot::Classified(Bucket::Scanned)) | Some(Slot::Alias)
        )
    }

    /// Moves a URL into a terminal bucket
    ///
    /// Returns false (and records nothing) if the URL was already classified.
    pub fn classify(&self, url: &Url, bucket: Bucket, info: PageInfo) -> bool {
        let key = dedup_key(url);
        let mut frontier = self.lock();

        if frontier.finalized || !frontier.is_open(&key) {
            tracing::debug!("Dropping duplicate classification of {} as {}", url, bucket);
            return false;
        }
        self.place(&mut frontier, key, bucket, info);
        true
    }

    /// Commits a successful scan
    ///
    /// When the page was reached through a redirect, the first page scanned
    /// under a final URL wins; later arrivals become not-scanned redirects.
    pub fn commit_scan(&self, request: &Request, final_url: &Url, info: PageInfo) -> ScanCommit {
        let key = dedup_key(&request.url);
        let final_key = dedup_key(final_url);
        let mut frontier = self.lock();

        if frontier.finalized || !frontier.is_open(&key) {
            return ScanCommit::Lost;
        }

        if final_key != key {
            if !frontier.is_open(&final_key) {
                let info = PageInfo::new(request.url.as_str(), status::STATUS_EXCLUDED)
                    .with_actual_url(final_url.as_str())
                    .with_metadata("Redirect target already scanned");
                self.place(&mut frontier, key, Bucket::NotScannedRedirect, info);
                return ScanCommit::DuplicateTarget;
            }

            frontier.slots.insert(final_key, Slot::Alias);
        }
        if final_url != &request.url {
            frontier.scanned_redirects.push(RedirectPair {
                from_url: request.url.to_string(),
                to_url: final_url.to_string(),
            });
        }

        self.place(&mut frontier, key, Bucket::Scanned, info);
        ScanCommit::Scanned
    }

    fn place(&self, frontier: &mut Frontier, key: String, bucket: Bucket, info: PageInfo) {
        tracing::debug!("{} -> {} ({})", info.url, bucket, info.metadata);

        frontier.slots.insert(key, Slot::Classified(bucket));
        if let Some(recorder) = &self.recorder {
            // A closed recorder only means nobody persists this run
            let _ = recorder.send(ClassifiedPage {
                bucket,
                info: info.clone(),
            });
        }
        frontier.buckets.entry(bucket).or_default().push(info);
    }

    pub fn scanned_count(&self) -> usize {
        self.lock().scanned_len()
    }

    /// True once the scanned bucket has reached the page cap
    pub fn cap_reached(&self) -> bool {
        self.scanned_count() >= self.max_requests
    }

    pub fn pending_count(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|s| **s == Slot::Pending)
            .count()
    }

    /// Number of distinct pages discovered so far
    pub fn discovered_count(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|s| **s != Slot::Alias)
            .count()
    }

    /// Current size of every bucket
    pub fn counts(&self) -> BTreeMap<Bucket, usize> {
        self.lock()
            .buckets
            .iter()
            .map(|(bucket, pages)| (*bucket, pages.len()))
            .collect()
    }

    /// Closes the state and returns the final results
    ///
    /// Anything still pending or in flight is accounted as exceeded. Later
    /// calls return the same snapshot and no further mutation is accepted.
    pub fn finalize(&self) -> CrawlResults {
        let mut frontier = self.lock();

        if !frontier.finalized {
            let leftovers: Vec<Request> = frontier.queue.drain(..).collect();
            for request in leftovers {
                let key = dedup_key(&request.url);
                if frontier.is_open(&key) {
                    let info = PageInfo::new(request.url.as_str(), status::STATUS_EXCLUDED)
                        .with_metadata("Crawl stopped before this URL was visited");
                    self.place(&mut frontier, key, Bucket::ExceededRequests, info);
                }
            }
            frontier.finalized = true;
        }

        CrawlResults {
            buckets: frontier.buckets.clone(),
            scanned_redirects: frontier.scanned_redirects.clone(),
            discovered: frontier
                .slots
                .values()
                .filter(|s| **s != Slot::Alias)
                .count(),
        }
    }
}
