//! Pool control: abort conditions and autoscaled concurrency
//!
//! This module handles:
//! - The page cap and wall-clock budget, checked after every page
//! - Pool-wide abort (first reason wins, cooperative)
//! - How many workers may take work at once, scaled on observed page latency

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::state::CrawlState;

/// Why the pool stopped taking work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Scanned pages reached the page cap
    PageCap,
    /// The scan duration elapsed
    TimeBudget,
    /// A worker hit an error the run cannot survive
    Fatal,
}

/// Shared stop flag for one crawl
#[derive(Debug)]
pub struct AbortController {
    started: Instant,
    budget: Option<Duration>,
    reason: Mutex<Option<AbortReason>>,
}

impl AbortController {
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget,
            reason: Mutex::new(None),
        }
    }

    /// Aborts the pool; only the first reason is kept
    pub fn abort(&self, reason: AbortReason) {
        let mut current = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_none() {
            tracing::info!("Aborting crawl: {:?} after {:?}", reason, self.started.elapsed());
            *current = Some(reason);
        }
    }

    pub fn reason(&self) -> Option<AbortReason> {
        *self.reason.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_aborted(&self) -> bool {
        self.reason().is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True once the configured scan duration has passed
    pub fn budget_exceeded(&self) -> bool {
        self.budget.is_some_and(|budget| self.started.elapsed() >= budget)
    }

    /// Evaluates both abort conditions, aborting if either holds
    pub fn check(&self, state: &CrawlState) -> Option<AbortReason> {
        if let Some(reason) = self.reason() {
            return Some(reason);
        }
        if state.cap_reached() {
            self.abort(AbortReason::PageCap);
        } else if self.budget_exceeded() {
            self.abort(AbortReason::TimeBudget);
        }
        self.reason()
    }
}

/// Pages per scaling decision
const SCALE_WINDOW: usize = 4;

/// Workers added when pages are fast
const SCALE_UP_STEP: usize = 2;

/// Workers removed when pages are slow or failing
const SCALE_DOWN_STEP: usize = 1;

/// Share of failed pages in a window that counts as overload
const MAX_ERROR_RATE: f64 = 0.25;

#[derive(Debug, Default)]
struct Window {
    samples: usize,
    total: Duration,
    errors: usize,
}

/// Autoscaled worker admission
///
/// Workers are numbered from zero; a worker may take a page only while its
/// number is below the desired concurrency. Scaling up moves faster than
/// scaling down so the pool recovers quickly after a burst of slow pages.
#[derive(Debug)]
pub struct ConcurrencyController {
    min: usize,
    max: usize,
    desired: AtomicUsize,
    target_latency: Duration,
    window: Mutex<Window>,
}

impl ConcurrencyController {
    pub fn new(min: usize, max: usize, target_latency: Duration) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            min,
            max,
            desired: AtomicUsize::new(min),
            target_latency,
            window: Mutex::new(Window::default()),
        }
    }

    pub fn desired(&self) -> usize {
        self.desired.load(Ordering::Acquire)
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Whether worker `worker_id` may take another page
    pub fn allows(&self, worker_id: usize) -> bool {
        worker_id < self.desired()
    }

    /// Records one finished page and rescales at the end of each window
    pub fn record(&self, latency: Duration, ok: bool) {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        window.samples += 1;
        window.total += latency;
        if !ok {
            window.errors += 1;
        }
        if window.samples < SCALE_WINDOW {
            return;
        }

        let average = window.total / window.samples as u32;
        let error_rate = window.errors as f64 / window.samples as f64;
        *window = Window::default();
        drop(window);

        let current = self.desired();
        let next = if error_rate > MAX_ERROR_RATE || average > self.target_latency {
            current.saturating_sub(SCALE_DOWN_STEP).max(self.min)
        } else if average < self.target_latency / 2 {
            (current + SCALE_UP_STEP).min(self.max)
        } else {
            current
        };

        if next != current {
            tracing::debug!(
                "Scaling pool {} -> {} (avg {:?}, {:.0}% errors)",
                current,
                next,
                average,
                error_rate * 100.0
            );
            self.desired.store(next, Ordering::Release);
        }
    }
}
