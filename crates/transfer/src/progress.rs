use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::{FileTransfer, TransferProgress};

/// Default progress notification interval.
const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Callback invoked with transfer progress.
pub type ProgressCallback = Box<dyn Fn(TransferProgress) + Send + Sync>;

/// Tracks active file transfers and notifies callbacks periodically.
///
/// Each tracked transfer carries its own [`SpeedCalculator`]; snapshots
/// handed to callbacks have `bytes_per_second` filled in.
pub struct ProgressTracker {
    inner: Arc<RwLock<TrackerInner>>,
    stop: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

struct TrackerInner {
    callbacks: Vec<ProgressCallback>,
    transfers: HashMap<String, TrackedTransfer>,
    interval: Duration,
}

struct TrackedTransfer {
    transfer: Arc<FileTransfer>,
    speed: SpeedCalculator,
    last_sent: AtomicU64,
}

impl ProgressTracker {
    /// Creates a tracker with the given notification interval.
    ///
    /// If `interval` is `None`, defaults to 500 ms.
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TrackerInner {
                callbacks: Vec::new(),
                transfers: HashMap::new(),
                interval: interval.unwrap_or(DEFAULT_INTERVAL),
            })),
            stop: Mutex::new(None),
        }
    }

    /// Registers a progress callback.
    pub fn on_progress(&self, callback: ProgressCallback) {
        self.inner.write().unwrap().callbacks.push(callback);
    }

    /// Begins tracking a transfer.
    pub fn track(&self, transfer: Arc<FileTransfer>) {
        let id = transfer.id();
        let mut inner = self.inner.write().unwrap();
        inner.transfers.insert(
            id,
            TrackedTransfer {
                transfer,
                speed: SpeedCalculator::new(None, None),
                last_sent: AtomicU64::new(0),
            },
        );
    }

    /// Stops tracking a transfer.
    pub fn untrack(&self, transfer_id: &str) {
        self.inner.write().unwrap().transfers.remove(transfer_id);
    }

    /// Returns a tracked transfer by id.
    pub fn get(&self, transfer_id: &str) -> Option<Arc<FileTransfer>> {
        let inner = self.inner.read().unwrap();
        inner
            .transfers
            .get(transfer_id)
            .map(|t| Arc::clone(&t.transfer))
    }

    /// Sends a one-time progress notification for a transfer.
    pub fn notify(&self, transfer_id: &str) {
        let inner = self.inner.read().unwrap();
        if let Some(tracked) = inner.transfers.get(transfer_id) {
            emit(&inner.callbacks, tracked);
        }
    }

    /// Starts periodic progress notifications in a background tokio task.
    ///
    /// Call [`stop`](Self::stop) to cancel.
    pub fn start(&self) {
        let (tx, mut rx) = tokio::sync::oneshot::channel();
        {
            let mut stop = self.stop.lock().unwrap();
            // Stop any existing task.
            drop(stop.take());
            *stop = Some(tx);
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let interval = inner.read().unwrap().interval;
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let i = inner.read().unwrap();
                        for tracked in i.transfers.values() {
                            if tracked.transfer.is_active() {
                                emit(&i.callbacks, tracked);
                            }
                        }
                    }
                    _ = &mut rx => {
                        break;
                    }
                }
            }
        });
    }

    /// Stops the periodic notification task.
    pub fn stop(&self) {
        let mut stop = self.stop.lock().unwrap();
        // Dropping the sender signals the task to exit.
        drop(stop.take());
    }
}

fn emit(callbacks: &[ProgressCallback], tracked: &TrackedTransfer) {
    let mut progress = tracked.transfer.snapshot();
    let last = tracked
        .last_sent
        .swap(progress.sent_bytes, Ordering::Relaxed);
    tracked
        .speed
        .add_sample(progress.sent_bytes.saturating_sub(last));
    progress.bytes_per_second = tracked.speed.bytes_per_second();
    for cb in callbacks {
        cb(progress.clone());
    }
}

// ---------------------------------------------------------------------------
// SpeedCalculator
// ---------------------------------------------------------------------------

/// Calculates transfer speed over a sliding window of samples.
pub struct SpeedCalculator {
    inner: Mutex<SpeedInner>,
}

struct SpeedInner {
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
    max_samples: usize,
}

impl SpeedCalculator {
    /// Creates a calculator.
    ///
    /// - `window`: time window for the average (default 5 s).
    /// - `max_samples`: maximum retained samples (default 100).
    pub fn new(window: Option<Duration>, max_samples: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(SpeedInner {
                samples: VecDeque::new(),
                window: window.unwrap_or(Duration::from_secs(5)),
                max_samples: max_samples.unwrap_or(100),
            }),
        }
    }

    /// Records `bytes` transferred at the current instant.
    pub fn add_sample(&self, bytes: u64) {
        let mut s = self.inner.lock().unwrap();
        let now = Instant::now();
        s.samples.push_back((now, bytes));

        // Drop samples that fell out of the window, then cap the count.
        let cutoff = now - s.window;
        while s.samples.front().is_some_and(|(t, _)| *t < cutoff) {
            s.samples.pop_front();
        }
        while s.samples.len() > s.max_samples {
            s.samples.pop_front();
        }
    }

    /// Average speed in bytes/second within the window.
    ///
    /// Returns 0.0 with fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let s = self.inner.lock().unwrap();
        let (Some((first, _)), Some((last, _))) = (s.samples.front(), s.samples.back()) else {
            return 0.0;
        };
        if s.samples.len() < 2 {
            return 0.0;
        }
        let elapsed = last.duration_since(*first);
        if elapsed.is_zero() {
            return 0.0;
        }
        let total: u64 = s.samples.iter().map(|(_, b)| *b).sum();
        total as f64 / elapsed.as_secs_f64()
    }

    /// Estimated time to transfer `remaining_bytes` at the current speed.
    ///
    /// Returns `None` if the speed is zero.
    pub fn eta(&self, remaining_bytes: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining_bytes as f64 / speed))
    }

    /// Clears all recorded samples.
    pub fn reset(&self) {
        self.inner.lock().unwrap().samples.clear();
    }
}
