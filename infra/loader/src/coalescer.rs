use crate::demux::{Slot, demultiplex};
use crate::error::LoaderError;
use crate::page::paginate;
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::Mutex;
use parley_domain::config::LoaderConfig;
use parley_domain::models::{
    BatchRequest, Comment, CommentBatch, Discriminant, LoadKey, LoadTarget, Page,
};
use std::collections::hash_map::Entry;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Bulk comment source the coalescer dispatches to.
///
/// Every request it receives is uniform: one discriminant, no repeated target.
/// Implementations return each group newest first with at most `first + 1`
/// items, groups contiguous when flat, and may report individual keys as failed
/// through [`CommentBatch::failures`].
pub trait BatchFetcher: Send + Sync + 'static {
    type Error: Error + Send + Sync + 'static;

    fn fetch(
        &self,
        request: &BatchRequest,
    ) -> impl Future<Output = Result<CommentBatch, Self::Error>> + Send;
}

/// Counters for batching telemetry.
#[derive(Debug, Default)]
pub struct LoaderStats {
    /// `load` calls accepted.
    pub loads: AtomicU64,
    /// Windows dispatched.
    pub windows: AtomicU64,
    /// Fetch calls issued (one per uniform sub-batch).
    pub fetches: AtomicU64,
    /// Distinct keys sent to the fetcher.
    pub keys: AtomicU64,
}

impl LoaderStats {
    fn bump(counter: &AtomicU64, by: usize) {
        counter.fetch_add(u64::try_from(by).unwrap_or(u64::MAX), Ordering::Relaxed);
    }
}

type Waiter = oneshot::Sender<Slot>;

#[derive(Debug)]
struct Window {
    generation: u64,
    /// Distinct keys in submission order.
    keys: Vec<LoadKey>,
    waiters: FxHashMap<LoadKey, Vec<Waiter>>,
}

impl Window {
    fn new(generation: u64) -> Self {
        Self { generation, keys: Vec::new(), waiters: FxHashMap::default() }
    }

    fn push(&mut self, key: LoadKey, waiter: Waiter) {
        match self.waiters.entry(key) {
            Entry::Occupied(mut slot) => {
                trace!(target_key = %key.target, "Key joined an existing slot");
                slot.get_mut().push(waiter);
            },
            Entry::Vacant(slot) => {
                self.keys.push(key);
                slot.insert(vec![waiter]);
            },
        }
    }
}

#[derive(Debug, Default)]
struct WindowState {
    generation: u64,
    open: Option<Window>,
}

enum Enqueued {
    Opened(u64),
    Joined,
    Full(Window),
}

struct Inner<F> {
    fetcher: F,
    max_batch: usize,
    wait: Duration,
    state: Mutex<WindowState>,
    /// Serializes dispatches: at most one fetch in flight.
    gate: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
    stats: LoaderStats,
}

/// Request-scoped batching handle over a [`BatchFetcher`].
///
/// The first `load` of an idle period opens a window and arms a timer; every
/// `load` until the timer fires (or the window reaches `max_batch` distinct
/// keys) joins that window. Identical keys share one slot. On close the keys
/// are split into uniform sub-batches in submission order and fetched one
/// after another.
///
/// Cancelling the coalescer (or the parent token it was created from) drops the
/// in-flight fetch and resolves every pending `load` to
/// [`LoaderError::Cancelled`].
pub struct Coalescer<F> {
    inner: Arc<Inner<F>>,
}

impl<F> Clone for Coalescer<F> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<F> fmt::Debug for Coalescer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coalescer")
            .field("max_batch", &self.inner.max_batch)
            .field("wait", &self.inner.wait)
            .field("cancelled", &self.inner.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<F: BatchFetcher> Coalescer<F> {
    /// Creates a coalescer with its own cancellation scope.
    #[must_use]
    pub fn new(fetcher: F, config: LoaderConfig) -> Self {
        Self::with_token(fetcher, config, CancellationToken::new())
    }

    /// Creates a coalescer cancelled together with `parent`.
    #[must_use]
    pub fn with_parent(fetcher: F, config: LoaderConfig, parent: &CancellationToken) -> Self {
        Self::with_token(fetcher, config, parent.child_token())
    }

    fn with_token(fetcher: F, config: LoaderConfig, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                max_batch: config.max_batch.max(1),
                wait: config.wait(),
                state: Mutex::new(WindowState::default()),
                gate: tokio::sync::Mutex::new(()),
                cancel,
                stats: LoaderStats::default(),
            }),
        }
    }

    /// Loads the raw (overfetched) slice for `key`.
    ///
    /// # Errors
    /// * [`LoaderError::NotFound`] when the key's group is empty.
    /// * [`LoaderError::Fetch`] when the batch or this key failed in storage.
    /// * [`LoaderError::Cancelled`] when the coalescer was cancelled.
    pub async fn load(&self, key: LoadKey) -> Result<Vec<Comment>, LoaderError> {
        let cancel = &self.inner.cancel;
        if cancel.is_cancelled() {
            return Err(LoaderError::cancelled());
        }
        LoaderStats::bump(&self.inner.stats.loads, 1);

        let (tx, rx) = oneshot::channel();
        match self.enqueue(key, tx) {
            Enqueued::Opened(generation) => self.spawn_timer(generation),
            Enqueued::Full(window) => self.spawn_dispatch(window),
            Enqueued::Joined => {},
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LoaderError::cancelled()),
            slot = rx => slot.unwrap_or_else(|_| Err(LoaderError::cancelled())),
        }
    }

    /// Loads `key` and trims the result to a page.
    ///
    /// # Errors
    /// As [`Coalescer::load`]; `first == 0` also yields [`LoaderError::NotFound`].
    pub async fn load_page(&self, key: LoadKey) -> Result<Page<Comment>, LoaderError> {
        let items = self.load(key).await?;
        paginate(items, key.first)
            .ok_or(LoaderError::NotFound { target: key.target, context: None })
    }

    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    #[must_use]
    pub fn stats(&self) -> &LoaderStats {
        &self.inner.stats
    }

    fn enqueue(&self, key: LoadKey, waiter: Waiter) -> Enqueued {
        let mut state = self.inner.state.lock();
        let WindowState { generation, open } = &mut *state;

        let mut opened = None;
        let window = open.get_or_insert_with(|| {
            *generation += 1;
            opened = Some(*generation);
            Window::new(*generation)
        });
        window.push(key, waiter);

        if window.keys.len() >= self.inner.max_batch {
            return open.take().map_or(Enqueued::Joined, Enqueued::Full);
        }
        opened.map_or(Enqueued::Joined, Enqueued::Opened)
    }

    /// Closes the open window if it is still `generation`.
    fn take_window(&self, generation: u64) -> Option<Window> {
        let mut state = self.inner.state.lock();
        if state.open.as_ref().is_some_and(|w| w.generation == generation) {
            state.open.take()
        } else {
            None
        }
    }

    fn spawn_timer(&self, generation: u64) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = this.inner.cancel.cancelled() => {},
                () = tokio::time::sleep(this.inner.wait) => {
                    if let Some(window) = this.take_window(generation) {
                        this.dispatch(window).await;
                    }
                },
            }
        });
    }

    fn spawn_dispatch(&self, window: Window) {
        let this = self.clone();
        tokio::spawn(async move { this.dispatch(window).await });
    }

    async fn dispatch(&self, window: Window) {
        let Window { generation, keys, mut waiters } = window;
        let cancel = &self.inner.cancel;
        LoaderStats::bump(&self.inner.stats.windows, 1);

        let _gate = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            guard = self.inner.gate.lock() => guard,
        };

        let batches = split_uniform(keys);
        debug!(generation, batches = batches.len(), "Dispatching load window");

        for request in batches {
            LoaderStats::bump(&self.inner.stats.fetches, 1);
            LoaderStats::bump(&self.inner.stats.keys, request.len());

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(generation, "Load window cancelled during fetch");
                    return;
                },
                outcome = self.inner.fetcher.fetch(&request) => outcome,
            };

            for (key, slot) in request.iter().zip(resolve(&request, outcome)) {
                for waiter in waiters.remove(key).into_iter().flatten() {
                    // The caller may have given up already.
                    let _ = waiter.send(slot.clone());
                }
            }
        }
    }
}

/// Turns a fetch outcome into one slot per key; a failed or malformed batch
/// hands the same error to every key.
fn resolve<E>(request: &BatchRequest, outcome: Result<CommentBatch, E>) -> Vec<Slot>
where
    E: Error + Send + Sync + 'static,
{
    let failure = match outcome {
        Ok(batch) => match demultiplex(request, batch) {
            Ok(slots) => return slots,
            Err(violation) => LoaderError::fetch(violation),
        },
        Err(err) => LoaderError::fetch(err),
    };

    if let LoaderError::Fetch { source, .. } = &failure {
        let cause: &(dyn Error + 'static) = source.as_ref();
        error!(keys = request.len(), error = cause, "Batch fetch failed");
    }
    vec![Err(failure); request.len()]
}

#[derive(Debug)]
struct SubBatch {
    discriminant: Discriminant,
    targets: FxHashSet<LoadTarget>,
    keys: Vec<LoadKey>,
}

/// Splits a window into batches of one discriminant and unique targets,
/// keeping submission order inside each batch.
fn split_uniform(keys: Vec<LoadKey>) -> Vec<BatchRequest> {
    let mut batches: Vec<SubBatch> = Vec::new();
    for key in keys {
        let discriminant = key.discriminant();
        match batches
            .iter_mut()
            .find(|b| b.discriminant == discriminant && !b.targets.contains(&key.target))
        {
            Some(batch) => {
                batch.targets.insert(key.target);
                batch.keys.push(key);
            },
            None => {
                let mut targets = FxHashSet::default();
                targets.insert(key.target);
                batches.push(SubBatch { discriminant, targets, keys: vec![key] });
            },
        }
    }
    batches.into_iter().map(|b| BatchRequest::new(b.keys)).collect()
}
