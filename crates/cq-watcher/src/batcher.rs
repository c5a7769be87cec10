//! Debounced batching of watch events.
//!
//! [`DebouncedBatcher`] coalesces rapid-fire events into one batch per quiet
//! window:
//!
//! - [`enqueue`](DebouncedBatcher::enqueue) stores the event keyed by path
//!   (last write wins) and restarts the window timer.
//! - When the timer fires with no further enqueues, every queued event is
//!   removed and delivered, if any, to the single registered handler.
//! - [`clear`](DebouncedBatcher::clear) cancels the timer and drops queued
//!   events without delivering them.
//!
//! # Timer invalidation
//!
//! Every enqueue, flush and clear bumps a generation counter. A timer task
//! only flushes if its generation is still current, so a timer that already
//! woke up while `clear()` was running is inert. A separate delivery lock
//! serializes handler calls with `clear()`: once `clear()` returns, no
//! handler call is in flight and none will start for previously queued
//! events.
//!
//! Timer-driven deliveries run on tokio's blocking pool, so a slow handler
//! never stalls the runtime. [`flush`](DebouncedBatcher::flush) delivers on
//! the calling thread.
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use cq_watcher::{DebouncedBatcher, WatchEvent, WatchEventKind};
//!
//! # async fn example() {
//! let batcher = DebouncedBatcher::new(Duration::from_millis(100));
//! batcher.on_batch(|events| println!("{} file(s) settled", events.len()));
//!
//! batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "src/a.ts"));
//! batcher.enqueue(WatchEvent::new(WatchEventKind::Change, "src/a.ts"));
//! // ~100ms later the handler sees exactly one event for src/a.ts: the change.
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::events::WatchEvent;

/// Callback receiving one flushed batch.
pub type BatchHandler = Arc<dyn Fn(Vec<WatchEvent>) + Send + Sync>;

/// Mutable state shared between the batcher and its timer task.
#[derive(Default)]
struct BatcherState {
    /// Queued events, one per path.
    pending: FxHashMap<Utf8PathBuf, WatchEvent>,

    /// The armed timer, if any.
    timer: Option<JoinHandle<()>>,

    /// Incremented on every enqueue, flush and clear.
    generation: u64,

    /// The registered batch handler.
    handler: Option<BatchHandler>,
}

impl BatcherState {
    /// Aborts the armed timer and invalidates any timer that already fired.
    fn disarm(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Removes all queued events in arrival order.
    fn drain(&mut self) -> Vec<WatchEvent> {
        let mut events: Vec<WatchEvent> = self.pending.drain().map(|(_, event)| event).collect();
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.path.cmp(&b.path)));
        events
    }
}

struct Shared {
    state: Mutex<BatcherState>,
    /// Held for the duration of every handler call.
    delivery: Mutex<()>,
}

/// Coalesces watch events per path within a fixed window.
///
/// Cheap to clone; clones share the same queue, timer and handler, so one
/// clone can live in the watcher callback while another is cleared on
/// shutdown.
///
/// # Reentrancy
///
/// The handler may call [`enqueue`](Self::enqueue) but must not call
/// [`flush`](Self::flush) or [`clear`](Self::clear), which wait for the
/// handler to return.
#[derive(Clone)]
pub struct DebouncedBatcher {
    shared: Arc<Shared>,
    window: Duration,
    runtime: Handle,
}

impl fmt::Debug for DebouncedBatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebouncedBatcher")
            .field("window", &self.window)
            .field("pending", &self.pending_len())
            .finish_non_exhaustive()
    }
}

impl DebouncedBatcher {
    /// Creates a batcher whose timers run on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime. Use
    /// [`with_runtime`](Self::with_runtime) to supply a handle explicitly.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self::with_runtime(window, Handle::current())
    }

    /// Creates a batcher whose timers run on `runtime`.
    ///
    /// [`enqueue`](Self::enqueue) can then be called from any thread,
    /// including the notify callback thread.
    #[must_use]
    pub fn with_runtime(window: Duration, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BatcherState::default()),
                delivery: Mutex::new(()),
            }),
            window,
            runtime,
        }
    }

    /// Returns the debounce window.
    #[inline]
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Registers the batch handler, replacing any previous one.
    ///
    /// Registration never delivers anything by itself; queued events go to
    /// the new handler at the next flush.
    pub fn on_batch<F>(&self, handler: F)
    where
        F: Fn(Vec<WatchEvent>) + Send + Sync + 'static,
    {
        self.shared.state.lock().handler = Some(Arc::new(handler));
    }

    /// Queues `event`, replacing any queued event for the same path, and
    /// restarts the window timer.
    pub fn enqueue(&self, event: WatchEvent) {
        let mut state = self.shared.state.lock();
        tracing::trace!(path = %event.path, kind = %event.kind, "Queued watch event");
        state.pending.insert(event.path.clone(), event);
        state.disarm();

        let generation = state.generation;
        let shared = Arc::clone(&self.shared);
        let window = self.window;
        state.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            // The handler may block; keep it off the runtime's worker threads.
            let delivery =
                tokio::task::spawn_blocking(move || deliver(&shared, Some(generation)));
            if let Err(error) = delivery.await {
                tracing::error!(error = %error, "Batch handler panicked");
            }
        }));
    }

    /// Delivers all queued events now and cancels the timer.
    pub fn flush(&self) {
        deliver(&self.shared, None);
    }

    /// Cancels the timer and discards queued events without delivering them.
    ///
    /// Waits for an in-flight handler call to finish, so no delivery of
    /// previously queued events happens after this returns.
    pub fn clear(&self) {
        let _delivery = self.shared.delivery.lock();
        let mut state = self.shared.state.lock();
        let dropped = state.pending.len();
        state.disarm();
        state.pending.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "Cleared batcher without delivering");
        }
    }

    /// Returns the number of queued paths.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Returns `true` if a timer is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().timer.is_some()
    }
}

/// Removes queued events and hands them to the handler.
///
/// With `Some(generation)`, does nothing unless that generation is current.
fn deliver(shared: &Shared, generation: Option<u64>) {
    let _delivery = shared.delivery.lock();

    let (events, handler) = {
        let mut state = shared.state.lock();
        match generation {
            Some(generation) if generation != state.generation => return,
            Some(_) => {
                // The firing timer is this task; dropping its handle is enough.
                state.timer = None;
            }
            None => state.disarm(),
        }
        (state.drain(), state.handler.clone())
    };

    if events.is_empty() {
        return;
    }
    match handler {
        Some(handler) => {
            tracing::debug!(events = events.len(), "Flushing debounced batch");
            handler(events);
        }
        None => tracing::debug!(events = events.len(), "No batch handler registered, dropping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WatchEventKind;

    type Delivered = Arc<Mutex<Vec<Vec<WatchEvent>>>>;

    fn recording_batcher(window_ms: u64) -> (DebouncedBatcher, Delivered) {
        let batcher = DebouncedBatcher::new(Duration::from_millis(window_ms));
        let delivered: Delivered = Arc::default();
        let sink = Arc::clone(&delivered);
        batcher.on_batch(move |events| sink.lock().push(events));
        (batcher, delivered)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_on_one_path_delivers_last_event() {
        let (batcher, delivered) = recording_batcher(100);

        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "src/a.ts"));
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            batcher.enqueue(WatchEvent::new(WatchEventKind::Change, "src/a.ts"));
        }
        batcher.enqueue(WatchEvent::new(WatchEventKind::Unlink, "src/a.ts"));

        tokio::time::sleep(Duration::from_millis(150)).await;

        let delivered = delivered.lock();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].len(), 1);
        assert_eq!(delivered[0][0].kind, WatchEventKind::Unlink);
        assert_eq!(delivered[0][0].path.as_str(), "src/a.ts");
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_then_change_surfaces_once() {
        let (batcher, delivered) = recording_batcher(100);

        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "a.ts"));
        batcher.enqueue(WatchEvent::new(WatchEventKind::Change, "a.ts"));
        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "b.ts"));

        tokio::time::sleep(Duration::from_millis(101)).await;

        let delivered = delivered.lock();
        assert_eq!(delivered.len(), 1);
        let kinds: Vec<_> = delivered[0].iter().map(|e| (e.path.as_str(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![("a.ts", WatchEventKind::Change), ("b.ts", WatchEventKind::Add)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_delivered_before_window_elapses() {
        let (batcher, delivered) = recording_batcher(100);

        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "a.ts"));
        tokio::time::sleep(Duration::from_millis(60)).await;
        batcher.enqueue(WatchEvent::new(WatchEventKind::Change, "a.ts"));
        tokio::time::sleep(Duration::from_millis(60)).await;

        // 120ms since the first event but only 60ms since the last.
        assert!(delivered.lock().is_empty());
        assert!(batcher.is_armed());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(delivered.lock().len(), 1);
        assert!(!batcher.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_prevents_delivery() {
        let (batcher, delivered) = recording_batcher(100);

        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "a.ts"));
        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "b.ts"));
        batcher.clear();

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(delivered.lock().is_empty());
        assert_eq!(batcher.pending_len(), 0);
        assert!(!batcher.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_is_idempotent_and_batcher_reusable() {
        let (batcher, delivered) = recording_batcher(100);

        batcher.clear();
        batcher.clear();
        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "a.ts"));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(delivered.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_delivers_immediately_and_disarms() {
        let (batcher, delivered) = recording_batcher(100);

        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "a.ts"));
        batcher.flush();
        assert_eq!(delivered.lock().len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(delivered.lock().len(), 1, "timer must not re-deliver");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reregistering_handler_does_not_redeliver() {
        let (batcher, first) = recording_batcher(100);

        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "a.ts"));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(first.lock().len(), 1);

        let second: Delivered = Arc::default();
        let sink = Arc::clone(&second);
        batcher.on_batch(move |events| sink.lock().push(events));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(second.lock().is_empty());
        assert_eq!(first.lock().len(), 1);

        batcher.enqueue(WatchEvent::new(WatchEventKind::Change, "a.ts"));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(second.lock().len(), 1);
        assert_eq!(first.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_flush_does_not_call_handler() {
        let (batcher, delivered) = recording_batcher(100);
        batcher.flush();
        assert!(delivered.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_handler_events_are_dropped() {
        let batcher = DebouncedBatcher::new(Duration::from_millis(100));
        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "a.ts"));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(batcher.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_slow_handler_does_not_stall_runtime() {
        let batcher = DebouncedBatcher::new(Duration::from_millis(10));
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let outcome: Arc<Mutex<Option<bool>>> = Arc::default();
        let sink = Arc::clone(&outcome);
        batcher.on_batch(move |_events| {
            // Only returns early if the runtime keeps running test code.
            let released = release_rx.lock().recv_timeout(Duration::from_secs(2)).is_ok();
            *sink.lock() = Some(released);
        });

        batcher.enqueue(WatchEvent::new(WatchEventKind::Add, "a.ts"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        release_tx.send(()).unwrap();

        for _ in 0..300 {
            if outcome.lock().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(*outcome.lock(), Some(true));
    }

    #[tokio::test]
    async fn test_enqueue_from_foreign_thread() {
        let (batcher, delivered) = recording_batcher(20);
        let remote = batcher.clone();

        std::thread::spawn(move || {
            remote.enqueue(WatchEvent::new(WatchEventKind::Add, "from-thread.ts"));
        })
        .join()
        .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(delivered.lock().len(), 1);
    }
}
