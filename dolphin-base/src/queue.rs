use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A FIFO shared between producer and consumer threads. Consumers block on
/// [`SyncQueue::wait_for`] until enough items arrive, a timeout passes, or
/// someone calls [`SyncQueue::wake_all`] (used to ask workers to exit).
#[derive(Debug, Default)]
pub struct SyncQueue<T> {
    items: Mutex<VecDeque<T>>,
    ready: Condvar,
}

impl<T> SyncQueue<T> {
    pub fn new() -> Self {
        SyncQueue {
            items: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    pub fn push(&self, item: T) {
        self.items.lock().push_back(item);
        self.ready.notify_all();
    }

    pub fn push_all(&self, batch: impl IntoIterator<Item = T>) {
        let mut items = self.items.lock();
        let before = items.len();
        items.extend(batch);
        let pushed = items.len() != before;
        drop(items);
        if pushed {
            self.ready.notify_all();
        }
    }

    /// Pushes only while the queue holds fewer than `cap` items. Returns
    /// whether the item was kept.
    pub fn push_capped(&self, item: T, cap: usize) -> bool {
        let mut items = self.items.lock();
        if items.len() >= cap {
            return false;
        }
        items.push_back(item);
        true
    }

    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Removes up to `max` items from the front, preserving order.
    pub fn pop_batch(&self, max: usize) -> Vec<T> {
        let mut items = self.items.lock();
        let n = items.len().min(max);
        items.drain(..n).collect()
    }

    pub fn drain_all(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Blocks until the queue holds at least `min_len` items or `timeout`
    /// elapses, or until woken by [`SyncQueue::wake_all`]. Returns the
    /// queue length at wakeup.
    pub fn wait_for(&self, min_len: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock();
        if items.len() >= min_len {
            return items.len();
        }
        // A single wait: a notify means either new items or an exit request,
        // and in both cases the caller wants to re-examine its state.
        self.ready.wait_until(&mut items, deadline);
        items.len()
    }

    /// Like [`SyncQueue::wait_for`] but keeps waiting through notifications
    /// until `min_len` is reached or the deadline passes.
    pub fn wait_for_len(&self, min_len: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock();
        while items.len() < min_len {
            if self.ready.wait_until(&mut items, deadline).timed_out() {
                break;
            }
        }
        items.len()
    }

    pub fn wake_all(&self) {
        let _items = self.items.lock();
        self.ready.notify_all();
    }
}
