use crate::{Frame, MessageStream, Publisher, SubscribeRequest};
use dolphin_base::{conn_err, Result, SyncQueue};
use dolphin_vals::{Constant, Table, Vector};
use parking_lot::Mutex;
use rapidhash::RapidHashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub(crate) mod config;
pub(crate) mod frame;

pub(crate) enum Feed {
    Frame(Frame),
    /// Kills the stream as a dropped connection would.
    Drop,
}

/// A publisher living in memory. Each subscribe opens a fresh feed for the
/// topic; tests push frames into the newest one.
#[derive(Default)]
pub(crate) struct FakePublisher {
    feeds: Mutex<RapidHashMap<String, Arc<SyncQueue<Feed>>>>,
    pub(crate) subscribes: Mutex<Vec<(String, i64)>>,
    pub(crate) unsubscribes: Mutex<Vec<String>>,
}

impl FakePublisher {
    pub(crate) fn push(&self, topic: &str, item: Feed) {
        if let Some(q) = self.feeds.lock().get(topic) {
            q.push(item);
        }
    }
}

impl Publisher for FakePublisher {
    fn subscribe(&self, req: &SubscribeRequest, offset: i64) -> Result<Box<dyn MessageStream>> {
        let q = Arc::new(SyncQueue::new());
        self.feeds.lock().insert(req.topic(), q.clone());
        self.subscribes.lock().push((req.topic(), offset));
        Ok(Box::new(FakeStream { q }))
    }

    fn unsubscribe(&self, req: &SubscribeRequest) -> Result<()> {
        self.unsubscribes.lock().push(req.topic());
        Ok(())
    }
}

struct FakeStream {
    q: Arc<SyncQueue<Feed>>,
}

impl MessageStream for FakeStream {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.q.wait_for(1, Duration::from_millis(5));
        match self.q.pop() {
            Some(Feed::Frame(f)) => Ok(Some(f)),
            Some(Feed::Drop) => Err(conn_err("feed dropped")),
            None => Ok(None),
        }
    }

    fn close(&mut self) {}
}

/// A frame of rows `id, price` with ids `first..first+n`.
pub(crate) fn rows_frame(topic: &str, offset: i64, first: i32, n: i32) -> Frame {
    let ids: Vec<i32> = (first..first + n).collect();
    let prices: Vec<f64> = ids.iter().map(|&i| i as f64 * 1.5).collect();
    let table = Table::new(
        vec!["id".to_string(), "price".to_string()],
        vec![Vector::ints(&ids), Vector::doubles(&prices)],
    )
    .expect("table");
    Frame {
        sent_time: 0,
        offset,
        topics: vec![topic.to_string()],
        body: Constant::Table(table),
    }
}

/// Polls `cond` until it holds or two seconds pass.
pub(crate) fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}
