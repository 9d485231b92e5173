use crate::config::{ClientConfig, SubscribeRequest};
use crate::frame::FrameDecoder;
use crate::message::Message;
use crate::publisher::{MessageStream, Publisher, TcpPublisher};
use dolphin_base::{arg_err, bucket_of, kind_err, murmur32, Error, ErrorKind, Result, SyncQueue};
use parking_lot::{Condvar, Mutex};
use rapidhash::RapidHashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub type MessageFn = dyn Fn(Message) + Send + Sync;
pub type BatchFn = dyn Fn(Vec<Message>) + Send + Sync;

/// What a subscription calls with its messages.
#[derive(Clone)]
pub enum Handler {
    Message(Arc<MessageFn>),
    /// Receives messages in groups of `batch_size`, or fewer once
    /// `throttle_ms` has passed since the first one buffered.
    Batch(Arc<BatchFn>),
}

impl Handler {
    pub fn message(f: impl Fn(Message) + Send + Sync + 'static) -> Handler {
        Handler::Message(Arc::new(f))
    }

    pub fn batch(f: impl Fn(Vec<Message>) + Send + Sync + 'static) -> Handler {
        Handler::Batch(Arc::new(f))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    Connecting,
    Subscribed,
    Reconnecting,
    Unsubscribed,
}

type Job = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Batch {
    msgs: Vec<Message>,
    since: Option<Instant>,
}

struct Topic {
    key: String,
    req: SubscribeRequest,
    handler: Handler,
    worker: usize,
    stop: AtomicBool,
    /// Held while the handler runs; false once unsubscribed.
    gate: Mutex<bool>,
    state: Mutex<SubscriptionState>,
    /// -1 until the first message.
    last_offset: AtomicI64,
    delivered: AtomicU64,
    /// Deliveries queued on a handler thread and not yet run.
    pending: AtomicUsize,
    /// Signalled under `gate` when `pending` drops to zero.
    idle: Condvar,
    batch: Mutex<Batch>,
}

impl Topic {
    fn set_state(&self, to: SubscriptionState) {
        let mut state = self.state.lock();
        if *state != to {
            info!(target: "dolphin", topic = %self.key, from = ?*state, to = ?to, "subscription state");
            *state = to;
        }
    }

    fn resume_offset(&self) -> i64 {
        match self.last_offset.load(Ordering::Acquire) {
            -1 => self.req.offset,
            last => last + 1,
        }
    }

    fn deliver(&self, msgs: Vec<Message>) {
        let open = self.gate.lock();
        if !*open {
            return;
        }
        let n = msgs.len() as u64;
        match &self.handler {
            Handler::Message(f) => msgs.into_iter().for_each(|m| f(m)),
            Handler::Batch(f) => f(msgs),
        }
        drop(open);
        self.delivered.fetch_add(n, Ordering::AcqRel);
    }

    fn buffer(&self, msgs: Vec<Message>) {
        let mut b = self.batch.lock();
        if b.msgs.is_empty() {
            b.since = Some(Instant::now());
        }
        b.msgs.extend(msgs);
    }

    /// The buffered batch, if full or due.
    fn take_batch(&self) -> Option<Vec<Message>> {
        let mut b = self.batch.lock();
        let due = b.since.is_some_and(|t| t.elapsed() >= self.req.throttle());
        if b.msgs.is_empty() || (b.msgs.len() < self.req.batch_size && !due) {
            return None;
        }
        b.since = None;
        Some(std::mem::take(&mut b.msgs))
    }
}

struct Shared {
    publisher: Arc<dyn Publisher>,
    config: ClientConfig,
    topics: Mutex<RapidHashMap<String, Arc<Topic>>>,
    queues: Vec<Arc<SyncQueue<Job>>>,
}

impl Shared {
    fn submit(&self, topic: &Arc<Topic>, msgs: Vec<Message>) {
        if msgs.is_empty() {
            return;
        }
        match self.queues.get(topic.worker) {
            Some(q) => {
                topic.pending.fetch_add(1, Ordering::AcqRel);
                let t = topic.clone();
                q.push(Box::new(move || {
                    t.deliver(msgs);
                    if t.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                        let _open = t.gate.lock();
                        t.idle.notify_all();
                    }
                }));
            }
            None => topic.deliver(msgs),
        }
    }

    fn dispatch(&self, topic: &Arc<Topic>, msgs: Vec<Message>) {
        if let Some(last) = msgs.iter().map(|m| m.last_offset()).max() {
            topic.last_offset.fetch_max(last, Ordering::AcqRel);
        }
        match topic.handler {
            Handler::Message(_) => self.submit(topic, msgs),
            Handler::Batch(_) => {
                topic.buffer(msgs);
                if let Some(b) = topic.take_batch() {
                    self.submit(topic, b);
                }
            }
        }
    }

    /// Sends each message to the subscription named by its topic. Topics
    /// this client does not know belong to the stream they arrived on.
    fn route(&self, own: &Arc<Topic>, msgs: Vec<Message>) {
        let mut groups: Vec<(Arc<Topic>, Vec<Message>)> = Vec::new();
        {
            let topics = self.topics.lock();
            for m in msgs {
                let target = topics.get(&m.topic).unwrap_or(own);
                match groups.iter_mut().find(|(t, _)| Arc::ptr_eq(t, target)) {
                    Some((_, g)) => g.push(m),
                    None => groups.push((target.clone(), vec![m])),
                }
            }
        }
        for (t, g) in groups {
            self.dispatch(&t, g);
        }
    }

    /// Resubscribes after the stream died, retrying until it works or the
    /// topic is stopped. `None` means give up.
    fn reconnect(&self, topic: &Topic) -> Option<Box<dyn MessageStream>> {
        if !topic.req.reconnects() {
            topic.set_state(SubscriptionState::Unsubscribed);
            return None;
        }
        topic.set_state(SubscriptionState::Reconnecting);
        loop {
            if !self.pause(topic, self.config.reconnect_interval()) {
                return None;
            }
            let offset = topic.resume_offset();
            match self.publisher.subscribe(&topic.req, offset) {
                Ok(stream) => {
                    info!(target: "dolphin", topic = %topic.key, offset, "resubscribed");
                    topic.set_state(SubscriptionState::Subscribed);
                    return Some(stream);
                }
                Err(e) => warn!(target: "dolphin", topic = %topic.key, error = %e, "resubscribe failed"),
            }
        }
    }

    /// Sleeps for `total` in poll-sized steps. False if stopped meanwhile.
    fn pause(&self, topic: &Topic, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if topic.stop.load(Ordering::Acquire) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(self.config.poll_interval()));
        }
    }
}

fn read_loop(shared: Arc<Shared>, topic: Arc<Topic>, mut stream: Box<dyn MessageStream>) {
    let mut decoder = FrameDecoder::new();
    topic.set_state(SubscriptionState::Subscribed);
    while !topic.stop.load(Ordering::Acquire) {
        let polled = stream.next_frame().and_then(|f| match f {
            Some(frame) => decoder.split(frame, topic.req.msg_as_table).map(Some),
            None => Ok(None),
        });
        match polled {
            Ok(Some(msgs)) => shared.route(&topic, msgs),
            Ok(None) => {}
            Err(e) => {
                stream.close();
                warn!(target: "dolphin", topic = %topic.key, error = %e, "stream lost");
                match shared.reconnect(&topic) {
                    Some(s) => {
                        stream = s;
                        decoder = FrameDecoder::new();
                    }
                    None => return,
                }
            }
        }
        if let Some(b) = topic.take_batch() {
            shared.submit(&topic, b);
        }
    }
    stream.close();
}

fn handler_loop(queue: Arc<SyncQueue<Job>>, stop: Arc<AtomicBool>, poll: Duration) {
    loop {
        queue.wait_for(1, poll);
        while let Some(job) = queue.pop() {
            job();
        }
        if stop.load(Ordering::Acquire) && queue.is_empty() {
            break;
        }
    }
}

/// Subscribes to stream tables and runs handlers on their messages.
///
/// Each topic has a reader thread. With `thread_count` above zero,
/// handlers run on a fixed pool instead, each topic pinned to one thread
/// so its messages stay in order.
pub struct StreamClient {
    shared: Arc<Shared>,
    readers: Mutex<RapidHashMap<String, JoinHandle<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_ids: Vec<ThreadId>,
    stop_workers: Arc<AtomicBool>,
}

impl StreamClient {
    pub fn new(publisher: Arc<dyn Publisher>, config: ClientConfig) -> Result<StreamClient> {
        let queues: Vec<Arc<SyncQueue<Job>>> = (0..config.thread_count).map(|_| Arc::new(SyncQueue::new())).collect();
        let stop_workers = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(queues.len());
        for (i, q) in queues.iter().enumerate() {
            let (q, stop, poll) = (q.clone(), stop_workers.clone(), config.poll_interval());
            let spawned = thread::Builder::new()
                .name(format!("dolphin-handler-{}", i))
                .spawn(move || handler_loop(q, stop, poll));
            match spawned {
                Ok(h) => workers.push(h),
                Err(e) => {
                    stop_workers.store(true, Ordering::Release);
                    queues.iter().for_each(|q| q.wake_all());
                    return Err(Error::from_io(e));
                }
            }
        }
        debug!(target: "dolphin", threads = workers.len(), "stream client started");
        Ok(StreamClient {
            worker_ids: workers.iter().map(|h| h.thread().id()).collect(),
            shared: Arc::new(Shared {
                publisher,
                config,
                topics: Mutex::new(RapidHashMap::default()),
                queues,
            }),
            readers: Mutex::new(RapidHashMap::default()),
            workers: Mutex::new(workers),
            stop_workers,
        })
    }

    /// A client that subscribes over TCP.
    pub fn tcp(config: ClientConfig) -> Result<StreamClient> {
        let publisher = Arc::new(TcpPublisher::new(&config));
        StreamClient::new(publisher, config)
    }

    fn duplicate(topic: &str) -> Error {
        kind_err(ErrorKind::DuplicateSubscription, format!("already subscribed to {}", topic))
    }

    /// Subscribes and starts delivering. Returns the topic key.
    pub fn subscribe(&self, req: SubscribeRequest, handler: Handler) -> Result<String> {
        req.validate()?;
        let key = req.topic();
        if self.shared.topics.lock().contains_key(&key) {
            return Err(Self::duplicate(&key));
        }
        debug!(target: "dolphin", topic = %key, offset = req.offset, "subscribing");
        let mut stream = self.shared.publisher.subscribe(&req, req.offset)?;
        let worker = match self.shared.queues.len() {
            0 => 0,
            n => bucket_of(murmur32(key.as_bytes()), n as u32) as usize,
        };
        let topic = Arc::new(Topic {
            key: key.clone(),
            req,
            handler,
            worker,
            stop: AtomicBool::new(false),
            gate: Mutex::new(true),
            state: Mutex::new(SubscriptionState::Connecting),
            last_offset: AtomicI64::new(-1),
            delivered: AtomicU64::new(0),
            pending: AtomicUsize::new(0),
            idle: Condvar::new(),
            batch: Mutex::new(Batch::default()),
        });
        {
            let mut topics = self.shared.topics.lock();
            if topics.contains_key(&key) {
                stream.close();
                return Err(Self::duplicate(&key));
            }
            topics.insert(key.clone(), topic.clone());
        }
        let (shared, t) = (self.shared.clone(), topic.clone());
        let spawned = thread::Builder::new()
            .name(format!("dolphin-sub-{}", topic.req.table))
            .spawn(move || read_loop(shared, t, stream));
        match spawned {
            Ok(h) => {
                self.readers.lock().insert(key.clone(), h);
                Ok(key)
            }
            Err(e) => {
                self.shared.topics.lock().remove(&key);
                Err(Error::from_io(e))
            }
        }
    }

    /// Stops a subscription. Once this returns its handler is never called
    /// again. Must not be called from a handler.
    pub fn unsubscribe(&self, topic: &str) -> Result<()> {
        let t = self.shared.topics.lock().get(topic).cloned().ok_or_else(|| {
            kind_err(ErrorKind::UnknownSubscription, format!("not subscribed to {}", topic))
        })?;
        let me = thread::current().id();
        let in_reader = self.readers.lock().values().any(|h| h.thread().id() == me);
        if in_reader || self.worker_ids.contains(&me) {
            return Err(arg_err("cannot unsubscribe from a message handler"));
        }
        t.stop.store(true, Ordering::Release);
        let reader = self.readers.lock().remove(topic);
        if let Some(h) = reader {
            if h.join().is_err() {
                warn!(target: "dolphin", %topic, "reader thread panicked");
            }
        }
        let mut open = t.gate.lock();
        *open = false;
        while t.pending.load(Ordering::Acquire) > 0 {
            t.idle.wait(&mut open);
        }
        drop(open);
        self.shared.topics.lock().remove(topic);
        t.set_state(SubscriptionState::Unsubscribed);
        if let Err(e) = self.shared.publisher.unsubscribe(&t.req) {
            warn!(target: "dolphin", %topic, error = %e, "publisher did not stop");
        }
        Ok(())
    }

    pub fn list_topics(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.shared.topics.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn topic(&self, key: &str) -> Option<Arc<Topic>> {
        self.shared.topics.lock().get(key).cloned()
    }

    pub fn state(&self, topic: &str) -> Option<SubscriptionState> {
        self.topic(topic).map(|t| *t.state.lock())
    }

    /// Offset of the newest message received on `topic`.
    pub fn last_offset(&self, topic: &str) -> Option<i64> {
        self.topic(topic)
            .map(|t| t.last_offset.load(Ordering::Acquire))
            .filter(|&o| o >= 0)
    }

    /// Messages handed to the topic's handler so far.
    pub fn delivered(&self, topic: &str) -> Option<u64> {
        self.topic(topic).map(|t| t.delivered.load(Ordering::Acquire))
    }

    /// Undelivered backlog per handler thread, or per topic (in topic
    /// order) when handlers run on reader threads.
    pub fn queue_depth(&self) -> Vec<usize> {
        if !self.shared.queues.is_empty() {
            return self.shared.queues.iter().map(|q| q.len()).collect();
        }
        let topics = self.shared.topics.lock();
        let mut depth: Vec<(&String, usize)> = topics.iter().map(|(k, t)| (k, t.batch.lock().msgs.len())).collect();
        depth.sort();
        depth.into_iter().map(|(_, n)| n).collect()
    }

    /// Unsubscribes everything and stops the handler threads.
    pub fn close(&self) -> Result<()> {
        let mut first = None;
        for topic in self.list_topics() {
            if let Err(e) = self.unsubscribe(&topic) {
                first.get_or_insert(e);
            }
        }
        self.stop_workers.store(true, Ordering::Release);
        self.shared.queues.iter().for_each(|q| q.wake_all());
        for h in self.workers.lock().drain(..) {
            if h.join().is_err() {
                warn!(target: "dolphin", "handler thread panicked");
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(target: "dolphin", error = %e, "stream client close failed");
        }
    }
}
