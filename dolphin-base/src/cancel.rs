// Long-running calls (RPCs, subscription reconnect loops) take a
// `CancelToken` rather than reacting to process signals. Tokens are handed
// out by a `Context`, which owns the registry of in-flight jobs for the
// process and is passed explicitly to whatever needs it.

use crate::error::{kind_err, ErrorKind, Result};
use parking_lot::Mutex;
use rapidhash::RapidHashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(kind_err(ErrorKind::Cancelled, "job cancelled"))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u64);

/// Process-wide state with an explicit lifetime: create one at startup,
/// share it by `Arc`, call [`Context::shutdown`] at teardown.
#[derive(Debug, Default)]
pub struct Context {
    next_job: AtomicU64,
    jobs: Mutex<RapidHashMap<JobId, CancelToken>>,
    shut_down: AtomicBool,
}

impl Context {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a job and returns its token. After shutdown the token is
    /// born cancelled.
    pub fn begin_job(&self) -> (JobId, CancelToken) {
        let id = JobId(self.next_job.fetch_add(1, Ordering::Relaxed));
        let token = CancelToken::new();
        if self.shut_down.load(Ordering::Acquire) {
            token.cancel();
        }
        self.jobs.lock().insert(id, token.clone());
        (id, token)
    }

    pub fn end_job(&self, id: JobId) {
        self.jobs.lock().remove(&id);
    }

    pub fn cancel_job(&self, id: JobId) -> bool {
        match self.jobs.lock().get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let jobs = self.jobs.lock();
        debug!(target: "dolphin", jobs = jobs.len(), "cancelling all jobs");
        for token in jobs.values() {
            token.cancel();
        }
    }

    pub fn running_jobs(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        self.cancel_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}
