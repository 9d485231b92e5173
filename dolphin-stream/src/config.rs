use dolphin_base::{arg_err, Result};
use dolphin_vals::Constant;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Start from the newest message rather than a stored offset.
pub const OFFSET_LATEST: i64 = -1;

/// One subscription. `host/port/table/action` names the topic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeRequest {
    pub host: String,
    pub port: u16,
    pub table: String,
    pub action: String,
    /// First message offset wanted, or [`OFFSET_LATEST`].
    pub offset: i64,
    /// Reconnect and resume after the stream drops.
    pub resub: bool,
    /// Subscribe once: never reconnect, even with `resub` set.
    pub sub_once: bool,
    /// Deliver each frame as one table message instead of one message per row.
    pub msg_as_table: bool,
    /// With a batch handler: deliver once this many messages are buffered.
    pub batch_size: usize,
    /// With a batch handler: deliver whatever is buffered after this long.
    pub throttle_ms: u64,
    pub allow_exists: bool,
    pub user: String,
    pub password: String,
    /// Server-side filter on the stream table's filter column.
    #[serde(skip)]
    pub filter: Option<Constant>,
}

impl Default for SubscribeRequest {
    fn default() -> Self {
        SubscribeRequest {
            host: "localhost".into(),
            port: 8848,
            table: String::new(),
            action: String::new(),
            offset: OFFSET_LATEST,
            resub: true,
            sub_once: false,
            msg_as_table: false,
            batch_size: 1,
            throttle_ms: 1000,
            allow_exists: false,
            user: String::new(),
            password: String::new(),
            filter: None,
        }
    }
}

impl SubscribeRequest {
    pub fn new(host: impl Into<String>, port: u16, table: impl Into<String>, action: impl Into<String>) -> Self {
        SubscribeRequest {
            host: host.into(),
            port,
            table: table.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_resub(mut self, resub: bool) -> Self {
        self.resub = resub;
        self
    }

    pub fn with_sub_once(mut self, sub_once: bool) -> Self {
        self.sub_once = sub_once;
        self
    }

    pub fn with_msg_as_table(mut self, msg_as_table: bool) -> Self {
        self.msg_as_table = msg_as_table;
        self
    }

    pub fn with_batching(mut self, batch_size: usize, throttle_ms: u64) -> Self {
        self.batch_size = batch_size;
        self.throttle_ms = throttle_ms;
        self
    }

    pub fn with_filter(mut self, filter: Constant) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn topic(&self) -> String {
        topic_key(&self.host, self.port, &self.table, &self.action)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn reconnects(&self) -> bool {
        self.resub && !self.sub_once
    }

    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(arg_err("subscription needs a table name"));
        }
        if self.batch_size == 0 {
            return Err(arg_err("batch size must be at least 1"));
        }
        if self.offset < OFFSET_LATEST {
            return Err(arg_err(format!("bad start offset {}", self.offset)));
        }
        Ok(())
    }
}

pub fn topic_key(host: &str, port: u16, table: &str, action: &str) -> String {
    format!("{}:{}/{}/{}", host, port, table, action)
}

/// Settings shared by every subscription of one client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Handler threads. 0 runs handlers on each topic's reader thread.
    pub thread_count: usize,
    /// How often a blocked reader wakes to check for unsubscribe.
    pub poll_interval_ms: u64,
    /// Longest wait for the rest of a frame once it has started arriving.
    pub frame_timeout_ms: u64,
    pub reconnect_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            thread_count: 0,
            poll_interval_ms: 100,
            frame_timeout_ms: 30_000,
            reconnect_interval_ms: 1_000,
        }
    }
}

impl ClientConfig {
    pub fn with_threads(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_reconnect_interval(mut self, ms: u64) -> Self {
        self.reconnect_interval_ms = ms;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms.max(1))
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}
