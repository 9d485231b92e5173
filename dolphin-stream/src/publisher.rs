use crate::config::{ClientConfig, SubscribeRequest};
use crate::frame::{read_frame, Frame};
use dolphin_base::{Error, Result};
use dolphin_net::{ConnectOptions, DbConnection, Session};
use dolphin_vals::{Constant, Scalar};
use dolphin_wire::{ConstantReader, DataInputStream};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;
use tracing::{debug, info};

/// A live feed of frames for one subscription.
pub trait MessageStream: Send {
    /// The next frame, or `None` if nothing arrived within the poll
    /// interval. Errors mean the stream is dead.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
    fn close(&mut self);
}

/// The server side of subscriptions.
pub trait Publisher: Send + Sync {
    /// Starts publishing `req.table` from `offset` and returns the feed.
    fn subscribe(&self, req: &SubscribeRequest, offset: i64) -> Result<Box<dyn MessageStream>>;
    fn unsubscribe(&self, req: &SubscribeRequest) -> Result<()>;
}

/// Subscribes over the API protocol: `publishTable` is called on a fresh
/// connection, which then carries the frames.
#[derive(Clone, Debug)]
pub struct TcpPublisher {
    poll_interval: Duration,
    frame_timeout: Duration,
    connect_timeout_ms: u64,
}

impl TcpPublisher {
    pub fn new(config: &ClientConfig) -> Self {
        TcpPublisher {
            poll_interval: config.poll_interval(),
            frame_timeout: config.frame_timeout(),
            connect_timeout_ms: ConnectOptions::default().connect_timeout_ms,
        }
    }

    fn connect(&self, req: &SubscribeRequest) -> Result<DbConnection> {
        let mut opts = ConnectOptions::new(req.host.clone(), req.port).with_timeouts(self.connect_timeout_ms, 0, 0);
        if !req.user.is_empty() {
            opts = opts.with_credentials(req.user.clone(), req.password.clone());
        }
        DbConnection::connect(&opts)
    }
}

fn text(s: &str) -> Constant {
    Constant::Scalar(Scalar::String(s.to_string()))
}

impl Publisher for TcpPublisher {
    fn subscribe(&self, req: &SubscribeRequest, offset: i64) -> Result<Box<dyn MessageStream>> {
        let mut conn = self.connect(req)?;
        let args = [
            text(""),
            Constant::Scalar(Scalar::Int(0)),
            text(&req.table),
            text(&req.action),
            Constant::Scalar(Scalar::Long(offset)),
            req.filter.clone().unwrap_or_else(Constant::null),
            Constant::Scalar(Scalar::Bool(i8::from(req.allow_exists))),
        ];
        conn.run_function("publishTable", &args)?;
        info!(target: "dolphin", topic = %req.topic(), offset, "publishing started");
        let (inp, handle) = conn.into_stream()?;
        handle
            .set_read_timeout(Some(self.poll_interval))
            .map_err(Error::from_io)?;
        Ok(Box::new(TcpMessageStream {
            inp,
            reader: ConstantReader::new(),
            handle,
            poll_interval: self.poll_interval,
            frame_timeout: self.frame_timeout,
        }))
    }

    fn unsubscribe(&self, req: &SubscribeRequest) -> Result<()> {
        let mut conn = self.connect(req)?;
        let args = [
            text(""),
            Constant::Scalar(Scalar::Int(0)),
            text(&req.table),
            text(&req.action),
        ];
        conn.run_function("stopPublishTable", &args)?;
        debug!(target: "dolphin", topic = %req.topic(), "publishing stopped");
        Ok(())
    }
}

struct TcpMessageStream {
    inp: DataInputStream<TcpStream>,
    reader: ConstantReader,
    handle: TcpStream,
    poll_interval: Duration,
    frame_timeout: Duration,
}

impl TcpMessageStream {
    fn set_timeout(&self, t: Duration) -> Result<()> {
        self.handle.set_read_timeout(Some(t)).map_err(Error::from_io)
    }
}

impl MessageStream for TcpMessageStream {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.inp.fill(1)? {
            return Ok(None);
        }
        self.set_timeout(self.frame_timeout)?;
        let frame = read_frame(&mut self.inp, &mut self.reader)?;
        self.set_timeout(self.poll_interval)?;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        if let Err(e) = self.handle.shutdown(Shutdown::Both) {
            debug!(target: "dolphin", error = %e, "stream socket already closed");
        }
    }
}
