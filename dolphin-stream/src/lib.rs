// Subscriptions to server stream tables. A publisher pushes frames of rows
// down a connection; the client splits them into messages and hands them
// to per-topic handlers, reconnecting from the last offset seen when the
// connection drops.

mod client;
mod config;
mod frame;
mod message;
mod publisher;

#[cfg(test)]
mod test;

pub use client::{BatchFn, Handler, MessageFn, StreamClient, SubscriptionState};
pub use config::{topic_key, ClientConfig, SubscribeRequest, OFFSET_LATEST};
pub use frame::{read_frame, write_frame, Frame, FrameDecoder};
pub use message::{Message, MessageBody};
pub use publisher::{MessageStream, Publisher, TcpPublisher};
