// A client collects together the pieces an application needs to talk to a
// columnar database server: typed values, their wire form, RPC sessions,
// stream subscriptions and the batching table writer.
//
// Each subsystem is also usable on its own; the columnar core does not pull
// in networking or threads.

pub use dolphin_base as base;
pub use dolphin_net as net;
pub use dolphin_stream as stream;
pub use dolphin_vals as vals;
pub use dolphin_wire as wire;
pub use dolphin_write as write;

pub use dolphin_base::{Error, ErrorKind, Result};
pub use dolphin_net::{ConnectOptions, Connector, DbConnection, Session, TcpConnector};
pub use dolphin_stream::{ClientConfig, Handler, Message, StreamClient, SubscribeRequest};
pub use dolphin_vals::{Constant, DataForm, DataType, Dictionary, Scalar, Table, TypeDesc, Vector, VectorOps};
pub use dolphin_wire::{decode, encode};
pub use dolphin_write::{TableWriter, WriterConfig, WriterStatus};
