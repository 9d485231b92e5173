mod cancel;
mod error;
mod hash;
mod queue;

#[cfg(test)]
mod test;

pub use cancel::{CancelToken, Context, JobId};
pub use error::{
    arg_err, conn_err, err, kind_err, malformed_err, overflow_err, parse_err, type_err, Error,
    ErrorKind, Result,
};
pub use hash::{bucket_of, murmur32};
pub use queue::SyncQueue;
