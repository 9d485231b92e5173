// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us)
// 3. Same but for logging / emitting error messages into the tracing/logging system
// 4. A coarse kind on every error, so callers can tell an overflow from a dropped
//    socket without string matching.

use backtrace_error::DynBacktraceError;
use std::borrow::Cow;
use tracing::error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// Operation requested on a value whose type or category cannot support it.
    TypeIncompatible,
    /// Capacity growth failed.
    OutOfMemory,
    /// Inconsistent length, header or stage while decoding.
    MalformedData,
    /// Decimal rescale or arithmetic exceeded the representable range.
    Overflow,
    /// Text to typed value conversion failed.
    Parse,
    /// Socket or RPC layer failure.
    Connection,
    DuplicateSubscription,
    UnknownSubscription,
    /// Sticky writer failure; every later writer call fails fast with it.
    FatalWriter,
    InvalidArgument,
    Cancelled,
    Other,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TypeIncompatible => "type incompatible",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::MalformedData => "malformed data",
            ErrorKind::Overflow => "overflow",
            ErrorKind::Parse => "parse failure",
            ErrorKind::Connection => "connection failure",
            ErrorKind::DuplicateSubscription => "duplicate subscription",
            ErrorKind::UnknownSubscription => "unknown subscription",
            ErrorKind::FatalWriter => "fatal writer error",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Other => "error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
    trace: DynBacktraceError,
}
pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {
    fn description(&self) -> &str {
        &self.0
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
        Error::with_kind(ErrorKind::Other, err)
    }

    pub fn with_kind<E: std::error::Error + Send + Sync + 'static>(kind: ErrorKind, err: E) -> Error {
        error!(target: "dolphin", %kind, "{:?}", err);
        let msg = err.to_string();
        let trace = DynBacktraceError::from(err);
        Error { kind, msg, trace }
    }

    /// Classifies an IO error. An EOF or garbage in the middle of a frame is a
    /// decoding problem; everything else at this layer is the connection's fault.
    pub fn from_io(err: std::io::Error) -> Error {
        use std::io::ErrorKind as Io;
        let kind = match err.kind() {
            Io::UnexpectedEof | Io::InvalidData => ErrorKind::MalformedData,
            Io::OutOfMemory => ErrorKind::OutOfMemory,
            _ => ErrorKind::Connection,
        };
        Error::with_kind(kind, err)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Other, msg)
}

pub fn kind_err(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    let err = SimpleErr(msg.into());
    Error::with_kind(kind, err)
}

pub fn type_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::TypeIncompatible, msg)
}

pub fn overflow_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Overflow, msg)
}

pub fn parse_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Parse, msg)
}

pub fn malformed_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::MalformedData, msg)
}

pub fn conn_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::Connection, msg)
}

pub fn arg_err(msg: impl Into<Cow<'static, str>>) -> Error {
    kind_err(ErrorKind::InvalidArgument, msg)
}
