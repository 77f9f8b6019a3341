use std::error;
use std::fmt;
use std::num::ParseIntError;
use std::result;

macro_rules! from_error {
    ($from:ty,$to:expr) => {
        impl From<$from> for Error{
            fn from(err: $from) -> Self {
                Error{
                    inner: $to(err)
                }
            }
        }
    };
}

macro_rules! impl_error {
    ($err_ty:ty) => {
        impl std::error::Error for $err_ty{}
    };
}

/// A generic "error" for client connections
///
/// This error type is less specific than the error returned from other
/// functions in this crate, but all other errors can be converted to this
/// error. Consumers of this crate can typically consume and work with this form
/// of error for conversions with the `?` operator.
#[derive(Clone)]
pub struct Error {
    inner: ErrorKind,
}

/// A `Result` typedef to use with the `loadgen_rs::Error` type
pub type Result<T> = result::Result<T, Error>;

/// A malformed `host:port` target string
#[derive(Debug, Clone)]
pub struct InvalidTarget {
    msg: String,
}

impl InvalidTarget {
    pub(crate) fn new(msg: &str) -> Self {
        Self { msg: msg.to_string() }
    }
}

impl fmt::Display for InvalidTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.msg.as_str())
    }
}

/// A response whose framing could not be followed (bad content-length,
/// bad chunk size line, too many headers)
#[derive(Debug, Clone)]
pub struct InvalidResponse {
    msg: String,
}

impl InvalidResponse {
    pub(crate) fn new(msg: &str) -> Self {
        Self { msg: msg.to_string() }
    }
}

impl fmt::Display for InvalidResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.msg.as_str())
    }
}

/// A cloneable stand-in for `std::io::Error`, keyed by its `ErrorKind`
#[derive(Debug, Clone, Copy)]
pub struct IoError {
    repr: std::io::ErrorKind,
}

impl IoError {
    pub fn as_str(&self) -> &'static str {
        use std::io::ErrorKind::*;
        match self.repr {
            NotFound => "entity not found",
            PermissionDenied => "permission denied",
            ConnectionRefused => "connection refused",
            ConnectionReset => "connection reset",
            ConnectionAborted => "connection aborted",
            NotConnected => "not connected",
            AddrInUse => "address in use",
            AddrNotAvailable => "address not available",
            BrokenPipe => "broken pipe",
            AlreadyExists => "entity already exists",
            WouldBlock => "operation would block",
            InvalidInput => "invalid input parameter",
            InvalidData => "invalid data",
            TimedOut => "timed out",
            WriteZero => "write zero",
            Interrupted => "operation interrupted",
            UnexpectedEof => "unexpected end of file",
            _ => "other os error"
        }
    }

    pub fn from_kind(repr: std::io::ErrorKind) -> Self {
        Self {
            repr
        }
    }

    pub fn kind(&self) -> std::io::ErrorKind {
        self.repr
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
enum ErrorKind {
    IoError(IoError),
    Parse(httparse::Error),
    InvalidTarget(InvalidTarget),
    InvalidResponse(InvalidResponse),
    ParseInt(ParseIntError),
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("loadgen::Error")
            // Skip the noise of the ErrorKind enum
            .field(&self.get_ref())
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.get_ref(), f)
    }
}

impl Error {
    /// Return true if the underlying error has the same type as T.
    pub fn is<T: error::Error + 'static>(&self) -> bool {
        self.get_ref().is::<T>()
    }

    /// Return a reference to the lower level, inner error.
    pub fn get_ref(&self) -> &(dyn error::Error + 'static) {
        use self::ErrorKind::*;
        match self.inner {
            IoError(ref e) => e,
            Parse(ref e) => e,
            InvalidTarget(ref e) => e,
            InvalidResponse(ref e) => e,
            ParseInt(ref e) => e,
        }
    }
}

impl error::Error for Error {
    // Return any available cause from the inner error. Note the inner error is
    // not itself the cause.
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.get_ref().source()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            inner: ErrorKind::IoError(IoError::from_kind(err.kind()))
        }
    }
}

impl_error!(InvalidTarget);
impl_error!(InvalidResponse);
impl_error!(IoError);

from_error!(IoError,ErrorKind::IoError);
from_error!(httparse::Error,ErrorKind::Parse);
from_error!(InvalidTarget,ErrorKind::InvalidTarget);
from_error!(InvalidResponse,ErrorKind::InvalidResponse);
from_error!(ParseIntError,ErrorKind::ParseInt);
