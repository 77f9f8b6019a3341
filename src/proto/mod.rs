pub use http1::parse::{build_request, ResponseParser};
pub use http1::{connection_close, connection_keep_alive};

mod http1;

/// Outcome of feeding bytes to an incremental parser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParserResult<T> {
    Complete(T),
    Partial,
}
