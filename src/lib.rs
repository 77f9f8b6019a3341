//! A concurrent keep-alive HTTP/1.1 load-generation client.
//!
//! Opens many persistent connections to one or more targets, continuously
//! issues a fixed GET request on each, incrementally parses the responses,
//! and counts status-200 completions in a process-wide atomic counter that a
//! background reporter thread samples into `requests-per-second` lines.
//!
//! All connections run as cooperative tasks on one single-threaded,
//! non-blocking event loop; the reporter is the only other thread, and the
//! counter is the only state shared between the two.

#![deny(missing_debug_implementations)]

#[macro_use]
extern crate log;

pub mod backoff;
pub mod client;
pub mod error;
pub mod proto;
pub mod stats;
pub mod target;

pub mod produce {
    pub use crate::backoff::ReconnectPolicy;
    pub use crate::client::{ClientConfig, Connection, Pool};
    pub use crate::error::{Error, Result};
    pub use crate::proto::{build_request, ParserResult, ResponseParser};
    pub use crate::stats::{Reporter, ReporterHandle, RequestCounter};
    pub use crate::target::TargetAddress;
}

fn _assert_types() {
    use produce::*;
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<RequestCounter>();
    assert_sync::<RequestCounter>();

    assert_send::<TargetAddress>();
    assert_sync::<ClientConfig>();
}
