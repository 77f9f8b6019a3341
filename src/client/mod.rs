pub use conn::Connection;
pub use pool::Pool;

mod conn;
mod pool;

use crate::backoff::ReconnectPolicy;

/// Tunables shared by every connection in a pool.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request path, templated into the fixed request once per connection.
    pub path: String,
    /// Set `TCP_NODELAY` on every socket.
    pub nodelay: bool,
    /// Initial receive-buffer reservation per read; grows, never shrinks.
    pub recv_buffer_size: usize,
    /// Delay policy between failed cycles.
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            path: "/hello".to_string(),
            nodelay: true,
            recv_buffer_size: 8 * 1024,
            reconnect: ReconnectPolicy::immediate(),
        }
    }
}
