use std::io::ErrorKind;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::backoff::ReconnectPolicy;
use crate::client::ClientConfig;
use crate::error::{Error, IoError, Result};
use crate::proto::{build_request, ParserResult, ResponseParser};
use crate::stats::RequestCounter;
use crate::target::TargetAddress;

/// One logical keep-alive client session.
///
/// The connection's identity (target address, prebuilt request bytes, parser,
/// receive buffer) persists for the life of the process; the underlying
/// socket is torn down and recreated whenever the peer is not currently
/// connected. At most one request is in flight at any time, and all I/O is
/// driven from the single dispatcher thread the connection's task runs on.
#[derive(Debug)]
pub struct Connection {
    target: TargetAddress,
    request: Bytes,
    /// `None` means "must connect before writing".
    stream: Option<TcpStream>,
    /// Receive buffer, reused across reads. Capacity only grows.
    buf: BytesMut,
    /// Bytes reserved ahead of each read; doubled whenever a read fills the
    /// whole reservation, never reduced.
    recv_hint: usize,
    parser: ResponseParser,
    counter: Arc<RequestCounter>,
    policy: ReconnectPolicy,
    nodelay: bool,
}

impl Connection {
    pub fn new(target: TargetAddress, counter: Arc<RequestCounter>, config: &ClientConfig) -> Self {
        let request = build_request(&target, config.path.as_str());
        Self {
            target,
            request,
            stream: None,
            buf: BytesMut::new(),
            recv_hint: config.recv_buffer_size,
            parser: ResponseParser::new(),
            counter,
            policy: config.reconnect.clone(),
            nodelay: config.nodelay,
        }
    }

    pub fn target(&self) -> &TargetAddress {
        &self.target
    }

    /// The raw request issued on every cycle.
    pub fn request_bytes(&self) -> &[u8] {
        self.request.as_ref()
    }

    /// Drive request cycles forever.
    ///
    /// Every failure (connect, write, peer close, unparsable response) is
    /// local to this connection: the socket is dropped, the reconnect policy
    /// supplies the next delay (zero by default), and the cycle restarts from
    /// the connect step. Nothing here terminates the process.
    pub async fn run(mut self) {
        loop {
            match self.cycle().await {
                Ok(()) => self.policy.reset(),
                Err(e) => {
                    warn!("connection to {} failed: {}", self.target, e);
                    self.stream = None;
                    let delay = self.policy.next_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    /// One request/response cycle: connect if needed, send the fixed request,
    /// read until the parser reports a complete response.
    async fn cycle(&mut self) -> Result<()> {
        self.ensure_connected().await?;
        self.parser.reset();
        self.buf.clear();

        let status = self.exchange().await?;
        if status == 200 {
            self.counter.increment();
        }
        if !self.parser.is_keep_alive() {
            // peer asked for closure; reconnect on the next cycle
            self.stream = None;
        }
        Ok(())
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let stream = TcpStream::connect((self.target.host(), self.target.port())).await?;
            stream.set_nodelay(self.nodelay)?;
            debug!("connected to {}", self.target);
            self.stream = Some(stream);
        }
        Ok(())
    }

    async fn exchange(&mut self) -> Result<u16> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(Error::from(IoError::from_kind(ErrorKind::NotConnected))),
        };

        stream.write_all(self.request.as_ref()).await?;

        loop {
            self.buf.reserve(self.recv_hint);
            let n = stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                // peer closed (or closed mid-response); restart the cycle
                return Err(Error::from(IoError::from_kind(ErrorKind::UnexpectedEof)));
            }
            if n >= self.recv_hint {
                self.recv_hint *= 2;
            }
            if let ParserResult::Complete(status) = self.parser.feed(&mut self.buf)? {
                return Ok(status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use tokio::task::LocalSet;

    use crate::client::testutil::{spawn_server, ServerStats};

    use super::*;

    fn test_config() -> ClientConfig {
        ClientConfig::default()
    }

    async fn wait_for_count(counter: &RequestCounter, at_least: u64) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while counter.value() < at_least {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for responses");
    }

    #[tokio::test]
    async fn keep_alive_cycles_reuse_one_socket() {
        let stats = Arc::new(ServerStats::default());
        let addr = spawn_server("HTTP/1.1 200 OK", usize::MAX, stats.clone());
        let counter = Arc::new(RequestCounter::new());
        let target = TargetAddress::new(addr.ip().to_string(), addr.port());
        let conn = Connection::new(target, counter.clone(), &test_config());

        let local = LocalSet::new();
        local
            .run_until(async {
                tokio::task::spawn_local(conn.run());
                wait_for_count(&counter, 5).await;
            })
            .await;

        assert!(counter.value() >= 5);
        assert_eq!(1, stats.accepts.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn recovers_when_peer_closes_between_responses() {
        let stats = Arc::new(ServerStats::default());
        // one response per connection forces a reconnect for every cycle
        let addr = spawn_server("HTTP/1.1 200 OK", 1, stats.clone());
        let counter = Arc::new(RequestCounter::new());
        let target = TargetAddress::new(addr.ip().to_string(), addr.port());
        let conn = Connection::new(target, counter.clone(), &test_config());

        let local = LocalSet::new();
        local
            .run_until(async {
                tokio::task::spawn_local(conn.run());
                wait_for_count(&counter, 3).await;
            })
            .await;

        assert!(counter.value() >= 3);
        assert!(stats.accepts.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn non_200_responses_are_not_counted() {
        let stats = Arc::new(ServerStats::default());
        let addr = spawn_server("HTTP/1.1 404 Not Found", usize::MAX, stats.clone());
        let counter = Arc::new(RequestCounter::new());
        let target = TargetAddress::new(addr.ip().to_string(), addr.port());
        let conn = Connection::new(target, counter.clone(), &test_config());

        let local = LocalSet::new();
        local
            .run_until(async {
                tokio::task::spawn_local(conn.run());
                tokio::time::timeout(Duration::from_secs(10), async {
                    while stats.requests.load(Ordering::SeqCst) < 5 {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                    }
                })
                .await
                .expect("timed out waiting for requests");
            })
            .await;

        assert!(stats.requests.load(Ordering::SeqCst) >= 5);
        assert_eq!(0, counter.value());
    }

    #[tokio::test]
    async fn failing_connection_does_not_disturb_others() {
        let stats = Arc::new(ServerStats::default());
        let addr = spawn_server("HTTP/1.1 200 OK", usize::MAX, stats.clone());
        // bind then drop to get a port that refuses connections
        let dead_addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("local addr")
        };

        let counter = Arc::new(RequestCounter::new());
        let live = Connection::new(
            TargetAddress::new(addr.ip().to_string(), addr.port()),
            counter.clone(),
            &test_config(),
        );
        let mut dead_config = test_config();
        dead_config.reconnect = ReconnectPolicy::backoff(
            Duration::from_millis(10),
            Duration::from_millis(100),
            2.0,
            0,
        );
        let dead = Connection::new(
            TargetAddress::new(dead_addr.ip().to_string(), dead_addr.port()),
            counter.clone(),
            &dead_config,
        );

        let local = LocalSet::new();
        local
            .run_until(async {
                tokio::task::spawn_local(live.run());
                tokio::task::spawn_local(dead.run());
                wait_for_count(&counter, 5).await;
            })
            .await;

        assert!(counter.value() >= 5);
    }

    #[test]
    fn request_bytes_are_templated_with_host() {
        let counter = Arc::new(RequestCounter::new());
        let conn = Connection::new(
            TargetAddress::new("10.0.0.7", 8080),
            counter,
            &test_config(),
        );
        let request = String::from_utf8_lossy(conn.request_bytes()).into_owned();
        assert!(request.starts_with("GET /hello HTTP/1.1\r\n"));
        assert!(request.contains("Host: 10.0.0.7\r\n"));
        assert!(request.contains("Connection: keep-alive\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }
}
