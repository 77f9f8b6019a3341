use std::fmt::Write;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, InvalidResponse, Result};
use crate::proto::http1::{connection_close, connection_keep_alive, header_has_token};
use crate::proto::ParserResult;
use crate::target::TargetAddress;

const MAX_HEADERS: usize = 100;
const MAX_CHUNK_SIZE_LINE: usize = 4096;

/// Build the fixed request issued on every cycle: a GET templated once with
/// the target host, asking the peer to keep the connection open.
pub fn build_request(target: &TargetAddress, path: &str) -> Bytes {
    let mut buf = BytesMut::new();
    buf.write_fmt(format_args!("GET {} HTTP/1.1\r\n", path))
        .expect("failed write data to buffer");
    buf.write_fmt(format_args!("Host: {}\r\n", target.host()))
        .expect("failed write data to buffer");
    buf.write_str("Content-Type: text/plain\r\n")
        .expect("failed write data to buffer");
    buf.write_str("Connection: keep-alive\r\n")
        .expect("failed write data to buffer");
    buf.write_str("\r\n").expect("failed write data to buffer");
    buf.freeze()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Status line and headers, re-parsed from the front of the buffer on
    /// every feed until complete.
    Head,
    /// Content-length body; `remaining` counts down to zero.
    FixedBody { remaining: u64 },
    /// Chunked body: at a chunk size line.
    ChunkSize,
    /// Chunked body: inside chunk data.
    ChunkData { remaining: u64 },
    /// Chunked body: at the CRLF terminating a data chunk.
    ChunkDataEnd,
    /// After the zero-size chunk: trailer lines up to the empty line.
    Trailers,
    /// Body delimited by connection close. Such a response never completes
    /// here; the owning connection's read-failure path recovers.
    UntilClose,
    Complete,
}

/// Incremental HTTP/1.1 response parser.
///
/// Bytes may arrive split across any boundaries, including mid-status-line.
/// The head is handled by `httparse`; body framing (content-length, chunked
/// with trailers, no-body statuses) is tracked on top so that a complete
/// message is recognized without buffering the whole body. Parsed bytes are
/// consumed from the front of the caller's buffer.
///
/// Call [`ResponseParser::reset`] before each new response on a reused
/// connection.
#[derive(Debug)]
pub struct ResponseParser {
    state: State,
    status: Option<u16>,
    keep_alive: bool,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: State::Head,
            status: None,
            keep_alive: false,
        }
    }

    /// Discard any partial parse state ahead of the next response.
    pub fn reset(&mut self) {
        self.state = State::Head;
        self.status = None;
        self.keep_alive = false;
    }

    /// The status code of the last parsed head, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    /// Whether the parsed response allows the connection to be reused:
    /// HTTP/1.1 unless `Connection: close`, HTTP/1.0 only with an explicit
    /// `Connection: keep-alive`. Meaningful once the head has been parsed.
    pub fn is_keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Incrementally parse bytes from the front of `buf`.
    ///
    /// Returns `Complete(status)` once per response, when the full message
    /// (status line + headers + body per HTTP/1.1 framing) has been seen.
    /// Feeding after completion reports `Complete` again without consuming;
    /// callers stop feeding and `reset()` for the next response.
    pub fn feed(&mut self, buf: &mut BytesMut) -> Result<ParserResult<u16>> {
        loop {
            match self.state {
                State::Head => {
                    if !self.parse_head(buf)? {
                        return Ok(ParserResult::Partial);
                    }
                }
                State::FixedBody { remaining } => {
                    let take = remaining.min(buf.len() as u64);
                    buf.advance(take as usize);
                    let left = remaining - take;
                    if left > 0 {
                        self.state = State::FixedBody { remaining: left };
                        return Ok(ParserResult::Partial);
                    }
                    self.state = State::Complete;
                }
                State::ChunkSize => match find_crlf(buf.as_ref()) {
                    Some(line_len) => {
                        let size = parse_chunk_size(&buf.as_ref()[..line_len])?;
                        buf.advance(line_len + 2);
                        self.state = if size == 0 {
                            State::Trailers
                        } else {
                            State::ChunkData { remaining: size }
                        };
                    }
                    None => {
                        if buf.len() > MAX_CHUNK_SIZE_LINE {
                            return Err(Error::from(InvalidResponse::new(
                                "chunk size line too long",
                            )));
                        }
                        return Ok(ParserResult::Partial);
                    }
                },
                State::ChunkData { remaining } => {
                    let take = remaining.min(buf.len() as u64);
                    buf.advance(take as usize);
                    let left = remaining - take;
                    if left > 0 {
                        self.state = State::ChunkData { remaining: left };
                        return Ok(ParserResult::Partial);
                    }
                    self.state = State::ChunkDataEnd;
                }
                State::ChunkDataEnd => {
                    if buf.len() < 2 {
                        return Ok(ParserResult::Partial);
                    }
                    if &buf.as_ref()[..2] != b"\r\n" {
                        return Err(Error::from(InvalidResponse::new(
                            "chunk data not terminated by CRLF",
                        )));
                    }
                    buf.advance(2);
                    self.state = State::ChunkSize;
                }
                State::Trailers => match find_crlf(buf.as_ref()) {
                    Some(0) => {
                        buf.advance(2);
                        self.state = State::Complete;
                    }
                    Some(line_len) => {
                        // trailer header, ignored
                        buf.advance(line_len + 2);
                    }
                    None => return Ok(ParserResult::Partial),
                },
                State::UntilClose => {
                    buf.clear();
                    return Ok(ParserResult::Partial);
                }
                State::Complete => {
                    return Ok(ParserResult::Complete(self.status.unwrap_or(0)));
                }
            }
        }
    }

    /// Parse the head from the front of `buf`. Returns false while the head
    /// is still incomplete.
    fn parse_head(&mut self, buf: &mut BytesMut) -> Result<bool> {
        let (len, status, keep_alive, framing) = {
            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
            let mut resp = httparse::Response::new(&mut headers);

            let len = match resp.parse(buf.as_ref())? {
                httparse::Status::Complete(len) => len,
                httparse::Status::Partial => return Ok(false),
            };
            let status = resp.code.unwrap_or(0);
            let mut keep_alive = resp.version.unwrap_or(1) == 1;

            let mut content_length: Option<u64> = None;
            let mut chunked = false;
            for header in resp.headers.iter() {
                if header.name.eq_ignore_ascii_case("transfer-encoding") {
                    chunked = header_has_token(header.value, "chunked");
                } else if header.name.eq_ignore_ascii_case("content-length") {
                    let text = std::str::from_utf8(header.value)
                        .map_err(|_| Error::from(InvalidResponse::new("content-length is not ascii")))?;
                    content_length = Some(text.trim().parse::<u64>()?);
                } else if header.name.eq_ignore_ascii_case("connection") {
                    if keep_alive {
                        keep_alive = !connection_close(header.value);
                    } else {
                        keep_alive = connection_keep_alive(header.value);
                    }
                }
            }

            let framing = if status < 200 || status == 204 || status == 304 {
                State::Complete
            } else if chunked {
                State::ChunkSize
            } else {
                match content_length {
                    Some(0) => State::Complete,
                    Some(n) => State::FixedBody { remaining: n },
                    None => State::UntilClose,
                }
            };
            (len, status, keep_alive, framing)
        };

        buf.advance(len);
        self.status = Some(status);
        self.keep_alive = keep_alive;
        self.state = framing;
        Ok(true)
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|window| window == b"\r\n")
}

/// Hex chunk size, stopping at an optional `;extension`.
fn parse_chunk_size(line: &[u8]) -> Result<u64> {
    let mut size: u64 = 0;
    let mut digits = 0;
    for &b in line {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            b';' | b' ' | b'\t' => break,
            _ => return Err(Error::from(InvalidResponse::new("bad chunk size line"))),
        };
        digits += 1;
        if digits > 16 {
            return Err(Error::from(InvalidResponse::new("chunk size overflow")));
        }
        size = (size << 4) | u64::from(digit);
    }
    if digits == 0 {
        return Err(Error::from(InvalidResponse::new("empty chunk size line")));
    }
    Ok(size)
}
