//! Blocking HTTP/1.1 transport over TcpStream
//!
//! The executor needs to drain response bodies incrementally so the
//! watchdog flag can be checked between reads; a raw socket plus httparse
//! keeps the body reader under our control and makes resource release a
//! plain `Drop`. Requests are uploaded as a single chunk; responses are
//! framed by Content-Length, chunked transfer coding, or connection close.

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const HEADER_READ_LIMIT: usize = 64 * 1024;

/// One response: status code plus an incremental body reader.
///
/// Dropping the response (or its reader) releases the underlying
/// connection.
pub struct HttpResponse {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

/// Transport collaborator: executes one request payload and hands back the
/// status code and a body stream.
pub trait Transport: Send {
    fn execute(&self, payload: &[u8]) -> Result<HttpResponse>;
}

/// HTTP POST transport with connect/read deadlines on the socket.
///
/// A fresh connection is opened per request; the benchmark's reliability
/// invariant is per-attempt resource release, not connection reuse.
pub struct HttpTransport {
    address: String,
    path: String,
    headers: Vec<(String, String)>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpTransport {
    pub fn new(cfg: &HttpConfig) -> Self {
        Self {
            address: cfg.address.clone(),
            path: cfg.path.clone(),
            headers: cfg.headers.iter().map(|h| (h.name.clone(), h.value.clone())).collect(),
            connect_timeout: cfg.connect_timeout,
            read_timeout: cfg.read_timeout,
        }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, payload: &[u8]) -> Result<HttpResponse> {
        let addr = self
            .address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Transport(format!("cannot resolve {}", self.address)))?;

        let mut stream = TcpStream::connect_timeout(&addr, self.connect_timeout)?;
        stream.set_read_timeout(Some(self.read_timeout))?;
        stream.set_write_timeout(Some(self.read_timeout))?;

        let mut head = format!(
            "POST {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nTransfer-Encoding: chunked\r\n",
            self.path, self.address
        );
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        stream.write_all(head.as_bytes())?;
        // Single-chunk upload
        stream.write_all(format!("{:x}\r\n", payload.len()).as_bytes())?;
        stream.write_all(payload)?;
        stream.write_all(b"\r\n0\r\n\r\n")?;
        stream.flush()?;

        let mut buf = Vec::with_capacity(4096);
        let mut chunk = [0u8; 4096];
        let (status, header_len, framing) = loop {
            match stream.read(&mut chunk)? {
                0 => {
                    return Err(Error::Transport(
                        "connection closed before response headers".to_string(),
                    ))
                }
                n => buf.extend_from_slice(&chunk[..n]),
            }
            if let Some(parsed) = parse_head(&buf)? {
                break parsed;
            }
            if buf.len() > HEADER_READ_LIMIT {
                return Err(Error::Transport("response headers too large".to_string()));
            }
        };

        let leftover = buf.split_off(header_len);
        let inner: Box<dyn Read + Send> = Box::new(io::Cursor::new(leftover).chain(stream));
        Ok(HttpResponse { status, body: Box::new(BodyReader::new(inner, framing)) })
    }
}

/// Parse response headers; `None` means more bytes are needed.
fn parse_head(buf: &[u8]) -> Result<Option<(u16, usize, BodyFraming)>> {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut response = httparse::Response::new(&mut headers);
    match response.parse(buf) {
        Ok(httparse::Status::Complete(header_len)) => {
            let status = response.code.unwrap_or(0);
            let mut content_length = None;
            let mut chunked = false;
            for header in response.headers.iter() {
                if header.name.eq_ignore_ascii_case("content-length") {
                    content_length = std::str::from_utf8(header.value)
                        .ok()
                        .and_then(|v| v.trim().parse::<u64>().ok());
                } else if header.name.eq_ignore_ascii_case("transfer-encoding") {
                    chunked = std::str::from_utf8(header.value)
                        .map(|v| v.to_ascii_lowercase().contains("chunked"))
                        .unwrap_or(false);
                }
            }
            let framing = if chunked {
                BodyFraming::Chunked
            } else if let Some(n) = content_length {
                BodyFraming::ContentLength(n)
            } else {
                BodyFraming::Eof
            };
            Ok(Some((status, header_len, framing)))
        }
        Ok(httparse::Status::Partial) => Ok(None),
        Err(e) => Err(Error::Transport(format!("invalid HTTP response: {e}"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFraming {
    ContentLength(u64),
    Chunked,
    Eof,
}

/// Incremental body reader over the raw stream, decoding the negotiated
/// framing. EOF from the reader means the body is fully drained.
struct BodyReader {
    inner: Box<dyn Read + Send>,
    framing: BodyFraming,
    chunk_remaining: u64,
    first_chunk: bool,
    done: bool,
}

impl BodyReader {
    fn new(inner: Box<dyn Read + Send>, framing: BodyFraming) -> Self {
        Self { inner, framing, chunk_remaining: 0, first_chunk: true, done: false }
    }

    /// Read one CRLF-terminated line byte-by-byte (chunk headers only; the
    /// data itself is read in bulk).
    fn read_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte)? {
                0 => break,
                _ => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    if byte[0] != b'\r' {
                        line.push(byte[0]);
                    }
                    if line.len() > 128 {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "chunk size line too long",
                        ));
                    }
                }
            }
        }
        String::from_utf8(line)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "non-UTF8 chunk size line"))
    }

    fn next_chunk(&mut self) -> io::Result<()> {
        if !self.first_chunk {
            // Consume the CRLF trailing the previous chunk's data
            self.read_line()?;
        }
        self.first_chunk = false;
        let line = self.read_line()?;
        let size_text = line.split(';').next().unwrap_or("").trim();
        let size = u64::from_str_radix(size_text, 16).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, format!("bad chunk size {size_text:?}"))
        })?;
        if size == 0 {
            // Terminal chunk; trailers (if any) are irrelevant to us
            self.done = true;
        }
        self.chunk_remaining = size;
        Ok(())
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        match self.framing {
            BodyFraming::Eof => {
                let n = self.inner.read(buf)?;
                if n == 0 {
                    self.done = true;
                }
                Ok(n)
            }
            BodyFraming::ContentLength(total) => {
                // chunk_remaining doubles as bytes-consumed bookkeeping
                let remaining = total - self.chunk_remaining;
                if remaining == 0 {
                    self.done = true;
                    return Ok(0);
                }
                let want = buf.len().min(remaining as usize);
                let n = self.inner.read(&mut buf[..want])?;
                if n == 0 {
                    // Server closed early; report a clean EOF
                    self.done = true;
                }
                self.chunk_remaining += n as u64;
                Ok(n)
            }
            BodyFraming::Chunked => {
                while self.chunk_remaining == 0 {
                    self.next_chunk()?;
                    if self.done {
                        return Ok(0);
                    }
                }
                let want = buf.len().min(self.chunk_remaining as usize);
                let n = self.inner.read(&mut buf[..want])?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed mid-chunk",
                    ));
                }
                self.chunk_remaining -= n as u64;
                Ok(n)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn boxed(data: &[u8]) -> Box<dyn Read + Send> {
        Box::new(Cursor::new(data.to_vec()))
    }

    fn drain(reader: &mut impl Read) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_body_reader_content_length() {
        let mut reader =
            BodyReader::new(boxed(b"hello worldTRAILING"), BodyFraming::ContentLength(11));
        assert_eq!(drain(&mut reader), b"hello world");
    }

    #[test]
    fn test_body_reader_eof() {
        let mut reader = BodyReader::new(boxed(b"whole stream"), BodyFraming::Eof);
        assert_eq!(drain(&mut reader), b"whole stream");
    }

    #[test]
    fn test_body_reader_chunked() {
        let raw = b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n";
        let mut reader = BodyReader::new(boxed(raw), BodyFraming::Chunked);
        assert_eq!(drain(&mut reader), b"hello, world");
    }

    #[test]
    fn test_body_reader_chunked_with_extension() {
        let raw = b"4;name=value\r\nabcd\r\n0\r\n\r\n";
        let mut reader = BodyReader::new(boxed(raw), BodyFraming::Chunked);
        assert_eq!(drain(&mut reader), b"abcd");
    }

    #[test]
    fn test_body_reader_chunked_truncated_is_error() {
        let raw = b"a\r\nhel";
        let mut reader = BodyReader::new(boxed(raw), BodyFraming::Chunked);
        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
    }

    #[test]
    fn test_parse_head_complete() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        let (status, header_len, framing) = parse_head(raw).unwrap().expect("should be complete");
        assert_eq!(status, 200);
        assert_eq!(&raw[header_len..], b"{}");
        assert_eq!(framing, BodyFraming::ContentLength(2));
    }

    #[test]
    fn test_parse_head_chunked_wins_over_length() {
        let raw =
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n";
        let (_, _, framing) = parse_head(raw).unwrap().unwrap();
        assert_eq!(framing, BodyFraming::Chunked);
    }

    #[test]
    fn test_parse_head_partial() {
        assert!(parse_head(b"HTTP/1.1 200 OK\r\nContent-Le").unwrap().is_none());
    }

    #[test]
    fn test_parse_head_garbage_is_error() {
        assert!(parse_head(b"\0\0\0not http at all\r\n\r\n").is_err());
    }
}
