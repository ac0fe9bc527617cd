//! End-to-end tests for the HTTP transport and deadline executor against a
//! local stub server.

use phloem_core::config::{HttpConfig, HttpHeader};
use phloem_core::{DeadlineExecutor, HttpTransport, RequestOutcome, Transport};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

const MARKER: &str = "\"errors\":[{";

/// Spawn a one-shot stub server; returns its address.
///
/// The server accepts a single connection, reads until the end of the
/// chunked request body, optionally dawdles, then writes `response` and
/// closes.
fn stub_server(response: &'static str, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
    let addr = listener.local_addr().expect("stub server addr");

    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let mut seen = Vec::new();
            // Request bodies are single-chunk uploads terminated by the
            // zero chunk
            while let Ok(n) = stream.read(&mut buf) {
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
                if seen.windows(5).any(|w| w == b"0\r\n\r\n") {
                    break;
                }
            }
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            let _ = stream.write_all(response.as_bytes());
        }
    });

    addr.to_string()
}

fn http_config(address: String, exec_timeout: Duration) -> HttpConfig {
    HttpConfig {
        address,
        path: "/graphql/".to_string(),
        connect_timeout: Duration::from_secs(5),
        read_timeout: Duration::from_secs(5),
        exec_timeout,
        headers: vec![HttpHeader {
            name: "Content-Type".to_string(),
            value: "application/json".to_string(),
        }],
    }
}

fn executor_for(cfg: &HttpConfig) -> DeadlineExecutor<HttpTransport> {
    DeadlineExecutor::new(HttpTransport::new(cfg), cfg.exec_timeout, MARKER)
}

#[test]
fn test_ok_response() {
    let body = "{\"data\":{\"User\":{\"firstName\":\"A\"}}}";
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let addr = stub_server(Box::leak(response.into_boxed_str()), Duration::ZERO);
    let cfg = http_config(addr, Duration::from_secs(5));

    assert_eq!(executor_for(&cfg).execute("query{User(id: \"user1\"){firstName}}"), RequestOutcome::Ok);
}

#[test]
fn test_service_unavailable() {
    let addr = stub_server(
        "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\n\r\n",
        Duration::ZERO,
    );
    let cfg = http_config(addr, Duration::from_secs(5));

    assert_eq!(executor_for(&cfg).execute("query{}"), RequestOutcome::ServiceUnavailable);
}

#[test]
fn test_embedded_error_in_200() {
    let body = "{\"data\":null,\"errors\":[{\"message\":\"Unknown field\"}]}";
    let response = format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}", body.len(), body);
    let addr = stub_server(Box::leak(response.into_boxed_str()), Duration::ZERO);
    let cfg = http_config(addr, Duration::from_secs(5));

    assert_eq!(executor_for(&cfg).execute("query{broken}"), RequestOutcome::Error);
}

#[test]
fn test_chunked_response_decodes() {
    let response = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                    10\r\n{\"data\":{\"x\":1}}\r\n0\r\n\r\n";
    let addr = stub_server(response, Duration::ZERO);
    let cfg = http_config(addr, Duration::from_secs(5));

    let transport = HttpTransport::new(&cfg);
    let mut response = transport.execute(b"{\"query\":\"query{x}\"}").expect("request should succeed");
    assert_eq!(response.status, 200);
    let mut body = String::new();
    response.body.read_to_string(&mut body).expect("body should decode");
    assert_eq!(body, "{\"data\":{\"x\":1}}");
}

#[test]
fn test_slow_server_times_out() {
    let addr = stub_server(
        "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}",
        Duration::from_millis(800),
    );
    let mut cfg = http_config(addr, Duration::from_millis(150));
    cfg.read_timeout = Duration::from_secs(5);

    let start = std::time::Instant::now();
    assert_eq!(executor_for(&cfg).execute("query{}"), RequestOutcome::Timeout);
    assert!(
        start.elapsed() < Duration::from_secs(5),
        "executor must not wait for the full server delay"
    );
}

#[test]
fn test_connection_refused_is_error() {
    // Grab a port and release it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let cfg = http_config(addr, Duration::from_secs(2));
    assert_eq!(executor_for(&cfg).execute("query{}"), RequestOutcome::Error);
}
