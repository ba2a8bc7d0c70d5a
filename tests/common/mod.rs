//! Shared utilities for intake integration tests.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use cot_intake::config::ReceiveConfig;

/// Receive constants short enough to keep failure paths fast.
pub fn fast_receive() -> ReceiveConfig {
    ReceiveConfig {
        first_byte_timeout_ms: 200,
        post_probe_timeout_ms: 100,
        receive_deadline_ms: 400,
        ..ReceiveConfig::default()
    }
}

/// A loopback listener on an ephemeral port.
pub fn listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// How a scripted client behaves after writing.
#[derive(Debug, Clone, Copy)]
pub enum After {
    /// Half-close the write side; keep reading.
    CloseWrite,
    /// Stay connected with nothing more to send.
    Idle,
}

/// Connect to `addr`, write `bytes` in a single write, then act per `after`.
///
/// The returned stream stays open for inspection by the test.
pub fn send(addr: SocketAddr, bytes: &[u8], after: After) -> TcpStream {
    let mut stream = TcpStream::connect(addr).unwrap();
    if !bytes.is_empty() {
        stream.write_all(bytes).unwrap();
    }
    if let After::CloseWrite = after {
        stream.shutdown(Shutdown::Write).unwrap();
    }
    stream
}

/// Connect from a background thread so the test thread can block in accept.
pub fn send_in_background(addr: SocketAddr, bytes: &'static [u8], after: After) -> thread::JoinHandle<TcpStream> {
    thread::spawn(move || send(addr, bytes, after))
}

/// Whether the server side of `client` has been closed.
pub fn server_closed(client: &mut TcpStream) -> bool {
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let mut buf = [0u8; 16];
    match client.read(&mut buf) {
        Ok(0) => true,
        Ok(_) => false,
        Err(e) => e.kind() == std::io::ErrorKind::ConnectionReset,
    }
}
