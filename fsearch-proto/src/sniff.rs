//! Auto-detect HTTP vs. the binary framing by peeking the connection's
//! leading bytes without consuming them.

use std::io;
use std::net::TcpStream;
use std::time::Duration;

const PEEK_SIZE: usize = 1024;

const HTTP_METHOD_TOKENS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "HEAD", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Binary,
}

fn longest_token_len() -> usize {
    HTTP_METHOD_TOKENS.iter().map(|t| t.len()).max().unwrap()
}

fn classify(prefix: &[u8]) -> Protocol {
    let is_http = HTTP_METHOD_TOKENS
        .iter()
        .any(|token| prefix.starts_with(token.as_bytes()));
    if is_http {
        Protocol::Http
    } else {
        Protocol::Binary
    }
}

/// A peek length that hasn't grown across this many consecutive attempts is
/// treated as stalled: nothing more is coming for now, so the decision is
/// made with whatever prefix is available. Bridges the gap between two
/// legitimate segments of the same request arriving a few milliseconds
/// apart, without waiting forever on a connection that only ever sends a
/// short binary frame.
const STALL_ATTEMPTS: u32 = 50;

/// Peek until either enough bytes have arrived to decide unambiguously
/// (`longest_token_len()`, the length of "OPTIONS"/"CONNECT") or the peek
/// length stops growing across [`STALL_ATTEMPTS`] attempts, meaning no more
/// data is coming for now and the decision has to be made with what's there.
pub fn sniff(stream: &TcpStream) -> io::Result<Protocol> {
    let needed = longest_token_len();
    let mut buf = [0u8; PEEK_SIZE];
    let mut previous_len = 0usize;
    let mut unchanged = 0u32;
    loop {
        match stream.peek(&mut buf) {
            Ok(n) if n >= needed => return Ok(classify(&buf[..n])),
            Ok(n) => {
                if n == previous_len {
                    unchanged += 1;
                    if unchanged >= STALL_ATTEMPTS {
                        return Ok(classify(&buf[..n]));
                    }
                } else {
                    previous_len = n;
                    unchanged = 0;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::yield_now();
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn detects_http_prefix() {
        let (mut client, server) = connected_pair();
        client.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        client.flush().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(sniff(&server).unwrap(), Protocol::Http);
    }

    #[test]
    fn detects_binary_prefix() {
        let (mut client, server) = connected_pair();
        client.write_all(&10u32.to_be_bytes()).unwrap();
        client.flush().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(sniff(&server).unwrap(), Protocol::Binary);
    }

    #[test]
    fn detects_http_prefix_split_across_segments() {
        let (mut client, server) = connected_pair();
        // "GET" arrives one byte at a time, simulating a request line split
        // across multiple TCP segments; a naive single-peek sniff would see
        // only "G" and misclassify this as binary.
        let thread = std::thread::spawn(move || {
            for byte in b"GET / HTTP/1.1\r\n\r\n" {
                client.write_all(&[*byte]).unwrap();
                client.flush().unwrap();
                std::thread::sleep(Duration::from_millis(2));
            }
        });
        assert_eq!(sniff(&server).unwrap(), Protocol::Http);
        thread.join().unwrap();
    }
}
