//! Full-read/full-write helpers that spin through `WouldBlock` on a
//! non-blocking stream, yielding the thread between attempts, and treat a
//! zero-byte read as an orderly peer shutdown.

use std::io::{self, Read, Write};

pub enum RecvOutcome {
    Complete,
    Closed,
}

pub fn recv_all(stream: &mut impl Read, buf: &mut [u8]) -> io::Result<RecvOutcome> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                buf[filled..].fill(0);
                return Ok(RecvOutcome::Closed);
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::yield_now();
            }
            Err(e) => return Err(e),
        }
    }
    Ok(RecvOutcome::Complete)
}

pub fn send_all(stream: &mut impl Write, buf: &[u8]) -> io::Result<()> {
    let mut sent = 0;
    while sent < buf.len() {
        match stream.write(&buf[sent..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "peer closed connection during send",
                ))
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::yield_now();
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
