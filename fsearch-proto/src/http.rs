//! Minimal GET-only HTTP handling: read a request head, extract `?q=`,
//! format a JSON result body.

use std::io::{self, Read, Write};

use percent_encoding::percent_decode_str;

use crate::error::ProtocolError;

const MAX_HEAD_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok,
    BadRequest,
    MethodNotAllowed,
}

impl HttpStatus {
    fn code_and_reason(self) -> (u16, &'static str) {
        match self {
            HttpStatus::Ok => (200, "OK"),
            HttpStatus::BadRequest => (400, "Bad Request"),
            HttpStatus::MethodNotAllowed => (405, "Method Not Allowed"),
        }
    }
}

pub struct HttpRequest {
    pub method: String,
    pub query_param: Option<String>,
}

/// Read bytes until `\r\n\r\n` is seen (inclusive), spinning through
/// `WouldBlock` like the binary protocol's I/O helpers.
pub fn read_head(stream: &mut impl Read) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        if let Some(pos) = find_header_terminator(&buf) {
            buf.truncate(pos);
            return Ok(buf);
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(ProtocolError::HeadTooLarge);
        }
        match stream.read(&mut chunk) {
            Ok(0) => {
                return Err(ProtocolError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before headers completed",
                )))
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::yield_now();
            }
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
}

fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

pub fn parse_request(head: &[u8]) -> Result<HttpRequest, ProtocolError> {
    let text = String::from_utf8_lossy(head);
    let request_line = text
        .split("\r\n")
        .next()
        .ok_or(ProtocolError::MalformedHttp)?;

    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or(ProtocolError::MalformedHttp)?
        .to_string();
    let target = parts.next().ok_or(ProtocolError::MalformedHttp)?;

    let query_param = target.split_once('?').and_then(|(_, qs)| {
        qs.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key != "q" {
                return None;
            }
            let with_spaces = value.replace('+', " ");
            Some(percent_decode_str(&with_spaces).decode_utf8_lossy().into_owned())
        })
    });

    Ok(HttpRequest {
        method,
        query_param,
    })
}

pub fn format_results_body(paths: &[String]) -> String {
    serde_json::json!({ "results": paths }).to_string()
}

pub fn write_response(
    stream: &mut impl Write,
    status: HttpStatus,
    body: &str,
) -> io::Result<()> {
    let (code, reason) = status.code_and_reason();
    let mut response = format!(
        "HTTP/1.1 {code} {reason}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        body.len()
    );
    response.push_str(body);
    crate::io::send_all(stream, response.as_bytes())
}
