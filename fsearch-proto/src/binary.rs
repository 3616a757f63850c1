//! `u32_be length | bytes[length]` request framing, `u32_be count |
//! (u32_be plen | bytes[plen]){count}` response framing.

use std::io::{self, Read, Write};

use crate::io::{recv_all, send_all, RecvOutcome};

/// Read one query frame. `Ok(None)` means the session ended gracefully
/// (peer sent a zero-length frame or closed the connection).
pub fn read_request(stream: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    if let RecvOutcome::Closed = recv_all(stream, &mut len_buf)? {
        return Ok(None);
    }
    let len = u32::from_be_bytes(len_buf);
    if len == 0 {
        return Ok(None);
    }

    let mut query = vec![0u8; len as usize];
    if let RecvOutcome::Closed = recv_all(stream, &mut query)? {
        return Ok(None);
    }
    Ok(Some(query))
}

/// Client-side counterpart of [`read_request`]: frame a query for sending.
pub fn write_query(stream: &mut impl Write, query: &str) -> io::Result<()> {
    send_all(stream, &(query.len() as u32).to_be_bytes())?;
    send_all(stream, query.as_bytes())
}

/// Client-side counterpart of [`write_response`]: read back the ranked
/// path list.
pub fn read_response(stream: &mut impl Read) -> io::Result<Vec<String>> {
    let mut count_buf = [0u8; 4];
    recv_all(stream, &mut count_buf)?;
    let count = u32::from_be_bytes(count_buf);

    let mut results = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut len_buf = [0u8; 4];
        recv_all(stream, &mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut path_buf = vec![0u8; len];
        recv_all(stream, &mut path_buf)?;
        results.push(String::from_utf8_lossy(&path_buf).into_owned());
    }
    Ok(results)
}

pub fn write_response(stream: &mut impl Write, paths: &[String]) -> io::Result<()> {
    send_all(stream, &(paths.len() as u32).to_be_bytes())?;
    for path in paths {
        let bytes = path.as_bytes();
        send_all(stream, &(bytes.len() as u32).to_be_bytes())?;
        send_all(stream, bytes)?;
    }
    Ok(())
}
