use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use fsearch_server::Server;

fn spawn_server(root: &std::path::Path) -> (std::sync::Arc<Server>, std::thread::JoinHandle<()>) {
    let server = std::sync::Arc::new(
        Server::new(root, 0, Some(2))
            .unwrap()
            .with_update_interval(Duration::from_millis(20)),
    );
    let run_server = server.clone();
    let join = std::thread::spawn(move || run_server.run());
    // give the reindex loop a couple of intervals to ingest the fixtures
    std::thread::sleep(Duration::from_millis(200));
    (server, join)
}

fn binary_query(addr: std::net::SocketAddr, query: &str) -> Vec<String> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(&(query.len() as u32).to_be_bytes()).unwrap();
    stream.write_all(query.as_bytes()).unwrap();
    stream.write_all(&0u32.to_be_bytes()).unwrap(); // terminate session

    let mut count_buf = [0u8; 4];
    stream.read_exact(&mut count_buf).unwrap();
    let count = u32::from_be_bytes(count_buf);

    let mut results = Vec::new();
    for _ in 0..count {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut path_buf = vec![0u8; len];
        stream.read_exact(&mut path_buf).unwrap();
        results.push(String::from_utf8(path_buf).unwrap());
    }
    results
}

fn http_query(addr: std::net::SocketAddr, path_and_query: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    let request = format!("GET {path_and_query} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(request.as_bytes()).unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    let text = String::from_utf8_lossy(&response);
    let mut parts = text.splitn(2, "\r\n\r\n");
    let head = parts.next().unwrap();
    let body = parts.next().unwrap_or("").to_string();
    let code: u16 = head
        .lines()
        .next()
        .unwrap()
        .split_whitespace()
        .nth(1)
        .unwrap()
        .parse()
        .unwrap();
    (code, body)
}

#[test]
fn binary_protocol_basic_and_ranking() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "hello world").unwrap();
    std::fs::write(dir.path().join("b.txt"), "hello there").unwrap();

    let (server, join) = spawn_server(dir.path());
    let addr = server.local_addr().unwrap();

    let mut hits = binary_query(addr, "hello");
    hits.sort();
    assert_eq!(hits.len(), 2);

    let ranked = binary_query(addr, "hello world");
    assert!(ranked[0].ends_with("a.txt"));

    server.stop();
    join.join().unwrap();
}

#[test]
fn binary_protocol_zero_length_frame_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let (server, join) = spawn_server(dir.path());
    let addr = server.local_addr().unwrap();

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(&0u32.to_be_bytes()).unwrap();
    let mut buf = [0u8; 1];
    let n = stream.read(&mut buf).unwrap();
    assert_eq!(n, 0);

    server.stop();
    join.join().unwrap();
}

#[test]
fn http_basic_query_and_normalization() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("c.txt"), "Hello, World!").unwrap();

    let (server, join) = spawn_server(dir.path());
    let addr = server.local_addr().unwrap();

    let (code, body) = http_query(addr, "/search?q=hello");
    assert_eq!(code, 200);
    assert!(body.contains("c.txt"));

    server.stop();
    join.join().unwrap();
}

#[test]
fn http_missing_query_param_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (server, join) = spawn_server(dir.path());
    let addr = server.local_addr().unwrap();

    let (code, _) = http_query(addr, "/search");
    assert_eq!(code, 400);

    server.stop();
    join.join().unwrap();
}

#[test]
fn http_non_get_method_is_method_not_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let (server, join) = spawn_server(dir.path());
    let addr = server.local_addr().unwrap();

    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .write_all(b"POST /search?q=x HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    let text = String::from_utf8_lossy(&response);
    assert!(text.starts_with("HTTP/1.1 405"));

    server.stop();
    join.join().unwrap();
}
