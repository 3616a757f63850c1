use std::io::{self, BufRead, Write};
use std::net::TcpStream;

use clap::Parser;

/// Interactive client for the binary search protocol. Reads queries from
/// stdin, one per line; `exit` terminates, empty lines reprompt.
#[derive(Parser)]
#[command(name = "fsearch-client")]
struct Args {
    server_ip: String,
    port: u16,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut stream = TcpStream::connect((args.server_ip.as_str(), args.port))?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" {
            break;
        }

        fsearch_proto::write_query(&mut stream, query)?;
        for path in fsearch_proto::read_response(&mut stream)? {
            println!("{path}");
        }
    }

    // A zero-length frame tells the server this session is done.
    stream.write_all(&0u32.to_be_bytes())?;
    Ok(())
}
