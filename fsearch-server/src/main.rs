use std::path::PathBuf;

use clap::Parser;

/// Concurrent full-text file search server.
#[derive(Parser)]
#[command(name = "fsearch-server")]
struct Args {
    /// Directory tree to index and serve search results from.
    files_directory: PathBuf,
    /// TCP port to listen on.
    port: u16,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    fsearch_log::init(log::LevelFilter::Info);

    let server = fsearch_server::Server::new(&args.files_directory, args.port, None)?;
    server.run();
    Ok(())
}
