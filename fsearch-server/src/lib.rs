//! Server orchestrator: owns the listen socket, runs the accept loop, and
//! fans out periodic incremental reindex work across idle pool workers.

mod socket;

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fsearch_index::Index;
use fsearch_log::fs_log;
use fsearch_pool::{Pool, TaskHandle, HANDLE_CLIENT, UPDATE_INDEX};
use fsearch_proto::{HttpStatus, Protocol};
use fsearch_store::{Store, SENTINEL};

const TAG: &str = "SERVER";
const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(5000);

/// The server orchestrator: listen socket, pool, store and index, plus the
/// bookkeeping needed to run the accept loop and periodic reindex.
pub struct Server {
    pool: Pool,
    store: Arc<Store>,
    index: Arc<Index>,
    root: PathBuf,
    listener: std::net::TcpListener,
    running: AtomicBool,
    update_interval: Duration,
    last_update: Mutex<Instant>,
    client_handles: Mutex<Vec<TaskHandle<()>>>,
    index_handles: Mutex<Vec<TaskHandle<()>>>,
}

impl Server {
    /// Bind the listen socket, create and start the worker pool.
    pub fn new(root: impl AsRef<Path>, port: u16, num_workers: Option<usize>) -> anyhow::Result<Self> {
        let pool = Pool::create(num_workers)?;
        pool.start()?;

        let listener = socket::bind_listener(port)?;
        fs_log!(
            log::Level::Info,
            TAG,
            "listening on {:?} with {} workers",
            listener.local_addr(),
            pool.num_workers()
        );

        Ok(Server {
            pool,
            store: Arc::new(Store::new()),
            index: Arc::new(Index::new()),
            root: root.as_ref().to_path_buf(),
            listener,
            running: AtomicBool::new(true),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            last_update: Mutex::new(Instant::now()),
            client_handles: Mutex::new(Vec::new()),
            index_handles: Mutex::new(Vec::new()),
        })
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop until [`Server::stop`] is called from another
    /// thread. Never blocks indefinitely: accept, GC and the reindex gate
    /// are all non-blocking or bounded.
    pub fn run(&self) {
        while self.running.load(Ordering::SeqCst) {
            self.reap_finished_handles();
            self.maybe_schedule_reindex();
            self.accept_once();
        }
    }

    /// Stop accepting, drain the pool (in-flight tasks finish, queued ones
    /// are dropped), and join every outstanding task handle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.pool.shutdown();
        self.join_all_handles();
    }

    fn reap_finished_handles(&self) {
        self.client_handles.lock().unwrap().retain(|h| !h.is_finished());
        self.index_handles.lock().unwrap().retain(|h| !h.is_finished());
    }

    fn join_all_handles(&self) {
        for handle in self.client_handles.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
        for handle in self.index_handles.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
    }

    fn maybe_schedule_reindex(&self) {
        let mut last = self.last_update.lock().unwrap();
        if last.elapsed() < self.update_interval {
            return;
        }
        let in_flight = self
            .index_handles
            .lock()
            .unwrap()
            .iter()
            .any(|h| !h.is_finished());
        if in_flight {
            return;
        }
        *last = Instant::now();
        drop(last);
        self.schedule_reindex();
    }

    fn schedule_reindex(&self) {
        let candidates = discover_new_files(&self.root, &self.store);
        if candidates.is_empty() {
            return;
        }

        let workers = self.pool.idle_count().max(1);
        let slices = split_into_slices(candidates, workers);

        let mut handles = self.index_handles.lock().unwrap();
        for slice in slices {
            if slice.is_empty() {
                continue;
            }
            let store = self.store.clone();
            let index = self.index.clone();
            match self
                .pool
                .submit(UPDATE_INDEX, move || ingest_slice(&slice, &store, &index))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => fs_log!(log::Level::Error, TAG, "failed to submit reindex task: {e}"),
            }
        }
    }

    fn accept_once(&self) {
        match self.listener.accept() {
            Ok((stream, _addr)) => self.dispatch_client(stream),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::yield_now();
            }
            Err(e) => fs_log!(log::Level::Error, TAG, "accept failed: {e}"),
        }
    }

    fn dispatch_client(&self, stream: TcpStream) {
        if let Err(e) = stream.set_nonblocking(false) {
            fs_log!(log::Level::Error, "NET", "failed to configure client socket: {e}");
            return;
        }

        let store = self.store.clone();
        let index = self.index.clone();
        match self
            .pool
            .submit(HANDLE_CLIENT, move || handle_client(stream, &store, &index))
        {
            Ok(handle) => self.client_handles.lock().unwrap().push(handle),
            Err(e) => fs_log!(log::Level::Error, TAG, "failed to submit client task: {e}"),
        }
    }
}

fn discover_new_files(root: &Path, store: &Store) -> Vec<String> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .filter(|path| !store.is_loaded_path(path))
        .collect()
}

/// Split `items` into `workers` near-equal slices; the last slice absorbs
/// whatever the floor division leaves over.
fn split_into_slices(items: Vec<String>, workers: usize) -> Vec<Vec<String>> {
    let base = items.len() / workers;
    let mut slices = Vec::with_capacity(workers);
    let mut iter = items.into_iter();
    for i in 0..workers {
        let take = if i + 1 == workers { iter.len() } else { base };
        slices.push(iter.by_ref().take(take).collect());
    }
    slices
}

fn ingest_slice(paths: &[String], store: &Store, index: &Index) {
    for path in paths {
        let id = store.load(path);
        if id == SENTINEL {
            continue;
        }
        let content = store.content(id);
        index.add(id, &content);
    }
}

fn handle_client(stream: TcpStream, store: &Store, index: &Index) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());

    if let Err(e) = serve_connection(stream, store, index) {
        fs_log!(log::Level::Error, "NET", "connection with {peer} ended: {e}");
    }
}

fn serve_connection(mut stream: TcpStream, store: &Store, index: &Index) -> anyhow::Result<()> {
    match fsearch_proto::sniff(&stream)? {
        Protocol::Binary => serve_binary(&mut stream, store, index),
        Protocol::Http => serve_http(&mut stream, store, index),
    }
}

fn serve_binary(stream: &mut TcpStream, store: &Store, index: &Index) -> anyhow::Result<()> {
    loop {
        let query = match fsearch_proto::read_request(stream)? {
            Some(query) => query,
            None => return Ok(()),
        };
        let paths = resolve_paths(index.search(&query), store);
        fsearch_proto::write_response(stream, &paths)?;
    }
}

fn serve_http(stream: &mut TcpStream, store: &Store, index: &Index) -> anyhow::Result<()> {
    let head = fsearch_proto::read_head(stream)?;
    let request = fsearch_proto::parse_request(&head)?;

    if request.method != "GET" {
        fsearch_proto::write_http_response(stream, HttpStatus::MethodNotAllowed, "")?;
        return Ok(());
    }

    let Some(query) = request.query_param else {
        fsearch_proto::write_http_response(stream, HttpStatus::BadRequest, "")?;
        return Ok(());
    };

    let paths = resolve_paths(index.search(query.as_bytes()), store);
    let body = fsearch_proto::format_results_body(&paths);
    fsearch_proto::write_http_response(stream, HttpStatus::Ok, &body)?;
    Ok(())
}

fn resolve_paths(ids: Vec<fsearch_store::FileId>, store: &Store) -> Vec<String> {
    ids.into_iter()
        .map(|id| store.path(id))
        .filter(|p| !p.is_empty())
        .collect()
}
