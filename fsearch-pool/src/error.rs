use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("pool is not running")]
    NotRunning,
    #[error("pool is already terminated")]
    AlreadyTerminated,
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(#[source] io::Error),
}
