#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed HTTP request")]
    MalformedHttp,
    #[error("HTTP request is missing the 'q' query parameter")]
    MissingQueryParam,
    #[error("HTTP request headers exceeded the maximum allowed size")]
    HeadTooLarge,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
