/// Errors that can occur while handing frames to a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The other end of the transport has gone away.
    #[error("transport closed")]
    Closed,

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink refused the frame (e.g. a host callback returned failure).
    #[error("transport rejected frame: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
