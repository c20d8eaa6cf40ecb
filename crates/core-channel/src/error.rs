/// Error taxonomy for the I/O Channel boundary (§7's *Transport* kind, the
/// part of it that is a caller-distinguishable failure rather than a
/// degrade-to-empty-response timeout).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to spawn debugger child process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to write to debugger stdin: {0}")]
    Write(#[source] std::io::Error),

    #[error("channel is closed")]
    Closed,

    #[error("receive buffer exceeded {limit} bytes without a prompt sentinel")]
    BufferOverflow { limit: usize },
}
