/// Error taxonomy for the Control and Log Pipes boundary (§7's
/// *Transport*-adjacent failures that are specific to FIFO setup).
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("failed to create fifo at {path}: {source}")]
    Create { path: std::path::PathBuf, #[source] source: std::io::Error },

    #[error("failed to open fifo at {path}: {source}")]
    Open { path: std::path::PathBuf, #[source] source: std::io::Error },
}
