/// Error taxonomy for the Automation Hook boundary (§4.8).
#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    #[error("failed to parse automation script: {0}")]
    InvalidScript(#[from] serde_json::Error),
}
