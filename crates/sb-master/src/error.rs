/// Failures at the controller's outer surfaces. The control core itself
/// never fails; only loading config and importing snapshots can.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Config load/parse error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Snapshot decode error: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
