use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Installation failed: {0}")]
    InstallFailed(String),

    #[error("Failed to launch gateway: {0}")]
    Launch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BootError>;
