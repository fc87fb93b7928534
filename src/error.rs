use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagError {
    #[error("could not resolve '{host}': {reason}")]
    Resolution { host: String, reason: String },
    #[error("'{tool}' command not found. Please ensure it is installed and in your system's PATH")]
    ToolMissing { tool: String },
    #[error("invalid port list: {0}")]
    InvalidPort(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagError {
    /// Map a spawn failure to `ToolMissing` when the binary is absent.
    pub fn from_spawn(tool: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            DiagError::ToolMissing {
                tool: tool.to_string(),
            }
        } else {
            DiagError::Io(err)
        }
    }
}
