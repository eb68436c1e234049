use remap_api::error::MapError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("mapping error: {0}")]
    Map(#[from] MapError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Config` and `Input`, context is prepended to the message. Other
    /// variants keep their source error and are returned unchanged.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            EngineError::Input(msg) => EngineError::Input(format!("{ctx}: {msg}")),
            other => other,
        }
    }
}
