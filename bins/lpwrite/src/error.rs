#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("failed to open {path:?}: {source}")]
    Open { path: String, source: std::io::Error },

    #[error("{0}")]
    Client(#[from] lpwrite_http::ClientError),

    #[error("{0}")]
    Pipeline(#[from] lpwrite_pipeline::PipelineError),

    #[error("signal: {0}")]
    Signal(std::io::Error),

    #[error("runtime: {0}")]
    Runtime(std::io::Error),
}

impl From<lpwrite_api::ParseError> for CliError {
    fn from(e: lpwrite_api::ParseError) -> Self {
        CliError::Config(e.to_string())
    }
}
