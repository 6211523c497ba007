use std::io::Cursor;
use std::path::PathBuf;

use tokio::io::AsyncRead;

use crate::error::CliError;

pub type Input = Box<dyn AsyncRead + Send + Unpin>;

/// Откуда читать line protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// `-`
    Stdin,
    /// `@path`
    File(PathBuf),
    /// Anything else is the data itself.
    Inline(String),
}

impl InputSource {
    pub fn parse(arg: &str) -> Self {
        if arg == "-" {
            InputSource::Stdin
        } else if let Some(path) = arg.strip_prefix('@') {
            InputSource::File(PathBuf::from(path))
        } else {
            InputSource::Inline(arg.to_string())
        }
    }

    pub async fn open(&self) -> Result<Input, CliError> {
        match self {
            InputSource::Stdin => Ok(Box::new(tokio::io::stdin())),
            InputSource::File(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|source| CliError::Open {
                    path: path.display().to_string(),
                    source,
                })?;
                tracing::debug!(path = %path.display(), "reading input file");
                Ok(Box::new(file))
            }
            InputSource::Inline(text) => Ok(Box::new(Cursor::new(text.clone().into_bytes()))),
        }
    }
}
