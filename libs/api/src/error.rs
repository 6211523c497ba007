/// Category of a write failure. Lets the pipeline decide whether a batch
/// may be attempted again or the whole run has to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transient network or server-side condition (5xx, 408, 429, connect/timeout).
    Retryable,
    /// Client error (bad precision, unauthorized, unknown destination); not safe to retry.
    Fatal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Retryable => f.write_str("retryable"),
            FailureKind::Fatal => f.write_str("fatal"),
        }
    }
}

/// Ошибка одной попытки записи batch'а.
///
/// Несёт `FailureKind` для классификации, HTTP статус (если ответ был
/// получен) и человекочитаемое сообщение.
#[derive(Clone)]
pub struct WriteError {
    kind: FailureKind,
    status: Option<u16>,
    message: String,
}

impl WriteError {
    /// Transient failure: the same batch may be sent again.
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self { kind: FailureKind::Retryable, status: None, message: msg.into() }
    }

    /// Permanent failure: the run must stop.
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self { kind: FailureKind::Fatal, status: None, message: msg.into() }
    }

    /// Attach the HTTP status the store answered with.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == FailureKind::Retryable
    }
}

impl std::fmt::Debug for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{} {}] {}", self.kind, status, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

impl std::fmt::Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WriteError {}

/// Ошибка поиска bucket'а (транспорт или декодирование ответа).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("decode: {0}")]
    Decode(String),
}

/// Parse failures for the textual configuration values (precision, ids).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid precision {0:?} (expected one of ns, us, ms, s)")]
    Precision(String),

    #[error("id must be {expected} hex characters, got {actual}")]
    IdLength { expected: usize, actual: usize },

    #[error("id contains non-hex character {0:?}")]
    IdCharacter(char),

    #[error("id must not be zero")]
    IdZero,
}
