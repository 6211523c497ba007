use std::time::Duration;

use serde::Deserialize;

use crate::PipelineError;

// ═══════════════════════════════════════════════════════════════
//  Batch Config
// ═══════════════════════════════════════════════════════════════

/// Границы batch'а. Batch закрывается при достижении любой из них.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Максимум записей в одном batch'е.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Максимальный размер batch'а в байтах. Запись больше лимита
    /// уходит отдельным oversized batch'ем, а не отбрасывается.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    /// Максимальное время жизни открытого batch'а в мс (0 = без ограничения).
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            max_bytes: default_max_bytes(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl BatchConfig {
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval_ms > 0).then(|| Duration::from_millis(self.flush_interval_ms))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_records == 0 {
            return Err(PipelineError::Config("max_records must be at least 1".into()));
        }
        if self.max_bytes == 0 {
            return Err(PipelineError::Config("max_bytes must be at least 1".into()));
        }
        Ok(())
    }
}

fn default_max_records() -> usize {
    5000
}
fn default_max_bytes() -> usize {
    500_000
}
fn default_flush_interval_ms() -> u64 {
    10_000
}

// ═══════════════════════════════════════════════════════════════
//  Retry Policy
// ═══════════════════════════════════════════════════════════════

/// Политика повтора для retryable ошибок транспорта.
///
/// `max_attempts = 1`: без повторов: ошибка только классифицируется
/// и возвращается вызывающему. Fatal ошибки не повторяются никогда.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Пауза между попытками в мс.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_attempts == 0 {
            return Err(PipelineError::Config("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

fn default_max_attempts() -> u32 {
    1
}
fn default_backoff_ms() -> u64 {
    1000
}
