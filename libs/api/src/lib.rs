use std::future::Future;
use std::pin::Pin;

mod error;
mod record;
mod types;

pub use error::{FailureKind, ParseError, ResolveError, WriteError};
pub use record::{Batch, Record};
pub use types::{ID_LENGTH, Id, Precision};

// ════════════════════════════════════════════════════════════════
//  Destination
// ════════════════════════════════════════════════════════════════

/// Разрешённая пара (организация, bucket), в которую пишутся данные.
///
/// Создаётся один раз до старта pipeline и дальше только читается.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Destination {
    pub org_id: Id,
    pub bucket_id: Id,
}

/// Фильтр поиска bucket'а. Для bucket'а и (опционально) организации
/// задаётся ровно одно из id / name, проверяется до вызова resolver'а.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketFilter {
    pub id: Option<Id>,
    pub name: Option<String>,
    pub org_id: Option<Id>,
    pub org: Option<String>,
}

/// A bucket as reported by the lookup endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub id: Id,
    pub org_id: Id,
    pub name: String,
}

impl Bucket {
    pub fn destination(&self) -> Destination {
        Destination { org_id: self.org_id, bucket_id: self.id }
    }
}

/// One outbound write: destination and precision for exactly one batch.
///
/// Address, token and TLS settings are fixed for the run and live in the
/// [`WriteService`] implementation.
#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    pub destination: Destination,
    pub precision: Precision,
    pub batch: &'a Batch,
}

// ════════════════════════════════════════════════════════════════
//  Collaborator Traits
// ════════════════════════════════════════════════════════════════

/// Write transport: одна попытка записи одного batch'а.
///
/// Реализация не делает внутренних retry, политика повторов
/// принадлежит вызывающему. Batch не изменяется.
pub trait WriteService: Send + Sync {
    fn write<'a>(
        &'a self,
        request: WriteRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<(), WriteError>> + Send + 'a>>;
}

/// Bucket lookup used to resolve a [`Destination`] before streaming starts.
pub trait BucketService: Send + Sync {
    /// Найти bucket'ы, удовлетворяющие фильтру. Пустой Vec: ничего не найдено.
    fn find_buckets(
        &self,
        filter: &BucketFilter,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Bucket>, ResolveError>> + Send + '_>>;
}
