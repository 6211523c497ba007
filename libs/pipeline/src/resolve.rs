use lpwrite_api::{BucketFilter, BucketService, Destination, Id};

use crate::PipelineError;

/// Destination as the user typed it: names and/or textual ids.
///
/// Converted into a [`BucketFilter`] before any I/O; conflicting or
/// malformed values are configuration errors.
#[derive(Debug, Clone, Default)]
pub struct DestinationSpec {
    pub bucket: Option<String>,
    pub bucket_id: Option<String>,
    pub org: Option<String>,
    pub org_id: Option<String>,
}

impl DestinationSpec {
    pub fn to_filter(&self) -> Result<BucketFilter, PipelineError> {
        let bucket = non_empty(&self.bucket);
        let bucket_id = non_empty(&self.bucket_id);
        let org = non_empty(&self.org);
        let org_id = non_empty(&self.org_id);

        if bucket.is_some() && bucket_id.is_some() {
            return Err(PipelineError::Config("please specify one of bucket or bucket-id".into()));
        }
        if bucket.is_none() && bucket_id.is_none() {
            return Err(PipelineError::Config("please specify one of bucket or bucket-id".into()));
        }
        if org.is_some() && org_id.is_some() {
            return Err(PipelineError::Config("please specify one of org or org-id".into()));
        }

        Ok(BucketFilter {
            id: bucket_id.map(|raw| decode_id("bucket-id", raw)).transpose()?,
            name: bucket.map(str::to_string),
            org_id: org_id.map(|raw| decode_id("org-id", raw)).transpose()?,
            org: org.map(str::to_string),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn decode_id(what: &str, raw: &str) -> Result<Id, PipelineError> {
    raw.parse()
        .map_err(|e| PipelineError::Config(format!("failed to decode {what}: {e}")))
}

/// Разрешить destination: ровно один вызов lookup'а.
///
/// Ноль совпадений: ошибка с именем (или id) запрошенного bucket'а.
/// При нескольких совпадениях берётся первое, как это делает store.
pub async fn resolve_destination(
    service: &dyn BucketService,
    filter: &BucketFilter,
) -> Result<Destination, PipelineError> {
    let buckets = service.find_buckets(filter).await?;
    tracing::debug!(matches = buckets.len(), ?filter, "bucket lookup finished");

    match buckets.first() {
        Some(bucket) => {
            if buckets.len() > 1 {
                tracing::warn!(matches = buckets.len(), bucket = %bucket.name, "bucket filter matched several buckets, using the first");
            }
            Ok(bucket.destination())
        }
        None => match (&filter.name, filter.id) {
            (Some(name), _) => Err(PipelineError::BucketNotFound(name.clone())),
            (None, Some(id)) => Err(PipelineError::BucketIdNotFound(id.to_string())),
            (None, None) => Err(PipelineError::Config("no bucket specified".into())),
        },
    }
}
