use std::future::Future;
use std::pin::Pin;

use reqwest::StatusCode;
use serde::Deserialize;

use lpwrite_api::{Bucket, BucketFilter, BucketService, Id, ResolveError};

use crate::{HttpClient, error_message};

#[derive(Deserialize)]
struct BucketsResponse {
    #[serde(default)]
    buckets: Vec<BucketEntry>,
}

#[derive(Deserialize)]
struct BucketEntry {
    id: Id,
    #[serde(rename = "orgID")]
    org_id: Id,
    name: String,
}

/// Bucket lookup through `GET /api/v2/buckets`.
pub struct HttpBucketService {
    client: HttpClient,
}

impl HttpBucketService {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

impl BucketService for HttpBucketService {
    fn find_buckets(
        &self,
        filter: &BucketFilter,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Bucket>, ResolveError>> + Send + '_>> {
        let mut query: Vec<(&'static str, String)> = Vec::new();
        if let Some(id) = filter.id {
            query.push(("id", id.to_string()));
        }
        if let Some(name) = &filter.name {
            query.push(("name", name.clone()));
        }
        if let Some(org_id) = filter.org_id {
            query.push(("orgID", org_id.to_string()));
        }
        if let Some(org) = &filter.org {
            query.push(("org", org.clone()));
        }

        Box::pin(async move {
            let url = self.client.endpoint("api/v2/buckets").map_err(ResolveError::Transport)?;
            let req = self.client.http.get(url).query(&query);

            let resp = self
                .client
                .authorize(req)
                .send()
                .await
                .map_err(|e| ResolveError::Transport(e.to_string()))?;

            let status = resp.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(Vec::new());
            }
            let body = resp.text().await.map_err(|e| ResolveError::Transport(e.to_string()))?;
            if !status.is_success() {
                return Err(ResolveError::Status {
                    status: status.as_u16(),
                    message: error_message(status.as_u16(), &body),
                });
            }

            let parsed: BucketsResponse =
                serde_json::from_str(&body).map_err(|e| ResolveError::Decode(e.to_string()))?;
            Ok(parsed
                .buckets
                .into_iter()
                .map(|b| Bucket { id: b.id, org_id: b.org_id, name: b.name })
                .collect())
        })
    }
}
