use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use lpwrite_api::WriteService;
use lpwrite_http::{HttpBucketService, HttpClient, HttpWriteService};
use lpwrite_pipeline::{BatchWriter, WriteSummary};

use crate::config::{Effective, GlobalArgs, WriteArgs};
use crate::error::CliError;
use crate::signal;

pub async fn run(global: &GlobalArgs, args: &WriteArgs) -> Result<(), CliError> {
    // --- Config: всё проверяется до первого сетевого вызова ---
    let eff = Effective::new(global, args)?;
    tracing::debug!(host = %eff.connection.host, precision = %eff.precision, "effective config");

    let client = HttpClient::new(&eff.connection)?;
    let buckets = HttpBucketService::new(client.clone());
    let service: Arc<dyn WriteService> = Arc::new(HttpWriteService::new(client));
    let writer = BatchWriter::new(service, eff.precision, eff.batch.clone(), eff.retry.clone())?;

    // --- CancellationToken, привязанный к сигналам процесса ---
    let token = CancellationToken::new();
    let listener = signal::cancel_on_signal(token.clone())?;

    // --- Resolve → open input → stream ---
    // listener нужно дождаться и при ошибке, поэтому шаги собраны в один блок
    let result: Result<WriteSummary, CliError> = async {
        let Some(destination) = writer.resolve(&buckets, &eff.filter, &token).await? else {
            return Ok(WriteSummary { cancelled: true, ..WriteSummary::default() });
        };
        tracing::info!(org_id = %destination.org_id, bucket_id = %destination.bucket_id, "destination resolved");

        let source = eff.input.open().await?;
        Ok(writer.write(destination, source, token.clone()).await?)
    }
    .await;

    token.cancel();
    if let Err(e) = listener.await {
        tracing::debug!(error = %e, "signal listener ended abnormally");
    }

    let summary = result?;
    if summary.cancelled {
        tracing::info!(batches = summary.batches, records = summary.records, "write interrupted");
    }
    Ok(())
}
