use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use lpwrite_api::{
    Batch, BucketFilter, BucketService, Destination, Precision, WriteError, WriteRequest,
    WriteService,
};

use crate::PipelineError;
use crate::batch::BatchBuilder;
use crate::config::{BatchConfig, RetryPolicy};
use crate::resolve::resolve_destination;
use crate::segment::RecordReader;

// ═══════════════════════════════════════════════════════════════
//  State
// ═══════════════════════════════════════════════════════════════

/// Фаза state machine координатора.
///
/// `Idle → Resolving → Streaming → Draining → Terminated`; из любой фазы
/// возможен переход сразу в `Terminated` (ошибка или отмена).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Streaming,
    Draining,
    Terminated,
}

/// What the store accepted during a run.
///
/// Returned on success and on cancellation, and embedded in the
/// streaming errors so a caller can tell whether zero or some batches
/// were already written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub batches: u64,
    pub records: u64,
    pub bytes: u64,
    /// The run stopped on the cancellation signal rather than end of input.
    pub cancelled: bool,
}

impl WriteSummary {
    fn accept(&mut self, batch: &Batch) {
        self.batches += 1;
        self.records += batch.len() as u64;
        self.bytes += batch.size() as u64;
    }
}

enum Delivery {
    Accepted,
    /// Cancellation arrived while waiting to retry.
    Abandoned,
}

// ═══════════════════════════════════════════════════════════════
//  Batch Writer — source → segmenter → accumulator → transport
// ═══════════════════════════════════════════════════════════════

/// Streaming batch writer.
///
/// Reading and batching run in their own task and hand completed batches
/// over a channel of depth 1, so at most one batch is in flight while the
/// next one is accumulated. Batches are sent strictly in input order.
pub struct BatchWriter {
    service: Arc<dyn WriteService>,
    precision: Precision,
    batch: BatchConfig,
    retry: RetryPolicy,
    phase: Arc<watch::Sender<Phase>>,
}

impl BatchWriter {
    pub fn new(
        service: Arc<dyn WriteService>,
        precision: Precision,
        batch: BatchConfig,
        retry: RetryPolicy,
    ) -> Result<Self, PipelineError> {
        batch.validate()?;
        retry.validate()?;
        let (phase, _) = watch::channel(Phase::Idle);
        Ok(Self {
            service,
            precision,
            batch,
            retry,
            phase: Arc::new(phase),
        })
    }

    /// Наблюдать за фазой координатора.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Resolve the destination with at most one lookup call.
    ///
    /// Отмена во время lookup'а это чистая остановка: `Ok(None)`, ответ
    /// resolver'а не ждём.
    pub async fn resolve(
        &self,
        buckets: &dyn BucketService,
        filter: &BucketFilter,
        token: &CancellationToken,
    ) -> Result<Option<Destination>, PipelineError> {
        self.set_phase(Phase::Resolving);
        let resolved = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("cancelled during destination resolution");
                self.set_phase(Phase::Terminated);
                return Ok(None);
            }
            resolved = resolve_destination(buckets, filter) => resolved,
        };
        resolved.map(Some).inspect_err(|e| {
            tracing::error!(error = %e, "destination resolution failed");
            self.set_phase(Phase::Terminated);
        })
    }

    /// Full run: resolve, then stream `source` into the resolved destination.
    /// Nothing is sent if resolution fails or is cancelled.
    pub async fn run<R>(
        &self,
        buckets: &dyn BucketService,
        filter: &BucketFilter,
        source: R,
        token: CancellationToken,
    ) -> Result<WriteSummary, PipelineError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        match self.resolve(buckets, filter, &token).await? {
            Some(destination) => self.write(destination, source, token).await,
            None => Ok(WriteSummary { cancelled: true, ..WriteSummary::default() }),
        }
    }

    /// Stream `source` into `destination` until end of input, a fatal
    /// failure, or cancellation.
    ///
    /// Cancellation is not an error: the summary comes back with
    /// `cancelled` set. A send already in flight when the token fires is
    /// allowed to finish; nothing after it is sent.
    pub async fn write<R>(
        &self,
        destination: Destination,
        source: R,
        token: CancellationToken,
    ) -> Result<WriteSummary, PipelineError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut summary = WriteSummary::default();

        if token.is_cancelled() {
            tracing::debug!("cancelled before streaming");
            summary.cancelled = true;
            self.set_phase(Phase::Terminated);
            return Ok(summary);
        }
        self.set_phase(Phase::Streaming);

        // stop: внешняя отмена, ошибка чтения или отказ транспорта
        let stop = token.child_token();
        let (tx, mut rx) = mpsc::channel::<Batch>(1);

        let reader = RecordReader::new(source);
        let config = self.batch.clone();
        let producer_stop = stop.clone();
        let phase = self.phase.clone();
        let producer = tokio::spawn(async move {
            let result = accumulate(reader, config, tx, producer_stop.clone(), phase).await;
            if result.is_err() {
                producer_stop.cancel();
            }
            result
        });

        let sent = self
            .transmit(destination, &mut rx, &token, &stop, &mut summary)
            .await;
        stop.cancel();
        drop(rx);
        let produced = producer.await;
        self.set_phase(Phase::Terminated);

        if let Err(source) = sent {
            tracing::error!(
                error = ?source,
                accepted_batches = summary.batches,
                "write failed, aborting"
            );
            return Err(PipelineError::Write { accepted: summary, source });
        }
        if let Err(source) = produced? {
            tracing::error!(error = %source, accepted_batches = summary.batches, "input read failed");
            return Err(PipelineError::SourceRead { accepted: summary, source });
        }

        tracing::info!(
            batches = summary.batches,
            records = summary.records,
            bytes = summary.bytes,
            cancelled = summary.cancelled,
            "write finished"
        );
        Ok(summary)
    }

    async fn transmit(
        &self,
        destination: Destination,
        rx: &mut mpsc::Receiver<Batch>,
        token: &CancellationToken,
        stop: &CancellationToken,
        summary: &mut WriteSummary,
    ) -> Result<(), WriteError> {
        loop {
            let batch = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(accepted_batches = summary.batches, "cancellation observed");
                    summary.cancelled = true;
                    return Ok(());
                }
                _ = stop.cancelled() => return Ok(()),
                batch = rx.recv() => match batch {
                    Some(batch) => batch,
                    None => return Ok(()),
                },
            };

            match self.deliver(destination, &batch, token).await? {
                Delivery::Accepted => {
                    summary.accept(&batch);
                    tracing::debug!(
                        batch = summary.batches,
                        records = batch.len(),
                        bytes = batch.size(),
                        "batch accepted"
                    );
                }
                Delivery::Abandoned => {
                    summary.cancelled = true;
                    return Ok(());
                }
            }
        }
    }

    /// Одна или несколько попыток записи batch'а согласно RetryPolicy.
    async fn deliver(
        &self,
        destination: Destination,
        batch: &Batch,
        token: &CancellationToken,
    ) -> Result<Delivery, WriteError> {
        let mut attempt = 1;
        loop {
            let request = WriteRequest { destination, precision: self.precision, batch };
            match self.service.write(request).await {
                Ok(()) => return Ok(Delivery::Accepted),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = ?e,
                        "write attempt failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Ok(Delivery::Abandoned),
                        _ = tokio::time::sleep(self.retry.backoff()) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn set_phase(&self, phase: Phase) {
        tracing::debug!(?phase, "pipeline phase");
        self.phase.send_replace(phase);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Producer — RecordReader → BatchBuilder → channel
// ═══════════════════════════════════════════════════════════════

enum Step {
    Record(Option<lpwrite_api::Record>),
    Tick,
}

async fn accumulate<R: AsyncRead + Unpin>(
    mut reader: RecordReader<R>,
    config: BatchConfig,
    tx: mpsc::Sender<Batch>,
    stop: CancellationToken,
    phase: Arc<watch::Sender<Phase>>,
) -> std::io::Result<()> {
    let interval = config.flush_interval();
    let mut builder = BatchBuilder::new(config.max_records, config.max_bytes);
    let mut deadline: Option<Instant> = None;

    loop {
        // Следующий batch начинаем собирать только когда в канале есть место:
        // один в полёте, один собирается.
        let permit = tokio::select! {
            biased;
            _ = stop.cancelled() => return Ok(()),
            permit = tx.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => return Ok(()),
            },
        };

        let batch = loop {
            let step = tokio::select! {
                biased;
                _ = stop.cancelled() => return Ok(()),
                _ = sleep_until(deadline) => Step::Tick,
                record = reader.next_record() => Step::Record(record?),
            };

            match step {
                Step::Tick => {
                    deadline = None;
                    if let Some(batch) = builder.take() {
                        tracing::trace!(records = batch.len(), "flush interval elapsed");
                        break batch;
                    }
                }
                Step::Record(Some(record)) => {
                    let was_empty = builder.is_empty();
                    let closed = builder.push(record);
                    if builder.is_empty() {
                        deadline = None;
                    } else if was_empty || closed.is_some() {
                        deadline = interval.map(|iv| Instant::now() + iv);
                    }
                    if let Some(batch) = closed {
                        break batch;
                    }
                }
                Step::Record(None) => {
                    phase.send_replace(Phase::Draining);
                    tracing::debug!(pending = builder.pending(), "end of input, draining");
                    if let Some(batch) = builder.take() {
                        permit.send(batch);
                    }
                    return Ok(());
                }
            }
        };

        permit.send(batch);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
