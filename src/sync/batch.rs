//! Batch scheduling.
//!
//! A record stream is cut into consecutive batches. Each batch is fanned
//! out to at most `workers` concurrent handler calls and fully drained
//! before the next one starts, which bounds in-flight remote load.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::config::at_least_one;
use crate::error::Result;
use crate::model::Record;
use crate::sync::processor::RecordHandler;
use crate::sync::types::{FileStats, Outcome};

/// Groups a fallible record stream into `Vec`s of at most `size` records.
///
/// The first read error is yielded on its own and ends the iteration.
pub struct Batches<I> {
    records: I,
    size: usize,
    done: bool,
}

impl<I> Batches<I>
where
    I: Iterator<Item = Result<Record>>,
{
    pub fn new(records: I, size: usize) -> Self {
        Self {
            records,
            size: at_least_one(size),
            done: false,
        }
    }
}

impl<I> Iterator for Batches<I>
where
    I: Iterator<Item = Result<Record>>,
{
    type Item = Result<Vec<Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.records.next() {
                Some(Ok(record)) => batch.push(record),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

/// Drives a [`RecordHandler`] over a record stream, batch by batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchScheduler {
    batch_size: usize,
    workers: usize,
    throttle: Duration,
}

impl BatchScheduler {
    /// Batch size and worker count are clamped to at least 1.
    #[must_use]
    pub fn new(batch_size: usize, workers: usize, throttle: Duration) -> Self {
        Self {
            batch_size: at_least_one(batch_size),
            workers: at_least_one(workers),
            throttle,
        }
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Process every record and return the aggregated totals.
    ///
    /// Record failures are counted, not raised.
    ///
    /// # Errors
    ///
    /// Returns the first error produced while reading `records`. Batches
    /// already processed at that point are not rolled back.
    pub async fn run<H, I>(
        &self,
        handler: &H,
        collection: &str,
        upsert_field: Option<&str>,
        records: I,
    ) -> Result<FileStats>
    where
        H: RecordHandler,
        I: Iterator<Item = Result<Record>>,
    {
        let mut stats = FileStats::default();

        for batch in Batches::new(records, self.batch_size) {
            let batch = batch?;
            if stats.batches > 0 && !self.throttle.is_zero() {
                debug!(collection, delay_ms = self.throttle.as_millis() as u64, "Throttling");
                tokio::time::sleep(self.throttle).await;
            }

            let size = batch.len();
            for outcome in self.dispatch(handler, collection, upsert_field, batch).await {
                stats.record(outcome);
            }
            stats.batches += 1;
            debug!(
                collection,
                batch = stats.batches,
                size,
                processed = stats.total,
                "Batch complete"
            );
        }

        Ok(stats)
    }

    async fn dispatch<H: RecordHandler>(
        &self,
        handler: &H,
        collection: &str,
        upsert_field: Option<&str>,
        batch: Vec<Record>,
    ) -> Vec<Outcome> {
        if self.workers == 1 {
            let mut outcomes = Vec::with_capacity(batch.len());
            for record in batch {
                outcomes.push(handler.handle(collection, record, upsert_field).await);
            }
            return outcomes;
        }

        stream::iter(batch)
            .map(|record| handler.handle(collection, record, upsert_field))
            .buffer_unordered(self.workers)
            .collect()
            .await
    }
}
