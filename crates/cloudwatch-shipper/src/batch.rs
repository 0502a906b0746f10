// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Accumulation of log records into requests the store will accept.
//!
//! A batch is shipped in a single `PutLogEvents` call, so it has to respect every
//! per-request limit of the store:
//! 1. **Size**: cumulative accounted size stays below [`constants::MAX_BATCH_SIZE_BYTES`]
//! 2. **Count**: at most [`constants::MAX_BATCH_EVENTS`] records
//! 3. **Span**: first and last timestamps at most [`constants::MAX_BATCH_SPAN_MILLIS`] apart
//! 4. **Order**: timestamps never decrease
//!
//! The shipper asks [`Batch::needs_flush_before`] for every incoming record and
//! flushes the current batch first when the record would break one of the first
//! three limits. Ordering is kept by [`Batch::push`] itself.

use crate::constants;
use crate::record::LogRecord;

/// Per-request limits applied by the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_bytes: usize,
    pub max_events: usize,
    pub max_span_millis: i64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        BatchLimits {
            max_bytes: constants::MAX_BATCH_SIZE_BYTES,
            max_events: constants::MAX_BATCH_EVENTS,
            max_span_millis: constants::MAX_BATCH_SPAN_MILLIS,
        }
    }
}

impl BatchLimits {
    /// Largest message a record may carry and still fit in an empty batch.
    pub fn max_message_bytes(&self) -> usize {
        self.max_bytes
            .saturating_sub(constants::EVENT_OVERHEAD_BYTES)
            .saturating_sub(1)
    }
}

/// Ordered records waiting to be shipped, with their running accounted size.
#[derive(Debug, Default)]
pub struct Batch {
    records: Vec<LogRecord>,
    size_bytes: usize,
}

impl Batch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cumulative accounted size of the records, overhead included.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Returns `true` if `record` cannot join this batch without breaking `limits`.
    ///
    /// An empty batch always accepts the record.
    pub fn needs_flush_before(&self, record: &LogRecord, limits: &BatchLimits) -> bool {
        let Some(first) = self.records.first() else {
            return false;
        };
        self.size_bytes + record.size() >= limits.max_bytes
            || self.records.len() >= limits.max_events
            || record
                .timestamp_millis
                .saturating_sub(first.timestamp_millis)
                > limits.max_span_millis
    }

    /// Appends `record`, clamping its timestamp so the batch stays non-decreasing.
    ///
    /// Producers stamp records before they enqueue them, so two concurrent producers
    /// can enqueue in the opposite order of their timestamps. Enqueue order wins.
    pub fn push(&mut self, mut record: LogRecord) {
        if let Some(last) = self.records.last() {
            if record.timestamp_millis < last.timestamp_millis {
                record.timestamp_millis = last.timestamp_millis;
            }
        }
        self.size_bytes += record.size();
        self.records.push(record);
    }

    /// Empties the batch, handing back its records in order.
    pub fn take(&mut self) -> Vec<LogRecord> {
        self.size_bytes = 0;
        std::mem::take(&mut self.records)
    }
}
