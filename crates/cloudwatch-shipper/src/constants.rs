// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits imposed by the CloudWatch Logs `PutLogEvents` API and shipper defaults.
//!
//! The store computes the size of a request as the sum of all event messages in
//! UTF-8 plus a fixed overhead per event. Requests over any of these limits are
//! rejected as a whole, so the batch accumulator splits before reaching them.

use std::time::Duration;

/// Bytes the store adds to every event when sizing a request.
pub const EVENT_OVERHEAD_BYTES: usize = 26;

/// Maximum accounted size of a single `PutLogEvents` request.
///
/// The cumulative size of a batch is kept strictly below this value.
pub const MAX_BATCH_SIZE_BYTES: usize = 1_048_576;

/// Maximum number of events in a single `PutLogEvents` request.
pub const MAX_BATCH_EVENTS: usize = 10_000;

/// Maximum distance between the first and last event timestamp of a request.
pub const MAX_BATCH_SPAN_MILLIS: i64 = 24 * 60 * 60 * 1_000;

/// Records buffered between producers and the shipper loop.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Interval at which the current batch is flushed regardless of its fill level.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Shortest tick the shipper loop runs with. Shorter configured intervals are raised to it.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

pub const DEFAULT_PREFIX: &str = "LOG";

/// Placeholder written in place of the caller annotation when none is supplied.
pub const UNKNOWN_CALLER: &str = "unknown";

/// Value the store writes in place of the expected token when the stream has none yet.
pub const NULL_SEQUENCE_TOKEN: &str = "null";
