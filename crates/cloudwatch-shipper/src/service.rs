// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Actor shipping log records to a single log stream.
//!
//! ```text
//!    ┌───────────────┐
//!    │ ShipperHandle │ (cloned into every producer)
//!    └──────┬────────┘
//!           │ bounded mpsc queue + close signal
//!           v
//!    ┌────────────────┐
//!    │ ShipperService │ (one task, owns batch and sequence token)
//!    └──────┬─────────┘
//!           │ flush on tick, on full batch and on close
//!           v
//!    ┌────────────────┐
//!    │    Flusher     │ ──> LogsClient
//!    └────────────────┘
//! ```
//!
//! Producers only ever wait for room in the queue. Remote failures never reach
//! them: once the flusher latches a failure, handles turn every call into a no-op
//! and the loop drops whatever is still queued.
//!
//! ```rust,ignore
//! let (service, handle) = ShipperService::new(&config, HttpLogsClient::new(&config)?);
//! let shipper = tokio::spawn(service.run());
//!
//! handle.log("user signed in").await;
//! logf!(handle, "refreshed {} tokens", count).await;
//!
//! handle.close();
//! let state = shipper.await?;
//! ```

use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::batch::{Batch, BatchLimits};
use crate::client::LogsClient;
use crate::config::ShipperConfig;
use crate::constants::MIN_FLUSH_INTERVAL;
use crate::error::ShipperError;
use crate::flusher::Flusher;
use crate::record::LogRecord;
use crate::state::{FailureLatch, ShipperState};

/// Producer side of a shipper. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ShipperHandle {
    tx: mpsc::Sender<LogRecord>,
    prefix: Arc<str>,
    caller: Option<Arc<str>>,
    latch: FailureLatch,
    cancel: CancellationToken,
}

impl ShipperHandle {
    /// Returns a handle annotating its records with `caller` instead of the call site.
    #[must_use]
    pub fn named(&self, caller: impl Into<Arc<str>>) -> Self {
        ShipperHandle {
            caller: Some(caller.into()),
            ..self.clone()
        }
    }

    /// Ships `message` as one line.
    #[track_caller]
    pub fn log(&self, message: impl fmt::Display) -> impl Future<Output = ()> + Send + '_ {
        let record = self.record(Location::caller(), || message.to_string());
        self.enqueue_record(record)
    }

    /// Ships `message` followed by a newline.
    #[track_caller]
    pub fn logln(&self, message: impl fmt::Display) -> impl Future<Output = ()> + Send + '_ {
        let record = self.record(Location::caller(), || format!("{message}\n"));
        self.enqueue_record(record)
    }

    /// Ships preformatted arguments, see [`logf!`](crate::logf).
    #[track_caller]
    pub fn logf(&self, args: fmt::Arguments<'_>) -> impl Future<Output = ()> + Send + '_ {
        let record = self.record(Location::caller(), || fmt::format(args));
        self.enqueue_record(record)
    }

    /// Like [`ShipperHandle::log`], for producers running outside the async runtime.
    ///
    /// Blocks the thread while the queue is full. Panics if called from within an
    /// asynchronous execution context, like [`mpsc::Sender::blocking_send`].
    #[track_caller]
    pub fn blocking_log(&self, message: impl fmt::Display) {
        if let Some(record) = self.record(Location::caller(), || message.to_string()) {
            if self.tx.blocking_send(record).is_err() {
                debug!("Shipper is closed, dropping log event");
            }
        }
    }

    /// Queues an already built record, waiting while the queue is full.
    ///
    /// Returns immediately without queueing once the shipper has failed or was closed.
    pub async fn enqueue(&self, record: LogRecord) {
        if self.latch.is_set() {
            return;
        }
        if self.tx.send(record).await.is_err() {
            debug!("Shipper is closed, dropping log event");
        }
    }

    /// Signals the shipper to flush what it holds and stop. Later calls are no-ops.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }

    /// The failure that stopped shipping, if any.
    pub fn permanent_error(&self) -> Option<&ShipperError> {
        self.latch.get()
    }

    fn record(
        &self,
        location: &Location<'_>,
        message: impl FnOnce() -> String,
    ) -> Option<LogRecord> {
        if self.latch.is_set() || self.cancel.is_cancelled() {
            return None;
        }
        let caller = match &self.caller {
            Some(caller) => caller.to_string(),
            None => format!("{}:{}", location.file(), location.line()),
        };
        Some(LogRecord::build(&self.prefix, &message(), Some(&caller)))
    }

    fn enqueue_record(&self, record: Option<LogRecord>) -> impl Future<Output = ()> + Send + '_ {
        async move {
            if let Some(record) = record {
                self.enqueue(record).await;
            }
        }
    }
}

/// Ships `format_args!` output through a [`ShipperHandle`].
///
/// ```rust,ignore
/// logf!(handle, "user {} signed in from {}", user_id, addr).await;
/// ```
#[macro_export]
macro_rules! logf {
    ($handle:expr, $($arg:tt)+) => {
        $handle.logf(::std::format_args!($($arg)+))
    };
}

/// Single task owning the current batch and the shipment state.
pub struct ShipperService<C> {
    rx: mpsc::Receiver<LogRecord>,
    cancel: CancellationToken,
    flusher: Flusher<C>,
    batch: Batch,
    limits: BatchLimits,
    flush_interval: Duration,
}

impl<C: LogsClient> ShipperService<C> {
    /// Creates the service and the handle producers log through.
    ///
    /// The service does nothing until [`ShipperService::run`] is spawned.
    pub fn new(config: &ShipperConfig, client: C) -> (Self, ShipperHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let cancel = CancellationToken::new();
        let latch = FailureLatch::default();

        let service = ShipperService {
            rx,
            cancel: cancel.clone(),
            flusher: Flusher::new(client, config.stream(), latch.clone()),
            batch: Batch::new(),
            limits: config.limits,
            flush_interval: config.flush_interval.max(MIN_FLUSH_INTERVAL),
        };
        let handle = ShipperHandle {
            tx,
            prefix: Arc::from(config.prefix.as_str()),
            caller: None,
            latch,
            cancel,
        };

        (service, handle)
    }

    /// Runs until a handle calls [`ShipperHandle::close`] or every handle is dropped.
    ///
    /// Records queued before shutdown are still accepted, then the batch is flushed one
    /// last time. Returns the final state.
    pub async fn run(mut self) -> ShipperState {
        debug!("Shipper service started");

        let mut ticker = interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                // ahead of recv so a busy queue cannot hold back the timed flush
                _ = ticker.tick() => self.flusher.flush(&mut self.batch).await,
                record = self.rx.recv() => match record {
                    Some(record) => self.accept(record).await,
                    None => break,
                },
            }
        }

        debug!("Shipper service shutting down");
        self.rx.close();
        while let Some(record) = self.rx.recv().await {
            self.accept(record).await;
        }
        self.flusher.flush(&mut self.batch).await;

        debug!("Shipper service stopped");
        self.flusher.state()
    }

    async fn accept(&mut self, mut record: LogRecord) {
        if self.flusher.is_failed() {
            return;
        }
        if record.size() >= self.limits.max_bytes {
            let original = record.message.len();
            record.truncate_message(self.limits.max_message_bytes());
            warn!(
                "Log event of {original} bytes exceeds the request size limit, truncated to {} bytes",
                record.message.len()
            );
        }
        if self.batch.needs_flush_before(&record, &self.limits) {
            self.flusher.flush(&mut self.batch).await;
        }
        self.batch.push(record);
    }
}
