// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batched shipping of log lines to a CloudWatch Logs stream.
//!
//! Producers log through a cloneable [`ShipperHandle`]. A single [`ShipperService`]
//! task accumulates the records into requests within the store's limits and appends
//! them in order, tracking the stream's sequence token. Any failure the service
//! cannot recover from with a single retry is latched: from then on records are
//! dropped, and producers are never blocked or handed an error.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod flusher;
pub mod http_client;
pub mod record;
pub mod service;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{LogsClient, StreamIdentity};
pub use config::ShipperConfig;
pub use error::{ClientError, ConfigError, ShipperError};
pub use http_client::HttpLogsClient;
pub use record::LogRecord;
pub use service::{ShipperHandle, ShipperService};
pub use state::ShipperState;
