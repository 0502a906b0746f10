// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ClientError;
use crate::record::LogRecord;

/// Log group and log stream a shipper appends to.
///
/// A stream is expected to have exactly one shipper writing to it: the sequence
/// token is tracked locally and concurrent writers would keep invalidating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIdentity {
    group_name: String,
    stream_name: String,
}

impl StreamIdentity {
    pub fn new(group_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        StreamIdentity {
            group_name: group_name.into(),
            stream_name: stream_name.into(),
        }
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}

/// The subset of the CloudWatch Logs API the shipper relies on.
#[async_trait]
pub trait LogsClient: Send + Sync {
    /// Appends `events` to the stream. Returns the token the next append must carry.
    async fn put_log_events(
        &self,
        stream: &StreamIdentity,
        events: &[LogRecord],
        sequence_token: Option<&str>,
    ) -> Result<Option<String>, ClientError>;

    async fn create_log_group(&self, group_name: &str) -> Result<(), ClientError>;

    async fn create_log_stream(&self, stream: &StreamIdentity) -> Result<(), ClientError>;
}

#[async_trait]
impl<C: LogsClient + ?Sized> LogsClient for Arc<C> {
    async fn put_log_events(
        &self,
        stream: &StreamIdentity,
        events: &[LogRecord],
        sequence_token: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        (**self)
            .put_log_events(stream, events, sequence_token)
            .await
    }

    async fn create_log_group(&self, group_name: &str) -> Result<(), ClientError> {
        (**self).create_log_group(group_name).await
    }

    async fn create_log_stream(&self, stream: &StreamIdentity) -> Result<(), ClientError> {
        (**self).create_log_stream(stream).await
    }
}
