// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shipping of a single batch, including the one-shot recovery policy.
//!
//! An append can fail in three recoverable-looking ways, each retried at most once:
//!
//! ```text
//!   put_log_events ──ok──> store next token, mirror records
//!        │
//!        ├─ ResourceNotFound ──> create group (failure ignored)
//!        │                       create stream (failure latches)
//!        │                       put_log_events again, same token
//!        │
//!        ├─ InvalidSequenceToken ──> put_log_events again with the
//!        │                           token named in the error message
//!        │
//!        └─ anything else ──> latch
//! ```
//!
//! A failed retry latches a [`ShipperError`]. The batch is lost either way.

use tracing::{debug, error, info};

use crate::batch::Batch;
use crate::client::{LogsClient, StreamIdentity};
use crate::constants::NULL_SEQUENCE_TOKEN;
use crate::error::{ClientError, ShipperError};
use crate::record::LogRecord;
use crate::state::{FailureLatch, SequenceTracker, ShipperState};

pub struct Flusher<C> {
    client: C,
    stream: StreamIdentity,
    tracker: SequenceTracker,
}

impl<C: LogsClient> Flusher<C> {
    pub fn new(client: C, stream: StreamIdentity, latch: FailureLatch) -> Self {
        Flusher {
            client,
            stream,
            tracker: SequenceTracker::new(latch),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.tracker.is_failed()
    }

    pub fn state(&self) -> ShipperState {
        self.tracker.snapshot()
    }

    /// Ships the batch and leaves it empty, whatever the outcome.
    pub async fn flush(&mut self, batch: &mut Batch) {
        if batch.is_empty() {
            return;
        }
        let records = batch.take();
        if self.tracker.is_failed() {
            debug!("Dropping {} log events: shipper has failed", records.len());
            return;
        }

        debug!(
            "Flushing {} log events to {}/{}",
            records.len(),
            self.stream.group_name(),
            self.stream.stream_name()
        );
        match self.ship(&records).await {
            Ok(next_sequence_token) => {
                self.tracker.advance(next_sequence_token);
                mirror(&records);
            }
            Err(e) => {
                error!(
                    "Dropping {} log events, no further events will be shipped: {e}",
                    records.len()
                );
                self.tracker.fail(e);
            }
        }
    }

    async fn ship(&self, records: &[LogRecord]) -> Result<Option<String>, ShipperError> {
        let token = self.tracker.token();
        match self
            .client
            .put_log_events(&self.stream, records, token)
            .await
        {
            Ok(next_sequence_token) => Ok(next_sequence_token),
            Err(ClientError::ResourceNotFound(message)) => {
                debug!("Log destination missing, creating it: {message}");
                self.create_destination().await?;
                self.client
                    .put_log_events(&self.stream, records, token)
                    .await
                    .map_err(ShipperError::ResourceMissing)
            }
            Err(ClientError::InvalidSequenceToken(message)) => {
                let expected = expected_sequence_token(&message);
                debug!("Retrying with corrected sequence token {expected:?}");
                self.client
                    .put_log_events(&self.stream, records, expected.as_deref())
                    .await
                    .map_err(ShipperError::StaleSequenceToken)
            }
            Err(e) => Err(ShipperError::Transport(e)),
        }
    }

    async fn create_destination(&self) -> Result<(), ShipperError> {
        // The group usually exists already; only the stream is required to succeed.
        if let Err(e) = self
            .client
            .create_log_group(self.stream.group_name())
            .await
        {
            debug!("Ignoring log group creation failure: {e}");
        }
        self.client
            .create_log_stream(&self.stream)
            .await
            .map_err(ShipperError::CreateLogStream)
    }
}

/// Extracts the token the store expects from an `InvalidSequenceToken` message.
///
/// The token is the message's last word; `null` means the stream has no token yet.
pub(crate) fn expected_sequence_token(message: &str) -> Option<String> {
    match message.split_whitespace().last() {
        None | Some(NULL_SEQUENCE_TOKEN) => None,
        Some(token) => Some(token.to_string()),
    }
}

fn mirror(records: &[LogRecord]) {
    for record in records {
        info!(timestamp = record.timestamp_millis, "{}", record.message);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{Call, MockLogsClient};
    use std::sync::Arc;
    use tracing_test::traced_test;

    const STALE_MESSAGE: &str =
        "The given sequenceToken is invalid. The next expected sequenceToken is: 49590302";

    fn stream() -> StreamIdentity {
        StreamIdentity::new("api-group", "api-stream")
    }

    fn flusher(client: &Arc<MockLogsClient>) -> Flusher<Arc<MockLogsClient>> {
        Flusher::new(Arc::clone(client), stream(), FailureLatch::default())
    }

    fn batch_of(messages: &[&str]) -> Batch {
        let mut batch = Batch::new();
        for (i, message) in messages.iter().enumerate() {
            batch.push(LogRecord::new(i as i64, *message));
        }
        batch
    }

    #[test]
    fn test_expected_sequence_token() {
        assert_eq!(
            expected_sequence_token(STALE_MESSAGE),
            Some("49590302".to_string())
        );
        assert_eq!(
            expected_sequence_token("The next expected sequenceToken is: null"),
            None
        );
        assert_eq!(expected_sequence_token(""), None);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let client = Arc::new(MockLogsClient::new());
        let mut flusher = flusher(&client);

        flusher.flush(&mut Batch::new()).await;

        assert!(client.calls().is_empty());
        assert_eq!(flusher.state(), ShipperState::default());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_success_stores_token_and_mirrors() {
        let client = Arc::new(MockLogsClient::new());
        let mut flusher = flusher(&client);
        let mut batch = batch_of(&["0123456789", "abcdefghij", "klmnopqrst"]);
        assert_eq!(batch.size_bytes(), 108);

        flusher.flush(&mut batch).await;

        assert!(batch.is_empty());
        let puts = client.puts();
        assert_eq!(puts.len(), 1);
        let messages: Vec<&str> = puts[0].0.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["0123456789", "abcdefghij", "klmnopqrst"]);
        assert_eq!(puts[0].1, None);
        assert_eq!(
            flusher.state().next_sequence_token.as_deref(),
            Some("token-1")
        );
        assert!(logs_contain("abcdefghij"));
    }

    #[tokio::test]
    async fn test_next_append_carries_previous_token() {
        let client = Arc::new(MockLogsClient::new());
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["one"])).await;
        flusher.flush(&mut batch_of(&["two"])).await;

        let tokens: Vec<Option<String>> = client.puts().into_iter().map(|(_, t)| t).collect();
        assert_eq!(tokens, vec![None, Some("token-1".to_string())]);
    }

    #[tokio::test]
    async fn test_resource_not_found_creates_and_retries() {
        let client = Arc::new(MockLogsClient::with_put_responses([
            Err(ClientError::ResourceNotFound(
                "The specified log group does not exist.".to_string(),
            )),
            Ok(Some("after-create".to_string())),
        ]));
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["hello"])).await;

        let calls = client.calls();
        assert_eq!(calls.len(), 4);
        assert!(matches!(calls[0], Call::Put { .. }));
        assert_eq!(calls[1], Call::CreateGroup("api-group".to_string()));
        assert_eq!(
            calls[2],
            Call::CreateStream("api-group".to_string(), "api-stream".to_string())
        );
        assert_eq!(calls[0], calls[3]);

        let state = flusher.state();
        assert_eq!(state.permanent_error, None);
        assert_eq!(state.next_sequence_token.as_deref(), Some("after-create"));
    }

    #[tokio::test]
    async fn test_group_creation_failure_is_ignored() {
        let client = Arc::new(
            MockLogsClient::with_put_responses([Err(ClientError::ResourceNotFound(
                "missing".to_string(),
            ))])
            .fail_create_group(ClientError::Rejected {
                code: "ResourceAlreadyExistsException".to_string(),
                message: "exists".to_string(),
            }),
        );
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["hello"])).await;

        assert_eq!(client.puts().len(), 2);
        assert!(!flusher.is_failed());
    }

    #[tokio::test]
    async fn test_stream_creation_failure_latches() {
        let create_error = ClientError::Transport("timed out".to_string());
        let client = Arc::new(
            MockLogsClient::with_put_responses([Err(ClientError::ResourceNotFound(
                "missing".to_string(),
            ))])
            .fail_create_stream(create_error.clone()),
        );
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["hello"])).await;

        assert_eq!(client.puts().len(), 1);
        assert_eq!(
            flusher.state().permanent_error,
            Some(ShipperError::CreateLogStream(create_error))
        );
    }

    #[tokio::test]
    async fn test_resource_still_missing_latches() {
        let client = Arc::new(MockLogsClient::with_put_responses([
            Err(ClientError::ResourceNotFound("missing".to_string())),
            Err(ClientError::ResourceNotFound("still missing".to_string())),
        ]));
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["hello"])).await;

        assert_eq!(client.puts().len(), 2);
        assert_eq!(
            flusher.state().permanent_error,
            Some(ShipperError::ResourceMissing(ClientError::ResourceNotFound(
                "still missing".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn test_stale_token_retries_with_expected_token() {
        let client = Arc::new(MockLogsClient::with_put_responses([Err(
            ClientError::InvalidSequenceToken(STALE_MESSAGE.to_string()),
        )]));
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["hello"])).await;

        let tokens: Vec<Option<String>> = client.puts().into_iter().map(|(_, t)| t).collect();
        assert_eq!(tokens, vec![None, Some("49590302".to_string())]);
        assert!(!flusher.is_failed());
        assert_eq!(
            flusher.state().next_sequence_token.as_deref(),
            Some("token-2")
        );
    }

    #[tokio::test]
    async fn test_stale_token_null_retries_without_token() {
        let client = Arc::new(MockLogsClient::with_put_responses([
            Ok(Some("first".to_string())),
            Err(ClientError::InvalidSequenceToken(
                "The given sequenceToken is invalid. The next expected sequenceToken is: null"
                    .to_string(),
            )),
        ]));
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["one"])).await;
        flusher.flush(&mut batch_of(&["two"])).await;

        let tokens: Vec<Option<String>> = client.puts().into_iter().map(|(_, t)| t).collect();
        assert_eq!(tokens, vec![None, Some("first".to_string()), None]);
        assert!(!flusher.is_failed());
    }

    #[tokio::test]
    async fn test_stale_token_retry_failure_latches() {
        let client = Arc::new(MockLogsClient::with_put_responses([
            Err(ClientError::InvalidSequenceToken(STALE_MESSAGE.to_string())),
            Err(ClientError::InvalidSequenceToken(STALE_MESSAGE.to_string())),
        ]));
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["hello"])).await;

        assert_eq!(client.puts().len(), 2);
        assert!(matches!(
            flusher.state().permanent_error,
            Some(ShipperError::StaleSequenceToken(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_other_failure_latches_without_retry() {
        let client = Arc::new(MockLogsClient::with_put_responses([Err(
            ClientError::Rejected {
                code: "InvalidParameterException".to_string(),
                message: "Log events in a single PutLogEvents request must be in chronological order."
                    .to_string(),
            },
        )]));
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["hello"])).await;

        assert_eq!(client.calls().len(), 1);
        assert!(matches!(
            flusher.state().permanent_error,
            Some(ShipperError::Transport(ClientError::Rejected { .. }))
        ));
        assert!(logs_contain("no further events will be shipped"));
    }

    #[tokio::test]
    async fn test_failed_flusher_drops_batches() {
        let client = Arc::new(MockLogsClient::with_put_responses([Err(
            ClientError::Transport("connection refused".to_string()),
        )]));
        let mut flusher = flusher(&client);

        flusher.flush(&mut batch_of(&["first"])).await;
        let mut batch = batch_of(&["x"]);
        flusher.flush(&mut batch).await;

        assert!(batch.is_empty());
        assert_eq!(client.puts().len(), 1);
    }
}
