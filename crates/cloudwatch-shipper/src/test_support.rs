// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Scripted in-memory [`LogsClient`] for unit tests.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::client::{LogsClient, StreamIdentity};
use crate::error::ClientError;
use crate::record::LogRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Put {
        events: Vec<LogRecord>,
        sequence_token: Option<String>,
    },
    CreateGroup(String),
    CreateStream(String, String),
}

/// Records every call. Appends answer with the scripted responses in order, then
/// succeed with `token-<n>` where `n` counts appends so far.
#[derive(Debug)]
pub(crate) struct MockLogsClient {
    calls: Mutex<Vec<Call>>,
    put_responses: Mutex<VecDeque<Result<Option<String>, ClientError>>>,
    create_group_result: Mutex<Result<(), ClientError>>,
    create_stream_result: Mutex<Result<(), ClientError>>,
    put_delay: Option<Duration>,
}

impl MockLogsClient {
    pub(crate) fn new() -> Self {
        MockLogsClient {
            calls: Mutex::new(Vec::new()),
            put_responses: Mutex::new(VecDeque::new()),
            create_group_result: Mutex::new(Ok(())),
            create_stream_result: Mutex::new(Ok(())),
            put_delay: None,
        }
    }

    pub(crate) fn with_put_responses(
        responses: impl IntoIterator<Item = Result<Option<String>, ClientError>>,
    ) -> Self {
        let client = Self::new();
        client.put_responses.lock().unwrap().extend(responses);
        client
    }

    pub(crate) fn fail_create_group(self, error: ClientError) -> Self {
        *self.create_group_result.lock().unwrap() = Err(error);
        self
    }

    pub(crate) fn fail_create_stream(self, error: ClientError) -> Self {
        *self.create_stream_result.lock().unwrap() = Err(error);
        self
    }

    /// Makes every append take `delay` before answering.
    pub(crate) fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Events and tokens of every append, in call order.
    pub(crate) fn puts(&self) -> Vec<(Vec<LogRecord>, Option<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Put {
                    events,
                    sequence_token,
                } => Some((events, sequence_token)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl LogsClient for MockLogsClient {
    async fn put_log_events(
        &self,
        _stream: &StreamIdentity,
        events: &[LogRecord],
        sequence_token: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let put_count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::Put {
                events: events.to_vec(),
                sequence_token: sequence_token.map(str::to_string),
            });
            calls
                .iter()
                .filter(|call| matches!(call, Call::Put { .. }))
                .count()
        };
        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }
        match self.put_responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(Some(format!("token-{put_count}"))),
        }
    }

    async fn create_log_group(&self, group_name: &str) -> Result<(), ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::CreateGroup(group_name.to_string()));
        self.create_group_result.lock().unwrap().clone()
    }

    async fn create_log_stream(&self, stream: &StreamIdentity) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(Call::CreateStream(
            stream.group_name().to_string(),
            stream.stream_name().to_string(),
        ));
        self.create_stream_result.lock().unwrap().clone()
    }
}
