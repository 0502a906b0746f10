// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! [`LogsClient`] speaking the CloudWatch Logs JSON 1.1 protocol over HTTP.
//!
//! Every operation is a `POST /` carrying the operation name in `X-Amz-Target`.
//! Requests are not signed: the endpoint is expected to be a signing proxy or a
//! local emulator accepting unsigned calls.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{LogsClient, StreamIdentity};
use crate::config::ShipperConfig;
use crate::error::ClientError;
use crate::record::LogRecord;

const CONTENT_TYPE_AMZ_JSON: &str = "application/x-amz-json-1.1";
const TARGET_HEADER: &str = "X-Amz-Target";
const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";
const TARGET_PREFIX: &str = "Logs_20140328";

const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
const INVALID_SEQUENCE_TOKEN: &str = "InvalidSequenceTokenException";
const RESOURCE_ALREADY_EXISTS: &str = "ResourceAlreadyExistsException";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
    log_events: Vec<InputLogEvent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_token: Option<&'a str>,
}

#[derive(Serialize)]
struct InputLogEvent<'a> {
    timestamp: i64,
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogGroupRequest<'a> {
    log_group_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLogStreamRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsResponse {
    next_sequence_token: Option<String>,
    rejected_log_events_info: Option<RejectedLogEventsInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RejectedLogEventsInfo {
    too_new_log_event_start_index: Option<i64>,
    too_old_log_event_end_index: Option<i64>,
    expired_log_event_end_index: Option<i64>,
}

#[derive(Deserialize, Default)]
struct ErrorResponse {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpLogsClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLogsClient {
    pub fn new(config: &ShipperConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if let Some(proxy) = &config.https_proxy {
            let proxy = reqwest::Proxy::https(proxy)
                .map_err(|e| ClientError::Transport(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpLogsClient {
            client,
            endpoint: format!("{}/", config.endpoint.trim_end_matches('/')),
        })
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<Vec<u8>, ClientError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, CONTENT_TYPE_AMZ_JSON)
            .header(TARGET_HEADER, format!("{TARGET_PREFIX}.{operation}"))
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("{operation} request failed: {e}")))?;

        let status = response.status();
        let header_code = response
            .headers()
            .get(ERROR_TYPE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(format!("{operation} response unreadable: {e}")))?;

        if status.is_success() {
            return Ok(body.to_vec());
        }
        Err(classify_error(status, header_code.as_deref(), &body))
    }
}

#[async_trait]
impl LogsClient for HttpLogsClient {
    async fn put_log_events(
        &self,
        stream: &StreamIdentity,
        events: &[LogRecord],
        sequence_token: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let request = PutLogEventsRequest {
            log_group_name: stream.group_name(),
            log_stream_name: stream.stream_name(),
            log_events: events
                .iter()
                .map(|record| InputLogEvent {
                    timestamp: record.timestamp_millis,
                    message: &record.message,
                })
                .collect(),
            sequence_token,
        };
        let body = self.call("PutLogEvents", &request).await?;

        let response: PutLogEventsResponse = if body.is_empty() {
            PutLogEventsResponse::default()
        } else {
            serde_json::from_slice(&body).map_err(|e| {
                ClientError::Transport(format!("PutLogEvents response malformed: {e}"))
            })?
        };
        if let Some(rejected) = response.rejected_log_events_info {
            warn!(
                "Some log events were rejected by the store: too new from index {:?}, too old up to index {:?}, expired up to index {:?}",
                rejected.too_new_log_event_start_index,
                rejected.too_old_log_event_end_index,
                rejected.expired_log_event_end_index
            );
        }
        Ok(response.next_sequence_token)
    }

    async fn create_log_group(&self, group_name: &str) -> Result<(), ClientError> {
        let request = CreateLogGroupRequest {
            log_group_name: group_name,
        };
        ignore_already_exists(self.call("CreateLogGroup", &request).await)
    }

    async fn create_log_stream(&self, stream: &StreamIdentity) -> Result<(), ClientError> {
        let request = CreateLogStreamRequest {
            log_group_name: stream.group_name(),
            log_stream_name: stream.stream_name(),
        };
        ignore_already_exists(self.call("CreateLogStream", &request).await)
    }
}

fn ignore_already_exists(result: Result<Vec<u8>, ClientError>) -> Result<(), ClientError> {
    match result {
        Ok(_) => Ok(()),
        Err(ClientError::Rejected { code, .. }) if code == RESOURCE_ALREADY_EXISTS => {
            debug!("Resource already exists");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn classify_error(
    status: reqwest::StatusCode,
    header_code: Option<&str>,
    body: &[u8],
) -> ClientError {
    let parsed: ErrorResponse = serde_json::from_slice(body).unwrap_or_default();
    let code = parsed
        .error_type
        .as_deref()
        .or(header_code)
        .map(error_code)
        .unwrap_or_else(|| status.as_str())
        .to_string();
    let message = parsed
        .message
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    match code.as_str() {
        RESOURCE_NOT_FOUND => ClientError::ResourceNotFound(message),
        INVALID_SEQUENCE_TOKEN => ClientError::InvalidSequenceToken(message),
        _ => ClientError::Rejected { code, message },
    }
}

/// Strips the namespace (`com.amazonaws.logs#Code`) and URI (`Code:http://...`) decorations.
fn error_code(raw: &str) -> &str {
    let code = raw.rsplit('#').next().unwrap_or(raw);
    code.split(':').next().unwrap_or(code)
}
