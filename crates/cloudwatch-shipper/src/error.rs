// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Failures reported by a [`crate::client::LogsClient`] for a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The log group or log stream does not exist.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The sequence token did not match. The message ends with the expected token.
    #[error("Invalid sequence token: {0}")]
    InvalidSequenceToken(String),

    /// The store answered with any other error.
    #[error("Request rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The request never produced a usable response.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Terminal failure latched by the shipper. Nothing is shipped once one is recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShipperError {
    #[error("Failed to create log stream: {0}")]
    CreateLogStream(ClientError),

    #[error("Log stream still unavailable after creating it: {0}")]
    ResourceMissing(ClientError),

    #[error("Append rejected after sequence token correction: {0}")]
    StaleSequenceToken(ClientError),

    #[error("Failed to put log events: {0}")]
    Transport(ClientError),
}

/// Errors raised while loading or validating [`crate::config::ShipperConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid value '{value}' for {var}")]
    InvalidValue { var: &'static str, value: String },
}
