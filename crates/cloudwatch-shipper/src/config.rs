// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use regex::Regex;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use crate::batch::BatchLimits;
use crate::client::StreamIdentity;
use crate::constants::{DEFAULT_FLUSH_INTERVAL, DEFAULT_PREFIX, DEFAULT_QUEUE_CAPACITY};
use crate::error::ConfigError;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a shipper and its HTTP client
#[derive(Debug, Clone)]
pub struct ShipperConfig {
    /// Tag written at the start of every shipped line
    pub prefix: String,
    /// Log group receiving the events
    pub group_name: String,
    /// Log stream receiving the events
    pub stream_name: String,
    /// Records buffered between producers and the shipper loop
    pub queue_capacity: usize,
    /// Interval at which partial batches are flushed
    pub flush_interval: Duration,
    /// Per-request limits
    pub limits: BatchLimits,
    /// CloudWatch Logs endpoint (e.g. https://logs.eu-west-1.amazonaws.com)
    pub endpoint: String,
    /// Timeout of a single HTTP request
    pub timeout: Duration,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            group_name: String::new(),
            stream_name: String::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            limits: BatchLimits::default(),
            endpoint: regional_endpoint(DEFAULT_REGION),
            timeout: DEFAULT_TIMEOUT,
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

impl ShipperConfig {
    /// Default configuration targeting the given group and stream
    pub fn new(group_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            stream_name: stream_name.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let group_name = env::var("SHIPPER_LOG_GROUP").unwrap_or_default();
        let stream_name = env::var("SHIPPER_LOG_STREAM").unwrap_or_default();
        let prefix = env::var("SHIPPER_PREFIX").unwrap_or(defaults.prefix);
        let queue_capacity =
            parse_var("SHIPPER_QUEUE_CAPACITY")?.unwrap_or(defaults.queue_capacity);
        let flush_interval = parse_var("SHIPPER_FLUSH_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.flush_interval);
        let timeout = parse_var("SHIPPER_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let endpoint = env::var("SHIPPER_ENDPOINT").unwrap_or_else(|_| {
            let region = env::var("AWS_REGION")
                .or_else(|_| env::var("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|_| DEFAULT_REGION.to_string());
            regional_endpoint(&region)
        });
        let https_proxy = env::var("SHIPPER_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();
        let log_level = env::var("SHIPPER_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            prefix,
            group_name,
            stream_name,
            queue_capacity,
            flush_interval,
            limits: defaults.limits,
            endpoint,
            timeout,
            https_proxy,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !log_group_pattern().is_match(&self.group_name) {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log group name '{}': 1-512 characters among a-zA-Z0-9 _ - / . #",
                self.group_name
            )));
        }

        if !log_stream_pattern().is_match(&self.stream_name) {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log stream name '{}': 1-512 characters, ':' and '*' are not allowed",
                self.stream_name
            )));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.flush_interval.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "SHIPPER_ENDPOINT cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn stream(&self) -> StreamIdentity {
        StreamIdentity::new(self.group_name.clone(), self.stream_name.clone())
    }
}

fn regional_endpoint(region: &str) -> String {
    format!("https://logs.{region}.amazonaws.com")
}

fn parse_var<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}

#[allow(clippy::expect_used)]
fn log_group_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\.\-_/#A-Za-z0-9]{1,512}$").expect("valid regex"))
}

#[allow(clippy::expect_used)]
fn log_stream_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^:*]{1,512}$").expect("valid regex"))
}
