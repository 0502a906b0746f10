// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, SecondsFormat, Utc};

use crate::constants::{EVENT_OVERHEAD_BYTES, UNKNOWN_CALLER};

/// A single log line as it is shipped to the store.
///
/// `message` holds the fully formatted text: `[prefix] <RFC3339 time> [caller] message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Milliseconds since the Unix epoch.
    pub timestamp_millis: i64,
    pub message: String,
}

impl LogRecord {
    /// Wraps an already formatted message.
    pub fn new(timestamp_millis: i64, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp_millis,
            message: message.into(),
        }
    }

    /// Formats `message` into a record stamped with the current time.
    ///
    /// `caller` is a free-form diagnostic annotation. When absent, the record
    /// carries the `unknown` placeholder instead.
    pub fn build(prefix: &str, message: &str, caller: Option<&str>) -> Self {
        Self::build_at(Utc::now(), prefix, message, caller)
    }

    pub(crate) fn build_at(
        now: DateTime<Utc>,
        prefix: &str,
        message: &str,
        caller: Option<&str>,
    ) -> Self {
        let caller = caller.unwrap_or(UNKNOWN_CALLER);
        LogRecord {
            timestamp_millis: now.timestamp_millis(),
            message: format!(
                "[{prefix}] {} [{caller}] {message}",
                now.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        }
    }

    /// Size the store accounts for this record: message bytes plus the per-event overhead.
    pub fn size(&self) -> usize {
        self.message.len() + EVENT_OVERHEAD_BYTES
    }

    /// Cuts the message down to at most `max_bytes`, on a UTF-8 boundary.
    ///
    /// Returns `true` if anything was removed.
    pub(crate) fn truncate_message(&mut self, max_bytes: usize) -> bool {
        if self.message.len() <= max_bytes {
            return false;
        }
        let mut end = max_bytes;
        while !self.message.is_char_boundary(end) {
            end -= 1;
        }
        self.message.truncate(end);
        true
    }
}
