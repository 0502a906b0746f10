// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, OnceLock};

use crate::error::ShipperError;

/// Write-once terminal failure shared between the shipper loop and its handles.
///
/// Only the loop sets it. Handles read it to skip formatting and enqueueing once
/// the shipper can no longer deliver anything.
#[derive(Debug, Clone, Default)]
pub struct FailureLatch(Arc<OnceLock<ShipperError>>);

impl FailureLatch {
    pub fn get(&self) -> Option<&ShipperError> {
        self.0.get()
    }

    pub fn is_set(&self) -> bool {
        self.0.get().is_some()
    }

    /// Records `error` unless a failure is already latched. Returns `true` if it was recorded.
    pub(crate) fn set(&self, error: ShipperError) -> bool {
        self.0.set(error).is_ok()
    }
}

/// Snapshot of the shipment state, returned when the shipper loop terminates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipperState {
    pub next_sequence_token: Option<String>,
    pub permanent_error: Option<ShipperError>,
}

/// Next append cursor plus the terminal failure latch. Owned by the shipper loop.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    next_sequence_token: Option<String>,
    latch: FailureLatch,
}

impl SequenceTracker {
    pub fn new(latch: FailureLatch) -> Self {
        SequenceTracker {
            next_sequence_token: None,
            latch,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.next_sequence_token.as_deref()
    }

    /// Stores the cursor returned by a successful append.
    pub fn advance(&mut self, next_sequence_token: Option<String>) {
        self.next_sequence_token = next_sequence_token;
    }

    pub fn fail(&mut self, error: ShipperError) {
        self.latch.set(error);
    }

    pub fn is_failed(&self) -> bool {
        self.latch.is_set()
    }

    pub fn snapshot(&self) -> ShipperState {
        ShipperState {
            next_sequence_token: self.next_sequence_token.clone(),
            permanent_error: self.latch.get().cloned(),
        }
    }
}
