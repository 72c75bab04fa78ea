/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::fmt;

use thiserror::Error;

use klag_types::metrics::MetricIdentity;

use crate::backend::BackendKind;

/// The backend selector names no supported backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown metrics backend: {0}")]
pub struct UnknownBackend(pub String);

/// A backend refused or could not take a gauge registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("backend already closed")]
    Closed,
    #[error("gauge {0} already registered")]
    Duplicate(MetricIdentity),
    #[error("{kind} backend unavailable: {reason}")]
    Unavailable { kind: BackendKind, reason: String },
}

/// Failure of a single gauge update inside a report batch.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to register gauge {identity}: {source}")]
    Registration {
        identity: MetricIdentity,
        source: RegistrationError,
    },
}

/// Aggregate failure of a report batch. Every entry of the batch has been
/// processed before this is returned.
#[derive(Debug)]
pub struct ReportError {
    failures: Vec<RecordError>,
}

impl ReportError {
    pub(crate) fn check(failures: Vec<RecordError>) -> Result<(), ReportError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReportError { failures })
        }
    }

    pub fn failures(&self) -> &[RecordError] {
        &self.failures
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} gauge update(s) failed", self.failures.len())?;
        if let Some(first) = self.failures.first() {
            write!(f, ", first error: {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ReportError {}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{kind} backend unavailable: {reason}")]
    Unavailable { kind: BackendKind, reason: String },
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
    #[error("backend already closed")]
    Closed,
    #[error("no tokio runtime to spawn the flush task")]
    NoRuntime,
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("error response: {status} {detail}")]
    Rejected { status: u16, detail: String },
}
