/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::fmt;
use std::sync::{Arc, Weak};

use log::{error, info, warn};

use klag_types::metrics::{MetricIdentity, MetricValue};

use crate::cache::GaugeCell;
use crate::config::{EnvLookup, process_env};
use crate::error::{BackendError, RegistrationError, UnknownBackend};

mod registry;
use registry::{GaugeRegistry, GaugeSample};

mod datadog;
pub use datadog::{DatadogBackend, DatadogConfig};

mod prometheus;
pub use prometheus::PrometheusBackend;

mod runtime;
pub use runtime::bind_runtime_metrics;

pub type GaugeFn = Arc<dyn Fn() -> Option<MetricValue> + Send + Sync>;

/// What a backend keeps for a registered gauge. It never owns the holder.
#[derive(Clone)]
pub enum GaugeSource {
    Cell(Weak<GaugeCell>),
    Func(GaugeFn),
}

impl GaugeSource {
    pub(crate) fn sample(&self) -> Option<MetricValue> {
        match self {
            GaugeSource::Cell(cell) => cell.upgrade().map(|cell| cell.get()),
            GaugeSource::Func(f) => f(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Datadog,
    Prometheus,
    Disabled,
}

impl BackendKind {
    /// Case-insensitive match of the backend selector. Blank selectors and
    /// `none` select [`BackendKind::Disabled`].
    pub fn from_selector(selector: &str) -> Result<Self, UnknownBackend> {
        let selector = selector.trim();
        if selector.is_empty() || selector.eq_ignore_ascii_case("none") {
            Ok(BackendKind::Disabled)
        } else if selector.eq_ignore_ascii_case("datadog") {
            Ok(BackendKind::Datadog)
        } else if selector.eq_ignore_ascii_case("prometheus") {
            Ok(BackendKind::Prometheus)
        } else {
            Err(UnknownBackend(selector.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Datadog => "datadog",
            BackendKind::Prometheus => "prometheus",
            BackendKind::Disabled => "none",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to the active metrics backend. Cloning shares the same backend.
#[derive(Clone)]
pub enum MetricsBackend {
    /// push style, flushed on its own timer
    Datadog(Arc<DatadogBackend>),
    /// pull style, sampled on scrape
    Prometheus(Arc<PrometheusBackend>),
    Disabled,
    /// the selected backend failed to construct
    Unavailable { kind: BackendKind, reason: Arc<str> },
}

impl MetricsBackend {
    pub fn kind(&self) -> BackendKind {
        match self {
            MetricsBackend::Datadog(_) => BackendKind::Datadog,
            MetricsBackend::Prometheus(_) => BackendKind::Prometheus,
            MetricsBackend::Disabled => BackendKind::Disabled,
            MetricsBackend::Unavailable { kind, .. } => *kind,
        }
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        matches!(self, MetricsBackend::Disabled)
    }

    fn registry(&self) -> Option<&GaugeRegistry> {
        match self {
            MetricsBackend::Datadog(b) => Some(b.registry()),
            MetricsBackend::Prometheus(b) => Some(b.registry()),
            MetricsBackend::Disabled | MetricsBackend::Unavailable { .. } => None,
        }
    }

    fn unavailable_error(&self) -> Option<BackendError> {
        match self {
            MetricsBackend::Unavailable { kind, reason } => Some(BackendError::Unavailable {
                kind: *kind,
                reason: reason.to_string(),
            }),
            _ => None,
        }
    }

    /// Register a gauge source under the identity. Each identity can be
    /// registered only once per backend.
    pub fn register_gauge(
        &self,
        identity: &MetricIdentity,
        source: GaugeSource,
    ) -> Result<(), RegistrationError> {
        match self {
            MetricsBackend::Datadog(b) => b.registry().register(identity, source),
            MetricsBackend::Prometheus(b) => b.registry().register(identity, source),
            MetricsBackend::Disabled => Ok(()),
            MetricsBackend::Unavailable { kind, reason } => Err(RegistrationError::Unavailable {
                kind: *kind,
                reason: reason.to_string(),
            }),
        }
    }

    pub async fn start(&self) -> Result<(), BackendError> {
        if let Some(e) = self.unavailable_error() {
            return Err(e);
        }
        match self {
            MetricsBackend::Datadog(b) => DatadogBackend::start(b),
            _ => Ok(()),
        }
    }

    /// Flush and release the backend. Safe to call repeatedly, and before
    /// [`MetricsBackend::start`].
    pub async fn close(&self) -> Result<(), BackendError> {
        if let Some(e) = self.unavailable_error() {
            return Err(e);
        }
        match self {
            MetricsBackend::Datadog(b) => b.close().await,
            MetricsBackend::Prometheus(b) => {
                b.close();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Create the backend selected by `selector`, reading backend settings from
/// the process environment.
pub fn create(selector: &str) -> MetricsBackend {
    create_with_env(selector, &process_env)
}

pub fn create_with_env(selector: &str, env: EnvLookup<'_>) -> MetricsBackend {
    let kind = match BackendKind::from_selector(selector) {
        Ok(kind) => kind,
        Err(e) => {
            warn!("{e}, metrics reporting is disabled");
            return MetricsBackend::Disabled;
        }
    };

    match kind {
        BackendKind::Datadog => {
            info!("creating datadog metrics backend");
            match DatadogConfig::from_env(env).and_then(DatadogBackend::new) {
                Ok(backend) => MetricsBackend::Datadog(Arc::new(backend)),
                Err(e) => {
                    error!("failed to create datadog metrics backend: {e}");
                    MetricsBackend::Unavailable {
                        kind,
                        reason: e.to_string().into(),
                    }
                }
            }
        }
        BackendKind::Prometheus => {
            info!("creating prometheus metrics backend");
            MetricsBackend::Prometheus(Arc::new(PrometheusBackend::default()))
        }
        BackendKind::Disabled => MetricsBackend::Disabled,
    }
}
