/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

mod backend;
pub use backend::{
    BackendKind, DatadogBackend, DatadogConfig, GaugeFn, GaugeSource, MetricsBackend,
    PrometheusBackend, bind_runtime_metrics, create, create_with_env,
};

mod cache;
pub use cache::{GaugeCache, GaugeCell};

mod config;
pub use config::{EnvLookup, GroupFilter, MetricsConfig};

mod error;
pub use error::{BackendError, RecordError, RegistrationError, ReportError, UnknownBackend};

mod lag;
pub use lag::{ConsumerGroupLag, PartitionLag};

mod reporter;
pub use reporter::*;
