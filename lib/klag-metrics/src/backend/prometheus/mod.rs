/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::sync::Arc;

use log::{info, warn};
use prometheus_client::registry::Registry;

use super::GaugeRegistry;

mod collector;
use collector::GaugeCollector;

/// Pull style backend. Registered gauges are only read when scraped.
pub struct PrometheusBackend {
    registry: Arc<GaugeRegistry>,
    exposition: Registry,
}

impl Default for PrometheusBackend {
    fn default() -> Self {
        let registry = Arc::new(GaugeRegistry::default());
        let mut exposition = Registry::default();
        exposition.register_collector(Box::new(GaugeCollector::new(registry.clone())));
        PrometheusBackend {
            registry,
            exposition,
        }
    }
}

impl PrometheusBackend {
    #[inline]
    pub(super) fn registry(&self) -> &GaugeRegistry {
        &self.registry
    }

    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Render all live gauges in the Prometheus text exposition format.
    pub fn scrape(&self) -> String {
        let mut buf = String::with_capacity(self.registry.len() * 128 + 8);
        if let Err(e) = prometheus_client::encoding::text::encode(&mut buf, &self.exposition) {
            warn!("failed to encode prometheus metrics: {e}");
        }
        buf
    }

    pub(crate) fn close(&self) {
        if !self.registry.is_closed() {
            info!("closing prometheus metrics backend");
            self.registry.close();
        }
    }
}
