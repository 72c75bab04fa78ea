/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, warn};

use klag_types::metrics::{MetricIdentity, MetricValue};

use crate::backend::{GaugeSource, MetricsBackend};
use crate::error::RecordError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ValueKind {
    Double,
    Signed,
    Unsigned,
}

/// The mutable value holder of one gauge.
///
/// The numeric kind is fixed by the first value, later values are converted
/// to it. Reads and writes are single atomic operations.
#[derive(Debug)]
pub struct GaugeCell {
    kind: ValueKind,
    bits: AtomicU64,
}

impl GaugeCell {
    pub(crate) fn new(value: MetricValue) -> Self {
        let kind = match value {
            MetricValue::Double(_) => ValueKind::Double,
            MetricValue::Signed(_) => ValueKind::Signed,
            MetricValue::Unsigned(_) => ValueKind::Unsigned,
        };
        GaugeCell {
            kind,
            bits: AtomicU64::new(Self::encode(kind, value)),
        }
    }

    fn encode(kind: ValueKind, value: MetricValue) -> u64 {
        match kind {
            ValueKind::Double => value.as_f64().to_bits(),
            ValueKind::Signed => {
                let v = match value {
                    MetricValue::Signed(i) => i,
                    MetricValue::Unsigned(u) => i64::try_from(u).unwrap_or(i64::MAX),
                    MetricValue::Double(f) => f as i64,
                };
                v as u64
            }
            ValueKind::Unsigned => match value {
                MetricValue::Unsigned(u) => u,
                MetricValue::Signed(i) => u64::try_from(i).unwrap_or(0),
                MetricValue::Double(f) => f as u64,
            },
        }
    }

    pub fn get(&self) -> MetricValue {
        let bits = self.bits.load(Ordering::Relaxed);
        match self.kind {
            ValueKind::Double => MetricValue::Double(f64::from_bits(bits)),
            ValueKind::Signed => MetricValue::Signed(bits as i64),
            ValueKind::Unsigned => MetricValue::Unsigned(bits),
        }
    }

    fn set(&self, value: MetricValue) {
        self.bits
            .store(Self::encode(self.kind, value), Ordering::Relaxed);
    }
}

/// Identity to value holder map shared by all report calls.
///
/// The cache is the only owner of the holders. Backends get a [`Weak`]
/// reference at registration time, so holders stay readable for exactly as
/// long as the cache keeps them.
///
/// [`Weak`]: std::sync::Weak
pub struct GaugeCache {
    backend: MetricsBackend,
    gauges: DashMap<MetricIdentity, Arc<GaugeCell>, RandomState>,
}

impl GaugeCache {
    pub fn new(backend: MetricsBackend) -> Self {
        GaugeCache {
            backend,
            gauges: DashMap::with_hasher(RandomState::new()),
        }
    }

    #[inline]
    pub fn backend(&self) -> &MetricsBackend {
        &self.backend
    }

    /// Set the value of the gauge, creating and registering it on first use.
    ///
    /// Creation and registration happen while the map entry is locked, so a
    /// concurrent caller with the same identity waits and then only updates
    /// the value. When the backend rejects the registration the holder is
    /// kept and updated locally and the error is returned.
    pub fn record_gauge<V>(&self, identity: MetricIdentity, value: V) -> Result<(), RecordError>
    where
        V: Into<MetricValue>,
    {
        let value = value.into();
        match self.gauges.entry(identity) {
            Entry::Occupied(entry) => {
                entry.get().set(value);
                Ok(())
            }
            Entry::Vacant(entry) => {
                let cell = Arc::new(GaugeCell::new(value));
                let r = self
                    .backend
                    .register_gauge(entry.key(), GaugeSource::Cell(Arc::downgrade(&cell)));
                let r = match r {
                    Ok(_) => {
                        debug!("registered gauge {}", entry.key());
                        Ok(())
                    }
                    Err(e) => {
                        warn!("failed to register gauge {}: {e}", entry.key());
                        Err(RecordError::Registration {
                            identity: entry.key().clone(),
                            source: e,
                        })
                    }
                };
                entry.insert(cell);
                r
            }
        }
    }

    pub fn get(&self, identity: &MetricIdentity) -> Option<MetricValue> {
        self.gauges.get(identity).map(|cell| cell.get())
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    /// Drop all holders. Backend registrations become dead references.
    pub fn clear(&self) {
        self.gauges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    use klag_types::metrics::{MetricName, MetricTagName, MetricTagValue};

    use crate::backend::PrometheusBackend;
    use crate::error::RegistrationError;

    const LAG: MetricName = MetricName::from_static("klag.consumer.lag");
    const GROUP: MetricTagName = MetricTagName::from_static("consumer_group");
    const TOPIC: MetricTagName = MetricTagName::from_static("topic");

    fn lag_identity(group: &str, topic: &str) -> MetricIdentity {
        MetricIdentity::untagged(LAG)
            .with_tag(GROUP, MetricTagValue::new(group))
            .with_tag(TOPIC, MetricTagValue::new(topic))
    }

    fn prometheus_cache() -> (Arc<PrometheusBackend>, GaugeCache) {
        let backend = Arc::new(PrometheusBackend::default());
        let cache = GaugeCache::new(MetricsBackend::Prometheus(backend.clone()));
        (backend, cache)
    }

    #[test]
    fn cell_kind_fixed() {
        let cell = GaugeCell::new(MetricValue::Signed(5));
        cell.set(MetricValue::Double(7.9));
        assert_eq!(cell.get(), MetricValue::Signed(7));
        cell.set(MetricValue::Unsigned(u64::MAX));
        assert_eq!(cell.get(), MetricValue::Signed(i64::MAX));
        cell.set(MetricValue::Signed(-3));
        assert_eq!(cell.get(), MetricValue::Signed(-3));

        let cell = GaugeCell::new(MetricValue::Unsigned(1));
        cell.set(MetricValue::Signed(-1));
        assert_eq!(cell.get(), MetricValue::Unsigned(0));

        let cell = GaugeCell::new(MetricValue::Double(0.5));
        cell.set(MetricValue::Signed(-2));
        assert_eq!(cell.get(), MetricValue::Double(-2.0));
    }

    #[test]
    fn register_once() {
        let (backend, cache) = prometheus_cache();
        let id = lag_identity("billing", "orders");
        for v in 1..=10i64 {
            cache.record_gauge(id.clone(), v).unwrap();
        }
        assert_eq!(cache.len(), 1);
        assert_eq!(backend.registered_count(), 1);
        assert_eq!(cache.get(&id), Some(MetricValue::Signed(10)));
    }

    #[test]
    fn tag_order_shares_holder() {
        let (backend, cache) = prometheus_cache();
        let a = MetricIdentity::untagged(LAG)
            .with_tag(GROUP, MetricTagValue::new("billing"))
            .with_tag(TOPIC, MetricTagValue::new("orders"));
        let b = MetricIdentity::untagged(LAG)
            .with_tag(TOPIC, MetricTagValue::new("orders"))
            .with_tag(GROUP, MetricTagValue::new("billing"));

        cache.record_gauge(a.clone(), 1i64).unwrap();
        cache.record_gauge(b, 2i64).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(backend.registered_count(), 1);
        assert_eq!(cache.get(&a), Some(MetricValue::Signed(2)));
    }

    #[test]
    fn concurrent_distinct() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        let (backend, cache) = prometheus_cache();
        let cache = Arc::new(cache);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    // every thread walks all identities, in a different order
                    for i in 0..THREADS * PER_THREAD {
                        let n = (i + t * PER_THREAD) % (THREADS * PER_THREAD);
                        let id = lag_identity("billing", &format!("topic-{n}"));
                        cache.record_gauge(id, n as i64).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(cache.len(), THREADS * PER_THREAD);
        assert_eq!(backend.registered_count(), THREADS * PER_THREAD);
        let id = lag_identity("billing", "topic-7");
        assert_eq!(cache.get(&id), Some(MetricValue::Signed(7)));
    }

    #[test]
    fn concurrent_same_identity() {
        const THREADS: usize = 16;

        let (backend, cache) = prometheus_cache();
        let cache = Arc::new(cache);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache.record_gauge(lag_identity("billing", "orders"), t as i64)
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }

        assert_eq!(cache.len(), 1);
        assert_eq!(backend.registered_count(), 1);
    }

    #[test]
    fn registration_failure_keeps_holder() {
        let (backend, cache) = prometheus_cache();
        backend.close();

        let id = lag_identity("billing", "orders");
        let err = cache.record_gauge(id.clone(), 3i64).unwrap_err();
        match err {
            RecordError::Registration { identity, source } => {
                assert_eq!(identity, id);
                assert_eq!(source, RegistrationError::Closed);
            }
            e => panic!("unexpected error: {e}"),
        }
        assert_eq!(cache.get(&id), Some(MetricValue::Signed(3)));

        // updates stay local and are not registered again
        cache.record_gauge(id.clone(), 4i64).unwrap();
        assert_eq!(cache.get(&id), Some(MetricValue::Signed(4)));
        assert_eq!(backend.registered_count(), 0);
    }

    #[test]
    fn clear_drops_holders() {
        let (backend, cache) = prometheus_cache();
        cache
            .record_gauge(lag_identity("billing", "orders"), 3i64)
            .unwrap();
        assert!(backend.scrape().contains("klag_consumer_lag"));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(backend.registered_count(), 1);
        assert!(!backend.scrape().contains("klag_consumer_lag"));
    }

    #[test]
    fn disabled_backend() {
        let cache = GaugeCache::new(MetricsBackend::Disabled);
        let id = lag_identity("billing", "orders");
        cache.record_gauge(id.clone(), 1i64).unwrap();
        assert_eq!(cache.get(&id), Some(MetricValue::Signed(1)));
    }
}
