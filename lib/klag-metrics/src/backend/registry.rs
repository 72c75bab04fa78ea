/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;

use klag_types::metrics::{MetricIdentity, MetricValue};

use super::GaugeSource;
use crate::error::RegistrationError;

pub(crate) struct GaugeSample {
    pub(crate) identity: MetricIdentity,
    pub(crate) value: MetricValue,
}

/// Registrations held by a concrete backend.
///
/// Sources are sampled outside of the lock, and sources whose holder is gone
/// are skipped.
#[derive(Default)]
pub(crate) struct GaugeRegistry {
    closed: AtomicBool,
    runtime_bound: AtomicBool,
    gauges: Mutex<AHashMap<MetricIdentity, GaugeSource>>,
}

impl GaugeRegistry {
    fn lock(&self) -> MutexGuard<'_, AHashMap<MetricIdentity, GaugeSource>> {
        self.gauges.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(
        &self,
        identity: &MetricIdentity,
        source: GaugeSource,
    ) -> Result<(), RegistrationError> {
        let mut ht = self.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(RegistrationError::Closed);
        }
        if ht.contains_key(identity) {
            return Err(RegistrationError::Duplicate(identity.clone()));
        }
        ht.insert(identity.clone(), source);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns true only for the first caller.
    pub(crate) fn mark_runtime_bound(&self) -> bool {
        !self.runtime_bound.swap(true, Ordering::AcqRel)
    }

    /// Read all live sources, sorted by identity.
    pub(crate) fn sample(&self) -> Vec<GaugeSample> {
        let sources: Vec<(MetricIdentity, GaugeSource)> = self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut samples: Vec<GaugeSample> = sources
            .into_iter()
            .filter_map(|(identity, source)| {
                source
                    .sample()
                    .map(|value| GaugeSample { identity, value })
            })
            .collect();
        samples.sort_unstable_by(|a, b| a.identity.cmp(&b.identity));
        samples
    }

    /// Refuse new registrations but keep the existing ones for a last sample.
    pub(crate) fn mark_closed(&self) {
        let _ht = self.lock();
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn close(&self) {
        let mut ht = self.lock();
        self.closed.store(true, Ordering::Release);
        ht.clear();
    }
}
