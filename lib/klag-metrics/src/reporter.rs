/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};

use klag_types::metrics::{
    MetricIdentity, MetricName, MetricTagMap, MetricTagName, MetricTagValue, MetricValue,
};

use crate::backend::{self, MetricsBackend, bind_runtime_metrics};
use crate::cache::GaugeCache;
use crate::config::{EnvLookup, GroupFilter, MetricsConfig, process_env};
use crate::error::{BackendError, RecordError, ReportError};
use crate::lag::ConsumerGroupLag;

const TAG_KEY_CONSUMER_GROUP: &str = "consumer_group";
const TAG_KEY_TOPIC: &str = "topic";
const TAG_KEY_PARTITION: &str = "partition";

pub const METRIC_NAME_CONSUMER_LAG_SUM: MetricName =
    MetricName::from_static("klag.consumer.lag.sum");
pub const METRIC_NAME_CONSUMER_LAG_MAX: MetricName =
    MetricName::from_static("klag.consumer.lag.max");
pub const METRIC_NAME_CONSUMER_LAG_MIN: MetricName =
    MetricName::from_static("klag.consumer.lag.min");
pub const METRIC_NAME_CONSUMER_LAG: MetricName = MetricName::from_static("klag.consumer.lag");
pub const METRIC_NAME_PARTITION_LOG_END_OFFSET: MetricName =
    MetricName::from_static("klag.partition.log_end_offset");
pub const METRIC_NAME_PARTITION_LOG_START_OFFSET: MetricName =
    MetricName::from_static("klag.partition.log_start_offset");
pub const METRIC_NAME_CONSUMER_COMMITTED_OFFSET: MetricName =
    MetricName::from_static("klag.consumer.committed_offset");
pub const METRIC_NAME_TOPIC_PARTITIONS: MetricName =
    MetricName::from_static("klag.topic.partitions");

/// Turns lag figures into gauges on the shared cache.
///
/// Clones share the same cache and backend.
#[derive(Clone)]
pub struct MetricsReporter {
    cache: Arc<GaugeCache>,
    filter: GroupFilter,
}

impl MetricsReporter {
    pub fn new(backend: MetricsBackend) -> Self {
        MetricsReporter {
            cache: Arc::new(GaugeCache::new(backend)),
            filter: GroupFilter::match_all(),
        }
    }

    pub fn with_group_filter(mut self, filter: GroupFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Build the reporter from the config, reading backend settings from the
    /// process environment. Returns `None` if reporting is disabled.
    pub fn from_config(config: &MetricsConfig) -> Option<Self> {
        Self::from_config_with_env(config, &process_env)
    }

    pub fn from_config_with_env(config: &MetricsConfig, env: EnvLookup<'_>) -> Option<Self> {
        if !config.is_enabled() {
            info!("metrics reporting is disabled");
            return None;
        }

        let backend = backend::create_with_env(config.reporter(), env);
        if backend.is_disabled() {
            return None;
        }
        if config.runtime_metrics() {
            if let Err(e) = bind_runtime_metrics(&backend) {
                warn!("failed to bind runtime metrics: {e}");
            }
        }

        let filter = GroupFilter::new(config.group_filter());
        Some(MetricsReporter::new(backend).with_group_filter(filter))
    }

    #[inline]
    pub fn backend(&self) -> &MetricsBackend {
        self.cache.backend()
    }

    #[inline]
    pub fn cache(&self) -> &GaugeCache {
        &self.cache
    }

    fn record<V>(
        &self,
        name: MetricName,
        tag_map: &MetricTagMap,
        value: V,
        failures: &mut Vec<RecordError>,
    ) where
        V: Into<MetricValue>,
    {
        let identity = MetricIdentity::new(name, tag_map.clone());
        if let Err(e) = self.cache.record_gauge(identity, value) {
            failures.push(e);
        }
    }

    /// Update the lag gauges of all groups accepted by the group filter.
    ///
    /// The whole batch is always processed; the failed updates, if any, are
    /// returned together at the end.
    pub fn report_lag(&self, lag_data: &[ConsumerGroupLag]) -> Result<(), ReportError> {
        debug!("reporting lag metrics for {} consumer groups", lag_data.len());

        let mut failures = Vec::new();
        for group in lag_data {
            if !self.filter.matches(&group.consumer_group) {
                debug!("consumer group {} skipped by filter", group.consumer_group);
                continue;
            }

            let mut group_tags = MetricTagMap::default();
            group_tags.insert(
                MetricTagName::from_static(TAG_KEY_CONSUMER_GROUP),
                MetricTagValue::new(&group.consumer_group),
            );

            self.record(
                METRIC_NAME_CONSUMER_LAG_SUM,
                &group_tags,
                group.total_lag,
                &mut failures,
            );
            self.record(
                METRIC_NAME_CONSUMER_LAG_MAX,
                &group_tags,
                group.max_lag,
                &mut failures,
            );
            self.record(
                METRIC_NAME_CONSUMER_LAG_MIN,
                &group_tags,
                group.min_lag,
                &mut failures,
            );

            for p in &group.partitions {
                let mut tags = group_tags.clone();
                tags.insert(
                    MetricTagName::from_static(TAG_KEY_TOPIC),
                    MetricTagValue::new(&p.topic),
                );
                tags.insert(
                    MetricTagName::from_static(TAG_KEY_PARTITION),
                    MetricTagValue::from_i32(p.partition),
                );

                self.record(METRIC_NAME_CONSUMER_LAG, &tags, p.lag, &mut failures);
                self.record(
                    METRIC_NAME_PARTITION_LOG_END_OFFSET,
                    &tags,
                    p.log_end_offset,
                    &mut failures,
                );
                self.record(
                    METRIC_NAME_PARTITION_LOG_START_OFFSET,
                    &tags,
                    p.log_start_offset,
                    &mut failures,
                );
                self.record(
                    METRIC_NAME_CONSUMER_COMMITTED_OFFSET,
                    &tags,
                    p.committed_offset,
                    &mut failures,
                );
            }
        }
        ReportError::check(failures)
    }

    /// Update the partition count gauge of each topic.
    pub fn report_topic_partitions(
        &self,
        topic_partitions: &HashMap<String, u32>,
    ) -> Result<(), ReportError> {
        let mut failures = Vec::new();
        for (topic, count) in topic_partitions {
            let mut tags = MetricTagMap::default();
            tags.insert(
                MetricTagName::from_static(TAG_KEY_TOPIC),
                MetricTagValue::new(topic),
            );
            self.record(METRIC_NAME_TOPIC_PARTITIONS, &tags, *count, &mut failures);
        }
        ReportError::check(failures)
    }

    pub async fn start(&self) -> Result<(), BackendError> {
        self.backend().start().await?;
        info!("metrics reporter started with the {} backend", self.backend().kind());
        Ok(())
    }

    /// Close the backend, then drop all value holders. Safe to call
    /// repeatedly, and before [`MetricsReporter::start`].
    pub async fn close(&self) -> Result<(), BackendError> {
        info!("closing metrics reporter");
        let r = self.backend().close().await;
        self.cache.clear();
        r
    }
}
