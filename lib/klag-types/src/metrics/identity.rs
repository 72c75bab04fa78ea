/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::fmt;

use crate::metrics::{MetricName, MetricTagMap, MetricTagName, MetricTagValue};

/// The (name, tag set) pair that names a single time series.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricIdentity {
    name: MetricName,
    tag_map: MetricTagMap,
}

impl MetricIdentity {
    pub fn new(name: MetricName, tag_map: MetricTagMap) -> Self {
        MetricIdentity { name, tag_map }
    }

    pub fn untagged(name: MetricName) -> Self {
        MetricIdentity {
            name,
            tag_map: MetricTagMap::default(),
        }
    }

    pub fn with_tag(mut self, name: MetricTagName, value: MetricTagValue) -> Self {
        self.tag_map.insert(name, value);
        self
    }

    #[inline]
    pub fn name(&self) -> &MetricName {
        &self.name
    }

    #[inline]
    pub fn tag_map(&self) -> &MetricTagMap {
        &self.tag_map
    }
}

impl fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.tag_map)
    }
}
