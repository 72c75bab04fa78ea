/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use crate::metrics::{MetricTagName, MetricTagValue};

/// Tag set of a metric. Entries are kept sorted by tag name, so equality and
/// hashing do not depend on insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricTagMap {
    inner: BTreeMap<MetricTagName, MetricTagValue>,
}

impl MetricTagMap {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn insert(&mut self, name: MetricTagName, value: MetricTagValue) -> Option<MetricTagValue> {
        self.inner.insert(name, value)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&MetricTagName, &MetricTagValue)> {
        self.inner.iter()
    }

    pub fn display_statsd(&self) -> DisplayTagMap<'_> {
        DisplayTagMap {
            inner: self,
            assign_delimiter: ':',
            next_delimiter: ',',
        }
    }
}

impl FromIterator<(MetricTagName, MetricTagValue)> for MetricTagMap {
    fn from_iter<T: IntoIterator<Item = (MetricTagName, MetricTagValue)>>(iter: T) -> Self {
        MetricTagMap {
            inner: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for MetricTagMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('{')?;
        self.display_statsd().fmt(f)?;
        f.write_char('}')
    }
}

pub struct DisplayTagMap<'a> {
    inner: &'a MetricTagMap,
    assign_delimiter: char,
    next_delimiter: char,
}

impl fmt::Display for DisplayTagMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.inner.inner.iter();
        let Some((name, value)) = iter.next() else {
            return Ok(());
        };
        f.write_str(name.as_str())?;
        f.write_char(self.assign_delimiter)?;
        f.write_str(value.as_str())?;

        for (name, value) in iter {
            f.write_char(self.next_delimiter)?;
            f.write_str(name.as_str())?;
            f.write_char(self.assign_delimiter)?;
            f.write_str(value.as_str())?;
        }
        Ok(())
    }
}
