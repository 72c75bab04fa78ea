/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

/// Tag value, taken as is. Escaping is up to each backend encoder.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct MetricTagValue(SmolStr);

impl MetricTagValue {
    #[inline]
    pub fn new(s: &str) -> Self {
        MetricTagValue(SmolStr::new(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn from_i32(v: i32) -> Self {
        let mut buffer = itoa::Buffer::new();
        MetricTagValue(SmolStr::new(buffer.format(v)))
    }
}

impl AsRef<str> for MetricTagValue {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for MetricTagValue {
    fn from(s: &str) -> Self {
        MetricTagValue::new(s)
    }
}

impl FromStr for MetricTagValue {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(MetricTagValue::new(s))
    }
}

impl fmt::Display for MetricTagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
