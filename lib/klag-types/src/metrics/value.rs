/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::fmt;

use serde_json::Number;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Double(f64),
    Signed(i64),
    Unsigned(u64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Double(f) => *f,
            MetricValue::Signed(i) => *i as f64,
            MetricValue::Unsigned(u) => *u as f64,
        }
    }

    /// Returns `None` for NaN and infinite values, which JSON can not carry.
    pub fn as_json_number(&self) -> Option<Number> {
        match self {
            MetricValue::Double(f) => Number::from_f64(*f),
            MetricValue::Signed(i) => Some(Number::from(*i)),
            MetricValue::Unsigned(u) => Some(Number::from(*u)),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Signed(value)
    }
}

impl From<i32> for MetricValue {
    fn from(value: i32) -> Self {
        MetricValue::Signed(value.into())
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Unsigned(value)
    }
}

impl From<u32> for MetricValue {
    fn from(value: u32) -> Self {
        MetricValue::Unsigned(value.into())
    }
}

impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        MetricValue::Unsigned(value as u64)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Double(value)
    }
}

impl From<f32> for MetricValue {
    fn from(value: f32) -> Self {
        MetricValue::Double(value.into())
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Unsigned(u) => itoa::Buffer::new().format(*u).fmt(f),
            MetricValue::Signed(i) => itoa::Buffer::new().format(*i).fmt(f),
            MetricValue::Double(v) => ryu::Buffer::new().format(*v).fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(MetricValue::Unsigned(10).to_string(), "10");
        assert_eq!(MetricValue::Signed(-10).to_string(), "-10");
        assert_eq!(MetricValue::Double(1.5).to_string(), "1.5");
        assert_eq!(MetricValue::Signed(i64::MAX).to_string(), "9223372036854775807");
    }

    #[test]
    fn json_number() {
        assert_eq!(
            MetricValue::Signed(120).as_json_number(),
            Some(Number::from(120))
        );
        assert!(MetricValue::Double(f64::NAN).as_json_number().is_none());
        assert!(MetricValue::Double(f64::INFINITY).as_json_number().is_none());
    }

    #[test]
    fn conversion() {
        assert_eq!(MetricValue::from(-3i32), MetricValue::Signed(-3));
        assert_eq!(MetricValue::from(3u32), MetricValue::Unsigned(3));
        assert_eq!(MetricValue::from(0.25f32), MetricValue::Double(0.25));
        assert_eq!(MetricValue::Unsigned(7).as_f64(), 7.0);
    }
}
