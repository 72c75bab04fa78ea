/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use super::{ParseError, ascii_allowed_in_opentsdb, chars_allowed_in_opentsdb};

/// Hierarchical metric name, with nodes joined by `.`, e.g. `klag.consumer.lag.sum`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricName(SmolStr);

impl MetricName {
    /// Build a name from a static string.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty, has an empty node or contains chars out of
    /// the ASCII OpenTSDB range. In const context this is a compile error.
    pub const fn from_static(s: &'static str) -> Self {
        assert!(
            ascii_allowed_in_opentsdb(s) && Self::nodes_not_empty(s),
            "invalid static metric name"
        );
        MetricName(SmolStr::new_static(s))
    }

    const fn nodes_not_empty(s: &str) -> bool {
        let b = s.as_bytes();
        if b.is_empty() || b[0] == b'.' || b[b.len() - 1] == b'.' {
            return false;
        }
        let mut i = 1;
        while i < b.len() {
            if b[i] == b'.' && b[i - 1] == b'.' {
                return false;
            }
            i += 1;
        }
        true
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for MetricName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        for (i, node) in s.split('.').enumerate() {
            if node.is_empty() {
                return Err(ParseError::EmptyNode(i));
            }
        }
        chars_allowed_in_opentsdb(s)?;
        Ok(MetricName(s.into()))
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAG_SUM: MetricName = MetricName::from_static("klag.consumer.lag.sum");

    #[test]
    fn parse() {
        let name = MetricName::from_str("klag.consumer.lag").unwrap();
        assert_eq!(name.as_str(), "klag.consumer.lag");

        assert_eq!(MetricName::from_str(""), Err(ParseError::Empty));
        assert_eq!(MetricName::from_str("a..b"), Err(ParseError::EmptyNode(1)));
        assert_eq!(MetricName::from_str(".a"), Err(ParseError::EmptyNode(0)));
        assert!(MetricName::from_str("a=b").is_err());
    }

    #[test]
    fn static_name() {
        assert_eq!(LAG_SUM.as_str(), "klag.consumer.lag.sum");
        assert_eq!(LAG_SUM, MetricName::from_str("klag.consumer.lag.sum").unwrap());
    }

    #[test]
    #[should_panic]
    fn static_name_invalid() {
        let _ = MetricName::from_static("klag..lag");
    }
}
