/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::metrics::{ParseError, ascii_allowed_in_opentsdb, chars_allowed_in_opentsdb};

#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct MetricTagName(SmolStr);

impl MetricTagName {
    /// Build a tag name from a static string.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty or contains chars out of the ASCII OpenTSDB range.
    pub const fn from_static(s: &'static str) -> Self {
        assert!(
            !s.is_empty() && ascii_allowed_in_opentsdb(s),
            "invalid static tag name"
        );
        MetricTagName(SmolStr::new_static(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for MetricTagName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for MetricTagName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        chars_allowed_in_opentsdb(s)?;
        Ok(MetricTagName(s.into()))
    }
}

impl fmt::Display for MetricTagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_metrics_name() {
        assert_eq!(
            MetricTagName::from_str("consumer_group").unwrap(),
            MetricTagName::from_static("consumer_group")
        );

        assert!(MetricTagName::from_str("a=b").is_err());
        assert_eq!(MetricTagName::from_str(""), Err(ParseError::Empty));
    }
}
