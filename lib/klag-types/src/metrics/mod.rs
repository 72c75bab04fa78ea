/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use thiserror::Error;

mod name;
pub use name::MetricName;

mod tag;
pub use tag::{DisplayTagMap, MetricTagMap, MetricTagName, MetricTagValue};

mod value;
pub use value::MetricValue;

mod identity;
pub use identity::MetricIdentity;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty string")]
    Empty,
    #[error("empty node at position {0}")]
    EmptyNode(usize),
    #[error("invalid graphic char: {0}")]
    InvalidGraphic(char),
    #[error("not alpha numeric char")]
    NotAlphaNumeric,
}

fn chars_allowed_in_opentsdb(s: &str) -> Result<(), ParseError> {
    for c in s.chars() {
        // Same character range as OpenTSDB
        // http://opentsdb.net/docs/build/html/user_guide/writing/index.html#metrics-and-tags
        if c.is_ascii() {
            match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '/' => {}
                _ => {
                    return if c.is_ascii_graphic() {
                        Err(ParseError::InvalidGraphic(c))
                    } else {
                        Err(ParseError::NotAlphaNumeric)
                    };
                }
            }
        } else if !c.is_alphanumeric() {
            return Err(ParseError::NotAlphaNumeric);
        }
    }
    Ok(())
}

/// Compile time counterpart of [`chars_allowed_in_opentsdb`], ASCII only.
const fn ascii_allowed_in_opentsdb(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'/' => {}
            _ => return false,
        }
        i += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opentsdb_chars() {
        assert!(chars_allowed_in_opentsdb("klag.consumer-lag_1/x").is_ok());
        assert!(chars_allowed_in_opentsdb("组").is_ok());
        assert_eq!(
            chars_allowed_in_opentsdb("a=b"),
            Err(ParseError::InvalidGraphic('='))
        );
        assert_eq!(
            chars_allowed_in_opentsdb("a b"),
            Err(ParseError::NotAlphaNumeric)
        );
    }

    #[test]
    fn opentsdb_chars_const() {
        assert!(ascii_allowed_in_opentsdb("klag.topic.partitions"));
        assert!(!ascii_allowed_in_opentsdb("klag topic"));
    }
}
