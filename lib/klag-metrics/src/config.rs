/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::str::FromStr;
use std::time::Duration;

use log::{debug, warn};
use regex::Regex;

pub(crate) const ENV_KEY_REPORTER: &str = "METRICS_REPORTER";
pub(crate) const ENV_KEY_INTERVAL_MS: &str = "METRICS_INTERVAL_MS";
pub(crate) const ENV_KEY_GROUP_FILTER: &str = "METRICS_GROUP_FILTER";
pub(crate) const ENV_KEY_RUNTIME_ENABLED: &str = "METRICS_RUNTIME_ENABLED";

const DEFAULT_REPORTER: &str = "none";
pub(crate) const DEFAULT_INTERVAL_MS: u64 = 60_000;
const DEFAULT_GROUP_FILTER: &str = "*";
const DEFAULT_RUNTIME_ENABLED: bool = false;

/// Source of environment style key/value settings.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub(crate) fn env_string(env: EnvLookup<'_>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_parse<T: FromStr>(env: EnvLookup<'_>, key: &str, default: T) -> T {
    let Some(value) = env_string(env, key) else {
        return default;
    };
    match T::from_str(value.trim()) {
        Ok(v) => v,
        Err(_) => {
            debug!("invalid value '{value}' for {key}, use default");
            default
        }
    }
}

pub(crate) fn env_interval_ms(env: EnvLookup<'_>) -> u64 {
    match env_parse(env, ENV_KEY_INTERVAL_MS, DEFAULT_INTERVAL_MS) {
        0 => {
            debug!("zero value for {ENV_KEY_INTERVAL_MS}, use default");
            DEFAULT_INTERVAL_MS
        }
        n => n,
    }
}

fn env_bool(env: EnvLookup<'_>, key: &str, default: bool) -> bool {
    let Some(value) = env_string(env, key) else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => true,
        "false" | "no" | "off" | "0" => false,
        _ => {
            debug!("invalid boolean value '{value}' for {key}, use default");
            default
        }
    }
}

/// Reporting settings, loaded once at startup.
///
/// Loading never fails: absent, blank or unparsable values fall back to the
/// defaults so that metrics can never prevent the host from starting.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    reporter: String,
    collection_interval_ms: u64,
    group_filter: String,
    runtime_metrics: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            reporter: DEFAULT_REPORTER.to_string(),
            collection_interval_ms: DEFAULT_INTERVAL_MS,
            group_filter: DEFAULT_GROUP_FILTER.to_string(),
            runtime_metrics: DEFAULT_RUNTIME_ENABLED,
        }
    }
}

impl MetricsConfig {
    /// Load from the process environment.
    pub fn load() -> Self {
        Self::load_from(&process_env)
    }

    pub fn load_from(env: EnvLookup<'_>) -> Self {
        MetricsConfig {
            reporter: env_string(env, ENV_KEY_REPORTER)
                .unwrap_or_else(|| DEFAULT_REPORTER.to_string()),
            collection_interval_ms: env_interval_ms(env),
            group_filter: env_string(env, ENV_KEY_GROUP_FILTER)
                .unwrap_or_else(|| DEFAULT_GROUP_FILTER.to_string()),
            runtime_metrics: env_bool(env, ENV_KEY_RUNTIME_ENABLED, DEFAULT_RUNTIME_ENABLED),
        }
    }

    #[inline]
    pub fn reporter(&self) -> &str {
        &self.reporter
    }

    #[inline]
    pub fn collection_interval_ms(&self) -> u64 {
        self.collection_interval_ms
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_millis(self.collection_interval_ms)
    }

    #[inline]
    pub fn group_filter(&self) -> &str {
        &self.group_filter
    }

    #[inline]
    pub fn runtime_metrics(&self) -> bool {
        self.runtime_metrics
    }

    /// False when the backend selector is blank or `none`.
    pub fn is_enabled(&self) -> bool {
        let reporter = self.reporter.trim();
        !reporter.is_empty() && !reporter.eq_ignore_ascii_case(DEFAULT_REPORTER)
    }
}

/// Consumer group filter built from a comma separated list of globs.
///
/// `*` matches any run of chars and `?` matches a single char. A blank
/// pattern matches every group.
#[derive(Clone, Debug)]
pub struct GroupFilter {
    regex: Option<Regex>,
}

impl GroupFilter {
    pub fn match_all() -> Self {
        GroupFilter { regex: None }
    }

    pub fn new(pattern: &str) -> Self {
        let globs: Vec<&str> = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if globs.is_empty() || globs.contains(&"*") {
            return GroupFilter::match_all();
        }

        let mut s = String::with_capacity(pattern.len() * 2 + 8);
        s.push_str("^(?:");
        for (i, glob) in globs.iter().enumerate() {
            if i > 0 {
                s.push('|');
            }
            for c in glob.chars() {
                match c {
                    '*' => s.push_str(".*"),
                    '?' => s.push('.'),
                    _ => {
                        let mut buf = [0u8; 4];
                        s.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                    }
                }
            }
        }
        s.push_str(")$");

        match Regex::new(&s) {
            Ok(regex) => GroupFilter { regex: Some(regex) },
            Err(e) => {
                warn!("invalid consumer group filter '{pattern}': {e}, all groups will be reported");
                GroupFilter::match_all()
            }
        }
    }

    pub fn matches(&self, group: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(group),
            None => true,
        }
    }
}

impl Default for GroupFilter {
    fn default() -> Self {
        GroupFilter::match_all()
    }
}
