/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::time::Duration;

use crate::config::{EnvLookup, env_interval_ms, env_string};
use crate::error::BackendError;

const ENV_KEY_API_KEY: &str = "DD_API_KEY";
const ENV_KEY_APP_KEY: &str = "DD_APP_KEY";
const ENV_KEY_SITE: &str = "DD_SITE";

const DEFAULT_SITE: &str = "datadoghq.com";

#[derive(Clone)]
pub struct DatadogConfig {
    api_key: String,
    app_key: Option<String>,
    uri: String,
    step: Duration,
}

impl DatadogConfig {
    pub fn new(api_key: String) -> Self {
        DatadogConfig {
            api_key,
            app_key: None,
            uri: site_uri(DEFAULT_SITE),
            step: Duration::from_millis(crate::config::DEFAULT_INTERVAL_MS),
        }
    }

    /// Read `DD_API_KEY`, `DD_APP_KEY` and `DD_SITE`. The push step follows
    /// the metrics collection interval.
    pub fn from_env(env: EnvLookup<'_>) -> Result<Self, BackendError> {
        let api_key =
            env_string(env, ENV_KEY_API_KEY).ok_or(BackendError::MissingSetting(ENV_KEY_API_KEY))?;

        let mut config = DatadogConfig::new(api_key.trim().to_string());
        config.app_key = env_string(env, ENV_KEY_APP_KEY).map(|s| s.trim().to_string());
        if let Some(site) = env_string(env, ENV_KEY_SITE) {
            let site = site.trim();
            if site.contains(|c: char| c == '/' || c.is_whitespace()) {
                return Err(BackendError::InvalidSetting {
                    key: ENV_KEY_SITE,
                    reason: format!("'{site}' is not a host name"),
                });
            }
            config.uri = site_uri(site);
        }
        config.step = Duration::from_millis(env_interval_ms(env));
        Ok(config)
    }

    pub fn with_app_key(mut self, app_key: String) -> Self {
        self.app_key = Some(app_key);
        self
    }

    pub fn with_uri(mut self, uri: String) -> Self {
        self.uri = uri;
        self
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    #[inline]
    pub(super) fn api_key(&self) -> &str {
        &self.api_key
    }

    #[inline]
    pub(super) fn app_key(&self) -> Option<&str> {
        self.app_key.as_deref()
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn step(&self) -> Duration {
        self.step
    }

    pub(super) fn series_url(&self) -> String {
        format!("{}/api/v1/series", self.uri.trim_end_matches('/'))
    }
}

fn site_uri(site: &str) -> String {
    format!("https://api.{site}")
}
