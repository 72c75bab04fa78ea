/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use reqwest::header;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::GaugeRegistry;
use crate::error::BackendError;

mod config;
pub use config::DatadogConfig;

mod format;

const MAX_SERIES_PER_REQUEST: usize = 10_000;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

struct FlushTask {
    quit_sender: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Push style backend. Registered gauges are sampled and sent to the Datadog
/// series API once per step.
pub struct DatadogBackend {
    config: DatadogConfig,
    series_url: String,
    client: reqwest::Client,
    registry: GaugeRegistry,
    task: Mutex<Option<FlushTask>>,
}

impl DatadogBackend {
    pub fn new(config: DatadogConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(DatadogBackend {
            series_url: config.series_url(),
            config,
            client,
            registry: GaugeRegistry::default(),
            task: Mutex::new(None),
        })
    }

    #[inline]
    pub fn config(&self) -> &DatadogConfig {
        &self.config
    }

    #[inline]
    pub(super) fn registry(&self) -> &GaugeRegistry {
        &self.registry
    }

    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Spawn the flush task on the current tokio runtime. Does nothing if the
    /// task is already running.
    pub(super) fn start(this: &Arc<Self>) -> Result<(), BackendError> {
        let mut task = this.task.lock().unwrap_or_else(PoisonError::into_inner);
        if this.registry.is_closed() {
            return Err(BackendError::Closed);
        }
        if task.is_some() {
            return Ok(());
        }
        let rt = tokio::runtime::Handle::try_current().map_err(|_| BackendError::NoRuntime)?;

        let (quit_sender, quit_receiver) = oneshot::channel();
        let handle = rt.spawn(run_flush(
            Arc::downgrade(this),
            this.config.step(),
            quit_receiver,
        ));
        *task = Some(FlushTask {
            quit_sender,
            handle,
        });
        info!(
            "datadog metrics backend started, pushing to {} every {:?}",
            this.config.uri(),
            this.config.step()
        );
        Ok(())
    }

    /// Sample all live gauges and send them now.
    pub async fn flush(&self) -> Result<(), BackendError> {
        let samples = self.registry.sample();
        if samples.is_empty() {
            return Ok(());
        }

        let timestamp = Utc::now().timestamp();
        for chunk in samples.chunks(MAX_SERIES_PER_REQUEST) {
            let body = format::series_body(chunk, timestamp);
            let body = serde_json::to_vec(&body)?;
            self.send(body).await?;
        }
        debug!("sent {} series to datadog", samples.len());
        Ok(())
    }

    async fn send(&self, body: Vec<u8>) -> Result<(), BackendError> {
        let mut req = self
            .client
            .post(&self.series_url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("DD-API-KEY", self.config.api_key());
        if let Some(app_key) = self.config.app_key() {
            req = req.header("DD-APPLICATION-KEY", app_key);
        }

        let rsp = req.body(body).send().await?;
        let status = rsp.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = rsp.text().await.unwrap_or_default();
            Err(BackendError::Rejected {
                status: status.as_u16(),
                detail,
            })
        }
    }

    /// Stop the flush task, which sends a last round of samples, then drop
    /// all registrations.
    pub(super) async fn close(&self) -> Result<(), BackendError> {
        let task = {
            let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
            // no start may spawn a new task once this is set
            self.registry.mark_closed();
            task.take()
        };
        if let Some(task) = task {
            info!("closing datadog metrics backend");
            let _ = task.quit_sender.send(());
            if let Err(e) = task.handle.await {
                warn!("datadog flush task exited abnormally: {e}");
            }
        }
        self.registry.close();
        Ok(())
    }
}

async fn run_flush(
    backend: Weak<DatadogBackend>,
    step: Duration,
    mut quit_receiver: oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval(step);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = &mut quit_receiver => break,
            _ = interval.tick() => {
                let Some(backend) = backend.upgrade() else {
                    return;
                };
                if let Err(e) = backend.flush().await {
                    warn!("failed to push metrics to datadog: {e}");
                }
            }
        }
    }

    if let Some(backend) = backend.upgrade() {
        if let Err(e) = backend.flush().await {
            warn!("failed to push final metrics to datadog: {e}");
        }
    }
}
