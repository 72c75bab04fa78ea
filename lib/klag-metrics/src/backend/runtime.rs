/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use log::{debug, info};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::runtime::{Handle, RuntimeMetrics};

use klag_types::metrics::{MetricIdentity, MetricName, MetricValue};

use super::{GaugeFn, GaugeSource, MetricsBackend};
use crate::error::RegistrationError;

const METRIC_NAME_PROCESS_MEMORY_RSS: MetricName = MetricName::from_static("process.memory.rss");
const METRIC_NAME_PROCESS_MEMORY_VIRTUAL: MetricName =
    MetricName::from_static("process.memory.virtual");
const METRIC_NAME_PROCESS_CPU_USAGE: MetricName = MetricName::from_static("process.cpu.usage");
const METRIC_NAME_PROCESS_THREADS_LIVE: MetricName =
    MetricName::from_static("process.threads.live");
const METRIC_NAME_SYSTEM_CPU_COUNT: MetricName = MetricName::from_static("system.cpu.count");

const METRIC_NAME_RUNTIME_TOKIO_WORKERS: MetricName =
    MetricName::from_static("runtime.tokio.workers");
const METRIC_NAME_RUNTIME_TOKIO_ALIVE_TASKS: MetricName =
    MetricName::from_static("runtime.tokio.alive_tasks");
const METRIC_NAME_RUNTIME_TOKIO_GLOBAL_QUEUE_DEPTH: MetricName =
    MetricName::from_static("runtime.tokio.global_queue_depth");

#[derive(Clone, Copy, Default)]
struct ProcessStats {
    rss: u64,
    virtual_memory: u64,
    cpu_usage: f32,
    threads: Option<usize>,
}

struct ProcessSamplerInner {
    system: System,
    last_refresh: Option<Instant>,
    stats: Option<ProcessStats>,
}

/// Shared refresher of the current process stats.
///
/// Several gauges read from one refresh, which is done at most once per
/// [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] so that CPU usage is meaningful.
struct ProcessSampler {
    pid: Pid,
    inner: Mutex<ProcessSamplerInner>,
}

impl ProcessSampler {
    fn new(pid: Pid) -> Self {
        ProcessSampler {
            pid,
            inner: Mutex::new(ProcessSamplerInner {
                system: System::new(),
                last_refresh: None,
                stats: None,
            }),
        }
    }

    fn stats(&self) -> Option<ProcessStats> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = inner
            .last_refresh
            .map(|t| t.elapsed() < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)
            .unwrap_or(false);
        if fresh {
            return inner.stats;
        }

        inner.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        let stats = inner.system.process(self.pid).map(|p| ProcessStats {
            rss: p.memory(),
            virtual_memory: p.virtual_memory(),
            cpu_usage: p.cpu_usage(),
            threads: p.tasks().map(|t| t.len()),
        });
        inner.last_refresh = Some(Instant::now());
        inner.stats = stats;
        stats
    }
}

fn register(
    backend: &MetricsBackend,
    name: MetricName,
    f: GaugeFn,
) -> Result<(), RegistrationError> {
    backend.register_gauge(&MetricIdentity::untagged(name), GaugeSource::Func(f))
}

fn bind_process_metrics(backend: &MetricsBackend) -> Result<(), RegistrationError> {
    let cpu_count = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    register(
        backend,
        METRIC_NAME_SYSTEM_CPU_COUNT,
        Arc::new(move || Some(MetricValue::from(cpu_count))),
    )?;

    let pid = match sysinfo::get_current_pid() {
        Ok(pid) => pid,
        Err(e) => {
            debug!("unable to get current pid, skip process metrics: {e}");
            return Ok(());
        }
    };
    let sampler = Arc::new(ProcessSampler::new(pid));

    let s = sampler.clone();
    register(
        backend,
        METRIC_NAME_PROCESS_MEMORY_RSS,
        Arc::new(move || s.stats().map(|v| MetricValue::Unsigned(v.rss))),
    )?;
    let s = sampler.clone();
    register(
        backend,
        METRIC_NAME_PROCESS_MEMORY_VIRTUAL,
        Arc::new(move || s.stats().map(|v| MetricValue::Unsigned(v.virtual_memory))),
    )?;
    let s = sampler.clone();
    register(
        backend,
        METRIC_NAME_PROCESS_CPU_USAGE,
        Arc::new(move || s.stats().map(|v| MetricValue::from(v.cpu_usage))),
    )?;
    register(
        backend,
        METRIC_NAME_PROCESS_THREADS_LIVE,
        Arc::new(move || {
            sampler
                .stats()
                .and_then(|v| v.threads)
                .map(MetricValue::from)
        }),
    )
}

fn bind_tokio_metrics(
    backend: &MetricsBackend,
    metrics: RuntimeMetrics,
) -> Result<(), RegistrationError> {
    let m = metrics.clone();
    register(
        backend,
        METRIC_NAME_RUNTIME_TOKIO_WORKERS,
        Arc::new(move || Some(MetricValue::from(m.num_workers()))),
    )?;
    let m = metrics.clone();
    register(
        backend,
        METRIC_NAME_RUNTIME_TOKIO_ALIVE_TASKS,
        Arc::new(move || Some(MetricValue::from(m.num_alive_tasks()))),
    )?;
    register(
        backend,
        METRIC_NAME_RUNTIME_TOKIO_GLOBAL_QUEUE_DEPTH,
        Arc::new(move || Some(MetricValue::from(metrics.global_queue_depth()))),
    )
}

/// Bind process and async runtime gauges to the backend.
///
/// Tokio scheduler gauges are only bound when called inside a runtime.
/// Binding the same backend again does nothing, and so does binding a
/// disabled backend.
pub fn bind_runtime_metrics(backend: &MetricsBackend) -> Result<(), RegistrationError> {
    let Some(registry) = backend.registry() else {
        return match backend {
            MetricsBackend::Unavailable { kind, reason } => Err(RegistrationError::Unavailable {
                kind: *kind,
                reason: reason.to_string(),
            }),
            _ => Ok(()),
        };
    };
    if registry.is_closed() {
        return Err(RegistrationError::Closed);
    }
    if !registry.mark_runtime_bound() {
        debug!("runtime metrics already bound to the {} backend", backend.kind());
        return Ok(());
    }

    bind_process_metrics(backend)?;
    match Handle::try_current() {
        Ok(handle) => bind_tokio_metrics(backend, handle.metrics())?,
        Err(_) => debug!("not in a tokio runtime, skip tokio runtime metrics"),
    }
    info!("runtime metrics bound to the {} backend", backend.kind());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::backend::PrometheusBackend;

    #[test]
    fn bind_without_runtime() {
        let prometheus = Arc::new(PrometheusBackend::default());
        let backend = MetricsBackend::Prometheus(prometheus.clone());
        bind_runtime_metrics(&backend).unwrap();
        // cpu count, rss, virtual memory, cpu usage, threads
        assert_eq!(prometheus.registered_count(), 5);

        let text = prometheus.scrape();
        assert!(text.contains("system_cpu_count "));
        assert!(text.contains("process_memory_rss "));
        assert!(!text.contains("runtime_tokio"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bind_in_runtime() {
        let prometheus = Arc::new(PrometheusBackend::default());
        let backend = MetricsBackend::Prometheus(prometheus.clone());
        bind_runtime_metrics(&backend).unwrap();
        assert_eq!(prometheus.registered_count(), 8);

        let text = prometheus.scrape();
        assert!(text.contains("runtime_tokio_workers 2\n"));
        assert!(text.contains("runtime_tokio_global_queue_depth "));
    }

    #[test]
    fn bind_twice() {
        let prometheus = Arc::new(PrometheusBackend::default());
        let backend = MetricsBackend::Prometheus(prometheus.clone());
        bind_runtime_metrics(&backend).unwrap();
        let count = prometheus.registered_count();

        let cloned = backend.clone();
        bind_runtime_metrics(&cloned).unwrap();
        assert_eq!(prometheus.registered_count(), count);
    }

    #[test]
    fn bind_disabled_or_closed() {
        bind_runtime_metrics(&MetricsBackend::Disabled).unwrap();

        let prometheus = Arc::new(PrometheusBackend::default());
        prometheus.close();
        let backend = MetricsBackend::Prometheus(prometheus);
        assert_eq!(
            bind_runtime_metrics(&backend),
            Err(RegistrationError::Closed)
        );
    }

    #[test]
    fn sampler_reuses_refresh() {
        let pid = sysinfo::get_current_pid().unwrap();
        let sampler = ProcessSampler::new(pid);
        let first = sampler.stats().unwrap();
        assert!(first.rss > 0);
        let second = sampler.stats().unwrap();
        assert_eq!(first.rss, second.rss);
    }
}
