/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use std::fmt;
use std::sync::Arc;

use prometheus_client::collector::Collector;
use prometheus_client::encoding::{DescriptorEncoder, EncodeMetric, MetricEncoder};
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::gauge::ConstGauge;

use klag_types::metrics::{MetricTagMap, MetricValue};

use crate::backend::GaugeRegistry;

/// Exposes the registered gauges as constant gauges, sampled on each encode.
pub(super) struct GaugeCollector {
    registry: Arc<GaugeRegistry>,
}

impl GaugeCollector {
    pub(super) fn new(registry: Arc<GaugeRegistry>) -> Self {
        GaugeCollector { registry }
    }
}

impl fmt::Debug for GaugeCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaugeCollector")
            .field("registered", &self.registry.len())
            .finish()
    }
}

impl Collector for GaugeCollector {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        let samples = self.registry.sample();
        // samples are sorted, so each name is a contiguous run
        for group in samples.chunk_by(|a, b| a.identity.name() == b.identity.name()) {
            let name = group[0].identity.name();
            let metric_name = sanitize(name.as_str(), true);
            let mut metric_encoder =
                encoder.encode_descriptor(&metric_name, name.as_str(), None, MetricType::Gauge)?;
            match group {
                [sample] if sample.identity.tag_map().is_empty() => {
                    encode_value(sample.value, metric_encoder)?;
                }
                _ => {
                    for sample in group {
                        let labels = labels(sample.identity.tag_map());
                        encode_value(sample.value, metric_encoder.encode_family(&labels)?)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn encode_value(value: MetricValue, encoder: MetricEncoder<'_>) -> Result<(), fmt::Error> {
    match value {
        MetricValue::Signed(v) => ConstGauge::new(v).encode(encoder),
        MetricValue::Unsigned(v) => match i64::try_from(v) {
            Ok(v) => ConstGauge::new(v).encode(encoder),
            Err(_) => ConstGauge::new(v as f64).encode(encoder),
        },
        MetricValue::Double(v) => ConstGauge::new(v).encode(encoder),
    }
}

fn labels(tag_map: &MetricTagMap) -> Vec<(String, String)> {
    tag_map
        .iter()
        .map(|(k, v)| (sanitize(k.as_str(), false), escape_label_value(v.as_str())))
        .collect()
}

/// Map to `[a-zA-Z_:][a-zA-Z0-9_:]*`, colons only allowed in metric names.
fn sanitize(s: &str, allow_colon: bool) -> String {
    let mut buf = String::with_capacity(s.len() + 1);
    for (i, c) in s.chars().enumerate() {
        let keep = c.is_ascii_alphabetic()
            || c == '_'
            || (allow_colon && c == ':')
            || (i > 0 && c.is_ascii_digit());
        if keep {
            buf.push(c);
        } else if i == 0 && c.is_ascii_digit() {
            buf.push('_');
            buf.push(c);
        } else {
            buf.push('_');
        }
    }
    buf
}

// label values are written as is by the text encoder
fn escape_label_value(value: &str) -> String {
    let mut buf = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => buf.push_str("\\\\"),
            '"' => buf.push_str("\\\""),
            '\n' => buf.push_str("\\n"),
            _ => buf.push(c),
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    use klag_types::metrics::{MetricIdentity, MetricName, MetricTagName, MetricTagValue};
    use prometheus_client::registry::Registry;

    use crate::backend::GaugeSource;

    fn register(
        registry: &GaugeRegistry,
        name: &'static str,
        tags: &[(&'static str, &str)],
        value: MetricValue,
    ) {
        let mut identity = MetricIdentity::untagged(MetricName::from_static(name));
        for &(k, v) in tags {
            identity = identity.with_tag(MetricTagName::from_static(k), MetricTagValue::new(v));
        }
        registry
            .register(&identity, GaugeSource::Func(Arc::new(move || Some(value))))
            .unwrap();
    }

    fn render(registry: Arc<GaugeRegistry>) -> String {
        let mut exposition = Registry::default();
        exposition.register_collector(Box::new(GaugeCollector::new(registry)));
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &exposition).unwrap();
        buf
    }

    #[test]
    fn grouped_by_name() {
        let registry = Arc::new(GaugeRegistry::default());
        register(
            &registry,
            "klag.consumer.lag.sum",
            &[("consumer_group", "billing")],
            MetricValue::Signed(120),
        );
        register(
            &registry,
            "klag.consumer.lag.max",
            &[("consumer_group", "billing")],
            MetricValue::Signed(80),
        );
        register(
            &registry,
            "klag.consumer.lag.sum",
            &[("consumer_group", "audit")],
            MetricValue::Signed(3),
        );

        let text = render(registry);
        assert_eq!(text.matches("# TYPE klag_consumer_lag_sum gauge\n").count(), 1);
        assert_eq!(text.matches("# TYPE klag_consumer_lag_max gauge\n").count(), 1);
        assert!(text.contains("klag_consumer_lag_max{consumer_group=\"billing\"} 80\n"));
        assert!(text.contains("klag_consumer_lag_sum{consumer_group=\"audit\"} 3\n"));
        assert!(text.contains("klag_consumer_lag_sum{consumer_group=\"billing\"} 120\n"));
        assert!(text.ends_with("# EOF\n"));
    }

    #[test]
    fn untagged_and_unsigned() {
        let registry = Arc::new(GaugeRegistry::default());
        register(&registry, "process.memory.rss", &[], MetricValue::Unsigned(4096));
        register(&registry, "x.big", &[], MetricValue::Unsigned(u64::MAX));

        let text = render(registry);
        assert!(text.contains("process_memory_rss 4096\n"));
        assert!(text.contains("x_big "));
    }

    #[test]
    fn dead_source_skipped() {
        let registry = Arc::new(GaugeRegistry::default());
        let identity = MetricIdentity::untagged(MetricName::from_static("klag.gone"));
        registry
            .register(&identity, GaugeSource::Func(Arc::new(|| None)))
            .unwrap();
        assert!(!render(registry).contains("klag_gone"));
    }

    #[test]
    fn sanitize_names() {
        assert_eq!(sanitize("9lives.a-b/c:d", true), "_9lives_a_b_c:d");
        assert_eq!(sanitize("a:b", false), "a_b");
        assert_eq!(escape_label_value("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
        assert_eq!(escape_label_value("connect-orders:prod"), "connect-orders:prod");
    }
}
