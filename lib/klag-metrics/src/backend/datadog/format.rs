/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

use serde_json::{Map, Value};

use crate::backend::GaugeSample;

// https://docs.datadoghq.com/api/latest/metrics/#submit-metrics (v1)
pub(super) fn series_body(samples: &[GaugeSample], timestamp: i64) -> Value {
    let mut series = Vec::with_capacity(samples.len());
    for sample in samples {
        // NaN and infinite values can not be sent
        let Some(value) = sample.value.as_json_number() else {
            continue;
        };

        let tags: Vec<Value> = sample
            .identity
            .tag_map()
            .iter()
            .map(|(k, v)| Value::String(format!("{k}:{v}")))
            .collect();

        let mut map = Map::with_capacity(4);
        map.insert(
            "metric".to_string(),
            Value::String(sample.identity.name().to_string()),
        );
        map.insert("type".to_string(), Value::String("gauge".to_string()));
        map.insert(
            "points".to_string(),
            Value::Array(vec![Value::Array(vec![
                Value::Number(timestamp.into()),
                Value::Number(value),
            ])]),
        );
        map.insert("tags".to_string(), Value::Array(tags));
        series.push(Value::Object(map));
    }

    let mut body = Map::with_capacity(1);
    body.insert("series".to_string(), Value::Array(series));
    Value::Object(body)
}
