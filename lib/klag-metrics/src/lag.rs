/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2026 The klag Authors.
 */

/// Lag of a consumer group on a single partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionLag {
    pub topic: String,
    pub partition: i32,
    pub lag: i64,
    pub log_start_offset: i64,
    pub log_end_offset: i64,
    pub committed_offset: i64,
}

/// Lag of a consumer group, as computed by one collection cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsumerGroupLag {
    pub consumer_group: String,
    pub total_lag: i64,
    pub max_lag: i64,
    pub min_lag: i64,
    pub partitions: Vec<PartitionLag>,
}

impl ConsumerGroupLag {
    /// Build the group lag with aggregates derived from the partitions.
    /// All aggregates are zero when there is no partition.
    pub fn from_partitions(consumer_group: String, partitions: Vec<PartitionLag>) -> Self {
        let mut total_lag = 0i64;
        let mut max_lag: Option<i64> = None;
        let mut min_lag: Option<i64> = None;
        for p in &partitions {
            total_lag = total_lag.saturating_add(p.lag);
            max_lag = Some(max_lag.map_or(p.lag, |v| v.max(p.lag)));
            min_lag = Some(min_lag.map_or(p.lag, |v| v.min(p.lag)));
        }
        ConsumerGroupLag {
            consumer_group,
            total_lag,
            max_lag: max_lag.unwrap_or(0),
            min_lag: min_lag.unwrap_or(0),
            partitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition(topic: &str, partition: i32, lag: i64) -> PartitionLag {
        PartitionLag {
            topic: topic.to_string(),
            partition,
            lag,
            log_start_offset: 0,
            log_end_offset: 1000,
            committed_offset: 1000 - lag,
        }
    }

    #[test]
    fn aggregates() {
        let group = ConsumerGroupLag::from_partitions(
            "billing".to_string(),
            vec![
                partition("orders", 0, 80),
                partition("orders", 1, 30),
                partition("refunds", 0, 10),
            ],
        );
        assert_eq!(group.total_lag, 120);
        assert_eq!(group.max_lag, 80);
        assert_eq!(group.min_lag, 10);
        assert_eq!(group.partitions.len(), 3);
        assert_eq!(group.partitions[1].partition, 1);
    }

    #[test]
    fn no_partitions() {
        let group = ConsumerGroupLag::from_partitions("idle".to_string(), Vec::new());
        assert_eq!(group.total_lag, 0);
        assert_eq!(group.max_lag, 0);
        assert_eq!(group.min_lag, 0);
    }

    #[test]
    fn saturating_total() {
        let group = ConsumerGroupLag::from_partitions(
            "big".to_string(),
            vec![partition("t", 0, i64::MAX), partition("t", 1, 5)],
        );
        assert_eq!(group.total_lag, i64::MAX);
        assert_eq!(group.min_lag, 5);
    }
}
