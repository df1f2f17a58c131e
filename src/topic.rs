use std::collections::BTreeMap;
use std::fmt;

use crate::weight::DEFAULT_WEIGHT;

/// Per-partition processing cost, keyed by topic then partition id.
///
/// Partitions that are not listed weigh [`DEFAULT_WEIGHT`].
pub type PartitionWeights = BTreeMap<String, BTreeMap<i32, f64>>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicPartition {
    /// The topic name.
    pub topic: String,

    /// The partition id.
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPartition {
    pub partition: TopicPartition,

    /// Relative processing cost, independent of which member consumes it.
    pub weight: f64,
}

/// Attach a weight to every partition, keeping the input order.
pub fn weigh(
    partitions: impl IntoIterator<Item = TopicPartition>,
    weights: &PartitionWeights,
) -> Vec<WeightedPartition> {
    partitions
        .into_iter()
        .map(|partition| {
            let weight = weights
                .get(&partition.topic)
                .and_then(|topic| topic.get(&partition.partition))
                .copied()
                .unwrap_or(DEFAULT_WEIGHT);

            WeightedPartition { partition, weight }
        })
        .collect()
}
