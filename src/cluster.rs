//! Partition metadata lookups.
//!
//! The assignor does not talk to brokers itself; whatever client drives the
//! consumer group implements [`Cluster`] on top of its metadata cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClusterError {
    /// The partition leader is being elected; metadata will settle shortly.
    #[error("Leader not available")]
    LeaderNotAvailable,

    #[error("Unknown topic or partition: {0}")]
    UnknownTopicOrPartition(String),

    #[error("Metadata request failed: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ClusterError {
    /// Whether running the whole assignment again may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::LeaderNotAvailable)
    }
}

#[async_trait]
pub trait Cluster: Send + Sync {
    /// Partition ids of `topic`, in the order they should be handed out.
    async fn partitions_for(&self, topic: &str) -> Result<Vec<i32>, ClusterError>;
}

#[async_trait]
impl<T> Cluster for Arc<T>
where
    T: Cluster + ?Sized,
{
    async fn partitions_for(&self, topic: &str) -> Result<Vec<i32>, ClusterError> {
        self.as_ref().partitions_for(topic).await
    }
}

/// Cluster metadata known up front, e.g. from a metadata response the caller
/// already holds.
#[derive(Debug, Clone, Default)]
pub struct StaticCluster {
    topics: BTreeMap<String, Vec<i32>>,
}

impl StaticCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topic(mut self, topic: impl Into<String>, partitions: Vec<i32>) -> Self {
        self.topics.insert(topic.into(), partitions);
        self
    }

    /// A topic with partitions `0..partitions`.
    pub fn with_partition_count(self, topic: impl Into<String>, partitions: i32) -> Self {
        self.with_topic(topic, (0..partitions).collect())
    }
}

#[async_trait]
impl Cluster for StaticCluster {
    async fn partitions_for(&self, topic: &str) -> Result<Vec<i32>, ClusterError> {
        self.topics
            .get(topic)
            .cloned()
            .ok_or_else(|| ClusterError::UnknownTopicOrPartition(topic.to_string()))
    }
}
