//! Pluggable assignment strategies.
//!
//! Members of a consumer group forward their subscriptions to the group
//! coordinator, which picks one member as leader and hands it everybody's
//! subscription. The leader calls [`PartitionAssignor::assign`] and sends the
//! result back through `SyncGroup`.

use std::collections::HashSet;
use std::io::Cursor;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::assignment::{distribute, Assignment};
use crate::backoff::{retry_transient, BackoffConfig};
use crate::capacity::{aggregate, HostCapacities, MemberCapacity};
use crate::cluster::{Cluster, ClusterError};
use crate::error::{Error, Result};
use crate::member::MemberMetadata;
use crate::protocol::messages::Subscription;
use crate::protocol::traits::ReadType;
use crate::topic::{weigh, PartitionWeights, TopicPartition};
use crate::weight::{CombinedWeights, WeightConfig, WeightSource, Weights};

/// Name of the join group protocol the mixed instance assignor is registered
/// under.
pub const PROTOCOL_NAME: &str = "mixedinstance";

/// A group member as seen by the leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub member_id: String,

    /// The member's `host,instance_type,location` triplet.
    pub metadata: Vec<u8>,
}

impl GroupMember {
    pub fn new(member_id: impl Into<String>, metadata: impl Into<Vec<u8>>) -> Self {
        Self {
            member_id: member_id.into(),
            metadata: metadata.into(),
        }
    }

    /// Take the metadata out of the user data of an encoded consumer
    /// subscription, as found in a `JoinGroup` response.
    pub fn from_subscription(member_id: impl Into<String>, subscription: &[u8]) -> Result<Self> {
        let subscription = Subscription::read(&mut Cursor::new(subscription))?;
        Ok(Self::new(member_id, subscription.user_data))
    }
}

#[async_trait]
pub trait PartitionAssignor: Send + Sync {
    /// Protocol name announced in `JoinGroup`.
    fn name(&self) -> &'static str;

    /// Assign every partition of `topics` to exactly one of `members`.
    async fn assign(&self, members: &[GroupMember], topics: &[String]) -> Result<Assignment>;
}

/// Builder for [`MixedInstanceAssignor`].
///
/// Every weight source is optional; anything not configured weighs `1.0`.
#[derive(Debug, Default)]
pub struct MixedInstanceAssignorBuilder {
    weights: WeightConfig,
    partition_weights: WeightSource<PartitionWeights>,
    backoff_config: BackoffConfig,
}

impl MixedInstanceAssignorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight per instance family, e.g. `c5 => 1.25`.
    pub fn instance_family_weights(mut self, weights: impl Into<WeightSource<Weights>>) -> Self {
        self.weights.instance_family = weights.into();
        self
    }

    /// Weight per location, e.g. `ap-northeast-1c => 0.9`.
    pub fn location_weights(mut self, weights: impl Into<WeightSource<Weights>>) -> Self {
        self.weights.location = weights.into();
        self
    }

    /// Weight per (location, instance family) or (instance family, location).
    ///
    /// Takes precedence over the one-level tables for the pairs it lists.
    pub fn weights(mut self, weights: impl Into<WeightSource<CombinedWeights>>) -> Self {
        self.weights.combined = weights.into();
        self
    }

    /// Processing cost per partition, keyed by topic then partition id.
    pub fn partition_weights(
        mut self,
        weights: impl Into<WeightSource<PartitionWeights>>,
    ) -> Self {
        self.partition_weights = weights.into();
        self
    }

    /// Delay between attempts while partition leaders are unavailable.
    pub fn backoff_config(mut self, backoff_config: BackoffConfig) -> Self {
        self.backoff_config = backoff_config;
        self
    }

    pub fn build<C>(self, cluster: C) -> MixedInstanceAssignor<C>
    where
        C: Cluster,
    {
        MixedInstanceAssignor {
            cluster,
            weights: self.weights,
            partition_weights: self.partition_weights,
            backoff_config: self.backoff_config,
        }
    }
}

/// Gives members on more capable hosts proportionally more partitions.
#[derive(Debug)]
pub struct MixedInstanceAssignor<C> {
    cluster: C,
    weights: WeightConfig,
    partition_weights: WeightSource<PartitionWeights>,
    backoff_config: BackoffConfig,
}

impl<C> MixedInstanceAssignor<C>
where
    C: Cluster,
{
    /// Assign an explicit list of partitions.
    ///
    /// This never touches the cluster; `partitions` are handed out in the order
    /// given. A partition listed more than once is assigned once.
    pub fn assign_partitions(
        &self,
        members: &[GroupMember],
        partitions: Vec<TopicPartition>,
    ) -> Result<Assignment> {
        let hosts = self.host_capacities(members)?;
        let partition_weights = self.partition_weights.resolve();
        Ok(weigh_and_distribute(&hosts, partitions, &partition_weights))
    }

    fn host_capacities(&self, members: &[GroupMember]) -> Result<HostCapacities> {
        let weights = self.weights.resolve();
        let mut seen = HashSet::with_capacity(members.len());

        let mut capacities = Vec::with_capacity(members.len());
        for GroupMember {
            member_id,
            metadata,
        } in members
        {
            if !seen.insert(member_id.as_str()) {
                return Err(Error::DuplicateMember(member_id.clone()));
            }

            let metadata =
                MemberMetadata::decode(metadata).map_err(|source| Error::MalformedMetadata {
                    member_id: member_id.clone(),
                    source,
                })?;
            let capacity = weights.capacity(metadata.family(), &metadata.location);
            debug!(
                member_id = member_id.as_str(),
                host_id = metadata.host_id.as_str(),
                instance_type = metadata.instance_type.as_str(),
                location = metadata.location.as_str(),
                capacity,
                "resolved member capacity",
            );

            capacities.push(MemberCapacity {
                member_id: member_id.clone(),
                host_id: metadata.host_id,
                capacity,
            });
        }

        Ok(aggregate(capacities))
    }

    /// Partitions of every topic, each topic looked up once in order of first
    /// appearance.
    async fn partitions(&self, topics: &[String]) -> Result<Vec<TopicPartition>> {
        let mut seen = HashSet::with_capacity(topics.len());
        let mut partitions = vec![];
        for topic in topics {
            if !seen.insert(topic.as_str()) {
                continue;
            }

            let ids = self
                .cluster
                .partitions_for(topic)
                .await
                .map_err(|e| match e {
                    ClusterError::UnknownTopicOrPartition(_) => Error::UnknownTopic(topic.clone()),
                    e => Error::Cluster(e),
                })?;

            partitions.extend(ids.into_iter().map(|id| TopicPartition::new(topic, id)));
        }

        Ok(partitions)
    }
}

fn weigh_and_distribute(
    hosts: &HostCapacities,
    partitions: Vec<TopicPartition>,
    partition_weights: &PartitionWeights,
) -> Assignment {
    let n = partitions.len();
    let mut seen = HashSet::with_capacity(n);
    let partitions = partitions
        .into_iter()
        .filter(|tp| seen.insert(tp.clone()))
        .collect::<Vec<_>>();
    if partitions.len() < n {
        debug!(
            duplicates = n - partitions.len(),
            "dropped repeated partitions",
        );
    }

    distribute(hosts, &weigh(partitions, partition_weights))
}

#[async_trait]
impl<C> PartitionAssignor for MixedInstanceAssignor<C>
where
    C: Cluster,
{
    fn name(&self) -> &'static str {
        PROTOCOL_NAME
    }

    async fn assign(&self, members: &[GroupMember], topics: &[String]) -> Result<Assignment> {
        let assignment = retry_transient(&self.backoff_config, "assign", || async move {
            let hosts = self.host_capacities(members)?;
            let partition_weights = self.partition_weights.resolve();
            let partitions = self.partitions(topics).await?;
            Ok(weigh_and_distribute(&hosts, partitions, &partition_weights))
        })
        .await?;

        info!(
            members = members.len(),
            topics = topics.len(),
            partitions = assignment.iter().map(|(_, p)| p.len()).sum::<usize>(),
            "assigned partitions",
        );

        Ok(assignment)
    }
}
