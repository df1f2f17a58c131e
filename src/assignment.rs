//! Capacity-weighted distribution of partitions over group members.
//!
//! The engine runs in two passes over a single ordered list of partitions.
//!
//! 1. Every member gets a budget, its host's fair share of the total partition
//!    weight split evenly between the members on that host. Hosts are visited
//!    in order, members in order within their host, and each member takes
//!    partitions from a shared cursor for as long as the next one fits into
//!    what is left of its budget. The cursor never moves backwards.
//! 2. Whatever the first pass could not place is handed out one partition at
//!    a time to the member with the most budget left. Ties go to the member
//!    whose own host has the most budget left, then to the member visited
//!    first. Budgets are allowed to go negative here.
//!
//! Comparisons are exact. With many partitions of identical weight, rounding
//! in the budgets can move a single partition from one member to the next.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::capacity::HostCapacities;
use crate::protocol::messages::{MemberAssignment, TopicPartitions};
use crate::protocol::traits::{WriteError, WriteType};
use crate::topic::{TopicPartition, WeightedPartition};

/// Partitions per member.
///
/// Every member of the group is present, possibly with no partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment(BTreeMap<String, Vec<TopicPartition>>);

impl Assignment {
    pub fn get(&self, member_id: &str) -> Option<&[TopicPartition]> {
        self.0.get(member_id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<TopicPartition>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<TopicPartition>> {
        self.0
    }

    /// Group each member's partitions by topic, in the shape the consumer
    /// protocol expects.
    pub fn member_assignments(&self) -> BTreeMap<String, MemberAssignment> {
        self.0
            .iter()
            .map(|(member_id, partitions)| {
                let mut topics: Vec<TopicPartitions> = vec![];
                for tp in partitions {
                    match topics.iter_mut().find(|t| t.topic == tp.topic) {
                        Some(t) => t.partitions.push(tp.partition),
                        None => topics.push(TopicPartitions {
                            topic: tp.topic.clone(),
                            partitions: vec![tp.partition],
                        }),
                    }
                }

                let assignment = MemberAssignment {
                    version: 0,
                    topics,
                    user_data: vec![],
                };

                (member_id.clone(), assignment)
            })
            .collect()
    }

    /// Encoded `SyncGroup` assignment payload for every member.
    pub fn encode(&self) -> Result<Vec<(String, Vec<u8>)>, WriteError> {
        self.member_assignments()
            .into_iter()
            .map(|(member_id, assignment)| {
                let mut buf = Vec::new();
                assignment.write(&mut buf)?;
                Ok((member_id, buf))
            })
            .collect()
    }
}

impl From<BTreeMap<String, Vec<TopicPartition>>> for Assignment {
    fn from(plan: BTreeMap<String, Vec<TopicPartition>>) -> Self {
        Self(plan)
    }
}

/// A member's position in the pass order, with the budget it did not use.
#[derive(Debug)]
struct Slot<'a> {
    member_id: &'a str,
    host: usize,
    leftover: f64,
}

/// Distribute `partitions` over the members of `hosts`.
///
/// `partitions` must be in a deterministic order; the same hosts and the same
/// partition order always produce the same assignment.
pub fn distribute(hosts: &HostCapacities, partitions: &[WeightedPartition]) -> Assignment {
    let mut plan: BTreeMap<String, Vec<TopicPartition>> = hosts
        .hosts
        .iter()
        .flat_map(|host| host.members.iter())
        .map(|member_id| (member_id.clone(), vec![]))
        .collect();

    if plan.is_empty() {
        if !partitions.is_empty() {
            warn!(
                partitions = partitions.len(),
                "no members to assign partitions to"
            );
        }
        return Assignment(plan);
    }

    let total_weight: f64 = partitions.iter().map(|p| p.weight).sum();
    let rate = if hosts.total > 0.0 {
        total_weight / hosts.total
    } else {
        0.0
    };

    let mut slots: Vec<Slot<'_>> = Vec::with_capacity(hosts.member_count());
    let mut host_leftover = vec![0.0; hosts.hosts.len()];
    let mut cursor = 0;

    for (h, host) in hosts.hosts.iter().enumerate() {
        let budget = host.capacity * rate / host.members.len() as f64;

        for member_id in &host.members {
            let mut remaining = budget;
            let assigned = plan.entry(member_id.clone()).or_default();

            while let Some(p) = partitions.get(cursor).filter(|p| p.weight <= remaining) {
                assigned.push(p.partition.clone());
                remaining -= p.weight;
                cursor += 1;
            }

            trace!(
                member_id = member_id.as_str(),
                host_id = host.host_id.as_str(),
                budget,
                leftover = remaining,
                assigned = assigned.len(),
                "primary pass",
            );

            host_leftover[h] += remaining;
            slots.push(Slot {
                member_id,
                host: h,
                leftover: remaining,
            });
        }
    }

    let overflow = partitions.len() - cursor;
    for p in &partitions[cursor..] {
        let winner = most_leftover(&slots, &host_leftover);
        let slot = &mut slots[winner];

        slot.leftover -= p.weight;
        host_leftover[slot.host] -= p.weight;
        plan.entry(slot.member_id.to_string())
            .or_default()
            .push(p.partition.clone());
    }

    debug!(
        members = slots.len(),
        partitions = partitions.len(),
        overflow,
        rate,
        "distributed partitions",
    );

    Assignment(plan)
}

/// Index of the slot with the largest leftover.
///
/// Ties go to the slot whose host has more leftover, then to the earlier slot.
fn most_leftover(slots: &[Slot<'_>], host_leftover: &[f64]) -> usize {
    let mut best = 0;
    for (i, slot) in slots.iter().enumerate().skip(1) {
        let current = &slots[best];
        let wins = slot.leftover > current.leftover
            || (slot.leftover == current.leftover
                && host_leftover[slot.host] > host_leftover[current.host]);
        if wins {
            best = i;
        }
    }

    best
}
