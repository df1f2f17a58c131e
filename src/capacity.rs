//! Group members by the host they run on.
//!
//! A host's capacity is the sum of its members' capacities. Several consumer
//! processes on one machine therefore add up; the assignment engine later
//! splits the host's share of partition weight evenly between them.

use std::collections::HashMap;

use tracing::debug;

/// A group member with its resolved capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberCapacity {
    pub member_id: String,
    pub host_id: String,
    pub capacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    pub host_id: String,

    /// Sum of the capacities of every member on this host.
    pub capacity: f64,

    /// Member ids in the order they joined.
    pub members: Vec<String>,
}

/// Hosts in order of first appearance, with the group's total capacity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostCapacities {
    pub hosts: Vec<Host>,
    pub total: f64,
}

impl HostCapacities {
    pub fn member_count(&self) -> usize {
        self.hosts.iter().map(|h| h.members.len()).sum()
    }
}

pub fn aggregate(members: impl IntoIterator<Item = MemberCapacity>) -> HostCapacities {
    let mut capacities = HostCapacities::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for MemberCapacity {
        member_id,
        host_id,
        capacity,
    } in members
    {
        capacities.total += capacity;

        match index.get(&host_id) {
            Some(&i) => {
                let host = &mut capacities.hosts[i];
                host.capacity += capacity;
                host.members.push(member_id);
            }
            None => {
                index.insert(host_id.clone(), capacities.hosts.len());
                capacities.hosts.push(Host {
                    host_id,
                    capacity,
                    members: vec![member_id],
                });
            }
        }
    }

    debug!(
        hosts = capacities.hosts.len(),
        total_capacity = capacities.total,
        "aggregated host capacities",
    );

    capacities
}
