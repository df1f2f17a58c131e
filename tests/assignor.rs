mod test_helpers;

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use parking_lot::Mutex;
use rskafka_mixed_instance::backoff::{BackoffConfig, DEFAULT_RETRY_DELAY};
use rskafka_mixed_instance::cluster::{Cluster, ClusterError, StaticCluster};
use rskafka_mixed_instance::protocol::messages::MemberAssignment;
use rskafka_mixed_instance::protocol::traits::ReadType;
use rskafka_mixed_instance::{
    Assignment, CombinedWeights, Error, GroupMember, MemberMetadata, MixedInstanceAssignorBuilder,
    PartitionAssignor, PartitionWeights, TopicPartition, UserDataProvider, WeightSource, Weights,
};
use tokio::time::Instant;

use crate::test_helpers::maybe_start_logging;

/// 8 hosts running two members each plus 2 hosts running a single member.
const MEMBERS: &[(&str, &str)] = &[
    ("0000-c5-a-0000", "i-00000000000000000,c5.xlarge,ap-northeast-1a"),
    ("0001-m5-a-0000", "i-00000000000000001,m5.xlarge,ap-northeast-1a"),
    ("0002-r5-a-0000", "i-00000000000000002,r5.xlarge,ap-northeast-1a"),
    ("0003-r4-a-0000", "i-00000000000000003,r4.xlarge,ap-northeast-1a"),
    ("0004-c5-c-0000", "i-00000000000000004,c5.xlarge,ap-northeast-1c"),
    ("0005-m5-c-0000", "i-00000000000000005,m5.xlarge,ap-northeast-1c"),
    ("0006-r5-c-0000", "i-00000000000000006,r5.xlarge,ap-northeast-1c"),
    ("0007-r4-c-0000", "i-00000000000000007,r4.xlarge,ap-northeast-1c"),
    ("0000-c5-a-0001", "i-00000000000000000,c5.xlarge,ap-northeast-1a"),
    ("0001-m5-a-0001", "i-00000000000000001,m5.xlarge,ap-northeast-1a"),
    ("0002-r5-a-0001", "i-00000000000000002,r5.xlarge,ap-northeast-1a"),
    ("0003-r4-a-0001", "i-00000000000000003,r4.xlarge,ap-northeast-1a"),
    ("0004-c5-c-0001", "i-00000000000000004,c5.xlarge,ap-northeast-1c"),
    ("0005-m5-c-0001", "i-00000000000000005,m5.xlarge,ap-northeast-1c"),
    ("0006-r5-c-0001", "i-00000000000000006,r5.xlarge,ap-northeast-1c"),
    ("0007-r4-c-0001", "i-00000000000000007,r4.xlarge,ap-northeast-1c"),
    ("1000-c5-a-0000", "i-00000000000001000,c5.xlarge,ap-northeast-1a"),
    ("1001-r4-a-0000", "i-00000000000001001,r4.xlarge,ap-northeast-1a"),
];

fn members() -> Vec<GroupMember> {
    MEMBERS
        .iter()
        .map(|(member_id, metadata)| GroupMember::new(*member_id, metadata.as_bytes()))
        .collect()
}

fn weights(entries: &[(&str, f64)]) -> Weights {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn family_weights() -> Weights {
    weights(&[("r4", 1.0), ("r5", 1.08), ("m5", 1.13), ("c5", 1.25)])
}

fn zone_weights() -> Weights {
    weights(&[("ap-northeast-1a", 1.0), ("ap-northeast-1c", 0.9)])
}

fn topics() -> Vec<String> {
    vec!["topic".to_string()]
}

fn assert_complete(assignment: &Assignment, partitions: usize) {
    let assigned = assignment
        .iter()
        .flat_map(|(_, partitions)| partitions.iter().cloned())
        .collect::<Vec<_>>();
    let unique = assigned.iter().cloned().collect::<BTreeSet<_>>();

    assert_eq!(assigned.len(), partitions, "partitions assigned twice");
    assert_eq!(unique.len(), partitions, "partitions omitted");
}

fn counts(assignment: &Assignment) -> BTreeMap<String, usize> {
    assignment
        .iter()
        .map(|(member_id, partitions)| (member_id.clone(), partitions.len()))
        .collect()
}

#[tokio::test]
async fn heterogeneous_hosts_get_proportional_shares() {
    maybe_start_logging();

    let assignor = MixedInstanceAssignorBuilder::new()
        .instance_family_weights(family_weights())
        .location_weights(WeightSource::computed(zone_weights))
        .build(StaticCluster::new().with_partition_count("topic", 500));

    let got = assignor.assign(&members(), &topics()).await.unwrap();
    assert_complete(&got, 500);
    assert_eq!(got.len(), MEMBERS.len());

    // capacity of every member, and of every host
    let family = family_weights();
    let zone = zone_weights();
    let mut host_capacity: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    let mut member_host = BTreeMap::new();
    for (member_id, metadata) in MEMBERS {
        let metadata = MemberMetadata::decode(metadata.as_bytes()).unwrap();
        let capacity = family[metadata.family()] * zone[&metadata.location];
        let entry = host_capacity
            .entry(metadata.host_id.clone())
            .or_insert((0.0, 0));
        entry.0 += capacity;
        entry.1 += 1;
        member_host.insert(member_id.to_string(), metadata.host_id);
    }
    let total: f64 = host_capacity.values().map(|(c, _)| c).sum();

    let counts = counts(&got);
    for (member_id, n) in &counts {
        let (capacity, members) = host_capacity[&member_host[member_id]];
        let fair = capacity / total * 500.0 / members as f64;
        assert!(
            (*n as f64 - fair).abs() < 1.0 + 1e-9,
            "{member_id} got {n} partitions, fair share is {fair}"
        );
    }

    // faster families in the same zone get more
    assert!(counts["1000-c5-a-0000"] > counts["1001-r4-a-0000"]);
    // the same family gets more in the faster zone
    assert!(counts["1000-c5-a-0000"] > counts["0004-c5-c-0000"]);
}

#[tokio::test]
async fn combined_weights_keyed_either_way_agree() {
    maybe_start_logging();

    let by_family = CombinedWeights::from([
        (
            "r4".to_string(),
            weights(&[("ap-northeast-1a", 1.000), ("ap-northeast-1c", 0.833)]),
        ),
        (
            "r5".to_string(),
            weights(&[("ap-northeast-1a", 1.136), ("ap-northeast-1c", 0.926)]),
        ),
        (
            "m5".to_string(),
            weights(&[("ap-northeast-1a", 1.316), ("ap-northeast-1c", 1.042)]),
        ),
        (
            "c5".to_string(),
            weights(&[("ap-northeast-1a", 1.429), ("ap-northeast-1c", 1.111)]),
        ),
    ]);
    let by_zone = CombinedWeights::from([
        (
            "ap-northeast-1a".to_string(),
            weights(&[("r4", 1.000), ("r5", 1.136), ("m5", 1.316), ("c5", 1.429)]),
        ),
        (
            "ap-northeast-1c".to_string(),
            weights(&[("r4", 0.833), ("r5", 0.926), ("m5", 1.042), ("c5", 1.111)]),
        ),
    ]);
    let cluster = Arc::new(StaticCluster::new().with_partition_count("topic", 500));

    let family_keyed = MixedInstanceAssignorBuilder::new()
        .weights(by_family)
        // ignored, the combined table covers every member
        .instance_family_weights(weights(&[("c5", 100.0)]))
        .build(Arc::clone(&cluster))
        .assign(&members(), &topics())
        .await
        .unwrap();
    let zone_keyed = MixedInstanceAssignorBuilder::new()
        .weights(by_zone)
        .build(Arc::clone(&cluster))
        .assign(&members(), &topics())
        .await
        .unwrap();

    assert_complete(&family_keyed, 500);
    assert_eq!(family_keyed, zone_keyed);

    let counts = counts(&family_keyed);
    assert!(counts["0000-c5-a-0000"] > counts["0004-c5-c-0000"]);
    assert!(counts["0004-c5-c-0000"] > counts["0007-r4-c-0000"]);
}

#[tokio::test]
async fn co_located_members_match_a_single_member_of_double_capacity() {
    maybe_start_logging();

    let assignor = MixedInstanceAssignorBuilder::new()
        .instance_family_weights(weights(&[("r4", 1.0), ("r4x2", 2.0)]))
        .build(StaticCluster::new().with_partition_count("topic", 60));
    let members = vec![
        GroupMember::new("a-0", "host-a,r4.xlarge,az"),
        GroupMember::new("a-1", "host-a,r4.xlarge,az"),
        GroupMember::new("b-0", "host-b,r4x2.xlarge,az"),
        GroupMember::new("c-0", "host-c,r4.xlarge,az"),
    ];

    let got = counts(&assignor.assign(&members, &topics()).await.unwrap());

    assert_eq!(got["a-0"] + got["a-1"], got["b-0"]);
    assert_eq!(got["b-0"], 24);
    assert_eq!(got["c-0"], 12);
}

#[tokio::test]
async fn heavy_partition_is_assigned_alone() {
    maybe_start_logging();

    let assignor = MixedInstanceAssignorBuilder::new()
        .partition_weights(PartitionWeights::from([(
            "topic".to_string(),
            BTreeMap::from([(0, 100.0)]),
        )]))
        .build(StaticCluster::new().with_partition_count("topic", 100));
    let members = (0..5)
        .map(|i| GroupMember::new(format!("m{i}"), format!("host-{i},c5.xlarge,az")))
        .collect::<Vec<_>>();

    let got = assignor.assign(&members, &topics()).await.unwrap();
    assert_complete(&got, 100);

    let heavy = TopicPartition::new("topic", 0);
    let (holder, partitions) = got
        .iter()
        .find(|(_, partitions)| partitions.contains(&heavy))
        .unwrap();
    assert_eq!(partitions, &vec![heavy.clone()]);

    let mut rest = counts(&got)
        .into_iter()
        .filter(|(member_id, _)| member_id != holder)
        .map(|(_, n)| n)
        .collect::<Vec<_>>();
    rest.sort_unstable();
    assert_eq!(rest, vec![24, 25, 25, 25]);
}

#[tokio::test]
async fn assignment_is_deterministic() {
    maybe_start_logging();

    let assignor = MixedInstanceAssignorBuilder::new()
        .instance_family_weights(family_weights())
        .location_weights(zone_weights())
        .build(
            StaticCluster::new()
                .with_partition_count("topic", 97)
                .with_partition_count("other", 13),
        );
    let topics = vec!["topic".to_string(), "other".to_string()];

    let first = assignor.assign(&members(), &topics).await.unwrap();
    let second = assignor.assign(&members(), &topics).await.unwrap();

    assert_complete(&first, 110);
    assert_eq!(first, second);
}

/// Reports an unavailable leader for the first `failures` lookups.
#[derive(Debug)]
struct FlakyCluster {
    inner: StaticCluster,
    failures: Mutex<usize>,
    lookups: Mutex<Vec<String>>,
}

#[async_trait]
impl Cluster for FlakyCluster {
    async fn partitions_for(&self, topic: &str) -> Result<Vec<i32>, ClusterError> {
        self.lookups.lock().push(topic.to_string());

        {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(ClusterError::LeaderNotAvailable);
            }
        }

        self.inner.partitions_for(topic).await
    }
}

#[tokio::test(start_paused = true)]
async fn leader_not_available_restarts_the_assignment() {
    maybe_start_logging();

    let cluster = Arc::new(FlakyCluster {
        inner: StaticCluster::new()
            .with_partition_count("t1", 4)
            .with_partition_count("t2", 4),
        failures: Mutex::new(2),
        lookups: Mutex::new(vec![]),
    });
    let assignor = MixedInstanceAssignorBuilder::new().build(Arc::clone(&cluster));
    let members = vec![
        GroupMember::new("m1", "h1,c5.xlarge,az"),
        GroupMember::new("m2", "h2,c5.xlarge,az"),
    ];
    let start = Instant::now();

    let got = assignor
        .assign(&members, &["t1".to_string(), "t2".to_string()])
        .await
        .unwrap();

    assert_complete(&got, 8);
    assert!(start.elapsed() >= 2 * DEFAULT_RETRY_DELAY);
    // every attempt starts over from the first topic
    assert_eq!(*cluster.lookups.lock(), vec!["t1", "t1", "t1", "t2"]);
}

#[tokio::test(start_paused = true)]
async fn retry_delay_is_configurable() {
    maybe_start_logging();

    let cluster = FlakyCluster {
        inner: StaticCluster::new().with_partition_count("t1", 1),
        failures: Mutex::new(3),
        lookups: Mutex::new(vec![]),
    };
    let delay = std::time::Duration::from_millis(50);
    let assignor = MixedInstanceAssignorBuilder::new()
        .backoff_config(BackoffConfig { delay })
        .build(cluster);
    let start = Instant::now();

    assignor
        .assign(&[GroupMember::new("m1", "h1,c5.xlarge,az")], &["t1".to_string()])
        .await
        .unwrap();

    assert!(start.elapsed() >= 3 * delay);
    assert!(start.elapsed() < DEFAULT_RETRY_DELAY);
}

#[tokio::test(start_paused = true)]
async fn partition_weights_are_resolved_on_every_attempt() {
    maybe_start_logging();

    let cluster = FlakyCluster {
        inner: StaticCluster::new().with_partition_count("t1", 4),
        failures: Mutex::new(2),
        lookups: Mutex::new(vec![]),
    };
    let calls = Arc::new(AtomicUsize::new(0));
    let partition_weights = {
        let calls = Arc::clone(&calls);
        WeightSource::computed(move || {
            // only the last attempt sees t1-0 as heavy
            let weight = if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                1.0
            } else {
                3.0
            };
            PartitionWeights::from([("t1".to_string(), BTreeMap::from([(0, weight)]))])
        })
    };
    let assignor = MixedInstanceAssignorBuilder::new()
        .partition_weights(partition_weights)
        .build(cluster);
    let members = vec![
        GroupMember::new("m1", "h1,c5.xlarge,az"),
        GroupMember::new("m2", "h2,c5.xlarge,az"),
    ];

    let got = assignor.assign(&members, &["t1".to_string()]).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(got.get("m1"), Some(&[TopicPartition::new("t1", 0)][..]));
    assert_eq!(got.get("m2").map(<[_]>::len), Some(3));
}

#[derive(Debug)]
struct BrokenCluster;

#[async_trait]
impl Cluster for BrokenCluster {
    async fn partitions_for(&self, _topic: &str) -> Result<Vec<i32>, ClusterError> {
        Err(ClusterError::Other("connection reset".into()))
    }
}

#[tokio::test]
async fn other_cluster_errors_abort() {
    maybe_start_logging();

    let assignor = MixedInstanceAssignorBuilder::new().build(BrokenCluster);

    let err = assignor
        .assign(&[GroupMember::new("m1", "h1,c5.xlarge,az")], &topics())
        .await
        .unwrap_err();

    assert_matches!(err, Error::Cluster(ClusterError::Other(_)));
}

#[tokio::test]
async fn join_and_sync_payloads() {
    maybe_start_logging();

    // every member encodes its own subscription ...
    let hosts = [
        MemberMetadata::new("i-1", "c5.xlarge", "az"),
        MemberMetadata::new("i-2", "r4.xlarge", "az"),
    ];
    let mut joined = vec![];
    for (i, metadata) in hosts.into_iter().enumerate() {
        let provider = UserDataProvider::new(metadata);
        let subscription = provider.subscription(&topics()).await.unwrap();
        joined.push((format!("member-{i}"), subscription));
    }

    // ... and the leader decodes them all
    let members = joined
        .iter()
        .map(|(member_id, subscription)| {
            GroupMember::from_subscription(member_id.as_str(), subscription)
        })
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let assignor = MixedInstanceAssignorBuilder::new()
        .instance_family_weights(weights(&[("c5", 2.0)]))
        .build(StaticCluster::new().with_partition_count("topic", 6));
    let assignment = assignor.assign(&members, &topics()).await.unwrap();

    let encoded = assignment.encode().unwrap();
    let decoded = encoded
        .into_iter()
        .map(|(member_id, buf)| {
            let assignment = MemberAssignment::read(&mut Cursor::new(buf)).unwrap();
            (member_id, assignment)
        })
        .collect::<BTreeMap<_, _>>();

    assert_eq!(decoded["member-0"].topics[0].partitions, vec![0, 1, 2, 3]);
    assert_eq!(decoded["member-1"].topics[0].partitions, vec![4, 5]);
}
