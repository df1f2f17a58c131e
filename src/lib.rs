//! Capacity-weighted partition assignment for Kafka consumer groups.
//!
//! Consumers running on a mix of instance types and locations do not process
//! messages at the same speed. [`MixedInstanceAssignor`] gives every member a
//! share of the partitions proportional to the capacity of the host it runs
//! on, where capacity is looked up from the member's instance family and
//! location.
//!
//! Each member publishes `host,instance_type,location` as the user data of its
//! subscription (see [`UserDataProvider`]); the group leader feeds those into
//! the assignor:
//!
//! ```rust
//! # async fn test() {
//! use rskafka_mixed_instance::{
//!     cluster::StaticCluster, GroupMember, MixedInstanceAssignorBuilder, PartitionAssignor,
//!     Weights,
//! };
//!
//! let assignor = MixedInstanceAssignorBuilder::new()
//!     .instance_family_weights(Weights::from([
//!         ("c5".to_string(), 1.25),
//!         ("r4".to_string(), 1.0),
//!     ]))
//!     .build(StaticCluster::new().with_partition_count("events", 9));
//!
//! let members = vec![
//!     GroupMember::new("consumer-1", "i-0a,c5.xlarge,ap-northeast-1a"),
//!     GroupMember::new("consumer-2", "i-0b,r4.xlarge,ap-northeast-1a"),
//! ];
//! let assignment = assignor
//!     .assign(&members, &["events".to_string()])
//!     .await
//!     .unwrap();
//! assert_eq!(assignment.get("consumer-1").unwrap().len(), 5);
//! # }
//! ```
#![deny(rustdoc::broken_intra_doc_links, rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::future_not_send,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

pub mod assignment;
pub mod assignor;
pub mod backoff;
pub mod capacity;
pub mod cluster;
pub mod error;
pub mod member;
pub mod protocol;
pub mod topic;
pub mod user_data;
pub mod weight;

pub use assignment::Assignment;
pub use assignor::{
    GroupMember, MixedInstanceAssignor, MixedInstanceAssignorBuilder, PartitionAssignor,
    PROTOCOL_NAME,
};
pub use backoff::BackoffConfig;
pub use error::{Error, Result};
pub use member::MemberMetadata;
pub use topic::{PartitionWeights, TopicPartition};
pub use user_data::{HostMetadataSource, UserDataProvider};
pub use weight::{CombinedWeights, WeightSource, Weights};
