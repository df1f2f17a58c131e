//! Kafka consumer protocol payloads.
//!
//! Only the embedded protocol carried inside `JoinGroup` / `SyncGroup` is covered
//! here: a member's subscription (topics plus opaque user data) and the
//! assignment the group leader hands back to each member.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_types>
//! - <https://github.com/apache/kafka/blob/trunk/clients/src/main/resources/common/message/ConsumerProtocolSubscription.json>
//! - <https://github.com/apache/kafka/blob/trunk/clients/src/main/resources/common/message/ConsumerProtocolAssignment.json>

pub mod messages;
pub mod primitives;
pub mod traits;
