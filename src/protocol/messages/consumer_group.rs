use std::io::{Read, Write};

use crate::protocol::traits::{ReadError, ReadType, WriteError, WriteType};

/// Partitions of one topic, either owned by a member (subscription v1+) or
/// handed to it by the group leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPartitions {
    pub topic: String,
    pub partitions: Vec<i32>,
}

impl<R> ReadType<R> for TopicPartitions
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let topic = String::read(reader)?;
        let partitions = Vec::<i32>::read(reader)?;

        Ok(Self { topic, partitions })
    }
}

impl<W> WriteType<W> for TopicPartitions
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.topic.write(writer)?;
        self.partitions.write(writer)
    }
}

fn read_array<R, T>(reader: &mut R) -> Result<Vec<T>, ReadError>
where
    R: Read,
    T: ReadType<R>,
{
    let len = i32::read(reader)?;
    if len == -1 {
        return Ok(vec![]);
    }

    let len = usize::try_from(len)?;
    let mut items = Vec::new();
    for _ in 0..len {
        items.push(T::read(reader)?);
    }

    Ok(items)
}

fn write_array<W, T>(items: &[T], writer: &mut W) -> Result<(), WriteError>
where
    W: Write,
    T: WriteType<W>,
{
    let len = i32::try_from(items.len())?;
    len.write(writer)?;
    for item in items {
        item.write(writer)?;
    }

    Ok(())
}

/// What a member sends to the coordinator when joining a group.
///
/// `user_data` is opaque to Kafka; the mixed instance assignor puts the
/// member's host triplet in it.
///
/// <https://github.com/apache/kafka/blob/trunk/clients/src/main/resources/common/message/ConsumerProtocolSubscription.json>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub version: i16,
    // Version >= 0
    pub topics: Vec<String>,
    // Version >= 0
    pub user_data: Vec<u8>,
    // Version >= 1
    pub owned_partitions: Vec<TopicPartitions>,
    // Version >= 2
    pub generation_id: i32,
    // Version >= 3
    pub rack_id: Option<String>,
}

impl Subscription {
    pub fn new(topics: Vec<String>, user_data: Vec<u8>) -> Self {
        Self {
            version: 0,
            topics,
            user_data,
            owned_partitions: vec![],
            generation_id: -1,
            rack_id: None,
        }
    }
}

impl<R> ReadType<R> for Subscription
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let version = i16::read(reader)?;
        let topics = Vec::<String>::read(reader)?;
        let user_data = Vec::<u8>::read(reader)?;

        let owned_partitions = if version >= 1 {
            read_array(reader)?
        } else {
            vec![]
        };

        let generation_id = if version >= 2 { i32::read(reader)? } else { -1 };

        let rack_id = if version >= 3 {
            Option::<String>::read(reader)?
        } else {
            None
        };

        Ok(Self {
            version,
            topics,
            user_data,
            owned_partitions,
            generation_id,
            rack_id,
        })
    }
}

impl<W: Write> WriteType<W> for Subscription {
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.version.write(writer)?;
        self.topics.write(writer)?;
        self.user_data.write(writer)?;

        if self.version >= 1 {
            write_array(&self.owned_partitions, writer)?;
        }

        if self.version >= 2 {
            self.generation_id.write(writer)?;
        }

        if self.version >= 3 {
            self.rack_id.write(writer)?;
        }

        Ok(())
    }
}

/// What the group leader sends back, through the coordinator, to each member.
///
/// <https://github.com/apache/kafka/blob/trunk/clients/src/main/resources/common/message/ConsumerProtocolAssignment.json>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAssignment {
    pub version: i16,
    pub topics: Vec<TopicPartitions>,
    pub user_data: Vec<u8>,
}

impl<R> ReadType<R> for MemberAssignment
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let version = i16::read(reader)?;
        let topics = read_array(reader)?;
        let user_data = Vec::<u8>::read(reader)?;

        Ok(Self {
            version,
            topics,
            user_data,
        })
    }
}

impl<W> WriteType<W> for MemberAssignment
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.version.write(writer)?;
        write_array(&self.topics, writer)?;
        self.user_data.write(writer)
    }
}
