//! Self-description each member publishes when joining the group.
//!
//! The metadata travels as the consumer subscription's user data and is a
//! UTF-8 string of three fields joined by [`DELIMITER`]:
//!
//! ```text
//! <host id>,<instance type>,<location>
//! i-0123456789abcdef0,c5.xlarge,ap-northeast-1a
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Separator between the fields of the metadata triplet.
pub const DELIMITER: char = ',';

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("expected 3 fields (host,instance_type,location) but got {0}")]
    FieldCount(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberMetadata {
    /// Identifier of the machine running the member, e.g. an EC2 instance id.
    pub host_id: String,

    /// Instance type, e.g. `c5.xlarge`.
    pub instance_type: String,

    /// Location of the host, e.g. an availability zone.
    pub location: String,
}

impl MemberMetadata {
    pub fn new(
        host_id: impl Into<String>,
        instance_type: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            host_id: host_id.into(),
            instance_type: instance_type.into(),
            location: location.into(),
        }
    }

    /// Instance family, the part of the instance type before the first `.`.
    ///
    /// `c5.xlarge` belongs to the `c5` family; a type without a `.` is its own
    /// family.
    pub fn family(&self) -> &str {
        match self.instance_type.split_once('.') {
            Some((family, _)) => family,
            None => &self.instance_type,
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, MetadataError> {
        std::str::from_utf8(data)?.parse()
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl FromStr for MemberMetadata {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split(DELIMITER).collect::<Vec<_>>();
        match fields.as_slice() {
            [host_id, instance_type, location] => {
                Ok(Self::new(*host_id, *instance_type, *location))
            }
            _ => Err(MetadataError::FieldCount(fields.len())),
        }
    }
}

impl fmt::Display for MemberMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}",
            self.host_id, self.instance_type, self.location
        )
    }
}
