use thiserror::Error;

use crate::cluster::ClusterError;
use crate::member::MetadataError;
use crate::protocol::traits::{ReadError, WriteError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Malformed metadata for member '{member_id}': {source}")]
    MalformedMetadata {
        member_id: String,
        #[source]
        source: MetadataError,
    },

    #[error("Member '{0}' joined more than once")]
    DuplicateMember(String),

    #[error("Unknown topic {0}")]
    UnknownTopic(String),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Host metadata unavailable: {0}")]
    HostMetadata(Box<dyn std::error::Error + Send + Sync>),

    #[error("Cannot decode consumer protocol payload: {0}")]
    Decode(#[from] ReadError),

    #[error("Cannot encode consumer protocol payload: {0}")]
    Encode(#[from] WriteError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
