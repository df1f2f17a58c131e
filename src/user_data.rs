//! This member's half of the metadata exchange.
//!
//! Every member describes its own host when joining the group; the leader
//! reads those descriptions back out of the join response, so no central
//! registry of hosts is needed.

use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::{Error, Result};
use crate::member::MemberMetadata;
use crate::protocol::messages::Subscription;
use crate::protocol::traits::WriteType;

/// Where the local host's id, instance type and location come from, e.g. a
/// cloud provider's instance metadata endpoint.
#[async_trait]
pub trait HostMetadataSource: Debug + Send + Sync {
    async fn host_metadata(
        &self,
    ) -> Result<MemberMetadata, Box<dyn std::error::Error + Send + Sync>>;
}

/// Metadata known at startup, e.g. passed in through configuration.
#[async_trait]
impl HostMetadataSource for MemberMetadata {
    async fn host_metadata(
        &self,
    ) -> Result<MemberMetadata, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.clone())
    }
}

/// Caches the encoded metadata triplet after the first successful lookup.
#[derive(Debug)]
pub struct UserDataProvider<S> {
    source: S,
    user_data: OnceCell<Vec<u8>>,
}

impl<S> UserDataProvider<S>
where
    S: HostMetadataSource,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            user_data: OnceCell::new(),
        }
    }

    /// The `host,instance_type,location` triplet for this member.
    pub async fn user_data(&self) -> Result<&[u8]> {
        let user_data = self
            .user_data
            .get_or_try_init(|| async move {
                let metadata = self
                    .source
                    .host_metadata()
                    .await
                    .map_err(Error::HostMetadata)?;
                info!(
                    host_id = metadata.host_id.as_str(),
                    instance_type = metadata.instance_type.as_str(),
                    location = metadata.location.as_str(),
                    "resolved host metadata",
                );

                Ok::<_, Error>(metadata.encode())
            })
            .await?;

        Ok(user_data)
    }

    /// Encoded consumer subscription to send with `JoinGroup`.
    pub async fn subscription(&self, topics: &[String]) -> Result<Vec<u8>> {
        let subscription = Subscription::new(topics.to_vec(), self.user_data().await?.to_vec());

        let mut buf = Vec::new();
        subscription.write(&mut buf)?;
        Ok(buf)
    }
}
