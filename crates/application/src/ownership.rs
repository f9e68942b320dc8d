use async_trait::async_trait;
use domain::{ListingId, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("ownership oracle unavailable: {0}")]
pub struct OwnershipError(pub String);

impl OwnershipError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// 商品归属查询（由商品服务提供，这里只消费）
#[async_trait]
pub trait OwnershipOracle: Send + Sync {
    async fn is_owner_of_listing(
        &self,
        user_id: UserId,
        listing_id: ListingId,
    ) -> Result<bool, OwnershipError>;
}
