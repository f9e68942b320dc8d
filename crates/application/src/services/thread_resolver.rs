use std::sync::Arc;

use domain::{
    ChatThread, DomainError, ListingId, ListingOwnership, ParticipantRoles, ThreadId, ThreadKey,
    UserId,
};
use uuid::Uuid;

use crate::{
    clock::Clock, error::ApplicationError, ownership::OwnershipOracle,
    repository::ThreadRepository,
};

/// 会话解析器：为两个用户（可选地限定某个商品）找到或创建唯一的会话。
///
/// 同一组逻辑输入，不论哪一方发起、调用多少次、是否并发，都得到同一个会话。
/// 并发首次联系时不加锁，而是"先创建，冲突后重新查询"。
pub struct ChatThreadResolver {
    threads: Arc<dyn ThreadRepository>,
    ownership: Arc<dyn OwnershipOracle>,
    clock: Arc<dyn Clock>,
}

impl ChatThreadResolver {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        ownership: Arc<dyn OwnershipOracle>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            threads,
            ownership,
            clock,
        }
    }

    pub async fn open_or_get(
        &self,
        me: UserId,
        other: UserId,
        listing_id: Option<ListingId>,
    ) -> Result<ChatThread, ApplicationError> {
        if me == other {
            return Err(DomainError::SelfConversation.into());
        }

        let ownership = self.listing_ownership(me, other, listing_id).await?;
        let roles = ParticipantRoles::resolve(me, other, ownership)?;
        let key = ThreadKey::new(roles, listing_id);

        if let Some(existing) = self.threads.find_by_key(key).await? {
            return Ok(existing);
        }

        let thread = ChatThread::open(
            ThreadId::from(Uuid::new_v4()),
            roles,
            listing_id,
            self.clock.now(),
        );

        match self.threads.create(thread).await {
            Ok(created) => {
                tracing::info!(
                    thread_id = %created.id,
                    buyer_id = %created.buyer_id,
                    seller_id = %created.seller_id,
                    listing_id = ?created.listing_id.map(|id| id.to_string()),
                    "会话已创建"
                );
                Ok(created)
            }
            Err(err) if err.is_conflict() => {
                // 另一个请求抢先创建了同一个会话，直接复用它
                tracing::info!(
                    buyer_id = %roles.buyer_id,
                    seller_id = %roles.seller_id,
                    "并发首次联系，复用已存在的会话"
                );
                match self.threads.find_by_key(key).await? {
                    Some(existing) => Ok(existing),
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    // 唯一的外部副作用：查询商品归属
    async fn listing_ownership(
        &self,
        me: UserId,
        other: UserId,
        listing_id: Option<ListingId>,
    ) -> Result<ListingOwnership, ApplicationError> {
        let Some(listing_id) = listing_id else {
            return Ok(ListingOwnership::Unscoped);
        };

        if self.ownership.is_owner_of_listing(me, listing_id).await? {
            return Ok(ListingOwnership::Initiator);
        }
        if self.ownership.is_owner_of_listing(other, listing_id).await? {
            return Ok(ListingOwnership::Counterpart);
        }
        Ok(ListingOwnership::Unowned)
    }
}
