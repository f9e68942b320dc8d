use crate::errors::DomainError;
use crate::value_objects::{ListingId, ThreadId, Timestamp, UserId};

/// 商品归属查询结果，由会话解析器在调用归属服务后给出。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOwnership {
    /// 会话没有关联商品
    Unscoped,
    /// 发起方是商品所有者
    Initiator,
    /// 对方是商品所有者
    Counterpart,
    /// 双方都不拥有该商品
    Unowned,
}

/// 会话中买卖双方的角色分配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParticipantRoles {
    pub buyer_id: UserId,
    pub seller_id: UserId,
}

impl ParticipantRoles {
    pub fn new(buyer_id: UserId, seller_id: UserId) -> Result<Self, DomainError> {
        if buyer_id == seller_id {
            return Err(DomainError::SelfConversation);
        }
        Ok(Self {
            buyer_id,
            seller_id,
        })
    }

    /// 纯函数：根据商品归属决定买卖双方。
    ///
    /// 商品所有者永远是卖家。没有商品时按用户 ID 的稳定顺序分配（较小者为买家），
    /// 这样无论哪一方先发起，得到的键都相同。
    pub fn resolve(
        initiator: UserId,
        counterpart: UserId,
        ownership: ListingOwnership,
    ) -> Result<Self, DomainError> {
        if initiator == counterpart {
            return Err(DomainError::SelfConversation);
        }

        match ownership {
            ListingOwnership::Initiator => Self::new(counterpart, initiator),
            ListingOwnership::Counterpart => Self::new(initiator, counterpart),
            ListingOwnership::Unowned => Err(DomainError::ListingOwnerUnknown),
            ListingOwnership::Unscoped => {
                let (low, high) = if initiator < counterpart {
                    (initiator, counterpart)
                } else {
                    (counterpart, initiator)
                };
                Self::new(low, high)
            }
        }
    }
}

/// 会话唯一键：同一组 (买家, 卖家, 商品) 至多存在一个会话。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub listing_id: Option<ListingId>,
}

impl ThreadKey {
    pub fn new(roles: ParticipantRoles, listing_id: Option<ListingId>) -> Self {
        Self {
            buyer_id: roles.buyer_id,
            seller_id: roles.seller_id,
            listing_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatThread {
    pub id: ThreadId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub listing_id: Option<ListingId>,
    pub created_at: Timestamp,
    pub last_message_at: Option<Timestamp>,
}

impl ChatThread {
    pub fn open(
        id: ThreadId,
        roles: ParticipantRoles,
        listing_id: Option<ListingId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            buyer_id: roles.buyer_id,
            seller_id: roles.seller_id,
            listing_id,
            created_at,
            last_message_at: None,
        }
    }

    pub fn key(&self) -> ThreadKey {
        ThreadKey {
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            listing_id: self.listing_id,
        }
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// 返回另一位参与者；`user_id` 不在会话中时返回 `None`。
    pub fn other_participant(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.buyer_id {
            Some(self.seller_id)
        } else if user_id == self.seller_id {
            Some(self.buyer_id)
        } else {
            None
        }
    }

    pub fn ensure_participant(&self, user_id: UserId) -> Result<UserId, DomainError> {
        self.other_participant(user_id)
            .ok_or(DomainError::NotParticipant)
    }

    /// 收件箱排序依据：最后一条消息时间，没有消息时退回创建时间。
    pub fn activity_at(&self) -> Timestamp {
        self.last_message_at.unwrap_or(self.created_at)
    }

    /// 只前进不后退：乱序提交的旧消息不会把 last_message_at 拉回去
    pub fn record_message(&mut self, at: Timestamp) {
        self.last_message_at = Some(self.last_message_at.map_or(at, |last| last.max(at)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::from(Uuid::new_v4())
    }

    #[test]
    fn unscoped_roles_do_not_depend_on_call_order() {
        let a = user();
        let b = user();

        let forward = ParticipantRoles::resolve(a, b, ListingOwnership::Unscoped).unwrap();
        let backward = ParticipantRoles::resolve(b, a, ListingOwnership::Unscoped).unwrap();

        assert_eq!(forward, backward);
        assert_ne!(forward.buyer_id, forward.seller_id);
    }

    #[test]
    fn listing_owner_becomes_seller() {
        let buyer = user();
        let owner = user();

        let from_buyer =
            ParticipantRoles::resolve(buyer, owner, ListingOwnership::Counterpart).unwrap();
        let from_owner =
            ParticipantRoles::resolve(owner, buyer, ListingOwnership::Initiator).unwrap();

        assert_eq!(from_buyer.seller_id, owner);
        assert_eq!(from_buyer.buyer_id, buyer);
        assert_eq!(from_buyer, from_owner);
    }

    #[test]
    fn self_conversation_is_rejected() {
        let a = user();
        assert_eq!(
            ParticipantRoles::resolve(a, a, ListingOwnership::Unscoped),
            Err(DomainError::SelfConversation)
        );
    }

    #[test]
    fn unowned_listing_is_rejected() {
        assert_eq!(
            ParticipantRoles::resolve(user(), user(), ListingOwnership::Unowned),
            Err(DomainError::ListingOwnerUnknown)
        );
    }

    #[test]
    fn other_participant_lookup() {
        let roles = ParticipantRoles::new(user(), user()).unwrap();
        let thread = ChatThread::open(ThreadId::from(Uuid::new_v4()), roles, None, Utc::now());

        assert_eq!(thread.other_participant(roles.buyer_id), Some(roles.seller_id));
        assert_eq!(thread.other_participant(roles.seller_id), Some(roles.buyer_id));
        assert_eq!(thread.other_participant(user()), None);
        assert_eq!(thread.activity_at(), thread.created_at);
    }

    #[test]
    fn last_message_at_never_moves_backwards() {
        let roles = ParticipantRoles::new(user(), user()).unwrap();
        let now = Utc::now();
        let mut thread = ChatThread::open(ThreadId::from(Uuid::new_v4()), roles, None, now);

        thread.record_message(now + chrono::Duration::seconds(5));
        thread.record_message(now + chrono::Duration::seconds(2));

        assert_eq!(thread.last_message_at, Some(now + chrono::Duration::seconds(5)));
        assert_eq!(thread.activity_at(), now + chrono::Duration::seconds(5));
    }
}
