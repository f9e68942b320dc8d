use crate::errors::DomainError;
use crate::thread::ChatThread;
use crate::value_objects::{ListingId, MessageContent, MessageId, ThreadId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ThreadId,
    pub content: MessageContent,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    /// 从会话复制过来，便于按商品过滤
    pub listing_id: Option<ListingId>,
    pub created_at: Timestamp,
    pub is_read: bool,
    pub updated_at: Option<Timestamp>,
}

impl Message {
    /// 在会话中以 `sender_id` 的身份创建一条新消息，接收者为会话的另一方。
    pub fn compose(
        id: MessageId,
        thread: &ChatThread,
        sender_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let receiver_id = thread.ensure_participant(sender_id)?;
        Ok(Self {
            id,
            chat_id: thread.id,
            content,
            sender_id,
            receiver_id,
            listing_id: thread.listing_id,
            created_at,
            is_read: false,
            updated_at: None,
        })
    }

    pub fn ensure_sender(&self, actor_id: UserId) -> Result<(), DomainError> {
        if self.sender_id != actor_id {
            return Err(DomainError::NotMessageSender);
        }
        Ok(())
    }

    pub fn edit(
        &mut self,
        actor_id: UserId,
        new_content: MessageContent,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_sender(actor_id)?;
        self.content = new_content;
        self.updated_at = Some(at);
        Ok(())
    }

    /// 已读状态只能从 false 变为 true；返回本次是否发生了变化。
    pub fn mark_read(&mut self) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        true
    }
}
