use std::sync::Arc;

use domain::UserId;

use crate::{error::ApplicationError, repository::MessageRepository};

/// 未读数统计：所有会话中发给该用户且未读的消息总数，不做缓存
pub struct UnreadCounter {
    messages: Arc<dyn MessageRepository>,
}

impl UnreadCounter {
    pub fn new(messages: Arc<dyn MessageRepository>) -> Self {
        Self { messages }
    }

    pub async fn unread_count(&self, user_id: UserId) -> Result<u64, ApplicationError> {
        let count = self.messages.count_unread(user_id).await?;
        tracing::debug!(user_id = %user_id, count, "查询未读数");
        Ok(count)
    }
}
