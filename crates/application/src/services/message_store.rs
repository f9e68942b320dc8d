use std::sync::Arc;

use domain::{
    ChatEvent, ChatThread, DomainError, Message, MessageContent, MessageId, ThreadId, Timestamp,
    UserId,
};
use uuid::Uuid;

use crate::{
    broadcaster::{notify_committed, ChatEventNotifier},
    clock::Clock,
    error::ApplicationError,
    repository::{MessageRepository, ThreadRepository},
    sanitizer::SanitizationPipeline,
};

/// 消息存储：消息的发送、分页、已读、编辑与删除。
///
/// 每个写操作在数据提交之后才发出对应的事件。
pub struct MessageStore {
    threads: Arc<dyn ThreadRepository>,
    messages: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
    sanitizer: Arc<SanitizationPipeline>,
    notifier: Arc<dyn ChatEventNotifier>,
    max_page_size: u32,
    max_content_chars: usize,
}

impl MessageStore {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        messages: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
        sanitizer: Arc<SanitizationPipeline>,
        notifier: Arc<dyn ChatEventNotifier>,
        max_page_size: u32,
        max_content_chars: usize,
    ) -> Self {
        Self {
            threads,
            messages,
            clock,
            sanitizer,
            notifier,
            max_page_size,
            max_content_chars,
        }
    }

    pub async fn send(
        &self,
        chat_id: ThreadId,
        sender_id: UserId,
        raw_content: &str,
    ) -> Result<Message, ApplicationError> {
        let thread = self.load_thread(chat_id).await?;
        thread.ensure_participant(sender_id)?;
        let content = self.clean_content(raw_content)?;

        let message = Message::compose(
            MessageId::from(Uuid::new_v4()),
            &thread,
            sender_id,
            content,
            self.clock.now(),
        )?;
        // 消息写入与会话 last_message_at 更新在同一次调用内原子完成
        let stored = self.messages.append(message).await?;

        tracing::info!(
            chat_id = %stored.chat_id,
            message_id = %stored.id,
            sender_id = %stored.sender_id,
            "消息已发送"
        );
        notify_committed(
            self.notifier.as_ref(),
            ChatEvent::message_new(stored.clone()),
        )
        .await;
        Ok(stored)
    }

    /// 按 created_at 倒序返回一页消息，`before` 为严格小于的游标。
    /// 只有会话双方可以读取
    pub async fn get_messages(
        &self,
        viewer_id: UserId,
        chat_id: ThreadId,
        take: u32,
        before: Option<Timestamp>,
    ) -> Result<Vec<Message>, ApplicationError> {
        let take = validate_take(take, self.max_page_size)?;
        let thread = self.load_thread(chat_id).await?;
        thread.ensure_participant(viewer_id)?;

        let page = self.messages.list_for_chat(chat_id, take, before).await?;
        tracing::debug!(chat_id = %chat_id, take, returned = page.len(), "读取消息分页");
        Ok(page)
    }

    /// 把 `up_to` 及之前发给 `reader_id` 的消息标记为已读，返回实际变更的条数。
    /// 重复调用返回 0，且不会发事件。
    pub async fn mark_read(
        &self,
        chat_id: ThreadId,
        reader_id: UserId,
        up_to: Timestamp,
    ) -> Result<u64, ApplicationError> {
        let thread = self.load_thread(chat_id).await?;
        let other_participant = thread.ensure_participant(reader_id)?;

        let count = self
            .messages
            .mark_read_up_to(chat_id, reader_id, up_to)
            .await?;
        tracing::debug!(chat_id = %chat_id, reader_id = %reader_id, count, "标记已读");

        if count > 0 {
            notify_committed(
                self.notifier.as_ref(),
                ChatEvent::messages_read(chat_id, reader_id, Some(other_participant), count),
            )
            .await;
        }
        Ok(count)
    }

    /// 以消息 id 作为已读截止点，消息必须属于该会话
    pub async fn mark_read_up_to_message(
        &self,
        chat_id: ThreadId,
        reader_id: UserId,
        message_id: MessageId,
    ) -> Result<u64, ApplicationError> {
        let message = self.load_message(message_id).await?;
        if message.chat_id != chat_id {
            return Err(DomainError::MessageNotFound.into());
        }
        self.mark_read(chat_id, reader_id, message.created_at).await
    }

    pub async fn edit(
        &self,
        message_id: MessageId,
        actor_id: UserId,
        new_raw_content: &str,
    ) -> Result<Message, ApplicationError> {
        let mut message = self.load_message(message_id).await?;
        message.ensure_sender(actor_id)?;
        let content = self.clean_content(new_raw_content)?;

        message.edit(actor_id, content, self.clock.now())?;
        let updated = self.messages.update(message).await?;

        tracing::info!(chat_id = %updated.chat_id, message_id = %updated.id, "消息已编辑");
        notify_committed(
            self.notifier.as_ref(),
            ChatEvent::message_updated(updated.clone()),
        )
        .await;
        Ok(updated)
    }

    /// 硬删除。会话的 last_message_at 保持不变
    pub async fn delete(
        &self,
        message_id: MessageId,
        actor_id: UserId,
    ) -> Result<(), ApplicationError> {
        let message = self.load_message(message_id).await?;
        message.ensure_sender(actor_id)?;

        self.messages.remove(message_id).await?;
        let thread_emptied = self
            .messages
            .list_for_chat(message.chat_id, 1, None)
            .await?
            .is_empty();

        tracing::info!(
            chat_id = %message.chat_id,
            message_id = %message_id,
            thread_emptied,
            "消息已删除"
        );
        notify_committed(
            self.notifier.as_ref(),
            ChatEvent::message_deleted(
                message.chat_id,
                message_id,
                actor_id,
                message.receiver_id,
                thread_emptied,
            ),
        )
        .await;
        Ok(())
    }

    async fn load_thread(&self, chat_id: ThreadId) -> Result<ChatThread, ApplicationError> {
        self.threads
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| DomainError::ThreadNotFound.into())
    }

    async fn load_message(&self, message_id: MessageId) -> Result<Message, ApplicationError> {
        self.messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| DomainError::MessageNotFound.into())
    }

    fn clean_content(&self, raw: &str) -> Result<MessageContent, ApplicationError> {
        if raw.trim().is_empty() {
            return Err(DomainError::invalid_argument("content", "must not be empty").into());
        }
        if raw.chars().count() > self.max_content_chars {
            return Err(DomainError::invalid_argument(
                "content",
                format!("must not exceed {} characters", self.max_content_chars),
            )
            .into());
        }
        let sanitized = self.sanitizer.sanitize(raw);
        MessageContent::new(sanitized).map_err(|_| {
            DomainError::invalid_argument("content", "nothing left after sanitization").into()
        })
    }
}

/// 分页大小必须在 1..=max 之间
pub(crate) fn validate_take(take: u32, max: u32) -> Result<u32, DomainError> {
    if take == 0 || take > max {
        return Err(DomainError::invalid_argument(
            "take",
            format!("must be between 1 and {max}"),
        ));
    }
    Ok(take)
}
