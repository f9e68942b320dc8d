use std::sync::Arc;

use config::ChatConfig;
use domain::{ChatThread, ListingId, Message, MessageId, ThreadId, Timestamp, UserId};
use uuid::Uuid;

use crate::{
    broadcaster::ChatEventNotifier,
    clock::Clock,
    error::ApplicationError,
    ownership::OwnershipOracle,
    rate_limiter::SendRateLimiter,
    repository::{MessageRepository, ThreadRepository},
    sanitizer::SanitizationPipeline,
};

use super::{
    message_store::{validate_take, MessageStore},
    thread_resolver::ChatThreadResolver,
    unread_counter::UnreadCounter,
};

#[derive(Debug, Clone)]
pub struct OpenThreadRequest {
    pub user_id: Uuid,       // 发起会话的用户
    pub other_user_id: Uuid, // 对方
    pub listing_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

/// 已读截止点：时间戳或某条消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCutoff {
    At(Timestamp),
    UpToMessage(Uuid),
}

#[derive(Debug, Clone)]
pub struct MarkReadRequest {
    pub chat_id: Uuid,
    pub reader_id: Uuid,
    pub cutoff: ReadCutoff,
}

#[derive(Debug, Clone)]
pub struct EditMessageRequest {
    pub message_id: Uuid,
    pub actor_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct DeleteMessageRequest {
    pub message_id: Uuid,
    pub actor_id: Uuid,
}

pub struct ChatServiceDependencies {
    pub thread_repository: Arc<dyn ThreadRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub ownership_oracle: Arc<dyn OwnershipOracle>,
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn ChatEventNotifier>,
    pub sanitizer: SanitizationPipeline,
    pub config: ChatConfig,
}

/// 消息系统的唯一入口
pub struct ChatService {
    threads: Arc<dyn ThreadRepository>,
    resolver: ChatThreadResolver,
    store: MessageStore,
    unread: UnreadCounter,
    rate_limiter: SendRateLimiter,
    max_page_size: u32,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        let ChatServiceDependencies {
            thread_repository,
            message_repository,
            ownership_oracle,
            clock,
            notifier,
            sanitizer,
            config,
        } = deps;

        Self {
            resolver: ChatThreadResolver::new(
                thread_repository.clone(),
                ownership_oracle,
                clock.clone(),
            ),
            store: MessageStore::new(
                thread_repository.clone(),
                message_repository.clone(),
                clock.clone(),
                Arc::new(sanitizer),
                notifier,
                config.max_page_size,
                config.max_content_chars,
            ),
            unread: UnreadCounter::new(message_repository.clone()),
            rate_limiter: SendRateLimiter::new(message_repository, clock, config.send_rate_limit),
            threads: thread_repository,
            max_page_size: config.max_page_size,
        }
    }

    pub async fn open_thread(
        &self,
        request: OpenThreadRequest,
    ) -> Result<ChatThread, ApplicationError> {
        self.resolver
            .open_or_get(
                UserId::from(request.user_id),
                UserId::from(request.other_user_id),
                request.listing_id.map(ListingId::from),
            )
            .await
    }

    pub async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let sender_id = UserId::from(request.sender_id);
        self.rate_limiter.check(sender_id).await?;
        self.store
            .send(ThreadId::from(request.chat_id), sender_id, &request.content)
            .await
    }

    /// 用户参与的会话，最近有消息的排在前面
    pub async fn get_inbox(
        &self,
        user_id: Uuid,
        take: u32,
        skip: u32,
    ) -> Result<Vec<ChatThread>, ApplicationError> {
        let take = validate_take(take, self.max_page_size)?;
        let threads = self
            .threads
            .list_inbox(UserId::from(user_id), take, skip)
            .await?;
        Ok(threads)
    }

    /// 只有会话双方可以读取消息
    pub async fn get_messages(
        &self,
        viewer_id: Uuid,
        chat_id: Uuid,
        take: u32,
        before: Option<Timestamp>,
    ) -> Result<Vec<Message>, ApplicationError> {
        self.store
            .get_messages(UserId::from(viewer_id), ThreadId::from(chat_id), take, before)
            .await
    }

    pub async fn mark_read(&self, request: MarkReadRequest) -> Result<u64, ApplicationError> {
        let chat_id = ThreadId::from(request.chat_id);
        let reader_id = UserId::from(request.reader_id);
        match request.cutoff {
            ReadCutoff::At(up_to) => self.store.mark_read(chat_id, reader_id, up_to).await,
            ReadCutoff::UpToMessage(message_id) => {
                self.store
                    .mark_read_up_to_message(chat_id, reader_id, MessageId::from(message_id))
                    .await
            }
        }
    }

    pub async fn edit_message(
        &self,
        request: EditMessageRequest,
    ) -> Result<Message, ApplicationError> {
        self.store
            .edit(
                MessageId::from(request.message_id),
                UserId::from(request.actor_id),
                &request.content,
            )
            .await
    }

    pub async fn delete_message(
        &self,
        request: DeleteMessageRequest,
    ) -> Result<(), ApplicationError> {
        self.store
            .delete(
                MessageId::from(request.message_id),
                UserId::from(request.actor_id),
            )
            .await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<u64, ApplicationError> {
        self.unread.unread_count(UserId::from(user_id)).await
    }
}
