use async_trait::async_trait;
use domain::{
    ChatThread, Message, MessageId, RepositoryError, ThreadId, ThreadKey, Timestamp, UserId,
};

#[async_trait]
pub trait ThreadRepository: Send + Sync {
    // 按 (买家, 卖家, 商品) 查找会话，商品为空也是一个独立的键值
    async fn find_by_key(&self, key: ThreadKey) -> Result<Option<ChatThread>, RepositoryError>;

    async fn find_by_id(&self, id: ThreadId) -> Result<Option<ChatThread>, RepositoryError>;

    // 键已存在时必须返回 RepositoryError::Conflict，解析器依赖它处理并发首次联系
    async fn create(&self, thread: ChatThread) -> Result<ChatThread, RepositoryError>;

    // 用户参与的会话，按最后消息时间倒序（无消息时用创建时间）
    async fn list_inbox(
        &self,
        user_id: UserId,
        take: u32,
        skip: u32,
    ) -> Result<Vec<ChatThread>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    // 写入消息并把会话的 last_message_at 更新为消息的 created_at，两者必须在同一事务中完成
    async fn append(&self, message: Message) -> Result<Message, RepositoryError>;

    async fn update(&self, message: Message) -> Result<Message, RepositoryError>;

    async fn remove(&self, id: MessageId) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;

    // created_at 倒序，同一时间按 id 倒序；before 为严格小于
    async fn list_for_chat(
        &self,
        chat_id: ThreadId,
        take: u32,
        before: Option<Timestamp>,
    ) -> Result<Vec<Message>, RepositoryError>;

    // 把发给 reader 且 created_at <= up_to 的未读消息标记为已读，返回实际变更的条数
    async fn mark_read_up_to(
        &self,
        chat_id: ThreadId,
        reader_id: UserId,
        up_to: Timestamp,
    ) -> Result<u64, RepositoryError>;

    async fn count_unread(&self, receiver_id: UserId) -> Result<u64, RepositoryError>;

    async fn count_sent_since(
        &self,
        sender_id: UserId,
        from: Timestamp,
    ) -> Result<u64, RepositoryError>;
}
