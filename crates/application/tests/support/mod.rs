#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use application::{
    ChatEventNotifier, ChatService, ChatServiceDependencies, Clock, MessageRepository,
    OwnershipError, OwnershipOracle, SanitizationPipeline, ThreadRepository,
};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use config::{ChatConfig, RateLimitConfig, SanitizerConfig};
use domain::{
    ChatThread, ListingId, Message, MessageId, RepositoryError, ThreadId, ThreadKey, Timestamp,
    UserId,
};
use uuid::Uuid;

// 测试用的内存持久化实现，状态归测试自己所有
#[derive(Default)]
struct StoreState {
    threads: HashMap<ThreadId, ChatThread>,
    messages: HashMap<MessageId, Message>,
}

#[derive(Default, Clone)]
pub struct InMemoryChatStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread(&self, id: ThreadId) -> Option<ChatThread> {
        self.state.lock().unwrap().threads.get(&id).cloned()
    }

    pub fn thread_count(&self) -> usize {
        self.state.lock().unwrap().threads.len()
    }

    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.state.lock().unwrap().messages.get(&id).cloned()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    pub fn all_messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().messages.values().cloned().collect()
    }

    pub fn all_threads(&self) -> Vec<ChatThread> {
        self.state.lock().unwrap().threads.values().cloned().collect()
    }

    /// 绕过服务直接写入一个会话，用来模拟另一个并发请求
    pub fn insert_thread(&self, thread: ChatThread) {
        self.state
            .lock()
            .unwrap()
            .threads
            .insert(thread.id, thread);
    }
}

#[async_trait]
impl ThreadRepository for InMemoryChatStore {
    async fn find_by_key(&self, key: ThreadKey) -> Result<Option<ChatThread>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.threads.values().find(|t| t.key() == key).cloned())
    }

    async fn find_by_id(&self, id: ThreadId) -> Result<Option<ChatThread>, RepositoryError> {
        Ok(self.state.lock().unwrap().threads.get(&id).cloned())
    }

    async fn create(&self, thread: ChatThread) -> Result<ChatThread, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.threads.values().any(|t| t.key() == thread.key()) {
            return Err(RepositoryError::conflict("chat thread already exists"));
        }
        state.threads.insert(thread.id, thread.clone());
        Ok(thread)
    }

    async fn list_inbox(
        &self,
        user_id: UserId,
        take: u32,
        skip: u32,
    ) -> Result<Vec<ChatThread>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut threads: Vec<ChatThread> = state
            .threads
            .values()
            .filter(|t| t.is_participant(user_id))
            .cloned()
            .collect();
        threads.sort_by(|a, b| {
            b.activity_at()
                .cmp(&a.activity_at())
                .then_with(|| b.id.0.cmp(&a.id.0))
        });
        Ok(threads
            .into_iter()
            .skip(skip as usize)
            .take(take as usize)
            .collect())
    }
}

#[async_trait]
impl MessageRepository for InMemoryChatStore {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let thread = state
            .threads
            .get_mut(&message.chat_id)
            .ok_or(RepositoryError::NotFound)?;
        thread.record_message(message.created_at);
        state.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        match state.messages.get_mut(&message.id) {
            Some(slot) => {
                *slot = message.clone();
                Ok(message)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn remove(&self, id: MessageId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        state
            .messages
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self.state.lock().unwrap().messages.get(&id).cloned())
    }

    async fn list_for_chat(
        &self,
        chat_id: ThreadId,
        take: u32,
        before: Option<Timestamp>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut messages: Vec<Message> = state
            .messages
            .values()
            .filter(|m| m.chat_id == chat_id)
            .filter(|m| before.map_or(true, |cursor| m.created_at < cursor))
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        messages.truncate(take as usize);
        Ok(messages)
    }

    async fn mark_read_up_to(
        &self,
        chat_id: ThreadId,
        reader_id: UserId,
        up_to: Timestamp,
    ) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let changed = state
            .messages
            .values_mut()
            .filter(|m| m.chat_id == chat_id && m.receiver_id == reader_id && m.created_at <= up_to)
            .filter_map(|m| m.mark_read().then_some(()))
            .count();
        Ok(changed as u64)
    }

    async fn count_unread(&self, receiver_id: UserId) -> Result<u64, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .values()
            .filter(|m| m.receiver_id == receiver_id && !m.is_read)
            .count() as u64)
    }

    async fn count_sent_since(
        &self,
        sender_id: UserId,
        from: Timestamp,
    ) -> Result<u64, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .values()
            .filter(|m| m.sender_id == sender_id && m.created_at >= from)
            .count() as u64)
    }
}

/// 可控时钟：每次读取后前进 `step`，step 为 0 时时间静止
pub struct ManualClock {
    now: Mutex<Timestamp>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: Timestamp, step: Duration) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }

    /// 从固定时间开始、每次前进一秒
    pub fn ticking() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(), Duration::seconds(1))
    }

    pub fn frozen(at: Timestamp) -> Self {
        Self::new(at, Duration::zero())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn peek(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let mut now = self.now.lock().unwrap();
        let current = *now;
        *now += self.step;
        current
    }
}

/// 固定的商品归属表
#[derive(Default)]
pub struct StaticOwnershipOracle {
    owners: HashMap<ListingId, UserId>,
}

impl StaticOwnershipOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, listing_id: ListingId, owner_id: UserId) -> Self {
        self.owners.insert(listing_id, owner_id);
        self
    }
}

#[async_trait]
impl OwnershipOracle for StaticOwnershipOracle {
    async fn is_owner_of_listing(
        &self,
        user_id: UserId,
        listing_id: ListingId,
    ) -> Result<bool, OwnershipError> {
        Ok(self.owners.get(&listing_id) == Some(&user_id))
    }
}

pub fn new_user() -> UserId {
    UserId::from(Uuid::new_v4())
}

pub fn new_listing() -> ListingId {
    ListingId::from(Uuid::new_v4())
}

pub fn test_sanitizer_config() -> SanitizerConfig {
    SanitizerConfig {
        standalone_words: vec!["ass".to_string()],
        substring_words: vec!["shit".to_string()],
        whitelist_words: vec!["class".to_string()],
        ..SanitizerConfig::default()
    }
}

pub fn unlimited_chat_config() -> ChatConfig {
    ChatConfig {
        send_rate_limit: RateLimitConfig::disabled(),
        ..ChatConfig::default()
    }
}

pub struct TestHarness {
    pub store: InMemoryChatStore,
    pub clock: Arc<ManualClock>,
    pub service: ChatService,
}

pub struct HarnessBuilder {
    thread_repository: Option<Arc<dyn ThreadRepository>>,
    ownership: Arc<dyn OwnershipOracle>,
    notifier: Arc<dyn ChatEventNotifier>,
    clock: Arc<ManualClock>,
    config: ChatConfig,
    store: InMemoryChatStore,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            thread_repository: None,
            ownership: Arc::new(StaticOwnershipOracle::new()),
            notifier: Arc::new(application::LocalChatNotifier::new()),
            clock: Arc::new(ManualClock::ticking()),
            config: unlimited_chat_config(),
            store: InMemoryChatStore::new(),
        }
    }
}

impl HarnessBuilder {
    pub fn ownership(mut self, ownership: impl OwnershipOracle + 'static) -> Self {
        self.ownership = Arc::new(ownership);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn ChatEventNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: InMemoryChatStore) -> Self {
        self.store = store;
        self
    }

    /// 用包装过的会话仓储替换默认实现（消息仓储仍然使用内存实现）
    pub fn thread_repository(mut self, repository: Arc<dyn ThreadRepository>) -> Self {
        self.thread_repository = Some(repository);
        self
    }

    pub fn build(self) -> TestHarness {
        let store = self.store;
        let thread_repository = self
            .thread_repository
            .unwrap_or_else(|| Arc::new(store.clone()));
        let service = ChatService::new(ChatServiceDependencies {
            thread_repository,
            message_repository: Arc::new(store.clone()),
            ownership_oracle: self.ownership,
            clock: self.clock.clone(),
            notifier: self.notifier,
            sanitizer: SanitizationPipeline::from_config(&test_sanitizer_config()),
            config: self.config,
        });

        TestHarness {
            store,
            clock: self.clock,
            service,
        }
    }
}

pub fn harness() -> TestHarness {
    HarnessBuilder::default().build()
}
