// 进程内的事件广播器实现
use async_trait::async_trait;
use domain::{ChatEvent, UserId};
use tokio::sync::broadcast;

use crate::broadcaster::{ChatEventNotifier, NotifyError};

#[derive(Clone)]
pub struct LocalChatNotifier {
    sender: broadcast::Sender<ChatEvent>,
}

impl LocalChatNotifier {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    /// 只接收与某个用户相关的事件
    pub fn subscribe_user(&self, user_id: UserId) -> ChatEventStream {
        ChatEventStream::new(self.sender.subscribe(), user_id)
    }
}

impl Default for LocalChatNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatEventNotifier for LocalChatNotifier {
    async fn notify(&self, event: ChatEvent) -> Result<(), NotifyError> {
        // 没有订阅者不算失败
        if let Ok(receivers) = self.sender.send(event) {
            tracing::debug!(receivers, "事件已广播");
        }
        Ok(())
    }
}

// 按用户过滤的事件流
pub struct ChatEventStream {
    receiver: broadcast::Receiver<ChatEvent>,
    user_id: UserId,
}

impl ChatEventStream {
    pub fn new(receiver: broadcast::Receiver<ChatEvent>, user_id: UserId) -> Self {
        Self { receiver, user_id }
    }

    pub async fn recv(&mut self) -> Option<ChatEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if event.recipients().contains(&self.user_id) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %self.user_id, skipped, "事件流落后，部分事件被丢弃");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
