use async_trait::async_trait;
use domain::ChatEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("event delivery failed: {0}")]
    Failed(String),
}

impl NotifyError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 聊天事件出口，推送/WebSocket 扇出由外部实现
#[async_trait]
pub trait ChatEventNotifier: Send + Sync {
    async fn notify(&self, event: ChatEvent) -> Result<(), NotifyError>;
}

/// 数据已经提交后才发事件，事件失败只记录日志，不回滚也不向调用方报错
pub(crate) async fn notify_committed(notifier: &dyn ChatEventNotifier, event: ChatEvent) {
    let event_type = event.event_type();
    let chat_id = event.chat_id();
    if let Err(err) = notifier.notify(event).await {
        tracing::error!(
            chat_id = %chat_id,
            event_type,
            error = %err,
            "数据已提交，但事件推送失败"
        );
    }
}
