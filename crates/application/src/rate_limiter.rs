use std::sync::Arc;

use chrono::Duration;
use config::RateLimitConfig;
use domain::UserId;

use crate::{clock::Clock, error::ApplicationError, repository::MessageRepository};

// 窗口最长一年
const MAX_WINDOW_SECONDS: i64 = 365 * 24 * 60 * 60;

/// 发送限流器
/// 按发送者统计滑动窗口内已持久化的消息数，防止刷屏
pub struct SendRateLimiter {
    messages: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl SendRateLimiter {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            messages,
            clock,
            config,
        }
    }

    pub async fn check(&self, sender_id: UserId) -> Result<(), ApplicationError> {
        if !self.config.is_enabled() {
            return Ok(());
        }

        let seconds = i64::try_from(self.config.window_seconds)
            .unwrap_or(MAX_WINDOW_SECONDS)
            .min(MAX_WINDOW_SECONDS);
        let window = Duration::seconds(seconds);
        let from = self
            .clock
            .now()
            .checked_sub_signed(window)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        let sent = self.messages.count_sent_since(sender_id, from).await?;

        if sent >= u64::from(self.config.max_messages) {
            tracing::warn!(
                sender_id = %sender_id,
                sent,
                max = self.config.max_messages,
                "发送频率超限"
            );
            return Err(ApplicationError::RateLimited {
                current: sent,
                max: self.config.max_messages,
                window_seconds: self.config.window_seconds,
            });
        }

        Ok(())
    }
}
