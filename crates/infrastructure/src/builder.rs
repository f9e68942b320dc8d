use std::sync::Arc;

use application::{
    ChatService, ChatServiceDependencies, LocalChatNotifier, OwnershipOracle,
    SanitizationPipeline, SystemClock,
};
use config::{AppConfig, ConfigError};
use thiserror::Error;

use crate::{
    migrations::MIGRATOR,
    repository::{create_pg_pool, PgStorage},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 持久化与事件广播的装配结果
#[derive(Clone)]
pub struct Infrastructure {
    pub storage: Arc<PgStorage>,
    pub notifier: Arc<LocalChatNotifier>,
}

impl Infrastructure {
    /// 校验配置、建立连接池并执行迁移
    pub async fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        config.validate()?;
        let pool =
            create_pg_pool(&config.database.url, config.database.max_connections).await?;
        MIGRATOR.run(&pool).await?;
        tracing::info!(
            max_connections = config.database.max_connections,
            "数据库连接池已就绪"
        );

        Ok(Self::from_storage(PgStorage::new(pool)))
    }

    pub fn from_storage(storage: PgStorage) -> Self {
        Self {
            storage: Arc::new(storage),
            notifier: Arc::new(LocalChatNotifier::new()),
        }
    }

    /// 用 PostgreSQL 仓储和进程内广播组装消息服务，商品归属查询由调用方提供
    pub fn chat_service(
        &self,
        config: &AppConfig,
        ownership_oracle: Arc<dyn OwnershipOracle>,
    ) -> ChatService {
        ChatService::new(ChatServiceDependencies {
            thread_repository: self.storage.thread_repository.clone(),
            message_repository: self.storage.message_repository.clone(),
            ownership_oracle,
            clock: Arc::new(SystemClock),
            notifier: self.notifier.clone(),
            sanitizer: SanitizationPipeline::from_config(&config.sanitizer),
            config: config.chat.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_config_is_rejected_before_connecting() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;

        let result = Infrastructure::connect(&config).await;

        assert!(matches!(result, Err(InfrastructureError::Config(_))));
    }
}
