//! 领域模型错误定义
//!
//! 定义了会话与消息模型中所有可能的错误类型，以及持久化端口统一使用的仓储错误。

use std::error::Error as StdError;

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 参数校验失败
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 不能和自己开启会话
    #[error("cannot open a conversation with yourself")]
    SelfConversation,

    /// 商品归属无法确定（双方都不是商品所有者）
    #[error("neither participant owns the listing")]
    ListingOwnerUnknown,

    #[error("chat thread not found")]
    ThreadNotFound,

    #[error("message not found")]
    MessageNotFound,

    /// 用户不是会话参与者
    #[error("user is not a participant of the chat thread")]
    NotParticipant,

    /// 只有消息发送者可以修改或删除消息
    #[error("only the sender may modify the message")]
    NotMessageSender,
}

impl DomainError {
    /// 创建参数校验错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 持久化端口错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    /// 唯一约束冲突（例如并发首次联系时重复创建会话）
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("storage failure: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl RepositoryError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
