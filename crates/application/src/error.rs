use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::ownership::OwnershipError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("ownership lookup failed: {0}")]
    Ownership(#[from] OwnershipError),
    #[error("rate limit exceeded: {current}/{max} messages per {window_seconds}s")]
    RateLimited {
        current: u64,
        max: u32,
        window_seconds: u64,
    },
}

/// 对外（HTTP 层）暴露的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Forbidden,
    Conflict,
    RateLimited,
    StorageFailure,
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Domain(err) => match err {
                DomainError::InvalidArgument { .. }
                | DomainError::SelfConversation
                | DomainError::ListingOwnerUnknown => ErrorKind::InvalidInput,
                DomainError::ThreadNotFound | DomainError::MessageNotFound => ErrorKind::NotFound,
                DomainError::NotParticipant | DomainError::NotMessageSender => {
                    ErrorKind::Forbidden
                }
            },
            ApplicationError::Repository(err) => match err {
                RepositoryError::NotFound => ErrorKind::NotFound,
                RepositoryError::Conflict(_) => ErrorKind::Conflict,
                RepositoryError::Storage { .. } => ErrorKind::StorageFailure,
            },
            // 外部协作方不可用，与存储失败同等对待，由调用方决定是否重试
            ApplicationError::Ownership(_) => ErrorKind::StorageFailure,
            ApplicationError::RateLimited { .. } => ErrorKind::RateLimited,
        }
    }
}
