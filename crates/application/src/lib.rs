//! 应用层实现。
//!
//! 这里提供买卖双方私信的用例服务，处理输入校验、消息净化、
//! 以及对外部协作方（持久化、商品归属查询、事件推送）的抽象。

pub mod broadcaster;
pub mod clock;
pub mod error;
pub mod local_broadcast;
pub mod ownership;
pub mod rate_limiter;
pub mod repository;
pub mod sanitizer;
pub mod services;

pub use broadcaster::{ChatEventNotifier, NotifyError};
pub use clock::{Clock, SystemClock};
pub use error::{ApplicationError, ErrorKind};
pub use local_broadcast::{ChatEventStream, LocalChatNotifier};
pub use ownership::{OwnershipError, OwnershipOracle};
pub use rate_limiter::SendRateLimiter;
pub use repository::{MessageRepository, ThreadRepository};
pub use sanitizer::{
    HtmlSanitizer, ProfanityFilter, ProfanityRules, SanitizationPipeline, TextSanitizer,
};
pub use services::{
    ChatService, ChatServiceDependencies, ChatThreadResolver, DeleteMessageRequest,
    EditMessageRequest, MarkReadRequest, MessageStore, OpenThreadRequest, ReadCutoff,
    SendMessageRequest, UnreadCounter,
};
