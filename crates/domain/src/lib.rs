//! 买卖双方消息系统核心领域模型
//!
//! 包含会话、消息等核心实体，以及角色分配规则和领域事件。

pub mod errors;
pub mod events;
pub mod message;
pub mod thread;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use events::*;
pub use message::Message;
pub use thread::{ChatThread, ListingOwnership, ParticipantRoles, ThreadKey};
pub use value_objects::*;
