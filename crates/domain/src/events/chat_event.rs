//! 聊天相关的领域事件
//!
//! 消息生命周期中产生的事件，交给外部的推送/WebSocket 扇出使用。

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::value_objects::{MessageId, ThreadId, UserId};

/// 聊天相关的领域事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// 新消息
    MessageNew { message: Message },

    /// 读者把一批消息标记为已读
    MessagesRead {
        chat_id: ThreadId,
        reader_id: UserId,
        other_participant_id: Option<UserId>,
        count: u64,
    },

    /// 消息被编辑
    MessageUpdated { message: Message },

    /// 消息被删除
    MessageDeleted {
        chat_id: ThreadId,
        message_id: MessageId,
        actor_id: UserId,
        other_participant_id: UserId,
        /// 删除后会话中已没有任何消息
        thread_emptied: bool,
    },
}

impl ChatEvent {
    pub fn message_new(message: Message) -> Self {
        ChatEvent::MessageNew { message }
    }

    pub fn messages_read(
        chat_id: ThreadId,
        reader_id: UserId,
        other_participant_id: Option<UserId>,
        count: u64,
    ) -> Self {
        ChatEvent::MessagesRead {
            chat_id,
            reader_id,
            other_participant_id,
            count,
        }
    }

    pub fn message_updated(message: Message) -> Self {
        ChatEvent::MessageUpdated { message }
    }

    pub fn message_deleted(
        chat_id: ThreadId,
        message_id: MessageId,
        actor_id: UserId,
        other_participant_id: UserId,
        thread_emptied: bool,
    ) -> Self {
        ChatEvent::MessageDeleted {
            chat_id,
            message_id,
            actor_id,
            other_participant_id,
            thread_emptied,
        }
    }

    pub fn chat_id(&self) -> ThreadId {
        match self {
            ChatEvent::MessageNew { message } | ChatEvent::MessageUpdated { message } => {
                message.chat_id
            }
            ChatEvent::MessagesRead { chat_id, .. } | ChatEvent::MessageDeleted { chat_id, .. } => {
                *chat_id
            }
        }
    }

    /// 需要收到该事件的用户（会话双方）。
    pub fn recipients(&self) -> Vec<UserId> {
        match self {
            ChatEvent::MessageNew { message } | ChatEvent::MessageUpdated { message } => {
                vec![message.sender_id, message.receiver_id]
            }
            ChatEvent::MessagesRead {
                reader_id,
                other_participant_id,
                ..
            } => std::iter::once(*reader_id)
                .chain(*other_participant_id)
                .collect(),
            ChatEvent::MessageDeleted {
                actor_id,
                other_participant_id,
                ..
            } => vec![*actor_id, *other_participant_id],
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::MessageNew { .. } => "message_new",
            ChatEvent::MessagesRead { .. } => "messages_read",
            ChatEvent::MessageUpdated { .. } => "message_updated",
            ChatEvent::MessageDeleted { .. } => "message_deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn deleted_event_serializes_with_type_tag() {
        let event = ChatEvent::message_deleted(
            ThreadId::from(Uuid::nil()),
            MessageId::from(Uuid::nil()),
            UserId::from(Uuid::nil()),
            UserId::from(Uuid::nil()),
            true,
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message_deleted");
        assert_eq!(json["thread_emptied"], true);
        assert_eq!(event.event_type(), "message_deleted");
    }

    #[test]
    fn read_event_recipients_skip_missing_participant() {
        let reader = UserId::from(Uuid::new_v4());
        let event = ChatEvent::messages_read(ThreadId::from(Uuid::new_v4()), reader, None, 3);
        assert_eq!(event.recipients(), vec![reader]);
    }
}
