mod chat_service;
mod message_store;
mod thread_resolver;
mod unread_counter;

pub use chat_service::{
    ChatService, ChatServiceDependencies, DeleteMessageRequest, EditMessageRequest,
    MarkReadRequest, OpenThreadRequest, ReadCutoff, SendMessageRequest,
};
pub use message_store::MessageStore;
pub use thread_resolver::ChatThreadResolver;
pub use unread_counter::UnreadCounter;
