//! Inbound chat-platform events consumed by the bridge runtime.

#[derive(Debug, Clone, PartialEq, Eq)]
/// A thread opened under a forum channel.
pub struct ThreadCreated {
    pub thread_id: String,
    pub parent_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A message posted into a thread. `parent_id` is `None` when the message
/// channel is not a thread or its parent could not be resolved.
pub struct MessageCreated {
    pub thread_id: String,
    pub parent_id: Option<String>,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
}
