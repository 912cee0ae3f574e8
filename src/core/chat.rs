//! Chat threads and the store state machine
//!
//! The store owns every conversation thread and tracks which one is active.
//! All operations are synchronous and atomic with respect to the in-memory
//! state; the event loop never observes a partial update.

use chrono::{DateTime, Utc};

use crate::core::constants::{
    NEW_CHAT_GREETING, NEW_CHAT_TITLE, STREAM_ERROR_TEXT, TITLE_MAX_CHARS, WELCOME_CHAT_TITLE,
    WELCOME_GREETING,
};
use crate::core::message::Message;

/// One conversation thread. `messages` is never empty: every chat is seeded
/// with a bot greeting at creation.
#[derive(Debug, Clone)]
pub struct Chat {
    pub id: u64,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    fn new(id: u64, title: &str, greeting: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            messages: vec![Message::bot(greeting)],
            created_at: Utc::now(),
        }
    }
}

/// Ordered collection of chats plus the active selection. Insertion order is
/// sidebar display order: newest chat first. At least one chat always
/// exists, and `active_chat_id` always references an existing chat.
#[derive(Debug)]
pub struct ChatStore {
    chats: Vec<Chat>,
    active_chat_id: u64,
}

impl ChatStore {
    /// Seeds the store with the welcome chat and makes it active.
    pub fn new() -> Self {
        let chat = Chat::new(now_millis(), WELCOME_CHAT_TITLE, WELCOME_GREETING);
        let active_chat_id = chat.id;
        Self {
            chats: vec![chat],
            active_chat_id,
        }
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn active_chat_id(&self) -> u64 {
        self.active_chat_id
    }

    pub fn active_chat(&self) -> &Chat {
        // The selection invariant guarantees the lookup succeeds.
        self.chats
            .iter()
            .find(|c| c.id == self.active_chat_id)
            .unwrap_or(&self.chats[0])
    }

    pub fn chat(&self, id: u64) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == id)
    }

    fn chat_mut(&mut self, id: u64) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|c| c.id == id)
    }

    /// Creates a new chat with a fresh unique id, prepends it to the
    /// sidebar order and makes it active.
    pub fn create_chat(&mut self) -> u64 {
        let id = self.next_chat_id();
        let chat = Chat::new(id, NEW_CHAT_TITLE, NEW_CHAT_GREETING);
        self.chats.insert(0, chat);
        self.active_chat_id = id;
        id
    }

    /// Wall-clock derived id, bumped past any collision with a live chat.
    fn next_chat_id(&self) -> u64 {
        let mut id = now_millis();
        while self.chats.iter().any(|c| c.id == id) {
            id += 1;
        }
        id
    }

    /// Sets the active chat. Unknown ids are ignored so a stale selection
    /// can never corrupt the store.
    pub fn select_chat(&mut self, id: u64) {
        if self.chats.iter().any(|c| c.id == id) {
            self.active_chat_id = id;
        }
    }

    /// Removes a chat. Rejected (returns false, no state change) when it
    /// would empty the collection or the id is unknown. Deleting the active
    /// chat promotes the first remaining chat.
    pub fn delete_chat(&mut self, id: u64) -> bool {
        if self.chats.len() <= 1 || !self.chats.iter().any(|c| c.id == id) {
            return false;
        }
        self.chats.retain(|c| c.id != id);
        if self.active_chat_id == id {
            self.active_chat_id = self.chats[0].id;
        }
        true
    }

    /// Appends a user message. The chat's first user message (only the seed
    /// greeting existed before) also derives the title.
    pub fn append_user_message(&mut self, chat_id: u64, text: &str) {
        if let Some(chat) = self.chat_mut(chat_id) {
            if chat.messages.len() == 1 {
                chat.title = derive_title(text);
            }
            chat.messages.push(Message::user(text));
        }
    }

    /// Appends an empty bot message marking the start of a streamed reply.
    pub fn append_placeholder_bot_message(&mut self, chat_id: u64) {
        if let Some(chat) = self.chat_mut(chat_id) {
            chat.messages.push(Message::bot(""));
        }
    }

    /// Replaces the content of the chat's final message wholesale. Streams
    /// deliver the full accumulated text per chunk, so last writer wins.
    /// Updates bound to a deleted chat id are dropped.
    pub fn update_last_message_content(&mut self, chat_id: u64, content: &str) {
        if let Some(chat) = self.chat_mut(chat_id) {
            if let Some(last) = chat.messages.last_mut() {
                last.content = content.to_string();
            }
        }
    }

    /// Appends the fixed failure message for a request that went wrong.
    pub fn append_error_message(&mut self, chat_id: u64) {
        if let Some(chat) = self.chat_mut(chat_id) {
            chat.messages.push(Message::error(STREAM_ERROR_TEXT));
        }
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// First user message, truncated to [`TITLE_MAX_CHARS`] characters with an
/// ellipsis appended when anything was cut.
fn derive_title(text: &str) -> String {
    let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
    if text.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}
