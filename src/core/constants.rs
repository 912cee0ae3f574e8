//! Shared constants used across the application

/// Backend origin used when neither `--server` nor the config file names one.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Title and seed greeting of the chat created at startup.
pub const WELCOME_CHAT_TITLE: &str = "Welcome Chat";
pub const WELCOME_GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";

/// Title and seed greeting of chats created with the new-chat action.
pub const NEW_CHAT_TITLE: &str = "New Chat";
pub const NEW_CHAT_GREETING: &str =
    "Hello! I'm ready to help you with anything you need. What would you like to discuss?";

/// Fixed user-facing text for failed requests. No structured error detail is
/// surfaced beyond this string.
pub const STREAM_ERROR_TEXT: &str = "Sorry, something went wrong!";

/// A chat takes its title from the first user message, truncated to this many
/// characters with an ellipsis appended.
pub const TITLE_MAX_CHARS: usize = 30;

/// File under the platform data directory holding the session identifier.
pub const SESSION_ID_FILE: &str = "session-id";
