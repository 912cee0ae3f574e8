//! URL construction for the chat backend
//!
//! The backend exposes a single endpoint, `/chat`. Base URLs are normalized
//! so a configured trailing slash never produces a double slash.

/// Remove trailing slashes from a configured base URL.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// The chat endpoint for a backend origin. Query parameters (`input`,
/// `session_id`) are attached by the request builder, not here.
pub fn chat_endpoint_url(base_url: &str) -> String {
    format!("{}/chat", normalize_base_url(base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_slashes() {
        assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
        assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
        assert_eq!(normalize_base_url("http://localhost:8000///"), "http://localhost:8000");
        assert_eq!(normalize_base_url(""), "");
    }

    #[test]
    fn chat_endpoint_appends_single_path_segment() {
        assert_eq!(chat_endpoint_url("http://localhost:8000"), "http://localhost:8000/chat");
        assert_eq!(chat_endpoint_url("http://localhost:8000/"), "http://localhost:8000/chat");
        assert_eq!(
            chat_endpoint_url("https://chat.example.com/api/"),
            "https://chat.example.com/api/chat"
        );
    }
}
