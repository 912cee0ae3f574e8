//! Application state and the two mutation entry points
//!
//! [`App::submit_message`] starts a request bound to the active chat, and
//! [`App::apply_stream_message`] applies stream events to the store. The
//! event loop never mutates chats directly, which keeps every update atomic
//! with respect to what the renderer observes.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use reqwest::Client;
use tui_textarea::TextArea;
use unicode_width::UnicodeWidthStr;

use crate::core::chat::ChatStore;
use crate::core::chat_stream::{ChatStreamService, FetchParams, StreamMessage};
use crate::core::message::MessageKind;
use crate::core::session::get_or_create_session_id;
use crate::logging::LoggingState;

pub struct App {
    pub store: ChatStore,
    pub textarea: TextArea<'static>,
    /// True from submit until the stream ends or fails. Disables the
    /// composer and shows the typing indicator.
    pub is_loading: bool,
    pub sidebar_collapsed: bool,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    pub client: Client,
    pub server_url: String,
    pub session_id: String,
    pub logging: LoggingState,
}

impl App {
    pub fn new(server_url: String, log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let session_id = get_or_create_session_id()?;
        let logging = LoggingState::new(log_file)?;
        Ok(Self::with_parts(server_url, session_id, logging))
    }

    fn with_parts(server_url: String, session_id: String, logging: LoggingState) -> Self {
        let mut textarea = TextArea::default();
        textarea.set_cursor_line_style(Style::default());
        App {
            store: ChatStore::new(),
            textarea,
            is_loading: false,
            sidebar_collapsed: false,
            scroll_offset: 0,
            auto_scroll: true,
            client: Client::new(),
            server_url,
            session_id,
            logging,
        }
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    fn clear_input(&mut self) {
        let mut textarea = TextArea::default();
        textarea.set_cursor_line_style(Style::default());
        self.textarea = textarea;
    }

    /// Submit path shared by the Enter key and any send control. A no-op on
    /// empty or whitespace-only input and while a request is in flight, so
    /// overlapping submissions cannot start from the UI. Returns whether a
    /// request was started.
    pub fn submit_message(&mut self, stream: &ChatStreamService) -> bool {
        if self.is_loading {
            return false;
        }
        let input = self.input_text();
        if input.trim().is_empty() {
            return false;
        }

        // Bind the target chat here; the stream keeps mutating this chat
        // even if the user switches threads while it is in flight.
        let chat_id = self.store.active_chat_id();
        self.store.append_user_message(chat_id, &input);
        if let Err(e) = self.logging.log_message(&format!("You: {input}")) {
            tracing::warn!(error = %e, "transcript write failed");
        }
        self.clear_input();
        self.is_loading = true;
        self.auto_scroll = true;

        stream.spawn_fetch(FetchParams {
            client: self.client.clone(),
            server_url: self.server_url.clone(),
            input,
            session_id: self.session_id.clone(),
            chat_id,
        });
        true
    }

    /// Applies one stream event to the chat it was bound to. The loading
    /// flag is released by `End`, which every stream sends on every exit
    /// path.
    pub fn apply_stream_message(&mut self, message: StreamMessage, chat_id: u64) {
        match message {
            StreamMessage::Open => {
                self.store.append_placeholder_bot_message(chat_id);
            }
            StreamMessage::Content(content) => {
                self.store.update_last_message_content(chat_id, &content);
            }
            StreamMessage::Error => {
                self.store.append_error_message(chat_id);
                if let Err(e) = self
                    .logging
                    .log_message(&format!("[error] {}", crate::core::constants::STREAM_ERROR_TEXT))
                {
                    tracing::warn!(error = %e, "transcript write failed");
                }
            }
            StreamMessage::End => {
                self.is_loading = false;
                self.log_finished_reply(chat_id);
            }
        }
        if chat_id == self.store.active_chat_id() {
            self.auto_scroll = true;
        }
    }

    fn log_finished_reply(&self, chat_id: u64) {
        if !self.logging.is_active() {
            return;
        }
        let Some(chat) = self.store.chat(chat_id) else {
            return;
        };
        if let Some(last) = chat.messages.last() {
            if last.is_bot() && !last.content.is_empty() {
                if let Err(e) = self.logging.log_message(&last.content) {
                    tracing::warn!(error = %e, "transcript write failed");
                }
            }
        }
    }

    pub fn new_chat(&mut self) {
        self.store.create_chat();
        self.auto_scroll = true;
    }

    pub fn can_delete_chat(&self) -> bool {
        self.store.chats().len() > 1
    }

    pub fn delete_active_chat(&mut self) -> bool {
        let deleted = self.store.delete_chat(self.store.active_chat_id());
        if deleted {
            self.auto_scroll = true;
        }
        deleted
    }

    /// Move the sidebar selection by `delta` positions, clamped to the list.
    /// Allowed while a stream is in flight; in-flight streams stay bound to
    /// their own chat.
    pub fn select_chat_offset(&mut self, delta: i64) {
        let chats = self.store.chats();
        let Some(current) = chats
            .iter()
            .position(|c| c.id == self.store.active_chat_id())
        else {
            return;
        };
        let target = (current as i64 + delta).clamp(0, chats.len() as i64 - 1) as usize;
        let id = chats[target].id;
        self.store.select_chat(id);
        self.auto_scroll = true;
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16, max_offset: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(max_offset);
        if self.scroll_offset >= max_offset {
            self.auto_scroll = true;
        }
    }

    /// Transcript of the active chat as styled lines, shared by rendering
    /// and scroll math.
    pub fn build_transcript_lines(&self) -> Vec<Line<'_>> {
        let mut lines = Vec::new();
        let chat = self.store.active_chat();

        for msg in &chat.messages {
            match msg.kind {
                MessageKind::User => {
                    let mut content_lines = msg.content.lines();
                    let first = content_lines.next().unwrap_or("");
                    lines.push(Line::from(vec![
                        Span::styled(
                            "You: ",
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(first, Style::default().fg(Color::Cyan)),
                    ]));
                    for rest in content_lines {
                        lines.push(Line::from(Span::styled(
                            rest,
                            Style::default().fg(Color::Cyan),
                        )));
                    }
                }
                MessageKind::Bot => {
                    if msg.content.is_empty() {
                        continue;
                    }
                    for content_line in msg.content.lines() {
                        lines.push(Line::from(Span::styled(
                            content_line,
                            Style::default().fg(Color::White),
                        )));
                    }
                }
                MessageKind::Error => {
                    for content_line in msg.content.lines() {
                        lines.push(Line::from(Span::styled(
                            content_line,
                            Style::default().fg(Color::Red),
                        )));
                    }
                }
            }
            lines.push(Line::from(Span::styled(
                msg.timestamp
                    .with_timezone(&chrono::Local)
                    .format("%H:%M")
                    .to_string(),
                Style::default().fg(Color::DarkGray),
            )));
            lines.push(Line::from(""));
        }

        if self.is_loading {
            lines.push(Line::from(Span::styled(
                "Thinking...",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        lines
    }

    /// Display height of the transcript after wrapping at `width` columns.
    pub fn wrapped_line_count(&self, width: u16) -> u16 {
        if width == 0 {
            return 0;
        }
        let width = width as usize;
        let mut count: usize = 0;
        for line in self.build_transcript_lines() {
            let line_width: usize = line.spans.iter().map(|s| s.content.width()).sum();
            count += line_width.div_ceil(width).max(1);
        }
        count.min(u16::MAX as usize) as u16
    }

    pub fn max_scroll_offset(&self, available_height: u16, width: u16) -> u16 {
        self.wrapped_line_count(width).saturating_sub(available_height)
    }

    /// Pin the viewport to the newest entry when auto-scroll is on.
    pub fn update_scroll_position(&mut self, available_height: u16, width: u16) {
        if self.auto_scroll {
            self.scroll_offset = self.max_scroll_offset(available_height, width);
        }
    }
}

#[cfg(test)]
pub(crate) fn create_test_app() -> App {
    App::with_parts(
        "http://127.0.0.1:9".to_string(),
        "test-session".to_string(),
        LoggingState::new(None).unwrap(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::STREAM_ERROR_TEXT;

    fn set_input(app: &mut App, text: &str) {
        app.textarea.insert_str(text);
    }

    #[tokio::test]
    async fn submit_appends_user_message_and_sets_loading() {
        let (stream, _rx) = ChatStreamService::new();
        let mut app = create_test_app();
        set_input(&mut app, "Hello world");

        assert!(app.submit_message(&stream));
        assert!(app.is_loading);
        assert_eq!(app.input_text(), "");
        let chat = app.store.active_chat();
        assert_eq!(chat.title, "Hello world");
        assert!(chat.messages.last().unwrap().is_user());
    }

    #[tokio::test]
    async fn whitespace_only_submit_is_a_no_op() {
        let (stream, _rx) = ChatStreamService::new();
        let mut app = create_test_app();
        set_input(&mut app, "   \n  ");

        assert!(!app.submit_message(&stream));
        assert!(!app.is_loading);
        assert_eq!(app.store.active_chat().messages.len(), 1);
    }

    #[tokio::test]
    async fn submit_while_loading_is_rejected() {
        let (stream, _rx) = ChatStreamService::new();
        let mut app = create_test_app();
        set_input(&mut app, "first");
        assert!(app.submit_message(&stream));

        set_input(&mut app, "second");
        assert!(!app.submit_message(&stream));
        // Only the first message landed.
        assert_eq!(app.store.active_chat().messages.len(), 2);
    }

    #[test]
    fn streaming_scenario_accumulates_wholesale() {
        let mut app = create_test_app();
        let chat_id = app.store.active_chat_id();
        app.store.append_user_message(chat_id, "2+2?");
        app.is_loading = true;

        app.apply_stream_message(StreamMessage::Open, chat_id);
        for expected in ["4", "4 is", "4 is the answer"] {
            app.apply_stream_message(StreamMessage::Content(expected.to_string()), chat_id);
            assert!(app.is_loading);
            assert_eq!(
                app.store.active_chat().messages.last().unwrap().content,
                expected
            );
        }
        app.apply_stream_message(StreamMessage::End, chat_id);
        assert!(!app.is_loading);
    }

    #[test]
    fn failure_adds_one_error_message_and_clears_loading() {
        let mut app = create_test_app();
        let chat_id = app.store.active_chat_id();
        app.store.append_user_message(chat_id, "hi");
        app.is_loading = true;
        let before = app.store.active_chat().messages.len();

        app.apply_stream_message(StreamMessage::Error, chat_id);
        app.apply_stream_message(StreamMessage::End, chat_id);

        let chat = app.store.active_chat();
        assert_eq!(chat.messages.len(), before + 1);
        let last = chat.messages.last().unwrap();
        assert_eq!(last.kind, MessageKind::Error);
        assert_eq!(last.content, STREAM_ERROR_TEXT);
        assert!(!app.is_loading);
    }

    #[tokio::test]
    async fn unreachable_server_takes_error_path_end_to_end() {
        // Port 9 (discard) is closed in practice; the request itself fails.
        let (stream, mut rx) = ChatStreamService::new();
        let mut app = create_test_app();
        set_input(&mut app, "anyone there?");
        assert!(app.submit_message(&stream));
        let bound_chat = app.store.active_chat_id();

        let (msg, chat_id) = rx.recv().await.expect("stream event");
        assert_eq!(chat_id, bound_chat);
        assert!(matches!(msg, StreamMessage::Error));
        let (msg, _) = rx.recv().await.expect("stream end");
        assert!(matches!(msg, StreamMessage::End));

        app.apply_stream_message(StreamMessage::Error, bound_chat);
        app.apply_stream_message(StreamMessage::End, bound_chat);
        assert!(!app.is_loading);
    }

    #[test]
    fn stream_keeps_mutating_bound_chat_after_switch() {
        let mut app = create_test_app();
        let bound = app.store.active_chat_id();
        app.store.append_user_message(bound, "slow question");
        app.apply_stream_message(StreamMessage::Open, bound);

        // User switches to a brand-new chat mid-stream.
        app.new_chat();
        let other = app.store.active_chat_id();
        assert_ne!(other, bound);

        app.apply_stream_message(StreamMessage::Content("partial".into()), bound);
        assert_eq!(
            app.store.chat(bound).unwrap().messages.last().unwrap().content,
            "partial"
        );
        // The active chat only has its seed greeting.
        assert_eq!(app.store.chat(other).unwrap().messages.len(), 1);
    }

    #[test]
    fn events_for_deleted_chat_are_dropped_but_loading_clears() {
        let mut app = create_test_app();
        let bound = app.store.create_chat();
        app.store.append_user_message(bound, "doomed");
        app.apply_stream_message(StreamMessage::Open, bound);
        app.is_loading = true;

        assert!(app.store.delete_chat(bound));
        app.apply_stream_message(StreamMessage::Content("late".into()), bound);
        app.apply_stream_message(StreamMessage::End, bound);

        assert!(app.store.chat(bound).is_none());
        assert!(!app.is_loading);
    }

    #[test]
    fn chat_offset_selection_clamps_at_list_edges() {
        let mut app = create_test_app();
        let welcome = app.store.active_chat_id();
        app.new_chat();
        let newest = app.store.active_chat_id();

        app.select_chat_offset(-1);
        assert_eq!(app.store.active_chat_id(), newest);
        app.select_chat_offset(1);
        assert_eq!(app.store.active_chat_id(), welcome);
        app.select_chat_offset(1);
        assert_eq!(app.store.active_chat_id(), welcome);
    }

    #[test]
    fn delete_control_availability_tracks_chat_count() {
        let mut app = create_test_app();
        assert!(!app.can_delete_chat());
        assert!(!app.delete_active_chat());
        app.new_chat();
        assert!(app.can_delete_chat());
        assert!(app.delete_active_chat());
        assert!(!app.can_delete_chat());
    }

    #[test]
    fn transcript_includes_typing_indicator_while_loading() {
        let mut app = create_test_app();
        let without = app.build_transcript_lines().len();
        app.is_loading = true;
        let with = app.build_transcript_lines().len();
        assert_eq!(with, without + 1);
    }

    #[test]
    fn wrapped_line_count_accounts_for_narrow_widths() {
        let app = create_test_app();
        let wide = app.wrapped_line_count(200);
        let narrow = app.wrapped_line_count(10);
        assert!(narrow > wide);
    }

    #[test]
    fn scrolling_up_disables_auto_scroll_and_bottom_restores_it() {
        let mut app = create_test_app();
        app.scroll_offset = 5;
        app.scroll_up(2);
        assert!(!app.auto_scroll);
        assert_eq!(app.scroll_offset, 3);
        app.scroll_down(10, 6);
        assert_eq!(app.scroll_offset, 6);
        assert!(app.auto_scroll);
    }
}
