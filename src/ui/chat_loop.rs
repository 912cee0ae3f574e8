//! Main chat event loop
//!
//! Owns the terminal, polls input events, and drains the stream channel.
//! All chat mutation funnels through [`App::submit_message`] and
//! [`App::apply_stream_message`]; between those calls the state is always
//! consistent, so the UI and stream handling never interleave mid-update.

use std::{error::Error, io, time::Duration};

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, prelude::Size, Terminal};
use tui_textarea::Input as TAInput;

use crate::core::app::App;
use crate::core::chat_stream::ChatStreamService;
use crate::ui::renderer::{
    ui, COLLAPSED_SIDEBAR_WIDTH, SIDEBAR_WIDTH, TRANSCRIPT_CHROME_HEIGHT,
};

fn transcript_viewport(app: &App, size: Size) -> (u16, u16) {
    let sidebar = if app.sidebar_collapsed {
        COLLAPSED_SIDEBAR_WIDTH
    } else {
        SIDEBAR_WIDTH
    };
    (
        size.height.saturating_sub(TRANSCRIPT_CHROME_HEIGHT),
        size.width.saturating_sub(sidebar),
    )
}

/// Applies one pressed key to the app. Returns `true` when the key asks to
/// leave the chat loop.
pub(crate) fn handle_key(
    app: &mut App,
    key: KeyEvent,
    stream: &ChatStreamService,
    view_height: u16,
    view_width: u16,
) -> bool {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return true;
        }
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.new_chat();
        }
        KeyCode::Char('x') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            // Rejected for a singleton collection; the hint line already
            // hides the binding in that case.
            app.delete_active_chat();
        }
        KeyCode::Char('b') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.toggle_sidebar();
        }
        KeyCode::Up if key.modifiers.contains(KeyModifiers::ALT) => {
            app.select_chat_offset(-1);
        }
        KeyCode::Down if key.modifiers.contains(KeyModifiers::ALT) => {
            app.select_chat_offset(1);
        }
        KeyCode::Enter => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                // Shift+Enter inserts a literal newline instead of
                // submitting.
                if !app.is_loading {
                    app.textarea.insert_newline();
                }
            } else {
                app.submit_message(stream);
            }
        }
        KeyCode::Up => {
            app.scroll_up(1);
        }
        KeyCode::Down => {
            let max = app.max_scroll_offset(view_height, view_width);
            app.scroll_down(1, max);
        }
        KeyCode::PageUp => {
            app.scroll_up(view_height.max(1));
        }
        KeyCode::PageDown => {
            let max = app.max_scroll_offset(view_height, view_width);
            app.scroll_down(view_height.max(1), max);
        }
        _ => {
            // Composer is disabled while a request is in flight.
            if !app.is_loading {
                app.textarea.input(TAInput::from(key));
            }
        }
    }
    false
}

pub async fn run_chat(server_url: String, log_file: Option<String>) -> Result<(), Box<dyn Error>> {
    let mut app = App::new(server_url, log_file)?;
    let (stream, mut rx) = ChatStreamService::new();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = loop {
        let term_size = terminal.size().unwrap_or_default();
        let (view_height, view_width) = transcript_viewport(&app, term_size);
        app.update_scroll_position(view_height, view_width);
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key(&mut app, key, &stream, view_height, view_width) {
                        break Ok(());
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        app.scroll_up(3);
                    }
                    MouseEventKind::ScrollDown => {
                        let max = app.max_scroll_offset(view_height, view_width);
                        app.scroll_down(3, max);
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        // Drain stream events; each one is a single atomic store update.
        let mut received_any = false;
        while let Ok((message, chat_id)) = rx.try_recv() {
            app.apply_stream_message(message, chat_id);
            received_any = true;
        }
        if received_any {
            continue; // Redraw immediately after applying updates.
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::create_test_app;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[tokio::test]
    async fn enter_submits_composer_text() {
        let (stream, _rx) = ChatStreamService::new();
        let mut app = create_test_app();
        app.textarea.insert_str("what is 2+2?");

        let quit = handle_key(
            &mut app,
            press(KeyCode::Enter, KeyModifiers::NONE),
            &stream,
            20,
            80,
        );

        assert!(!quit);
        assert!(app.is_loading);
        assert_eq!(app.input_text(), "");
        let chat = app.store.active_chat();
        assert_eq!(chat.messages.last().map(|m| m.content.as_str()), Some("what is 2+2?"));
    }

    #[test]
    fn shift_enter_inserts_newline_without_sending() {
        let (stream, _rx) = ChatStreamService::new();
        let mut app = create_test_app();
        app.textarea.insert_str("first");
        let before = app.store.active_chat().messages.len();

        handle_key(
            &mut app,
            press(KeyCode::Enter, KeyModifiers::SHIFT),
            &stream,
            20,
            80,
        );

        assert!(!app.is_loading);
        assert_eq!(app.input_text(), "first\n");
        assert_eq!(app.store.active_chat().messages.len(), before);
    }

    #[test]
    fn editing_keys_are_ignored_while_loading() {
        let (stream, _rx) = ChatStreamService::new();
        let mut app = create_test_app();

        handle_key(
            &mut app,
            press(KeyCode::Char('x'), KeyModifiers::NONE),
            &stream,
            20,
            80,
        );
        assert_eq!(app.input_text(), "x");

        app.is_loading = true;
        handle_key(
            &mut app,
            press(KeyCode::Char('y'), KeyModifiers::NONE),
            &stream,
            20,
            80,
        );
        handle_key(
            &mut app,
            press(KeyCode::Enter, KeyModifiers::SHIFT),
            &stream,
            20,
            80,
        );
        assert_eq!(app.input_text(), "x");
    }

    #[test]
    fn ctrl_c_requests_quit() {
        let (stream, _rx) = ChatStreamService::new();
        let mut app = create_test_app();
        assert!(handle_key(
            &mut app,
            press(KeyCode::Char('c'), KeyModifiers::CONTROL),
            &stream,
            20,
            80,
        ));
    }
}
