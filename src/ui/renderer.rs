//! Derived rendering of the sidebar, transcript and composer
//!
//! Everything drawn here is a pure function of [`App`] state; the renderer
//! owns no state of its own.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::app::App;

pub(crate) const SIDEBAR_WIDTH: u16 = 30;
pub(crate) const COLLAPSED_SIDEBAR_WIDTH: u16 = 3;
const COMPOSER_HEIGHT: u16 = 3;

/// Vertical chrome around the transcript: header, composer with borders,
/// hint line. Kept next to the layout constraints it mirrors.
pub(crate) const TRANSCRIPT_CHROME_HEIGHT: u16 = 2 + (COMPOSER_HEIGHT + 2) + 1;

pub fn ui(f: &mut Frame, app: &App) {
    let sidebar_width = if app.sidebar_collapsed {
        COLLAPSED_SIDEBAR_WIDTH
    } else {
        SIDEBAR_WIDTH
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(sidebar_width), Constraint::Min(0)])
        .split(f.area());

    render_sidebar(f, app, columns[0]);
    render_main(f, app, columns[1]);
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    if app.sidebar_collapsed {
        let block = Block::default().borders(Borders::ALL).title("»");
        f.render_widget(block, area);
        return;
    }

    let mut lines = Vec::new();
    for chat in app.store.chats() {
        let active = chat.id == app.store.active_chat_id();
        let marker = if active { "▸ " } else { "  " };
        let title_style = if active {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let max_title = (area.width as usize).saturating_sub(5);
        lines.push(Line::from(vec![
            Span::styled(marker, title_style),
            Span::styled(truncate_to_width(&chat.title, max_title), title_style),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "  {} messages · {}",
                chat.messages.len(),
                chat.created_at
                    .with_timezone(&chrono::Local)
                    .format("%m/%d")
            ),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let sidebar = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Chats (Ctrl+N new) "),
    );
    f.render_widget(sidebar, area);
}

fn render_main(f: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(COMPOSER_HEIGHT + 2),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, rows[0]);
    render_transcript(f, app, rows[1]);
    render_composer(f, app, rows[2]);
    render_hint(f, app, rows[3]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let chat = app.store.active_chat();
    let mut meta = format!("{} messages", chat.messages.len());
    let logging_status = app.logging.status_string();
    if !logging_status.is_empty() {
        meta.push_str(" · ");
        meta.push_str(&logging_status);
    }
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            chat.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(meta, Style::default().fg(Color::DarkGray))),
    ])
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn render_transcript(f: &mut Frame, app: &App, area: Rect) {
    let lines = app.build_transcript_lines();

    // Clamp against the wrapped height even if the caller's scroll
    // bookkeeping lags a resize.
    let max_offset = app.max_scroll_offset(area.height, area.width);
    let scroll_offset = app.scroll_offset.min(max_offset);

    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset, 0));
    f.render_widget(transcript, area);
}

fn render_composer(f: &mut Frame, app: &App, area: Rect) {
    let (title, border_style) = if app.is_loading {
        (
            " Waiting for reply... ",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (
            " Type your message (Enter to send, Shift+Enter for a new line) ",
            Style::default().fg(Color::Cyan),
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(&app.textarea, inner);
}

fn render_hint(f: &mut Frame, app: &App, area: Rect) {
    let mut hint = String::from("Ctrl+N new · Alt+↑/↓ switch");
    if app.can_delete_chat() {
        hint.push_str(" · Ctrl+X delete");
    }
    hint.push_str(" · Ctrl+B sidebar · Ctrl+C quit · AI assistant can make mistakes. Check important info.");
    let hint = Paragraph::new(Line::from(Span::styled(
        hint,
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(hint, area);
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.to_string().width();
        if used + w + 1 > max_width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}
