use client::Role;
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
};
use ratatui::Frame;

use crate::app::App;

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Transcript
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_transcript(f, app, chunks[0]);
    draw_input(f, app, chunks[1]);
    draw_status(f, app, chunks[2]);

    if app.upload.is_some() {
        draw_upload(f, app);
    }
}

fn draw_transcript(f: &mut Frame, app: &mut App, area: Rect) {
    let session_arc = app.engine.session();
    let sources_arc = app.engine.sources();

    let mut all_lines: Vec<Line> = Vec::new();
    if let (Ok(session), Ok(sources)) = (session_arc.try_lock(), sources_arc.try_lock()) {
        let messages = session.messages();
        if messages.is_empty() {
            all_lines = welcome_lines();
        } else {
            let len = messages.len();
            for (i, msg) in messages.iter().enumerate() {
                let (name, style) = match msg.role {
                    Role::User => ("You", Style::default().fg(Color::Cyan)),
                    Role::Assistant => ("Assistant", Style::default().fg(Color::Green)),
                };
                all_lines.push(Line::from(Span::styled(
                    format!("[{}]", name),
                    style.add_modifier(Modifier::BOLD),
                )));

                for line in msg.content.lines() {
                    all_lines.push(Line::from(line.to_string()));
                }

                // Citations resolve against the message's current distance
                // from the end, recomputed every frame.
                if msg.role == Role::Assistant {
                    if let Some(docs) = sources.for_message(len, i) {
                        all_lines.push(Line::from(Span::styled(
                            "Sources:",
                            Style::default().fg(Color::Yellow),
                        )));
                        for (n, doc) in docs.iter().enumerate() {
                            all_lines.push(Line::from(Span::styled(
                                format!("  [{}] {}", n + 1, snippet_line(&doc.text)),
                                Style::default().fg(Color::DarkGray),
                            )));
                            if let Some(locator) = &doc.locator {
                                all_lines.push(Line::from(Span::styled(
                                    format!("      {}", locator),
                                    Style::default()
                                        .fg(Color::DarkGray)
                                        .add_modifier(Modifier::ITALIC),
                                )));
                            }
                        }
                    }
                }

                all_lines.push(Line::from(""));
            }
        }
    }

    let total_lines = all_lines.len();
    let visible_height = area.height.saturating_sub(2) as usize;
    let max_scroll = total_lines.saturating_sub(visible_height);
    app.last_max_scroll = max_scroll;
    let top = app.scroll.top_line(max_scroll);

    let transcript = Paragraph::new(all_lines)
        .block(Block::default().borders(Borders::ALL).title("Chat"))
        .scroll((top as u16, 0));
    f.render_widget(transcript, area);

    if total_lines > visible_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));
        let mut scrollbar_state = ScrollbarState::new(max_scroll).position(top);
        let scrollbar_area = area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        });
        f.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }

    // While detached the jump control stays visible over the bottom border.
    if !app.scroll.is_following() {
        let label = " ↓ End: jump to latest ";
        let width = (label.len() as u16).min(area.width);
        let hint_area = Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + area.height.saturating_sub(1),
            width,
            height: 1,
        };
        let hint = Paragraph::new(label)
            .style(Style::default().bg(Color::Blue).fg(Color::White));
        f.render_widget(hint, hint_area);
    }
}

fn draw_input(f: &mut Frame, app: &mut App, area: Rect) {
    let title = if app.engine.is_busy() {
        "Message (waiting for reply)"
    } else {
        "Message (/ for commands)"
    };

    let (text, text_style) = if app.input.value().is_empty() {
        (
            "Ask a question about your document...",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (app.input.value(), Style::default().fg(Color::White))
    };
    let input_widget = Paragraph::new(text)
        .style(text_style)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input_widget, area);

    if app.upload.is_none() {
        f.set_cursor_position((
            area.x + app.input.visual_cursor() as u16 + 1,
            area.y + 1,
        ));
    }
}

fn draw_status(f: &mut Frame, app: &mut App, area: Rect) {
    let message_count = app
        .engine
        .session()
        .try_lock()
        .map(|s| s.len())
        .unwrap_or(0);

    let (status_text, style) = if let Some(toast) = &app.toast {
        let style = if toast.title == "Error" {
            Style::default().bg(Color::Red).fg(Color::White)
        } else {
            Style::default().bg(Color::DarkGray).fg(Color::White)
        };
        (
            format!(" {}: {} ", toast.title, toast.detail.replace('\n', "  ")),
            style,
        )
    } else if app.engine.is_busy() {
        (
            format!(" {} Thinking... | {} ", app.spinner(), app.chat_endpoint),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        )
    } else {
        let upload_hint = if app.engine.ingest_available() {
            " | Ctrl+U upload"
        } else {
            ""
        };
        (
            format!(
                " {} | {} messages{} | /help ",
                app.chat_endpoint, message_count, upload_hint
            ),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        )
    };

    f.render_widget(Paragraph::new(status_text).style(style), area);
}

fn draw_upload(f: &mut Frame, app: &App) {
    let Some(form) = app.upload.as_ref() else {
        return;
    };

    let frame_area = f.area();
    let width = (frame_area.width * 4 / 5).max(20).min(frame_area.width);
    let height = (frame_area.height * 3 / 5).max(6).min(frame_area.height);
    let popup = Rect {
        x: (frame_area.width - width) / 2,
        y: (frame_area.height - height) / 2,
        width,
        height,
    };

    let visible = height.saturating_sub(2) as usize;
    let lines: Vec<Line> = form
        .buffer
        .lines()
        .rev()
        .take(visible)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|l| Line::from(l.to_string()))
        .collect();

    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Upload document (Ctrl+S to ingest, Esc to cancel)"),
    );
    f.render_widget(Clear, popup);
    f.render_widget(body, popup);
}

fn snippet_line(text: &str) -> String {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or("").to_string();
    if lines.next().is_some() {
        format!("{}...", first)
    } else {
        first
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Document Q&A",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "  Retrieval-augmented chat over your own documents.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from("  - Upload a document (Ctrl+U or /upload) and ask questions about it."),
        Line::from("  - Answers stream in live, with supporting passages cited underneath."),
        Line::from("  - Try: What is a document loader?"),
        Line::from(""),
        Line::from(Span::styled(
            "  /help lists the available commands.",
            Style::default().fg(Color::DarkGray),
        )),
    ]
}
