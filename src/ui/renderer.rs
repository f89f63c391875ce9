use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::core::message::{Conversation, Message, Role};
use crate::core::registry::ModelRegistry;
use crate::core::settings::Temperature;
use crate::core::state::AppState;
use crate::ui::view::{LiveTurn, StatusKind, Tab, ViewState};

pub const STREAMING_INDICATOR: &str = "▌";
const SIDEBAR_WIDTH: u16 = 32;
const PREVIEW_CHARS: usize = 24;

/// Everything one frame needs, borrowed from the chat loop.
pub struct RenderModel<'a> {
    pub state: &'a AppState,
    pub view: &'a ViewState,
    pub registry: &'a ModelRegistry,
    pub host: &'a str,
    pub transcript_status: String,
    pub streaming: bool,
}

pub fn ui(f: &mut Frame, model: &RenderModel<'_>) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(f.area());

    render_sidebar(f, columns[0], model);
    match model.view.tab {
        Tab::Chat => render_chat(f, columns[1], model),
        Tab::Settings => render_settings(f, columns[1], model),
        Tab::History => render_history(f, columns[1], model),
    }
}

fn render_sidebar(f: &mut Frame, area: Rect, model: &RenderModel<'_>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Min(3),
        ])
        .split(area);

    let tabs: Vec<ListItem> = Tab::ALL
        .iter()
        .map(|tab| {
            let selected = *tab == model.view.tab;
            let marker = if selected { "▶ " } else { "  " };
            let style = if selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(
                format!("{marker}{}", tab.title()),
                style,
            )))
        })
        .collect();
    f.render_widget(
        List::new(tabs).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Ollama Chat (Tab)"),
        ),
        rows[0],
    );

    let (status_text, status_color) = if model.registry.is_connected() {
        ("● Connected", Color::Green)
    } else {
        ("● Disconnected", Color::Red)
    };
    let status_lines = vec![
        Line::from(Span::styled(status_text, Style::default().fg(status_color))),
        Line::from(format!(
            "Model: {}",
            model.state.selected_model().unwrap_or("(none)")
        )),
        Line::from(format!("Temperature: {}", model.state.temperature())),
        Line::from(format!("Log: {}", model.transcript_status)),
    ];
    f.render_widget(
        Paragraph::new(status_lines).block(Block::default().borders(Borders::ALL).title("Status")),
        rows[1],
    );

    let active = model.state.store.active_index();
    let conversations: Vec<ListItem> = model
        .state
        .store
        .conversations()
        .iter()
        .enumerate()
        .map(|(index, conversation)| {
            let style = if Some(index) == active {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            ListItem::new(conversation_entry(index, conversation, style))
        })
        .collect();
    let conversations = if conversations.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No conversations yet",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        conversations
    };
    f.render_widget(
        List::new(conversations).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Conversations (Ctrl+N)"),
        ),
        rows[2],
    );
}

/// Sidebar entry: title and message count, then the opening prompt.
fn conversation_entry(
    index: usize,
    conversation: &Conversation,
    style: Style,
) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("{} ({})", Conversation::title(index), conversation.len()),
        style,
    ))];
    if let Some(preview) = conversation.preview(PREVIEW_CHARS) {
        lines.push(Line::from(Span::styled(
            format!("  {preview}"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn render_chat(f: &mut Frame, area: Rect, model: &RenderModel<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    let title = match model.state.store.active_index() {
        Some(index) => format!(
            "{} • {}",
            Conversation::title(index),
            model.state.selected_model().unwrap_or("no model")
        ),
        None => "New chat".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(chunks[0]);

    let mut lines = build_transcript_lines(
        model.state.store.active_transcript(),
        model.view.live.as_ref(),
    );
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Start chatting by typing below. Ctrl+N opens a new conversation.",
            Style::default().fg(Color::DarkGray),
        )));
    }
    let total = wrapped_height(&lines, inner.width);
    let offset = total.saturating_sub(inner.height);

    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0)),
        chunks[0],
    );

    let input_title = if model.streaming {
        "Generating... (Esc to stop, Ctrl+C to quit)"
    } else {
        "Type your message (Enter to send, Ctrl+C to quit)"
    };
    let input_style = if model.streaming {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let inner_width = chunks[1].width.saturating_sub(2) as usize;
    let visible = visible_input_tail(&model.view.input, inner_width.saturating_sub(1));
    f.render_widget(
        Paragraph::new(visible).style(input_style).block(
            Block::default()
                .borders(Borders::ALL)
                .title(input_title),
        ),
        chunks[1],
    );
    if !model.streaming {
        let cursor_x = UnicodeWidthStr::width(visible) as u16 + 1;
        f.set_cursor_position((chunks[1].x + cursor_x, chunks[1].y + 1));
    }

    if let Some(status) = &model.view.status {
        let color = match status.kind {
            StatusKind::Info => Color::Gray,
            StatusKind::Error => Color::Red,
        };
        f.render_widget(
            Paragraph::new(Span::styled(status.text.as_str(), Style::default().fg(color))),
            chunks[2],
        );
    }
}

fn render_settings(f: &mut Frame, area: Rect, model: &RenderModel<'_>) {
    let heading = Style::default().add_modifier(Modifier::BOLD);
    let selected = model.state.selected_model();
    let mut lines = vec![
        Line::from(Span::styled("Model Configuration", heading)),
        Line::from(format!("Current model: {}", selected.unwrap_or("(none)"))),
        Line::from(format!(
            "Temperature: {} (F3/F4 to adjust, range {:.1}-{:.1})",
            model.state.temperature(),
            Temperature::MIN,
            Temperature::MAX
        )),
        Line::from("Available models (F2 to cycle):"),
    ];

    let available: Vec<String> = model
        .registry
        .cached()
        .map(|models| models.to_vec())
        .unwrap_or_default();
    if available.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No models available",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for name in available.iter() {
        let is_selected = Some(name.as_str()) == selected;
        let marker = if is_selected { "▶ " } else { "  " };
        let style = if is_selected {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(format!("  {marker}{name}"), style)));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled("System Status", heading)));
    lines.push(Line::from(format!("Server: {}", model.host)));
    let connection = if model.registry.is_connected() {
        Span::styled("Connected", Style::default().fg(Color::Green))
    } else {
        Span::styled(
            match model.registry.last_error() {
                Some(err) => format!("Disconnected ({err})"),
                None => "Disconnected (no models installed)".to_string(),
            },
            Style::default().fg(Color::Red),
        )
    };
    lines.push(Line::from(vec![Span::raw("Connection: "), connection]));
    lines.push(Line::from(format!(
        "Conversations: {}",
        model.state.store.len()
    )));
    lines.push(Line::from(format!(
        "Transcript log: {}",
        model.transcript_status
    )));

    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Settings"))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn render_history(f: &mut Frame, area: Rect, model: &RenderModel<'_>) {
    let store = &model.state.store;
    let mut lines = Vec::new();
    if store.is_empty() {
        lines.push(Line::from(Span::styled(
            "No conversation history yet. Start chatting to create some!",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (index, conversation) in store.conversations().iter().enumerate() {
        let marker = if store.active_index() == Some(index) {
            " (active)"
        } else {
            ""
        };
        lines.push(Line::from(Span::styled(
            format!("{}{marker}", Conversation::title(index)),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        if conversation.is_empty() {
            lines.push(Line::from(Span::styled(
                "  (empty)",
                Style::default().fg(Color::DarkGray),
            )));
        }
        for message in conversation.messages() {
            let label = match message.role {
                Role::User => "You",
                Role::Assistant => "Assistant",
            };
            lines.push(Line::from(format!("  {label}: {}", message.content)));
        }
        lines.push(Line::default());
    }

    f.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("History (PageUp/PageDown to switch)"),
            )
            .wrap(Wrap { trim: false }),
        area,
    );
}

/// Lines for the chat pane: the committed transcript, then the prompt and
/// partial reply of a turn that is still streaming.
pub fn build_transcript_lines(messages: &[Message], live: Option<&LiveTurn>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        push_message_lines(&mut lines, message.role, &message.content, false);
    }
    if let Some(live) = live {
        push_message_lines(&mut lines, Role::User, &live.prompt, false);
        push_message_lines(&mut lines, Role::Assistant, &live.display, true);
    }
    lines
}

fn push_message_lines(lines: &mut Vec<Line<'static>>, role: Role, content: &str, streaming: bool) {
    let content_lines: Vec<&str> = if content.is_empty() {
        vec![""]
    } else {
        content.lines().collect()
    };
    let last = content_lines.len().saturating_sub(1);
    for (i, text) in content_lines.into_iter().enumerate() {
        let mut spans = Vec::new();
        if role == Role::User && i == 0 {
            spans.push(Span::styled(
                "You: ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        let style = match role {
            Role::User => Style::default().fg(Color::Cyan),
            Role::Assistant => Style::default(),
        };
        spans.push(Span::styled(text.to_string(), style));
        if streaming && i == last {
            spans.push(Span::styled(
                STREAMING_INDICATOR,
                Style::default().add_modifier(Modifier::SLOW_BLINK),
            ));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::default());
}

/// Rows `lines` occupy when wrapped to `width` columns.
pub fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let width = width as usize;
    let rows: usize = lines
        .iter()
        .map(|line| {
            let line_width: usize = line
                .spans
                .iter()
                .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
                .sum();
            line_width.max(1).div_ceil(width)
        })
        .sum();
    rows.min(u16::MAX as usize) as u16
}

/// The longest suffix of `input` that fits in `width` columns.
fn visible_input_tail(input: &str, width: usize) -> &str {
    let mut used = 0;
    let mut start = input.len();
    for (index, ch) in input.char_indices().rev() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        start = index;
    }
    &input[start..]
}
