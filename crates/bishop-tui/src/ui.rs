use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};
use chrono::Local;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use bishop_client::TILES;
use bishop_session::auth::CODE_LEN;
use bishop_session::{ChatSession, Role};

use crate::app::{App, Focus, Route};
use crate::pages::{KIDS_FOOTER, KIDS_TABS, SERVICE_NOT_FOUND, SERVICE_PAGES};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Body
            Constraint::Length(1), // Status bar
        ])
        .split(f.size());

    draw_header(f, app, chunks[0]);
    match &app.route {
        Route::Chat => draw_chat(f, app, chunks[1]),
        Route::Login => draw_login(f, app, chunks[1]),
        Route::Verify => draw_verify(f, app, chunks[1]),
        Route::KidsCorner => draw_kids_corner(f, app, chunks[1]),
        Route::ServicePage(_) => draw_service_page(f, app, chunks[1]),
    }
    draw_status_bar(f, app, chunks[2]);

    if app.route == Route::Chat && app.login_modal_visible() {
        draw_login_modal(f);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" ✝ ", Style::default().fg(Color::Yellow)),
        Span::styled(
            "Joshua",
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Cyan),
        ),
        Span::styled(" Bishop", Style::default().fg(Color::Gray)),
        Span::styled("  |  ", Style::default().fg(Color::Gray)),
    ];
    for page in SERVICE_PAGES.iter() {
        spans.push(Span::styled(
            format!("{} {}  ", page.icon, page.name),
            Style::default().fg(Color::Gray),
        ));
    }
    if app.is_pending() {
        spans.push(Span::styled(
            "◐ Waiting for reply...",
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}

fn focus_border(app: &App, focus: Focus) -> Style {
    if app.focus == focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Blue)
    }
}

fn draw_chat(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(30)])
        .split(area);

    draw_sidebar(f, app, columns[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(columns[1]);

    if app.tiles_visible() {
        draw_tiles(f, app, rows[0]);
    } else {
        draw_messages(f, app, rows[0]);
    }
    draw_input(f, app, rows[1]);
}

/// Columns left for a title next to the time in the sidebar.
const SIDEBAR_TITLE_WIDTH: usize = 17;

fn draw_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Chats")
        .border_style(focus_border(app, Focus::Sidebar));

    if app.sessions().is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No chats yet",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let active = app.conversation().book().active_id();
    let items: Vec<ListItem> = app
        .sessions()
        .iter()
        .map(|session| {
            let style = if Some(session.id()) == active {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(sidebar_line(session, style))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if app.focus == Focus::Sidebar {
        state.select(Some(app.sidebar_index));
    }
    f.render_stateful_widget(list, area, &mut state);
}

/// Title padded to a fixed column, then the local creation time.
fn sidebar_line(session: &ChatSession, style: Style) -> Line<'static> {
    let title = fit_width(session.title(), SIDEBAR_TITLE_WIDTH);
    let padding = " ".repeat(SIDEBAR_TITLE_WIDTH.saturating_sub(title.width()) + 1);
    let time = session
        .created_at()
        .with_timezone(&Local)
        .format("%H:%M")
        .to_string();
    Line::from(vec![
        Span::styled(title, style),
        Span::raw(padding),
        Span::styled(time, Style::default().fg(Color::DarkGray)),
    ])
}

/// Cut `text` to at most `max` display columns, marking the cut with `…`.
fn fit_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn draw_tiles(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            "How can I help you today?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (idx, tile) in TILES.iter().enumerate() {
        let selected = app.focus == Focus::Tiles && idx == app.tile_index;
        let style = if selected {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Cyan)
        };
        lines.push(Line::from(Span::styled(
            format!(" {}  {} ", tile.icon, tile.label),
            style,
        )));
        lines.push(Line::from(""));
    }

    let tiles = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Services")
                .border_style(focus_border(app, Focus::Tiles)),
        );
    f.render_widget(tiles, area);
}

fn draw_messages(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    for msg in app.active_messages() {
        let (prefix, style) = match msg.role {
            Role::User => ("👤 ", Style::default().fg(Color::Cyan)),
            Role::Assistant => ("✝ ", Style::default().fg(Color::Green)),
        };
        for (idx, text) in message_rows(&msg.content).enumerate() {
            let lead = if idx == 0 { prefix } else { "   " };
            lines.push(Line::from(vec![
                Span::styled(lead, style),
                Span::styled(text.to_string(), style),
            ]));
        }
        lines.push(Line::from(""));
    }
    if app.is_pending() {
        lines.push(Line::from(Span::styled(
            "✝ ...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let title = app
        .conversation()
        .book()
        .active()
        .map(|session| session.title().to_string())
        .unwrap_or_else(|| "Messages".to_string());

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let total = transcript_height(&lines, inner_width);
    let bottom = total.saturating_sub(inner_height);
    let offset = bottom.saturating_sub(app.scroll_back);

    let messages = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));

    f.render_widget(messages, area);
}

/// Source lines of a message; empty content still gets one row.
fn message_rows(content: &str) -> impl Iterator<Item = &str> {
    let empty = content.is_empty().then_some("");
    content.lines().chain(empty)
}

/// Rows the whole transcript takes, capped at `u16::MAX`.
fn transcript_height(lines: &[Line], width: u16) -> u16 {
    lines
        .iter()
        .map(|line| wrapped_height(line, width))
        .fold(0u16, u16::saturating_add)
}

/// Rows a line takes once wrapped to `width` columns.
fn wrapped_height(line: &Line, width: u16) -> u16 {
    if width == 0 {
        return 1;
    }
    let columns: usize = line.spans.iter().map(|span| span.content.width()).sum();
    let rows = columns.div_ceil(width as usize).max(1);
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let input_text = if app.is_pending() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::styled(
                "Waiting for a reply...",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    } else if app.input.is_empty() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Green)),
            Span::styled(
                app.placeholder(),
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Green)),
            Span::styled(app.input.as_str(), Style::default().fg(Color::White)),
            Span::styled("▌", Style::default().fg(Color::Green)),
        ])
    };

    let input = Paragraph::new(input_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Message")
                .border_style(focus_border(app, Focus::Input)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(input, area);
}

fn draw_form(
    f: &mut Frame,
    area: Rect,
    heading: &str,
    blurb: &str,
    field: Line,
    footer: Vec<Line>,
    error: Option<&str>,
) {
    let area = centered_rect(60, 60, area);
    let mut lines = vec![
        Line::from(Span::styled(
            heading.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(blurb.to_string(), Style::default().fg(Color::Gray))),
        Line::from(""),
        field,
    ];
    if let Some(error) = error {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(""));
    lines.extend(footer);

    let form = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );
    f.render_widget(form, area);
}

fn draw_login(f: &mut Frame, app: &App, area: Rect) {
    let field = if app.phone_input.is_empty() {
        Line::from(Span::styled(
            "Enter your phone number",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        ))
    } else {
        Line::from(vec![
            Span::raw(app.phone_input.as_str()),
            Span::styled("▌", Style::default().fg(Color::Green)),
        ])
    };

    draw_form(
        f,
        area,
        "Sign Up to Continue",
        "You've used all trial messages. Sign up to continue using the chat.",
        field,
        vec![Line::from(Span::styled(
            "[Enter] Continue  [Esc] Back",
            Style::default().fg(Color::DarkGray),
        ))],
        app.field_error.as_deref(),
    );
}

fn draw_verify(f: &mut Frame, app: &App, area: Rect) {
    let mut cells = Vec::with_capacity(CODE_LEN);
    for idx in 0..CODE_LEN {
        let digit = app.code_input.chars().nth(idx).unwrap_or('_');
        cells.push(Span::styled(
            format!(" {} ", digit),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }

    let resend = match &app.countdown {
        Some(countdown) if !countdown.can_resend() => {
            format!("Resend code in {}s", countdown.remaining_secs())
        }
        _ => "[Ctrl+R] Resend verification code".to_string(),
    };

    draw_form(
        f,
        area,
        "Verify Your Phone",
        "Enter the 6-digit code sent to your phone",
        Line::from(cells),
        vec![
            Line::from(Span::styled(resend, Style::default().fg(Color::Cyan))),
            Line::from(Span::styled(
                "[Enter] Verify  [Esc] Back",
                Style::default().fg(Color::DarkGray),
            )),
        ],
        app.field_error.as_deref(),
    );
}

fn draw_kids_corner(f: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    let titles: Vec<Line> = KIDS_TABS.iter().map(|tab| Line::from(tab.label)).collect();
    let tabs = Tabs::new(titles)
        .select(app.kids_tab)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("🧒 Christian Kids' Corner")
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, rows[0]);

    let tab = &KIDS_TABS[app.kids_tab % KIDS_TABS.len()];
    let body = Paragraph::new(Text::from(vec![
        Line::from(Span::styled(
            tab.heading,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(tab.body),
    ]))
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(body, rows[1]);

    let footer = Paragraph::new(KIDS_FOOTER)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(footer, rows[2]);
}

fn draw_service_page(f: &mut Frame, app: &App, area: Rect) {
    let area = centered_rect(70, 70, area);
    let lines = match app.current_service_page() {
        Some(page) => vec![
            Line::from(page.icon),
            Line::from(Span::styled(
                page.title,
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(page.description, Style::default().fg(Color::Gray))),
            Line::from(""),
            Line::from(Span::styled(
                "Start Chatting",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(page.start_chat_hint()),
        ],
        None => vec![
            Line::from(Span::styled(
                SERVICE_NOT_FOUND,
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Esc to return home",
                Style::default().fg(Color::Blue),
            )),
        ],
    };

    let page = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );
    f.render_widget(page, area);
}

fn draw_login_modal(f: &mut Frame) {
    let area = centered_rect(50, 30, f.size());
    f.render_widget(Clear, area);

    let modal = Paragraph::new(Text::from(vec![
        Line::from(Span::styled(
            "Trial Limit Reached",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("You've used all your trial messages. Please sign up to continue using the chat."),
        Line::from(""),
        Line::from(Span::styled(
            "[Enter] Sign Up Now  [Esc] Close",
            Style::default().fg(Color::Cyan),
        )),
    ]))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );
    f.render_widget(modal, area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.route {
        Route::Chat => "[Enter] Send  [Tab] Focus  [Ctrl+N] New Chat  [Ctrl+K] Kids  [F2-F6] Services  [Ctrl+L] Sign In  [Ctrl+O] Sign Out  [Ctrl+C] Quit",
        Route::Login | Route::Verify => "[Enter] Submit  [Esc] Back  [Ctrl+C] Quit",
        Route::KidsCorner => "[←/→] Tabs  [Esc] Back  [Ctrl+C] Quit",
        Route::ServicePage(_) => "[Enter] Start Chat  [Esc] Back  [Ctrl+C] Quit",
    };

    let trial = match app.remaining {
        Some(left) => format!("Trial: {} left", left),
        None => "Signed in".to_string(),
    };

    let status = match &app.notice {
        Some(notice) => format!(" {} | {} | {}", notice, trial, help_text),
        None => format!(" {} | {}", trial, help_text),
    };

    let status_bar = Paragraph::new(status)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::REVERSED));

    f.render_widget(status_bar, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
