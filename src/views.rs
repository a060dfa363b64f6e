//! Render functions. Each one draws from the data it is handed and never talks
//! to the service.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::controller::Partitions;
use crate::form::{Field, TaskForm, TextField};
use crate::models::{Task, TaskColor, TaskFilters, TaskStatus};

pub const APP_TITLE: &str = "Core Notes";
const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl LoadingSize {
    /// Full-pane spinners scale with the space they get.
    pub fn for_area(area: Rect) -> Self {
        match area.height {
            0..=4 => LoadingSize::Small,
            5..=14 => LoadingSize::Medium,
            _ => LoadingSize::Large,
        }
    }

    pub fn glyph(self, tick: usize) -> &'static str {
        let frames = self.frames();
        frames[tick % frames.len()]
    }

    fn frames(self) -> &'static [&'static str] {
        match self {
            LoadingSize::Small => &["·", "•", "●", "•"],
            LoadingSize::Medium => &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
            LoadingSize::Large => &["[=   ]", "[==  ]", "[=== ]", "[ ===]", "[  ==]", "[   =]"],
        }
    }
}

// Helper function to create centered rectangles for popups
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn field_spans(field: &TextField, focused: bool) -> Vec<Span<'static>> {
    if !focused {
        return vec![Span::raw(field.value.clone())];
    }
    let (before, after) = field.split_at_cursor();
    let mut chars = after.chars();
    let at_cursor = chars.next().map_or(" ".to_string(), |c| c.to_string());
    vec![
        Span::raw(before.to_string()),
        Span::styled(at_cursor, Style::default().bg(Color::Cyan).fg(Color::Black)),
        Span::raw(chars.as_str().to_string()),
    ]
}

fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.chars().count() > PREVIEW_CHARS || text.lines().nth(1).is_some() {
        let cut: String = first_line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        first_line.to_string()
    }
}

pub fn render_header(f: &mut Frame, area: Rect, search: &TextField, search_focused: bool, filters: &TaskFilters) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(40)].as_ref())
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled(APP_TITLE, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", filters.summary()), Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let mut spans = vec![Span::styled("/ ", Style::default().fg(Color::DarkGray))];
    if search.value.is_empty() && !search_focused {
        spans.push(Span::styled("Search notes...", Style::default().fg(Color::DarkGray)));
    } else {
        spans.extend(field_spans(search, search_focused));
    }
    let border = if search_focused { Color::Cyan } else { Color::White };
    let search_box = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title("Search"),
    );
    f.render_widget(search_box, chunks[1]);
}

fn task_item(task: &Task) -> ListItem<'static> {
    let star = if task.is_favorite { "★ " } else { "☆ " };
    let title_style = if task.status == TaskStatus::Completed {
        Style::default()
            .fg(task.color.terminal_color())
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(task.color.terminal_color()).add_modifier(Modifier::BOLD)
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(star, Style::default().fg(Color::Yellow)),
        Span::styled(format!("{} ", task.title), title_style),
        Span::styled(format!("[{}]", task.status.label()), Style::default().fg(task.status.color())),
    ])];
    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(Line::from(Span::styled(
            format!("  {}", preview(description)),
            Style::default().fg(Color::Gray),
        )));
    }
    ListItem::new(lines)
}

fn section(f: &mut Frame, area: Rect, title: &str, tasks: &[&Task], selected: Option<usize>) {
    let items: Vec<ListItem> = tasks.iter().map(|t| task_item(t)).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");
    let mut state = ListState::default();
    state.select(selected);
    f.render_stateful_widget(list, area, &mut state);
}

/// Favorites above others; `selected` indexes the combined display order.
/// `refreshing` carries the animation tick while a list request is in flight.
pub fn render_task_list(
    f: &mut Frame,
    area: Rect,
    parts: &Partitions,
    selected: Option<usize>,
    refreshing: Option<usize>,
) {
    if parts.is_empty() {
        let message = if refreshing.is_some() { "Loading..." } else { "No notes yet. Press n to take a note." };
        let empty = Paragraph::new(message)
            .block(Block::default().borders(Borders::ALL).title("Notes"))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, area);
        return;
    }

    let favorites = parts.favorites.len();
    let in_favorites = selected.filter(|i| *i < favorites);
    let in_others = selected.and_then(|i| i.checked_sub(favorites));

    let spinner = refreshing.map_or(String::new(), |tick| format!(" {}", LoadingSize::Small.glyph(tick)));
    let favorites_title = format!("Favorites{spinner}");

    match (parts.favorites.is_empty(), parts.others.is_empty()) {
        (false, true) => section(f, area, &favorites_title, &parts.favorites, in_favorites),
        (true, false) => section(f, area, &format!("Others{spinner}"), &parts.others, in_others),
        _ => {
            let wanted = (favorites as u16).saturating_mul(2).saturating_add(2);
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(wanted.min(area.height / 2)), Constraint::Min(3)].as_ref())
                .split(area);
            section(f, chunks[0], &favorites_title, &parts.favorites, in_favorites);
            section(f, chunks[1], "Others", &parts.others, in_others);
        }
    }
}

pub fn render_task_detail(f: &mut Frame, area: Rect, task: Option<&Task>) {
    let controls = "Controls:\n• n: New note\n• Enter: Edit\n• Space: Favorite\n• x: Complete\n• s: Status\n• d: Delete\n• /: Search\n• f/t/c: Filters\n• r: Reload\n• ?: Help\n• q: Quit";
    let text = match task {
        Some(task) => format!(
            "{}\n\nStatus: {}\nColor: {}\nFavorite: {}\nCreated: {}\nUpdated: {}\n\n{}\n\n{}",
            task.title,
            task.status.label(),
            task.color,
            if task.is_favorite { "yes" } else { "no" },
            task.created_label(),
            crate::models::format_timestamp(&task.updated_at),
            task.description.as_deref().unwrap_or(""),
            controls
        ),
        None => format!("No note selected\n\n{controls}"),
    };
    let border = task.map_or(Color::White, |t| t.color.terminal_color());
    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title("Note"),
        )
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

pub fn render_loading(f: &mut Frame, area: Rect, message: &str, size: LoadingSize, tick: usize) {
    let glyph = size.glyph(tick);
    let paragraph = Paragraph::new(Line::from(vec![
        Span::styled(glyph, Style::default().fg(Color::Cyan)),
        Span::raw(format!(" {message}")),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

/// List-load failure with its retry affordance.
pub fn render_error_banner(f: &mut Frame, area: Rect, message: &str) {
    let text = vec![
        Line::from(Span::styled(
            "Error loading tasks",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::LightRed))),
        Line::from(Span::styled("Press r to try again", Style::default().add_modifier(Modifier::UNDERLINED))),
    ];
    let banner = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );
    f.render_widget(banner, area);
}

pub fn render_status_line(f: &mut Frame, area: Rect, text: Option<&str>, is_error: bool, busy: bool) {
    let mut spans = Vec::new();
    if busy {
        spans.push(Span::styled("⟳ ", Style::default().fg(Color::Cyan)));
    }
    match text {
        Some(text) => {
            let color = if is_error { Color::Red } else { Color::Green };
            spans.push(Span::styled(text.to_string(), Style::default().fg(color)));
        }
        None => spans.push(Span::styled("? for help · q to quit", Style::default().fg(Color::DarkGray))),
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

pub fn render_form(f: &mut Frame, form: &TaskForm) {
    let area = centered_rect(70, 60, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(format!(
            "{} - Tab: Field | F2: Color | Ctrl+S: Save | Esc: Cancel",
            form.heading()
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(form.color.terminal_color()))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![Line::from(Span::styled(
        "Title",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    lines.push(Line::from(field_spans(&form.title, form.focus == Field::Title)));
    for error in form.errors_for(Field::Title) {
        lines.push(Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Description",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if form.focus == Field::Description {
        let (before, after) = form.description.split_at_cursor();
        let combined = format!("{before}\u{2588}{after}");
        for line in combined.lines() {
            lines.push(Line::from(line.to_string()));
        }
    } else if form.description.value.is_empty() {
        lines.push(Line::from(Span::styled("Take a note...", Style::default().fg(Color::DarkGray))));
    } else {
        for line in form.description.value.lines() {
            lines.push(Line::from(line.to_string()));
        }
    }
    for error in form.errors_for(Field::Description) {
        lines.push(Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(""));

    let mut palette = vec![Span::styled("Color: ", Style::default().add_modifier(Modifier::BOLD))];
    for color in TaskColor::PALETTE {
        let style = Style::default().fg(color.terminal_color());
        if color == form.color {
            palette.push(Span::styled(format!("[{color}] "), style.add_modifier(Modifier::BOLD)));
        } else {
            palette.push(Span::styled(format!("{color} "), style));
        }
    }
    lines.push(Line::from(palette));

    if form.submitting {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Saving...", Style::default().fg(Color::Cyan))));
    }
    if let Some(failure) = &form.failure {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(failure.clone(), Style::default().fg(Color::Red))));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

pub fn render_status_popup(f: &mut Frame, current: Option<TaskStatus>) {
    let popup_area = centered_rect(50, 30, f.area());
    f.render_widget(Clear, popup_area);
    let block = Block::default()
        .title("Change Status")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::DarkGray));
    let mut text = String::from("Select new status:\n\n");
    for (i, status) in TaskStatus::ALL.iter().enumerate() {
        let marker = if Some(*status) == current { " (current)" } else { "" };
        text.push_str(&format!("{}. {}{}\n", i + 1, status.label(), marker));
    }
    text.push_str("\nPress ESC to cancel");
    let content = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
    f.render_widget(content, popup_area);
}

pub fn render_confirm_delete(f: &mut Frame, title: &str) {
    let popup_area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, popup_area);
    let block = Block::default()
        .title("Delete Note")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::DarkGray));
    let content = Paragraph::new(format!(
        "Are you sure you want to delete this note?\n\n{title}\n\ny: Delete   n/ESC: Cancel"
    ))
    .block(block)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: false })
    .style(Style::default().fg(Color::White));
    f.render_widget(content, popup_area);
}

pub fn render_help(f: &mut Frame) {
    let popup_area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, popup_area);
    let text = "Notes\n  ↑/↓ or j/k   Move selection\n  n            New note\n  Enter / e    Edit note\n  Space / *    Toggle favorite\n  x            Toggle completed\n  s            Pick status\n  d            Delete note\n\nFilters\n  /            Search\n  f            Favorites / others / all\n  t            Cycle status filter\n  c            Cycle color filter\n  r            Reload\n\nForm\n  Tab          Next field\n  F2 / Ctrl+→  Next color\n  Ctrl+←       Previous color\n  Ctrl+F       Toggle favorite (edit)\n  Ctrl+S       Save\n  Esc          Cancel\n\nPress any key to close";
    let content = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default().fg(Color::White).bg(Color::Black));
    f.render_widget(content, popup_area);
}
