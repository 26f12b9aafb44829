use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{List, ListItem, ListState},
};

use super::Pane;
use threadlet::config::ThemeConfig;
use threadlet::mail::Thread;

pub fn render_threads(
    f: &mut Frame,
    area: Rect,
    threads: &[&Thread],
    state: &mut ListState,
    title: &str,
    focused: bool,
    theme: &ThemeConfig,
) {
    // Available width: area minus borders (2) minus highlight symbol (2)
    let avail_width = area.width.saturating_sub(4) as usize;

    // Date: "Feb 02 04:11" = 12 chars, count column "12m 4p"
    let date_width = 13;
    let count_width = 8;
    let subject_width = avail_width.saturating_sub(date_width + count_width + 2);

    let items: Vec<ListItem> = threads
        .iter()
        .map(|t| {
            let date = t
                .start_time()
                .map(|d| d.format("%b %d %H:%M").to_string())
                .unwrap_or_default();
            let counts = format!("{}m {}p", t.messages.len(), participant_count(t));
            let line = format!(
                "{:dw$} {:cw$} {}",
                truncate(&date, date_width),
                truncate(&counts, count_width),
                truncate(t.subject(), subject_width),
                dw = date_width,
                cw = count_width,
            );
            ListItem::new(Line::raw(line))
        })
        .collect();

    let pane = Pane::new(title, focused, theme);
    let list = List::new(items)
        .block(pane.block())
        .style(Style::default().fg(theme.fg()))
        .highlight_style(
            Style::default()
                .bg(theme.selected_bg())
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, state);
}

fn participant_count(t: &Thread) -> usize {
    let mut emails: Vec<&str> = t
        .messages
        .iter()
        .flat_map(|m| {
            std::iter::once(m.sender.as_str()).chain(m.recipients.iter().map(|r| r.email.as_str()))
        })
        .collect();
    emails.sort_unstable();
    emails.dedup();
    emails.len()
}

fn truncate(s: &str, max: usize) -> String {
    if max < 4 {
        return s.chars().take(max).collect();
    }
    let char_count = s.chars().count();
    if char_count <= max {
        format!("{:width$}", s, width = max)
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
