use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::View;
use threadlet::config::ThemeConfig;

pub fn render_help(
    f: &mut Frame,
    area: Rect,
    view: View,
    status: Option<&str>,
    search_query: Option<&str>,
    theme: &ThemeConfig,
) {
    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg_muted());
    let search_style = Style::default().fg(theme.fg());

    let help_text = match view {
        View::Search => vec![
            Span::styled("/", key_style),
            Span::raw(" "),
            Span::styled(search_query.unwrap_or(""), search_style),
            Span::styled("_", key_style),
            Span::styled("  ", text_style),
            Span::styled("Enter", key_style),
            Span::styled(" confirm  ", text_style),
            Span::styled("Esc", key_style),
            Span::styled(" cancel", text_style),
        ],
        View::List => vec![
            Span::styled("j/k", key_style),
            Span::styled(" thread  ", text_style),
            Span::styled("J/K", key_style),
            Span::styled(" person  ", text_style),
            Span::styled("s", key_style),
            Span::styled(" sort  ", text_style),
            Span::styled("a", key_style),
            Span::styled(" scale  ", text_style),
            Span::styled("1-9", key_style),
            Span::styled(" label  ", text_style),
            Span::styled("r", key_style),
            Span::styled(" request  ", text_style),
            Span::styled("/", key_style),
            Span::styled(" search  ", text_style),
            Span::styled("q", key_style),
            Span::styled(" quit", text_style),
        ],
    };

    let mut line = Line::from(help_text);

    if let Some(msg) = status {
        line.spans
            .push(Span::styled("  |  ", Style::default().fg(theme.border())));
        line.spans
            .push(Span::styled(msg, Style::default().fg(theme.secondary())));
    }

    let paragraph = Paragraph::new(line).style(Style::default().bg(theme.bg()));

    f.render_widget(paragraph, area);
}
