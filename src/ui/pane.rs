use ratatui::{
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders},
};

use threadlet::config::ThemeConfig;

/// Bordered pane with a title on the left and an optional state badge on
/// the right, e.g. the timeline's sort method and scale mode.
pub struct Pane<'a> {
    title: &'a str,
    badge: Option<&'a str>,
    focused: bool,
    theme: &'a ThemeConfig,
}

impl<'a> Pane<'a> {
    pub fn new(title: &'a str, focused: bool, theme: &'a ThemeConfig) -> Self {
        Self {
            title,
            badge: None,
            focused,
            theme,
        }
    }

    pub fn badge(mut self, badge: &'a str) -> Self {
        self.badge = Some(badge).filter(|b| !b.is_empty());
        self
    }

    pub fn block(&self) -> Block<'a> {
        let border_color = if self.focused {
            self.theme.border_active()
        } else {
            self.theme.border()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title_style(Style::default().fg(self.theme.primary()))
            .title(self.title);

        match self.badge {
            Some(badge) => block.title_top(
                Line::from(Span::styled(
                    format!(" {badge} "),
                    Style::default().fg(self.theme.secondary()),
                ))
                .right_aligned(),
            ),
            None => block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

    fn top_row(pane: &Pane) -> String {
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        pane.block().render(area, &mut buf);
        (0..area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn badge_sits_at_the_right_edge() {
        let theme = ThemeConfig::default();
        let row = top_row(&Pane::new("Timeline", true, &theme).badge("time / absolute"));
        assert!(row.contains("Timeline"));
        assert!(row.ends_with(" time / absolute ┐"));
    }

    #[test]
    fn empty_badge_is_skipped() {
        let theme = ThemeConfig::default();
        let row = top_row(&Pane::new("Threads", false, &theme).badge(""));
        assert!(row.contains("Threads"));
        assert!(row.ends_with("─┐"));
    }
}
