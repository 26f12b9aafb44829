use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::canvas::{Canvas, Line as Segment, Points},
};

use super::Pane;
use threadlet::config::ThemeConfig;
use threadlet::vis::layout::{PlacedGroup, PlacedInstance, PlacedLine, ThreadLayout};
use threadlet::vis::Highlight;

/// Person rows with their instance dots; run lines drawn over the dimmed
/// exclusion lines.
pub fn render_timeline(
    f: &mut Frame,
    area: Rect,
    layout: &ThreadLayout,
    highlight: &Highlight,
    title: &str,
    badge: &str,
    focused: bool,
    theme: &ThemeConfig,
) {
    let pane = Pane::new(title, focused, theme).badge(badge);
    let width = layout.width.max(1.0);
    // Canvas y grows upwards; layout y grows downwards.
    let height = layout.height.max(1.0);
    let flip = |y: f64| height - y;

    let canvas = Canvas::default()
        .block(pane.block())
        .background_color(theme.bg())
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for line in layout.lines.iter().filter(|l| l.is_exclusion) {
                ctx.draw(&segment(line, flip(line.y), line_color(line, highlight, theme)));
            }
            ctx.layer();
            for line in layout.lines.iter().filter(|l| !l.is_exclusion) {
                ctx.draw(&segment(line, flip(line.y), line_color(line, highlight, theme)));
            }
            ctx.layer();
            for group in &layout.groups {
                for inst in &group.instances {
                    ctx.draw(&Points {
                        coords: &[(inst.x, flip(group.y + inst.y))],
                        color: instance_color(inst, theme),
                    });
                }
            }
            for group in &layout.groups {
                let offset = group.instances.first().map_or(0.0, |i| i.y);
                let y = flip(group.y + offset);
                ctx.print(0.0, y, label(group, highlight, theme));
            }
        });

    f.render_widget(canvas, area);
}

fn segment(line: &PlacedLine, y: f64, color: Color) -> Segment {
    Segment {
        x1: line.x1,
        y1: y,
        x2: line.x2,
        y2: y,
        color,
    }
}

fn line_color(line: &PlacedLine, highlight: &Highlight, theme: &ThemeConfig) -> Color {
    if highlight.is_highlighted(&line.group_id) {
        theme.highlight()
    } else if line.is_exclusion {
        theme.exclusion()
    } else if line.is_group {
        theme.group()
    } else {
        theme.fg_muted()
    }
}

fn instance_color(inst: &PlacedInstance, theme: &ThemeConfig) -> Color {
    if inst.is_sender {
        theme.sender()
    } else if inst.is_bcc {
        theme.bcc()
    } else {
        theme.recipient()
    }
}

fn label(group: &PlacedGroup, highlight: &Highlight, theme: &ThemeConfig) -> Span<'static> {
    let mut style = Style::default().fg(if group.is_group {
        theme.group()
    } else {
        theme.fg()
    });
    if group.is_sender {
        style = style.add_modifier(Modifier::BOLD);
    }
    if highlight.is_highlighted(&group.id) {
        style = style.fg(theme.highlight());
    }
    let text: String = group.label.chars().take(11).collect();
    Span::styled(text, style)
}
