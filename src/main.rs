mod app;
mod ui;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Pane, View};
use threadlet::config::Config;
use threadlet::mail::{Thread, load_threads};
use ui::{render_help, render_threads, render_timeline};

fn main() -> Result<()> {
    init_logging()?;

    let config = Arc::new(Config::load());
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.dataset.path())
        .context("usage: threadlet <dataset.json> (or set dataset.path in config.toml)")?;
    let threads =
        load_threads(&path).with_context(|| format!("failed to load {}", path.display()))?;
    tracing::info!(path = %path.display(), threads = threads.len(), "dataset loaded");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(threads, config);

    loop {
        terminal.draw(|f| render(&mut app, f))?;

        // Poll with timeout so we redraw on resize even without focus
        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }

        match event::read()? {
            Event::Key(key) => {
                app.clear_status();
                match app.view {
                    View::List => match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Esc => app.focused_pane = Pane::List,
                        KeyCode::Char('h') | KeyCode::Left => app.focused_pane = Pane::List,
                        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => {
                            app.focused_pane = Pane::Timeline;
                        }
                        KeyCode::Char('j') | KeyCode::Down => match app.focused_pane {
                            Pane::List => app.next(),
                            Pane::Timeline => app.hover_next(),
                        },
                        KeyCode::Char('k') | KeyCode::Up => match app.focused_pane {
                            Pane::List => app.previous(),
                            Pane::Timeline => app.hover_previous(),
                        },
                        KeyCode::Char('J') => app.hover_next(),
                        KeyCode::Char('K') => app.hover_previous(),
                        KeyCode::Char('s') => app.toggle_sort(),
                        KeyCode::Char('a') => app.toggle_scale(),
                        KeyCode::Char('/') => app.start_search(),
                        KeyCode::Char('r') => app.show_label_request(),
                        KeyCode::Char(c @ '1'..='9') => {
                            app.label_selected(c as usize - '1' as usize);
                        }
                        _ => {}
                    },
                    View::Search => match key.code {
                        KeyCode::Esc => app.cancel_search(),
                        KeyCode::Enter => app.view = View::List,
                        KeyCode::Backspace => {
                            app.search_query.pop();
                            app.apply_filter();
                        }
                        KeyCode::Char(c) => {
                            app.search_query.push(c);
                            app.apply_filter();
                        }
                        _ => {}
                    },
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::Down(_) => {
                    app.handle_click(mouse.column, mouse.row);
                }
                MouseEventKind::Moved => app.handle_mouse_move(mouse.column, mouse.row),
                MouseEventKind::ScrollDown => match app.focused_pane {
                    Pane::List => app.next(),
                    Pane::Timeline => app.hover_next(),
                },
                MouseEventKind::ScrollUp => match app.focused_pane {
                    Pane::List => app.previous(),
                    Pane::Timeline => app.hover_previous(),
                },
                _ => {}
            },
            Event::Resize(_, _) => {
                // Terminal resized - just redraw on next loop iteration
            }
            _ => {}
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

/// Log to {cache_dir}/threadlet/threadlet.log so the terminal stays clean.
fn init_logging() -> Result<()> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("threadlet");
    std::fs::create_dir_all(&dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("threadlet.log"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadlet=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

fn render(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let config = app.config.clone();
    let theme = &config.theme;

    // Split into main area and help bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[0]);

    // Store pane areas for mouse handling and timeline sizing
    app.set_pane_areas(panes[0], panes[1]);

    // Left pane: thread list
    let filtered: Vec<Thread> = app
        .filtered_indices
        .iter()
        .filter_map(|&i| app.threads.get(i).cloned())
        .collect();
    let filtered_refs: Vec<&Thread> = filtered.iter().collect();
    let title = if app.search_query.is_empty() {
        format!("Threads ({})", app.threads.len())
    } else {
        format!("Threads ({} matches)", filtered.len())
    };
    render_threads(
        f,
        panes[0],
        &filtered_refs,
        &mut app.list_state,
        &title,
        app.focused_pane == Pane::List,
        theme,
    );

    // Right pane: timeline of the selected thread
    let timeline_title = app
        .selected_thread()
        .map(|t| t.subject().to_string())
        .unwrap_or_else(|| "Timeline".to_string());
    let badge = format!(
        "{} / {}",
        app.timeline.sort_method().name(),
        app.timeline.scale_mode().name(),
    );
    let layout = app.timeline.layout();
    render_timeline(
        f,
        panes[1],
        &layout,
        app.timeline.highlight(),
        &timeline_title,
        &badge,
        app.focused_pane == Pane::Timeline,
        theme,
    );

    let hovered = app.hovered_title();
    let status = app
        .status_message
        .clone()
        .or(hovered)
        .or_else(|| app.last_event_text());
    let search_query = (app.view == View::Search).then_some(app.search_query.as_str());
    render_help(
        f,
        chunks[1],
        app.view,
        status.as_deref(),
        search_query,
        theme,
    );
}
