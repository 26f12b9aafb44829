use ratatui::{layout::Rect, widgets::ListState};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use threadlet::config::Config;
use threadlet::labels::LabelSet;
use threadlet::mail::Thread;
use threadlet::vis::{ThreadView, VisEvent};

/// Terminal columns the participant labels take up.
const LABEL_COLUMNS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    List,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pane {
    List,
    Timeline,
}

pub struct App {
    pub config: Arc<Config>,
    pub view: View,
    pub threads: Vec<Thread>,
    pub filtered_indices: Vec<usize>,
    pub list_state: ListState,
    pub timeline: ThreadView,
    pub labels: LabelSet,
    pub hovered_row: Option<usize>,
    pub should_quit: bool,
    pub status_message: Option<String>,
    pub search_query: String,
    pub focused_pane: Pane,
    // Mouse tracking - pane areas
    pub list_area: Rect,
    pub timeline_area: Rect,
    /// Last event the timeline emitted
    pub last_event: Rc<RefCell<Option<VisEvent>>>,
    // Thread index currently loaded into the timeline
    loaded: Option<usize>,
}

impl App {
    pub fn new(threads: Vec<Thread>, config: Arc<Config>) -> Self {
        let mut list_state = ListState::default();
        if !threads.is_empty() {
            list_state.select(Some(0));
        }

        let mut timeline = ThreadView::new(config.view, config.layout);
        let last_event = Rc::new(RefCell::new(None));
        let sink = last_event.clone();
        timeline.events().subscribe(move |e: &VisEvent| {
            tracing::debug!(event = ?e, "timeline event");
            *sink.borrow_mut() = Some(e.clone());
        });

        let labels = LabelSet::from_config(&config.labelling);
        let filtered_indices = (0..threads.len()).collect();
        let mut app = Self {
            config,
            view: View::List,
            threads,
            filtered_indices,
            list_state,
            timeline,
            labels,
            hovered_row: None,
            should_quit: false,
            status_message: None,
            search_query: String::new(),
            focused_pane: Pane::List,
            list_area: Rect::default(),
            timeline_area: Rect::default(),
            last_event,
            loaded: None,
        };
        app.load_selected();
        app
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    fn selected_index(&self) -> Option<usize> {
        self.list_state
            .selected()
            .and_then(|i| self.filtered_indices.get(i))
            .copied()
    }

    pub fn selected_thread(&self) -> Option<&Thread> {
        self.selected_index().and_then(|idx| self.threads.get(idx))
    }

    pub fn next(&mut self) {
        if self.filtered_indices.is_empty() {
            return;
        }
        let max = self.filtered_indices.len() - 1;
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(max),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.load_selected();
    }

    pub fn previous(&mut self) {
        if self.filtered_indices.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.load_selected();
    }

    /// Hand the selected thread to the timeline if it changed.
    pub fn load_selected(&mut self) {
        let idx = self.selected_index();
        if idx == self.loaded {
            return;
        }
        self.loaded = idx;
        self.hovered_row = None;

        let messages = idx
            .and_then(|i| self.threads.get(i))
            .map(|t| t.messages.clone())
            .unwrap_or_default();
        if let Err(e) = self.timeline.set_messages(messages) {
            tracing::warn!("cannot show thread: {e}");
            self.set_status(&format!("Error: {e}"));
        }
    }

    pub fn group_count(&mut self) -> usize {
        self.timeline.model().groups.len()
    }

    /// Hover a timeline row, or clear the hover with None.
    pub fn hover_row(&mut self, row: Option<usize>) {
        let row = row.filter(|&r| r < self.group_count());
        self.hovered_row = row;
        let id = row.map(|r| self.timeline.model().groups[r].id.clone());
        self.timeline.hover(id.as_deref());
    }

    pub fn hover_next(&mut self) {
        let count = self.group_count();
        if count == 0 {
            return;
        }
        let row = match self.hovered_row {
            Some(r) => (r + 1).min(count - 1),
            None => 0,
        };
        self.hover_row(Some(row));
    }

    pub fn hover_previous(&mut self) {
        if self.group_count() == 0 {
            return;
        }
        let row = self.hovered_row.map(|r| r.saturating_sub(1)).unwrap_or(0);
        self.hover_row(Some(row));
    }

    /// Title of the hovered row (member addresses).
    pub fn hovered_title(&mut self) -> Option<String> {
        let row = self.hovered_row?;
        self.timeline.model().groups.get(row).map(|g| g.title.replace('\n', ", "))
    }

    /// Status line text for the last timeline event.
    pub fn last_event_text(&self) -> Option<String> {
        match self.last_event.borrow().as_ref()? {
            VisEvent::Click { id } => Some(format!("Clicked message {id}")),
            VisEvent::Hover { id: Some(id) } => Some(format!("Hover {id}")),
            VisEvent::Hover { id: None } => None,
            VisEvent::Brush { ids } => Some(format!("Brushed {} threads", ids.len())),
        }
    }

    /// Label the selected thread with the class in position `slot`.
    pub fn label_selected(&mut self, slot: usize) {
        let Some(thread_id) = self.selected_thread().map(|t| t.thread_id.clone()) else {
            return;
        };
        let Some(class) = self.labels.classes().get(slot).cloned() else {
            self.set_status(&format!("No class {}", slot + 1));
            return;
        };
        self.labels.assign(thread_id.clone(), class.id);
        self.set_status(&format!("Labelled {} as {}", thread_id, class.label));
    }

    /// Classification request for the current labels, shown in the status bar.
    pub fn show_label_request(&mut self) {
        match self.labels.request_url() {
            Ok(url) => {
                tracing::info!(labels = self.labels.assignments().len(), "label request built");
                self.set_status(&url);
            }
            Err(e) => self.set_status(&format!("Error: {e}")),
        }
    }

    pub fn toggle_sort(&mut self) {
        let sort = self.timeline.sort_method().toggled();
        self.timeline.set_sort_method(sort);
        self.hover_row(self.hovered_row);
        self.set_status(&format!("Sort: {}", sort.name()));
    }

    pub fn toggle_scale(&mut self) {
        let mode = self.timeline.scale_mode().toggled();
        self.timeline.set_scale_mode(mode);
        self.set_status(&format!("Scale: {}", mode.name()));
    }

    pub fn start_search(&mut self) {
        self.search_query.clear();
        self.view = View::Search;
    }

    pub fn cancel_search(&mut self) {
        self.search_query.clear();
        self.view = View::List;
        self.apply_filter();
    }

    /// Recompute filtered_indices from the search query (subject or participant)
    pub fn apply_filter(&mut self) {
        let query = self.search_query.to_lowercase();
        self.filtered_indices = self
            .threads
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                if query.is_empty() {
                    return true;
                }
                fuzzy_match(&t.subject().to_lowercase(), &query)
                    || t.messages.iter().any(|m| {
                        m.sender.contains(&query)
                            || m.recipients.iter().any(|r| r.email.contains(&query))
                    })
            })
            .map(|(i, _)| i)
            .collect();

        if self.filtered_indices.is_empty() {
            self.list_state.select(None);
        } else if self
            .list_state
            .selected()
            .is_none_or(|s| s >= self.filtered_indices.len())
        {
            self.list_state.select(Some(0));
        }
        self.load_selected();
    }

    pub fn set_pane_areas(&mut self, list: Rect, timeline: Rect) {
        self.list_area = list;
        self.timeline_area = timeline;
        self.fit_timeline();
    }

    /// Size the layout so one participant row is one terminal row.
    fn fit_timeline(&mut self) {
        let cfg = self.config.layout;
        let cols = self.timeline_area.width.saturating_sub(2) as f64;
        let rows = self.timeline_area.height.saturating_sub(2) as f64;
        let col_width = cfg.label_width / LABEL_COLUMNS;
        self.timeline.resize(
            cols * col_width + cfg.margin.left + cfg.margin.right,
            rows * cfg.person_height + cfg.margin.top + cfg.margin.bottom,
        );
    }

    /// Layout x of the center of terminal column `x`.
    fn column_to_x(&self, x: u16) -> f64 {
        let col = x.saturating_sub(self.timeline_area.x + 1) as f64;
        let col_width = self.config.layout.label_width / LABEL_COLUMNS;
        col * col_width + col_width / 2.0
    }

    fn in_area(area: Rect, x: u16, y: u16) -> bool {
        x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
    }

    fn timeline_row(&self, y: u16) -> Option<usize> {
        let top = self.timeline_area.y + 1;
        (y >= top).then(|| (y - top) as usize)
    }

    /// Handle click at (x, y) - returns true if thread selection changed
    pub fn handle_click(&mut self, x: u16, y: u16) -> bool {
        if Self::in_area(self.list_area, x, y) {
            self.focused_pane = Pane::List;
            // +1 for top border
            let visual_row = y.saturating_sub(self.list_area.y + 1) as usize;
            let actual_row = visual_row + self.list_state.offset();
            if actual_row < self.filtered_indices.len() {
                self.list_state.select(Some(actual_row));
                self.load_selected();
                return true;
            }
        } else if Self::in_area(self.timeline_area, x, y) {
            self.focused_pane = Pane::Timeline;
            let px = self.column_to_x(x);
            let layout = self.timeline.layout();
            let nearest = layout
                .message_x
                .iter()
                .enumerate()
                .min_by(|a, b| (a.1 - px).abs().total_cmp(&(b.1 - px).abs()))
                .map(|(i, _)| i);
            if let Some(idx) = nearest {
                self.timeline.click(idx);
                if let Some(m) = self.timeline.messages().get(idx) {
                    let msg = format!("{} - {} ({})", m.time.format("%b %d %H:%M"), m.sender, m.subject_display());
                    self.set_status(&msg);
                }
            }
        }
        false
    }

    pub fn handle_mouse_move(&mut self, x: u16, y: u16) {
        if Self::in_area(self.timeline_area, x, y) {
            let row = self.timeline_row(y);
            self.hover_row(row);
        } else if self.hovered_row.is_some() {
            self.hover_row(None);
        }
    }
}

fn fuzzy_match(text: &str, pattern: &str) -> bool {
    let mut pattern_chars = pattern.chars().peekable();
    for c in text.chars() {
        if pattern_chars.peek() == Some(&c) {
            pattern_chars.next();
        }
        if pattern_chars.peek().is_none() {
            return true;
        }
    }
    pattern_chars.peek().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use threadlet::mail::{Message, Recipient, RecipientType};

    fn thread(id: &str, subject: &str, people: &[&str]) -> Thread {
        let messages = people
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Message {
                message_id: format!("{id}-{i}"),
                subject: Some(subject.to_string()),
                sender: pair[0].to_string(),
                time: Utc.with_ymd_and_hms(2001, 3, 1, 10, i as u32, 0).unwrap(),
                recipients: vec![Recipient::new(pair[1], RecipientType::To)],
                body: None,
            })
            .collect();
        Thread::new(id, messages)
    }

    fn app() -> App {
        let threads = vec![
            thread("t1", "Budget review", &["a@x.com", "b@x.com", "a@x.com"]),
            thread("t2", "Gas contracts", &["c@x.com", "d@x.com"]),
        ];
        App::new(threads, Arc::new(Config::default()))
    }

    #[test]
    fn selecting_threads_loads_timeline() {
        let mut app = app();
        assert_eq!(app.timeline.messages().len(), 2);
        app.next();
        assert_eq!(app.selected_thread().unwrap().thread_id, "t2");
        assert_eq!(app.timeline.messages()[0].sender, "c@x.com");
        app.next();
        assert_eq!(app.selected_thread().unwrap().thread_id, "t2");
    }

    #[test]
    fn hover_walks_rows_and_emits() {
        let mut app = app();
        app.hover_next();
        assert_eq!(app.hovered_row, Some(0));
        assert_eq!(
            *app.last_event.borrow(),
            Some(VisEvent::Hover { id: Some("a@x.com".into()) })
        );
        app.hover_next();
        app.hover_next();
        assert_eq!(app.hovered_row, Some(1));
        assert_eq!(app.hovered_title().as_deref(), Some("b@x.com"));
        app.hover_previous();
        assert_eq!(app.hovered_row, Some(0));
    }

    #[test]
    fn search_filters_by_subject_and_participant() {
        let mut app = app();
        app.search_query = "gas".to_string();
        app.apply_filter();
        assert_eq!(app.filtered_indices, vec![1]);
        assert_eq!(app.timeline.messages()[0].sender, "c@x.com");

        app.search_query = "b@x".to_string();
        app.apply_filter();
        assert_eq!(app.filtered_indices, vec![0]);

        app.cancel_search();
        assert_eq!(app.filtered_indices, vec![0, 1]);
    }

    #[test]
    fn toggles_update_status() {
        let mut app = app();
        app.toggle_sort();
        assert_eq!(app.status_message.as_deref(), Some("Sort: engagement"));
        app.toggle_scale();
        assert_eq!(app.status_message.as_deref(), Some("Scale: relative"));
    }

    #[test]
    fn labels_use_configured_endpoint() {
        let config = Config::from_toml_str(
            "[labelling]\nendpoint = \"http://classifier/predict\"",
        )
        .unwrap();
        let threads = vec![thread("t1", "Budget review", &["a@x.com", "b@x.com"])];
        let mut app = App::new(threads, Arc::new(config));

        app.label_selected(1);
        assert_eq!(app.status_message.as_deref(), Some("Labelled t1 as Class 2"));
        assert_eq!(app.labels.class_of("t1"), Some(1));
        app.label_selected(5);
        assert_eq!(app.status_message.as_deref(), Some("No class 6"));

        app.show_label_request();
        let status = app.status_message.clone().unwrap();
        assert!(status.starts_with("http://classifier/predict?params="));
        assert!(status.contains("t1"));
    }

    #[test]
    fn last_event_feeds_status_text() {
        let mut app = app();
        assert_eq!(app.last_event_text(), None);
        app.hover_next();
        assert_eq!(app.last_event_text().as_deref(), Some("Hover a@x.com"));
        app.timeline.click(1);
        assert_eq!(app.last_event_text().as_deref(), Some("Clicked message t1-1"));
        app.hover_row(None);
        assert_eq!(app.last_event_text(), None);
    }

    #[test]
    fn fuzzy_matches_in_order() {
        assert!(fuzzy_match("budget review", "bdgt"));
        assert!(!fuzzy_match("budget", "tgb"));
    }
}
