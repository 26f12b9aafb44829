use chrono::{DateTime, Utc};

use super::events::{Dispatcher, Highlight, VisEvent};
use super::grouping::{Group, group_persons};
use super::layout::{ScaleMode, ThreadLayout, layout_thread};
use super::lines::{Line, build_lines};
use super::persons::{MessageInstance, Persons, extract_persons};
use super::sorting::{SortMethod, sort_groups};
use crate::config::{LayoutConfig, ViewConfig};
use crate::error::Result;
use crate::mail::{Message, sort_messages};

/// Derived state that is either current or waiting to be rebuilt.
#[derive(Debug)]
pub enum ModelState<M> {
    Dirty,
    Clean(M),
}

impl<M> Default for ModelState<M> {
    fn default() -> Self {
        ModelState::Dirty
    }
}

impl<M> ModelState<M> {
    pub fn is_dirty(&self) -> bool {
        matches!(self, ModelState::Dirty)
    }

    pub fn invalidate(&mut self) {
        *self = ModelState::Dirty;
    }

    pub fn get_or_compute(&mut self, compute: impl FnOnce() -> M) -> &mut M {
        if self.is_dirty() {
            *self = ModelState::Clean(compute());
        }
        match self {
            ModelState::Clean(model) => model,
            ModelState::Dirty => unreachable!("model computed above"),
        }
    }

    pub fn as_mut(&mut self) -> Option<&mut M> {
        match self {
            ModelState::Clean(model) => Some(model),
            ModelState::Dirty => None,
        }
    }
}

/// Participants of one thread, grouped, sorted and connected.
#[derive(Debug, Clone)]
pub struct ThreadModel {
    pub persons: Persons<MessageInstance>,
    pub groups: Vec<Group<MessageInstance>>,
    pub lines: Vec<Line>,
    pub times: Vec<DateTime<Utc>>,
}

impl ThreadModel {
    pub fn build(messages: &[Message], sort: SortMethod) -> Self {
        let times: Vec<_> = messages.iter().map(|m| m.time).collect();
        let persons = extract_persons(messages);
        let mut groups = group_persons(persons.as_slice());
        sort_groups(&mut groups, sort, &times);
        let lines = build_lines(&groups);
        tracing::debug!(
            messages = messages.len(),
            persons = persons.len(),
            groups = groups.len(),
            lines = lines.len(),
            "thread model rebuilt"
        );
        Self {
            persons,
            groups,
            lines,
            times,
        }
    }

    fn resort(&mut self, sort: SortMethod) {
        sort_groups(&mut self.groups, sort, &self.times);
        self.lines = build_lines(&self.groups);
    }

    /// Group holding `email`, if any.
    pub fn group_of(&self, email: &str) -> Option<&Group<MessageInstance>> {
        self.groups.iter().find(|g| g.contains(email))
    }
}

/// Single-thread timeline: messages in, sorted groups and coordinates out.
#[derive(Debug, Default)]
pub struct ThreadView {
    messages: Vec<Message>,
    view: ViewConfig,
    layout: LayoutConfig,
    state: ModelState<ThreadModel>,
    highlight: Highlight,
    events: Dispatcher<VisEvent>,
}

impl ThreadView {
    pub fn new(view: ViewConfig, layout: LayoutConfig) -> Self {
        Self {
            view,
            layout,
            ..Self::default()
        }
    }

    /// Replace the messages. Validation happens before anything changes.
    pub fn set_messages(&mut self, mut messages: Vec<Message>) -> Result<()> {
        for m in &messages {
            m.validate()?;
        }
        sort_messages(&mut messages);
        self.messages = messages;
        self.state.invalidate();
        self.highlight.clear();
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    pub fn model(&mut self) -> &ThreadModel {
        let (messages, sort) = (&self.messages, self.view.sort_method);
        self.state.get_or_compute(|| ThreadModel::build(messages, sort))
    }

    pub fn sort_method(&self) -> SortMethod {
        self.view.sort_method
    }

    /// Re-sorts the existing groups without re-extracting.
    pub fn set_sort_method(&mut self, sort: SortMethod) {
        self.view.sort_method = sort;
        if let Some(model) = self.state.as_mut() {
            model.resort(sort);
        }
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.view.scale_mode
    }

    /// Only changes projection; the model is untouched.
    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.view.scale_mode = mode;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.layout.width = width;
        self.layout.height = height;
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn layout(&mut self) -> ThreadLayout {
        let (mode, cfg) = (self.view.scale_mode, self.layout);
        let model = self.model();
        layout_thread(&model.groups, &model.lines, &model.times, mode, &cfg)
    }

    pub fn highlight(&self) -> &Highlight {
        &self.highlight
    }

    /// Highlight the groups holding any of `emails`.
    pub fn highlight_emails<'a>(&mut self, emails: impl IntoIterator<Item = &'a str>) {
        let model = self.model();
        let ids: Vec<String> = emails
            .into_iter()
            .filter_map(|e| model.group_of(e).map(|g| g.id.clone()))
            .collect();
        self.highlight.select(ids);
    }

    pub fn hover(&mut self, group_id: Option<&str>) {
        if self.highlight.hover(group_id) {
            self.events.emit(&VisEvent::Hover {
                id: group_id.map(str::to_string),
            });
        }
    }

    /// Emit a click for message `idx`; returns its id.
    pub fn click(&mut self, idx: usize) -> Option<String> {
        let id = self.messages.get(idx)?.message_id.clone();
        self.events.emit(&VisEvent::Click { id: id.clone() });
        Some(id)
    }

    pub fn is_line_highlighted(&self, line: &Line) -> bool {
        self.highlight.is_highlighted(&line.group_id)
    }

    pub fn events(&mut self) -> &mut Dispatcher<VisEvent> {
        &mut self.events
    }
}
