use std::collections::BTreeSet;
use std::fmt;

/// Interaction emitted by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisEvent {
    /// A message (single-thread view) or thread (overview) was clicked.
    Click { id: String },
    /// A row was entered, or left when `id` is None.
    Hover { id: Option<String> },
    /// Thread ids inside a brush rectangle; empty when the brush is cleared.
    Brush { ids: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Observer list. Listeners run in subscription order.
pub struct Dispatcher<E> {
    next_id: usize,
    listeners: Vec<(ListenerId, Listener<E>)>,
}

impl<E> Default for Dispatcher<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> Dispatcher<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the listener was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Which rows are emphasised: the hovered one plus any externally
/// selected ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlight {
    hovered: Option<String>,
    selected: BTreeSet<String>,
}

impl Highlight {
    /// Returns true if the hovered id changed.
    pub fn hover(&mut self, id: Option<&str>) -> bool {
        if self.hovered.as_deref() == id {
            return false;
        }
        self.hovered = id.map(str::to_string);
        true
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn select<S: Into<String>>(&mut self, ids: impl IntoIterator<Item = S>) {
        self.selected = ids.into_iter().map(Into::into).collect();
    }

    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    pub fn is_highlighted(&self, id: &str) -> bool {
        self.hovered.as_deref() == Some(id) || self.selected.contains(id)
    }

    pub fn is_active(&self) -> bool {
        self.hovered.is_some() || !self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.hovered = None;
        self.selected.clear();
    }
}
