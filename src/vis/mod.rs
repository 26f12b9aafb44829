//! Participant timelines: extraction, grouping, ordering, connectors and
//! layout, plus the thread-level views built on them.

pub mod events;
pub mod features;
pub mod grouping;
pub mod layout;
pub mod lines;
pub mod overview;
pub mod persons;
pub mod projection;
pub mod scale;
pub mod sorting;
pub mod view;

pub use events::{Dispatcher, Highlight, VisEvent};
pub use grouping::{Group, group_persons};
pub use layout::{ScaleMode, ThreadLayout, layout_thread};
pub use lines::{Line, build_lines};
pub use overview::ThreadOverview;
pub use persons::{Instance, MessageInstance, Person, ThreadInstance, extract_persons, extract_thread_persons};
pub use sorting::{SortMethod, sort_groups};
pub use view::ThreadView;
