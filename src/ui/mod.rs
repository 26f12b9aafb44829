mod help;
mod pane;
mod threads;
mod timeline;

pub use help::*;
pub use pane::Pane;
pub use threads::*;
pub use timeline::*;
