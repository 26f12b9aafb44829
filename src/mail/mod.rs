pub mod cache;
pub mod dataset;
pub mod maildir;
pub mod threading;
pub mod types;

pub use dataset::{find_thread, load_threads, parse_threads, prepare_threads, save_threads};
pub use maildir::{import_maildir, scan_maildir};
pub use threading::build_threads;
pub use types::{
    Message, Recipient, RecipientType, Thread, local_part, sort_messages, sort_threads,
};
