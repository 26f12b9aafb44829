pub mod config;
pub mod error;
pub mod labels;
pub mod mail;
pub mod vis;

pub use error::{Error, Result};
