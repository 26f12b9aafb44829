use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rayon::prelude::*;

use super::types::{Thread, sort_messages, sort_threads};
use crate::error::{Error, Result};

/// Load a thread dataset (a JSON array of threads) and prepare it for the
/// views: validated, messages sorted within each thread, threads sorted.
pub fn load_threads(path: &Path) -> Result<Vec<Thread>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let threads: Vec<Thread> = serde_json::from_reader(BufReader::new(file))?;
    let threads = prepare_threads(threads)?;
    tracing::debug!("loaded {} threads from {}", threads.len(), path.display());
    Ok(threads)
}

pub fn parse_threads(json: &str) -> Result<Vec<Thread>> {
    prepare_threads(serde_json::from_str(json)?)
}

/// Validate every message, then sort. Validation runs first so a bad
/// record fails the whole load instead of yielding a partial dataset.
pub fn prepare_threads(mut threads: Vec<Thread>) -> Result<Vec<Thread>> {
    for thread in &threads {
        thread.validate()?;
    }

    threads
        .par_iter_mut()
        .for_each(|t| sort_messages(&mut t.messages));
    sort_threads(&mut threads);

    Ok(threads)
}

pub fn save_threads(path: &Path, threads: &[Thread]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    serde_json::to_writer(BufWriter::new(file), threads)?;
    Ok(())
}

/// Find a thread by id.
pub fn find_thread<'a>(threads: &'a [Thread], thread_id: &str) -> Option<&'a Thread> {
    threads.iter().find(|t| t.thread_id == thread_id)
}
