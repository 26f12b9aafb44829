use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;

use super::maildir::RawMail;
use crate::error::{Error, Result};

const CACHE_VERSION: u32 = 1;

#[derive(serde::Serialize, serde::Deserialize)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, CachedMail>, // keyed by file path
}

/// Parsed headers plus the mtime of the file they came from.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CachedMail {
    pub mail: RawMail,
    pub mtime: u64,
}

/// Default location of the maildir parse cache.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("threadlet/maildir.bin"))
}

/// Load the parse cache. A missing, unreadable or outdated cache is empty.
pub fn load_cache(path: &Path) -> HashMap<String, CachedMail> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return HashMap::new(),
    };

    let cache: CacheFile = match bincode::deserialize_from(BufReader::new(file)) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("discarding unreadable cache {}: {e}", path.display());
            return HashMap::new();
        }
    };

    if cache.version != CACHE_VERSION {
        return HashMap::new();
    }

    cache.entries
}

pub fn save_cache(path: &Path, mails: &[RawMail]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let entries = mails
        .iter()
        .map(|mail| {
            let mtime = get_file_mtime(Path::new(&mail.file_path)).unwrap_or(0);
            (
                mail.file_path.clone(),
                CachedMail {
                    mail: mail.clone(),
                    mtime,
                },
            )
        })
        .collect();

    let cache = CacheFile {
        version: CACHE_VERSION,
        entries,
    };

    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    bincode::serialize_into(BufWriter::new(file), &cache)?;
    Ok(())
}

/// File modification time in seconds since epoch
pub fn get_file_mtime(path: &Path) -> Option<u64> {
    let mtime = fs::metadata(path).ok()?.modified().ok()?;
    let duration = mtime.duration_since(SystemTime::UNIX_EPOCH).ok()?;
    Some(duration.as_secs())
}

/// Split `file_paths` into files that must be parsed and mails that can be
/// served from the cache (same path, same mtime).
pub fn get_files_to_parse(
    file_paths: &[PathBuf],
    cache: &HashMap<String, CachedMail>,
) -> (Vec<PathBuf>, Vec<RawMail>) {
    let results: Vec<(Option<PathBuf>, Option<RawMail>)> = file_paths
        .par_iter()
        .map(|path| {
            let key = path.to_string_lossy();
            match cache.get(key.as_ref()) {
                Some(cached) if get_file_mtime(path) == Some(cached.mtime) => {
                    (None, Some(cached.mail.clone()))
                }
                _ => (Some(path.clone()), None),
            }
        })
        .collect();

    let mut to_parse = Vec::new();
    let mut from_cache = Vec::new();
    for (parse, cached) in results {
        if let Some(p) = parse {
            to_parse.push(p);
        }
        if let Some(m) = cached {
            from_cache.push(m);
        }
    }

    (to_parse, from_cache)
}
