use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use mail_parser::{Address, HeaderValue, MessageParser};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::cache::{get_files_to_parse, load_cache, save_cache};
use super::dataset::prepare_threads;
use super::threading::build_threads;
use super::types::Thread;
use crate::error::Result;

/// Header fields of one maildir file, enough to thread it and turn it
/// into a [`Message`](super::types::Message).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMail {
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub subject: Option<String>,
    pub from: Option<String>,
    /// (email, header name) pairs from To, Cc and Bcc, in header order.
    pub recipients: Vec<(String, String)>,
    /// Seconds since epoch, 0 when the Date header is missing.
    pub timestamp: i64,
    pub file_path: String,
}

/// Every regular file under a `cur/` or `new/` directory of `maildir`.
pub fn collect_mail_files(maildir: &Path) -> Vec<PathBuf> {
    WalkDir::new(maildir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == "cur" || n == "new")
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Parse every mail under `maildir`, reusing the parse cache at
/// `cache_path` when given. Unparseable files are skipped.
pub fn scan_maildir<F>(maildir: &Path, cache_path: Option<&Path>, progress: F) -> Result<Vec<RawMail>>
where
    F: Fn(usize, usize) + Sync, // (current, total)
{
    let file_paths = collect_mail_files(maildir);
    let total = file_paths.len();

    let cache = cache_path.map(load_cache).unwrap_or_default();
    let (to_parse, mut mails) = get_files_to_parse(&file_paths, &cache);
    let cache_hits = mails.len();
    let to_parse_count = to_parse.len();
    tracing::debug!(
        "maildir scan: {total} files, {cache_hits} cached, {to_parse_count} to parse"
    );

    progress(cache_hits, total);

    if !to_parse.is_empty() {
        let processed = AtomicUsize::new(0);

        let parsed: Vec<RawMail> = to_parse
            .into_par_iter()
            .filter_map(|path| {
                let result = parse_mail_file(&path);
                if result.is_none() {
                    tracing::warn!("skipping unparseable mail {}", path.display());
                }

                let current = processed.fetch_add(1, Ordering::Relaxed);
                if current % 100 == 0 || current + 1 == to_parse_count {
                    progress(cache_hits + current, total);
                }

                result
            })
            .collect();

        mails.extend(parsed);
    }

    progress(total, total);

    if let Some(path) = cache_path {
        if let Err(e) = save_cache(path, &mails) {
            tracing::warn!("failed to save maildir cache: {e}");
        }
    }

    Ok(mails)
}

/// Scan, thread and prepare a maildir as a thread dataset.
pub fn import_maildir<F>(maildir: &Path, cache_path: Option<&Path>, progress: F) -> Result<Vec<Thread>>
where
    F: Fn(usize, usize) + Sync,
{
    let mails = scan_maildir(maildir, cache_path, progress)?;
    prepare_threads(build_threads(mails))
}

/// Parse the headers of a single mail file.
pub fn parse_mail_file(path: &Path) -> Option<RawMail> {
    let raw = std::fs::read(path).ok()?;
    let message = MessageParser::default().parse(&raw)?;

    let from = message
        .from()
        .and_then(|a| a.first())
        .and_then(|a| a.address())
        .map(normalize_address);

    let mut recipients = Vec::new();
    for (header, list) in [("TO", message.to()), ("CC", message.cc()), ("BCC", message.bcc())] {
        let Some(list) = list else { continue };
        for email in addresses(list) {
            if !email.trim().is_empty() {
                recipients.push((normalize_address(email), header.to_string()));
            }
        }
    }

    Some(RawMail {
        message_id: message.message_id().map(str::to_string),
        in_reply_to: header_ids(message.in_reply_to()).into_iter().next_back(),
        references: header_ids(message.references()),
        subject: message.subject().map(str::to_string),
        from,
        recipients,
        timestamp: message.date().map(|d| d.to_timestamp()).unwrap_or(0),
        file_path: path.to_string_lossy().to_string(),
    })
}

fn addresses<'a>(address: &'a Address<'_>) -> Vec<&'a str> {
    match address {
        Address::List(list) => list.iter().filter_map(|a| a.address()).collect(),
        Address::Group(groups) => groups
            .iter()
            .flat_map(|g| g.addresses.iter())
            .filter_map(|a| a.address())
            .collect(),
    }
}

fn header_ids(value: &HeaderValue) -> Vec<String> {
    match value {
        HeaderValue::Text(id) => vec![id.to_string()],
        HeaderValue::TextList(ids) => ids.iter().map(|id| id.to_string()).collect(),
        _ => Vec::new(),
    }
}

fn normalize_address(s: &str) -> String {
    s.trim().to_lowercase()
}
