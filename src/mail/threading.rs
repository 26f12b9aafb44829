use rayon::prelude::*;
use std::collections::HashMap;

use super::maildir::RawMail;
use super::types::{Message, Recipient, RecipientType, Thread};

/// Group parsed mails into threads by their reply headers.
///
/// A mail's parent is its In-Reply-To target, falling back to the last
/// resolvable entry of References. Every mail is assigned to the root of
/// its parent chain; each root becomes one thread, identified by the
/// root's Message-ID. Mails without a sender are dropped. The returned
/// threads are not sorted; run them through
/// [`prepare_threads`](super::dataset::prepare_threads).
pub fn build_threads(mails: Vec<RawMail>) -> Vec<Thread> {
    if mails.is_empty() {
        return Vec::new();
    }

    let len = mails.len();

    // 1. message_id -> index
    let id_to_idx: HashMap<&str, usize> = mails
        .par_iter()
        .enumerate()
        .filter_map(|(i, m)| m.message_id.as_deref().map(|mid| (mid, i)))
        .collect();

    // 2. Parent links, never pointing at self
    let parent: Vec<Option<usize>> = mails
        .par_iter()
        .enumerate()
        .map(|(i, m)| {
            let candidates = m
                .in_reply_to
                .iter()
                .chain(m.references.iter().rev());
            for id in candidates {
                if let Some(&p) = id_to_idx.get(id.as_str()) {
                    if p != i {
                        return Some(p);
                    }
                }
            }
            None
        })
        .collect();

    // 3. Resolve roots with cycle protection and path compression
    let mut thread_root: Vec<usize> = (0..len).collect();
    for i in 0..len {
        if parent[i].is_none() {
            continue;
        }
        let mut current = i;
        let mut steps = 0;
        while let Some(p) = parent[current] {
            current = p;
            steps += 1;
            if steps > len {
                break; // cycle
            }
        }
        let root = current;

        current = i;
        steps = 0;
        while let Some(p) = parent[current] {
            thread_root[current] = root;
            current = p;
            steps += 1;
            if steps > len {
                break;
            }
        }
        thread_root[i] = root;
    }

    // 4. Members per root
    let threads: HashMap<usize, Vec<usize>> = thread_root
        .par_iter()
        .enumerate()
        .fold(
            HashMap::new,
            |mut map: HashMap<usize, Vec<usize>>, (i, &root)| {
                map.entry(root).or_default().push(i);
                map
            },
        )
        .reduce(HashMap::new, |mut a, b| {
            for (k, mut v) in b {
                a.entry(k).or_default().append(&mut v);
            }
            a
        });

    // 5. Convert each group into a Thread
    let mails_ref = &mails;
    threads
        .into_par_iter()
        .filter_map(|(root, members)| {
            let messages: Vec<Message> = members
                .iter()
                .filter_map(|&i| to_message(&mails_ref[i]))
                .collect();
            if messages.is_empty() {
                return None;
            }
            Some(Thread::new(mail_id(&mails_ref[root]), messages))
        })
        .collect()
}

fn to_message(mail: &RawMail) -> Option<Message> {
    let sender = mail.from.clone().filter(|f| !f.is_empty())?;
    let recipients = mail
        .recipients
        .iter()
        .map(|(email, kind)| Recipient::new(email.clone(), RecipientType::from(kind.as_str())))
        .collect();

    Some(Message {
        message_id: mail_id(mail),
        subject: mail.subject.clone(),
        sender,
        time: chrono::DateTime::from_timestamp(mail.timestamp, 0).unwrap_or_default(),
        recipients,
        body: None,
    })
}

/// Message-ID, or the file name for mails that lack one.
fn mail_id(mail: &RawMail) -> String {
    mail.message_id.clone().unwrap_or_else(|| {
        std::path::Path::new(&mail.file_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| mail.file_path.clone())
    })
}
