use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::mail::{Message, RecipientType, Thread, local_part};

/// One participant's occurrence in one message (or one thread).
pub trait Instance: Clone + PartialEq {
    /// Position of the message or thread this instance belongs to.
    fn index(&self) -> usize;
    fn is_sender(&self) -> bool;
    fn is_bcc(&self) -> bool {
        false
    }
}

/// A participant's role in a single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageInstance {
    pub message_idx: usize,
    pub is_sender: bool,
    pub kind: Option<RecipientType>,
}

impl Instance for MessageInstance {
    fn index(&self) -> usize {
        self.message_idx
    }

    fn is_sender(&self) -> bool {
        self.is_sender
    }

    fn is_bcc(&self) -> bool {
        self.kind.as_ref().is_some_and(RecipientType::is_bcc)
    }
}

/// How often a participant sent and received within one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadInstance {
    pub thread_idx: usize,
    pub senders: u32,
    pub receivers: u32,
}

impl Instance for ThreadInstance {
    fn index(&self) -> usize {
        self.thread_idx
    }

    fn is_sender(&self) -> bool {
        self.senders > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Person<I> {
    /// The email address.
    pub id: String,
    pub label: String,
    pub title: String,
    /// True if the person sent at least one message in the set.
    pub is_sender: bool,
    pub instances: Vec<I>,
}

impl<I> Person<I> {
    fn new(email: &str) -> Self {
        Self {
            id: email.to_string(),
            label: local_part(email).to_string(),
            title: email.to_string(),
            is_sender: false,
            instances: Vec::new(),
        }
    }
}

/// Participants in extraction order, with lookup by email.
#[derive(Debug, Clone, Serialize)]
pub struct Persons<I> {
    list: Vec<Person<I>>,
    #[serde(skip)]
    lookup: HashMap<String, usize>,
}

impl<I> Default for Persons<I> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            lookup: HashMap::new(),
        }
    }
}

impl<I> Persons<I> {
    /// Index of `email`, registering a new person if unseen.
    fn register(&mut self, email: &str) -> usize {
        if let Some(&idx) = self.lookup.get(email) {
            return idx;
        }
        self.list.push(Person::new(email));
        let idx = self.list.len() - 1;
        self.lookup.insert(email.to_string(), idx);
        idx
    }

    pub fn get(&self, email: &str) -> Option<&Person<I>> {
        self.lookup.get(email).map(|&i| &self.list[i])
    }

    pub fn as_slice(&self) -> &[Person<I>] {
        &self.list
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Person<I>> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Build participants from time-ordered messages.
///
/// Senders come first in order of first send, then recipient-only
/// participants in order of first appearance. Each person gets one
/// instance per message they appear in, in message order. When an
/// address is listed more than once in a message the first listing wins,
/// except that a later Bcc listing upgrades the type. A sender's own
/// instance is never changed by a recipient listing.
pub fn extract_persons(messages: &[Message]) -> Persons<MessageInstance> {
    let mut persons = Persons::default();

    for m in messages {
        let idx = persons.register(&m.sender);
        persons.list[idx].is_sender = true;
    }
    for m in messages {
        for r in &m.recipients {
            persons.register(&r.email);
        }
    }

    for (message_idx, m) in messages.iter().enumerate() {
        // email -> (person index, position in that person's instances)
        let mut seen: HashMap<&str, (usize, usize)> = HashMap::new();

        let sender_idx = persons.lookup[m.sender.as_str()];
        let sender = &mut persons.list[sender_idx];
        sender.instances.push(MessageInstance {
            message_idx,
            is_sender: true,
            kind: None,
        });
        seen.insert(&m.sender, (sender_idx, sender.instances.len() - 1));

        for r in &m.recipients {
            match seen.get(r.email.as_str()) {
                None => {
                    let idx = persons.lookup[r.email.as_str()];
                    let person = &mut persons.list[idx];
                    person.instances.push(MessageInstance {
                        message_idx,
                        is_sender: false,
                        kind: r.kind.clone(),
                    });
                    seen.insert(&r.email, (idx, person.instances.len() - 1));
                }
                Some(&(idx, pos)) => {
                    let instance = &mut persons.list[idx].instances[pos];
                    if !instance.is_sender && r.kind.as_ref().is_some_and(RecipientType::is_bcc) {
                        instance.kind = Some(RecipientType::Bcc);
                    }
                }
            }
        }
    }

    persons
}

/// Build participants from time-ordered threads, one aggregate instance
/// per thread a person took part in.
///
/// Every message adds one send to its sender and one receive to each
/// distinct recipient other than the sender.
pub fn extract_thread_persons(threads: &[Thread]) -> Persons<ThreadInstance> {
    let mut persons: Persons<ThreadInstance> = Persons::default();

    fn instance_for(person: &mut Person<ThreadInstance>, thread_idx: usize) -> &mut ThreadInstance {
        if person.instances.last().is_none_or(|i| i.thread_idx != thread_idx) {
            person.instances.push(ThreadInstance {
                thread_idx,
                senders: 0,
                receivers: 0,
            });
        }
        let last = person.instances.len() - 1;
        &mut person.instances[last]
    }

    for (thread_idx, thread) in threads.iter().enumerate() {
        for m in &thread.messages {
            let idx = persons.register(&m.sender);
            let sender = &mut persons.list[idx];
            sender.is_sender = true;
            instance_for(sender, thread_idx).senders += 1;

            let mut seen = HashSet::new();
            for r in &m.recipients {
                if r.email == m.sender || !seen.insert(r.email.as_str()) {
                    continue;
                }
                let idx = persons.register(&r.email);
                instance_for(&mut persons.list[idx], thread_idx).receivers += 1;
            }
        }
    }

    persons
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mail::Recipient;
    use chrono::{DateTime, TimeZone, Utc};

    pub(crate) fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2001, 5, 14, 9, minute, 0).unwrap()
    }

    pub(crate) fn message(id: &str, minute: u32, sender: &str, recipients: &[(&str, &str)]) -> Message {
        Message {
            message_id: id.to_string(),
            subject: Some(format!("subject {id}")),
            sender: sender.to_string(),
            time: at(minute),
            recipients: recipients
                .iter()
                .map(|(email, kind)| Recipient::new(*email, RecipientType::from(*kind)))
                .collect(),
            body: None,
        }
    }

    fn indices(p: &Person<MessageInstance>) -> Vec<usize> {
        p.instances.iter().map(|i| i.message_idx).collect()
    }

    #[test]
    fn senders_come_before_recipients() {
        let messages = vec![
            message("1", 0, "a@x.com", &[("b@x.com", "To"), ("c@x.com", "Cc")]),
            message("2", 1, "c@x.com", &[("a@x.com", "To")]),
        ];
        let persons = extract_persons(&messages);
        let ids: Vec<_> = persons.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a@x.com", "c@x.com", "b@x.com"]);

        let a = persons.get("a@x.com").unwrap();
        assert!(a.is_sender);
        assert_eq!(a.label, "a");
        assert_eq!(indices(a), vec![0, 1]);
        assert!(a.instances[0].is_sender);
        assert!(!a.instances[1].is_sender);

        let b = persons.get("b@x.com").unwrap();
        assert!(!b.is_sender);
        assert_eq!(b.instances[0].kind, Some(RecipientType::To));
    }

    #[test]
    fn duplicate_recipient_keeps_first_unless_bcc() {
        let messages = vec![message(
            "1",
            0,
            "a@x.com",
            &[("b@x.com", "To"), ("b@x.com", "Cc"), ("c@x.com", "Cc"), ("c@x.com", "BCC")],
        )];
        let persons = extract_persons(&messages);

        let b = persons.get("b@x.com").unwrap();
        assert_eq!(b.instances.len(), 1);
        assert_eq!(b.instances[0].kind, Some(RecipientType::To));

        let c = persons.get("c@x.com").unwrap();
        assert_eq!(c.instances.len(), 1);
        assert_eq!(c.instances[0].kind, Some(RecipientType::Bcc));
    }

    #[test]
    fn sender_listed_as_recipient_stays_a_sender_instance() {
        let messages = vec![message("1", 0, "a@x.com", &[("a@x.com", "BCC"), ("b@x.com", "To")])];
        let persons = extract_persons(&messages);
        let a = persons.get("a@x.com").unwrap();
        assert_eq!(a.instances.len(), 1);
        assert!(a.instances[0].is_sender);
        assert_eq!(a.instances[0].kind, None);
    }

    #[test]
    fn instances_follow_message_order() {
        let messages = vec![
            message("1", 0, "a@x.com", &[("b@x.com", "To")]),
            message("2", 1, "c@x.com", &[("d@x.com", "To")]),
            message("3", 2, "b@x.com", &[("a@x.com", "To")]),
        ];
        let persons = extract_persons(&messages);
        assert_eq!(indices(persons.get("a@x.com").unwrap()), vec![0, 2]);
        assert_eq!(indices(persons.get("b@x.com").unwrap()), vec![0, 2]);
        assert_eq!(indices(persons.get("d@x.com").unwrap()), vec![1]);
    }

    #[test]
    fn empty_messages_give_no_persons() {
        assert!(extract_persons(&[]).is_empty());
        assert!(extract_thread_persons(&[]).is_empty());
    }

    #[test]
    fn thread_instances_count_sends_and_unique_receives() {
        let threads = vec![
            Thread::new(
                "t1",
                vec![
                    message("1", 0, "a@x.com", &[("b@x.com", "To"), ("b@x.com", "Cc"), ("a@x.com", "Cc")]),
                    message("2", 1, "b@x.com", &[("a@x.com", "To")]),
                ],
            ),
            Thread::new("t2", vec![message("3", 2, "c@x.com", &[("b@x.com", "To")])]),
        ];
        let persons = extract_thread_persons(&threads);
        let ids: Vec<_> = persons.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a@x.com", "b@x.com", "c@x.com"]);

        let a = persons.get("a@x.com").unwrap();
        assert_eq!(
            a.instances,
            vec![ThreadInstance { thread_idx: 0, senders: 1, receivers: 1 }]
        );

        let b = persons.get("b@x.com").unwrap();
        assert_eq!(
            b.instances,
            vec![
                ThreadInstance { thread_idx: 0, senders: 1, receivers: 1 },
                ThreadInstance { thread_idx: 1, senders: 0, receivers: 1 },
            ]
        );
        assert!(b.is_sender);
    }
}
