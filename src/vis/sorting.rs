use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::grouping::Group;
use super::persons::Instance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMethod {
    /// Earliest participation first.
    #[default]
    Time,
    /// Most sends first.
    Engagement,
}

impl SortMethod {
    pub fn toggled(self) -> Self {
        match self {
            SortMethod::Time => SortMethod::Engagement,
            SortMethod::Engagement => SortMethod::Time,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SortMethod::Time => "time",
            SortMethod::Engagement => "engagement",
        }
    }
}

/// Sort groups in place. `times[i]` is the time of message (or thread) `i`.
pub fn sort_groups<I: Instance>(groups: &mut [Group<I>], method: SortMethod, times: &[DateTime<Utc>]) {
    match method {
        SortMethod::Time => groups.sort_by(|a, b| compare_by_time(a, b, times)),
        SortMethod::Engagement => groups.sort_by(compare_by_engagement),
    }
}

/// Position-wise chronological order. At equal times a sender instance
/// goes first, then a non-Bcc one. The id breaks full ties.
pub fn compare_by_time<I: Instance>(a: &Group<I>, b: &Group<I>, times: &[DateTime<Utc>]) -> Ordering {
    for (ia, ib) in a.instances.iter().zip(&b.instances) {
        let ord = times[ia.index()]
            .cmp(&times[ib.index()])
            .then_with(|| ib.is_sender().cmp(&ia.is_sender()))
            .then_with(|| ia.is_bcc().cmp(&ib.is_bcc()));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.instances
        .len()
        .cmp(&b.instances.len())
        .then_with(|| a.id.cmp(&b.id))
}

pub fn compare_by_engagement<I: Instance>(a: &Group<I>, b: &Group<I>) -> Ordering {
    b.sent_count()
        .cmp(&a.sent_count())
        .then_with(|| b.instances.len().cmp(&a.instances.len()))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::Message;
    use crate::vis::grouping::group_persons;
    use crate::vis::persons::extract_persons;
    use crate::vis::persons::tests::message;

    fn sorted(messages: &[Message], method: SortMethod) -> Vec<String> {
        let times: Vec<_> = messages.iter().map(|m| m.time).collect();
        let persons = extract_persons(messages);
        let mut groups = group_persons(persons.as_slice());
        sort_groups(&mut groups, method, &times);
        groups.into_iter().map(|g| g.id).collect()
    }

    #[test]
    fn engagement_orders_by_sends_then_total() {
        // a sends 3, b sends 1, c receives 3
        let messages = vec![
            message("1", 0, "a@x.com", &[("c@x.com", "To")]),
            message("2", 1, "a@x.com", &[("c@x.com", "To")]),
            message("3", 2, "b@x.com", &[("c@x.com", "To")]),
            message("4", 3, "a@x.com", &[("d@x.com", "To")]),
        ];
        let order = sorted(&messages, SortMethod::Engagement);
        assert_eq!(order, vec!["a@x.com", "b@x.com", "c@x.com", "d@x.com"]);
    }

    #[test]
    fn time_puts_sender_before_recipients_of_same_message() {
        let messages = vec![
            message("1", 0, "z@x.com", &[("a@x.com", "To")]),
            message("2", 5, "a@x.com", &[("z@x.com", "To")]),
        ];
        let order = sorted(&messages, SortMethod::Time);
        assert_eq!(order, vec!["z@x.com", "a@x.com"]);
    }

    #[test]
    fn time_puts_bcc_after_visible_recipients() {
        let messages = vec![message("1", 0, "s@x.com", &[("a@x.com", "BCC"), ("b@x.com", "Cc")])];
        let order = sorted(&messages, SortMethod::Time);
        assert_eq!(order, vec!["s@x.com", "b@x.com", "a@x.com"]);
    }

    #[test]
    fn time_prefers_earlier_then_shorter_then_id() {
        let messages = vec![
            message("1", 0, "s@x.com", &[("b@x.com", "To"), ("c@x.com", "Cc")]),
            message("2", 1, "s@x.com", &[("c@x.com", "Cc")]),
            message("3", 2, "d@x.com", &[("s@x.com", "To")]),
        ];
        let order = sorted(&messages, SortMethod::Time);
        // s and b share the first time; s is the sender. b is shorter than c.
        assert_eq!(order, vec!["s@x.com", "b@x.com", "c@x.com", "d@x.com"]);
    }

    #[test]
    fn sorting_is_deterministic_and_idempotent() {
        let messages = vec![
            message("1", 0, "a@x.com", &[("b@x.com", "To"), ("c@x.com", "To"), ("d@x.com", "BCC")]),
            message("2", 1, "b@x.com", &[("a@x.com", "To"), ("e@x.com", "Cc")]),
            message("3", 1, "e@x.com", &[("d@x.com", "To")]),
        ];
        let times: Vec<_> = messages.iter().map(|m| m.time).collect();
        for method in [SortMethod::Time, SortMethod::Engagement] {
            let persons = extract_persons(&messages);
            let mut forward = group_persons(persons.as_slice());
            let mut reversed = forward.clone();
            reversed.reverse();

            sort_groups(&mut forward, method, &times);
            sort_groups(&mut reversed, method, &times);
            let a: Vec<_> = forward.iter().map(|g| g.id.clone()).collect();
            let b: Vec<_> = reversed.iter().map(|g| g.id.clone()).collect();
            assert_eq!(a, b);

            sort_groups(&mut forward, method, &times);
            let again: Vec<_> = forward.iter().map(|g| g.id.clone()).collect();
            assert_eq!(a, again);
        }
    }

    #[test]
    fn comparator_is_antisymmetric() {
        let messages = vec![
            message("1", 0, "a@x.com", &[("b@x.com", "To"), ("c@x.com", "BCC")]),
            message("2", 0, "b@x.com", &[("a@x.com", "To")]),
        ];
        let times: Vec<_> = messages.iter().map(|m| m.time).collect();
        let persons = extract_persons(&messages);
        let groups = group_persons(persons.as_slice());
        for x in &groups {
            for y in &groups {
                assert_eq!(compare_by_time(x, y, &times), compare_by_time(y, x, &times).reverse());
                assert_eq!(compare_by_engagement(x, y), compare_by_engagement(y, x).reverse());
            }
        }
    }

    #[test]
    fn sort_method_parses_lowercase() {
        let m: SortMethod = serde_json::from_str("\"engagement\"").unwrap();
        assert_eq!(m, SortMethod::Engagement);
        assert_eq!(SortMethod::Time.toggled(), SortMethod::Engagement);
    }
}
