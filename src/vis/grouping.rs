use std::collections::HashMap;

use serde::Serialize;

use super::persons::{Instance, Person};

/// A person, or several persons whose instance patterns are identical.
#[derive(Debug, Clone, Serialize)]
pub struct Group<I> {
    /// Id of the first member in extraction order.
    pub id: String,
    pub label: String,
    /// Member addresses, one per line.
    pub title: String,
    pub emails: Vec<String>,
    pub is_sender: bool,
    pub instances: Vec<I>,
}

impl<I: Instance> Group<I> {
    pub fn is_group(&self) -> bool {
        self.emails.len() > 1
    }

    pub fn sent_count(&self) -> usize {
        self.instances.iter().filter(|i| i.is_sender()).count()
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.iter().any(|e| e == email)
    }

    fn from_members(members: &[&Person<I>]) -> Self {
        let first = members[0];
        if members.len() == 1 {
            return Self {
                id: first.id.clone(),
                label: first.label.clone(),
                title: first.title.clone(),
                emails: vec![first.id.clone()],
                is_sender: first.is_sender,
                instances: first.instances.clone(),
            };
        }
        let emails: Vec<String> = members.iter().map(|p| p.id.clone()).collect();
        Self {
            id: first.id.clone(),
            label: format!("Group ({})", members.len()),
            title: emails.join("\n"),
            emails,
            is_sender: first.is_sender,
            instances: first.instances.clone(),
        }
    }
}

/// Merge persons whose instance sequences are equal element by element.
///
/// Groups are emitted in the order of their first member, and members
/// keep extraction order. Sequences of different lengths never match.
pub fn group_persons<I: Instance>(persons: &[Person<I>]) -> Vec<Group<I>> {
    let mut by_len: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, p) in persons.iter().enumerate() {
        by_len.entry(p.instances.len()).or_default().push(i);
    }

    let mut visited = vec![false; persons.len()];
    let mut groups = Vec::new();

    for (i, person) in persons.iter().enumerate() {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let mut members = vec![person];

        for &j in &by_len[&person.instances.len()] {
            if j <= i || visited[j] {
                continue;
            }
            if persons[j].instances == person.instances {
                visited[j] = true;
                members.push(&persons[j]);
            }
        }

        groups.push(Group::from_members(&members));
    }

    groups
}
