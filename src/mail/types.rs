use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Recipient header a participant was listed under.
///
/// Datasets spell these inconsistently ("To", "TO", "bcc"), so parsing is
/// case-insensitive and anything unrecognised is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecipientType {
    To,
    Cc,
    Bcc,
    Other(String),
}

impl RecipientType {
    pub fn is_bcc(&self) -> bool {
        matches!(self, RecipientType::Bcc)
    }
}

impl From<String> for RecipientType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "to" => RecipientType::To,
            "cc" => RecipientType::Cc,
            "bcc" => RecipientType::Bcc,
            _ => RecipientType::Other(s),
        }
    }
}

impl From<&str> for RecipientType {
    fn from(s: &str) -> Self {
        RecipientType::from(s.to_string())
    }
}

impl From<RecipientType> for String {
    fn from(t: RecipientType) -> Self {
        match t {
            RecipientType::To => "TO".to_string(),
            RecipientType::Cc => "CC".to_string(),
            RecipientType::Bcc => "BCC".to_string(),
            RecipientType::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RecipientType>,
}

impl Recipient {
    pub fn new(email: impl Into<String>, kind: RecipientType) -> Self {
        Self {
            email: email.into(),
            kind: Some(kind),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(deserialize_with = "string_or_number")]
    pub message_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub sender: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Message {
    /// Reject messages the participant pipeline cannot interpret.
    pub fn validate(&self) -> Result<()> {
        if self.sender.trim().is_empty() {
            return Err(Error::MissingSender {
                message_id: self.message_id.clone(),
            });
        }
        if self.recipients.iter().any(|r| r.email.trim().is_empty()) {
            return Err(Error::MissingRecipientEmail {
                message_id: self.message_id.clone(),
            });
        }
        Ok(())
    }

    pub fn subject_display(&self) -> &str {
        self.subject
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("(no subject)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    #[serde(rename = "threadId", deserialize_with = "string_or_number")]
    pub thread_id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Precomputed per-thread scalars (`Engagement`, `mdsX`, ...).
    #[serde(flatten)]
    pub features: BTreeMap<String, serde_json::Value>,
}

impl Thread {
    pub fn new(thread_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages,
            features: BTreeMap::new(),
        }
    }

    /// Time of the earliest message. Messages are expected to be sorted.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.messages.first().map(|m| m.time)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|m| m.time)
    }

    pub fn subject(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.subject_display())
            .unwrap_or("(empty thread)")
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).and_then(serde_json::Value::as_f64)
    }

    /// Store a computed feature. Non-finite values are stored as null.
    pub fn set_feature(&mut self, name: &str, value: Option<f64>) {
        let value = value
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);
        self.features.insert(name.to_string(), value);
    }

    pub fn validate(&self) -> Result<()> {
        for m in &self.messages {
            if m.message_id.is_empty() {
                return Err(Error::MissingMessageId {
                    thread_id: self.thread_id.clone(),
                });
            }
            m.validate()?;
        }
        Ok(())
    }
}

/// Order messages by time, then by id so equal timestamps stay stable.
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        a.time
            .cmp(&b.time)
            .then_with(|| a.message_id.cmp(&b.message_id))
    });
}

/// Order threads by start time, then by id. Threads without messages go
/// last.
pub fn sort_threads(threads: &mut [Thread]) {
    threads.sort_by(|a, b| {
        let (sa, sb) = (a.start_time(), b.start_time());
        sa.is_none()
            .cmp(&sb.is_none())
            .then_with(|| sa.cmp(&sb))
            .then_with(|| a.thread_id.cmp(&b.thread_id))
    });
}

/// Local part of an address, used as a compact label.
pub fn local_part(email: &str) -> &str {
    email.split_once('@').map(|(local, _)| local).unwrap_or(email)
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(f) => f.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_type_is_case_insensitive() {
        assert_eq!(RecipientType::from("BCC"), RecipientType::Bcc);
        assert_eq!(RecipientType::from("bcc"), RecipientType::Bcc);
        assert_eq!(RecipientType::from("Cc"), RecipientType::Cc);
        assert_eq!(
            RecipientType::from("Resent-To"),
            RecipientType::Other("Resent-To".to_string())
        );
    }

    #[test]
    fn parses_thread_with_numeric_ids_and_features() {
        let json = r#"{
            "threadId": 42,
            "Engagement": 0.5,
            "mdsX": -1.25,
            "messages": [{
                "messageId": 7,
                "subject": "hello",
                "sender": "a@x.com",
                "time": "2001-05-14T16:39:00.000Z",
                "recipients": [{"email": "b@x.com", "type": "TO"}]
            }]
        }"#;
        let thread: Thread = serde_json::from_str(json).unwrap();
        assert_eq!(thread.thread_id, "42");
        assert_eq!(thread.messages[0].message_id, "7");
        assert_eq!(thread.feature("Engagement"), Some(0.5));
        assert_eq!(thread.feature("mdsX"), Some(-1.25));
        assert_eq!(thread.feature("missing"), None);
        assert_eq!(
            thread.messages[0].recipients[0].kind,
            Some(RecipientType::To)
        );
    }

    #[test]
    fn validate_rejects_missing_sender_and_recipient_email() {
        let mut m: Message = serde_json::from_str(
            r#"{"messageId": "m1", "sender": "", "time": "2001-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(m.validate(), Err(Error::MissingSender { .. })));

        m.sender = "a@x.com".to_string();
        m.recipients.push(Recipient {
            email: String::new(),
            kind: None,
        });
        assert!(matches!(
            m.validate(),
            Err(Error::MissingRecipientEmail { .. })
        ));
    }

    #[test]
    fn empty_threads_sort_last() {
        let at = |minute: u32| {
            serde_json::from_value::<Message>(serde_json::json!({
                "messageId": format!("m{minute}"),
                "sender": "a@x.com",
                "time": format!("2001-05-14T16:{minute:02}:00Z"),
            }))
            .unwrap()
        };
        let mut threads = vec![
            Thread::new("late", vec![at(30)]),
            Thread::new("empty", Vec::new()),
            Thread::new("early", vec![at(5)]),
        ];
        crate::mail::sort_threads(&mut threads);
        let ids: Vec<_> = threads.iter().map(|t| t.thread_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late", "empty"]);
    }

    #[test]
    fn local_part_without_at_sign_is_whole_address() {
        assert_eq!(local_part("alice@example.com"), "alice");
        assert_eq!(local_part("postmaster"), "postmaster");
    }
}
