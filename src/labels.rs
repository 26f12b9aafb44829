//! Thread class labels, the classification service contract and the
//! model evaluation sheet.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::LabellingConfig;
use crate::error::{Error, Result};

/// Class id reserved for "none of the classes fit".
pub const NONE_APPROPRIATE_ID: u32 = 999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabel {
    pub id: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelledThread {
    pub thread_id: String,
    pub class_id: u32,
}

/// Payload sent to the classification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRequest {
    pub threads: Vec<LabelledThread>,
    pub recommend: bool,
}

impl LabelRequest {
    /// `{endpoint}?params={urlencoded JSON}`
    pub fn to_url(&self, endpoint: &str) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{endpoint}?params={}", urlencoding::encode(&json)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelResponse {
    /// Predicted class per thread.
    #[serde(default)]
    pub class_lookup: BTreeMap<String, u32>,
    /// Threads the model would like labelled next.
    #[serde(default)]
    pub samples: Vec<String>,
}

impl LabelResponse {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// User-defined classes, manual assignments and the service's predictions.
#[derive(Debug, Clone)]
pub struct LabelSet {
    classes: Vec<ClassLabel>,
    next_id: u32,
    assignments: BTreeMap<String, u32>,
    predictions: BTreeMap<String, u32>,
    samples: Vec<String>,
    recommend: bool,
    endpoint: String,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::from_config(&LabellingConfig::default())
    }
}

impl LabelSet {
    pub fn new(recommend: bool) -> Self {
        Self {
            recommend,
            ..Self::default()
        }
    }

    /// Default classes, talking to the configured service.
    pub fn from_config(config: &LabellingConfig) -> Self {
        Self {
            classes: vec![
                ClassLabel { id: 0, label: "Class 1".to_string() },
                ClassLabel { id: 1, label: "Class 2".to_string() },
            ],
            next_id: 2,
            assignments: BTreeMap::new(),
            predictions: BTreeMap::new(),
            samples: Vec::new(),
            recommend: config.recommend_samples,
            endpoint: config.endpoint.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    pub fn class(&self, id: u32) -> Option<&ClassLabel> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn add_class(&mut self, label: impl Into<String>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.classes.push(ClassLabel { id, label: label.into() });
        id
    }

    pub fn rename_class(&mut self, id: u32, label: impl Into<String>) -> bool {
        match self.classes.iter_mut().find(|c| c.id == id) {
            Some(class) => {
                class.label = label.into();
                true
            }
            None => false,
        }
    }

    /// Remove a class along with every assignment to it. Ids are not reused.
    pub fn delete_class(&mut self, id: u32) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c.id != id);
        if self.classes.len() == before {
            return false;
        }
        self.assignments.retain(|_, c| *c != id);
        self.predictions.retain(|_, c| *c != id);
        true
    }

    /// Returns false for an unknown class.
    pub fn assign(&mut self, thread_id: impl Into<String>, class_id: u32) -> bool {
        if self.class(class_id).is_none() {
            return false;
        }
        self.assignments.insert(thread_id.into(), class_id);
        true
    }

    pub fn unassign(&mut self, thread_id: &str) -> Option<u32> {
        self.assignments.remove(thread_id)
    }

    pub fn assignments(&self) -> &BTreeMap<String, u32> {
        &self.assignments
    }

    pub fn set_recommend(&mut self, on: bool) {
        self.recommend = on;
    }

    pub fn request(&self) -> LabelRequest {
        LabelRequest {
            threads: self
                .assignments
                .iter()
                .map(|(thread_id, &class_id)| LabelledThread {
                    thread_id: thread_id.clone(),
                    class_id,
                })
                .collect(),
            recommend: self.recommend,
        }
    }

    /// Classification request for the current assignments.
    pub fn request_url(&self) -> Result<String> {
        self.request().to_url(&self.endpoint)
    }

    /// Merge predictions; later responses overwrite earlier ones.
    pub fn apply_response(&mut self, response: LabelResponse) {
        tracing::debug!(
            predictions = response.class_lookup.len(),
            samples = response.samples.len(),
            "labelling response applied"
        );
        self.predictions.extend(response.class_lookup);
        self.samples = response.samples;
    }

    /// Manual label if any, otherwise the latest prediction.
    pub fn class_of(&self, thread_id: &str) -> Option<u32> {
        self.assignments
            .get(thread_id)
            .or_else(|| self.predictions.get(thread_id))
            .copied()
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }
}

/// Per-thread verdicts on the model's predictions.
#[derive(Debug, Clone)]
pub struct Evaluation {
    classes: Vec<ClassLabel>,
    thread_ids: Vec<String>,
    result: BTreeMap<String, u32>,
}

impl Evaluation {
    pub fn new(classes: &[ClassLabel], thread_ids: Vec<String>) -> Self {
        let mut classes = classes.to_vec();
        classes.push(ClassLabel {
            id: NONE_APPROPRIATE_ID,
            label: "None is appropriate".to_string(),
        });
        Self {
            classes,
            thread_ids,
            result: BTreeMap::new(),
        }
    }

    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    pub fn thread_ids(&self) -> &[String] {
        &self.thread_ids
    }

    /// Returns false for an unknown thread or class.
    pub fn record(&mut self, thread_id: &str, class_id: u32) -> bool {
        let known_thread = self.thread_ids.iter().any(|t| t == thread_id);
        let known_class = self.classes.iter().any(|c| c.id == class_id);
        if !(known_thread && known_class) {
            return false;
        }
        self.result.insert(thread_id.to_string(), class_id);
        true
    }

    pub fn verdict(&self, thread_id: &str) -> Option<u32> {
        self.result.get(thread_id).copied()
    }

    pub fn completed(&self) -> usize {
        self.result.len()
    }

    pub fn progress(&self) -> String {
        format!("{} / {} completed", self.completed(), self.thread_ids.len())
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        let done: BTreeSet<&str> = self.result.keys().map(String::as_str).collect();
        self.thread_ids
            .iter()
            .map(String::as_str)
            .filter(move |t| !done.contains(t))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.result)?)
    }

    /// Write `evaluation-result-{millis}.json` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let name = format!("evaluation-result-{}.json", chrono::Utc::now().timestamp_millis());
        let path = dir.join(name);
        std::fs::write(&path, self.to_json()?).map_err(|e| Error::io(&path, e))?;
        Ok(path)
    }
}
