use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::grouping::Group;
use super::lines::Line;
use super::persons::Instance;
use super::scale::{LinearScale, TimeScale};
use crate::config::LayoutConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Messages placed by timestamp.
    #[default]
    Absolute,
    /// Messages evenly spaced by sequence index.
    Relative,
}

impl ScaleMode {
    pub fn toggled(self) -> Self {
        match self {
            ScaleMode::Absolute => ScaleMode::Relative,
            ScaleMode::Relative => ScaleMode::Absolute,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleMode::Absolute => "absolute",
            ScaleMode::Relative => "relative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedInstance {
    pub index: usize,
    /// Relative to the group's slot.
    pub x: f64,
    pub y: f64,
    pub is_sender: bool,
    pub is_bcc: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedGroup {
    pub id: String,
    pub label: String,
    pub title: String,
    pub is_group: bool,
    pub is_sender: bool,
    pub x: f64,
    pub y: f64,
    pub instances: Vec<PlacedInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedLine {
    pub id: String,
    pub group_id: String,
    pub x1: f64,
    pub x2: f64,
    pub y: f64,
    pub is_exclusion: bool,
    pub is_group: bool,
}

/// Coordinates of one thread's timeline, inside the margins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadLayout {
    pub width: f64,
    pub height: f64,
    pub scale_mode: ScaleMode,
    /// x of every message, by message index.
    pub message_x: Vec<f64>,
    pub groups: Vec<PlacedGroup>,
    pub lines: Vec<PlacedLine>,
}

impl ThreadLayout {
    pub fn group(&self, id: &str) -> Option<&PlacedGroup> {
        self.groups.iter().find(|g| g.id == id)
    }
}

/// Vertical slot of display position `i`.
pub fn slot_y(i: usize, cfg: &LayoutConfig) -> f64 {
    cfg.person_height * i as f64
}

/// Vertical offset of instance glyphs inside a slot.
pub fn instance_offset(cfg: &LayoutConfig) -> f64 {
    (cfg.person_height - cfg.radius) / 2.0 + 1.0
}

/// Horizontal position of every message under the given scale.
pub fn message_positions(times: &[DateTime<Utc>], mode: ScaleMode, cfg: &LayoutConfig) -> Vec<f64> {
    let range = (cfg.label_width, cfg.inner_width());
    match mode {
        ScaleMode::Absolute => match TimeScale::from_times(times, range) {
            Some(scale) => times.iter().map(|&t| scale.apply(t)).collect(),
            None => Vec::new(),
        },
        ScaleMode::Relative => {
            let last = times.len().saturating_sub(1) as f64;
            let scale = LinearScale::new((0.0, last), range);
            (0..times.len()).map(|i| scale.apply(i as f64)).collect()
        }
    }
}

/// Place sorted groups and their lines. Pure in its inputs.
pub fn layout_thread<I: Instance>(
    groups: &[Group<I>],
    lines: &[Line],
    times: &[DateTime<Utc>],
    mode: ScaleMode,
    cfg: &LayoutConfig,
) -> ThreadLayout {
    let message_x = message_positions(times, mode, cfg);
    let offset = instance_offset(cfg);

    let placed: Vec<PlacedGroup> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| PlacedGroup {
            id: g.id.clone(),
            label: g.label.clone(),
            title: g.title.clone(),
            is_group: g.is_group(),
            is_sender: g.is_sender,
            x: 0.0,
            y: slot_y(i, cfg),
            instances: g
                .instances
                .iter()
                .map(|inst| PlacedInstance {
                    index: inst.index(),
                    x: message_x[inst.index()],
                    y: offset,
                    is_sender: inst.is_sender(),
                    is_bcc: inst.is_bcc(),
                })
                .collect(),
        })
        .collect();

    let slot_of: HashMap<&str, f64> = placed.iter().map(|g| (g.id.as_str(), g.y)).collect();
    let lines = lines
        .iter()
        .filter_map(|l| {
            let y = slot_of.get(l.group_id.as_str())?;
            Some(PlacedLine {
                id: l.id.clone(),
                group_id: l.group_id.clone(),
                x1: message_x[l.source_idx],
                x2: message_x[l.target_idx],
                y: y + offset,
                is_exclusion: l.is_exclusion,
                is_group: l.is_group,
            })
        })
        .collect();

    ThreadLayout {
        width: cfg.inner_width(),
        height: cfg.inner_height(),
        scale_mode: mode,
        message_x,
        groups: placed,
        lines,
    }
}
