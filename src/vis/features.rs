use std::collections::{BTreeMap, BTreeSet, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::events::{Dispatcher, VisEvent};
use super::scale::{BandScale, LinearScale, TimeScale, extent};
use crate::mail::{Message, Thread, sort_threads};

/// Per-thread scalar metrics stored under their JSON names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreadFeature {
    SenderDiversity,
    PaceOfInteractionAvgGap,
    SenderDiversityEntropy,
    ParticipantGrowth,
    ParticipantSizeVariation,
    Engagement,
}

impl ThreadFeature {
    pub const ALL: [ThreadFeature; 6] = [
        ThreadFeature::SenderDiversity,
        ThreadFeature::PaceOfInteractionAvgGap,
        ThreadFeature::SenderDiversityEntropy,
        ThreadFeature::ParticipantGrowth,
        ThreadFeature::ParticipantSizeVariation,
        ThreadFeature::Engagement,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ThreadFeature::SenderDiversity => "SenderDiversity",
            ThreadFeature::PaceOfInteractionAvgGap => "PaceOfInteractionAvgGap",
            ThreadFeature::SenderDiversityEntropy => "SenderDiversityEntropy",
            ThreadFeature::ParticipantGrowth => "ParticipantGrowth",
            ThreadFeature::ParticipantSizeVariation => "ParticipantSizeVariation",
            ThreadFeature::Engagement => "Engagement",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThreadFeature::SenderDiversity => "Sender diversity",
            ThreadFeature::PaceOfInteractionAvgGap => "Pace of interaction",
            ThreadFeature::SenderDiversityEntropy => "Sender entropy",
            ThreadFeature::ParticipantGrowth => "Participant growth",
            ThreadFeature::ParticipantSizeVariation => "Size variation",
            ThreadFeature::Engagement => "Engagement",
        }
    }

    /// Value for a time-ordered message list; None when undefined.
    pub fn compute(self, messages: &[Message]) -> Option<f64> {
        if messages.is_empty() {
            return None;
        }
        match self {
            ThreadFeature::SenderDiversity => Some(sender_diversity(messages)),
            ThreadFeature::PaceOfInteractionAvgGap => median_gap(messages),
            ThreadFeature::SenderDiversityEntropy => Some(sender_entropy(messages)),
            ThreadFeature::ParticipantGrowth => Some(participant_growth(messages)),
            ThreadFeature::ParticipantSizeVariation => Some(participant_size_variation(messages)),
            ThreadFeature::Engagement => Some(engagement(messages)),
        }
    }
}

fn sender_diversity(messages: &[Message]) -> f64 {
    let senders: HashSet<&str> = messages.iter().map(|m| m.sender.as_str()).collect();
    senders.len() as f64 / messages.len() as f64
}

/// Median of the gaps between consecutive messages, in seconds.
fn median_gap(messages: &[Message]) -> Option<f64> {
    let mut gaps: Vec<f64> = messages
        .windows(2)
        .map(|w| (w[1].time - w[0].time).num_milliseconds() as f64 / 1000.0)
        .collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_by(f64::total_cmp);
    let mid = gaps.len() / 2;
    Some(if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) / 2.0
    } else {
        gaps[mid]
    })
}

/// Shannon entropy (natural log) of messages per sender.
fn sender_entropy(messages: &[Message]) -> f64 {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for m in messages {
        *counts.entry(&m.sender).or_default() += 1;
    }
    let n = messages.len() as f64;
    -counts
        .values()
        .map(|&c| {
            let p = c as f64 / n;
            p * p.ln()
        })
        .sum::<f64>()
}

/// Sender followed by every listed recipient, duplicates included.
fn participant_list(m: &Message) -> impl Iterator<Item = &str> {
    std::iter::once(m.sender.as_str()).chain(m.recipients.iter().map(|r| r.email.as_str()))
}

fn participant_growth(messages: &[Message]) -> f64 {
    let initial = participant_list(&messages[0]).count();
    let all: HashSet<&str> = messages.iter().flat_map(participant_list).collect();
    all.len() as f64 / initial as f64
}

/// Population standard deviation of per-message participant list sizes.
fn participant_size_variation(messages: &[Message]) -> f64 {
    let sizes: Vec<f64> = messages
        .iter()
        .map(|m| participant_list(m).count() as f64)
        .collect();
    let n = sizes.len() as f64;
    let mean = sizes.iter().sum::<f64>() / n;
    (sizes.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Senders over senders plus recipient-only participants.
fn engagement(messages: &[Message]) -> f64 {
    let senders: HashSet<&str> = messages.iter().map(|m| m.sender.as_str()).collect();
    let passive: HashSet<&str> = messages
        .iter()
        .flat_map(|m| m.recipients.iter().map(|r| r.email.as_str()))
        .filter(|e| !senders.contains(e))
        .collect();
    senders.len() as f64 / (senders.len() + passive.len()) as f64
}

/// Compute every metric for every thread and store it on the thread.
pub fn annotate_threads(threads: &mut [Thread]) {
    threads.par_iter_mut().for_each(|t| {
        for f in ThreadFeature::ALL {
            let value = f.compute(&t.messages);
            t.set_feature(f.name(), value);
        }
    });
}

/// A strip or axis bound to one named thread feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDef {
    pub id: String,
    pub label: String,
}

impl FeatureDef {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl From<ThreadFeature> for FeatureDef {
    fn from(f: ThreadFeature) -> Self {
        Self::new(f.name(), f.label())
    }
}

pub fn default_features() -> Vec<FeatureDef> {
    ThreadFeature::ALL.into_iter().map(FeatureDef::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned selection rectangle; edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushRect {
    min: Point,
    max: Point,
}

impl BrushRect {
    /// Any two opposite corners.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDot {
    pub id: String,
    pub value: f64,
    pub x: f64,
    /// Relative to the row.
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub id: String,
    pub label: String,
    pub y: f64,
    /// Value domain after rounding to nice ticks.
    pub domain: (f64, f64),
    pub dots: Vec<FeatureDot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StripLayout {
    pub width: f64,
    pub height: f64,
    pub bandwidth: f64,
    pub rows: Vec<FeatureRow>,
}

/// One row per feature, each thread a dot at (start time, value).
/// Threads missing a value are left out of that row.
pub fn layout_strips(threads: &[Thread], features: &[FeatureDef], width: f64, height: f64) -> StripLayout {
    let rows_scale = BandScale::new(features.len(), (0.0, height - 5.0), 0.15, false);
    let bandwidth = rows_scale.bandwidth();
    let starts: Vec<_> = threads.iter().filter_map(Thread::start_time).collect();
    let x_scale = TimeScale::from_times(&starts, (0.0, width));

    let rows = features
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let values: Vec<(&Thread, f64)> = threads
                .iter()
                .filter_map(|t| t.feature(&f.id).map(|v| (t, v)))
                .collect();
            let domain = extent(values.iter().map(|(_, v)| *v)).unwrap_or((0.0, 1.0));
            let y_scale = LinearScale::new(domain, (bandwidth, 20.0)).nice(10);

            let dots = match x_scale {
                Some(x_scale) => values
                    .iter()
                    .filter_map(|(t, v)| {
                        Some(FeatureDot {
                            id: t.thread_id.clone(),
                            value: *v,
                            x: x_scale.apply(t.start_time()?),
                            y: y_scale.apply(*v).round(),
                        })
                    })
                    .collect(),
                None => Vec::new(),
            };

            FeatureRow {
                id: f.id.clone(),
                label: f.label.clone(),
                y: rows_scale.apply(i),
                domain: y_scale.domain(),
                dots,
            }
        })
        .collect();

    StripLayout {
        width,
        height,
        bandwidth,
        rows,
    }
}

/// Ids of the dots inside `rect`, in row order.
pub fn brush_dots(dots: &[FeatureDot], rect: &BrushRect) -> Vec<String> {
    dots.iter()
        .filter(|d| rect.contains(Point::new(d.x, d.y)))
        .map(|d| d.id.clone())
        .collect()
}

/// Stacked feature strips over many threads with a shared brush.
#[derive(Debug)]
pub struct FeatureStrips {
    threads: Vec<Thread>,
    features: Vec<FeatureDef>,
    width: f64,
    height: f64,
    brushed: BTreeSet<String>,
    hovered: Option<String>,
    events: Dispatcher<VisEvent>,
}

impl FeatureStrips {
    pub fn new(features: Vec<FeatureDef>, width: f64, height: f64) -> Self {
        Self {
            threads: Vec::new(),
            features,
            width,
            height,
            brushed: BTreeSet::new(),
            hovered: None,
            events: Dispatcher::new(),
        }
    }

    pub fn set_threads(&mut self, mut threads: Vec<Thread>) {
        sort_threads(&mut threads);
        self.threads = threads;
        self.brushed.clear();
        self.hovered = None;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn layout(&self) -> StripLayout {
        layout_strips(&self.threads, &self.features, self.width, self.height)
    }

    /// Brush inside row `row`; the selection applies to every row.
    /// `None` clears it. Emits the selected ids.
    pub fn brush(&mut self, row: usize, rect: Option<BrushRect>) -> Vec<String> {
        let ids = match rect {
            Some(rect) => self
                .layout()
                .rows
                .get(row)
                .map(|r| brush_dots(&r.dots, &rect))
                .unwrap_or_default(),
            None => Vec::new(),
        };
        self.brushed = ids.iter().cloned().collect();
        self.events.emit(&VisEvent::Brush { ids: ids.clone() });
        ids
    }

    pub fn is_brushed(&self, id: &str) -> bool {
        self.brushed.contains(id)
    }

    pub fn hover(&mut self, id: Option<&str>) {
        if self.hovered.as_deref() != id {
            self.hovered = id.map(str::to_string);
            self.events.emit(&VisEvent::Hover {
                id: self.hovered.clone(),
            });
        }
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn click(&mut self, id: &str) -> Option<&Thread> {
        let thread = self.threads.iter().find(|t| t.thread_id == id)?;
        self.events.emit(&VisEvent::Click {
            id: thread.thread_id.clone(),
        });
        Some(thread)
    }

    pub fn events(&mut self) -> &mut Dispatcher<VisEvent> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vis::persons::tests::message;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sample_messages() -> Vec<Message> {
        vec![
            message("1", 0, "a@x.com", &[("b@x.com", "To")]),
            message("2", 1, "b@x.com", &[("a@x.com", "To"), ("c@x.com", "Cc")]),
            message("3", 3, "a@x.com", &[("b@x.com", "To"), ("b@x.com", "Cc")]),
        ]
    }

    #[test]
    fn metrics_on_small_thread() {
        let m = sample_messages();
        let get = |f: ThreadFeature| f.compute(&m).unwrap();
        assert!(close(get(ThreadFeature::SenderDiversity), 2.0 / 3.0));
        assert!(close(get(ThreadFeature::PaceOfInteractionAvgGap), 90.0));
        let p: f64 = 2.0 / 3.0;
        let q: f64 = 1.0 / 3.0;
        assert!(close(get(ThreadFeature::SenderDiversityEntropy), -(p * p.ln() + q * q.ln())));
        assert!(close(get(ThreadFeature::ParticipantGrowth), 1.5));
        assert!(close(get(ThreadFeature::ParticipantSizeVariation), (2.0f64 / 9.0).sqrt()));
        assert!(close(get(ThreadFeature::Engagement), 2.0 / 3.0));
    }

    #[test]
    fn undefined_metrics_are_none() {
        let one = vec![message("1", 0, "a@x.com", &[("b@x.com", "To")])];
        assert_eq!(ThreadFeature::PaceOfInteractionAvgGap.compute(&one), None);
        assert_eq!(ThreadFeature::SenderDiversityEntropy.compute(&one), Some(0.0));
        for f in ThreadFeature::ALL {
            assert_eq!(f.compute(&[]), None);
        }
    }

    #[test]
    fn median_gap_odd_and_even_counts() {
        let m = vec![
            message("1", 0, "a@x.com", &[]),
            message("2", 1, "a@x.com", &[]),
            message("3", 4, "a@x.com", &[]),
            message("4", 10, "a@x.com", &[]),
        ];
        // gaps 60, 180, 360
        assert_eq!(ThreadFeature::PaceOfInteractionAvgGap.compute(&m), Some(180.0));
        assert_eq!(ThreadFeature::PaceOfInteractionAvgGap.compute(&m[..3]), Some(120.0));
    }

    #[test]
    fn annotate_stores_all_features() {
        let mut threads = vec![Thread::new("t", sample_messages())];
        annotate_threads(&mut threads);
        for f in ThreadFeature::ALL {
            assert!(threads[0].feature(f.name()).is_some(), "{}", f.name());
        }
    }

    fn strip_threads() -> Vec<Thread> {
        let mut threads = Vec::new();
        for (i, value) in [0.2, 0.5, 0.9].into_iter().enumerate() {
            let minute = i as u32 * 10;
            let mut t = Thread::new(
                format!("t{i}"),
                vec![message(&i.to_string(), minute, "a@x.com", &[("b@x.com", "To")])],
            );
            t.set_feature("Engagement", Some(value));
            threads.push(t);
        }
        threads.push(Thread::new(
            "missing",
            vec![message("9", 5, "a@x.com", &[("b@x.com", "To")])],
        ));
        threads
    }

    #[test]
    fn strip_layout_rows_and_dots() {
        let features = vec![
            FeatureDef::from(ThreadFeature::Engagement),
            FeatureDef::new("mdsX", "MDS x"),
        ];
        let l = layout_strips(&strip_threads(), &features, 200.0, 205.0);
        // band over [0, 200] with inner padding 0.15
        let step = 200.0 / 1.85;
        assert!(close(l.bandwidth, step * 0.85));
        assert!(close(l.rows[1].y, step));

        let row = &l.rows[0];
        assert!(row.domain.0 <= 0.2 && row.domain.1 >= 0.9);
        let ids: Vec<_> = row.dots.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2"]);
        assert_eq!(row.dots[0].x, 0.0);
        assert_eq!(row.dots[2].x, 200.0);
        // higher values sit higher
        assert!(row.dots[2].y < row.dots[0].y);

        assert!(l.rows[1].dots.is_empty());
    }

    #[test]
    fn brush_selects_exactly_inside_and_across_rows() {
        let features = vec![FeatureDef::from(ThreadFeature::Engagement)];
        let mut strips = FeatureStrips::new(features, 200.0, 205.0);
        strips.set_threads(strip_threads());

        let emitted = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let e = emitted.clone();
        strips.events().subscribe(move |ev| e.borrow_mut().push(ev.clone()));

        let layout = strips.layout();
        let t1 = &layout.rows[0].dots[1];
        let rect = BrushRect::new(Point::new(t1.x + 1.0, 0.0), Point::new(t1.x - 1.0, 1000.0));
        let ids = strips.brush(0, Some(rect));
        assert_eq!(ids, vec!["t1"]);
        assert!(strips.is_brushed("t1"));
        assert!(!strips.is_brushed("t0"));

        strips.brush(0, None);
        assert!(!strips.is_brushed("t1"));
        assert_eq!(
            *emitted.borrow(),
            vec![
                VisEvent::Brush { ids: vec!["t1".to_string()] },
                VisEvent::Brush { ids: vec![] },
            ]
        );
    }

    #[test]
    fn brush_edges_are_inclusive() {
        let rect = BrushRect::new(Point::new(10.0, 10.0), Point::new(0.0, 0.0));
        assert!(rect.contains(Point::new(0.0, 10.0)));
        assert!(rect.contains(Point::new(5.0, 5.0)));
        assert!(!rect.contains(Point::new(10.1, 5.0)));
    }
}
