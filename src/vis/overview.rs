use chrono::{DateTime, Utc};
use serde::Serialize;

use super::events::{Dispatcher, Highlight, VisEvent};
use super::grouping::{Group, group_persons};
use super::layout::{PlacedLine, ScaleMode, instance_offset, slot_y};
use super::lines::{Line, build_lines};
use super::persons::{Persons, ThreadInstance, extract_thread_persons};
use super::scale::{BandScale, LinearScale, TimeScale, extent};
use super::sorting::{SortMethod, sort_groups};
use super::view::ModelState;
use crate::config::{LayoutConfig, ViewConfig};
use crate::error::Result;
use crate::mail::{Thread, sort_messages, sort_threads};

const BAND_PADDING: f64 = 0.1;

/// Participants across many threads, one aggregate instance per thread.
#[derive(Debug, Clone)]
pub struct OverviewModel {
    pub persons: Persons<ThreadInstance>,
    pub groups: Vec<Group<ThreadInstance>>,
    pub lines: Vec<Line>,
    /// Start time of every thread, by thread index.
    pub times: Vec<DateTime<Utc>>,
    /// Largest send or receive count of any instance.
    pub max_count: u32,
}

impl OverviewModel {
    pub fn build(threads: &[Thread], sort: SortMethod) -> Self {
        let times: Vec<_> = threads
            .iter()
            .map(|t| t.start_time().unwrap_or_default())
            .collect();
        let persons = extract_thread_persons(threads);
        let max_count = persons
            .iter()
            .flat_map(|p| &p.instances)
            .map(|i| i.senders.max(i.receivers))
            .max()
            .unwrap_or(0);
        let mut groups = group_persons(persons.as_slice());
        sort_groups(&mut groups, sort, &times);
        let lines = build_lines(&groups);
        tracing::debug!(
            threads = threads.len(),
            persons = persons.len(),
            groups = groups.len(),
            "overview model rebuilt"
        );
        Self {
            persons,
            groups,
            lines,
            times,
            max_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedThread {
    pub id: String,
    pub subject: String,
    pub x: f64,
    /// Position on the absolute time axis, only with time grouping.
    pub time_x: Option<f64>,
}

/// Send and receive bars of one instance, relative to the group's slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstanceBar {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub senders: u32,
    pub receivers: u32,
    pub send_width: f64,
    pub receive_width: f64,
    pub bar_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewGroup {
    pub id: String,
    pub label: String,
    pub title: String,
    pub is_group: bool,
    pub is_sender: bool,
    pub y: f64,
    pub bars: Vec<InstanceBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewLayout {
    pub width: f64,
    pub height: f64,
    pub bandwidth: f64,
    pub threads: Vec<PlacedThread>,
    pub groups: Vec<OverviewGroup>,
    pub lines: Vec<PlacedLine>,
}

/// Thread-granularity timeline over many threads.
#[derive(Debug, Default)]
pub struct ThreadOverview {
    threads: Vec<Thread>,
    view: ViewConfig,
    layout: LayoutConfig,
    state: ModelState<OverviewModel>,
    highlight: Highlight,
    events: Dispatcher<VisEvent>,
}

impl ThreadOverview {
    pub fn new(view: ViewConfig, layout: LayoutConfig) -> Self {
        Self {
            view,
            layout,
            ..Self::default()
        }
    }

    pub fn set_threads(&mut self, mut threads: Vec<Thread>) -> Result<()> {
        for t in &threads {
            t.validate()?;
        }
        for t in &mut threads {
            sort_messages(&mut t.messages);
        }
        sort_threads(&mut threads);
        self.threads = threads;
        self.state.invalidate();
        self.highlight.clear();
        Ok(())
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    pub fn model(&mut self) -> &OverviewModel {
        let (threads, sort) = (&self.threads, self.view.sort_method);
        self.state.get_or_compute(|| OverviewModel::build(threads, sort))
    }

    pub fn set_sort_method(&mut self, sort: SortMethod) {
        self.view.sort_method = sort;
        if let Some(model) = self.state.as_mut() {
            sort_groups(&mut model.groups, sort, &model.times);
            model.lines = build_lines(&model.groups);
        }
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.view.scale_mode = mode;
    }

    pub fn set_time_grouping(&mut self, on: bool) {
        self.view.time_grouping = on;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.layout.width = width;
        self.layout.height = height;
    }

    pub fn layout(&mut self) -> OverviewLayout {
        let (view, cfg) = (self.view, self.layout);
        let threads = &self.threads;
        let model = self
            .state
            .get_or_compute(|| OverviewModel::build(threads, view.sort_method));
        layout_overview(threads, model, &view, &cfg)
    }

    pub fn highlight(&mut self) -> &mut Highlight {
        &mut self.highlight
    }

    pub fn hover(&mut self, group_id: Option<&str>) {
        if self.highlight.hover(group_id) {
            self.events.emit(&VisEvent::Hover {
                id: group_id.map(str::to_string),
            });
        }
    }

    /// Emit a click for thread `idx`; returns its id.
    pub fn click(&mut self, idx: usize) -> Option<String> {
        let id = self.threads.get(idx)?.thread_id.clone();
        self.events.emit(&VisEvent::Click { id: id.clone() });
        Some(id)
    }

    pub fn events(&mut self) -> &mut Dispatcher<VisEvent> {
        &mut self.events
    }
}

pub fn layout_overview(
    threads: &[Thread],
    model: &OverviewModel,
    view: &ViewConfig,
    cfg: &LayoutConfig,
) -> OverviewLayout {
    let range = (cfg.label_width, cfg.inner_width());
    let band = BandScale::new(threads.len(), range, BAND_PADDING, true);
    let time_scale = extent(threads.iter().flat_map(|t| t.messages.iter().map(|m| m.time)))
        .map(|d| TimeScale::new(d, range));
    // Threads without messages have no time position.
    let time_x = |i: usize| {
        let start = threads[i].start_time()?;
        time_scale.map(|s| s.apply(start).round())
    };

    let thread_x: Vec<f64> = (0..threads.len())
        .map(|i| match view.scale_mode {
            ScaleMode::Relative => band.apply(i),
            ScaleMode::Absolute => time_x(i).unwrap_or_else(|| band.apply(i)),
        })
        .collect();

    let placed_threads = threads
        .iter()
        .enumerate()
        .map(|(i, t)| PlacedThread {
            id: t.thread_id.clone(),
            subject: t.subject().to_string(),
            x: thread_x[i],
            time_x: if view.time_grouping { time_x(i) } else { None },
        })
        .collect();

    let count_scale = LinearScale::new((0.0, model.max_count as f64), (0.0, band.bandwidth()));
    let width_of = |count: u32| {
        if model.max_count == 0 {
            0.0
        } else {
            count_scale.apply(count as f64).round()
        }
    };
    let bar_height = cfg.person_height / 2.0 - 2.0;

    let groups: Vec<OverviewGroup> = model
        .groups
        .iter()
        .enumerate()
        .map(|(i, g)| OverviewGroup {
            id: g.id.clone(),
            label: g.label.clone(),
            title: g.title.clone(),
            is_group: g.is_group(),
            is_sender: g.is_sender,
            y: slot_y(i, cfg),
            bars: g
                .instances
                .iter()
                .map(|inst| InstanceBar {
                    index: inst.thread_idx,
                    x: thread_x[inst.thread_idx],
                    y: 1.0,
                    senders: inst.senders,
                    receivers: inst.receivers,
                    send_width: width_of(inst.senders),
                    receive_width: width_of(inst.receivers),
                    bar_height,
                })
                .collect(),
        })
        .collect();

    let offset = instance_offset(cfg);
    let lines = model
        .lines
        .iter()
        .filter_map(|l| {
            let g = groups.iter().find(|g| g.id == l.group_id)?;
            Some(PlacedLine {
                id: l.id.clone(),
                group_id: l.group_id.clone(),
                x1: thread_x[l.source_idx],
                x2: thread_x[l.target_idx],
                y: g.y + offset,
                is_exclusion: l.is_exclusion,
                is_group: l.is_group,
            })
        })
        .collect();

    OverviewLayout {
        width: cfg.inner_width(),
        height: cfg.inner_height(),
        bandwidth: band.bandwidth(),
        threads: placed_threads,
        groups,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vis::persons::tests::message;

    fn sample() -> Vec<Thread> {
        vec![
            Thread::new(
                "t2",
                vec![
                    message("3", 30, "b@x.com", &[("a@x.com", "To")]),
                    message("4", 40, "a@x.com", &[("b@x.com", "To"), ("c@x.com", "Cc")]),
                ],
            ),
            Thread::new(
                "t1",
                vec![
                    message("2", 10, "a@x.com", &[("b@x.com", "To")]),
                    message("1", 0, "a@x.com", &[("b@x.com", "To"), ("b@x.com", "Cc")]),
                ],
            ),
            Thread::new("t3", vec![message("5", 50, "d@x.com", &[("a@x.com", "To")])]),
        ]
    }

    fn overview(view: ViewConfig) -> ThreadOverview {
        let mut o = ThreadOverview::new(view, LayoutConfig::default());
        o.set_threads(sample()).unwrap();
        o
    }

    #[test]
    fn threads_sorted_by_start_time() {
        let o = overview(ViewConfig::default());
        let ids: Vec<_> = o.threads().iter().map(|t| t.thread_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
        assert_eq!(o.threads()[0].messages[0].message_id, "1");
    }

    #[test]
    fn model_counts_per_thread() {
        let mut o = overview(ViewConfig::default());
        let model = o.model();
        let a = model.persons.get("a@x.com").unwrap();
        assert_eq!(
            a.instances,
            vec![
                ThreadInstance { thread_idx: 0, senders: 2, receivers: 0 },
                ThreadInstance { thread_idx: 1, senders: 1, receivers: 1 },
                ThreadInstance { thread_idx: 2, senders: 0, receivers: 1 },
            ]
        );
        assert_eq!(model.max_count, 2);
        // one exclusion and one run covering 0..=2
        let a_lines: Vec<_> = model.lines.iter().filter(|l| l.group_id == "a@x.com").collect();
        assert_eq!(a_lines.len(), 2);
    }

    #[test]
    fn relative_layout_uses_rounded_bands() {
        let mut o = overview(ViewConfig {
            scale_mode: ScaleMode::Relative,
            ..ViewConfig::default()
        });
        let l = o.layout();
        let xs: Vec<_> = l.threads.iter().map(|t| t.x).collect();
        assert_eq!(xs, vec![91.0, 385.0, 679.0]);
        assert_eq!(l.bandwidth, 265.0);
        assert!(l.threads.iter().all(|t| t.time_x.is_none()));

        let a = l.groups.iter().find(|g| g.id == "a@x.com").unwrap();
        assert_eq!(a.bars[0].send_width, 265.0);
        assert_eq!(a.bars[0].receive_width, 0.0);
        assert_eq!(a.bars[1].send_width, 133.0);
        assert_eq!(a.bars[0].bar_height, 6.0);
    }

    #[test]
    fn time_grouping_adds_time_positions() {
        let mut o = overview(ViewConfig {
            scale_mode: ScaleMode::Relative,
            time_grouping: true,
            ..ViewConfig::default()
        });
        let l = o.layout();
        let time_x: Vec<_> = l.threads.iter().map(|t| t.time_x).collect();
        assert_eq!(time_x, vec![Some(90.0), Some(603.0), Some(945.0)]);
    }

    #[test]
    fn absolute_layout_places_threads_by_start() {
        let mut o = overview(ViewConfig::default());
        let l = o.layout();
        assert_eq!(l.threads[0].x, 90.0);
        assert_eq!(l.threads[2].x, 945.0);
    }

    #[test]
    fn thread_without_messages_stays_on_canvas() {
        let threads = vec![
            Thread::new("t2", vec![message("2", 30, "b@x.com", &[("a@x.com", "To")])]),
            Thread::new("empty", Vec::new()),
            Thread::new("t1", vec![message("1", 0, "a@x.com", &[("b@x.com", "To")])]),
        ];
        let mut o = ThreadOverview::new(
            ViewConfig {
                time_grouping: true,
                ..ViewConfig::default()
            },
            LayoutConfig::default(),
        );
        o.set_threads(threads).unwrap();
        let l = o.layout();

        let ids: Vec<_> = l.threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "empty"]);
        assert_eq!(l.threads[0].x, 90.0);
        assert_eq!(l.threads[1].x, 945.0);
        // falls back to its band
        assert_eq!(l.threads[2].x, 679.0);
        assert_eq!(l.threads[2].time_x, None);
        let cfg = LayoutConfig::default();
        assert!(l
            .threads
            .iter()
            .all(|t| t.x >= cfg.label_width && t.x <= cfg.inner_width()));
    }

    #[test]
    fn click_emits_thread_id() {
        let mut o = overview(ViewConfig::default());
        let clicked = std::rc::Rc::new(std::cell::RefCell::new(None));
        let c = clicked.clone();
        o.events().subscribe(move |e| {
            if let VisEvent::Click { id } = e {
                *c.borrow_mut() = Some(id.clone());
            }
        });
        assert_eq!(o.click(1).as_deref(), Some("t2"));
        assert_eq!(clicked.borrow().as_deref(), Some("t2"));
    }

    fn shared_recipients() -> Vec<Thread> {
        vec![
            Thread::new(
                "t1",
                vec![message("1", 0, "a@x.com", &[("b@x.com", "To"), ("c@x.com", "Cc")])],
            ),
            Thread::new(
                "t2",
                vec![
                    message("2", 10, "a@x.com", &[("b@x.com", "To"), ("c@x.com", "To")]),
                    message("3", 11, "d@x.com", &[("a@x.com", "To")]),
                ],
            ),
            Thread::new("t3", vec![message("4", 20, "d@x.com", &[("a@x.com", "To")])]),
        ]
    }

    fn group_ids(o: &mut ThreadOverview) -> Vec<String> {
        o.model().groups.iter().map(|g| g.id.clone()).collect()
    }

    #[test]
    fn identical_thread_patterns_merge() {
        let mut o = ThreadOverview::new(ViewConfig::default(), LayoutConfig::default());
        o.set_threads(shared_recipients()).unwrap();
        let model = o.model();
        assert_eq!(model.persons.len(), 4);
        assert_eq!(model.groups.len(), 3);

        let g = model.groups.iter().find(|g| g.is_group()).unwrap();
        assert_eq!(g.id, "b@x.com");
        assert_eq!(g.label, "Group (2)");
        assert_eq!(g.emails, vec!["b@x.com", "c@x.com"]);
        assert_eq!(
            g.instances,
            vec![
                ThreadInstance { thread_idx: 0, senders: 0, receivers: 1 },
                ThreadInstance { thread_idx: 1, senders: 0, receivers: 1 },
            ]
        );
    }

    #[test]
    fn groups_follow_sort_method() {
        let mut o = ThreadOverview::new(ViewConfig::default(), LayoutConfig::default());
        o.set_threads(shared_recipients()).unwrap();
        assert_eq!(group_ids(&mut o), vec!["a@x.com", "b@x.com", "d@x.com"]);

        o.set_sort_method(SortMethod::Engagement);
        assert!(!o.is_dirty());
        assert_eq!(group_ids(&mut o), vec!["a@x.com", "d@x.com", "b@x.com"]);
        o.set_sort_method(SortMethod::Engagement);
        assert_eq!(group_ids(&mut o), vec!["a@x.com", "d@x.com", "b@x.com"]);

        o.set_sort_method(SortMethod::Time);
        assert_eq!(group_ids(&mut o), vec!["a@x.com", "b@x.com", "d@x.com"]);

        // a fresh build lands in the same order as a re-sort
        let mut fresh = ThreadOverview::new(
            ViewConfig {
                sort_method: SortMethod::Engagement,
                ..ViewConfig::default()
            },
            LayoutConfig::default(),
        );
        fresh.set_threads(shared_recipients()).unwrap();
        assert_eq!(group_ids(&mut fresh), vec!["a@x.com", "d@x.com", "b@x.com"]);
    }

    #[test]
    fn empty_overview() {
        let mut o = overview(ViewConfig::default());
        o.set_threads(Vec::new()).unwrap();
        let l = o.layout();
        assert!(l.threads.is_empty());
        assert!(l.groups.is_empty());
        assert!(l.lines.is_empty());
    }
}
