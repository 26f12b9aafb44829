use std::collections::BTreeSet;

use serde::Serialize;

use super::events::{Dispatcher, VisEvent};
use super::features::{BrushRect, Point};
use super::scale::{LinearScale, extent};
use crate::mail::Thread;

pub const DEFAULT_X_FEATURE: &str = "mdsX";
pub const DEFAULT_Y_FEATURE: &str = "mdsY";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedThread {
    pub id: String,
    pub subject: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionLayout {
    pub width: f64,
    pub height: f64,
    pub x_domain: (f64, f64),
    pub y_domain: (f64, f64),
    pub points: Vec<ProjectedThread>,
}

/// Scatter threads by two features. Threads missing either are skipped.
pub fn layout_projection(
    threads: &[Thread],
    x_feature: &str,
    y_feature: &str,
    width: f64,
    height: f64,
) -> ProjectionLayout {
    let values: Vec<(&Thread, f64, f64)> = threads
        .iter()
        .filter_map(|t| Some((t, t.feature(x_feature)?, t.feature(y_feature)?)))
        .collect();

    let x_domain = extent(values.iter().map(|v| v.1)).unwrap_or((0.0, 1.0));
    let y_domain = extent(values.iter().map(|v| v.2)).unwrap_or((0.0, 1.0));
    let x_scale = LinearScale::new(x_domain, (0.0, width)).nice(10);
    let y_scale = LinearScale::new(y_domain, (height, 0.0)).nice(10);

    let points = values
        .iter()
        .map(|(t, x, y)| ProjectedThread {
            id: t.thread_id.clone(),
            subject: t.subject().to_string(),
            x: x_scale.apply(*x).round(),
            y: y_scale.apply(*y).round(),
        })
        .collect();

    ProjectionLayout {
        width,
        height,
        x_domain: x_scale.domain(),
        y_domain: y_scale.domain(),
        points,
    }
}

/// Two-feature scatterplot with brushing and external selection.
#[derive(Debug)]
pub struct FeatureProjection {
    threads: Vec<Thread>,
    x_feature: String,
    y_feature: String,
    width: f64,
    height: f64,
    brushed: BTreeSet<String>,
    events: Dispatcher<VisEvent>,
}

impl Default for FeatureProjection {
    fn default() -> Self {
        Self::new(DEFAULT_X_FEATURE, DEFAULT_Y_FEATURE, 400.0, 400.0)
    }
}

impl FeatureProjection {
    pub fn new(x_feature: &str, y_feature: &str, width: f64, height: f64) -> Self {
        Self {
            threads: Vec::new(),
            x_feature: x_feature.to_string(),
            y_feature: y_feature.to_string(),
            width,
            height,
            brushed: BTreeSet::new(),
            events: Dispatcher::new(),
        }
    }

    pub fn set_threads(&mut self, threads: Vec<Thread>) {
        self.threads = threads;
        self.brushed.clear();
    }

    pub fn set_dimensions(&mut self, x_feature: &str, y_feature: &str) {
        self.x_feature = x_feature.to_string();
        self.y_feature = y_feature.to_string();
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn layout(&self) -> ProjectionLayout {
        layout_projection(
            &self.threads,
            &self.x_feature,
            &self.y_feature,
            self.width,
            self.height,
        )
    }

    /// Select the threads inside `rect`, or clear with None. Emits the ids.
    pub fn brush(&mut self, rect: Option<BrushRect>) -> Vec<String> {
        let ids: Vec<String> = match rect {
            Some(rect) => self
                .layout()
                .points
                .into_iter()
                .filter(|p| rect.contains(Point::new(p.x, p.y)))
                .map(|p| p.id)
                .collect(),
            None => Vec::new(),
        };
        self.brushed = ids.iter().cloned().collect();
        self.events.emit(&VisEvent::Brush { ids: ids.clone() });
        ids
    }

    /// Selection made by another view; does not emit.
    pub fn set_brushed<S: Into<String>>(&mut self, ids: impl IntoIterator<Item = S>) {
        self.brushed = ids.into_iter().map(Into::into).collect();
    }

    pub fn is_brushed(&self, id: &str) -> bool {
        self.brushed.contains(id)
    }

    pub fn click(&mut self, id: &str) -> bool {
        if !self.threads.iter().any(|t| t.thread_id == id) {
            return false;
        }
        self.events.emit(&VisEvent::Click { id: id.to_string() });
        true
    }

    pub fn events(&mut self) -> &mut Dispatcher<VisEvent> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vis::persons::tests::message;

    fn thread(id: &str, x: Option<f64>, y: Option<f64>) -> Thread {
        let mut t = Thread::new(id, vec![message(id, 0, "a@x.com", &[("b@x.com", "To")])]);
        if let Some(x) = x {
            t.set_feature(DEFAULT_X_FEATURE, Some(x));
        }
        if let Some(y) = y {
            t.set_feature(DEFAULT_Y_FEATURE, Some(y));
        }
        t
    }

    fn sample() -> Vec<Thread> {
        vec![
            thread("a", Some(0.0), Some(0.0)),
            thread("b", Some(5.0), Some(10.0)),
            thread("c", Some(10.0), Some(5.0)),
            thread("d", None, Some(3.0)),
        ]
    }

    #[test]
    fn projects_with_flipped_y() {
        let l = layout_projection(&sample(), DEFAULT_X_FEATURE, DEFAULT_Y_FEATURE, 100.0, 50.0);
        assert_eq!(l.x_domain, (0.0, 10.0));
        let pts: Vec<_> = l.points.iter().map(|p| (p.id.as_str(), p.x, p.y)).collect();
        assert_eq!(pts, vec![("a", 0.0, 50.0), ("b", 50.0, 0.0), ("c", 100.0, 25.0)]);
    }

    #[test]
    fn brush_returns_points_inside() {
        let mut p = FeatureProjection::new(DEFAULT_X_FEATURE, DEFAULT_Y_FEATURE, 100.0, 50.0);
        p.set_threads(sample());
        let ids = p.brush(Some(BrushRect::new(Point::new(40.0, 0.0), Point::new(100.0, 30.0))));
        assert_eq!(ids, vec!["b", "c"]);
        assert!(p.is_brushed("b"));
        assert!(!p.is_brushed("a"));

        p.set_brushed(["a"]);
        assert!(p.is_brushed("a"));
        assert!(!p.is_brushed("b"));
    }

    #[test]
    fn click_only_known_threads() {
        let mut p = FeatureProjection::default();
        p.set_threads(sample());
        assert!(p.click("a"));
        assert!(!p.click("zzz"));
    }

    #[test]
    fn no_values_gives_no_points() {
        let threads = vec![thread("a", None, None)];
        let l = layout_projection(&threads, DEFAULT_X_FEATURE, DEFAULT_Y_FEATURE, 100.0, 100.0);
        assert!(l.points.is_empty());
    }
}
