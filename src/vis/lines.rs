use serde::Serialize;

use super::grouping::Group;
use super::persons::Instance;

/// A horizontal connector between two instances of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub id: String,
    pub group_id: String,
    pub source_idx: usize,
    pub target_idx: usize,
    /// Spans the group's whole participation, drawn under the runs.
    pub is_exclusion: bool,
    pub is_group: bool,
}

/// Lines for all groups, in display order.
pub fn build_lines<I: Instance>(groups: &[Group<I>]) -> Vec<Line> {
    groups.iter().flat_map(extract_lines).collect()
}

/// One exclusion line from first to last instance, then one line per run
/// of strictly consecutive indices.
pub fn extract_lines<I: Instance>(group: &Group<I>) -> Vec<Line> {
    let indices: Vec<usize> = group.instances.iter().map(Instance::index).collect();
    debug_assert!(indices.windows(2).all(|w| w[0] < w[1]), "instances out of order");

    let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
        return Vec::new();
    };
    let line = |source_idx: usize, target_idx: usize, is_exclusion: bool| {
        let suffix = if is_exclusion { "-exc" } else { "" };
        Line {
            id: format!("{}-{}-{}{}", group.id, source_idx, target_idx, suffix),
            group_id: group.id.clone(),
            source_idx,
            target_idx,
            is_exclusion,
            is_group: group.is_group(),
        }
    };

    let mut lines = Vec::new();
    if indices.len() > 1 {
        lines.push(line(first, last, true));
    }

    let mut start = first;
    let mut prev = first;
    for &idx in &indices[1..] {
        if idx != prev + 1 {
            if prev > start {
                lines.push(line(start, prev, false));
            }
            start = idx;
        }
        prev = idx;
    }
    if prev > start {
        lines.push(line(start, prev, false));
    }

    lines
}
