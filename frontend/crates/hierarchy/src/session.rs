use crate::cell::CellKey;
use crate::color::MetricRegistry;
use shared::{GraphMode, TimeSpan};
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot chosen as the query of a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSnapshot {
    pub key: CellKey,
    pub span: TimeSpan,
    pub graph_mode: GraphMode,
    pub embedding: Vec<f64>,
}

/// Per-level log of every time range loaded at least once. Never shrinks.
#[derive(Debug, Clone, Default)]
pub struct VisitedRecord {
    ranges: BTreeMap<u32, Vec<TimeSpan>>,
}

impl VisitedRecord {
    pub fn record(&mut self, level: u32, span: TimeSpan) {
        self.ranges.entry(level).or_default().push(span);
    }

    pub fn ranges(&self, level: u32) -> &[TimeSpan] {
        self.ranges.get(&level).map_or(&[], Vec::as_slice)
    }

    pub fn count(&self, level: u32) -> usize {
        self.ranges(level).len()
    }
}

/// State shared by every part of one exploration session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub(crate) active_levels: BTreeSet<u32>,
    pub(crate) visited: VisitedRecord,
    pub(crate) selected: Option<SelectedSnapshot>,
    pub(crate) metrics: MetricRegistry,
    pub(crate) color_metric: Option<String>,
}

impl Session {
    pub fn active_levels(&self) -> &BTreeSet<u32> {
        &self.active_levels
    }

    pub fn visited(&self) -> &VisitedRecord {
        &self.visited
    }

    pub fn selected(&self) -> Option<&SelectedSnapshot> {
        self.selected.as_ref()
    }

    pub fn metrics(&self) -> &MetricRegistry {
        &self.metrics
    }

    pub fn color_metric(&self) -> Option<&str> {
        self.color_metric.as_deref()
    }
}
