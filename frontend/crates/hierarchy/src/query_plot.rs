//! Similarity-search view: every level over the time axis with its visited
//! and visualized ranges, the selected snapshot and nearest-neighbour hits.

use crate::controller::{HierarchyController, SnapshotChoice};
use crate::error::ValidationError;
use shared::{LevelOrdering, NeighborHit, SearchResults, TimeSpan};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Rank of a level without neighbour hits when ordering by similarity.
const MISSING_DISTANCE: f64 = 128.0;
const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub embedding: Vec<f64>,
    pub levels: Vec<u32>,
    pub k: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub x1: f64,
    pub x2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeighborMarker {
    pub index: usize,
    pub x: f64,
    pub opacity: f64,
    pub selected: bool,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotRow {
    pub level: u32,
    pub y: f64,
    pub visited: Vec<Segment>,
    pub visualized: Vec<Segment>,
    pub selected: Option<f64>,
    pub neighbors: Vec<NeighborMarker>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlotController {
    width: f64,
    height: f64,
    ordering: LevelOrdering,
    neighbors: Option<SearchResults>,
    marked: BTreeSet<(u32, usize)>,
    zoom: f64,
    translate: f64,
}

impl QueryPlotController {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ordering: LevelOrdering::Level,
            neighbors: None,
            marked: BTreeSet::new(),
            zoom: MIN_ZOOM,
            translate: 0.0,
        }
    }

    pub fn ordering(&self) -> LevelOrdering {
        self.ordering
    }

    pub fn reorder(&mut self, ordering: LevelOrdering) {
        self.ordering = ordering;
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn has_results(&self) -> bool {
        self.neighbors.is_some()
    }

    fn hits(&self, level: u32) -> &[NeighborHit] {
        self.neighbors
            .as_ref()
            .and_then(|results| results.get(&level.to_string()))
            .map_or(&[], Vec::as_slice)
    }

    fn nearest_distance(&self, level: u32) -> f64 {
        self.hits(level)
            .iter()
            .map(|hit| hit.distance)
            .reduce(f64::min)
            .unwrap_or(MISSING_DISTANCE)
    }

    /// Levels top to bottom under the current ordering. Ties keep ascending level order.
    pub fn level_order(&self, controller: &HierarchyController) -> Vec<u32> {
        let mut levels: Vec<u32> = controller
            .levels_top_down()
            .map(|level| level.index())
            .rev()
            .collect();
        let visited = |level: &u32| controller.session().visited().count(*level);
        let visualized = |level: &u32| {
            controller
                .level(*level)
                .map_or(0, |level| level.visualized_time_ranges().len())
        };
        match self.ordering {
            LevelOrdering::Level => levels.sort_by(|a, b| b.cmp(a)),
            LevelOrdering::Visited => levels.sort_by(|a, b| visited(b).cmp(&visited(a))),
            LevelOrdering::Visualized => {
                levels.sort_by(|a, b| visualized(b).cmp(&visualized(a)))
            }
            LevelOrdering::Similarity => {
                if self.neighbors.is_some() {
                    levels.sort_by(|a, b| {
                        self.nearest_distance(*a)
                            .partial_cmp(&self.nearest_distance(*b))
                            .unwrap_or(Ordering::Equal)
                    });
                }
            }
        }
        levels
    }

    /// Validates the search locally; no request may be sent on error.
    pub fn prepare_search(
        &self,
        controller: &HierarchyController,
        levels: &[u32],
        k: u32,
    ) -> Result<SearchQuery, ValidationError> {
        let selected = controller
            .session()
            .selected()
            .filter(|selected| !selected.embedding.is_empty())
            .ok_or(ValidationError::NoSelectedSnapshot)?;
        if levels.is_empty() {
            return Err(ValidationError::NoSearchLevels);
        }
        if k == 0 {
            return Err(ValidationError::NoNeighborCount);
        }
        for level in levels {
            if controller.level(*level).is_none() {
                return Err(ValidationError::UnknownLevel(*level));
            }
        }
        Ok(SearchQuery {
            embedding: selected.embedding.clone(),
            levels: levels.to_vec(),
            k,
        })
    }

    /// Replaces every marker and forgets the previous marker selection.
    pub fn apply_results(&mut self, results: SearchResults) {
        log::debug!("[QUERY_PLOT] {} levels with neighbours", results.len());
        self.neighbors = Some(results);
        self.marked.clear();
    }

    pub fn toggle_marker(&mut self, level: u32, index: usize) {
        if index >= self.hits(level).len() {
            return;
        }
        if !self.marked.remove(&(level, index)) {
            self.marked.insert((level, index));
        }
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Shows the marked neighbours in the hierarchy.
    pub fn commit_selection(
        &self,
        controller: &mut HierarchyController,
    ) -> Result<(), ValidationError> {
        let choices: Vec<SnapshotChoice> = self
            .marked
            .iter()
            .filter_map(|(level, index)| {
                let hit = self.hits(*level).get(*index)?;
                // The result key is authoritative, hits may omit their level
                Some(SnapshotChoice {
                    level: *level,
                    ..SnapshotChoice::from(hit)
                })
            })
            .collect();
        if choices.is_empty() {
            return Err(ValidationError::NoMarkersSelected);
        }
        controller.apply_selection(&choices)
    }

    fn max_distance(&self) -> f64 {
        self.neighbors
            .iter()
            .flat_map(|results| results.values())
            .flatten()
            .map(|hit| hit.distance)
            .fold(0.0, f64::max)
    }

    /// 1.0 at distance zero, fading linearly to 0.5 at the farthest hit.
    pub fn marker_opacity(&self, distance: f64) -> f64 {
        let max = self.max_distance();
        if max <= 0.0 {
            return 1.0;
        }
        1.0 - 0.5 * (distance / max).clamp(0.0, 1.0)
    }

    // ===== PAN & ZOOM =====

    fn clamp_translate(&mut self) {
        let min = self.width * (1.0 - self.zoom);
        self.translate = self.translate.clamp(min.min(0.0), 0.0);
    }

    pub fn zoom_at(&mut self, factor: f64, anchor_x: f64) {
        let previous = self.zoom;
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = self.zoom / previous;
        self.translate = anchor_x - (anchor_x - self.translate) * ratio;
        self.clamp_translate();
    }

    pub fn pan(&mut self, dx: f64) {
        self.translate += dx;
        self.clamp_translate();
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = MIN_ZOOM;
        self.translate = 0.0;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.clamp_translate();
    }

    pub fn x_for(&self, span: TimeSpan, time: chrono::DateTime<chrono::Utc>) -> f64 {
        self.translate + self.zoom * span.fraction_of(time) * self.width
    }

    fn segment(&self, span: TimeSpan, range: &TimeSpan) -> Segment {
        Segment {
            x1: self.x_for(span, range.start),
            x2: self.x_for(span, range.end),
        }
    }

    fn midpoint(&self, span: TimeSpan, range: &TimeSpan) -> f64 {
        let segment = self.segment(span, range);
        (segment.x1 + segment.x2) / 2.0
    }

    /// Marks of every level, laid out under the current ordering and zoom.
    pub fn rows(&self, controller: &HierarchyController) -> Vec<PlotRow> {
        let span = controller.span();
        let order = self.level_order(controller);
        let step = self.height / (order.len() + 1) as f64;
        let selected = controller.session().selected();
        order
            .into_iter()
            .enumerate()
            .map(|(row, level)| {
                let visited = controller
                    .session()
                    .visited()
                    .ranges(level)
                    .iter()
                    .map(|range| self.segment(span, range))
                    .collect();
                let visualized = controller
                    .level(level)
                    .map(|row| row.visualized_time_ranges())
                    .unwrap_or_default()
                    .iter()
                    .map(|range| self.segment(span, range))
                    .collect();
                let neighbors = self
                    .hits(level)
                    .iter()
                    .enumerate()
                    .filter_map(|(index, hit)| {
                        let range = hit.time_span()?;
                        Some(NeighborMarker {
                            index,
                            x: self.midpoint(span, &range),
                            opacity: self.marker_opacity(hit.distance),
                            selected: self.marked.contains(&(level, index)),
                            tooltip: format!(
                                "Distance: {}\nGraph-type: {}\n{}",
                                hit.distance, hit.graph_type, range
                            ),
                        })
                    })
                    .collect();
                PlotRow {
                    level,
                    y: step * (row + 1) as f64,
                    visited,
                    visualized,
                    selected: selected
                        .filter(|selected| selected.key.level == level)
                        .map(|selected| self.midpoint(span, &selected.span)),
                    neighbors,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellKey;
    use crate::gateway::DataGateway;
    use crate::testing::{MockGateway, controller, origin, settle};
    use chrono::Duration;
    use shared::{GraphMode, format_http_date};

    fn hit(level: u32, position: i64, distance: f64) -> NeighborHit {
        NeighborHit {
            level,
            position,
            graph_type: GraphMode::Union,
            distance,
            time1: format_http_date(origin()),
            time2: format_http_date(origin() + Duration::days(6)),
        }
    }

    #[tokio::test]
    async fn search_without_selection_sends_no_request() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        settle(&mut hierarchy, &gateway).await;
        let before = gateway.total();

        let plot = QueryPlotController::new(800.0, 400.0);
        assert_eq!(
            plot.prepare_search(&hierarchy, &[2, 3], 5),
            Err(ValidationError::NoSelectedSnapshot)
        );
        assert_eq!(gateway.total(), before);
        assert_eq!(gateway.count("search_all_levels"), 0);
    }

    #[tokio::test]
    async fn marked_neighbors_replace_the_hierarchy_view() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        settle(&mut hierarchy, &gateway).await;
        hierarchy.select_snapshot(CellKey::new(3, 0)).unwrap();

        let mut plot = QueryPlotController::new(800.0, 400.0);
        assert_eq!(
            plot.prepare_search(&hierarchy, &[], 5),
            Err(ValidationError::NoSearchLevels)
        );
        assert_eq!(
            plot.prepare_search(&hierarchy, &[2, 9], 5),
            Err(ValidationError::UnknownLevel(9))
        );
        assert_eq!(
            plot.prepare_search(&hierarchy, &[2, 3], 0),
            Err(ValidationError::NoNeighborCount)
        );
        let query = plot.prepare_search(&hierarchy, &[2, 3], 5).unwrap();
        assert_eq!(query.embedding, vec![3.0, 0.0]);

        let results = gateway
            .search_all_levels(&query.embedding, &query.levels, query.k)
            .await
            .unwrap();
        plot.apply_results(results);
        assert_eq!(plot.commit_selection(&mut hierarchy), Err(ValidationError::NoMarkersSelected));

        plot.toggle_marker(2, 0);
        plot.toggle_marker(2, 5);
        assert_eq!(plot.marked_count(), 1);
        plot.commit_selection(&mut hierarchy).unwrap();

        assert_eq!(hierarchy.session().active_levels(), &BTreeSet::from([2]));
        let cell = hierarchy.cell(CellKey::new(2, 4)).unwrap();
        assert_eq!(cell.graph_mode(), GraphMode::Union);
        assert!(!cell.is_abstract());
    }

    #[test]
    fn hit_level_comes_from_the_result_key() {
        let mut hierarchy = controller(3);
        let mut plot = QueryPlotController::new(800.0, 400.0);
        plot.apply_results(SearchResults::from([("3".to_string(), vec![hit(0, 2, 0.1)])]));
        plot.toggle_marker(3, 0);
        plot.commit_selection(&mut hierarchy).unwrap();
        assert!(hierarchy.cell(CellKey::new(3, 2)).is_some());
    }

    #[test]
    fn similarity_ordering_ranks_missing_levels_last() {
        let hierarchy = controller(4);
        let mut plot = QueryPlotController::new(800.0, 400.0);
        assert_eq!(plot.level_order(&hierarchy), vec![4, 3, 2]);

        plot.reorder(LevelOrdering::Similarity);
        assert_eq!(plot.level_order(&hierarchy), vec![2, 3, 4]);

        plot.apply_results(SearchResults::from([
            ("2".to_string(), vec![hit(2, 0, 0.9)]),
            ("4".to_string(), vec![hit(4, 1, 0.6), hit(4, 3, 0.2)]),
        ]));
        assert_eq!(plot.level_order(&hierarchy), vec![4, 2, 3]);
    }

    #[tokio::test]
    async fn visited_ordering_follows_history() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        hierarchy.add_snapshot(2, 1).unwrap();
        hierarchy.add_cell(2, 2, GraphMode::Union).unwrap();
        settle(&mut hierarchy, &gateway).await;

        let mut plot = QueryPlotController::new(800.0, 400.0);
        plot.reorder(LevelOrdering::Visited);
        assert_eq!(plot.level_order(&hierarchy), vec![2, 3]);
        plot.reorder(LevelOrdering::Visualized);
        assert_eq!(plot.level_order(&hierarchy), vec![2, 3]);
    }

    #[test]
    fn nearer_hits_are_more_opaque() {
        let mut plot = QueryPlotController::new(800.0, 400.0);
        assert_eq!(plot.marker_opacity(3.0), 1.0);
        plot.apply_results(SearchResults::from([(
            "2".to_string(),
            vec![hit(2, 0, 0.0), hit(2, 1, 0.8)],
        )]));
        assert_eq!(plot.marker_opacity(0.0), 1.0);
        assert_eq!(plot.marker_opacity(0.8), 0.5);
        assert_eq!(plot.marker_opacity(0.4), 0.75);
    }

    #[test]
    fn zoom_is_clamped_and_pans_stay_inside() {
        let hierarchy = controller(3);
        let span = hierarchy.span();
        let mut plot = QueryPlotController::new(1000.0, 400.0);
        assert_eq!(plot.x_for(span, span.end), 1000.0);

        plot.zoom_at(20.0, 500.0);
        assert_eq!(plot.zoom(), 10.0);
        assert_eq!(plot.x_for(span, span.start), -4500.0);

        plot.pan(10_000.0);
        assert_eq!(plot.x_for(span, span.start), 0.0);
        plot.pan(-1_000_000.0);
        assert_eq!(plot.x_for(span, span.end), 1000.0);

        plot.zoom_at(0.01, 0.0);
        assert_eq!(plot.zoom(), 1.0);
        assert_eq!(plot.x_for(span, span.start), 0.0);
    }

    #[tokio::test]
    async fn rows_mark_selection_and_neighbors() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        settle(&mut hierarchy, &gateway).await;
        hierarchy.select_snapshot(CellKey::new(3, 0)).unwrap();

        let mut plot = QueryPlotController::new(800.0, 300.0);
        plot.apply_results(SearchResults::from([("2".to_string(), vec![hit(2, 0, 0.5)])]));
        plot.toggle_marker(2, 0);
        let rows = plot.rows(&hierarchy);

        assert_eq!(rows.iter().map(|row| row.level).collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(rows[0].y, 100.0);
        assert!(rows[0].selected.is_some());
        assert_eq!(rows[0].visited.len(), 1);
        assert_eq!(rows[0].visualized.len(), 1);
        assert!(rows[1].selected.is_none());
        let marker = &rows[1].neighbors[0];
        assert!(marker.selected);
        assert!(marker.tooltip.starts_with("Distance: 0.5\nGraph-type: union"));
    }
}
