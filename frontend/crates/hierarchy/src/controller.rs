use crate::cell::{Cell, CellKey, FetchSlot, Playback, RequestId};
use crate::color::{Legend, Rgba};
use crate::effect::{Completion, Effect, FetchKind, FetchOutcome, FetchRequest, Ticket};
use crate::error::{GatewayError, Notification, ValidationError};
use crate::level::Level;
use crate::render::{RenderOptions, Scene, node_at, scene_for};
use crate::session::{SelectedSnapshot, Session};
use shared::{
    AppConfig, AutoCollapseSection, GraphMode, HierarchyMeta, LayoutSection, MatrixOrder,
    NeighborHit, NodeId, NodeMetric, PlaybackSection, TimeSpan, VisualizationMode,
};
use std::collections::{BTreeMap, BTreeSet};

/// Drawing area of the level rows, timeline and indicator excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 600.0,
        }
    }
}

/// One (level, position, mode) tuple chosen outside the hierarchy view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotChoice {
    pub level: u32,
    pub position: i64,
    pub graph_mode: GraphMode,
}

impl From<&NeighborHit> for SnapshotChoice {
    fn from(hit: &NeighborHit) -> Self {
        Self {
            level: hit.level,
            position: hit.position,
            graph_mode: hit.graph_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Position to probe with `check_graph` before growing a level sideways.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborProbe {
    pub level: u32,
    pub position: i64,
}

fn cell_in(levels: &mut BTreeMap<u32, Level>, key: CellKey) -> Option<&mut Cell> {
    levels.get_mut(&key.level)?.cell_mut(key.position)
}

fn validate_levels(meta: &HierarchyMeta) -> Result<BTreeMap<u32, Level>, ValidationError> {
    let mut levels = BTreeMap::new();
    for (key, level) in &meta.levels {
        let index = key.parse::<u32>().unwrap_or(level.level);
        levels.insert(index, Level::new(index, level.window_size, level.overlap));
    }
    let expected: Vec<u32> = (2..=meta.height).collect();
    let found: Vec<u32> = levels.keys().copied().collect();
    if meta.height < 2 || found != expected {
        return Err(ValidationError::NonContiguousLevels {
            height: meta.height,
            found,
        });
    }
    Ok(levels)
}

/// Owns the levels of one hierarchy and keeps their layout consistent.
pub struct HierarchyController {
    meta: HierarchyMeta,
    span: TimeSpan,
    levels: BTreeMap<u32, Level>,
    session: Session,
    layout: LayoutSection,
    auto_collapse: AutoCollapseSection,
    playback: PlaybackSection,
    viewport: Viewport,
    visualization: VisualizationMode,
    graph_mode: GraphMode,
    matrix_order: MatrixOrder,
    node_size: Option<NodeMetric>,
    cluster: bool,
    effects: Vec<Effect>,
    pending: BTreeSet<RequestId>,
    next_request: u64,
    collapse_generation: u64,
    /// Source of level-collapse and playback tickets. Never reset, so tickets
    /// issued before `reset_to_default` stay stale after it.
    next_ticket: u64,
}

impl HierarchyController {
    /// Builds one level per metadata entry and shows the topmost level.
    pub fn new(
        meta: HierarchyMeta,
        config: &AppConfig,
        viewport: Viewport,
    ) -> Result<Self, ValidationError> {
        let levels = validate_levels(&meta)?;
        let span = meta.span().ok_or(ValidationError::InvalidHierarchySpan)?;
        let mut controller = Self {
            meta,
            span,
            levels,
            session: Session {
                color_metric: config.view.color_metric.clone(),
                ..Session::default()
            },
            layout: config.layout.clone(),
            auto_collapse: config.auto_collapse.clone(),
            playback: config.playback.clone(),
            viewport,
            visualization: config.view.visualization,
            graph_mode: GraphMode::Union,
            matrix_order: config.view.matrix_order,
            node_size: config.view.node_size,
            cluster: config.view.cluster,
            effects: Vec::new(),
            pending: BTreeSet::new(),
            next_request: 0,
            collapse_generation: 0,
            next_ticket: 0,
        };
        controller.reset_to_default();
        Ok(controller)
    }

    // ===== QUERIES =====

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    pub fn span(&self) -> TimeSpan {
        self.span
    }

    pub fn meta(&self) -> &HierarchyMeta {
        &self.meta
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn layout(&self) -> &LayoutSection {
        &self.layout
    }

    pub fn auto_collapse(&self) -> &AutoCollapseSection {
        &self.auto_collapse
    }

    pub fn visualization(&self) -> VisualizationMode {
        self.visualization
    }

    pub fn graph_mode(&self) -> GraphMode {
        self.graph_mode
    }

    pub fn matrix_order(&self) -> MatrixOrder {
        self.matrix_order
    }

    pub fn node_size(&self) -> Option<NodeMetric> {
        self.node_size
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            matrix_order: self.matrix_order,
            node_size: self.node_size,
        }
    }

    pub fn cluster(&self) -> bool {
        self.cluster
    }

    pub fn level(&self, index: u32) -> Option<&Level> {
        self.levels.get(&index)
    }

    /// Levels from the top (H) down to 2.
    pub fn levels_top_down(&self) -> impl DoubleEndedIterator<Item = &Level> {
        self.levels.values().rev()
    }

    pub fn cell(&self, key: CellKey) -> Option<&Cell> {
        self.levels.get(&key.level)?.cell(key.position)
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Busy while any request is in flight, not only the latest one.
    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn cell_color(&self, key: CellKey) -> Rgba {
        self.session
            .metrics
            .color_for(key, self.session.color_metric.as_deref())
    }

    pub fn legend(&self) -> Option<Legend> {
        self.session
            .metrics
            .legend(self.session.color_metric.as_deref())
    }

    pub fn scene(&self, key: CellKey) -> Option<Scene> {
        self.cell(key).map(|cell| scene_for(cell, self.render_options()))
    }

    /// Node drawn at `(x, y)` of a graph or animation cell.
    pub fn node_at(&self, key: CellKey, x: f64, y: f64) -> Option<NodeId> {
        self.cell(key)
            .filter(|cell| cell.visualize)
            .and_then(|cell| node_at(cell, self.render_options(), x, y))
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    fn known_level(&self, level: u32) -> Result<(), ValidationError> {
        if self.levels.contains_key(&level) {
            Ok(())
        } else {
            Err(ValidationError::UnknownLevel(level))
        }
    }

    fn existing_cell(&self, key: CellKey) -> Result<&Cell, ValidationError> {
        self.cell(key).ok_or(ValidationError::UnknownCell {
            level: key.level,
            position: key.position,
        })
    }

    // ===== REQUEST BOOKKEEPING =====

    /// Registers a request made outside the cell fetches so it counts as busy.
    pub fn begin_request(&mut self) -> RequestId {
        self.next_request += 1;
        let id = RequestId(self.next_request);
        self.pending.insert(id);
        id
    }

    pub fn finish_request(&mut self, id: RequestId) {
        self.pending.remove(&id);
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    pub fn notify(&mut self, notification: Notification) {
        self.effects.push(Effect::Notify(notification));
    }

    fn notify_gateway_error(&mut self, key: CellKey, error: &GatewayError) {
        log::warn!("[HIERARCHY] Fetch for {key} failed: {error}");
        self.notify(Notification::from(error));
    }

    // ===== ACTIVE LEVELS =====

    pub fn set_active_levels(
        &mut self,
        levels: impl IntoIterator<Item = u32>,
    ) -> Result<(), ValidationError> {
        let levels: BTreeSet<u32> = levels.into_iter().collect();
        for level in &levels {
            self.known_level(*level)?;
        }
        self.session.active_levels = levels;
        self.propagate_visualize();
        Ok(())
    }

    pub fn add_active_level(&mut self, level: u32) -> Result<(), ValidationError> {
        self.known_level(level)?;
        self.session.active_levels.insert(level);
        self.propagate_visualize();
        Ok(())
    }

    pub fn remove_active_level(&mut self, level: u32) -> Result<(), ValidationError> {
        self.known_level(level)?;
        self.session.active_levels.remove(&level);
        self.propagate_visualize();
        Ok(())
    }

    /// Adds or removes the level from the active set, then relayouts.
    pub fn toggle_level(&mut self, level: u32) -> Result<(), ValidationError> {
        if self.session.active_levels.contains(&level) {
            self.remove_active_level(level)?;
        } else {
            self.add_active_level(level)?;
        }
        self.recompute_layout();
        Ok(())
    }

    fn propagate_visualize(&mut self) {
        self.collapse_generation += 1;
        for (index, level) in self.levels.iter_mut() {
            level.visualize = self.session.active_levels.contains(index);
        }
    }

    // ===== LAYOUT =====

    /// Clears every level and shows the single default cell of the top level.
    pub fn reset_to_default(&mut self) {
        for level in self.levels.values_mut() {
            *level = Level::new(level.index(), level.window_size(), level.overlap());
        }
        self.session.metrics.clear();
        self.session.active_levels = BTreeSet::from([self.meta.height]);
        self.recompute_layout();
    }

    pub fn recompute_layout(&mut self) {
        self.propagate_visualize();
        let visualization = self.visualization;
        for level in self.levels.values_mut().filter(|level| level.visualize) {
            level.ensure_default_cell(visualization);
            level.sync_abstract();
        }

        let visible: Vec<u32> = self
            .levels
            .values()
            .rev()
            .filter(|level| level.visualize)
            .map(Level::index)
            .collect();
        let abstract_count = visible
            .iter()
            .filter(|index| self.levels.get(index).is_some_and(Level::is_abstract))
            .count();
        let available = self.viewport.height;
        let (concrete_row, abstract_row) = match (visible.len(), abstract_count) {
            (0, _) => (0.0, 0.0),
            (total, abstract_count) if total == abstract_count => {
                let even = available / total as f64;
                (even, even)
            }
            (total, abstract_count) => (
                (available - abstract_count as f64 * self.layout.abstract_height)
                    / (total - abstract_count) as f64,
                self.layout.abstract_height,
            ),
        };

        let gap = self.layout.level_gap;
        let width = self.viewport.width;
        let mut y = 0.0;
        for level in self.levels.values_mut().rev() {
            level.width = width;
            if level.visualize {
                let row = if level.is_abstract { abstract_row } else { concrete_row };
                level.y = y;
                level.height = (row - gap).max(0.0);
                y += row;
            } else {
                level.height = 0.0;
            }
        }
        log::debug!(
            "[HIERARCHY] Layout: {} visible levels ({} abstract), row height {:.1}",
            visible.len(),
            abstract_count,
            concrete_row
        );

        for index in visible {
            self.redraw_level(index);
        }
        self.schedule_collapse();
    }

    fn schedule_collapse(&mut self) {
        self.collapse_generation += 1;
        if self.auto_collapse.enabled {
            self.effects.push(Effect::ScheduleCollapse {
                ticket: Ticket(self.collapse_generation),
                delay_ms: self.auto_collapse.delay_ms,
            });
        }
    }

    /// Lays out the cells of one level and renders them. Returns true when the
    /// level's abstract flag flipped, which changes row heights.
    fn redraw_level(&mut self, index: u32) -> bool {
        let visualization = self.visualization;
        let abstract_width = self.layout.abstract_width;
        if !self.levels.get(&index).is_some_and(|level| level.visualize) {
            return false;
        }
        let ticket = self.issue_ticket();
        let Some(level) = self.levels.get_mut(&index) else {
            return false;
        };
        level.ensure_default_cell(visualization);
        let flipped = level.sync_abstract();
        level.layout_cells(abstract_width);
        level.collapse_ticket = ticket.0;
        let positions = level.visible_positions();

        for position in positions {
            self.render_cell(CellKey::new(index, position));
        }
        if self.auto_collapse.enabled {
            self.effects.push(Effect::ScheduleLevelCollapse {
                level: index,
                ticket,
                delay_ms: self.auto_collapse.delay_ms,
            });
        }
        flipped
    }

    fn redraw_level_or_layout(&mut self, index: u32) {
        if self.redraw_level(index) {
            self.recompute_layout();
        }
    }

    // ===== CELL RENDERING =====

    /// Requests whatever the cell's current mode still lacks. Loaded cells
    /// issue no fetch.
    pub fn render_cell(&mut self, key: CellKey) {
        let cluster = self.cluster;
        let Some(cell) = self.cell(key) else {
            return;
        };
        if !cell.visualize {
            return;
        }
        let kind = if cell.graph.is_idle() {
            Some(FetchKind::Graph {
                mode: cell.graph_mode(),
                cluster,
            })
        } else if cell.graph().is_some() && !cell.is_abstract() {
            match cell.visualization() {
                VisualizationMode::Animation if cell.animation.is_idle() => {
                    Some(FetchKind::Animation)
                }
                VisualizationMode::Timeline if cell.time_series.is_idle() => {
                    cell.span().map(FetchKind::TimeSeries)
                }
                _ => None,
            }
        } else {
            None
        };
        let Some(kind) = kind else {
            return;
        };

        let id = self.begin_request();
        if let Some(cell) = cell_in(&mut self.levels, key) {
            match kind {
                FetchKind::Graph { .. } => cell.graph = FetchSlot::Pending(id),
                FetchKind::Animation => cell.animation = FetchSlot::Pending(id),
                FetchKind::TimeSeries(_) => cell.time_series = FetchSlot::Pending(id),
            }
        }
        log::debug!("[HIERARCHY] Fetching {kind:?} for {key} as request {}", id.0);
        self.effects.push(Effect::Fetch(FetchRequest { id, cell: key, kind }));
    }

    /// Applies a fetch result. Results for removed cells or superseded
    /// requests are dropped.
    pub fn complete(&mut self, completion: Completion) {
        let Completion { id, cell: key, outcome } = completion;
        self.pending.remove(&id);
        let Some(cell) = cell_in(&mut self.levels, key) else {
            log::warn!("[HIERARCHY] Dropping response {} for removed cell {key}", id.0);
            return;
        };

        let error = match outcome {
            FetchOutcome::Graph(result) => {
                if !cell.graph.accepts(id) {
                    log::warn!("[HIERARCHY] Dropping stale graph response {} for {key}", id.0);
                    return;
                }
                match result {
                    Ok(payload) => {
                        cell.store_graph(payload);
                        let loaded = cell.graph().map(|graph| (graph.metrics(), cell.span()));
                        if let Some((metrics, span)) = loaded {
                            self.session.metrics.insert(key, metrics);
                            if let Some(span) = span {
                                self.session.visited.record(key.level, span);
                            }
                        }
                        self.render_cell(key);
                        None
                    }
                    Err(error) => {
                        cell.graph = FetchSlot::Failed;
                        Some(error)
                    }
                }
            }
            FetchOutcome::Animation(result) => {
                if !cell.animation.accepts(id) {
                    log::warn!("[HIERARCHY] Dropping stale animation response {} for {key}", id.0);
                    return;
                }
                match result {
                    Ok(frames) => {
                        cell.store_frames(frames);
                        None
                    }
                    Err(error) => {
                        cell.animation = FetchSlot::Failed;
                        Some(error)
                    }
                }
            }
            FetchOutcome::TimeSeries(result) => {
                if !cell.time_series.accepts(id) {
                    log::warn!("[HIERARCHY] Dropping stale time series response {} for {key}", id.0);
                    return;
                }
                match result {
                    Ok(series) => {
                        cell.time_series = FetchSlot::Loaded(series);
                        None
                    }
                    Err(error) => {
                        cell.time_series = FetchSlot::Failed;
                        Some(error)
                    }
                }
            }
        };
        if let Some(error) = error {
            self.notify_gateway_error(key, &error);
        }
    }

    // ===== CELLS =====

    /// Creates (or reuses) the cell and redraws its level.
    pub fn add_cell(
        &mut self,
        level: u32,
        position: i64,
        mode: GraphMode,
    ) -> Result<(), ValidationError> {
        self.known_level(level)?;
        let visualization = self.visualization;
        if let Some(row) = self.levels.get_mut(&level) {
            row.insert_cell(position, mode, visualization);
        }
        let key = CellKey::new(level, position);
        if self.cell(key).is_some_and(|cell| cell.graph.is_idle()) {
            self.session.metrics.remove(key);
        }
        self.redraw_level_or_layout(level);
        Ok(())
    }

    pub fn remove_cell(&mut self, key: CellKey) -> Result<(), ValidationError> {
        self.existing_cell(key)?;
        if let Some(level) = self.levels.get_mut(&key.level) {
            level.remove_cell(key.position);
        }
        self.session.metrics.remove(key);
        self.recompute_layout();
        Ok(())
    }

    /// Activates the level, adds the snapshot and relayouts.
    pub fn add_snapshot(&mut self, level: u32, position: i64) -> Result<(), ValidationError> {
        self.add_active_level(level)?;
        let visualization = self.visualization;
        if let Some(row) = self.levels.get_mut(&level) {
            row.insert_cell(position, GraphMode::Union, visualization);
        }
        self.recompute_layout();
        Ok(())
    }

    pub fn neighbor_probe(&self, level: u32, side: Side) -> Result<NeighborProbe, ValidationError> {
        self.known_level(level)?;
        let row = &self.levels[&level];
        let position = match side {
            Side::Left => row.min_position().map_or(-1, |min| min - 1),
            Side::Right => row.max_position().map_or(1, |max| max + 1),
        };
        Ok(NeighborProbe { level, position })
    }

    /// Adds the probed neighbor when the backend confirmed it exists.
    pub fn add_neighbor_cell(&mut self, probe: NeighborProbe, exists: bool) -> bool {
        if !exists {
            log::debug!(
                "[HIERARCHY] No snapshot at level {} position {}",
                probe.level,
                probe.position
            );
            return false;
        }
        let occupied = self
            .level(probe.level)
            .is_none_or(|level| level.cell(probe.position).is_some());
        if occupied {
            return false;
        }
        self.add_cell(probe.level, probe.position, GraphMode::Union)
            .is_ok()
    }

    pub fn toggle_cell_abstract(&mut self, key: CellKey) -> Result<(), ValidationError> {
        self.existing_cell(key)?;
        if let Some(cell) = cell_in(&mut self.levels, key) {
            cell.is_abstract = !cell.is_abstract;
        }
        self.recompute_layout();
        Ok(())
    }

    pub fn toggle_level_abstract(&mut self, level: u32) -> Result<(), ValidationError> {
        self.known_level(level)?;
        if let Some(row) = self.levels.get_mut(&level) {
            let flag = !row.is_abstract();
            row.set_abstract(flag);
        }
        self.recompute_layout();
        Ok(())
    }

    pub fn set_cell_graph_mode(&mut self, key: CellKey, mode: GraphMode) -> Result<(), ValidationError> {
        self.existing_cell(key)?;
        let changed = cell_in(&mut self.levels, key).is_some_and(|cell| cell.set_graph_mode(mode));
        if changed {
            self.session.metrics.remove(key);
            self.render_cell(key);
        }
        Ok(())
    }

    pub fn set_cell_visualization(
        &mut self,
        key: CellKey,
        mode: VisualizationMode,
    ) -> Result<(), ValidationError> {
        self.existing_cell(key)?;
        let changed = cell_in(&mut self.levels, key).is_some_and(|cell| cell.set_visualization(mode));
        if changed {
            self.render_cell(key);
        }
        Ok(())
    }

    /// Marks the cell as the query of the next similarity search.
    pub fn select_snapshot(&mut self, key: CellKey) -> Result<(), ValidationError> {
        let cell = self.existing_cell(key)?;
        let not_loaded = ValidationError::SnapshotNotLoaded {
            level: key.level,
            position: key.position,
        };
        let graph = cell.graph().ok_or(not_loaded.clone())?;
        let span = cell.span().ok_or(not_loaded)?;
        let selected = SelectedSnapshot {
            key,
            span,
            graph_mode: cell.graph_mode(),
            embedding: graph.embeddings().to_vec(),
        };
        log::debug!("[HIERARCHY] Selected snapshot {key} for similarity search");
        self.session.selected = Some(selected);
        Ok(())
    }

    // ===== BROADCASTS =====

    fn visible_cell_keys(&self) -> Vec<CellKey> {
        self.levels
            .values()
            .filter(|level| level.visualize)
            .flat_map(|level| level.cells().map(Cell::key))
            .collect()
    }

    pub fn change_visualization_mode(&mut self, mode: VisualizationMode) {
        self.visualization = mode;
        for key in self.visible_cell_keys() {
            let changed = cell_in(&mut self.levels, key).is_some_and(|cell| cell.set_visualization(mode));
            if changed {
                self.render_cell(key);
            }
        }
    }

    pub fn change_graph_mode(&mut self, mode: GraphMode) {
        self.graph_mode = mode;
        for key in self.visible_cell_keys() {
            let changed = cell_in(&mut self.levels, key).is_some_and(|cell| cell.set_graph_mode(mode));
            if changed {
                self.session.metrics.remove(key);
                self.render_cell(key);
            }
        }
    }

    /// Forgets every loaded payload, e.g. after the node filter changed.
    pub fn reset_data(&mut self) {
        for level in self.levels.values_mut() {
            for cell in level.cells.values_mut() {
                cell.reset_data();
            }
        }
        self.session.metrics.clear();
        for key in self.visible_cell_keys() {
            self.render_cell(key);
        }
    }

    pub fn set_cluster(&mut self, cluster: bool) {
        if self.cluster != cluster {
            self.cluster = cluster;
            self.reset_data();
        }
    }

    pub fn set_color_metric(&mut self, metric: Option<String>) {
        self.session.color_metric = metric.filter(|metric| !metric.is_empty());
    }

    pub fn set_matrix_order(&mut self, order: MatrixOrder) {
        self.matrix_order = order;
    }

    pub fn set_node_size(&mut self, metric: Option<NodeMetric>) {
        self.node_size = metric;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.recompute_layout();
        }
    }

    // ===== SELECTION =====

    /// Shows exactly the chosen snapshots: their levels become the active set,
    /// everything already in those levels collapses, then each tuple gets a cell.
    pub fn apply_selection(&mut self, choices: &[SnapshotChoice]) -> Result<(), ValidationError> {
        for choice in choices {
            self.known_level(choice.level)?;
        }
        let levels: BTreeSet<u32> = choices.iter().map(|choice| choice.level).collect();
        self.set_active_levels(levels.iter().copied())?;
        for level in &levels {
            if let Some(row) = self.levels.get_mut(level) {
                row.hide_cells();
            }
        }
        self.recompute_layout();
        for choice in choices {
            self.add_cell(choice.level, choice.position, choice.graph_mode)?;
        }
        Ok(())
    }

    // ===== AUTO COLLAPSE =====

    pub fn set_auto_collapse(&mut self, enabled: bool) {
        self.auto_collapse.enabled = enabled;
        self.collapse_generation += 1;
        if enabled {
            self.recompute_layout();
        }
    }

    pub fn set_max_levels(&mut self, max_levels: usize) {
        self.auto_collapse.max_levels = max_levels;
    }

    pub fn set_max_cells(&mut self, max_cells: usize) {
        self.auto_collapse.max_cells = max_cells;
    }

    /// Collapses the highest concrete level when too many are shown.
    pub fn fire_collapse(&mut self, ticket: Ticket) -> bool {
        if !self.auto_collapse.enabled || ticket.0 != self.collapse_generation {
            return false;
        }
        let concrete: Vec<u32> = self
            .levels
            .values()
            .filter(|level| level.visualize && !level.is_abstract)
            .map(Level::index)
            .collect();
        if concrete.len() <= self.auto_collapse.max_levels {
            return false;
        }
        let Some(highest) = concrete.iter().max().copied() else {
            return false;
        };
        log::debug!("[HIERARCHY] Auto-collapsing level {highest}");
        if let Some(level) = self.levels.get_mut(&highest) {
            level.set_abstract(true);
        }
        self.recompute_layout();
        true
    }

    /// Collapses the leftmost concrete cell of a level over its cell budget.
    pub fn fire_level_collapse(&mut self, level: u32, ticket: Ticket) -> bool {
        if !self.auto_collapse.enabled {
            return false;
        }
        let max_cells = self.auto_collapse.max_cells;
        let Some(row) = self.levels.get_mut(&level) else {
            return false;
        };
        if !row.visualize || row.collapse_ticket != ticket.0 {
            return false;
        }
        if row.visible_concrete_cells() <= max_cells {
            return false;
        }
        let Some(position) = row.first_visible_concrete() else {
            return false;
        };
        if let Some(cell) = row.cell_mut(position) {
            cell.is_abstract = true;
        }
        log::debug!("[HIERARCHY] Auto-collapsing cell {}", CellKey::new(level, position));
        self.redraw_level_or_layout(level);
        true
    }

    // ===== PLAYBACK =====

    pub fn toggle_playback(&mut self, key: CellKey) -> Result<Playback, ValidationError> {
        self.existing_cell(key)?;
        let delay_ms = self.playback.frame_interval_ms;
        let ticket = self.issue_ticket();
        let Some(cell) = cell_in(&mut self.levels, key) else {
            return Ok(Playback::Stopped);
        };
        if cell.playback() == Playback::Playing {
            cell.stop_playback();
            return Ok(Playback::Stopped);
        }
        if cell.frame_count() == 0 {
            return Err(ValidationError::NoAnimationFrames);
        }
        cell.advance_frame();
        cell.start_playback(ticket.0);
        self.effects.push(Effect::SchedulePlayback {
            cell: key,
            ticket,
            delay_ms,
        });
        Ok(Playback::Playing)
    }

    /// Advances one frame if playback is still running for this ticket.
    pub fn fire_playback(&mut self, key: CellKey, ticket: Ticket) -> bool {
        let delay_ms = self.playback.frame_interval_ms;
        let Some(cell) = cell_in(&mut self.levels, key) else {
            return false;
        };
        if !cell.playback_ticket_is_current(ticket.0) {
            return false;
        }
        cell.advance_frame();
        self.effects.push(Effect::SchedulePlayback {
            cell: key,
            ticket,
            delay_ms,
        });
        true
    }

    pub fn scrub(&mut self, key: CellKey, frame: usize) -> Result<(), ValidationError> {
        self.existing_cell(key)?;
        if let Some(cell) = cell_in(&mut self.levels, key) {
            cell.scrub(frame);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::LoadState;
    use crate::error::Severity;
    use crate::render::Shape;
    use crate::testing::{MockGateway, controller, controller_with, meta, origin, settle};
    use shared::format_http_date;

    fn fetches(effects: &[Effect]) -> Vec<&FetchRequest> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Fetch(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn last_collapse_ticket(effects: &[Effect]) -> Option<Ticket> {
        effects.iter().rev().find_map(|effect| match effect {
            Effect::ScheduleCollapse { ticket, .. } => Some(*ticket),
            _ => None,
        })
    }

    fn last_level_ticket(effects: &[Effect], level: u32) -> Option<Ticket> {
        effects.iter().rev().find_map(|effect| match effect {
            Effect::ScheduleLevelCollapse { level: l, ticket, .. } if *l == level => Some(*ticket),
            _ => None,
        })
    }

    fn playback_ticket(effects: &[Effect]) -> Option<Ticket> {
        effects.iter().rev().find_map(|effect| match effect {
            Effect::SchedulePlayback { ticket, .. } => Some(*ticket),
            _ => None,
        })
    }

    fn auto_collapse_config(max_levels: usize, max_cells: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.auto_collapse.enabled = true;
        config.auto_collapse.max_levels = max_levels;
        config.auto_collapse.max_cells = max_cells;
        config
    }

    #[test]
    fn gapped_levels_are_rejected() {
        let mut meta = meta(4);
        meta.levels.remove("3");
        let error = HierarchyController::new(meta, &AppConfig::default(), Viewport::default()).err();
        assert_eq!(
            error,
            Some(ValidationError::NonContiguousLevels {
                height: 4,
                found: vec![2, 4],
            })
        );
    }

    #[test]
    fn top_level_only_after_activation() {
        let mut hierarchy = controller(3);
        hierarchy.set_active_levels([3]).unwrap();
        hierarchy.recompute_layout();

        let top = hierarchy.level(3).unwrap();
        assert!(top.is_visible());
        assert_eq!(top.positions(), vec![0]);
        assert_eq!(top.cell(0).unwrap().graph_mode(), GraphMode::Union);
        assert_eq!(top.height(), 600.0 - 4.0);

        let bottom = hierarchy.level(2).unwrap();
        assert!(!bottom.is_visible());
        assert_eq!(bottom.height(), 0.0);
        assert_eq!(bottom.cells().count(), 0);
    }

    #[test]
    fn reset_discards_every_cell_but_the_default() {
        let mut hierarchy = controller(4);
        hierarchy.add_cell(4, 3, GraphMode::Intersection).unwrap();
        hierarchy.toggle_level(2).unwrap();
        assert!(hierarchy.level(2).unwrap().is_visible());

        hierarchy.reset_to_default();

        assert_eq!(hierarchy.session().active_levels(), &BTreeSet::from([4]));
        let visible: Vec<CellKey> = hierarchy
            .levels_top_down()
            .filter(|level| level.is_visible())
            .flat_map(|level| level.cells().map(Cell::key))
            .collect();
        assert_eq!(visible, vec![CellKey::new(4, 0)]);
        assert_eq!(
            hierarchy.cell(CellKey::new(4, 0)).unwrap().graph_mode(),
            GraphMode::Union
        );
        assert!(hierarchy.session().metrics().is_empty());
    }

    #[test]
    fn construction_requests_the_default_graph() {
        let mut hierarchy = controller(3);
        let effects = hierarchy.take_effects();
        let requests = fetches(&effects);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].cell, CellKey::new(3, 0));
        assert_eq!(
            requests[0].kind,
            FetchKind::Graph {
                mode: GraphMode::Union,
                cluster: false,
            }
        );
        assert!(hierarchy.is_busy());
    }

    #[test]
    fn unknown_levels_are_rejected() {
        let mut hierarchy = controller(3);
        assert_eq!(
            hierarchy.add_cell(7, 0, GraphMode::Union),
            Err(ValidationError::UnknownLevel(7))
        );
        assert_eq!(hierarchy.toggle_level(1), Err(ValidationError::UnknownLevel(1)));
        assert_eq!(
            hierarchy.set_active_levels([2, 9]),
            Err(ValidationError::UnknownLevel(9))
        );
        assert_eq!(hierarchy.session().active_levels(), &BTreeSet::from([3]));
        assert_eq!(
            hierarchy.remove_cell(CellKey::new(3, 4)),
            Err(ValidationError::UnknownCell {
                level: 3,
                position: 4,
            })
        );
    }

    #[test]
    fn abstract_cells_share_the_remaining_width() {
        let mut hierarchy = controller(3);
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        hierarchy.add_cell(3, 2, GraphMode::Union).unwrap();
        hierarchy.toggle_cell_abstract(CellKey::new(3, 1)).unwrap();

        let level = hierarchy.level(3).unwrap();
        assert_eq!(level.concrete_cell_width(32.0), (1200.0 - 32.0) / 2.0);
        assert_eq!(level.abstract_cell_width(32.0), 32.0);
        let geometry: Vec<(f64, f64)> = level
            .cells()
            .map(|cell| (cell.geometry().x, cell.geometry().width))
            .collect();
        assert_eq!(geometry, vec![(0.0, 584.0), (584.0, 32.0), (616.0, 584.0)]);
        let total: f64 = geometry.iter().map(|(_, width)| width).sum();
        assert_eq!(total, level.width());
    }

    #[test]
    fn level_is_abstract_exactly_when_all_cells_are() {
        let mut hierarchy = controller(3);
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();

        hierarchy.toggle_cell_abstract(CellKey::new(3, 0)).unwrap();
        assert!(!hierarchy.level(3).unwrap().is_abstract());

        hierarchy.toggle_cell_abstract(CellKey::new(3, 1)).unwrap();
        assert!(hierarchy.level(3).unwrap().is_abstract());

        hierarchy.toggle_cell_abstract(CellKey::new(3, 0)).unwrap();
        assert!(!hierarchy.level(3).unwrap().is_abstract());
    }

    #[test]
    fn abstract_rows_get_the_fixed_height() {
        let mut hierarchy = controller(3);
        hierarchy.toggle_level(2).unwrap();
        hierarchy.toggle_level_abstract(3).unwrap();

        let top = hierarchy.level(3).unwrap();
        let bottom = hierarchy.level(2).unwrap();
        assert_eq!((top.y(), top.height()), (0.0, 28.0));
        assert_eq!((bottom.y(), bottom.height()), (32.0, 600.0 - 32.0 - 4.0));
        assert!(top.cells().all(Cell::is_abstract));
    }

    #[test]
    fn resize_relayouts_cells() {
        let mut hierarchy = controller(3);
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        hierarchy.set_viewport(Viewport {
            width: 800.0,
            height: 400.0,
        });
        let level = hierarchy.level(3).unwrap();
        assert_eq!(level.cell(1).unwrap().geometry().x, 400.0);
        assert_eq!(level.height(), 396.0);
    }

    #[tokio::test]
    async fn loaded_cell_renders_without_second_fetch() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        settle(&mut hierarchy, &gateway).await;
        assert_eq!(gateway.count("graph"), 1);

        let key = CellKey::new(3, 0);
        let first = hierarchy.scene(key).unwrap();
        assert!(!first.is_empty());

        hierarchy.render_cell(key);
        hierarchy.render_cell(key);
        hierarchy.recompute_layout();
        settle(&mut hierarchy, &gateway).await;

        assert_eq!(gateway.count("graph"), 1);
        assert_eq!(hierarchy.scene(key).unwrap(), first);
    }

    #[tokio::test]
    async fn superseded_response_is_dropped() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        let stale = match hierarchy.take_effects().pop() {
            Some(Effect::Fetch(request)) => request,
            other => panic!("expected a fetch, got {other:?}"),
        };
        let key = stale.cell;

        hierarchy
            .set_cell_graph_mode(key, GraphMode::Intersection)
            .unwrap();
        let fresh = hierarchy.take_effects();
        assert_eq!(fetches(&fresh).len(), 1);
        assert_eq!(hierarchy.pending_requests(), 2);

        hierarchy.complete(stale.execute(&gateway).await);
        assert_eq!(hierarchy.cell(key).unwrap().load_state(), LoadState::Loading);
        assert!(hierarchy.is_busy());

        for effect in fresh {
            if let Effect::Fetch(request) = effect {
                hierarchy.complete(request.execute(&gateway).await);
            }
        }
        assert_eq!(hierarchy.cell(key).unwrap().load_state(), LoadState::Loaded);
        assert!(!hierarchy.is_busy());
    }

    #[tokio::test]
    async fn busy_until_every_request_finished() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        hierarchy.add_cell(3, 2, GraphMode::Union).unwrap();
        let mut requests: Vec<FetchRequest> = hierarchy
            .take_effects()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::Fetch(request) => Some(request),
                _ => None,
            })
            .collect();
        assert_eq!(hierarchy.pending_requests(), 3);

        let last = requests.pop().unwrap();
        hierarchy.complete(last.execute(&gateway).await);
        assert!(hierarchy.is_busy());

        for request in requests {
            hierarchy.complete(request.execute(&gateway).await);
        }
        assert!(!hierarchy.is_busy());
    }

    #[tokio::test]
    async fn response_for_removed_cell_is_ignored() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        settle(&mut hierarchy, &gateway).await;
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        let request = match hierarchy.take_effects().pop() {
            Some(Effect::Fetch(request)) => request,
            other => panic!("expected a fetch, got {other:?}"),
        };

        hierarchy.remove_cell(CellKey::new(3, 1)).unwrap();
        hierarchy.complete(request.execute(&gateway).await);

        assert!(hierarchy.cell(CellKey::new(3, 1)).is_none());
        assert!(!hierarchy.is_busy());
        assert_eq!(hierarchy.session().metrics().len(), 1);
    }

    #[tokio::test]
    async fn graph_mode_change_keeps_animation_frames() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        hierarchy.change_visualization_mode(VisualizationMode::Animation);
        settle(&mut hierarchy, &gateway).await;
        let key = CellKey::new(3, 0);
        assert_eq!(gateway.count("animation_data"), 1);
        assert_eq!(hierarchy.cell(key).unwrap().frames().map(<[_]>::len), Some(3));

        hierarchy.change_graph_mode(GraphMode::Intersection);
        assert!(hierarchy.cell(key).unwrap().has_animation_payload());
        settle(&mut hierarchy, &gateway).await;

        assert_eq!(gateway.count("graph"), 2);
        assert_eq!(gateway.count("animation_data"), 1);
        assert_eq!(
            hierarchy.cell(key).unwrap().graph_mode(),
            GraphMode::Intersection
        );
    }

    #[tokio::test]
    async fn timeline_cells_request_their_own_span() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        settle(&mut hierarchy, &gateway).await;
        hierarchy.change_visualization_mode(VisualizationMode::Timeline);
        settle(&mut hierarchy, &gateway).await;

        let request = gateway
            .requests()
            .into_iter()
            .find(|request| request.path == "timeseries")
            .unwrap();
        assert!(
            request
                .query
                .contains(&("start_dateTime", format_http_date(origin())))
        );
        let scene = hierarchy.scene(CellKey::new(3, 0)).unwrap();
        assert!(scene.shapes.iter().any(|shape| matches!(shape, Shape::Polyline { .. })));
    }

    #[tokio::test]
    async fn failed_fetch_notifies_once_and_is_not_retried() {
        let gateway = MockGateway::default();
        gateway.fail("graph");
        let mut hierarchy = controller(3);
        let effects = settle(&mut hierarchy, &gateway).await;

        let notifications: Vec<&Notification> = effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Notify(notification) => Some(notification),
                _ => None,
            })
            .collect();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].severity, Severity::Error);

        let key = CellKey::new(3, 0);
        assert_eq!(hierarchy.cell(key).unwrap().load_state(), LoadState::Failed);
        assert!(matches!(
            hierarchy.scene(key).unwrap().shapes.as_slice(),
            [Shape::Text { text, .. }] if text == "No data."
        ));

        hierarchy.recompute_layout();
        settle(&mut hierarchy, &gateway).await;
        assert_eq!(gateway.count("graph"), 1);
    }

    #[tokio::test]
    async fn failed_graph_is_refetched_after_a_mode_change() {
        let gateway = MockGateway::default();
        gateway.fail("graph");
        let mut hierarchy = controller(3);
        settle(&mut hierarchy, &gateway).await;
        let key = CellKey::new(3, 0);
        assert_eq!(hierarchy.cell(key).unwrap().load_state(), LoadState::Failed);

        hierarchy.change_visualization_mode(VisualizationMode::Matrix);
        settle(&mut hierarchy, &gateway).await;
        assert_eq!(gateway.count("graph"), 2);
        assert_eq!(hierarchy.cell(key).unwrap().load_state(), LoadState::Failed);

        let healthy = MockGateway::default();
        hierarchy
            .set_cell_visualization(key, VisualizationMode::Graph)
            .unwrap();
        settle(&mut hierarchy, &healthy).await;
        assert_eq!(healthy.count("graph"), 1);
        assert_eq!(hierarchy.cell(key).unwrap().load_state(), LoadState::Loaded);
        assert!(!hierarchy.is_busy());
    }

    #[tokio::test]
    async fn failed_animation_is_refetched_after_a_mode_change() {
        let gateway = MockGateway::default();
        gateway.fail("animation_data");
        let mut hierarchy = controller(3);
        hierarchy.change_visualization_mode(VisualizationMode::Animation);
        settle(&mut hierarchy, &gateway).await;
        let key = CellKey::new(3, 0);
        assert!(!hierarchy.cell(key).unwrap().has_animation_payload());

        let healthy = MockGateway::default();
        hierarchy.change_visualization_mode(VisualizationMode::Graph);
        hierarchy.change_visualization_mode(VisualizationMode::Animation);
        settle(&mut hierarchy, &healthy).await;
        assert_eq!(healthy.count("animation_data"), 1);
        assert_eq!(healthy.count("graph"), 0);
        assert_eq!(hierarchy.cell(key).unwrap().frame_count(), 3);
    }

    #[tokio::test]
    async fn node_clicks_and_sizes_follow_the_view_settings() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        settle(&mut hierarchy, &gateway).await;
        let key = CellKey::new(3, 0);
        assert_eq!(hierarchy.node_at(key, 15.0, 15.0), Some(NodeId("1".into())));
        assert_eq!(hierarchy.node_at(key, 600.0, 300.0), None);

        hierarchy.set_node_size(Some(NodeMetric::Degree));
        let radii: Vec<f64> = hierarchy
            .scene(key)
            .unwrap()
            .shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::Circle { radius, .. } => Some(*radius),
                _ => None,
            })
            .collect();
        assert_eq!(radii, vec![3.0, 2.0, 9.0, 8.0]);

        hierarchy.change_visualization_mode(VisualizationMode::Matrix);
        assert_eq!(hierarchy.node_at(key, 15.0, 15.0), None);
    }

    #[tokio::test]
    async fn empty_snapshot_is_not_an_error() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        hierarchy.add_cell(3, -1, GraphMode::Union).unwrap();
        let effects = settle(&mut hierarchy, &gateway).await;

        assert!(!effects.iter().any(|effect| matches!(effect, Effect::Notify(_))));
        let key = CellKey::new(3, -1);
        assert_eq!(hierarchy.cell(key).unwrap().load_state(), LoadState::Empty);
        assert_eq!(hierarchy.session().metrics().len(), 1);
    }

    #[tokio::test]
    async fn loaded_snapshots_feed_colors_and_history() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        settle(&mut hierarchy, &gateway).await;

        assert_eq!(hierarchy.session().visited().count(3), 2);
        assert_eq!(hierarchy.cell_color(CellKey::new(3, 0)), crate::color::WHITE);

        hierarchy.set_color_metric(Some("density".to_string()));
        assert_ne!(
            hierarchy.cell_color(CellKey::new(3, 0)),
            hierarchy.cell_color(CellKey::new(3, 1))
        );
        assert!(hierarchy.legend().is_some());

        hierarchy.set_color_metric(Some(String::new()));
        assert!(hierarchy.legend().is_none());
    }

    #[tokio::test]
    async fn selecting_needs_a_loaded_snapshot() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        let key = CellKey::new(3, 0);
        assert_eq!(
            hierarchy.select_snapshot(key),
            Err(ValidationError::SnapshotNotLoaded {
                level: 3,
                position: 0,
            })
        );

        settle(&mut hierarchy, &gateway).await;
        hierarchy.select_snapshot(key).unwrap();
        let selected = hierarchy.session().selected().unwrap();
        assert_eq!(selected.embedding, vec![3.0, 0.0]);
        assert_eq!(selected.span.start, origin());
    }

    #[tokio::test]
    async fn selection_collapses_previous_contents() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        hierarchy.toggle_level(2).unwrap();
        settle(&mut hierarchy, &gateway).await;

        hierarchy
            .apply_selection(&[SnapshotChoice {
                level: 3,
                position: 5,
                graph_mode: GraphMode::Intersection,
            }])
            .unwrap();

        assert_eq!(hierarchy.session().active_levels(), &BTreeSet::from([3]));
        assert!(!hierarchy.level(2).unwrap().is_visible());
        let level = hierarchy.level(3).unwrap();
        let chosen = level.cell(5).unwrap();
        assert_eq!(chosen.graph_mode(), GraphMode::Intersection);
        assert!(!chosen.is_abstract());
        assert!(level.cell(0).unwrap().is_abstract());
        assert!(level.cell(1).unwrap().is_abstract());
        assert!(!level.is_abstract());
    }

    #[test]
    fn selection_reuses_an_existing_cell() {
        let mut hierarchy = controller(3);
        hierarchy
            .apply_selection(&[SnapshotChoice {
                level: 3,
                position: 0,
                graph_mode: GraphMode::Disjoint,
            }])
            .unwrap();
        let level = hierarchy.level(3).unwrap();
        assert_eq!(level.positions(), vec![0]);
        assert_eq!(level.cell(0).unwrap().graph_mode(), GraphMode::Disjoint);
        assert!(!level.cell(0).unwrap().is_abstract());
    }

    #[test]
    fn selection_with_unknown_level_changes_nothing() {
        let mut hierarchy = controller(3);
        let result = hierarchy.apply_selection(&[SnapshotChoice {
            level: 8,
            position: 0,
            graph_mode: GraphMode::Union,
        }]);
        assert_eq!(result, Err(ValidationError::UnknownLevel(8)));
        assert_eq!(hierarchy.session().active_levels(), &BTreeSet::from([3]));
    }

    #[test]
    fn neighbor_probe_extends_the_outermost_cell() {
        let mut hierarchy = controller(3);
        let left = hierarchy.neighbor_probe(3, Side::Left).unwrap();
        let right = hierarchy.neighbor_probe(3, Side::Right).unwrap();
        assert_eq!((left.position, right.position), (-1, 1));

        assert!(!hierarchy.add_neighbor_cell(right, false));
        assert!(hierarchy.add_neighbor_cell(right, true));
        assert!(!hierarchy.add_neighbor_cell(right, true));
        assert_eq!(hierarchy.neighbor_probe(3, Side::Right).unwrap().position, 2);
    }

    #[test]
    fn snapshot_lookup_activates_its_level() {
        let mut hierarchy = controller(3);
        hierarchy.add_snapshot(2, 7).unwrap();
        assert!(hierarchy.level(2).unwrap().is_visible());
        assert_eq!(hierarchy.level(2).unwrap().positions(), vec![7]);
    }

    #[test]
    fn stale_collapse_ticket_does_nothing() {
        let mut hierarchy = controller_with(3, &auto_collapse_config(1, 6));
        let first = last_collapse_ticket(&hierarchy.take_effects()).unwrap();

        hierarchy.toggle_level(2).unwrap();
        let current = last_collapse_ticket(&hierarchy.take_effects()).unwrap();
        assert_ne!(first, current);

        assert!(!hierarchy.fire_collapse(first));
        assert!(!hierarchy.level(3).unwrap().is_abstract());

        assert!(hierarchy.fire_collapse(current));
        assert!(hierarchy.level(3).unwrap().is_abstract());
        assert!(!hierarchy.level(2).unwrap().is_abstract());

        let next = last_collapse_ticket(&hierarchy.take_effects()).unwrap();
        assert!(!hierarchy.fire_collapse(next));
    }

    #[test]
    fn disabling_auto_collapse_cancels_pending_ticks() {
        let mut hierarchy = controller_with(3, &auto_collapse_config(0, 0));
        let ticket = last_collapse_ticket(&hierarchy.take_effects()).unwrap();
        hierarchy.set_auto_collapse(false);
        assert!(!hierarchy.fire_collapse(ticket));
        assert!(!hierarchy.level(3).unwrap().is_abstract());
    }

    #[test]
    fn crowded_level_collapses_leftmost_cell() {
        let mut hierarchy = controller_with(3, &auto_collapse_config(6, 2));
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        let stale = last_level_ticket(&hierarchy.take_effects(), 3).unwrap();
        hierarchy.add_cell(3, 2, GraphMode::Union).unwrap();
        let current = last_level_ticket(&hierarchy.take_effects(), 3).unwrap();

        assert!(!hierarchy.fire_level_collapse(3, stale));
        assert!(hierarchy.fire_level_collapse(3, current));
        let level = hierarchy.level(3).unwrap();
        assert!(level.cell(0).unwrap().is_abstract());
        assert_eq!(level.visible_concrete_cells(), 2);

        let next = last_level_ticket(&hierarchy.take_effects(), 3).unwrap();
        assert!(!hierarchy.fire_level_collapse(3, next));
    }

    #[test]
    fn level_ticket_from_before_a_reset_stays_stale() {
        let mut hierarchy = controller_with(3, &auto_collapse_config(6, 0));
        let before = last_level_ticket(&hierarchy.take_effects(), 3).unwrap();

        hierarchy.reset_to_default();
        let after = last_level_ticket(&hierarchy.take_effects(), 3).unwrap();
        assert_ne!(before, after);

        assert!(!hierarchy.fire_level_collapse(3, before));
        assert!(!hierarchy.cell(CellKey::new(3, 0)).unwrap().is_abstract());
        assert!(hierarchy.fire_level_collapse(3, after));
    }

    #[tokio::test]
    async fn playback_ticket_of_a_removed_cell_stays_stale() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        hierarchy.change_visualization_mode(VisualizationMode::Animation);
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        settle(&mut hierarchy, &gateway).await;
        let key = CellKey::new(3, 1);
        hierarchy.toggle_playback(key).unwrap();
        let old = playback_ticket(&hierarchy.take_effects()).unwrap();

        hierarchy.remove_cell(key).unwrap();
        hierarchy.add_cell(3, 1, GraphMode::Union).unwrap();
        settle(&mut hierarchy, &gateway).await;
        hierarchy.toggle_playback(key).unwrap();
        let fresh = playback_ticket(&hierarchy.take_effects()).unwrap();

        assert_ne!(old, fresh);
        assert!(!hierarchy.fire_playback(key, old));
        assert_eq!(hierarchy.cell(key).unwrap().frame_index(), 1);
        assert!(hierarchy.fire_playback(key, fresh));
    }

    #[tokio::test]
    async fn stopped_playback_ignores_its_old_ticket() {
        let gateway = MockGateway::default();
        let mut hierarchy = controller(3);
        let key = CellKey::new(3, 0);
        settle(&mut hierarchy, &gateway).await;
        assert_eq!(
            hierarchy.toggle_playback(key),
            Err(ValidationError::NoAnimationFrames)
        );

        hierarchy.change_visualization_mode(VisualizationMode::Animation);
        settle(&mut hierarchy, &gateway).await;

        assert_eq!(hierarchy.toggle_playback(key), Ok(Playback::Playing));
        let ticket = playback_ticket(&hierarchy.take_effects()).unwrap();
        assert_eq!(hierarchy.cell(key).unwrap().frame_index(), 1);

        assert!(hierarchy.fire_playback(key, ticket));
        assert_eq!(hierarchy.cell(key).unwrap().frame_index(), 2);

        assert_eq!(hierarchy.toggle_playback(key), Ok(Playback::Stopped));
        assert!(!hierarchy.fire_playback(key, ticket));
        assert_eq!(hierarchy.cell(key).unwrap().frame_index(), 2);

        hierarchy.toggle_playback(key).unwrap();
        let restarted = playback_ticket(&hierarchy.take_effects()).unwrap();
        assert_ne!(restarted, ticket);
        assert!(!hierarchy.fire_playback(key, ticket));
        assert!(hierarchy.fire_playback(key, restarted));
    }
}
