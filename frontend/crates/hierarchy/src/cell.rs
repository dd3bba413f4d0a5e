use shared::{GraphMode, GraphPayload, TimeSeriesPoint, TimeSpan, VisualizationMode};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub level: u32,
    pub position: i64,
}

impl CellKey {
    pub const fn new(level: u32, position: i64) -> Self {
        Self { level, position }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}-{}", self.level, self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// Load state of one lazily fetched payload.
///
/// Only the response whose id matches `Pending` may fill the slot; anything
/// else arrived for a request that was superseded.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchSlot<T> {
    #[default]
    Idle,
    Pending(RequestId),
    Loaded(T),
    Failed,
}

impl<T> FetchSlot<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, FetchSlot::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FetchSlot::Pending(_))
    }

    pub fn accepts(&self, id: RequestId) -> bool {
        matches!(self, FetchSlot::Pending(pending) if *pending == id)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            FetchSlot::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// Coarse state shown by the views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loading,
    Empty,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Playback {
    #[default]
    Stopped,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellGeometry {
    pub x: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct Cell {
    key: CellKey,
    graph_mode: GraphMode,
    visualization: VisualizationMode,
    pub(crate) is_abstract: bool,
    pub(crate) visualize: bool,
    pub(crate) geometry: CellGeometry,
    pub(crate) graph: FetchSlot<Option<GraphPayload>>,
    pub(crate) animation: FetchSlot<Vec<GraphPayload>>,
    pub(crate) time_series: FetchSlot<Vec<TimeSeriesPoint>>,
    span: Option<TimeSpan>,
    frame_index: usize,
    playback: Playback,
    playback_ticket: u64,
}

impl Cell {
    pub fn new(key: CellKey, graph_mode: GraphMode, visualization: VisualizationMode) -> Self {
        Self {
            key,
            graph_mode,
            visualization,
            is_abstract: false,
            visualize: true,
            geometry: CellGeometry::default(),
            graph: FetchSlot::Idle,
            animation: FetchSlot::Idle,
            time_series: FetchSlot::Idle,
            span: None,
            frame_index: 0,
            playback: Playback::Stopped,
            playback_ticket: 0,
        }
    }

    pub fn key(&self) -> CellKey {
        self.key
    }

    pub fn graph_mode(&self) -> GraphMode {
        self.graph_mode
    }

    pub fn visualization(&self) -> VisualizationMode {
        self.visualization
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_visible(&self) -> bool {
        self.visualize
    }

    pub fn geometry(&self) -> CellGeometry {
        self.geometry
    }

    /// Time range of the loaded snapshot.
    pub fn span(&self) -> Option<TimeSpan> {
        self.span
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// Loaded graph with at least one node.
    pub fn graph(&self) -> Option<&GraphPayload> {
        self.graph.loaded().and_then(Option::as_ref)
    }

    pub fn frames(&self) -> Option<&[GraphPayload]> {
        self.animation.loaded().map(Vec::as_slice)
    }

    pub fn time_series(&self) -> Option<&[TimeSeriesPoint]> {
        self.time_series.loaded().map(Vec::as_slice)
    }

    pub fn has_animation_payload(&self) -> bool {
        self.animation.loaded().is_some()
    }

    pub fn load_state(&self) -> LoadState {
        match &self.graph {
            FetchSlot::Idle => LoadState::Uninitialized,
            FetchSlot::Pending(_) => LoadState::Loading,
            FetchSlot::Loaded(Some(_)) => LoadState::Loaded,
            FetchSlot::Loaded(None) => LoadState::Empty,
            FetchSlot::Failed => LoadState::Failed,
        }
    }

    /// Drops the graph payload when the mode actually changes.
    pub fn set_graph_mode(&mut self, mode: GraphMode) -> bool {
        if self.graph_mode == mode {
            return false;
        }
        self.graph_mode = mode;
        self.clear_graph();
        true
    }

    /// Switching modes is the retry path: failed payloads go back to idle so
    /// the next render fetches them again.
    pub fn set_visualization(&mut self, mode: VisualizationMode) -> bool {
        if self.visualization == mode {
            return false;
        }
        if mode != VisualizationMode::Animation {
            self.stop_playback();
        }
        self.visualization = mode;
        self.forget_failures();
        true
    }

    fn forget_failures(&mut self) {
        if matches!(self.graph, FetchSlot::Failed) {
            self.graph = FetchSlot::Idle;
        }
        if matches!(self.animation, FetchSlot::Failed) {
            self.animation = FetchSlot::Idle;
        }
        if matches!(self.time_series, FetchSlot::Failed) {
            self.time_series = FetchSlot::Idle;
        }
    }

    pub(crate) fn clear_graph(&mut self) {
        self.graph = FetchSlot::Idle;
        self.time_series = FetchSlot::Idle;
        self.span = None;
    }

    /// Forgets every payload, animation frames included.
    pub(crate) fn reset_data(&mut self) {
        self.clear_graph();
        self.animation = FetchSlot::Idle;
        self.frame_index = 0;
        self.stop_playback();
    }

    pub(crate) fn store_graph(&mut self, payload: Option<GraphPayload>) {
        let payload = payload.filter(|payload| !payload.is_empty());
        self.span = payload.as_ref().and_then(GraphPayload::time_span);
        self.graph = FetchSlot::Loaded(payload);
    }

    pub(crate) fn store_frames(&mut self, frames: Vec<GraphPayload>) {
        if self.frame_index >= frames.len() {
            self.frame_index = 0;
        }
        self.animation = FetchSlot::Loaded(frames);
    }

    pub fn frame_count(&self) -> usize {
        self.frames().map_or(0, <[GraphPayload]>::len)
    }

    pub(crate) fn advance_frame(&mut self) {
        let count = self.frame_count();
        if count > 0 {
            self.frame_index = (self.frame_index + 1) % count;
        }
    }

    /// Starts playback under `ticket`, which the controller draws from a
    /// counter that never repeats, so a re-created cell rejects old ticks.
    pub(crate) fn start_playback(&mut self, ticket: u64) {
        self.playback = Playback::Playing;
        self.playback_ticket = ticket;
    }

    pub(crate) fn stop_playback(&mut self) {
        self.playback = Playback::Stopped;
    }

    pub(crate) fn playback_ticket_is_current(&self, ticket: u64) -> bool {
        self.playback == Playback::Playing && self.playback_ticket == ticket
    }

    pub(crate) fn scrub(&mut self, frame: usize) {
        self.stop_playback();
        let count = self.frame_count();
        self.frame_index = if count == 0 { 0 } else { frame.min(count - 1) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{GraphNode, NodeId, NodeName};

    fn payload() -> GraphPayload {
        GraphPayload {
            graph: None,
            nodes: vec![GraphNode {
                id: NodeId("1".into()),
                name: NodeName::Single("a".into()),
                coord: Some([0.0, 0.0]),
                is_cluster: false,
                degree: None,
                clustering: None,
                degree_centrality: None,
                cluster_size: None,
            }],
            links: Vec::new(),
        }
    }

    #[test]
    fn graph_mode_change_keeps_animation_frames() {
        let mut cell = Cell::new(CellKey::new(3, 0), GraphMode::Union, VisualizationMode::Animation);
        cell.store_graph(Some(payload()));
        cell.store_frames(vec![payload(), payload()]);

        assert!(cell.set_graph_mode(GraphMode::Intersection));
        assert_eq!(cell.load_state(), LoadState::Uninitialized);
        assert!(cell.has_animation_payload());

        assert!(!cell.set_graph_mode(GraphMode::Intersection));
    }

    #[test]
    fn reset_data_clears_both_payloads() {
        let mut cell = Cell::new(CellKey::new(3, 0), GraphMode::Union, VisualizationMode::Graph);
        cell.store_graph(Some(payload()));
        cell.store_frames(vec![payload()]);
        cell.reset_data();
        assert!(cell.graph().is_none());
        assert!(!cell.has_animation_payload());
    }

    #[test]
    fn empty_payload_is_loaded_empty() {
        let mut cell = Cell::new(CellKey::new(2, 1), GraphMode::Union, VisualizationMode::Graph);
        cell.store_graph(Some(GraphPayload::default()));
        assert_eq!(cell.load_state(), LoadState::Empty);
        assert!(cell.span().is_none());
    }

    #[test]
    fn stale_request_is_not_accepted() {
        let slot: FetchSlot<()> = FetchSlot::Pending(RequestId(2));
        assert!(slot.accepts(RequestId(2)));
        assert!(!slot.accepts(RequestId(1)));
        assert!(!FetchSlot::<()>::Idle.accepts(RequestId(2)));
    }

    #[test]
    fn scrub_stops_playback_and_clamps() {
        let mut cell = Cell::new(CellKey::new(2, 0), GraphMode::Union, VisualizationMode::Animation);
        cell.store_frames(vec![payload(), payload(), payload()]);
        let ticket = 7;
        cell.start_playback(ticket);
        cell.advance_frame();
        assert_eq!(cell.frame_index(), 1);

        cell.scrub(10);
        assert_eq!(cell.frame_index(), 2);
        assert_eq!(cell.playback(), Playback::Stopped);
        assert!(!cell.playback_ticket_is_current(ticket));
    }

    #[test]
    fn visualization_change_retries_failed_payloads() {
        let mut cell = Cell::new(CellKey::new(3, 0), GraphMode::Union, VisualizationMode::Graph);
        cell.graph = FetchSlot::Failed;
        cell.time_series = FetchSlot::Failed;

        assert!(!cell.set_visualization(VisualizationMode::Graph));
        assert_eq!(cell.load_state(), LoadState::Failed);

        assert!(cell.set_visualization(VisualizationMode::Matrix));
        assert_eq!(cell.load_state(), LoadState::Uninitialized);
        assert!(cell.time_series.is_idle());
    }

    #[test]
    fn visualization_change_keeps_loaded_payloads() {
        let mut cell = Cell::new(CellKey::new(3, 0), GraphMode::Union, VisualizationMode::Graph);
        cell.store_graph(Some(payload()));
        cell.animation = FetchSlot::Failed;

        assert!(cell.set_visualization(VisualizationMode::Animation));
        assert_eq!(cell.load_state(), LoadState::Loaded);
        assert!(cell.animation.is_idle());
    }
}
