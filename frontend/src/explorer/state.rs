//! Everything the explorer Actor owns, as plain synchronous state.
//!
//! Commands from the views, backend replies and timer ticks go in; the
//! resulting [`Job`]s and [`Notification`]s are drained by the Actor, which
//! performs them and feeds the outcome back as a [`BackendReply`] or
//! [`TimerFired`].

use crate::config::QUERY_PLOT_HEIGHT;
use hierarchy::{
    CellKey, Completion, Effect, FetchRequest, GatewayError, HierarchyController,
    HierarchyIndicator, NeighborProbe, Notification, QueryPlotController, RequestId,
    SearchQuery, Side, Ticket, Timeline, ToolbarAction, ToolbarController, ValidationError,
    Viewport,
};
use shared::{
    AppConfig, GraphMode, HierarchyMeta, IntervalHit, LevelOrdering, NodeEntry, NodeId,
    SearchResults, TimeSpan, VisualizationMode,
};

/// User intent, emitted by the views.
#[derive(Debug, Clone, PartialEq)]
pub enum ExplorerCommand {
    Toolbar(ToolbarAction),
    ToggleCluster,
    ToggleLevel(u32),
    ToggleLevelAbstract(u32),
    AddNeighbor(u32, Side),
    ToggleCellAbstract(CellKey),
    CellGraphMode(CellKey, GraphMode),
    CellVisualization(CellKey, VisualizationMode),
    RemoveCell(CellKey),
    SelectSnapshot(CellKey),
    TogglePlayback(CellKey),
    Scrub(CellKey, usize),
    HoverCell(Option<CellKey>),
    /// Pointer press inside a cell, in cell coordinates.
    NodeClicked { cell: CellKey, x: f64, y: f64 },
    Resize { width: f64, height: f64 },
    LoadNodes,
    NodeQuery(String),
    ToggleNode(NodeId),
    ApplyNodeFilter,
    IntervalStart(String),
    IntervalEnd(String),
    SubmitInterval,
    ToggleSearchLevel(u32),
    SearchK(u32),
    Search,
    ToggleMarker(u32, usize),
    CommitMarkers,
    PlotOrdering(LevelOrdering),
    PlotZoom { factor: f64, anchor_x: f64 },
    PlotPan(f64),
    PlotResetZoom,
}

/// Work the Actor performs outside the state.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Fetch(FetchRequest),
    Probe { probe: NeighborProbe, request: RequestId },
    Search { query: SearchQuery, request: RequestId },
    IntervalLookup { span: TimeSpan, request: RequestId },
    LoadNodes { request: RequestId },
    FilterNodes { ids: Vec<NodeId>, request: RequestId },
    Timer { delay_ms: u32, timer: TimerFired },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    Fetched(Completion),
    Probed {
        probe: NeighborProbe,
        request: RequestId,
        result: Result<bool, GatewayError>,
    },
    Searched {
        request: RequestId,
        result: Result<SearchResults, GatewayError>,
    },
    IntervalFound {
        request: RequestId,
        result: Result<IntervalHit, GatewayError>,
    },
    NodesLoaded {
        request: RequestId,
        result: Result<Vec<NodeEntry>, GatewayError>,
    },
    Filtered {
        request: RequestId,
        result: Result<(), GatewayError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerFired {
    Collapse(Ticket),
    LevelCollapse(u32, Ticket),
    Playback(CellKey, Ticket),
}

pub struct ExplorerState {
    pub(super) hierarchy: HierarchyController,
    pub(super) toolbar: ToolbarController,
    pub(super) query_plot: QueryPlotController,
    pub(super) timeline: Timeline,
    pub(super) indicator: HierarchyIndicator,
    jobs: Vec<Job>,
    notifications: Vec<Notification>,
}

impl ExplorerState {
    pub fn new(
        meta: HierarchyMeta,
        config: &AppConfig,
        viewport: Viewport,
    ) -> Result<Self, ValidationError> {
        let hierarchy = HierarchyController::new(meta, config, viewport)?;
        let timeline = Timeline::new(hierarchy.span(), viewport.width);
        let mut state = Self {
            toolbar: ToolbarController::new(),
            query_plot: QueryPlotController::new(viewport.width, QUERY_PLOT_HEIGHT),
            indicator: HierarchyIndicator::new(config.layout.indicator_width),
            timeline,
            hierarchy,
            jobs: Vec::new(),
            notifications: Vec::new(),
        };
        state.timeline.rebuild(&state.hierarchy);
        Ok(state)
    }

    fn reject(&mut self, error: &ValidationError) {
        log::debug!("[EXPLORER] Rejected: {error}");
        self.notifications.push(Notification::from(error));
    }

    fn check(&mut self, result: Result<(), ValidationError>) {
        if let Err(error) = result {
            self.reject(&error);
        }
    }

    fn backend_failed(&mut self, error: &GatewayError) {
        self.notifications.push(Notification::from(error));
    }

    pub fn handle_command(&mut self, command: ExplorerCommand) {
        let hierarchy = &mut self.hierarchy;
        match command {
            ExplorerCommand::Toolbar(action) => self.toolbar.dispatch(hierarchy, action),
            ExplorerCommand::ToggleCluster => {
                let cluster = !hierarchy.cluster();
                self.toolbar.dispatch(hierarchy, ToolbarAction::Cluster(cluster));
            }
            ExplorerCommand::ToggleLevel(level) => {
                let result = self.indicator.toggle(hierarchy, level);
                self.check(result);
            }
            ExplorerCommand::ToggleLevelAbstract(level) => {
                let result = hierarchy.toggle_level_abstract(level);
                self.check(result);
            }
            ExplorerCommand::AddNeighbor(level, side) => match hierarchy.neighbor_probe(level, side) {
                Ok(probe) => {
                    let request = hierarchy.begin_request();
                    self.jobs.push(Job::Probe { probe, request });
                }
                Err(error) => self.reject(&error),
            },
            ExplorerCommand::ToggleCellAbstract(key) => {
                let result = hierarchy.toggle_cell_abstract(key);
                self.check(result);
            }
            ExplorerCommand::CellGraphMode(key, mode) => {
                let result = hierarchy.set_cell_graph_mode(key, mode);
                self.check(result);
            }
            ExplorerCommand::CellVisualization(key, mode) => {
                let result = hierarchy.set_cell_visualization(key, mode);
                self.check(result);
            }
            ExplorerCommand::RemoveCell(key) => {
                let result = hierarchy.remove_cell(key);
                self.check(result);
            }
            ExplorerCommand::SelectSnapshot(key) => {
                let result = hierarchy.select_snapshot(key);
                self.check(result);
            }
            ExplorerCommand::TogglePlayback(key) => {
                let result = hierarchy.toggle_playback(key).map(|_| ());
                self.check(result);
            }
            ExplorerCommand::Scrub(key, frame) => {
                let result = hierarchy.scrub(key, frame);
                self.check(result);
            }
            ExplorerCommand::HoverCell(Some(key)) => {
                self.timeline.hover(key);
                return;
            }
            ExplorerCommand::HoverCell(None) => {
                self.timeline.clear_hover();
                return;
            }
            ExplorerCommand::NodeClicked { cell, x, y } => {
                let Some(id) = hierarchy.node_at(cell, x, y) else {
                    return;
                };
                log::debug!("[EXPLORER] Node {} picked for the filter", id.0);
                self.toolbar.pick_node(id);
                return;
            }
            ExplorerCommand::Resize { width, height } => {
                hierarchy.set_viewport(Viewport { width, height });
                self.timeline.set_width(width);
                self.query_plot.resize(width, QUERY_PLOT_HEIGHT);
            }
            ExplorerCommand::LoadNodes => {
                let request = hierarchy.begin_request();
                self.jobs.push(Job::LoadNodes { request });
            }
            ExplorerCommand::NodeQuery(query) => self.toolbar.set_node_query(query),
            ExplorerCommand::ToggleNode(id) => self.toolbar.toggle_node(id),
            ExplorerCommand::ApplyNodeFilter => {
                let ids = self.toolbar.selected_nodes();
                let request = hierarchy.begin_request();
                self.jobs.push(Job::FilterNodes { ids, request });
            }
            ExplorerCommand::IntervalStart(text) => self.toolbar.set_interval_start(text),
            ExplorerCommand::IntervalEnd(text) => self.toolbar.set_interval_end(text),
            ExplorerCommand::SubmitInterval => {
                match self.toolbar.interval_request(hierarchy.span()) {
                    Ok(span) => {
                        let request = hierarchy.begin_request();
                        self.jobs.push(Job::IntervalLookup { span, request });
                    }
                    Err(error) => self.reject(&error),
                }
            }
            ExplorerCommand::ToggleSearchLevel(level) => self.toolbar.toggle_search_level(level),
            ExplorerCommand::SearchK(k) => self.toolbar.set_search_k(k),
            ExplorerCommand::Search => {
                let levels = self.toolbar.search_levels();
                let k = self.toolbar.search_k();
                match self.query_plot.prepare_search(hierarchy, &levels, k) {
                    Ok(query) => {
                        let request = hierarchy.begin_request();
                        self.jobs.push(Job::Search { query, request });
                    }
                    Err(error) => self.reject(&error),
                }
            }
            ExplorerCommand::ToggleMarker(level, index) => self.query_plot.toggle_marker(level, index),
            ExplorerCommand::CommitMarkers => {
                let result = self.query_plot.commit_selection(hierarchy);
                self.check(result);
            }
            ExplorerCommand::PlotOrdering(ordering) => self.query_plot.reorder(ordering),
            ExplorerCommand::PlotZoom { factor, anchor_x } => self.query_plot.zoom_at(factor, anchor_x),
            ExplorerCommand::PlotPan(dx) => self.query_plot.pan(dx),
            ExplorerCommand::PlotResetZoom => self.query_plot.reset_zoom(),
        }
        self.timeline.rebuild(&self.hierarchy);
    }

    pub fn handle_reply(&mut self, reply: BackendReply) {
        match reply {
            BackendReply::Fetched(completion) => self.hierarchy.complete(completion),
            BackendReply::Probed {
                probe,
                request,
                result,
            } => {
                self.hierarchy.finish_request(request);
                match result {
                    Ok(exists) => {
                        if !self.hierarchy.add_neighbor_cell(probe, exists) && !exists {
                            self.notifications.push(Notification::info(
                                "No Snapshot",
                                format!(
                                    "Level {} has no snapshot at position {}",
                                    probe.level, probe.position
                                ),
                            ));
                        }
                    }
                    Err(error) => self.backend_failed(&error),
                }
            }
            BackendReply::Searched { request, result } => {
                self.hierarchy.finish_request(request);
                match result {
                    Ok(results) => self.query_plot.apply_results(results),
                    Err(error) => self.backend_failed(&error),
                }
            }
            BackendReply::IntervalFound { request, result } => {
                self.hierarchy.finish_request(request);
                match result {
                    Ok(hit) => {
                        let result = self.toolbar.finish_interval(&mut self.hierarchy, hit);
                        self.check(result);
                    }
                    Err(error) => self.backend_failed(&error),
                }
            }
            BackendReply::NodesLoaded { request, result } => {
                self.hierarchy.finish_request(request);
                match result {
                    Ok(nodes) => self.toolbar.set_nodes(nodes),
                    Err(error) => self.backend_failed(&error),
                }
            }
            BackendReply::Filtered { request, result } => {
                self.hierarchy.finish_request(request);
                match result {
                    Ok(()) => self.toolbar.finish_filter(&mut self.hierarchy),
                    Err(error) => self.backend_failed(&error),
                }
            }
        }
        self.timeline.rebuild(&self.hierarchy);
    }

    pub fn handle_timer(&mut self, timer: TimerFired) {
        let changed = match timer {
            TimerFired::Collapse(ticket) => self.hierarchy.fire_collapse(ticket),
            TimerFired::LevelCollapse(level, ticket) => {
                self.hierarchy.fire_level_collapse(level, ticket)
            }
            TimerFired::Playback(key, ticket) => self.hierarchy.fire_playback(key, ticket),
        };
        if changed {
            self.timeline.rebuild(&self.hierarchy);
        }
    }

    /// Drains the queued jobs, the controller's effects included, and the
    /// notifications to show.
    pub fn take_work(&mut self) -> (Vec<Job>, Vec<Notification>) {
        for effect in self.hierarchy.take_effects() {
            match effect {
                Effect::Fetch(request) => self.jobs.push(Job::Fetch(request)),
                Effect::ScheduleCollapse { ticket, delay_ms } => self.jobs.push(Job::Timer {
                    delay_ms,
                    timer: TimerFired::Collapse(ticket),
                }),
                Effect::ScheduleLevelCollapse {
                    level,
                    ticket,
                    delay_ms,
                } => self.jobs.push(Job::Timer {
                    delay_ms,
                    timer: TimerFired::LevelCollapse(level, ticket),
                }),
                Effect::SchedulePlayback {
                    cell,
                    ticket,
                    delay_ms,
                } => self.jobs.push(Job::Timer {
                    delay_ms,
                    timer: TimerFired::Playback(cell, ticket),
                }),
                Effect::Notify(notification) => self.notifications.push(notification),
            }
        }
        (
            std::mem::take(&mut self.jobs),
            std::mem::take(&mut self.notifications),
        )
    }
}
