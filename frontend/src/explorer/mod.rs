//! The hierarchy explorer domain: one Actor owning all explorer state.
//!
//! Views send [`ExplorerCommand`]s into `command_issued_relay` and bind to
//! the published [`ExplorerView`]. Backend requests and timers run as local
//! tasks and report back through their own relays, so every state change
//! happens inside the single processing loop.

mod state;
mod view;

pub use state::{BackendReply, ExplorerCommand, ExplorerState, Job, TimerFired};
pub use view::{CellView, ExplorerView, LevelView, NodeOption, PlotView, TimelineView, ToolbarView};

use crate::config::TOAST_DISMISS_MS;
use crate::dataflow::{Actor, Relay, relay};
use crate::error_display::{ErrorAlert, ErrorDisplay};
use crate::gateway::HttpGateway;
use futures::StreamExt;
use gloo_timers::future::TimeoutFuture;
use hierarchy::{DataGateway, ValidationError, Viewport};
use shared::{AppConfig, HierarchyMeta};
use wasm_bindgen_futures::spawn_local;
use zoon::Signal;

#[derive(Clone)]
pub struct Explorer {
    view: Actor<ExplorerView>,
    pub command_issued_relay: Relay<ExplorerCommand>,
}

impl Explorer {
    pub fn new(
        meta: HierarchyMeta,
        config: &AppConfig,
        viewport: Viewport,
        gateway: HttpGateway,
        error_display: ErrorDisplay,
    ) -> Result<Self, ValidationError> {
        let mut state = ExplorerState::new(meta, config, viewport)?;
        let initial_view = state.view();

        let (command_issued_relay, command_issued_stream) = relay::<ExplorerCommand>();
        let (backend_replied_relay, backend_replied_stream) = relay::<BackendReply>();
        let (timer_fired_relay, timer_fired_stream) = relay::<TimerFired>();

        let view = Actor::new(initial_view, async move |view| {
            let mut command_issued_stream = command_issued_stream.fuse();
            let mut backend_replied_stream = backend_replied_stream.fuse();
            let mut timer_fired_stream = timer_fired_stream.fuse();

            let runner = JobRunner {
                gateway,
                backend_replied_relay,
                timer_fired_relay,
            };
            runner.run_all(&mut state, &error_display);
            loop {
                futures::select! {
                    command = command_issued_stream.next() => {
                        match command {
                            Some(command) => state.handle_command(command),
                            None => break,
                        }
                    }
                    reply = backend_replied_stream.next() => {
                        if let Some(reply) = reply {
                            state.handle_reply(reply);
                        }
                    }
                    timer = timer_fired_stream.next() => {
                        if let Some(timer) = timer {
                            state.handle_timer(timer);
                        }
                    }
                }
                runner.run_all(&mut state, &error_display);
                view.set(state.view());
            }
        });

        Ok(Self {
            view,
            command_issued_relay,
        })
    }

    pub fn send(&self, command: ExplorerCommand) {
        self.command_issued_relay.send(command);
    }

    pub fn view_signal(&self) -> impl Signal<Item = ExplorerView> + use<> {
        self.view.signal()
    }

    /// Narrow binding for widgets that only care about part of the view.
    pub fn map<U, F>(&self, f: F) -> impl Signal<Item = U> + use<U, F>
    where
        U: PartialEq + Send + Sync + 'static,
        F: Fn(&ExplorerView) -> U + Send + Sync + 'static,
    {
        self.view.signal_ref(f)
    }
}

/// Starts the local tasks for the jobs the state queued.
struct JobRunner {
    gateway: HttpGateway,
    backend_replied_relay: Relay<BackendReply>,
    timer_fired_relay: Relay<TimerFired>,
}

impl JobRunner {
    fn run_all(&self, state: &mut ExplorerState, error_display: &ErrorDisplay) {
        let (jobs, notifications) = state.take_work();
        for notification in &notifications {
            error_display.show(ErrorAlert::from_notification(notification, TOAST_DISMISS_MS));
        }
        for job in jobs {
            self.run(job);
        }
    }

    fn run(&self, job: Job) {
        let gateway = self.gateway.clone();
        let replied = self.backend_replied_relay.clone();
        match job {
            Job::Fetch(request) => spawn_local(async move {
                replied.send(BackendReply::Fetched(request.execute(&gateway).await));
            }),
            Job::Probe { probe, request } => spawn_local(async move {
                let result = gateway.check_graph(probe.level, probe.position).await;
                replied.send(BackendReply::Probed {
                    probe,
                    request,
                    result,
                });
            }),
            Job::Search { query, request } => spawn_local(async move {
                let result = gateway
                    .search_all_levels(&query.embedding, &query.levels, query.k)
                    .await;
                replied.send(BackendReply::Searched { request, result });
            }),
            Job::IntervalLookup { span, request } => spawn_local(async move {
                let result = gateway.interval_lookup(span).await;
                replied.send(BackendReply::IntervalFound { request, result });
            }),
            Job::LoadNodes { request } => spawn_local(async move {
                let result = gateway.all_nodes().await;
                replied.send(BackendReply::NodesLoaded { request, result });
            }),
            Job::FilterNodes { ids, request } => spawn_local(async move {
                let result = gateway.filter_nodes(&ids).await;
                replied.send(BackendReply::Filtered { request, result });
            }),
            Job::Timer { delay_ms, timer } => {
                let fired = self.timer_fired_relay.clone();
                spawn_local(async move {
                    TimeoutFuture::new(delay_ms).await;
                    fired.send(timer);
                });
            }
        }
    }
}
