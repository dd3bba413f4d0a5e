//! Hierarchy Explorer entry point

use std::sync::OnceLock;
use zoon::*;

/// Stores the main application task handle to prevent it from being dropped.
static MAIN_TASK: OnceLock<TaskHandle> = OnceLock::new();

mod app;
mod cell_canvas;
mod config;
mod dataflow;
mod error_display;
mod error_ui;
mod explorer;
mod gateway;
mod hierarchy_view;
mod indicator_view;
mod logging;
mod query_plot_view;
mod theme;
mod timeline_view;
mod toolbar_view;
mod widgets;

use app::ExplorerApp;

pub fn main() {
    let handle = Task::start_droppable(async {
        let app = ExplorerApp::new().await;
        start_app("app", move || app.root());
    });
    let _ = MAIN_TASK.set(handle);
}
