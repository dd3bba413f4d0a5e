//! ExplorerApp - wires configuration, backend gateway and the explorer domain.

use zoon::*;

use crate::cell_canvas::load_and_register_fonts;
use crate::config::load_config;
use crate::error_display::{ErrorAlert, ErrorDisplay};
use crate::explorer::Explorer;
use crate::gateway::HttpGateway;
use crate::hierarchy_view::hierarchy_panel;
use crate::indicator_view::hierarchy_indicator;
use crate::query_plot_view::query_plot;
use crate::theme::*;
use crate::timeline_view::timeline_bar;
use crate::toolbar_view::toolbar;
use hierarchy::{DataGateway, Viewport};
use shared::AppConfig;

/// What the root shows once startup finished.
enum Startup {
    Ready(Explorer),
    /// The hierarchy metadata could not be loaded; nothing to explore.
    Failed(String),
}

pub struct ExplorerApp {
    pub config: AppConfig,
    pub error_display: ErrorDisplay,
    startup: Startup,
}

impl ExplorerApp {
    pub async fn new() -> Self {
        crate::logging::init();
        load_and_register_fonts().await;

        let config = load_config();
        let error_display = ErrorDisplay::new();
        let gateway = HttpGateway::new(&config.backend.base_url);

        let startup = match gateway.hierarchy_meta().await {
            Ok(meta) => {
                zoon::println!(
                    "[APP] Hierarchy of height {} with {} levels",
                    meta.height,
                    meta.levels.len()
                );
                match Explorer::new(
                    meta,
                    &config,
                    Viewport::default(),
                    gateway,
                    error_display.clone(),
                ) {
                    Ok(explorer) => Startup::Ready(explorer),
                    Err(error) => Startup::Failed(error.to_string()),
                }
            }
            Err(error) => {
                error_display.show(ErrorAlert::new_connection_error(error.to_string()));
                Startup::Failed(error.to_string())
            }
        };

        Self {
            config,
            error_display,
            startup,
        }
    }

    /// Root UI element
    pub fn root(&self) -> impl Element + use<> {
        Stack::new()
            .s(Height::screen())
            .s(Width::fill())
            .s(Background::new().color(background()))
            .s(Font::new().color(text()).family([
                FontFamily::new("Inter"),
                FontFamily::new("system-ui"),
                FontFamily::new("Segoe UI"),
                FontFamily::new("Arial"),
                FontFamily::SansSerif,
            ]))
            .layer(self.main_layout())
            .layer(crate::error_ui::toast_notifications_container(&self.error_display))
    }

    fn main_layout(&self) -> RawElOrText {
        match &self.startup {
            Startup::Ready(explorer) => explorer_layout(explorer, &self.config).unify(),
            Startup::Failed(reason) => startup_failed(reason).unify(),
        }
    }
}

fn explorer_layout(explorer: &Explorer, config: &AppConfig) -> impl Element + use<> {
    Row::new()
        .s(Width::fill())
        .s(Height::fill())
        .item(toolbar(explorer))
        .item(
            Column::new()
                .s(Width::fill())
                .s(Height::fill())
                .item(beside_indicator(
                    config.layout.indicator_width,
                    timeline_bar(explorer, config.layout.timeline_height as u32),
                ))
                .item(
                    Row::new()
                        .s(Width::fill())
                        .s(Height::fill())
                        .item(hierarchy_indicator(explorer, config.layout.indicator_width))
                        .item(hierarchy_panel(explorer)),
                )
                .item(beside_indicator(config.layout.indicator_width, query_plot(explorer))),
        )
}

/// Keeps the timeline and the plot on the x axis of the level rows.
fn beside_indicator(indicator_width: f64, element: impl Element) -> impl Element {
    El::new()
        .s(Width::fill())
        .s(Padding::new().left(indicator_width as u32))
        .child(element)
}

fn startup_failed(reason: &str) -> impl Element + use<> {
    Column::new()
        .s(Align::center())
        .s(Gap::new().y(SPACING_8))
        .s(Padding::all(SPACING_16))
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_16).weight(FontWeight::SemiBold))
                .child("The hierarchy could not be loaded"),
        )
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_14).color(muted_text()).wrap_anywhere())
                .child(reason.to_string()),
        )
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_12).color(muted_text()))
                .child("Start the backend and reload the page."),
        )
}
