//! Similarity plot: visited, visualized, selected and neighbour marks per level.

use crate::config::QUERY_PLOT_HEIGHT;
use crate::explorer::{Explorer, ExplorerCommand};
use crate::hierarchy_view::EDGE_WIDTH;
use crate::theme::*;
use crate::widgets::{button, icon_button, segmented};
use hierarchy::{PlotRow, query_plot::NeighborMarker, query_plot::Segment};
use shared::LevelOrdering;
use zoon::*;

const ZOOM_STEP: f64 = 1.5;
const PAN_STEP: f64 = 80.0;
const VISITED_HEIGHT: f64 = 10.0;
const VISUALIZED_HEIGHT: f64 = 4.0;
const MARKER_SIZE: f64 = 10.0;

pub fn query_plot(explorer: &Explorer) -> impl Element + use<> {
    // Zoom buttons anchor at the middle of what is currently shown.
    let plot_width = Mutable::new(0.0_f64);
    Column::new()
        .s(Width::fill())
        .s(Background::new().color(panel()))
        .s(Borders::new().top(Border::new().width(1).color(border())))
        .item(controls(explorer, plot_width.clone()))
        .item(
            El::new()
                .s(Width::fill())
                .s(Height::exact(QUERY_PLOT_HEIGHT as u32))
                .s(Padding::new().x(EDGE_WIDTH))
                .child(plot_area(explorer, plot_width)),
        )
}

fn controls(explorer: &Explorer, plot_width: Mutable<f64>) -> impl Element + use<> {
    let send = {
        let explorer = explorer.clone();
        move |command: ExplorerCommand| explorer.send(command)
    };
    Row::new()
        .s(Width::fill())
        .s(Padding::new().x(SPACING_8).y(SPACING_4))
        .s(Gap::new().x(SPACING_8))
        .s(Align::new().center_y())
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_12).weight(FontWeight::SemiBold).color(muted_text()))
                .child("Order by"),
        )
        .item(segmented(
            LevelOrdering::ALL.map(|ordering| (ordering, ordering.label())),
            explorer.map(|view| view.plot.ordering),
            {
                let send = send.clone();
                move |ordering| send(ExplorerCommand::PlotOrdering(ordering))
            },
        ))
        .item(El::new().s(Width::fill()))
        .item(icon_button("+", "Zoom in", {
            let send = send.clone();
            let plot_width = plot_width.clone();
            move || {
                send(ExplorerCommand::PlotZoom {
                    factor: ZOOM_STEP,
                    anchor_x: plot_width.get() / 2.0,
                })
            }
        }))
        .item(icon_button("−", "Zoom out", {
            let send = send.clone();
            move || {
                send(ExplorerCommand::PlotZoom {
                    factor: 1.0 / ZOOM_STEP,
                    anchor_x: plot_width.get() / 2.0,
                })
            }
        }))
        .item(icon_button("‹", "Pan left", {
            let send = send.clone();
            move || send(ExplorerCommand::PlotPan(PAN_STEP))
        }))
        .item(icon_button("›", "Pan right", {
            let send = send.clone();
            move || send(ExplorerCommand::PlotPan(-PAN_STEP))
        }))
        .item(icon_button("⟲", "Reset zoom", {
            let send = send.clone();
            move || send(ExplorerCommand::PlotResetZoom)
        }))
        .item_signal(explorer.map(|view| view.plot.marked_count).map({
            let send = send.clone();
            move |marked| {
                let send = send.clone();
                (marked > 0).then(|| {
                    button(format!("Show {marked} selected"), move || {
                        send(ExplorerCommand::CommitMarkers)
                    })
                })
            }
        }))
}

fn plot_area(explorer: &Explorer, plot_width: Mutable<f64>) -> impl Element + use<> {
    Stack::new()
        .s(Width::fill())
        .s(Height::fill())
        .update_raw_el(move |raw_el| {
            raw_el
                .style("position", "relative")
                .style("overflow", "hidden")
                .on_resize(move |width, _| plot_width.set_neq(f64::from(width)))
        })
        .layers_signal_vec(explorer.map(|view| view.plot.rows.clone()).to_signal_vec().map({
            let explorer = explorer.clone();
            move |row| plot_row(&explorer, row)
        }))
        .layer_signal(explorer.map(|view| view.plot.has_results).map(|has_results| {
            (!has_results).then(|| {
                El::new()
                    .s(Align::new().bottom().right())
                    .s(Padding::all(SPACING_4))
                    .s(Font::new().size(FONT_SIZE_12).color(muted_text()))
                    .child("Select a snapshot and run a similarity search")
            })
        }))
}

fn absolute(x: f64, y: f64, width: f64, height: f64) -> impl FnOnce(RawHtmlEl<web_sys::HtmlElement>) -> RawHtmlEl<web_sys::HtmlElement> {
    move |raw_el| {
        raw_el
            .style("position", "absolute")
            .style("left", &format!("{x}px"))
            .style("top", &format!("{y}px"))
            .style("width", &format!("{}px", width.max(1.0)))
            .style("height", &format!("{height}px"))
    }
}

fn plot_row(explorer: &Explorer, row: PlotRow) -> impl Element + use<> {
    let PlotRow {
        level,
        y,
        visited,
        visualized,
        selected,
        neighbors,
    } = row;
    let mut layers: Vec<RawElOrText> = Vec::new();
    layers.push(
        El::new()
            .s(Font::new().size(FONT_SIZE_12).color(muted_text()))
            .update_raw_el(absolute(-(EDGE_WIDTH as f64), y - 8.0, EDGE_WIDTH as f64, 16.0))
            .child(level.to_string())
            .unify(),
    );
    layers.extend(visited.iter().map(|segment| segment_strip(segment, y, VISITED_HEIGHT, border())));
    layers.extend(
        visualized
            .iter()
            .map(|segment| segment_strip(segment, y, VISUALIZED_HEIGHT, accent())),
    );
    if let Some(x) = selected {
        layers.push(
            El::new()
                .s(Background::new().color(hsluv!(12, 90, 55)))
                .update_raw_el(absolute(x - 1.0, y - VISITED_HEIGHT, 2.0, 2.0 * VISITED_HEIGHT))
                .update_raw_el(|raw_el| raw_el.attr("title", "Selected snapshot"))
                .unify(),
        );
    }
    layers.extend(
        neighbors
            .into_iter()
            .map(|marker| neighbor_marker(explorer, level, y, marker)),
    );
    Stack::new()
        .s(Width::fill())
        .s(Height::fill())
        .update_raw_el(|raw_el| raw_el.style("position", "absolute").style("inset", "0"))
        .layers(layers)
}

fn segment_strip(segment: &Segment, y: f64, height: f64, color: HSLuv) -> RawElOrText {
    El::new()
        .s(Background::new().color(color))
        .update_raw_el(absolute(
            segment.x1,
            y - height / 2.0,
            segment.x2 - segment.x1,
            height,
        ))
        .update_raw_el(|raw_el| raw_el.style("pointer-events", "none"))
        .unify()
}

fn neighbor_marker(explorer: &Explorer, level: u32, y: f64, marker: NeighborMarker) -> RawElOrText {
    let NeighborMarker {
        index,
        x,
        opacity,
        selected,
        tooltip,
    } = marker;
    let explorer = explorer.clone();
    El::new()
        .s(Background::new().color(if selected { accent() } else { hsluv!(0, 0, 30) }))
        .s(RoundedCorners::all_max())
        .s(Cursor::new(CursorIcon::Pointer))
        .update_raw_el(absolute(
            x - MARKER_SIZE / 2.0,
            y - MARKER_SIZE / 2.0,
            MARKER_SIZE,
            MARKER_SIZE,
        ))
        .update_raw_el(move |raw_el| {
            raw_el
                .style("opacity", &opacity.to_string())
                .attr("title", &tooltip)
        })
        .on_click(move || explorer.send(ExplorerCommand::ToggleMarker(level, index)))
        .unify()
}
