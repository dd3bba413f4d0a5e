//! Side toolbar: view settings, node filter, interval lookup and similarity search.

use crate::config::TOOLBAR_WIDTH;
use crate::explorer::{Explorer, ExplorerCommand, NodeOption};
use crate::theme::*;
use crate::widgets::{button, caption, section, segmented, text_input, toggle_button};
use hierarchy::{Legend, ToolbarAction};
use shared::{GraphMode, MatrixOrder, NodeMetric, VisualizationMode};
use zoon::*;

/// Node list entries shown at once; the query narrows the rest.
const MAX_LISTED_NODES: usize = 50;

pub fn toolbar(explorer: &Explorer) -> impl Element + use<> {
    Column::new()
        .s(Width::exact(TOOLBAR_WIDTH as u32))
        .s(Height::fill())
        .s(Padding::all(SPACING_12))
        .s(Gap::new().y(SPACING_16))
        .s(Background::new().color(panel()))
        .s(Borders::new().right(Border::new().width(1).color(border())))
        .s(Scrollbars::y_and_clip_x())
        .item(status(explorer))
        .item(view_settings(explorer))
        .item(section("Auto collapse", false, {
            let explorer = explorer.clone();
            move || auto_collapse(&explorer)
        }))
        .item(section("Node filter", false, {
            let explorer = explorer.clone();
            move || node_filter(&explorer)
        }))
        .item(section("Time interval", false, {
            let explorer = explorer.clone();
            move || interval_form(&explorer)
        }))
        .item(section("Similarity search", true, {
            let explorer = explorer.clone();
            move || search_form(&explorer)
        }))
}

fn status(explorer: &Explorer) -> impl Element + use<> {
    Row::new()
        .s(Gap::new().x(SPACING_8))
        .s(Align::new().center_y())
        .item(
            El::new()
                .s(Font::new().size(FONT_SIZE_16).weight(FontWeight::SemiBold).color(text()))
                .child("Hierarchy Explorer"),
        )
        .item_signal(explorer.map(|view| view.pending).map(|pending| {
            (pending > 0).then(|| {
                El::new()
                    .s(Font::new().size(FONT_SIZE_12).color(accent()))
                    .child(format!("Loading ({pending})"))
            })
        }))
}

fn view_settings(explorer: &Explorer) -> impl Element + use<> {
    let send = {
        let explorer = explorer.clone();
        move |action: ToolbarAction| explorer.send(ExplorerCommand::Toolbar(action))
    };
    Column::new()
        .s(Gap::new().y(SPACING_8))
        .item(caption("Visualization"))
        .item(segmented(
            VisualizationMode::ALL.map(|mode| (mode, mode.as_str())),
            explorer.map(|view| view.visualization),
            {
                let send = send.clone();
                move |mode| send(ToolbarAction::Visualization(mode))
            },
        ))
        .item(caption("Graph mode"))
        .item(segmented(
            GraphMode::ALL.map(|mode| (mode, mode.as_str())),
            explorer.map(|view| view.graph_mode),
            {
                let send = send.clone();
                move |mode| send(ToolbarAction::GraphMode(mode))
            },
        ))
        .item(caption("Color metric"))
        .item(metric_selector(explorer))
        .item_signal(explorer.map(|view| view.legend.clone()).map(|legend| legend.map(legend_bar)))
        .item(caption("Matrix order"))
        .item(segmented(
            MatrixOrder::ALL.map(|order| (order, order.label())),
            explorer.map(|view| view.matrix_order),
            {
                let send = send.clone();
                move |order| send(ToolbarAction::MatrixOrder(order))
            },
        ))
        .item(caption("Node size"))
        .item(segmented(
            std::iter::once((None, "Uniform"))
                .chain(NodeMetric::ALL.map(|metric| (Some(metric), metric.label()))),
            explorer.map(|view| view.node_size),
            {
                let send = send.clone();
                move |metric| send(ToolbarAction::NodeSize(metric))
            },
        ))
        .item(
            Row::new()
                .s(Gap::new().x(SPACING_8))
                .item(toggle_button("Cluster", explorer.map(|view| view.cluster), {
                    let explorer = explorer.clone();
                    move || explorer.send(ExplorerCommand::ToggleCluster)
                }))
                .item(button("Reset", {
                    let send = send.clone();
                    move || send(ToolbarAction::Reset)
                })),
        )
}

fn metric_selector(explorer: &Explorer) -> impl Element + use<> {
    let select = {
        let explorer = explorer.clone();
        move |metric: Option<String>| {
            explorer.send(ExplorerCommand::Toolbar(ToolbarAction::ColorMetric(metric)))
        }
    };
    Row::new()
        .s(Gap::new().x(2).y(2))
        .multiline()
        .item(toggle_button(
            "none",
            explorer.map(|view| view.color_metric.is_none()),
            {
                let select = select.clone();
                move || select(None)
            },
        ))
        .items_signal_vec(
            explorer
                .map(|view| view.toolbar.metric_options.clone())
                .to_signal_vec()
                .map({
                    let explorer = explorer.clone();
                    move |metric| {
                        let selected = {
                            let metric = metric.clone();
                            explorer.map(move |view| view.color_metric.as_deref() == Some(metric.as_str()))
                        };
                        let select = select.clone();
                        toggle_button(metric.clone(), selected, move || select(Some(metric.clone())))
                    }
                }),
        )
}

fn legend_bar(legend: Legend) -> impl Element {
    let swatch = |color| {
        El::new()
            .s(Width::exact(14))
            .s(Height::exact(14))
            .s(Borders::all(Border::new().width(1).color(border())))
            .update_raw_el(move |raw_el| raw_el.style("background-color", &css(color)))
    };
    let [low, high] = legend.swatches;
    let [low_label, high_label] = legend.labels;
    Row::new()
        .s(Gap::new().x(SPACING_4))
        .s(Font::new().size(FONT_SIZE_12).color(muted_text()))
        .item(swatch(low))
        .item(low_label)
        .item(swatch(high))
        .item(high_label)
}

fn auto_collapse(explorer: &Explorer) -> impl Element + use<> {
    let send_limit = |explorer: &Explorer, max_levels: bool| {
        let explorer = explorer.clone();
        move |text: String| {
            // Ignore partial input; the field shows the last accepted value.
            let Ok(limit) = text.trim().parse::<usize>() else {
                return;
            };
            let action = if max_levels {
                ToolbarAction::MaxLevels(limit)
            } else {
                ToolbarAction::MaxCells(limit)
            };
            explorer.send(ExplorerCommand::Toolbar(action));
        }
    };
    Column::new()
        .s(Gap::new().y(SPACING_8))
        .item(segmented(
            [(true, "on"), (false, "off")],
            explorer.map(|view| view.auto_collapse),
            {
                let explorer = explorer.clone();
                move |enabled| explorer.send(ExplorerCommand::Toolbar(ToolbarAction::AutoCollapse(enabled)))
            },
        ))
        .item(labeled(
            "Max levels",
            text_input(
                "max levels",
                explorer.map(|view| view.max_levels.to_string()),
                send_limit(explorer, true),
            ),
        ))
        .item(labeled(
            "Max cells",
            text_input(
                "max cells",
                explorer.map(|view| view.max_cells.to_string()),
                send_limit(explorer, false),
            ),
        ))
}

fn labeled(label: &'static str, input: impl Element) -> impl Element {
    Row::new()
        .s(Gap::new().x(SPACING_8))
        .s(Align::new().center_y())
        .item(
            El::new()
                .s(Width::exact(80))
                .s(Font::new().size(FONT_SIZE_12).color(muted_text()))
                .child(label),
        )
        .item(input)
}

fn node_filter(explorer: &Explorer) -> impl Element + use<> {
    Column::new()
        .s(Gap::new().y(SPACING_8))
        .item(button("Load nodes", {
            let explorer = explorer.clone();
            move || explorer.send(ExplorerCommand::LoadNodes)
        }))
        .item(text_input(
            "Search nodes",
            explorer.map(|view| view.toolbar.node_query.clone()),
            {
                let explorer = explorer.clone();
                move |query| explorer.send(ExplorerCommand::NodeQuery(query))
            },
        ))
        .item(
            Column::new()
                .s(Scrollbars::y_and_clip_x())
                .update_raw_el(|raw_el| raw_el.style("max-height", "200px"))
                .items_signal_vec(
                    explorer
                        .map(|view| {
                            view.toolbar
                                .nodes
                                .iter()
                                .take(MAX_LISTED_NODES)
                                .cloned()
                                .collect::<Vec<_>>()
                        })
                        .to_signal_vec()
                        .map({
                            let explorer = explorer.clone();
                            move |node| node_row(&explorer, node)
                        }),
                ),
        )
        .item(button("Apply filter", {
            let explorer = explorer.clone();
            move || explorer.send(ExplorerCommand::ApplyNodeFilter)
        }))
}

fn node_row(explorer: &Explorer, node: NodeOption) -> impl Element + use<> {
    let NodeOption { id, name, selected } = node;
    let explorer = explorer.clone();
    Row::new()
        .s(Gap::new().x(SPACING_4))
        .s(Cursor::new(CursorIcon::Pointer))
        .s(Font::new()
            .size(FONT_SIZE_12)
            .color(if selected { accent() } else { text() }))
        .on_click(move || explorer.send(ExplorerCommand::ToggleNode(id.clone())))
        .item(if selected { "☑" } else { "☐" })
        .item(name)
}

fn interval_form(explorer: &Explorer) -> impl Element + use<> {
    Column::new()
        .s(Gap::new().y(SPACING_8))
        .item(labeled(
            "Start",
            text_input(
                "YYYY-MM-DDTHH:MM",
                explorer.map(|view| view.toolbar.interval_start.clone()),
                {
                    let explorer = explorer.clone();
                    move |text| explorer.send(ExplorerCommand::IntervalStart(text))
                },
            ),
        ))
        .item(labeled(
            "End",
            text_input(
                "YYYY-MM-DDTHH:MM",
                explorer.map(|view| view.toolbar.interval_end.clone()),
                {
                    let explorer = explorer.clone();
                    move |text| explorer.send(ExplorerCommand::IntervalEnd(text))
                },
            ),
        ))
        .item(button("Find snapshot", {
            let explorer = explorer.clone();
            move || explorer.send(ExplorerCommand::SubmitInterval)
        }))
}

fn search_form(explorer: &Explorer) -> impl Element + use<> {
    Column::new()
        .s(Gap::new().y(SPACING_8))
        .item(caption("Levels"))
        .item(
            Row::new()
                .s(Gap::new().x(2).y(2))
                .multiline()
                .items_signal_vec(
                    explorer
                        .map(|view| (2..=view.height).rev().collect::<Vec<u32>>())
                        .to_signal_vec()
                        .map({
                            let explorer = explorer.clone();
                            move |level| {
                                let active =
                                    explorer.map(move |view| view.toolbar.search_levels.contains(&level));
                                let explorer = explorer.clone();
                                toggle_button(level.to_string(), active, move || {
                                    explorer.send(ExplorerCommand::ToggleSearchLevel(level))
                                })
                            }
                        }),
                ),
        )
        .item(labeled(
            "Neighbours",
            text_input("k", explorer.map(|view| view.toolbar.search_k.to_string()), {
                let explorer = explorer.clone();
                move |text| {
                    if let Ok(k) = text.trim().parse::<u32>() {
                        explorer.send(ExplorerCommand::SearchK(k));
                    }
                }
            }),
        ))
        .item(button("Search", {
            let explorer = explorer.clone();
            move || explorer.send(ExplorerCommand::Search)
        }))
}
