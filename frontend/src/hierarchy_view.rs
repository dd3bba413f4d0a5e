//! Level rows and their cells, positioned from the controller's layout.

use crate::cell_canvas::{cell_canvas, fonts_ready};
use crate::explorer::{CellView, Explorer, ExplorerCommand};
use crate::theme::*;
use crate::widgets::icon_button;
use hierarchy::{CellKey, LoadState, Playback, Side};
use shared::{GraphMode, VisualizationMode};
use zoon::*;

/// Width of the add-neighbour strips on both ends of a level row.
pub const EDGE_WIDTH: u32 = 18;

fn px(value: f64) -> String {
    format!("{value}px")
}

pub fn hierarchy_panel(explorer: &Explorer) -> impl Element + use<> {
    El::new()
        .s(Width::fill())
        .s(Height::fill())
        .s(Background::new().color(background()))
        .update_raw_el({
            let explorer = explorer.clone();
            move |raw_el| {
                raw_el
                    .style("position", "relative")
                    .style("overflow", "hidden")
                    .on_resize(move |width, height| {
                        // Level rows get the width left between the two edge strips.
                        explorer.send(ExplorerCommand::Resize {
                            width: (f64::from(width) - 2.0 * f64::from(EDGE_WIDTH)).max(0.0),
                            height: f64::from(height),
                        })
                    })
            }
        })
        .child(
            Stack::new()
                .s(Width::fill())
                .s(Height::fill())
                .layers_signal_vec(
                    explorer
                        .map(|view| view.levels.iter().map(|level| level.index).collect::<Vec<u32>>())
                        .to_signal_vec()
                        .map({
                            let explorer = explorer.clone();
                            move |index| level_row(&explorer, index)
                        }),
                ),
        )
}

fn level_row(explorer: &Explorer, index: u32) -> impl Element + use<> {
    let geometry = explorer
        .map(move |view| view.level(index).map(|level| (level.y, level.height, level.width)))
        .broadcast();
    El::new()
        .update_raw_el(|raw_el| raw_el.style("position", "absolute").style("left", "0"))
        .update_raw_el({
            let top = geometry.signal().map(|geometry| geometry.map(|(y, ..)| px(y)));
            let height = geometry.signal().map(|geometry| geometry.map(|(_, height, ..)| px(height)));
            let width = geometry.signal().map(|geometry| {
                geometry.map(|(_, _, width)| px(width + 2.0 * f64::from(EDGE_WIDTH)))
            });
            move |raw_el| {
                raw_el
                    .style_signal("top", top)
                    .style_signal("height", height)
                    .style_signal("width", width)
            }
        })
        .child(
            Row::new()
                .s(Width::fill())
                .s(Height::fill())
                .item(edge_button(explorer, index, Side::Left))
                .item(
                    El::new()
                        .s(Width::fill())
                        .s(Height::fill())
                        .s(Borders::new()
                            .top(Border::new().width(1).color(border()))
                            .bottom(Border::new().width(1).color(border())))
                        .update_raw_el(|raw_el| raw_el.style("position", "relative"))
                        .child(
                            Stack::new()
                                .s(Width::fill())
                                .s(Height::fill())
                                .layers_signal_vec(
                                    explorer
                                        .map(move |view| {
                                            view.level(index)
                                                .map(|level| {
                                                    level.cells.iter().map(|cell| cell.key).collect()
                                                })
                                                .unwrap_or_else(Vec::<CellKey>::new)
                                        })
                                        .to_signal_vec()
                                        .map({
                                            let explorer = explorer.clone();
                                            move |key| cell_box(&explorer, key)
                                        }),
                                ),
                        ),
                )
                .item(edge_button(explorer, index, Side::Right)),
        )
}

fn edge_button(explorer: &Explorer, index: u32, side: Side) -> impl Element + use<> {
    let (symbol, tooltip) = match side {
        Side::Left => ("‹", "Add the previous snapshot"),
        Side::Right => ("›", "Add the next snapshot"),
    };
    let mut edge = Column::new()
        .s(Width::exact(EDGE_WIDTH))
        .s(Height::fill())
        .s(Gap::new().y(2));
    if side == Side::Left {
        edge = edge.item(icon_button("↕", "Collapse or expand this level", {
            let explorer = explorer.clone();
            move || explorer.send(ExplorerCommand::ToggleLevelAbstract(index))
        }));
    }
    let explorer = explorer.clone();
    edge.item(
        El::new()
            .s(Height::fill())
            .s(Align::new().center_y())
            .child(icon_button(symbol, tooltip, move || {
                explorer.send(ExplorerCommand::AddNeighbor(index, side))
            })),
    )
}

fn cell_box(explorer: &Explorer, key: CellKey) -> impl Element + use<> {
    let cell = explorer.map(move |view| view.cell(key).map(CellFrame::from)).broadcast();
    let (hovered, hovered_signal) = Mutable::new_and_signal(false);
    El::new()
        .update_raw_el({
            let left = cell.signal().map(|cell| cell.map(|cell| px(cell.x)));
            let width = cell.signal().map(|cell| cell.map(|cell| px(cell.width)));
            let background = cell.signal().map(|cell| cell.map(|cell| cell.background));
            let outline = cell.signal().map(|cell| {
                cell.map(|cell| {
                    if cell.selected {
                        "2px solid #3b6fd8"
                    } else {
                        "1px solid #c8c8d0"
                    }
                })
            });
            move |raw_el| {
                raw_el
                    .style("position", "absolute")
                    .style("top", "0")
                    .style("height", "100%")
                    .style("box-sizing", "border-box")
                    .style_signal("left", left)
                    .style_signal("width", width)
                    .style_signal("background-color", background)
                    .style_signal("outline", outline)
            }
        })
        .on_hovered_change({
            let explorer = explorer.clone();
            move |is_hovered| {
                hovered.set_neq(is_hovered);
                explorer.send(ExplorerCommand::HoverCell(is_hovered.then_some(key)));
            }
        })
        .child(
            Stack::new()
                .s(Width::fill())
                .s(Height::fill())
                .layer_signal(cell.signal().map(|cell| cell.map(|cell| cell.is_abstract)).dedupe().map({
                    let explorer = explorer.clone();
                    move |is_abstract| match is_abstract {
                        Some(false) => Some(concrete_cell(&explorer, key).unify()),
                        Some(true) => Some(abstract_cell(&explorer, key).unify()),
                        None => None,
                    }
                }))
                .layer_signal(hovered_signal.map({
                    let explorer = explorer.clone();
                    move |hovered| hovered.then(|| cell_controls(&explorer, key))
                })),
        )
}

/// Part of [`CellView`] that only changes the cell's frame.
#[derive(Debug, Clone, PartialEq)]
struct CellFrame {
    x: f64,
    width: f64,
    is_abstract: bool,
    selected: bool,
    background: String,
}

impl From<&CellView> for CellFrame {
    fn from(cell: &CellView) -> Self {
        Self {
            x: cell.geometry.x,
            width: cell.geometry.width,
            is_abstract: cell.is_abstract,
            selected: cell.selected,
            background: css(cell.color),
        }
    }
}

fn abstract_cell(explorer: &Explorer, key: CellKey) -> impl Element + use<> {
    let explorer = explorer.clone();
    El::new()
        .s(Width::fill())
        .s(Height::fill())
        .s(Cursor::new(CursorIcon::Pointer))
        .s(Font::new().size(FONT_SIZE_12).color(muted_text()).center())
        .update_raw_el(move |raw_el| raw_el.attr("title", &key.to_string()))
        .on_click(move || explorer.send(ExplorerCommand::ToggleCellAbstract(key)))
        .child(El::new().s(Align::center()).child("+"))
}

fn concrete_cell(explorer: &Explorer, key: CellKey) -> impl Element + use<> {
    let status = explorer.map(move |view| view.cell(key).map(|cell| cell.load_state));
    Stack::new()
        .s(Width::fill())
        .s(Height::fill())
        .layer(cell_canvas(explorer, key))
        .layer_signal(status.map(|state| {
            let text = match state? {
                LoadState::Uninitialized | LoadState::Loading => "Loading…",
                LoadState::Empty | LoadState::Failed if !fonts_ready() => "No data.",
                _ => return None,
            };
            Some(
                El::new()
                    .s(Align::center())
                    .s(Font::new().size(FONT_SIZE_12).color(muted_text()))
                    .child(text),
            )
        }))
}

/// Per-cell toolbar shown while the pointer is over the cell.
fn cell_controls(explorer: &Explorer, key: CellKey) -> impl Element + use<> {
    let controls = explorer
        .map(move |view| {
            view.cell(key).map(|cell| {
                (
                    cell.is_abstract,
                    cell.graph_mode,
                    cell.visualization,
                    cell.playback,
                    cell.frame_index,
                    cell.frame_count,
                    cell.label.clone(),
                )
            })
        })
        .map({
            let explorer = explorer.clone();
            move |controls| {
                let (is_abstract, graph_mode, visualization, playback, frame, frames, label) = controls?;
                if is_abstract {
                    return None;
                }
                let send = {
                    let explorer = explorer.clone();
                    move |command: ExplorerCommand| explorer.send(command)
                };
                let mut row = Row::new()
                    .s(Gap::new().x(2))
                    .s(Padding::all(2))
                    .s(Background::new().color(panel()))
                    .s(RoundedCorners::all(CORNER_RADIUS_4))
                    .update_raw_el(move |raw_el| raw_el.attr("title", &label))
                    .item(icon_button("−", "Collapse", {
                        let send = send.clone();
                        move || send(ExplorerCommand::ToggleCellAbstract(key))
                    }))
                    .item(icon_button("★", "Use as search query", {
                        let send = send.clone();
                        move || send(ExplorerCommand::SelectSnapshot(key))
                    }))
                    .item(icon_button(graph_mode_symbol(graph_mode), "Next graph mode", {
                        let send = send.clone();
                        move || send(ExplorerCommand::CellGraphMode(key, next_graph_mode(graph_mode)))
                    }))
                    .item(icon_button(
                        visualization_symbol(visualization),
                        "Next visualization",
                        {
                            let send = send.clone();
                            move || {
                                send(ExplorerCommand::CellVisualization(
                                    key,
                                    next_visualization(visualization),
                                ))
                            }
                        },
                    ));
                if visualization == VisualizationMode::Animation && frames > 0 {
                    let playing = playback == Playback::Playing;
                    row = row
                        .item(icon_button("⏮", "Previous frame", {
                            let send = send.clone();
                            move || send(ExplorerCommand::Scrub(key, (frame + frames - 1) % frames))
                        }))
                        .item(icon_button(
                            if playing { "⏸" } else { "▶" },
                            "Play or pause",
                            {
                                let send = send.clone();
                                move || send(ExplorerCommand::TogglePlayback(key))
                            },
                        ))
                        .item(icon_button("⏭", "Next frame", {
                            let send = send.clone();
                            move || send(ExplorerCommand::Scrub(key, (frame + 1) % frames))
                        }))
                        .item(
                            El::new()
                                .s(Font::new().size(FONT_SIZE_12).color(muted_text()))
                                .child(format!("{}/{}", frame + 1, frames)),
                        );
                }
                row = row.item(icon_button("✕", "Remove", move || {
                    send(ExplorerCommand::RemoveCell(key))
                }));
                Some(row)
            }
        });
    El::new()
        .update_raw_el(|raw_el| {
            raw_el
                .style("position", "absolute")
                .style("top", "2px")
                .style("right", "2px")
        })
        .child_signal(controls)
}

fn next_graph_mode(mode: GraphMode) -> GraphMode {
    let index = GraphMode::ALL.iter().position(|candidate| *candidate == mode).unwrap_or(0);
    GraphMode::ALL[(index + 1) % GraphMode::ALL.len()]
}

fn next_visualization(mode: VisualizationMode) -> VisualizationMode {
    let index = VisualizationMode::ALL
        .iter()
        .position(|candidate| *candidate == mode)
        .unwrap_or(0);
    VisualizationMode::ALL[(index + 1) % VisualizationMode::ALL.len()]
}

fn graph_mode_symbol(mode: GraphMode) -> &'static str {
    match mode {
        GraphMode::Union => "∪",
        GraphMode::Intersection => "∩",
        GraphMode::Disjoint => "∆",
    }
}

fn visualization_symbol(mode: VisualizationMode) -> &'static str {
    match mode {
        VisualizationMode::Graph => "G",
        VisualizationMode::Animation => "A",
        VisualizationMode::Matrix => "M",
        VisualizationMode::Timeline => "T",
    }
}
