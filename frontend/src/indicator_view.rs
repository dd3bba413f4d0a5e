//! Narrow bar beside the hierarchy showing every level; a click expands or collapses it.

use crate::explorer::{Explorer, ExplorerCommand};
use crate::theme::*;
use hierarchy::IndicatorSlot;
use zoon::*;

pub fn hierarchy_indicator(explorer: &Explorer, width: f64) -> impl Element + use<> {
    Stack::new()
        .s(Width::exact(width as u32))
        .s(Height::fill())
        .s(Background::new().color(panel()))
        .s(Borders::new().right(Border::new().width(1).color(border())))
        .update_raw_el(|raw_el| raw_el.style("position", "relative"))
        .layers_signal_vec(explorer.map(|view| view.indicator.clone()).to_signal_vec().map({
            let explorer = explorer.clone();
            move |slot| indicator_slot(&explorer, slot)
        }))
}

fn indicator_slot(explorer: &Explorer, slot: IndicatorSlot) -> impl Element + use<> {
    let tooltip = slot.tooltip();
    let IndicatorSlot {
        level,
        y,
        height,
        active,
        ..
    } = slot;
    let explorer = explorer.clone();
    let hovered = Mutable::new(false);
    El::new()
        .s(Width::fill())
        .s(Cursor::new(CursorIcon::Pointer))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(Background::new().color_signal(hovered.signal().map(move |hovered| {
            match (active, hovered) {
                (true, _) => accent(),
                (false, true) => accent_soft(),
                (false, false) => background(),
            }
        })))
        .s(Font::new().size(FONT_SIZE_12).center().color(if active { panel() } else { muted_text() }))
        .update_raw_el(move |raw_el| {
            raw_el
                .style("position", "absolute")
                .style("top", &format!("{y}px"))
                .style("height", &format!("{}px", height.max(2.0)))
                .attr("title", &tooltip)
        })
        .on_hovered_change(move |is_hovered| hovered.set_neq(is_hovered))
        .on_click(move || explorer.send(ExplorerCommand::ToggleLevel(level)))
        .child(level.to_string())
}
