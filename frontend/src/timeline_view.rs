//! Context bar over the hierarchy span with the hovered cell highlighted.

use crate::explorer::{Explorer, TimelineView};
use crate::hierarchy_view::EDGE_WIDTH;
use crate::theme::*;
use hierarchy::HoverMark;
use zoon::*;

pub fn timeline_bar(explorer: &Explorer, height: u32) -> impl Element + use<> {
    // Marks share the x axis of the level rows, which start after the edge strip.
    El::new()
        .s(Width::fill())
        .s(Height::exact(height))
        .s(Padding::new().x(EDGE_WIDTH))
        .s(Background::new().color(panel()))
        .s(Borders::new().bottom(Border::new().width(1).color(border())))
        .s(Font::new().size(FONT_SIZE_12).color(muted_text()))
        .child(timeline_track(explorer))
}

fn timeline_track(explorer: &Explorer) -> impl Element + use<> {
    let timeline = explorer.map(|view| view.timeline.clone()).broadcast();
    Stack::new()
        .s(Width::fill())
        .s(Height::fill())
        .update_raw_el(|raw_el| raw_el.style("position", "relative"))
        .layer(
            Row::new()
                .s(Width::fill())
                .s(Height::fill())
                .s(Padding::new().x(SPACING_4))
                .s(Align::new().center_y())
                .item(El::new().child_signal(timeline.signal_ref(|timeline| timeline.start_label.clone())))
                .item(El::new().s(Width::fill()))
                .item(El::new().child_signal(timeline.signal_ref(|timeline| timeline.end_label.clone()))),
        )
        .layers_signal_vec(
            timeline
                .signal_ref(|timeline| timeline.marks.clone())
                .to_signal_vec()
                .map(move |mark| mark_strip(mark, accent_soft())),
        )
        .layer_signal(
            timeline
                .signal_ref(|timeline: &TimelineView| timeline.highlighted)
                .map(|highlighted| highlighted.map(|mark| mark_strip(mark, accent()))),
        )
}

fn mark_strip(mark: HoverMark, color: HSLuv) -> impl Element {
    let HoverMark { x, width, .. } = mark;
    El::new()
        .s(Background::new().color(color))
        .update_raw_el(move |raw_el| {
            raw_el
                .style("position", "absolute")
                .style("bottom", "0")
                .style("height", "4px")
                .style("left", &format!("{x}px"))
                .style("width", &format!("{}px", width.max(1.0)))
                .style("pointer-events", "none")
        })
}
