use crate::dataflow::*;
use crate::error_display::{ErrorAlert, ErrorDisplay, NotificationVariant};
use crate::theme::*;
use futures::{select, stream::StreamExt};
use zoon::events::Click;
use zoon::*;

/// Remaining auto-dismiss time in percent (100.0 to 0.0)
type Progress = f32;

const UPDATE_INTERVAL_MS: u32 = 50;

fn variant_colors(variant: NotificationVariant) -> (HSLuv, HSLuv, HSLuv) {
    match variant {
        NotificationVariant::Error => error_colors(),
        NotificationVariant::Warning => warning_colors(),
        NotificationVariant::Info => info_colors(),
    }
}

fn variant_symbol(variant: NotificationVariant) -> &'static str {
    match variant {
        NotificationVariant::Error => "⚠",
        NotificationVariant::Warning => "!",
        NotificationVariant::Info => "ℹ",
    }
}

/// Fixed top-right column of toasts; empty space lets clicks through.
pub fn toast_notifications_container(error_display: &ErrorDisplay) -> impl Element + use<> {
    El::new()
        .s(Width::fill())
        .s(Height::fill())
        .s(Align::new().top().right())
        .s(Padding::all(SPACING_16))
        .update_raw_el(|raw_el| {
            raw_el
                .style("position", "fixed")
                .style("top", "0")
                .style("left", "0")
                .style("pointer-events", "none")
                .style("z-index", "1000")
        })
        .child(
            Column::new()
                .s(Gap::new().y(SPACING_8))
                .s(Width::exact(380))
                .s(Align::new().top().right())
                .update_raw_el(|raw_el| raw_el.style("pointer-events", "auto"))
                .items_signal_vec(error_display.active_toasts.signal_vec().map({
                    let error_display = error_display.clone();
                    move |alert| toast_element(&error_display, alert)
                })),
        )
}

fn toast_element(error_display: &ErrorDisplay, alert: ErrorAlert) -> impl Element + use<> {
    let (toast_clicked_relay, mut toast_clicked_stream) = relay();
    let (dismiss_clicked_relay, mut dismiss_clicked_stream) = relay();
    let auto_dismiss_ms = alert.auto_dismiss_ms as f32;

    let toast_actor = Actor::new(100.0 as Progress, {
        let error_display = error_display.clone();
        let id = alert.id.clone();
        async move |state| {
            let mut elapsed = 0.0_f32;
            let mut paused = false;
            loop {
                select! {
                    _ = Timer::sleep(UPDATE_INTERVAL_MS).fuse() => {
                        // Zero means the toast stays until dismissed.
                        if paused || auto_dismiss_ms <= 0.0 {
                            continue;
                        }
                        elapsed += UPDATE_INTERVAL_MS as f32;
                        state.set((100.0 - elapsed / auto_dismiss_ms * 100.0).max(0.0));
                        if elapsed >= auto_dismiss_ms {
                            error_display.dismiss(&id);
                            break;
                        }
                    }
                    event = toast_clicked_stream.next() => {
                        if let Some(()) = event {
                            paused = !paused;
                        }
                    }
                    event = dismiss_clicked_stream.next() => {
                        if let Some(()) = event {
                            error_display.dismiss(&id);
                            break;
                        }
                    }
                }
            }
        }
    });

    let (background, border, text) = variant_colors(alert.variant);
    let sticky = alert.auto_dismiss_ms == 0;
    Column::new()
        .s(Width::fill())
        .s(Background::new().color(background))
        .s(Borders::all(Border::new().width(1).color(border)))
        .s(RoundedCorners::all(CORNER_RADIUS_8))
        .s(Shadows::new(vec![
            Shadow::new().color(hsluv!(0, 0, 0, 10)).x(0).y(2).blur(8),
        ]))
        .s(Cursor::new(CursorIcon::Pointer))
        .update_raw_el(|raw_el| raw_el.attr("title", "Click to pause/resume auto-dismiss"))
        .on_click(move || toast_clicked_relay.send(()))
        .item(
            Row::new()
                .s(Width::fill())
                .s(Padding::all(SPACING_12))
                .s(Gap::new().x(SPACING_8))
                .s(Align::new().center_y())
                .item(
                    El::new()
                        .s(Font::new().size(FONT_SIZE_16).weight(FontWeight::Bold).color(border))
                        .child(variant_symbol(alert.variant)),
                )
                .item(
                    Column::new()
                        .s(Width::fill())
                        .s(Gap::new().y(SPACING_4))
                        .item(
                            El::new()
                                .s(Font::new().size(FONT_SIZE_16).weight(FontWeight::SemiBold).color(text))
                                .child(&alert.title),
                        )
                        .item(
                            El::new()
                                .s(Font::new().size(FONT_SIZE_14).color(text).wrap_anywhere())
                                .child(&alert.message),
                        ),
                )
                .item(
                    El::new()
                        .s(Font::new().size(FONT_SIZE_14).color(text))
                        .s(Cursor::new(CursorIcon::Pointer))
                        .s(Padding::all(SPACING_4))
                        .s(RoundedCorners::all(CORNER_RADIUS_4))
                        .child("✕")
                        .update_raw_el(move |raw_el| {
                            raw_el.event_handler(move |event: Click| {
                                event.stop_propagation();
                                dismiss_clicked_relay.send(());
                            })
                        }),
                ),
        )
        .item((!sticky).then(|| progress_bar(&toast_actor, border)))
        .after_remove(move |_| drop(toast_actor))
}

fn progress_bar(progress: &Actor<Progress>, color: HSLuv) -> impl Element + use<> {
    El::new()
        .s(Width::fill())
        .s(Height::exact(3))
        .child(
            El::new()
                .s(Height::fill())
                .s(Width::percent_signal(progress.signal()))
                .s(Background::new().color(color))
                .s(RoundedCorners::new()
                    .bottom_left(CORNER_RADIUS_8)
                    .bottom_right(CORNER_RADIUS_8))
                .s(Transitions::new([Transition::property("width").duration(150)])),
        )
}
