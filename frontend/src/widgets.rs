//! Small building blocks for the toolbar and cell controls.

use crate::theme::*;
use zoon::*;

pub fn button(label: impl Into<String>, on_press: impl FnMut() + 'static) -> impl Element {
    let label = label.into();
    let (hovered, hovered_signal) = Mutable::new_and_signal(false);
    Button::new()
        .s(Padding::new().x(SPACING_8).y(SPACING_4))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(Font::new().size(FONT_SIZE_12).color(text()))
        .s(Background::new().color_signal(
            hovered_signal.map_bool(|| accent_soft(), || panel()),
        ))
        .on_hovered_change(move |is_hovered| hovered.set_neq(is_hovered))
        .label(label)
        .on_press(on_press)
}

/// Tiny square button used inside cells and level rows.
pub fn icon_button(
    symbol: &'static str,
    tooltip: &'static str,
    on_press: impl FnMut() + 'static,
) -> impl Element {
    Button::new()
        .s(Width::exact(18))
        .s(Height::exact(18))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .s(Font::new().size(FONT_SIZE_12).color(text()).center())
        .s(Background::new().color(panel()))
        .update_raw_el(move |raw_el| raw_el.attr("title", tooltip))
        .label(symbol)
        .on_press(on_press)
}

/// Pressed state follows `active`.
pub fn toggle_button(
    label: impl Into<String>,
    active: impl Signal<Item = bool> + Unpin + 'static,
    on_press: impl FnMut() + 'static,
) -> impl Element {
    let active = active.broadcast();
    Button::new()
        .s(Padding::new().x(SPACING_8).y(SPACING_4))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(Font::new().size(FONT_SIZE_12).color(text()))
        .s(Background::new().color_signal(active.signal().map_bool(|| accent_soft(), || panel())))
        .label(label.into())
        .on_press(on_press)
}

/// One button per option; the selected one is highlighted.
pub fn segmented<T>(
    options: impl IntoIterator<Item = (T, &'static str)>,
    selected: impl Signal<Item = T> + Unpin + 'static,
    on_select: impl Fn(T) + Clone + 'static,
) -> impl Element
where
    T: Copy + PartialEq + 'static,
{
    let selected = selected.broadcast();
    Row::new()
        .s(Gap::new().x(2))
        .multiline()
        .items(options.into_iter().map(|(option, label)| {
            let on_select = on_select.clone();
            toggle_button(
                label,
                selected.signal().map(move |current| current == option),
                move || on_select(option),
            )
        }))
}

pub fn text_input(
    placeholder: &'static str,
    text: impl Signal<Item = String> + Unpin + 'static,
    on_change: impl FnMut(String) + 'static,
) -> impl Element {
    TextInput::new()
        .s(Width::fill())
        .s(Padding::new().x(SPACING_8).y(SPACING_4))
        .s(RoundedCorners::all(CORNER_RADIUS_4))
        .s(Borders::all(Border::new().width(1).color(border())))
        .s(Font::new().size(FONT_SIZE_12).color(text()))
        .label_hidden(placeholder)
        .placeholder(Placeholder::new(placeholder))
        .text_signal(text)
        .on_change(on_change)
}

/// Section caption above a group of toolbar controls.
pub fn caption(title: &'static str) -> impl Element {
    El::new()
        .s(Font::new()
            .size(FONT_SIZE_12)
            .weight(FontWeight::SemiBold)
            .color(muted_text()))
        .child(title)
}

/// Titled group whose body can be folded away.
pub fn section<E: Element + 'static>(
    title: &'static str,
    open: bool,
    body: impl Fn() -> E + 'static,
) -> impl Element {
    let open = crate::dataflow::Atom::new(open);
    Column::new()
        .s(Width::fill())
        .s(Gap::new().y(SPACING_4))
        .item(
            El::new()
                .s(Cursor::new(CursorIcon::Pointer))
                .on_click({
                    let open = open.clone();
                    move || open.toggle()
                })
                .child(caption(title)),
        )
        .item_signal(open.signal().map(move |is_open| is_open.then(&body)))
}
