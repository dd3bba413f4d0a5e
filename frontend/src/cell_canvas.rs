//! Draws a cell's [`Scene`] on a Fast2D canvas.

use crate::explorer::{Explorer, ExplorerCommand};
use hierarchy::{CellKey, Rgba, Scene, Shape};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use zoon::*;

const FONT_FAMILY: &str = "Inter";

/// Text shapes are skipped until the fonts are registered.
static FONTS_READY: AtomicBool = AtomicBool::new(false);

pub fn fonts_ready() -> bool {
    FONTS_READY.load(Ordering::Relaxed)
}

pub async fn load_and_register_fonts() {
    use zoon::futures_util::future::try_join_all;

    let fonts = match try_join_all([
        fast2d::fetch_file("/_api/public/fonts/Inter-Regular.ttf"),
        fast2d::fetch_file("/_api/public/fonts/Inter-Bold.ttf"),
    ])
    .await
    {
        Ok(fonts) => fonts,
        Err(error) => {
            zoon::eprintln!("[CANVAS] Fonts unavailable, cell labels disabled: {error:?}");
            return;
        }
    };
    match fast2d::register_fonts(fonts) {
        Ok(()) => FONTS_READY.store(true, Ordering::Relaxed),
        Err(error) => zoon::eprintln!("[CANVAS] Font registration failed: {error:?}"),
    }
}

/// Left clicks are sent in cell coordinates so the node under them joins the filter.
pub fn cell_canvas(explorer: &Explorer, key: CellKey) -> impl Element + use<> {
    El::new()
        .s(Width::fill())
        .s(Height::fill())
        .update_raw_el({
            let explorer = explorer.clone();
            move |raw_el| {
                let element = raw_el.dom_element();
                raw_el.event_handler(move |event: events::PointerDown| {
                    if event.button() != events::MouseButton::Left {
                        return;
                    }
                    let rect = element.get_bounding_client_rect();
                    explorer.send(ExplorerCommand::NodeClicked {
                        cell: key,
                        x: f64::from(event.x()) - rect.left(),
                        y: f64::from(event.y()) - rect.top(),
                    });
                })
            }
        })
        .child_signal(canvas_element(explorer.clone(), key).into_signal_option())
}

async fn canvas_element(explorer: Explorer, key: CellKey) -> impl Element {
    let mut zoon_canvas = Canvas::new()
        .width(0)
        .height(0)
        .s(Width::fill())
        .s(Height::fill());

    let dom_canvas = zoon_canvas.raw_el_mut().dom_element();
    let canvas_wrapper = Rc::new(RefCell::new(
        fast2d::CanvasWrapper::new_with_canvas(dom_canvas).await,
    ));

    let scene_signal = explorer.map(move |view| view.cell(key).and_then(|cell| cell.scene.clone()));
    let scene_task = Task::start_droppable({
        let canvas_wrapper = canvas_wrapper.clone();
        scene_signal.for_each_sync(move |scene| {
            canvas_wrapper.borrow_mut().update_objects(move |objects| {
                *objects = scene.as_ref().map(scene_objects).unwrap_or_default();
            });
        })
    });

    zoon_canvas
        .update_raw_el(move |raw_el| {
            raw_el.on_resize(move |width, height| {
                canvas_wrapper.borrow_mut().resized(width, height);
            })
        })
        .after_remove(move |_| drop(scene_task))
}

fn rgba(color: Rgba) -> (u8, u8, u8, f32) {
    (color.r, color.g, color.b, color.a)
}

fn scene_objects(scene: &Scene) -> Vec<fast2d::Object2d> {
    let with_text = fonts_ready();
    scene
        .shapes
        .iter()
        .filter_map(|shape| shape_object(shape, with_text))
        .collect()
}

fn shape_object(shape: &Shape, with_text: bool) -> Option<fast2d::Object2d> {
    let object = match shape {
        Shape::Circle {
            cx,
            cy,
            radius,
            color,
        } => {
            let (r, g, b, a) = rgba(*color);
            fast2d::Circle::new()
                .center(*cx as f32, *cy as f32)
                .radius(*radius as f32)
                .color(r, g, b, a)
                .inner_border(1., 32, 32, 32, a)
                .into()
        }
        Shape::Line {
            from,
            to,
            width,
            color,
        } => {
            let (r, g, b, a) = rgba(*color);
            fast2d::Line::new()
                .points(&[
                    (from.0 as f32, from.1 as f32),
                    (to.0 as f32, to.1 as f32),
                ])
                .color(r, g, b, a)
                .width(*width as f32)
                .into()
        }
        Shape::Polyline {
            points,
            width,
            color,
        } => {
            if points.len() < 2 {
                return None;
            }
            let (r, g, b, a) = rgba(*color);
            let points: Vec<(f32, f32)> = points
                .iter()
                .map(|(x, y)| (*x as f32, *y as f32))
                .collect();
            fast2d::Line::new()
                .points(&points)
                .color(r, g, b, a)
                .width(*width as f32)
                .into()
        }
        Shape::Rect {
            x,
            y,
            width,
            height,
            color,
        } => {
            let (r, g, b, a) = rgba(*color);
            fast2d::Rectangle::new()
                .position(*x as f32, *y as f32)
                .size(*width as f32, *height as f32)
                .color(r, g, b, a)
                .into()
        }
        Shape::Text {
            x,
            y,
            width,
            height,
            text,
            size,
            color,
        } => {
            if !with_text {
                return None;
            }
            let (r, g, b, a) = rgba(*color);
            fast2d::Text::new()
                .text(text.clone())
                .position(*x as f32, *y as f32)
                .size(*width as f32, *height as f32)
                .color(r, g, b, a)
                .font_size(*size as f32)
                .family(fast2d::Family::name(FONT_FAMILY))
                .into()
        }
    };
    Some(object)
}
