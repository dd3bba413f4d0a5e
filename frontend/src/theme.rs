//! Colors and spacing shared by the views.

use hierarchy::Rgba;
use zoon::*;

pub const SPACING_4: u32 = 4;
pub const SPACING_8: u32 = 8;
pub const SPACING_12: u32 = 12;
pub const SPACING_16: u32 = 16;

pub const CORNER_RADIUS_4: u32 = 4;
pub const CORNER_RADIUS_8: u32 = 8;

pub const FONT_SIZE_12: u32 = 12;
pub const FONT_SIZE_14: u32 = 14;
pub const FONT_SIZE_16: u32 = 16;

pub fn background() -> HSLuv {
    hsluv!(0, 0, 98)
}

pub fn panel() -> HSLuv {
    hsluv!(240, 10, 95)
}

pub fn border() -> HSLuv {
    hsluv!(240, 5, 80)
}

pub fn text() -> HSLuv {
    hsluv!(0, 0, 20)
}

pub fn muted_text() -> HSLuv {
    hsluv!(0, 0, 45)
}

pub fn accent() -> HSLuv {
    hsluv!(250, 80, 55)
}

pub fn accent_soft() -> HSLuv {
    hsluv!(250, 60, 85)
}

/// Toast palette: (background, border, text).
pub fn error_colors() -> (HSLuv, HSLuv, HSLuv) {
    (hsluv!(12, 90, 95), hsluv!(12, 80, 60), hsluv!(12, 90, 30))
}

pub fn warning_colors() -> (HSLuv, HSLuv, HSLuv) {
    (hsluv!(60, 90, 96), hsluv!(60, 80, 70), hsluv!(50, 90, 30))
}

pub fn info_colors() -> (HSLuv, HSLuv, HSLuv) {
    (hsluv!(240, 80, 95), hsluv!(240, 70, 60), hsluv!(250, 80, 30))
}

/// CSS color of a core [`Rgba`].
pub fn css(color: Rgba) -> String {
    format!("rgba({}, {}, {}, {})", color.r, color.g, color.b, color.a)
}
