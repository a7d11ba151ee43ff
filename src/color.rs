//! Overlay color resolution and label contrast.
//!
//! Colors arrive from the backend either as `#RRGGBB` codes or as plain color
//! names (the backend's luggage color classifier speaks names). Everything in
//! here is pure and deterministic.

use image::Rgba;

/// Overlay color used when a detection carries no usable color hint.
pub const DEFAULT_OVERLAY_COLOR: &str = "#FF0000";

pub const TEXT_BLACK: &str = "#000000";
pub const TEXT_WHITE: &str = "#FFFFFF";

/// Sentinel for color names outside the table.
pub const UNKNOWN_COLOR_HEX: &str = "#808080";

/// Luminance above which label text switches to black.
const LUMINANCE_THRESHOLD: f64 = 0.5;

const COLOR_NAMES: &[(&str, &str)] = &[
    ("white", "#FFFFFF"),
    ("black", "#000000"),
    ("gray", "#808080"),
    ("silver", "#C0C0C0"),
    ("red", "#FF0000"),
    ("blue", "#0000FF"),
    ("green", "#008000"),
    ("yellow", "#FFFF00"),
    ("orange", "#FFA500"),
    ("brown", "#A52A2A"),
    ("beige", "#F5F5DC"),
    ("gold", "#FFD700"),
    ("purple", "#800080"),
    ("pink", "#FFC0CB"),
    ("unknown", UNKNOWN_COLOR_HEX),
];

fn lookup_name(name: &str) -> Option<&'static str> {
    let normalized = name.trim().to_lowercase();
    COLOR_NAMES
        .iter()
        .find(|(known, _)| *known == normalized)
        .map(|(_, hex)| *hex)
}

/// Map a color name to its hex code. Missing or unrecognized names map to
/// [`UNKNOWN_COLOR_HEX`].
pub fn color_name_to_hex(name: Option<&str>) -> &'static str {
    name.and_then(lookup_name).unwrap_or(UNKNOWN_COLOR_HEX)
}

/// Parse a `#RRGGBB` code. Anything else (short forms included) is rejected.
pub fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Perceptual luminance in `[0, 1]`.
pub fn luminance(rgb: [u8; 3]) -> f64 {
    let [r, g, b] = rgb.map(f64::from);
    (0.299 * r + 0.587 * g + 0.114 * b) / 255.0
}

/// Resolve a color hint (hex code or known name) to RGB.
pub fn resolve_rgb(hint: Option<&str>) -> Option<[u8; 3]> {
    let hint = hint?.trim();
    if hint.starts_with('#') {
        parse_hex(hint)
    } else {
        lookup_name(hint).and_then(parse_hex)
    }
}

/// Pick black or white label text for the given background.
///
/// Anything that does not resolve to RGB yields white.
pub fn contrast_color(background: Option<&str>) -> &'static str {
    match resolve_rgb(background) {
        Some(rgb) if luminance(rgb) > LUMINANCE_THRESHOLD => TEXT_BLACK,
        _ => TEXT_WHITE,
    }
}

/// Drawable stroke/fill color for a detection's hint, falling back to red.
pub fn overlay_rgba(hint: Option<&str>) -> Rgba<u8> {
    let [r, g, b] = resolve_rgb(hint)
        .or_else(|| parse_hex(DEFAULT_OVERLAY_COLOR))
        .unwrap_or([255, 0, 0]);
    Rgba([r, g, b, 255])
}

/// Drawable label text color for a detection's hint.
pub fn text_rgba(background: Option<&str>) -> Rgba<u8> {
    if contrast_color(background) == TEXT_BLACK {
        Rgba([0, 0, 0, 255])
    } else {
        Rgba([255, 255, 255, 255])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contrast_picks_black_on_light_and_white_on_dark() {
        assert_eq!(contrast_color(Some("#FFFFFF")), TEXT_BLACK);
        assert_eq!(contrast_color(Some("#000000")), TEXT_WHITE);
        assert_eq!(contrast_color(Some("#FF0000")), TEXT_WHITE);
        assert_eq!(contrast_color(Some("#FFFF00")), TEXT_BLACK);
    }

    #[test]
    fn malformed_colors_fall_back_to_white() {
        assert_eq!(contrast_color(Some("not-a-color")), TEXT_WHITE);
        assert_eq!(contrast_color(None), TEXT_WHITE);
        assert_eq!(contrast_color(Some("#12345")), TEXT_WHITE);
        assert_eq!(contrast_color(Some("#GGGGGG")), TEXT_WHITE);
        assert_eq!(contrast_color(Some("")), TEXT_WHITE);
    }

    #[test]
    fn named_colors_resolve_case_insensitively() {
        assert_eq!(contrast_color(Some("  Yellow ")), TEXT_BLACK);
        assert_eq!(contrast_color(Some("navy-ish")), TEXT_WHITE);
        assert_eq!(contrast_color(Some("BLUE")), TEXT_WHITE);
        assert_eq!(color_name_to_hex(Some("Silver")), "#C0C0C0");
        assert_eq!(color_name_to_hex(Some("teal")), UNKNOWN_COLOR_HEX);
        assert_eq!(color_name_to_hex(None), UNKNOWN_COLOR_HEX);
    }

    #[test]
    fn contrast_is_a_threshold_over_every_grey_level() {
        for level in 0..=255u8 {
            let hex = format!("#{level:02X}{level:02X}{level:02X}");
            let expected = if luminance([level; 3]) > 0.5 {
                TEXT_BLACK
            } else {
                TEXT_WHITE
            };
            assert_eq!(contrast_color(Some(&hex)), expected, "{hex}");
        }
    }

    #[test]
    fn contrast_output_is_always_black_or_white() {
        for seed in 0u32..2048 {
            let rgb = seed.wrapping_mul(2_654_435_761) & 0x00FF_FFFF;
            let hex = format!("#{rgb:06x}");
            let out = contrast_color(Some(&hex));
            assert!(out == TEXT_BLACK || out == TEXT_WHITE);
            assert_eq!(out, contrast_color(Some(&hex)));
        }
    }

    #[test]
    fn overlay_color_defaults_to_red() {
        assert_eq!(overlay_rgba(None), Rgba([255, 0, 0, 255]));
        assert_eq!(overlay_rgba(Some("bogus")), Rgba([255, 0, 0, 255]));
        assert_eq!(overlay_rgba(Some("green")), Rgba([0, 128, 0, 255]));
        assert_eq!(overlay_rgba(Some("#00d2ff")), Rgba([0, 210, 255, 255]));
    }
}
