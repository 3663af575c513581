//! CSS color parsing into `[r, g, b, a]` arrays.
//!
//! Channels are 0–255 for red, green and blue and 0–1 for alpha, matching the
//! layout style uniforms expect.

use crate::{prelude::HashMap, MapError, Result};
use once_cell::sync::Lazy;

/// A color as `[r, g, b, a]`
pub type ColorArray = [f64; 4];

static NAMED_COLORS: Lazy<HashMap<&'static str, [u8; 3]>> = Lazy::new(|| {
    [
        ("black", [0, 0, 0]),
        ("silver", [192, 192, 192]),
        ("gray", [128, 128, 128]),
        ("grey", [128, 128, 128]),
        ("white", [255, 255, 255]),
        ("maroon", [128, 0, 0]),
        ("red", [255, 0, 0]),
        ("purple", [128, 0, 128]),
        ("fuchsia", [255, 0, 255]),
        ("magenta", [255, 0, 255]),
        ("green", [0, 128, 0]),
        ("lime", [0, 255, 0]),
        ("olive", [128, 128, 0]),
        ("yellow", [255, 255, 0]),
        ("navy", [0, 0, 128]),
        ("blue", [0, 0, 255]),
        ("teal", [0, 128, 128]),
        ("aqua", [0, 255, 255]),
        ("cyan", [0, 255, 255]),
        ("orange", [255, 165, 0]),
        ("gold", [255, 215, 0]),
        ("pink", [255, 192, 203]),
        ("brown", [165, 42, 42]),
        ("coral", [255, 127, 80]),
        ("crimson", [220, 20, 60]),
        ("darkblue", [0, 0, 139]),
        ("darkgreen", [0, 100, 0]),
        ("darkred", [139, 0, 0]),
        ("darkgray", [169, 169, 169]),
        ("darkgrey", [169, 169, 169]),
        ("lightblue", [173, 216, 230]),
        ("lightgreen", [144, 238, 144]),
        ("lightgray", [211, 211, 211]),
        ("lightgrey", [211, 211, 211]),
        ("indigo", [75, 0, 130]),
        ("violet", [238, 130, 238]),
        ("salmon", [250, 128, 114]),
        ("tomato", [255, 99, 71]),
        ("turquoise", [64, 224, 208]),
        ("steelblue", [70, 130, 180]),
        ("skyblue", [135, 206, 235]),
        ("orchid", [218, 112, 214]),
        ("khaki", [240, 230, 140]),
        ("beige", [245, 245, 220]),
        ("ivory", [255, 255, 240]),
        ("chocolate", [210, 105, 30]),
        ("tan", [210, 180, 140]),
        ("slategray", [112, 128, 144]),
        ("slategrey", [112, 128, 144]),
    ]
    .into_iter()
    .collect()
});

/// Parses a CSS color string (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
/// `rgb()`, `rgba()`, named colors and `transparent`).
pub fn parse_color(input: &str) -> Result<ColorArray> {
    let color = input.trim().to_ascii_lowercase();

    if color == "transparent" {
        return Ok([0.0, 0.0, 0.0, 0.0]);
    }

    if let Some([r, g, b]) = NAMED_COLORS.get(color.as_str()) {
        return Ok([*r as f64, *g as f64, *b as f64, 1.0]);
    }

    if let Some(hex) = color.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| invalid(input));
    }

    if let Some(body) = color
        .strip_prefix("rgba(")
        .or_else(|| color.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_functional(body).ok_or_else(|| invalid(input));
    }

    Err(invalid(input))
}

/// Normalizes a numeric array (`[r, g, b]` or `[r, g, b, a]`) into a color
pub fn color_from_slice(values: &[f64]) -> Option<ColorArray> {
    if !values.iter().all(|v| v.is_finite()) {
        return None;
    }
    match values {
        [r, g, b] => Some(normalize([*r, *g, *b, 1.0])),
        [r, g, b, a] => Some(normalize([*r, *g, *b, *a])),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<ColorArray> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    let [r, g, b, a] = match hex.len() {
        3 => [digit(0)?, digit(1)?, digit(2)?, 255],
        4 => [digit(0)?, digit(1)?, digit(2)?, digit(3)?],
        6 => [pair(0)?, pair(2)?, pair(4)?, 255],
        8 => [pair(0)?, pair(2)?, pair(4)?, pair(6)?],
        _ => return None,
    };

    Some([r as f64, g as f64, b as f64, round_alpha(a as f64 / 255.0)])
}

fn parse_functional(body: &str) -> Option<ColorArray> {
    let body = body.replace('/', " ");
    let parts: Vec<&str> = if body.contains(',') {
        body.split(',').map(str::trim).collect()
    } else {
        body.split_whitespace().collect()
    };

    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let mut channels = [0.0, 0.0, 0.0, 1.0];
    for (i, part) in parts.iter().enumerate() {
        let value = if let Some(percent) = part.strip_suffix('%') {
            let p = parse_channel(percent.trim())? / 100.0;
            if i < 3 {
                p * 255.0
            } else {
                p
            }
        } else {
            parse_channel(part)?
        };
        channels[i] = value;
    }

    Some(normalize(channels))
}

/// Finite number; `f64::from_str` also accepts `nan` and `inf`
fn parse_channel(part: &str) -> Option<f64> {
    part.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn normalize([r, g, b, a]: ColorArray) -> ColorArray {
    [
        r.round().clamp(0.0, 255.0),
        g.round().clamp(0.0, 255.0),
        b.round().clamp(0.0, 255.0),
        a.clamp(0.0, 1.0),
    ]
}

fn round_alpha(alpha: f64) -> f64 {
    (alpha * 1000.0).round() / 1000.0
}

fn invalid(input: &str) -> Box<dyn std::error::Error + Send + Sync> {
    MapError::InvalidStyle(format!("cannot parse color '{input}'")).into()
}
