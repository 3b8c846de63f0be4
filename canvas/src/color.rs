//! Hex color parsing for stroke ink.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

/// Parse `#RGB` or `#RRGGBB` values into RGB channels.
#[must_use]
pub fn parse_hex_rgb(raw: &str) -> Option<(u8, u8, u8)> {
    let hex = raw.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let r = hex_channel(&hex[0..1].repeat(2))?;
            let g = hex_channel(&hex[1..2].repeat(2))?;
            let b = hex_channel(&hex[2..3].repeat(2))?;
            Some((r, g, b))
        }
        6 => {
            let r = hex_channel(&hex[0..2])?;
            let g = hex_channel(&hex[2..4])?;
            let b = hex_channel(&hex[4..6])?;
            Some((r, g, b))
        }
        _ => None,
    }
}

/// Parse a hex color into an opaque RGBA pixel.
#[must_use]
pub fn parse_hex_rgba(raw: &str) -> Option<[u8; 4]> {
    let (r, g, b) = parse_hex_rgb(raw)?;
    Some([r, g, b, u8::MAX])
}

fn hex_channel(digits: &str) -> Option<u8> {
    let Ok(value) = u8::from_str_radix(digits, 16) else {
        return None;
    };
    Some(value)
}
