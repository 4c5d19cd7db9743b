pub const PANEL_BG: &str = "rgba(255,255,255,0.94)";
pub const PANEL_BORDER: &str = "#E2E8F0";
pub const TEXT_STRONG: &str = "#1E293B";
pub const TEXT_MUTED: &str = "#64748B";
pub const ACCENT: &str = "#0F766E";
pub const MAP_BG: &str = "#F8FAFC";

/// Format RGBA as a CSS color string.
pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

/// Parse `#RRGGBB`. Anything else is `None`.
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// `#RRGGBB` with an alpha applied; named colors pass through unchanged.
pub fn with_alpha(color: &str, a: f64) -> String {
    match parse_hex(color) {
        Some((r, g, b)) => rgba_css(r, g, b, a),
        None => color.to_string(),
    }
}
