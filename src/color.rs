//! Color normalization utilities
//!
//! Every color that crosses into the recent-colors store or the host goes
//! through [`normalize_hex_color`], so stored values are always `#RRGGBB` or
//! `#RRGGBBAA`, upper-case.

/// Standard swatch grid shown under the recent colors (4 rows of 10).
pub const STANDARD_PALETTE: [&str; 40] = [
    "#000000", "#434343", "#666666", "#999999", "#B7B7B7", "#CCCCCC", "#D9D9D9", "#EFEFEF",
    "#F3F3F3", "#FFFFFF", "#980000", "#FF0000", "#FF9900", "#FFFF00", "#00FF00", "#00FFFF",
    "#4A86E8", "#0000FF", "#9900FF", "#FF00FF", "#E6B8AF", "#F4CCCC", "#FCE5CD", "#FFF2CC",
    "#D9EAD3", "#D0E0E3", "#C9DAF8", "#CFE2F3", "#D9D2E9", "#EAD1DC", "#DD7E6B", "#EA9999",
    "#F9CB9C", "#FFE599", "#B6D7A8", "#A2C4C9", "#A4C2F4", "#9FC5E8", "#B4A7D6", "#D5A6BD",
];

/// Excel-like accents used when the host exposes no Office theme.
pub const FALLBACK_THEME_COLORS: [&str; 9] = [
    "#000000", "#FFFFFF", "#1F497D", "#4F81BD", "#C0504D", "#9BBB59", "#8064A2", "#4BACC6",
    "#F79646",
];

/// Fill applied by the "quick fill" ribbon command.
pub const QUICK_FILL_COLOR: &str = "#FFF7AB";

/// Normalize a user- or host-supplied color to `#RRGGBB` / `#RRGGBBAA`.
///
/// Accepts `RGB`, `RRGGBB`, `RRGGBBAA` (with or without `#`) and the
/// `rgb(r, g, b)` / `rgba(r, g, b, a)` functional form. Returns `None` for
/// anything else.
pub fn normalize_hex_color(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if value
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("rgb"))
    {
        let (r, g, b) = parse_rgb_function(value)?;
        return Some(format!("#{r:02X}{g:02X}{b:02X}"));
    }

    let digits = value.strip_prefix('#').unwrap_or(value);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match digits.len() {
        3 => {
            let doubled: String = digits.chars().flat_map(|c| [c, c]).collect();
            Some(format!("#{}", doubled.to_ascii_uppercase()))
        }
        6 | 8 => Some(format!("#{}", digits.to_ascii_uppercase())),
        _ => None,
    }
}

/// Extract the first three integer channels of `rgb(...)` / `rgba(...)`.
fn parse_rgb_function(value: &str) -> Option<(u8, u8, u8)> {
    let open = value.find('(')?;
    let name = value.get(..open)?.trim();
    if !name.eq_ignore_ascii_case("rgb") && !name.eq_ignore_ascii_case("rgba") {
        return None;
    }
    let args = value.get(open + 1..)?;
    let args = args.strip_suffix(')').unwrap_or(args);

    let mut channels = args.split(',').map(|part| part.trim().parse::<u8>().ok());
    let r = channels.next()??;
    let g = channels.next()??;
    let b = channels.next()??;
    Some((r, g, b))
}

/// Six-digit form for `<input type="color">`, dropping any alpha pair.
pub fn swatch_hex(raw: &str) -> Option<String> {
    let normalized = normalize_hex_color(raw)?;
    Some(normalized.chars().take(7).collect())
}
