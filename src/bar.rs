//! Bar geometry and line composition for the reserved row.

use crate::percentage::Percentage;

/// Width of `" Progress NNN% ["` plus the closing `"]"`.
pub const FIXED_OVERHEAD: usize = 17;
pub const FILLED_GLYPH: u8 = b'#';
pub const EMPTY_GLYPH: u8 = b'.';

/// Split of the usable width into filled and empty glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarLayout {
    pub usable_width: usize,
    pub complete: usize,
    pub remainder: usize,
}

impl BarLayout {
    /// Truncates, so `complete + remainder == usable_width` for every percentage.
    pub fn new(usable_width: usize, percentage: Percentage) -> Self {
        let complete = usable_width * usize::from(percentage.get()) / 100;
        Self {
            usable_width,
            complete,
            remainder: usable_width - complete,
        }
    }
}

/// Columns left for the bar body; never negative.
pub fn usable_width(cols: u16, suffix_width: usize) -> usize {
    usize::from(cols).saturating_sub(FIXED_OVERHEAD + suffix_width)
}

/// Escape sequences wrapped around the filled part of the bar.
#[derive(Debug, Clone, Copy)]
pub struct BarColors<'a> {
    pub fill: &'a [u8],
    pub reset: &'a [u8],
}

/// Build the full status line for a terminal `cols` wide.
///
/// The visible width never exceeds `cols`: a suffix that does not fit is
/// dropped, and below [`FIXED_OVERHEAD`] columns only the truncated label is
/// written.
pub fn compose_line(
    cols: u16,
    percentage: Percentage,
    suffix: Option<&str>,
    colors: BarColors<'_>,
) -> Vec<u8> {
    let label = format!(" Progress {:>3}% ", percentage.get());
    let width = usize::from(cols);
    if width < FIXED_OVERHEAD {
        let mut degraded = label.into_bytes();
        degraded.extend_from_slice(b"[]");
        degraded.truncate(width);
        return degraded;
    }

    let requested = suffix.is_some();
    let suffix = suffix
        .map(|text| format!(" {text}"))
        .filter(|text| FIXED_OVERHEAD + text.len() <= width);
    if requested && suffix.is_none() {
        tracing::trace!(cols, "statistics suffix dropped for narrow terminal");
    }
    let suffix_width = suffix.as_ref().map_or(0, String::len);
    let layout = BarLayout::new(usable_width(cols, suffix_width), percentage);

    let mut line = Vec::with_capacity(width + colors.fill.len() + colors.reset.len());
    line.extend_from_slice(label.as_bytes());
    line.push(b'[');
    line.extend_from_slice(colors.fill);
    line.resize(line.len() + layout.complete, FILLED_GLYPH);
    line.extend_from_slice(colors.reset);
    line.resize(line.len() + layout.remainder, EMPTY_GLYPH);
    line.push(b']');
    if let Some(suffix) = suffix {
        line.extend_from_slice(suffix.as_bytes());
    }
    line
}
