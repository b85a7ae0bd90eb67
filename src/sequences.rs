//! Control sequences used to carve out and paint the reserved row.
//!
//! Only cursor and scroll-region handling lives here. Line clearing and
//! colors are terminal-type specific and come from the capability database
//! (see [`crate::terminal`]).

/// ANSI cursor save.
pub const SAVE_CURSOR: &[u8] = b"\x1b[s";
/// ANSI cursor restore.
pub const RESTORE_CURSOR: &[u8] = b"\x1b[u";
/// Move up one row so the restored cursor lands inside the scroll region.
pub const CURSOR_INTO_SCROLL_AREA: &[u8] = b"\x1b[1A";
/// Scrolled before the region shrinks by one row.
pub const SHRINK_PADDING: &[u8] = b"\n";
/// Scrolled after the region grows back to full height.
pub const GROW_PADDING: &[u8] = b"\n\n";

/// `ESC [ 0 ; R r`: scrollable region covers rows `0..=last_row`.
pub fn push_scroll_region(sequence: &mut Vec<u8>, last_row: u16) {
    sequence.extend_from_slice(format!("\x1b[0;{last_row}r").as_bytes());
}

/// `ESC [ R ; 0 f`: cursor to column 0 of `row`.
pub fn push_move_to_row(sequence: &mut Vec<u8>, row: u16) {
    sequence.extend_from_slice(format!("\x1b[{row};0f").as_bytes());
}

/// Save cursor, set the region, restore cursor and nudge it back inside.
///
/// Setting a region homes the cursor on most terminals, so every region
/// change is bracketed to keep the caller's output position intact.
pub fn push_region_bracket(sequence: &mut Vec<u8>, last_row: u16) {
    sequence.extend_from_slice(SAVE_CURSOR);
    push_scroll_region(sequence, last_row);
    sequence.extend_from_slice(RESTORE_CURSOR);
    sequence.extend_from_slice(CURSOR_INTO_SCROLL_AREA);
}
