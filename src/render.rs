//! Pure formatting helpers shared by single bars and the manager.
//!
//! Nothing here holds state. Every redraw line must keep the same length
//! between frames so the terminal overwrite leaves no stale characters,
//! which is why messages are width-fixed before they are stored.

use std::fmt::Write as _;

const LEFT: char = '[';
const RIGHT: char = ']';
const LOADED: char = '#';
const UNLOADED: char = ' ';

// Names longer than this are abbreviated in the multi-bar view.
const NAME_DISPLAY_LIMIT: usize = 7;

const NAME_KEEP: usize = 6;
const ELLIPSIS: &str = "...";

/// Renders a bracketed gauge with a percentage suffix, e.g. `[####      ] 40%`.
///
/// The filled cell count is `current * width / max` and the percentage is
/// `current * 100 / max`, both by integer division, the percentage padded to
/// two digits. `current` is clamped to `max` and a `max` of zero draws a full
/// gauge, so the output is always well formed.
#[must_use]
pub fn gauge(current: u64, max: u64, width: usize) -> String {
    let (current, max) = if max == 0 { (1, 1) } else { (current.min(max), max) };
    let width_u64 = width as u64;

    #[allow(clippy::cast_possible_truncation)]
    let loaded = (u128::from(current) * u128::from(width_u64) / u128::from(max)) as usize;
    let percent = u128::from(current) * 100 / u128::from(max);

    let mut out = String::with_capacity(width + 8);
    out.push(LEFT);
    for i in 0..width {
        out.push(if i < loaded { LOADED } else { UNLOADED });
    }
    out.push(RIGHT);
    // Writing to a String cannot fail.
    let _ = write!(out, " {percent:02}%");
    out
}

/// Collapses line breaks into single spaces and fixes the result to exactly
/// `width` characters.
///
/// Longer messages keep their trailing `width` characters, shorter ones are
/// right-padded with spaces.
#[must_use]
pub fn normalize_message(message: &str, width: usize) -> String {
    let flat = message.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let len = flat.chars().count();

    if len > width {
        flat.chars().skip(len - width).collect()
    } else {
        let mut padded = flat;
        padded.extend(std::iter::repeat_n(' ', width - len));
        padded
    }
}

/// Shortens a bar name for display. The aggregation key is never changed.
#[must_use]
pub fn display_name(name: &str) -> String {
    if name.chars().count() > NAME_DISPLAY_LIMIT {
        let mut short: String = name.chars().take(NAME_KEEP).collect();
        short.push_str(ELLIPSIS);
        short
    } else {
        name.to_owned()
    }
}

/// The two lines a bar occupies in a multi-line view.
pub(crate) fn block_lines(label: &str, message: &str, gauge: String) -> [String; 2] {
    [format!("  {label} : {message}"), format!("    {gauge}")]
}
