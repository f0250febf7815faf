//! Text → keystroke planning.
//!
//! Splits text into extended grapheme clusters so that emoji sequences,
//! flags and base+combining marks travel as one Unicode payload. Line
//! breaks become real Enter presses instead of Unicode payloads.

use unicode_segmentation::UnicodeSegmentation;

/// One key-down/key-up pair to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keystroke {
    /// A whole grapheme cluster, UTF-16 encoded.
    Unicode(Vec<u16>),
    /// The Return key.
    Enter,
}

impl Keystroke {
    /// Decoded payload; `None` for Enter.
    pub fn text(&self) -> Option<String> {
        match self {
            Keystroke::Unicode(units) => Some(String::from_utf16_lossy(units)),
            Keystroke::Enter => None,
        }
    }
}

/// `\n`, `\r\n` (a single cluster) and a lone `\r` all type as Enter.
pub fn is_line_break(grapheme: &str) -> bool {
    matches!(grapheme, "\n" | "\r\n" | "\r")
}

/// Plan the keystrokes for one grapheme cluster.
///
/// Returns `None` when the cluster has nothing to encode; callers skip it.
pub fn keystroke_for(grapheme: &str) -> Option<Keystroke> {
    if is_line_break(grapheme) {
        return Some(Keystroke::Enter);
    }
    let units: Vec<u16> = grapheme.encode_utf16().collect();
    if units.is_empty() {
        log::warn!("[INJECT] Skipping grapheme with empty UTF-16 encoding");
        return None;
    }
    Some(Keystroke::Unicode(units))
}

/// Split text into extended grapheme clusters, in order.
pub fn graphemes(text: &str) -> Vec<String> {
    text.graphemes(true).map(str::to_string).collect()
}

/// Plan every keystroke for `text`, preserving order.
pub fn keystrokes(text: &str) -> Vec<Keystroke> {
    text.graphemes(true).filter_map(keystroke_for).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_one_stroke_per_char() {
        let strokes = keystrokes("abc");
        assert_eq!(strokes.len(), 3);
        assert_eq!(strokes[0].text().as_deref(), Some("a"));
        assert_eq!(strokes[2].text().as_deref(), Some("c"));
    }

    #[test]
    fn combining_sequence_stays_whole() {
        // "e" + COMBINING ACUTE ACCENT
        let strokes = keystrokes("e\u{0301}x");
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0], Keystroke::Unicode(vec![0x0065, 0x0301]));
    }

    #[test]
    fn flag_and_zwj_emoji_stay_whole() {
        let flag = "\u{1F1EF}\u{1F1F5}"; // regional indicators J + P
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        let strokes = keystrokes(&format!("{flag}{family}"));
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].text().as_deref(), Some(flag));
        assert_eq!(strokes[1].text().as_deref(), Some(family));
        // surrogate pairs survive
        assert_eq!(strokes[0], Keystroke::Unicode(flag.encode_utf16().collect()));
    }

    #[test]
    fn skin_tone_modifier_is_one_cluster() {
        let thumbs = "\u{1F44D}\u{1F3FD}";
        assert_eq!(graphemes(thumbs), vec![thumbs.to_string()]);
    }

    #[test]
    fn line_breaks_become_enter() {
        assert_eq!(
            keystrokes("A\nB"),
            vec![
                Keystroke::Unicode(vec![u16::from(b'A')]),
                Keystroke::Enter,
                Keystroke::Unicode(vec![u16::from(b'B')]),
            ]
        );
        // CRLF is a single cluster, so a single Enter
        assert_eq!(keystrokes("\r\n"), vec![Keystroke::Enter]);
        assert_eq!(keystrokes("\r"), vec![Keystroke::Enter]);
    }

    #[test]
    fn empty_cluster_is_skipped() {
        assert_eq!(keystroke_for(""), None);
        assert!(keystrokes("").is_empty());
    }
}
