//! Reading-order assembly for OCR fragments.
//!
//! Fragments are sorted top-to-bottom by vertical center. Consecutive
//! fragments whose centers differ by more than the threshold start a new
//! line; otherwise they are joined with one space. No other normalization.

use super::TextFragment;

/// Fraction of image height separating two lines.
pub const LINE_BREAK_THRESHOLD: f64 = 0.02;

/// Ordering of fragments that share a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WithinLineOrder {
    /// Keep the recognizer's discovery order.
    #[default]
    Discovery,
    /// Sort by left edge.
    LeftToRight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssembleOptions {
    pub line_threshold: f64,
    pub within_line: WithinLineOrder,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            line_threshold: LINE_BREAK_THRESHOLD,
            within_line: WithinLineOrder::Discovery,
        }
    }
}

/// Assemble with default options.
pub fn assemble(fragments: &[TextFragment]) -> String {
    assemble_with(fragments, &AssembleOptions::default())
}

pub fn assemble_with(fragments: &[TextFragment], options: &AssembleOptions) -> String {
    let mut sorted: Vec<&TextFragment> = fragments.iter().collect();
    // Stable: equal centers keep discovery order.
    sorted.sort_by(|a, b| b.bounds.mid_y().total_cmp(&a.bounds.mid_y()));

    let mut lines: Vec<Vec<&TextFragment>> = Vec::new();
    let mut prev_center: Option<f64> = None;
    for fragment in sorted {
        let center = fragment.bounds.mid_y();
        match (prev_center, lines.last_mut()) {
            (Some(prev), Some(line)) if (center - prev).abs() <= options.line_threshold => {
                line.push(fragment)
            }
            _ => lines.push(vec![fragment]),
        }
        prev_center = Some(center);
    }

    if options.within_line == WithinLineOrder::LeftToRight {
        for line in &mut lines {
            line.sort_by(|a, b| a.bounds.x.total_cmp(&b.bounds.x));
        }
    }

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (j, fragment) in line.iter().enumerate() {
            if j > 0 && needs_space(&out, &fragment.text) {
                out.push(' ');
            }
            out.push_str(&fragment.text);
        }
    }
    out
}

fn needs_space(before: &str, next: &str) -> bool {
    let ends_ws = before.chars().last().is_some_and(char::is_whitespace);
    let starts_ws = next.chars().next().is_some_and(char::is_whitespace);
    !ends_ws && !starts_ws
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::NormalizedRect;

    fn frag(text: &str, x: f64, mid_y: f64) -> TextFragment {
        TextFragment::new(
            text,
            NormalizedRect {
                x,
                y: mid_y - 0.01,
                width: 0.2,
                height: 0.02,
            },
        )
    }

    #[test]
    fn empty_input_is_empty_string() {
        assert_eq!(assemble(&[]), "");
    }

    #[test]
    fn sorts_top_to_bottom_regardless_of_discovery() {
        let top = frag("top", 0.0, 0.9);
        let mid = frag("mid", 0.0, 0.5);
        let low = frag("low", 0.0, 0.1);
        let expected = "top\nmid\nlow";
        assert_eq!(assemble(&[low.clone(), top.clone(), mid.clone()]), expected);
        assert_eq!(assemble(&[mid.clone(), low.clone(), top.clone()]), expected);
        assert_eq!(assemble(&[top, mid, low]), expected);
    }

    #[test]
    fn same_line_joins_with_single_space() {
        let a = frag("Hello", 0.0, 0.5);
        let b = frag("World", 0.5, 0.5);
        assert_eq!(assemble(&[a, b]), "Hello World");
    }

    #[test]
    fn higher_center_leads_within_a_line() {
        // Same line, but the vertical sort still runs first.
        let a = frag("Hello", 0.0, 0.50);
        let b = frag("World", 0.5, 0.51);
        assert_eq!(assemble(&[a.clone(), b.clone()]), "World Hello");

        let options = AssembleOptions {
            within_line: WithinLineOrder::LeftToRight,
            ..Default::default()
        };
        assert_eq!(assemble_with(&[a, b], &options), "Hello World");
    }

    #[test]
    fn no_duplicate_space() {
        let a = frag("Hello ", 0.0, 0.5);
        let b = frag("World", 0.5, 0.5);
        assert_eq!(assemble(&[a, b]), "Hello World");
        let c = frag("Hello", 0.0, 0.5);
        let d = frag(" World", 0.5, 0.5);
        assert_eq!(assemble(&[c, d]), "Hello World");
    }

    #[test]
    fn threshold_is_strict() {
        // 0.025 apart → new line; 0.015 → same line
        let a = frag("a", 0.0, 0.500);
        let b = frag("b", 0.0, 0.475);
        let c = frag("c", 0.0, 0.460);
        assert_eq!(assemble(&[a, b, c]), "a\nb c");
    }

    #[test]
    fn discovery_order_kept_within_line() {
        let right = frag("right", 0.7, 0.5);
        let left = frag("left", 0.1, 0.5);
        assert_eq!(assemble(&[right.clone(), left.clone()]), "right left");

        let options = AssembleOptions {
            within_line: WithinLineOrder::LeftToRight,
            ..Default::default()
        };
        assert_eq!(assemble_with(&[right, left], &options), "left right");
    }

    #[test]
    fn interior_whitespace_untouched() {
        let a = frag("x  =  1", 0.0, 0.5);
        assert_eq!(assemble(&[a]), "x  =  1");
    }

    #[test]
    fn deterministic() {
        let frags = vec![frag("b", 0.0, 0.3), frag("a", 0.0, 0.7), frag("c", 0.3, 0.3)];
        assert_eq!(assemble(&frags), assemble(&frags));
        assert_eq!(assemble(&frags), "a\nb c");
    }
}
