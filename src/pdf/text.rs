use crate::fonts::{FontSet, FontStyle};

use super::canvas::{Canvas, DrawOp};

/// Horizontal gap between a cell edge and its text.
pub(crate) const CELL_PAD: f32 = 2.83; // 1 mm

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Center,
    Right,
}

/// Baseline of a line of text vertically centred in a band of height `h`.
fn baseline_in(top: f32, h: f32, font_size: f32) -> f32 {
    top + h / 2.0 + 0.3 * font_size
}

fn aligned_x(left: f32, width: f32, text_w: f32, align: Align) -> f32 {
    match align {
        Align::Left => left + CELL_PAD,
        Align::Center => left + (width - text_w) / 2.0,
        Align::Right => left + width - CELL_PAD - text_w,
    }
}

/// Split `word` into pieces no wider than `max_width`; a single char wider than
/// the limit still gets a piece of its own.
fn break_long_word(
    word: &str,
    fonts: &FontSet,
    style: FontStyle,
    size: f32,
    max_width: f32,
) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        let mut candidate = current.clone();
        candidate.push(ch);
        if !current.is_empty() && fonts.text_width(style, size, &candidate) > max_width {
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Greedy word wrap of `text` to `max_width` using measured glyph widths.
/// Explicit newlines start a new line. Empty or whitespace-only text yields no
/// lines at all.
pub(crate) fn wrap_text(
    fonts: &FontSet,
    style: FontStyle,
    size: f32,
    text: &str,
    max_width: f32,
) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let space_w = fonts.text_width(style, size, " ");
    let mut lines = Vec::new();

    for para in text.trim_end().split('\n') {
        let para = para.trim_end_matches('\r');
        let mut current = String::new();
        let mut current_w = 0.0f32;

        for word in para.split_whitespace() {
            let word_w = fonts.text_width(style, size, word);
            let pieces = if word_w > max_width {
                break_long_word(word, fonts, style, size, max_width)
            } else {
                vec![word.to_string()]
            };
            for piece in pieces {
                let piece_w = fonts.text_width(style, size, &piece);
                if current.is_empty() {
                    current_w = piece_w;
                    current = piece;
                } else if current_w + space_w + piece_w <= max_width {
                    current.push(' ');
                    current.push_str(&piece);
                    current_w += space_w + piece_w;
                } else {
                    lines.push(std::mem::replace(&mut current, piece));
                    current_w = piece_w;
                }
            }
        }
        lines.push(current);
    }
    lines
}

/// Resolve a requested width; 0 means "up to the right margin".
fn resolve_width(canvas: &Canvas, w: f32) -> f32 {
    if w > 0.0 {
        w
    } else {
        let g = canvas.geometry();
        (g.width - g.margin_right - canvas.current_x()).max(0.0)
    }
}

fn push_text(canvas: &mut Canvas, x: f32, baseline: f32, text: String) {
    let c = *canvas.cursor();
    canvas.push(DrawOp::Text {
        x,
        baseline,
        text,
        style: c.style,
        size: c.size,
        color: c.color,
    });
}

/// Fixed-height single-line cell at the cursor. The cursor moves right by the
/// cell width.
pub(crate) fn draw_cell(
    canvas: &mut Canvas,
    fonts: &FontSet,
    w: f32,
    h: f32,
    text: &str,
    bordered: bool,
    align: Align,
) {
    let w = resolve_width(canvas, w);
    let (x, y) = (canvas.current_x(), canvas.current_y());
    if bordered {
        canvas.push(DrawOp::Rect {
            x,
            y,
            w,
            h,
            fill: None,
            stroke: Some(0.5),
        });
    }
    if !text.trim().is_empty() {
        let c = *canvas.cursor();
        let text_w = fonts.text_width(c.style, c.size, text);
        let tx = aligned_x(x, w, text_w, align);
        push_text(canvas, tx, baseline_in(y, h, c.size), text.to_string());
    }
    canvas.set_x(x + w);
}

/// Draw `text` wrapped to `w` starting at the cursor, one `line_h` per line.
/// Returns the y just below the last line and leaves the cursor there, at the
/// block's left edge. Empty text draws nothing and returns the starting y.
pub(crate) fn draw_wrapped_block(
    canvas: &mut Canvas,
    fonts: &FontSet,
    w: f32,
    line_h: f32,
    text: &str,
    align: Align,
) -> f32 {
    let w = resolve_width(canvas, w);
    let (x, mut y) = (canvas.current_x(), canvas.current_y());
    let c = *canvas.cursor();
    for line in wrap_text(fonts, c.style, c.size, text, (w - 2.0 * CELL_PAD).max(1.0)) {
        if !line.is_empty() {
            let text_w = fonts.text_width(c.style, c.size, &line);
            push_text(canvas, aligned_x(x, w, text_w, align), baseline_in(y, line_h, c.size), line);
        }
        y += line_h;
    }
    canvas.move_to(x, y);
    y
}

/// Lines of `lines` centred in a band of height `band_h` starting at `top`.
pub(crate) fn draw_lines_centered_in_band(
    canvas: &mut Canvas,
    fonts: &FontSet,
    x: f32,
    w: f32,
    top: f32,
    band_h: f32,
    line_h: f32,
    lines: &[String],
    align: Align,
) {
    let c = *canvas.cursor();
    let offset = ((band_h - lines.len() as f32 * line_h) / 2.0).max(0.0);
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let line_top = top + offset + i as f32 * line_h;
        let text_w = fonts.text_width(c.style, c.size, line);
        push_text(
            canvas,
            aligned_x(x, w, text_w, align),
            baseline_in(line_top, line_h, c.size),
            line.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageGeometry;
    use crate::pdf::furniture::PageKind;

    fn setup() -> (Canvas, FontSet) {
        let mut canvas = Canvas::new(PageGeometry::a4());
        canvas.begin_page(PageKind::Interior);
        canvas.set_font(FontStyle::Regular, 10.0);
        (canvas, FontSet::builtin())
    }

    #[test]
    fn wrap_is_greedy_and_respects_width() {
        let fonts = FontSet::builtin();
        let text = "the quick brown fox jumps over the lazy dog";
        let max = 60.0;
        let lines = wrap_text(&fonts, FontStyle::Regular, 10.0, text, max);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(fonts.text_width(FontStyle::Regular, 10.0, line) <= max + 1e-3, "{line}");
        }
        assert_eq!(lines.join(" "), text);
        // Greedy: the first word of every line would not have fit on the previous one.
        for pair in lines.windows(2) {
            let first = pair[1].split(' ').next().unwrap();
            let joined = format!("{} {}", pair[0], first);
            assert!(fonts.text_width(FontStyle::Regular, 10.0, &joined) > max);
        }
    }

    #[test]
    fn explicit_newlines_and_long_words() {
        let fonts = FontSet::builtin();
        let lines = wrap_text(&fonts, FontStyle::Regular, 10.0, "a\nb", 100.0);
        assert_eq!(lines, vec!["a", "b"]);

        let lines = wrap_text(&fonts, FontStyle::Regular, 10.0, "WWWWWWWWWWWWWWWW", 40.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "WWWWWWWWWWWWWWWW");
    }

    #[test]
    fn blank_text_draws_nothing() {
        let (mut canvas, fonts) = setup();
        let y0 = canvas.current_y();
        for text in ["", "   ", "\n\t"] {
            let y = draw_wrapped_block(&mut canvas, &fonts, 100.0, 12.0, text, Align::Left);
            assert_eq!(y, y0);
        }
        let (pages, _, _) = canvas.finish();
        assert!(pages[0].body.is_empty());
    }

    #[test]
    fn wrapped_block_returns_y_below_last_line() {
        let (mut canvas, fonts) = setup();
        let y0 = canvas.current_y();
        let text = "one two three four five six seven eight nine ten";
        let c = *canvas.cursor();
        let expected = wrap_text(&fonts, c.style, c.size, text, 60.0 - 2.0 * CELL_PAD).len() as f32 * 12.0;
        let y = draw_wrapped_block(&mut canvas, &fonts, 60.0, 12.0, text, Align::Left);
        assert!((y - y0 - expected).abs() < 1e-3);
        assert_eq!(canvas.current_y(), y);
        assert!(expected >= 24.0);
    }

    #[test]
    fn cell_advances_x_only() {
        let (mut canvas, fonts) = setup();
        let (x0, y0) = (canvas.current_x(), canvas.current_y());
        draw_cell(&mut canvas, &fonts, 50.0, 10.0, "Label", true, Align::Left);
        assert_eq!(canvas.current_x(), x0 + 50.0);
        assert_eq!(canvas.current_y(), y0);
    }
}
