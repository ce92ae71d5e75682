use crate::fonts::{FontSet, FontStyle};

use super::context::RenderContext;
use super::text::{Align, CELL_PAD, draw_cell, wrap_text};

pub(crate) const PAIR_SIZE: f32 = 10.0;
pub(crate) const PAIR_LINE_H: f32 = 14.0;

/// Values that mean "nothing to show" in the source forms.
const NOT_APPLICABLE: [&str; 3] = ["n/a", "na", "not applicable"];

/// True when a pair with this value must not be drawn at all.
pub(crate) fn is_suppressed(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => true,
        Some(v) => NOT_APPLICABLE.iter().any(|s| v.eq_ignore_ascii_case(s)),
    }
}

/// One column of pre-wrapped, styled lines drawn by `flow_columns`.
pub(crate) struct FlowColumn {
    x: f32,
    w: f32,
    lines: Vec<(FontStyle, String)>,
}

impl FlowColumn {
    /// Wrap each `(style, text)` entry to the column width, in order.
    pub(crate) fn wrapped<S: AsRef<str>>(fonts: &FontSet, x: f32, w: f32, entries: &[(FontStyle, S)]) -> Self {
        let max_w = (w - 2.0 * CELL_PAD).max(1.0);
        let lines = entries
            .iter()
            .flat_map(|(style, text)| {
                let style = *style;
                wrap_text(fonts, style, PAIR_SIZE, text.as_ref(), max_w)
                    .into_iter()
                    .map(move |line| (style, line))
            })
            .collect();
        Self { x, w, lines }
    }

    pub(crate) fn height(&self) -> f32 {
        self.lines.len() as f32 * PAIR_LINE_H
    }
}

/// Draw `columns` side by side from the cursor, one row of lines at a time.
/// Every row is checked against the page-break trigger, so a block taller
/// than the room left continues on the next page with its columns aligned.
/// Returns whether the block was split after its first row.
pub(crate) fn flow_columns(ctx: &mut RenderContext, columns: &[FlowColumn]) -> bool {
    let rows = columns.iter().map(|c| c.lines.len()).max().unwrap_or(0);
    let left = ctx.canvas.geometry().margin_left;
    let mut split = false;
    for row in 0..rows {
        if ctx.ensure_space(PAIR_LINE_H) && row > 0 {
            split = true;
        }
        let y = ctx.canvas.current_y();
        for col in columns {
            let Some((style, line)) = col.lines.get(row) else {
                continue;
            };
            ctx.canvas.move_to(col.x, y);
            ctx.canvas.set_font(*style, PAIR_SIZE);
            draw_cell(&mut ctx.canvas, ctx.fonts, col.w, PAIR_LINE_H, line, false, Align::Left);
        }
        ctx.canvas.move_to(left, y + PAIR_LINE_H);
    }
    split
}

/// Bold `label` in a column of width `label_w` at the left margin, `value`
/// wrapped in the remaining width beside it. The cursor ends below the taller
/// of the two. Suppressed values draw nothing and leave the cursor untouched.
///
/// The page-break pre-check uses a single nominal line. A value that turns out
/// taller than the room left continues on the next page, and the miss is
/// recorded as an overflow event. Returns whether anything was drawn.
pub(crate) fn draw_pair(ctx: &mut RenderContext, label: &str, value: Option<&str>, label_w: f32) -> bool {
    let Some(value) = value.filter(|&v| !is_suppressed(Some(v))) else {
        return false;
    };
    let g = *ctx.canvas.geometry();
    let columns = [
        FlowColumn::wrapped(ctx.fonts, g.margin_left, label_w, &[(FontStyle::Bold, label)]),
        FlowColumn::wrapped(
            ctx.fonts,
            g.margin_left + label_w,
            g.usable_width() - label_w,
            &[(FontStyle::Regular, value.trim())],
        ),
    ];
    let actual = columns.iter().map(FlowColumn::height).fold(0.0, f32::max);
    if flow_columns(ctx, &columns) {
        ctx.record_overflow(label, PAIR_LINE_H, actual);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::fonts::FontSet;
    use crate::model::DocumentRecord;
    use crate::pdf::canvas::DrawOp;

    fn with_ctx<R>(f: impl FnOnce(&mut RenderContext) -> R) -> (R, crate::pdf::LaidOutDocument) {
        let config = RenderConfig::default();
        let fonts = FontSet::builtin();
        let record = DocumentRecord::default();
        let mut ctx = RenderContext::new(&record, &config, &fonts);
        ctx.advance_page();
        let r = f(&mut ctx);
        (r, ctx.finish())
    }

    #[test]
    fn suppression_sentinels() {
        assert!(is_suppressed(None));
        assert!(is_suppressed(Some("")));
        assert!(is_suppressed(Some("   ")));
        assert!(is_suppressed(Some("N/A")));
        assert!(is_suppressed(Some("not applicable")));
        assert!(!is_suppressed(Some("No")));
        assert!(!is_suppressed(Some("0")));
    }

    #[test]
    fn suppressed_pairs_consume_no_space() {
        let ((y0, y1), doc) = with_ctx(|ctx| {
            let y0 = ctx.canvas.current_y();
            for value in [None, Some(""), Some("N/A"), Some(" n/a ")] {
                assert!(!draw_pair(ctx, "Lid Required", value, 120.0));
            }
            (y0, ctx.canvas.current_y())
        });
        assert_eq!(y0, y1);
        assert!(doc.pages[0].body.is_empty());
    }

    #[test]
    fn unset_pair_leaves_no_gap() {
        let (_, with_gap) = with_ctx(|ctx| {
            draw_pair(ctx, "Capacity", Some("500 ml"), 120.0);
            draw_pair(ctx, "Lid Required", None, 120.0);
            draw_pair(ctx, "Material", Some("PET"), 120.0);
        });
        let (_, without) = with_ctx(|ctx| {
            draw_pair(ctx, "Capacity", Some("500 ml"), 120.0);
            draw_pair(ctx, "Material", Some("PET"), 120.0);
        });
        assert_eq!(with_gap.pages[0].body, without.pages[0].body);
        assert!(!with_gap.pages[0].texts().any(|t| t == "Lid Required"));
    }

    #[test]
    fn cursor_ends_below_the_taller_column() {
        let long = "a value long enough that it has to wrap onto more than one line beside its label, and then some more";
        let (y, doc) = with_ctx(|ctx| {
            let y0 = ctx.canvas.current_y();
            draw_pair(ctx, "Specification", Some(long), 120.0);
            ctx.canvas.current_y() - y0
        });
        assert!(y >= 2.0 * PAIR_LINE_H - 1e-3);
        let labels: Vec<_> = doc.pages[0]
            .body
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { style: FontStyle::Bold, text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["Specification"]);
    }

    #[test]
    fn underestimated_pair_continues_on_the_next_page() {
        let long = "word ".repeat(400);
        let (_, doc) = with_ctx(|ctx| {
            let trigger = ctx.canvas.geometry().page_break_trigger();
            ctx.canvas.set_y(trigger - 2.0 * PAIR_LINE_H - 1.0);
            draw_pair(ctx, "Notes", Some(long.as_str()), 120.0);
        });
        assert_eq!(doc.overflow_events.len(), 1);
        let event = &doc.overflow_events[0];
        assert_eq!(event.label, "Notes");
        assert!(event.actual > event.estimated);

        let trigger = doc.geometry.page_break_trigger();
        assert!(doc.pages.len() >= 2);
        for page in &doc.pages {
            assert!(page.body.iter().all(|op| op.bottom() <= trigger + 1e-3));
        }
        // Two rows fit on the first page, the rest of the value follows.
        assert_eq!(doc.pages[0].texts().count(), 3);
        assert!(doc.pages[1].texts().all(|t| t.starts_with("word")));
        let drawn: usize = doc.pages.iter().map(|p| p.texts().count()).sum();
        assert_eq!(drawn as f32 * PAIR_LINE_H, event.actual + PAIR_LINE_H);
    }

    #[test]
    fn columns_stay_aligned_across_a_break() {
        let fonts = FontSet::builtin();
        let (split, doc) = with_ctx(|ctx| {
            let trigger = ctx.canvas.geometry().page_break_trigger();
            ctx.canvas.set_y(trigger - PAIR_LINE_H - 1.0);
            let left = ctx.canvas.geometry().margin_left;
            let a: Vec<(FontStyle, String)> = (0..3).map(|i| (FontStyle::Regular, format!("a{i}"))).collect();
            let b = [(FontStyle::Italic, "b0")];
            let columns = [
                FlowColumn::wrapped(&fonts, left, 200.0, &a),
                FlowColumn::wrapped(&fonts, left + 200.0, 200.0, &b),
            ];
            flow_columns(ctx, &columns)
        });
        assert!(split);
        let first: Vec<_> = doc.pages[0].texts().collect();
        assert_eq!(first, vec!["a0", "b0"]);
        let second: Vec<_> = doc.pages[1].texts().collect();
        assert_eq!(second, vec!["a1", "a2"]);
    }
}
