use crate::fonts::FontStyle;
use crate::model::ImageAsset;

use super::canvas::{DrawOp, ImageId};
use super::context::RenderContext;
use super::image::fit_within;
use super::text::{Align, CELL_PAD, draw_lines_centered_in_band, wrap_text};

const BORDER_WIDTH: f32 = 0.5;

#[derive(Clone, Copy, Debug)]
pub(crate) enum ColumnWidth {
    /// Share of the usable page width.
    Fraction(f32),
    /// Absolute width in points.
    Fixed(f32),
}

pub(crate) struct Column {
    pub(crate) header: &'static str,
    pub(crate) width: ColumnWidth,
    pub(crate) align: Align,
}

impl Column {
    pub(crate) fn new(header: &'static str, width: ColumnWidth, align: Align) -> Self {
        Self {
            header,
            width,
            align,
        }
    }
}

pub(crate) struct TableStyle {
    pub(crate) header_size: f32,
    pub(crate) header_line_h: f32,
    pub(crate) header_fill: Option<[u8; 3]>,
    pub(crate) body_size: f32,
    pub(crate) body_line_h: f32,
    /// Blank rows are appended until the body has at least this many rows.
    pub(crate) min_rows: usize,
    /// Height reserved for a cell that carries an image.
    pub(crate) image_row_h: f32,
}

#[derive(Default)]
pub(crate) struct TableCell<'a> {
    pub(crate) text: String,
    pub(crate) image: Option<&'a ImageAsset>,
}

impl<'a> TableCell<'a> {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub(crate) fn image(image: Option<&'a ImageAsset>) -> Self {
        Self {
            text: String::new(),
            image,
        }
    }
}

/// What happened while laying out one table.
#[derive(Debug, Default)]
pub(crate) struct TableOutcome {
    /// Common height of every body row, padding rows included.
    pub(crate) row_heights: Vec<f32>,
    /// How many times the header band was drawn (1 + page breaks inside the table).
    pub(crate) header_draws: usize,
}

/// Column widths in points. Widths that would exceed the usable width are
/// scaled down proportionally.
fn resolve_widths(columns: &[Column], usable: f32) -> Vec<f32> {
    let mut widths: Vec<f32> = columns
        .iter()
        .map(|c| match c.width {
            ColumnWidth::Fraction(f) => usable * f,
            ColumnWidth::Fixed(w) => w,
        })
        .collect();
    let total: f32 = widths.iter().sum();
    if total > usable + 0.01 {
        log::debug!("table columns sum to {total:.1}pt > {usable:.1}pt, scaling down");
        let scale = usable / total;
        for w in &mut widths {
            *w *= scale;
        }
    }
    widths
}

fn column_lefts(left: f32, widths: &[f32]) -> Vec<f32> {
    widths
        .iter()
        .scan(left, |x, w| {
            let this = *x;
            *x += w;
            Some(this)
        })
        .collect()
}

/// A body cell after the pre-measurement pass.
struct MeasuredCell {
    lines: Vec<String>,
    image: Option<(ImageId, f32, f32)>,
}

struct HeaderBand {
    lines: Vec<Vec<String>>,
    height: f32,
}

fn measure_header(ctx: &RenderContext, columns: &[Column], widths: &[f32], style: &TableStyle) -> HeaderBand {
    let lines: Vec<Vec<String>> = columns
        .iter()
        .zip(widths)
        .map(|(col, &w)| {
            wrap_text(
                ctx.fonts,
                FontStyle::Bold,
                style.header_size,
                col.header,
                (w - 2.0 * CELL_PAD).max(1.0),
            )
        })
        .collect();
    let max_lines = lines.iter().map(Vec::len).max().unwrap_or(1).max(1);
    HeaderBand {
        lines,
        height: max_lines as f32 * style.header_line_h,
    }
}

fn draw_header(ctx: &mut RenderContext, band: &HeaderBand, columns: &[Column], widths: &[f32], style: &TableStyle) {
    let left = ctx.canvas.geometry().margin_left;
    let top = ctx.canvas.current_y();
    ctx.canvas.set_font(FontStyle::Bold, style.header_size);
    for ((x, &w), (col, lines)) in column_lefts(left, widths)
        .into_iter()
        .zip(widths)
        .zip(columns.iter().zip(&band.lines))
    {
        ctx.canvas.push(DrawOp::Rect {
            x,
            y: top,
            w,
            h: band.height,
            fill: style.header_fill,
            stroke: Some(BORDER_WIDTH),
        });
        draw_lines_centered_in_band(
            &mut ctx.canvas,
            ctx.fonts,
            x,
            w,
            top,
            band.height,
            style.header_line_h,
            lines,
            col.align,
        );
    }
    ctx.canvas.set_y(top + band.height);
}

fn measure_row(
    ctx: &mut RenderContext,
    row: &[TableCell],
    widths: &[f32],
    style: &TableStyle,
) -> (Vec<MeasuredCell>, f32) {
    let mut height = style.body_line_h;
    let cells: Vec<MeasuredCell> = row
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(col, (cell, &w))| {
            let image = cell.image.and_then(|asset| {
                let (id, px_w, px_h) = ctx
                    .canvas
                    .embed_image(asset, &format!("table image in column {}", col + 1))?;
                Some((id, px_w as f32, px_h as f32))
            });
            let lines = wrap_text(
                ctx.fonts,
                FontStyle::Regular,
                style.body_size,
                &cell.text,
                (w - 2.0 * CELL_PAD).max(1.0),
            );
            let text_h = lines.len() as f32 * style.body_line_h;
            let cell_h = if image.is_some() {
                style.image_row_h.max(text_h)
            } else {
                text_h
            };
            height = height.max(cell_h);
            MeasuredCell { lines, image }
        })
        .collect();
    (cells, height)
}

/// Height a table needs before its first body row can be drawn: the header
/// band plus that row, images counted at their reserved height. Used to keep a
/// section heading on the same page as its table.
pub(crate) fn opening_height(
    ctx: &RenderContext,
    columns: &[Column],
    style: &TableStyle,
    first_row: Option<&[TableCell]>,
) -> f32 {
    let g = ctx.canvas.geometry();
    let widths = resolve_widths(columns, g.usable_width());
    let band = measure_header(ctx, columns, &widths, style);
    let page_room = g.page_break_trigger() - g.content_top() - band.height;
    let row_h = first_row.map_or(style.body_line_h, |row| {
        row.iter().zip(&widths).fold(style.body_line_h, |h, (cell, &w)| {
            let lines = wrap_text(
                ctx.fonts,
                FontStyle::Regular,
                style.body_size,
                &cell.text,
                (w - 2.0 * CELL_PAD).max(1.0),
            );
            let text_h = lines.len() as f32 * style.body_line_h;
            let cell_h = if cell.image.is_some() {
                style.image_row_h.max(text_h)
            } else {
                text_h
            };
            h.max(cell_h)
        })
    });
    // A row that will be split only needs its first line on this page.
    if row_h > page_room + 0.01 {
        band.height + style.body_line_h
    } else {
        band.height + row_h
    }
}

/// Column geometry shared by every row of one table.
struct Grid<'c> {
    columns: &'c [Column],
    lefts: Vec<f32>,
    widths: Vec<f32>,
}

impl Grid<'_> {
    /// Draw lines `from..to` of every cell as one bordered band of height `h`
    /// hanging from `top`. Images are only placed in the band that starts the
    /// row.
    fn draw_band(
        &self,
        ctx: &mut RenderContext,
        cells: &[MeasuredCell],
        style: &TableStyle,
        top: f32,
        (from, to): (usize, usize),
        h: f32,
    ) {
        // Pass 1: cell text.
        ctx.canvas.set_font(FontStyle::Regular, style.body_size);
        for (ci, cell) in cells.iter().enumerate() {
            let (Some(&x), Some(&w)) = (self.lefts.get(ci), self.widths.get(ci)) else {
                continue;
            };
            let end = to.min(cell.lines.len());
            let lines = &cell.lines[from.min(end)..end];
            let align = self.columns.get(ci).map_or(Align::Left, |c| c.align);
            draw_lines_centered_in_band(
                &mut ctx.canvas,
                ctx.fonts,
                x,
                w,
                top,
                lines.len() as f32 * style.body_line_h,
                style.body_line_h,
                lines,
                align,
            );
        }

        // Pass 2: images centred in their cells, then borders at the common height.
        if from == 0 {
            for (ci, cell) in cells.iter().enumerate() {
                let (Some((image, px_w, px_h)), Some(&x), Some(&w)) =
                    (cell.image, self.lefts.get(ci), self.widths.get(ci))
                else {
                    continue;
                };
                let (iw, ih) = fit_within(px_w, px_h, w - 2.0 * CELL_PAD, h - 2.0 * CELL_PAD);
                ctx.canvas.push(DrawOp::Image {
                    x: x + (w - iw) / 2.0,
                    y: top + (h - ih) / 2.0,
                    w: iw,
                    h: ih,
                    image,
                });
            }
        }
        for (&x, &w) in self.lefts.iter().zip(&self.widths) {
            ctx.canvas.push(DrawOp::Rect {
                x,
                y: top,
                w,
                h,
                fill: None,
                stroke: Some(BORDER_WIDTH),
            });
        }
        ctx.canvas.set_y(top + h);
    }
}

/// Lay out a bordered table at the cursor: a header band, then one row per entry
/// of `rows` (padded to `style.min_rows`). Every row is as tall as its tallest
/// cell; a row that would cross the page-break trigger moves to a new page and
/// the header band is repeated above it. A row taller than a whole page is
/// split between lines instead, with the header repeated above each part.
pub(crate) fn draw_table(
    ctx: &mut RenderContext,
    columns: &[Column],
    style: &TableStyle,
    rows: &[Vec<TableCell>],
) -> TableOutcome {
    let g = *ctx.canvas.geometry();
    let widths = resolve_widths(columns, g.usable_width());
    let grid = Grid {
        columns,
        lefts: column_lefts(g.margin_left, &widths),
        widths,
    };
    let band = measure_header(ctx, columns, &grid.widths, style);
    let page_room = g.page_break_trigger() - g.content_top() - band.height;
    let mut outcome = TableOutcome::default();

    let blank_row: Vec<TableCell> = Vec::new();
    let row_count = rows.len().max(style.min_rows);

    for ri in 0..row_count {
        let row = rows.get(ri).unwrap_or(&blank_row);
        let (measured, row_h) = measure_row(ctx, row, &grid.widths, style);
        let split = row_h > page_room + 0.01;

        // The header never sits alone at the bottom of a page: the first row
        // (or, for a split row, its first line) must fit below it.
        let first = if split { style.body_line_h } else { row_h };
        let needed = if outcome.header_draws == 0 {
            band.height + first
        } else {
            first
        };
        if ctx.ensure_space(needed) || outcome.header_draws == 0 {
            draw_header(ctx, &band, columns, &grid.widths, style);
            outcome.header_draws += 1;
        }

        log::debug!(
            "TABLE row={} row_h={:.2} cells={} y={:.2} page={} split={}",
            ri,
            row_h,
            row.len(),
            ctx.canvas.current_y(),
            ctx.canvas.page_count(),
            split
        );

        if !split {
            let top = ctx.canvas.current_y();
            grid.draw_band(ctx, &measured, style, top, (0, usize::MAX), row_h);
            outcome.row_heights.push(row_h);
            continue;
        }

        let total = measured.iter().map(|m| m.lines.len()).max().unwrap_or(0).max(1);
        let mut from = 0;
        let mut drawn = 0.0;
        loop {
            let top = ctx.canvas.current_y();
            let fit = ((g.page_break_trigger() - top) / style.body_line_h).floor().max(1.0) as usize;
            let to = (from + fit).min(total);
            let h = (to - from) as f32 * style.body_line_h;
            grid.draw_band(ctx, &measured, style, top, (from, to), h);
            drawn += h;
            from = to;
            if from >= total {
                break;
            }
            ctx.advance_page();
            draw_header(ctx, &band, columns, &grid.widths, style);
            outcome.header_draws += 1;
        }
        outcome.row_heights.push(drawn);
    }

    outcome
}
