use crate::config::mm;
use crate::fonts::{FontSet, FontStyle};
use crate::model::{DocumentRecord, ImageAsset};

use super::canvas::{Canvas, DrawOp, ImageId, Layer};
use super::image::fit_within;
use super::text::{Align, CELL_PAD, draw_cell, draw_wrapped_block, wrap_text};

/// What a page is for; decides which furniture it gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageKind {
    /// Title page: no running header or footer.
    Cover,
    /// Section content: header, footer with branding block.
    Interior,
    /// Trailing submission/annexure pages: header and page indicator, no
    /// branding block.
    Submission,
}

impl PageKind {
    pub fn has_running_header(self) -> bool {
        !matches!(self, PageKind::Cover)
    }

    pub fn has_footer(self) -> bool {
        !matches!(self, PageKind::Cover)
    }

    fn has_footer_branding(self) -> bool {
        matches!(self, PageKind::Interior)
    }
}

const CONFIDENTIAL_RED: [u8; 3] = [170, 20, 20];
const RULE_WIDTH: f32 = 0.5;

#[derive(Clone, Copy)]
struct PlacedLogo {
    image: ImageId,
    /// Aspect ratio source size (display size from the record).
    w: f32,
    h: f32,
}

impl PlacedLogo {
    fn embed(canvas: &mut Canvas, asset: &ImageAsset, what: &str) -> Option<Self> {
        let (image, px_w, px_h) = canvas.embed_image(asset, what)?;
        let (w, h) = if asset.display_width > 0.0 && asset.display_height > 0.0 {
            (asset.display_width, asset.display_height)
        } else {
            (px_w as f32, px_h as f32)
        };
        Some(Self { image, w, h })
    }

    /// Draw scaled down to fit `max_w`×`max_h`, hanging from `y`. `edge` is the
    /// left edge, or the right edge when `from_right` is set.
    fn draw(&self, canvas: &mut Canvas, edge: f32, from_right: bool, y: f32, max_w: f32, max_h: f32) {
        let (w, h) = fit_within(self.w, self.h, max_w.min(self.w), max_h.min(self.h));
        let x = if from_right { edge - w } else { edge };
        canvas.push(DrawOp::Image {
            x,
            y,
            w,
            h,
            image: self.image,
        });
    }
}

/// Page header, footer and cover layout. Draws only through the canvas; it is
/// invoked by the page-advance operation and never by section code.
pub(crate) struct Furniture {
    title: String,
    subtitle: String,
    logos: Option<(PlacedLogo, PlacedLogo)>,
    footer_name: Option<String>,
    footer_address: Option<String>,
    accent: Option<[u8; 3]>,
}

fn non_blank(s: Option<&String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Furniture {
    pub(crate) fn new(record: &DocumentRecord, canvas: &mut Canvas) -> Self {
        let branding = record.branding.as_ref();
        // Logos come as a pair; if either fails to decode, neither is drawn.
        let logos = branding.and_then(|b| b.logos.as_ref()).and_then(|pair| {
            let left = PlacedLogo::embed(canvas, &pair.left, "left logo");
            let right = PlacedLogo::embed(canvas, &pair.right, "right logo");
            left.zip(right)
        });

        let subtitle = if !record.rfq_number.trim().is_empty() {
            format!("RFQ No. {}", record.rfq_number.trim())
        } else {
            record.subject.first().cloned().unwrap_or_default()
        };

        Self {
            title: record.title.trim().to_string(),
            subtitle,
            logos,
            footer_name: non_blank(branding.and_then(|b| b.footer_company_name.as_ref())),
            footer_address: non_blank(branding.and_then(|b| b.footer_company_address.as_ref())),
            accent: branding.and_then(|b| b.accent_color),
        }
    }

    /// Running header and footer for the page just begun.
    pub(crate) fn decorate(&self, canvas: &mut Canvas, fonts: &FontSet) {
        let Some(kind) = canvas.current_kind() else {
            return;
        };
        let saved = *canvas.cursor();
        if kind.has_running_header() {
            canvas.set_layer(Layer::Header);
            self.draw_header(canvas, fonts);
        }
        if kind.has_footer() {
            canvas.set_layer(Layer::Footer);
            self.draw_footer(canvas, fonts, kind);
        }
        canvas.set_layer(Layer::Body);
        canvas.restore_cursor(saved);
        let g = *canvas.geometry();
        canvas.move_to(g.margin_left, g.content_top());
    }

    fn draw_header(&self, canvas: &mut Canvas, fonts: &FontSet) {
        let g = *canvas.geometry();
        if let Some((left, right)) = &self.logos {
            let max_w = g.usable_width() * 0.2;
            let max_h = g.header_height - mm(6.0);
            left.draw(canvas, g.margin_left, false, g.margin_top, max_w, max_h);
            right.draw(canvas, g.width - g.margin_right, true, g.margin_top, max_w, max_h);
        }

        let text_w = g.usable_width() * 0.6;
        let text_x = g.margin_left + (g.usable_width() - text_w) / 2.0;
        canvas.move_to(text_x, g.margin_top);
        canvas.set_text_color(None);
        canvas.set_font(FontStyle::Bold, 15.0);
        draw_cell(canvas, fonts, text_w, mm(9.0), &self.title, false, Align::Center);
        canvas.move_to(text_x, g.margin_top + mm(9.0));
        canvas.set_font(FontStyle::Regular, 10.0);
        draw_cell(canvas, fonts, text_w, mm(6.0), &self.subtitle, false, Align::Center);

        let rule_y = g.content_top() - mm(3.0);
        canvas.push(DrawOp::Line {
            x1: g.margin_left,
            y1: rule_y,
            x2: g.width - g.margin_right,
            y2: rule_y,
            width: RULE_WIDTH,
        });
    }

    fn draw_footer(&self, canvas: &mut Canvas, fonts: &FontSet, kind: PageKind) {
        let g = *canvas.geometry();
        let band_top = g.height - g.footer_offset;

        let has_branding = self.footer_name.is_some() || self.footer_address.is_some();
        if kind.has_footer_branding() && has_branding {
            let rule_y = band_top - mm(8.0);
            canvas.push(DrawOp::Line {
                x1: g.margin_left,
                y1: rule_y,
                x2: g.width - g.margin_right,
                y2: rule_y,
                width: RULE_WIDTH,
            });
            if let Some(name) = &self.footer_name {
                canvas.move_to(g.margin_left, band_top - mm(7.0));
                canvas.set_font(FontStyle::Bold, 7.5);
                draw_cell(canvas, fonts, g.usable_width(), mm(3.5), name, false, Align::Center);
            }
            if let Some(address) = &self.footer_address {
                canvas.move_to(g.margin_left, band_top - mm(3.5));
                canvas.set_font(FontStyle::Regular, 7.0);
                draw_cell(canvas, fonts, g.usable_width(), mm(3.5), address, false, Align::Center);
            }
        }

        let size = 8.0;
        let page = canvas.page_count();
        canvas.push(DrawOp::PageNumber {
            center_x: g.margin_left + g.usable_width() / 2.0,
            baseline: band_top + mm(10.0) / 2.0 + 0.3 * size,
            page,
            style: FontStyle::Italic,
            size,
        });
    }

    /// The cover's centred title stack, wrapped to `width`: title, subject,
    /// key dates, then the issuer.
    fn cover_stack(&self, fonts: &FontSet, record: &DocumentRecord, width: f32) -> Vec<CoverBlock> {
        let block = |gap_before: f32, style: FontStyle, size: f32, line_h: f32, inset: f32, texts: &[&str]| CoverBlock {
            gap_before,
            style,
            size,
            line_h,
            color: None,
            inset,
            subject: false,
            lines: texts
                .iter()
                .flat_map(|t| {
                    let max_w = (width * (1.0 - 2.0 * inset) - 2.0 * CELL_PAD).max(1.0);
                    wrap_text(fonts, style, size, t, max_w)
                })
                .collect(),
        };

        let title = self.title.to_uppercase();
        let subject: Vec<&str> = record.subject.iter().map(String::as_str).collect();
        let meta: Vec<String> = [
            ("RFQ No.", record.rfq_number.as_str()),
            ("Date of Issue", record.issue_date.as_str()),
            ("Submission Deadline", record.submission.deadline.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(label, value)| format!("{label}: {}", value.trim()))
        .collect();
        let meta: Vec<&str> = meta.iter().map(String::as_str).collect();
        let department = record.requester.department.as_deref().unwrap_or_default();

        vec![
            CoverBlock {
                color: self.accent,
                ..block(0.0, FontStyle::Bold, 26.0, mm(12.0), 0.0, &[title.as_str()])
            },
            CoverBlock {
                subject: true,
                ..block(mm(4.0), FontStyle::Bold, 16.0, mm(8.0), 0.0, &subject)
            },
            block(mm(6.0), FontStyle::Regular, 12.0, mm(7.0), 0.0, &meta),
            block(mm(14.0), FontStyle::Italic, 11.0, mm(6.0), 0.0, &["Issued by"]),
            block(0.0, FontStyle::Bold, 14.0, mm(7.0), 0.0, &[record.requester.company_name.as_str()]),
            block(0.0, FontStyle::Regular, 11.0, mm(6.0), 0.0, &[department]),
            block(0.0, FontStyle::Regular, 11.0, mm(6.0), 0.15, &[record.requester.address.as_str()]),
        ]
    }

    /// Full-page title layout for the cover page. Drawn into the body layer; the
    /// cover has no running header or footer.
    pub(crate) fn draw_cover(&self, canvas: &mut Canvas, fonts: &FontSet, record: &DocumentRecord) {
        let g = *canvas.geometry();
        let width = g.usable_width();

        if let Some((left, right)) = &self.logos {
            let max_w = width * 0.3;
            let max_h = mm(25.0);
            left.draw(canvas, g.margin_left, false, g.margin_top, max_w, max_h);
            right.draw(canvas, g.width - g.margin_right, true, g.margin_top, max_w, max_h);
        }

        let mark_w = mm(50.0);
        let mark_h = mm(10.0);
        let mark_x = g.margin_left + (width - mark_w) / 2.0;
        let mark_y = g.height - mm(60.0);

        let stack_top = g.height * 0.28;
        let mut stack = self.cover_stack(fonts, record, width);
        let omitted = fit_cover_stack(&mut stack, mark_y - mm(6.0) - stack_top);
        if omitted > 0 {
            canvas.warn(format!(
                "cover title block too tall; {omitted} line(s) left out above the confidential mark"
            ));
        }
        canvas.set_y(stack_top);
        for block in &stack {
            block.draw(canvas, fonts, g.margin_left, width);
        }

        canvas.push(DrawOp::Rect {
            x: mark_x,
            y: mark_y,
            w: mark_w,
            h: mark_h,
            fill: None,
            stroke: Some(1.0),
        });
        canvas.move_to(mark_x, mark_y);
        canvas.set_font(FontStyle::Bold, 14.0);
        canvas.set_text_color(Some(CONFIDENTIAL_RED));
        draw_cell(canvas, fonts, mark_w, mark_h, "CONFIDENTIAL", false, Align::Center);
        canvas.set_text_color(None);

        if let Some(generated_on) = &record.generated_on {
            canvas.set_y(g.height - mm(40.0));
            canvas.set_font(FontStyle::Italic, 9.0);
            let line = format!("Generated on {}", generated_on.trim());
            draw_wrapped_block(canvas, fonts, width, mm(5.0), &line, Align::Center);
        }
    }
}

/// Lines of one style in the cover's title stack.
struct CoverBlock {
    gap_before: f32,
    style: FontStyle,
    size: f32,
    line_h: f32,
    color: Option<[u8; 3]>,
    /// Share of the width left empty on each side.
    inset: f32,
    /// Subject lines are the first to go when the stack does not fit.
    subject: bool,
    lines: Vec<String>,
}

impl CoverBlock {
    fn height(&self) -> f32 {
        self.gap_before + self.lines.len() as f32 * self.line_h
    }

    fn draw(&self, canvas: &mut Canvas, fonts: &FontSet, left: f32, width: f32) {
        canvas.advance_line(self.gap_before);
        canvas.set_font(self.style, self.size);
        canvas.set_text_color(self.color);
        let inner_w = width * (1.0 - 2.0 * self.inset);
        for line in &self.lines {
            let y = canvas.current_y();
            canvas.move_to(left + width * self.inset, y);
            draw_cell(canvas, fonts, inner_w, self.line_h, line, false, Align::Center);
            canvas.move_to(left, y + self.line_h);
        }
        canvas.set_text_color(None);
    }
}

/// Drop lines until the stack fits in `room`: subject lines first, then lines
/// from the bottom of the stack. Returns how many lines were dropped.
fn fit_cover_stack(stack: &mut [CoverBlock], room: f32) -> usize {
    let mut omitted = 0;
    while stack.iter().map(CoverBlock::height).sum::<f32>() > room {
        let victim = stack
            .iter()
            .position(|b| b.subject && !b.lines.is_empty())
            .or_else(|| stack.iter().rposition(|b| !b.lines.is_empty()));
        let Some(i) = victim else {
            break;
        };
        stack[i].lines.pop();
        omitted += 1;
    }
    omitted
}
