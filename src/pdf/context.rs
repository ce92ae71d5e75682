use crate::config::RenderConfig;
use crate::fonts::FontSet;
use crate::model::DocumentRecord;

use super::LaidOutDocument;
use super::canvas::Canvas;
use super::furniture::{Furniture, PageKind};

/// A block whose real height exceeded the nominal height used for its
/// page-break pre-check, so it ran past the page-break trigger.
#[derive(Clone, Debug, PartialEq)]
pub struct OverflowEvent {
    pub page: usize,
    pub label: String,
    pub estimated: f32,
    pub actual: f32,
}

/// All mutable state of one render pass. Built fresh for every render and
/// consumed by `finish`.
pub(crate) struct RenderContext<'a> {
    pub(crate) canvas: Canvas,
    pub(crate) fonts: &'a FontSet,
    pub(crate) config: &'a RenderConfig,
    furniture: Furniture,
    overflow_events: Vec<OverflowEvent>,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(record: &DocumentRecord, config: &'a RenderConfig, fonts: &'a FontSet) -> Self {
        let mut canvas = Canvas::new(config.geometry);
        let furniture = Furniture::new(record, &mut canvas);
        Self {
            canvas,
            fonts,
            config,
            furniture,
            overflow_events: Vec::new(),
        }
    }

    pub(crate) fn begin_cover(&mut self, record: &DocumentRecord) {
        self.canvas.begin_page(PageKind::Cover);
        self.furniture.draw_cover(&mut self.canvas, self.fonts, record);
    }

    /// Continue on a new page of the same kind; content that spills off the
    /// cover continues on an interior page.
    pub(crate) fn advance_page(&mut self) {
        let kind = match self.canvas.current_kind() {
            Some(PageKind::Submission) => PageKind::Submission,
            _ => PageKind::Interior,
        };
        self.advance_page_as(kind);
    }

    /// Start a new page and draw its furniture. The furniture code only sees the
    /// canvas, never this context, so it cannot trigger another page break.
    pub(crate) fn advance_page_as(&mut self, kind: PageKind) {
        let (x, y) = (self.canvas.current_x(), self.canvas.current_y());
        self.canvas.begin_page(kind);
        self.furniture.decorate(&mut self.canvas, self.fonts);
        log::debug!(
            "page break → page {} ({kind:?}) from x={x:.1} y={y:.1}",
            self.canvas.page_count()
        );
    }

    /// Advance the page if `needed` more points would cross the page-break
    /// trigger. Returns whether a break happened.
    pub(crate) fn ensure_space(&mut self, needed: f32) -> bool {
        if self.canvas.will_overflow(needed) && !self.canvas.at_page_top() {
            self.advance_page();
            true
        } else {
            false
        }
    }

    pub(crate) fn record_overflow(&mut self, label: &str, estimated: f32, actual: f32) {
        let page = self.canvas.page_count();
        log::debug!(
            "overflow estimate missed for {label:?} on page {page}: estimated {estimated:.1}pt, drew {actual:.1}pt"
        );
        self.overflow_events.push(OverflowEvent {
            page,
            label: label.to_string(),
            estimated,
            actual,
        });
    }

    pub(crate) fn finish(self) -> LaidOutDocument {
        let geometry = *self.canvas.geometry();
        let (pages, images, warnings) = self.canvas.finish();
        LaidOutDocument {
            geometry,
            pages,
            images,
            warnings,
            overflow_events: self.overflow_events,
        }
    }
}
