use crate::config::PageGeometry;
use crate::fonts::FontStyle;
use crate::model::ImageAsset;

use super::furniture::PageKind;
use super::image::{ImageXObject, decode_image};

/// Index into the document's image table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageId(pub usize);

/// One recorded drawing instruction. Coordinates are in points with y growing
/// downward from the top edge of the page; serialization flips them.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        baseline: f32,
        text: String,
        style: FontStyle,
        size: f32,
        color: Option<[u8; 3]>,
    },
    /// "Page X / N" centred on `center_x`; N is only known once layout is complete
    /// and is filled in when the content stream is written.
    PageNumber {
        center_x: f32,
        baseline: f32,
        page: usize,
        style: FontStyle,
        size: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<[u8; 3]>,
        stroke: Option<f32>,
    },
    Image {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        image: ImageId,
    },
}

impl DrawOp {
    /// Topmost y the op paints at (approximate cap height for text).
    pub fn top(&self) -> f32 {
        match self {
            DrawOp::Text { baseline, size, .. } | DrawOp::PageNumber { baseline, size, .. } => {
                baseline - size * 0.75
            }
            DrawOp::Line { y1, y2, .. } => y1.min(*y2),
            DrawOp::Rect { y, .. } | DrawOp::Image { y, .. } => *y,
        }
    }

    pub fn bottom(&self) -> f32 {
        match self {
            DrawOp::Text { baseline, size, .. } | DrawOp::PageNumber { baseline, size, .. } => {
                baseline + size * 0.25
            }
            DrawOp::Line { y1, y2, .. } => y1.max(*y2),
            DrawOp::Rect { y, h, .. } | DrawOp::Image { y, h, .. } => y + h,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            DrawOp::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Page {
    pub kind: PageKind,
    /// 1-based page number.
    pub number: usize,
    pub body: Vec<DrawOp>,
    pub header: Option<Vec<DrawOp>>,
    pub footer: Option<Vec<DrawOp>>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.body.iter().filter_map(DrawOp::text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Layer {
    Body,
    Header,
    Footer,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Cursor {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) style: FontStyle,
    pub(crate) size: f32,
    pub(crate) color: Option<[u8; 3]>,
}

/// Fixed-size page surface with a write cursor. Owns the page buffers and the
/// image table of one render pass.
pub(crate) struct Canvas {
    geometry: PageGeometry,
    cursor: Cursor,
    pages: Vec<Page>,
    layer: Layer,
    images: Vec<ImageXObject>,
    warnings: Vec<String>,
}

impl Canvas {
    pub(crate) fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            cursor: Cursor {
                x: geometry.margin_left,
                y: geometry.margin_top,
                style: FontStyle::Regular,
                size: 11.0,
                color: None,
            },
            pages: Vec::new(),
            layer: Layer::Body,
            images: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub(crate) fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub(crate) fn restore_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub(crate) fn current_x(&self) -> f32 {
        self.cursor.x
    }

    pub(crate) fn current_y(&self) -> f32 {
        self.cursor.y
    }

    pub(crate) fn will_overflow(&self, needed_height: f32) -> bool {
        self.cursor.y + needed_height > self.geometry.page_break_trigger()
    }

    /// True when nothing has been drawn below the header band yet; breaking the
    /// page there would only produce an empty page.
    pub(crate) fn at_page_top(&self) -> bool {
        let top = match self.current_kind() {
            Some(PageKind::Cover) | None => self.geometry.margin_top,
            Some(_) => self.geometry.content_top(),
        };
        (self.cursor.y - top).abs() < 1.0
    }

    pub(crate) fn move_to(&mut self, x: f32, y: f32) {
        self.cursor.x = x;
        self.cursor.y = y;
    }

    pub(crate) fn set_x(&mut self, x: f32) {
        self.cursor.x = x;
    }

    pub(crate) fn set_y(&mut self, y: f32) {
        self.cursor.x = self.geometry.margin_left;
        self.cursor.y = y;
    }

    /// Line feed: back to the left margin, `height` further down.
    pub(crate) fn advance_line(&mut self, height: f32) {
        self.cursor.x = self.geometry.margin_left;
        self.cursor.y += height;
    }

    pub(crate) fn set_font(&mut self, style: FontStyle, size: f32) {
        self.cursor.style = style;
        self.cursor.size = size;
    }

    pub(crate) fn set_text_color(&mut self, color: Option<[u8; 3]>) {
        self.cursor.color = color;
    }

    /// Start a fresh page buffer and put the cursor at the top-left of its
    /// writable area. Furniture is the caller's business.
    pub(crate) fn begin_page(&mut self, kind: PageKind) {
        let number = self.pages.len() + 1;
        self.pages.push(Page {
            kind,
            number,
            body: Vec::new(),
            header: None,
            footer: None,
        });
        let top = match kind {
            PageKind::Cover => self.geometry.margin_top,
            _ => self.geometry.content_top(),
        };
        self.layer = Layer::Body;
        self.move_to(self.geometry.margin_left, top);
    }

    pub(crate) fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn current_kind(&self) -> Option<PageKind> {
        self.pages.last().map(|p| p.kind)
    }

    pub(crate) fn set_layer(&mut self, layer: Layer) {
        self.layer = layer;
        if let Some(page) = self.pages.last_mut() {
            match layer {
                Layer::Body => {}
                Layer::Header => {
                    page.header.get_or_insert_with(Vec::new);
                }
                Layer::Footer => {
                    page.footer.get_or_insert_with(Vec::new);
                }
            }
        }
    }

    pub(crate) fn push(&mut self, op: DrawOp) {
        let Some(page) = self.pages.last_mut() else {
            log::warn!("draw op issued before the first page: {op:?}");
            return;
        };
        let target = match self.layer {
            Layer::Body => &mut page.body,
            Layer::Header => page.header.get_or_insert_with(Vec::new),
            Layer::Footer => page.footer.get_or_insert_with(Vec::new),
        };
        target.push(op);
    }

    /// Decode `asset` into the image table. An undecodable image is logged and
    /// recorded as a warning; the caller leaves its slot blank.
    pub(crate) fn embed_image(&mut self, asset: &ImageAsset, what: &str) -> Option<(ImageId, u32, u32)> {
        match decode_image(asset) {
            Ok(xobj) => {
                let dims = (xobj.width, xobj.height);
                self.images.push(xobj);
                Some((ImageId(self.images.len() - 1), dims.0, dims.1))
            }
            Err(e) => {
                log::warn!("{what}: {e}; leaving it blank");
                self.warnings.push(format!("{what}: {e}"));
                None
            }
        }
    }

    pub(crate) fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.warnings.push(message);
    }

    pub(crate) fn finish(self) -> (Vec<Page>, Vec<ImageXObject>, Vec<String>) {
        (self.pages, self.images, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Canvas {
        let mut c = Canvas::new(PageGeometry::a4());
        c.begin_page(PageKind::Interior);
        c
    }

    #[test]
    fn overflow_is_measured_against_trigger() {
        let mut c = canvas();
        let trigger = c.geometry().page_break_trigger();
        c.set_y(trigger - 10.0);
        assert!(!c.will_overflow(10.0));
        assert!(c.will_overflow(10.5));
    }

    #[test]
    fn begin_page_resets_cursor_and_numbers_pages() {
        let mut c = canvas();
        c.advance_line(200.0);
        c.set_x(300.0);
        c.begin_page(PageKind::Interior);
        let g = *c.geometry();
        assert_eq!(c.page_count(), 2);
        assert_eq!(c.current_x(), g.margin_left);
        assert_eq!(c.current_y(), g.content_top());
        assert!(c.at_page_top());
    }

    #[test]
    fn layers_route_ops_to_their_buffers() {
        let mut c = canvas();
        let line = DrawOp::Line {
            x1: 0.0,
            y1: 10.0,
            x2: 50.0,
            y2: 10.0,
            width: 0.5,
        };
        c.push(line.clone());
        c.set_layer(Layer::Footer);
        c.push(line.clone());
        c.set_layer(Layer::Body);
        let (pages, _, _) = c.finish();
        assert_eq!(pages[0].body.len(), 1);
        assert!(pages[0].header.is_none());
        assert_eq!(pages[0].footer.as_deref(), Some(&[line][..]));
    }
}
