mod canvas;
mod compose;
mod context;
mod furniture;
mod image;
mod pairs;
mod table;
mod text;

use std::collections::BTreeSet;
use std::time::Instant;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::config::{PageGeometry, RenderConfig};
use crate::error::Error;
use crate::fonts::{FontSet, FontStyle, RegisteredFont, register_fonts};
use crate::model::{DocumentRecord, SpecRow};

pub use canvas::{DrawOp, ImageId, Page};
pub use context::OverflowEvent;
pub use furniture::PageKind;

use compose::compose;
use context::RenderContext;
use self::image::ImageXObject;

/// Result of the layout pass: every page as a list of draw operations, ready
/// to be serialized.
pub struct LaidOutDocument {
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
    pub(crate) images: Vec<ImageXObject>,
    /// Recoverable problems (undecodable images, ignored contacts).
    pub warnings: Vec<String>,
    /// Blocks whose pre-check estimate was too small and that were drawn past
    /// the page-break trigger.
    pub overflow_events: Vec<OverflowEvent>,
}

impl LaidOutDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

/// The footer page indicator, as drawn once the total is known.
pub(crate) fn page_label(page: usize, total: usize) -> String {
    format!("Page {page} / {total}")
}

/// Every character layout may need to measure: the record's text plus the
/// fixed labels, which are all ASCII.
fn record_charset(record: &DocumentRecord) -> BTreeSet<char> {
    let mut chars: BTreeSet<char> = (' '..='~').collect();
    let mut add = |s: &str| chars.extend(s.chars());

    add(&record.title);
    record.subject.iter().for_each(|s| add(s.as_str()));
    add(&record.rfq_number);
    add(&record.issue_date);
    add(record.generated_on.as_deref().unwrap_or_default());
    add(&record.requester.company_name);
    add(&record.requester.address);
    add(record.requester.department.as_deref().unwrap_or_default());
    add(&record.purpose);
    for row in &record.technical_spec {
        match row {
            SpecRow::Attribute(kv) => {
                add(&kv.label);
                add(kv.value.as_deref().unwrap_or_default());
            }
            SpecRow::Item(item) => {
                add(&item.description);
                add(&item.quantity);
                add(&item.unit);
                add(&item.specification);
            }
        }
    }
    for t in &record.timelines {
        add(&t.label);
        add(t.date.as_deref().unwrap_or_default());
    }
    for c in &record.contacts {
        for s in [&c.role, &c.name, &c.designation, &c.phone, &c.email] {
            add(s.as_str());
        }
    }
    for item in &record.commercial_items {
        add(&item.component);
        add(&item.remarks);
    }
    for kv in &record.commercial_terms {
        add(&kv.label);
        add(kv.value.as_deref().unwrap_or_default());
    }
    let sub = &record.submission;
    for s in [&sub.deadline, &sub.submit_to, &sub.delivery_address, &sub.terms_and_conditions] {
        add(s.as_str());
    }
    sub.annexures.iter().for_each(|s| add(s.as_str()));
    if let Some(b) = &record.branding {
        add(b.footer_company_name.as_deref().unwrap_or_default());
        add(b.footer_company_address.as_deref().unwrap_or_default());
    }
    // Cover title is drawn upper-cased.
    let upper = record.title.to_uppercase();
    add(&upper);
    chars
}

fn lay_out(record: &DocumentRecord, config: &RenderConfig) -> Result<(LaidOutDocument, FontSet), Error> {
    record.validate()?;
    config.check()?;
    let fonts = FontSet::load(&config.font, &record_charset(record))?;

    let mut ctx = RenderContext::new(record, config, &fonts);
    compose(&mut ctx, record);
    let doc = ctx.finish();
    Ok((doc, fonts))
}

/// Run the layout pass only. Validation and font errors surface here exactly as
/// they would from a full render.
pub fn layout(record: &DocumentRecord, config: &RenderConfig) -> Result<LaidOutDocument, Error> {
    lay_out(record, config).map(|(doc, _)| doc)
}

pub(crate) fn render(record: &DocumentRecord, config: &RenderConfig) -> Result<Vec<u8>, Error> {
    let t0 = Instant::now();
    let (doc, fonts) = lay_out(record, config)?;
    let t_layout = t0.elapsed();

    let bytes = write_pdf(&doc, &fonts, &record.title)?;
    let t_total = t0.elapsed();

    log::info!(
        "Render phases: layout={:.1}ms, serialize={:.1}ms ({} pages, {} images, {} warnings)",
        t_layout.as_secs_f64() * 1000.0,
        (t_total - t_layout).as_secs_f64() * 1000.0,
        doc.page_count(),
        doc.image_count(),
        doc.warnings.len(),
    );
    Ok(bytes)
}

fn all_ops(page: &Page) -> impl Iterator<Item = &DrawOp> {
    page.header
        .iter()
        .flatten()
        .chain(page.body.iter())
        .chain(page.footer.iter().flatten())
}

fn image_name(id: ImageId) -> String {
    format!("Im{}", id.0 + 1)
}

fn write_image(pdf: &mut Pdf, img: &ImageXObject, alloc: &mut impl FnMut() -> Ref) -> Ref {
    let smask_ref = img.alpha_deflated.as_ref().map(|alpha| {
        let mask_ref = alloc();
        let mut mask = pdf.image_xobject(mask_ref, alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(img.width as i32);
        mask.height(img.height as i32);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        mask_ref
    });

    let xobj_ref = alloc();
    let mut xobj = pdf.image_xobject(xobj_ref, &img.rgb_deflated);
    xobj.filter(Filter::FlateDecode);
    xobj.width(img.width as i32);
    xobj.height(img.height as i32);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);
    if let Some(mask_ref) = smask_ref {
        xobj.s_mask(mask_ref);
    }
    xobj_ref
}

fn set_fill(content: &mut Content, color: Option<[u8; 3]>) {
    match color {
        Some([r, g, b]) => {
            content.set_fill_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        }
        None => {
            content.set_fill_gray(0.0);
        }
    }
}

struct PageWriter<'a> {
    fonts: &'a FontSet,
    registered: &'a [RegisteredFont],
    page_height: f32,
    total_pages: usize,
}

impl PageWriter<'_> {
    fn text(&self, content: &mut Content, x: f32, baseline: f32, text: &str, style: FontStyle, size: f32) {
        let font = &self.registered[self.fonts.face_index(style)];
        content.begin_text();
        content.set_font(Name(font.pdf_name.as_bytes()), size);
        content.next_line(x, self.page_height - baseline);
        content.show(Str(&font.encode(text)));
        content.end_text();
    }

    fn draw(&self, content: &mut Content, op: &DrawOp) {
        let h = self.page_height;
        match op {
            DrawOp::Text {
                x,
                baseline,
                text,
                style,
                size,
                color,
            } => {
                set_fill(content, *color);
                self.text(content, *x, *baseline, text, *style, *size);
            }
            DrawOp::PageNumber {
                center_x,
                baseline,
                page,
                style,
                size,
            } => {
                let label = page_label(*page, self.total_pages);
                let w = self.fonts.text_width(*style, *size, &label);
                set_fill(content, None);
                self.text(content, center_x - w / 2.0, *baseline, &label, *style, *size);
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
            } => {
                content.set_line_width(*width);
                content.set_stroke_gray(0.0);
                content.move_to(*x1, h - y1);
                content.line_to(*x2, h - y2);
                content.stroke();
            }
            DrawOp::Rect {
                x,
                y,
                w,
                h: rh,
                fill,
                stroke,
            } => {
                if let Some(color) = fill {
                    set_fill(content, Some(*color));
                    content.rect(*x, h - y - rh, *w, *rh).fill_nonzero();
                    set_fill(content, None);
                }
                if let Some(width) = stroke {
                    content.set_line_width(*width);
                    content.set_stroke_gray(0.0);
                    content.rect(*x, h - y - rh, *w, *rh).stroke();
                }
            }
            DrawOp::Image {
                x,
                y,
                w,
                h: ih,
                image,
            } => {
                content.save_state();
                content.transform([*w, 0.0, 0.0, *ih, *x, h - y - ih]);
                content.x_object(Name(image_name(*image).as_bytes()));
                content.restore_state();
            }
        }
    }
}

fn write_pdf(doc: &LaidOutDocument, fonts: &FontSet, title: &str) -> Result<Vec<u8>, Error> {
    let t0 = Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let total_pages = doc.pages.len();

    // Phase 1: fonts, subset to what the pages actually draw
    let mut used: Vec<BTreeSet<char>> = vec![BTreeSet::new(); fonts.faces().len()];
    for op in doc.pages.iter().flat_map(all_ops) {
        match op {
            DrawOp::Text { text, style, .. } => used[fonts.face_index(*style)].extend(text.chars()),
            DrawOp::PageNumber { page, style, .. } => {
                used[fonts.face_index(*style)].extend(page_label(*page, total_pages).chars())
            }
            _ => {}
        }
    }
    let registered = register_fonts(&mut pdf, fonts, &used, &mut alloc)?;
    let t_fonts = t0.elapsed();

    // Phase 2: images
    let image_refs: Vec<Ref> = doc
        .images
        .iter()
        .map(|img| write_image(&mut pdf, img, &mut alloc))
        .collect();
    let t_images = t0.elapsed();

    // Phase 3: content streams, with the page total now known
    let writer = PageWriter {
        fonts,
        registered: &registered,
        page_height: doc.geometry.height,
        total_pages,
    };
    let page_ids: Vec<Ref> = (0..total_pages).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..total_pages).map(|_| alloc()).collect();
    for (page, &content_id) in doc.pages.iter().zip(&content_ids) {
        let mut content = Content::new();
        for op in all_ops(page) {
            writer.draw(&mut content, op);
        }
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(total_pages as i32);

    let g = &doc.geometry;
    for (&page_id, &content_id) in page_ids.iter().zip(&content_ids) {
        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, g.width, g.height))
            .parent(pages_id)
            .contents(content_id);
        let mut resources = page.resources();
        {
            let mut font_dict = resources.fonts();
            for font in &registered {
                font_dict.pair(Name(font.pdf_name.as_bytes()), font.font_ref);
            }
        }
        if !image_refs.is_empty() {
            let mut xobjects = resources.x_objects();
            for (i, &xobj_ref) in image_refs.iter().enumerate() {
                xobjects.pair(Name(image_name(ImageId(i)).as_bytes()), xobj_ref);
            }
        }
    }

    let info_id = alloc();
    pdf.document_info(info_id)
        .title(TextStr(title.trim()))
        .creator(TextStr("rfq-pdf"));

    let t_assembly = t0.elapsed();
    log::info!(
        "Serialize phases: fonts={:.1}ms, images={:.1}ms, assembly={:.1}ms",
        t_fonts.as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_assembly - t_images).as_secs_f64() * 1000.0,
    );

    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_covers_record_text_and_fixed_labels() {
        let record = DocumentRecord {
            title: "Anfrage für Angebot".into(),
            ..Default::default()
        };
        let chars = record_charset(&record);
        assert!(chars.contains(&'ü'));
        assert!(chars.contains(&'Ü'));
        assert!(chars.contains(&'/'));
        assert!(chars.contains(&'7'));
    }

    #[test]
    fn page_label_format() {
        assert_eq!(page_label(3, 12), "Page 3 / 12");
    }
}
