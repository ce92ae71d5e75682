use crate::config::mm;
use crate::fonts::FontStyle;
use crate::model::{ContactBlock, DocumentRecord, SpecItem, SpecRow};

use super::canvas::DrawOp;
use super::context::RenderContext;
use super::furniture::PageKind;
use super::pairs::{FlowColumn, PAIR_LINE_H, PAIR_SIZE, draw_pair, flow_columns, is_suppressed};
use super::table::{Column, ColumnWidth, TableCell, TableStyle, draw_table, opening_height};
use super::text::{Align, CELL_PAD, draw_cell, draw_wrapped_block, wrap_text};

const HEADING_SIZE: f32 = 11.0;
const SUBHEADING_SIZE: f32 = 10.5;
const HEADING_FILL: [u8; 3] = [225, 230, 238];
const TABLE_HEADER_FILL: [u8; 3] = [240, 240, 240];

fn heading_h() -> f32 {
    mm(8.0)
}

fn section_gap() -> f32 {
    mm(4.0)
}

fn heading_after() -> f32 {
    mm(2.0)
}

/// Space kept above and below an item table inside the technical section.
fn table_gap() -> f32 {
    mm(2.0)
}

fn label_w() -> f32 {
    mm(55.0)
}

fn table_style(min_rows: usize, image_row_h: f32) -> TableStyle {
    TableStyle {
        header_size: 9.5,
        header_line_h: 13.0,
        header_fill: Some(TABLE_HEADER_FILL),
        body_size: PAIR_SIZE,
        body_line_h: PAIR_LINE_H,
        min_rows,
        image_row_h,
    }
}

/// Running section counter; empty optional sections do not take a number.
struct Sections {
    next: usize,
}

impl Sections {
    /// Numbered heading band. `keep` is the height of the content that must
    /// land on the same page as the heading.
    fn heading(&mut self, ctx: &mut RenderContext, title: &str, keep: f32) {
        let n = self.next;
        self.next += 1;
        if !ctx.canvas.at_page_top() {
            ctx.canvas.advance_line(section_gap());
        }
        ctx.ensure_space(heading_h() + heading_after() + keep);

        let g = *ctx.canvas.geometry();
        let y = ctx.canvas.current_y();
        ctx.canvas.push(DrawOp::Rect {
            x: g.margin_left,
            y,
            w: g.usable_width(),
            h: heading_h(),
            fill: Some(HEADING_FILL),
            stroke: None,
        });
        ctx.canvas.move_to(g.margin_left, y);
        ctx.canvas.set_font(FontStyle::Bold, HEADING_SIZE);
        draw_cell(
            &mut ctx.canvas,
            ctx.fonts,
            g.usable_width(),
            heading_h(),
            &format!("{n}. {title}"),
            false,
            Align::Left,
        );
        ctx.canvas.set_y(y + heading_h() + heading_after());
    }
}

fn sub_heading(ctx: &mut RenderContext, title: &str) {
    ctx.canvas.advance_line(mm(2.0));
    ctx.ensure_space(2.0 * PAIR_LINE_H);
    ctx.canvas.set_font(FontStyle::Bold, SUBHEADING_SIZE);
    let width = ctx.canvas.geometry().usable_width();
    draw_wrapped_block(&mut ctx.canvas, ctx.fonts, width, PAIR_LINE_H, title, Align::Left);
}

/// Full-width running text, checked against the page-break trigger line by line.
fn paragraph(ctx: &mut RenderContext, text: &str) {
    let g = *ctx.canvas.geometry();
    ctx.canvas.set_font(FontStyle::Regular, PAIR_SIZE);
    let lines = wrap_text(
        ctx.fonts,
        FontStyle::Regular,
        PAIR_SIZE,
        text,
        g.usable_width() - 2.0 * CELL_PAD,
    );
    for line in lines {
        ctx.ensure_space(PAIR_LINE_H);
        draw_cell(&mut ctx.canvas, ctx.fonts, g.usable_width(), PAIR_LINE_H, &line, false, Align::Left);
        ctx.canvas.advance_line(PAIR_LINE_H);
    }
}

/// Lay out the whole document: cover, numbered sections, then the trailing
/// submission page.
pub(crate) fn compose(ctx: &mut RenderContext, record: &DocumentRecord) {
    ctx.begin_cover(record);
    ctx.advance_page_as(PageKind::Interior);

    rfq_details(ctx, record);

    let mut sections = Sections { next: 1 };
    if !record.purpose.trim().is_empty() {
        sections.heading(ctx, "Purpose of the RFQ", PAIR_LINE_H);
        paragraph(ctx, &record.purpose);
    }
    technical_spec(ctx, &mut sections, &record.technical_spec);
    timelines(ctx, &mut sections, record);
    contacts(ctx, &mut sections, record);
    commercial(ctx, &mut sections, record);

    ctx.advance_page_as(PageKind::Submission);
    submission(ctx, &mut sections, record);
}

fn rfq_details(ctx: &mut RenderContext, record: &DocumentRecord) {
    sub_heading(ctx, "RFQ Details");
    draw_pair(ctx, "RFQ No.", Some(record.rfq_number.as_str()), label_w());
    draw_pair(ctx, "Date of Issue", Some(record.issue_date.as_str()), label_w());
    draw_pair(ctx, "Submission Deadline", Some(record.submission.deadline.as_str()), label_w());

    sub_heading(ctx, "Issued By");
    let requester = &record.requester;
    draw_pair(ctx, "Company", Some(requester.company_name.as_str()), label_w());
    draw_pair(ctx, "Department", requester.department.as_deref(), label_w());
    if let Some(contact) = record.primary_contact() {
        let person = if contact.email.trim().is_empty() {
            contact.name.trim().to_string()
        } else {
            format!("{} ({})", contact.name.trim(), contact.email.trim())
        };
        draw_pair(ctx, "Contact Person", Some(person.as_str()), label_w());
    }
    draw_pair(ctx, "Address", Some(requester.address.as_str()), label_w());
}

fn technical_spec(ctx: &mut RenderContext, sections: &mut Sections, rows: &[SpecRow]) {
    let visible = rows.iter().any(|row| match row {
        SpecRow::Attribute(kv) => !is_suppressed(kv.value.as_deref()),
        SpecRow::Item(_) => true,
    });
    if !visible {
        return;
    }
    // What opens the section: a pair line, or the first item table.
    let mut leading = rows
        .iter()
        .skip_while(|row| matches!(row, SpecRow::Attribute(kv) if is_suppressed(kv.value.as_deref())))
        .map_while(|row| match row {
            SpecRow::Item(item) => Some(item),
            SpecRow::Attribute(_) => None,
        })
        .peekable();
    let first = leading.peek().copied();
    let keep = match first {
        Some(first) => {
            let group: Vec<&SpecItem> = leading.collect();
            let with_images = group.iter().any(|item| item.image.is_some());
            let style = table_style(0, ctx.config.image_row_height);
            let first_row = item_row(first, with_images);
            table_gap() + opening_height(ctx, &item_columns(with_images), &style, Some(first_row.as_slice()))
        }
        None => PAIR_LINE_H,
    };
    sections.heading(ctx, "Technical Specification", keep);

    // Consecutive items share one table; attributes render as pairs between them.
    let mut pending: Vec<&SpecItem> = Vec::new();
    for row in rows {
        match row {
            SpecRow::Item(item) => pending.push(item),
            SpecRow::Attribute(kv) => {
                flush_items(ctx, &mut pending);
                draw_pair(ctx, &kv.label, kv.value.as_deref(), label_w());
            }
        }
    }
    flush_items(ctx, &mut pending);
}

fn flush_items(ctx: &mut RenderContext, items: &mut Vec<&SpecItem>) {
    if items.is_empty() {
        return;
    }
    let with_images = items.iter().any(|item| item.image.is_some());
    let columns = item_columns(with_images);
    let rows: Vec<Vec<TableCell>> = items.iter().map(|item| item_row(item, with_images)).collect();

    ctx.canvas.advance_line(table_gap());
    let style = table_style(0, ctx.config.image_row_height);
    draw_table(ctx, &columns, &style, &rows);
    ctx.canvas.advance_line(table_gap());
    items.clear();
}

fn item_columns(with_images: bool) -> Vec<Column> {
    if with_images {
        vec![
            Column::new("Item / Service Description", ColumnWidth::Fraction(0.35), Align::Left),
            Column::new("Qty", ColumnWidth::Fraction(0.10), Align::Center),
            Column::new("Unit", ColumnWidth::Fraction(0.15), Align::Center),
            Column::new("Specifications", ColumnWidth::Fraction(0.20), Align::Left),
            Column::new("Image", ColumnWidth::Fraction(0.20), Align::Center),
        ]
    } else {
        vec![
            Column::new("Item / Service Description", ColumnWidth::Fraction(0.45), Align::Left),
            Column::new("Qty", ColumnWidth::Fraction(0.10), Align::Center),
            Column::new("Unit", ColumnWidth::Fraction(0.20), Align::Center),
            Column::new("Specifications", ColumnWidth::Fraction(0.25), Align::Left),
        ]
    }
}

fn item_row(item: &SpecItem, with_images: bool) -> Vec<TableCell<'_>> {
    let mut row = vec![
        TableCell::text(item.description.trim()),
        TableCell::text(item.quantity.trim()),
        TableCell::text(item.unit.trim()),
        TableCell::text(item.specification.trim()),
    ];
    if with_images {
        row.push(TableCell::image(item.image.as_ref()));
    }
    row
}

fn timelines(ctx: &mut RenderContext, sections: &mut Sections, record: &DocumentRecord) {
    let rows: Vec<Vec<TableCell>> = record
        .timelines
        .iter()
        .filter(|t| !is_suppressed(t.date.as_deref()))
        .map(|t| {
            vec![
                TableCell::text(t.label.trim()),
                TableCell::text(t.date.as_deref().unwrap_or_default().trim()),
            ]
        })
        .collect();
    if rows.is_empty() {
        return;
    }
    let columns = [
        Column::new("Milestone", ColumnWidth::Fraction(0.6), Align::Left),
        Column::new("Date", ColumnWidth::Fraction(0.4), Align::Center),
    ];
    let style = table_style(0, ctx.config.image_row_height);
    let keep = opening_height(ctx, &columns, &style, rows.first().map(Vec::as_slice));
    sections.heading(ctx, "Timelines", keep);
    draw_table(ctx, &columns, &style, &rows);
}

fn contact_lines(contact: &ContactBlock) -> Vec<(FontStyle, String)> {
    let mut lines = vec![(FontStyle::Bold, contact.role.trim().to_string())];
    lines.push((FontStyle::Regular, contact.name.trim().to_string()));
    lines.push((FontStyle::Italic, contact.designation.trim().to_string()));
    if !contact.phone.trim().is_empty() {
        lines.push((FontStyle::Regular, format!("Phone: {}", contact.phone.trim())));
    }
    if !contact.email.trim().is_empty() {
        lines.push((FontStyle::Regular, format!("Email: {}", contact.email.trim())));
    }
    lines.retain(|(_, text)| !text.is_empty());
    lines
}

fn contacts(ctx: &mut RenderContext, sections: &mut Sections, record: &DocumentRecord) {
    let Some(primary) = record.primary_contact() else {
        return;
    };
    if record.contacts.len() > 2 {
        ctx.canvas.warn(format!(
            "{} contacts supplied; only the first two are shown",
            record.contacts.len()
        ));
    }
    let g = *ctx.canvas.geometry();
    let secondary = record.secondary_contact();
    let col_w = if secondary.is_some() {
        g.usable_width() / 2.0
    } else {
        g.usable_width()
    };

    // Side by side, row by row, so a tall pair of blocks stays aligned when it
    // continues on the next page.
    let mut columns = vec![FlowColumn::wrapped(ctx.fonts, g.margin_left, col_w, &contact_lines(primary))];
    if let Some(secondary) = secondary {
        columns.push(FlowColumn::wrapped(
            ctx.fonts,
            g.margin_left + col_w,
            col_w,
            &contact_lines(secondary),
        ));
    }
    let keep = columns.iter().map(FlowColumn::height).fold(0.0, f32::max);
    sections.heading(ctx, "Contact Details", keep);
    flow_columns(ctx, &columns);
}

fn commercial(ctx: &mut RenderContext, sections: &mut Sections, record: &DocumentRecord) {
    let columns = [
        Column::new("S.No.", ColumnWidth::Fixed(mm(12.0)), Align::Center),
        Column::new("Cost Component", ColumnWidth::Fraction(0.43), Align::Left),
        Column::new("Amount", ColumnWidth::Fraction(0.20), Align::Right),
        Column::new("Remarks", ColumnWidth::Fraction(0.30), Align::Left),
    ];
    let rows: Vec<Vec<TableCell>> = record
        .commercial_items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            vec![
                TableCell::text((i + 1).to_string()),
                TableCell::text(item.component.trim()),
                TableCell::default(),
                TableCell::text(item.remarks.trim()),
            ]
        })
        .collect();
    let style = table_style(ctx.config.min_commercial_rows, ctx.config.image_row_height);
    let keep = opening_height(ctx, &columns, &style, rows.first().map(Vec::as_slice));
    sections.heading(ctx, "Commercial Details", keep);
    draw_table(ctx, &columns, &style, &rows);

    if record
        .commercial_terms
        .iter()
        .any(|kv| !is_suppressed(kv.value.as_deref()))
    {
        ctx.canvas.advance_line(mm(2.0));
        for kv in &record.commercial_terms {
            draw_pair(ctx, &kv.label, kv.value.as_deref(), label_w());
        }
    }
}

fn submission(ctx: &mut RenderContext, sections: &mut Sections, record: &DocumentRecord) {
    let sub = &record.submission;
    sections.heading(ctx, "Submission Details", PAIR_LINE_H);
    draw_pair(ctx, "Submission Deadline", Some(sub.deadline.as_str()), label_w());
    draw_pair(ctx, "Submit To", Some(sub.submit_to.as_str()), label_w());
    draw_pair(ctx, "Delivery Location", Some(sub.delivery_address.as_str()), label_w());

    let annexures: Vec<&str> = sub
        .annexures
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    if !annexures.is_empty() {
        sub_heading(ctx, "Annexures");
        for (i, annexure) in annexures.iter().enumerate() {
            paragraph(ctx, &format!("{}. {annexure}", i + 1));
        }
    }

    if !sub.terms_and_conditions.trim().is_empty() {
        sub_heading(ctx, "Terms & Conditions");
        paragraph(ctx, &sub.terms_and_conditions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::fonts::FontSet;
    use crate::model::{CommercialLineItem, KeyValue, Requester, Submission};

    fn record() -> DocumentRecord {
        DocumentRecord {
            title: "Request for Quotation".into(),
            rfq_number: "RFQ-7".into(),
            requester: Requester {
                company_name: "Acme Foods".into(),
                address: "1 Mill Road".into(),
                department: None,
            },
            contacts: vec![ContactBlock {
                role: "Primary Contact".into(),
                name: "R. Iyer".into(),
                ..Default::default()
            }],
            commercial_items: vec![CommercialLineItem {
                component: "Unit price".into(),
                remarks: String::new(),
            }],
            submission: Submission {
                deadline: "2026-11-30".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn laid_out(record: &DocumentRecord) -> crate::pdf::LaidOutDocument {
        let config = RenderConfig::default();
        let fonts = FontSet::builtin();
        let mut ctx = RenderContext::new(record, &config, &fonts);
        compose(&mut ctx, record);
        ctx.finish()
    }

    fn all_texts(doc: &crate::pdf::LaidOutDocument) -> Vec<String> {
        doc.pages
            .iter()
            .flat_map(|p| p.texts().map(str::to_string))
            .collect()
    }

    #[test]
    fn empty_optional_sections_are_skipped_and_numbering_stays_dense() {
        let doc = laid_out(&record());
        let texts = all_texts(&doc);
        assert!(!texts.iter().any(|t| t.contains("Purpose")));
        assert!(!texts.iter().any(|t| t.contains("Timelines")));
        assert!(texts.iter().any(|t| t == "1. Contact Details"));
        assert!(texts.iter().any(|t| t == "2. Commercial Details"));
        assert!(texts.iter().any(|t| t == "3. Submission Details"));
    }

    #[test]
    fn page_kinds_follow_the_section_order() {
        let doc = laid_out(&record());
        let kinds: Vec<_> = doc.pages.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PageKind::Cover, PageKind::Interior, PageKind::Submission]);
    }

    #[test]
    fn commercial_table_is_padded_with_blank_rows() {
        let doc = laid_out(&record());
        let texts = all_texts(&doc);
        assert!(texts.iter().any(|t| t == "1"));
        assert!(!texts.iter().any(|t| t == "2"));
        let interior = &doc.pages[1];
        let rows = interior
            .body
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect { fill: None, x, .. } if (*x - doc.geometry.margin_left).abs() < 1e-3))
            .count();
        assert_eq!(rows, 4);
    }

    #[test]
    fn item_table_gets_an_image_column_only_when_needed() {
        let mut rec = record();
        rec.technical_spec = vec![
            SpecRow::Attribute(KeyValue::new("Material", "PET")),
            SpecRow::Attribute(KeyValue::unset("Lid Required")),
            SpecRow::Item(SpecItem {
                description: "Bottle".into(),
                quantity: "1000".into(),
                ..Default::default()
            }),
        ];
        let texts = all_texts(&laid_out(&rec));
        assert!(texts.iter().any(|t| t == "Material"));
        assert!(!texts.iter().any(|t| t == "Lid Required"));
        assert!(!texts.iter().any(|t| t == "Image"));

        if let SpecRow::Item(item) = &mut rec.technical_spec[2] {
            item.image = Some(crate::model::ImageAsset {
                data: vec![0; 4],
                display_width: 10.0,
                display_height: 10.0,
            });
        }
        let doc = laid_out(&rec);
        assert!(all_texts(&doc).iter().any(|t| t == "Image"));
        assert_eq!(doc.warnings.len(), 1);
    }

    #[test]
    fn extra_contacts_are_ignored_with_a_warning() {
        let mut rec = record();
        for name in ["B", "C"] {
            rec.contacts.push(ContactBlock {
                role: "Other".into(),
                name: name.into(),
                ..Default::default()
            });
        }
        let doc = laid_out(&rec);
        let texts = all_texts(&doc);
        assert!(texts.iter().any(|t| t == "B"));
        assert!(!texts.iter().any(|t| t == "C"));
        assert_eq!(doc.warnings.len(), 1);
    }
}
