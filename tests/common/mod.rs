#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use rfq_pdf::{
    BrandingAssets, CommercialLineItem, ContactBlock, DocumentRecord, DrawOp, ImageAsset,
    KeyValue, LaidOutDocument, LogoPair, Requester, SpecItem, SpecRow, Submission, TimelineEntry,
};

pub fn contact(role: &str, name: &str) -> ContactBlock {
    ContactBlock {
        role: role.into(),
        name: name.into(),
        designation: "Procurement Manager".into(),
        phone: "+91 80 5550 1234".into(),
        email: format!("{}@acme.example", name.to_lowercase().replace(' ', ".")),
    }
}

/// A small but complete record: every section present, nothing that wraps
/// far enough to trigger an overflow estimate miss.
pub fn sample_record() -> DocumentRecord {
    DocumentRecord {
        title: "Request for Quotation".into(),
        subject: vec!["Supply of PET Bottles".into()],
        rfq_number: "RFQ-2026-0142".into(),
        issue_date: "19 Oct 2026".into(),
        generated_on: Some("19 Oct 2026 10:00".into()),
        requester: Requester {
            company_name: "Acme Foods Pvt. Ltd.".into(),
            address: "Plot 14, Industrial Area Phase II, Pune 411019".into(),
            department: Some("Packaging Procurement".into()),
        },
        purpose: "Acme Foods invites quotations for the supply of food-grade PET bottles \
                  for its juice line. Quotes should cover material, tooling and delivery."
            .into(),
        technical_spec: vec![
            SpecRow::Attribute(KeyValue::new("Capacity", "500 ml")),
            SpecRow::Attribute(KeyValue::unset("Lid Required")),
            SpecRow::Attribute(KeyValue::new("Material", "Food-grade PET")),
            SpecRow::Attribute(KeyValue::new("Label Size", "N/A")),
            SpecRow::Item(SpecItem {
                description: "PET bottle, 500 ml, clear".into(),
                quantity: "50000".into(),
                unit: "pcs".into(),
                specification: "28 mm neck, 22 g preform".into(),
                image: None,
            }),
            SpecRow::Item(SpecItem {
                description: "Tamper-evident cap".into(),
                quantity: "50000".into(),
                unit: "pcs".into(),
                specification: "28 mm, white".into(),
                image: None,
            }),
        ],
        timelines: vec![
            TimelineEntry {
                label: "Pre-bid meeting".into(),
                date: Some("26 Oct 2026".into()),
            },
            TimelineEntry {
                label: "Site visit".into(),
                date: None,
            },
            TimelineEntry {
                label: "Award of contract".into(),
                date: Some("15 Dec 2026".into()),
            },
        ],
        contacts: vec![contact("Primary Contact", "Rhea Iyer"), contact("Secondary Contact", "Dev Rao")],
        commercial_items: vec![
            CommercialLineItem {
                component: "Unit price (ex-works)".into(),
                remarks: "Per 1000 pcs".into(),
            },
            CommercialLineItem {
                component: "Tooling".into(),
                remarks: "One-time".into(),
            },
        ],
        commercial_terms: vec![
            KeyValue::new("Payment Terms", "45 days from invoice"),
            KeyValue::unset("Price Validity"),
        ],
        submission: Submission {
            deadline: "30 Nov 2026, 17:00".into(),
            submit_to: "procurement@acme.example".into(),
            delivery_address: "Acme Foods, Gate 3, Pune 411019".into(),
            annexures: vec!["Bottle drawing".into(), "Quality checklist".into()],
            terms_and_conditions: "Prices must be firm for the validity period.\n\
                                   Partial quotations will not be considered."
                .into(),
        },
        branding: None,
    }
}

/// Encode a solid-colour PNG of the given size.
pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn image_asset(data: Vec<u8>) -> ImageAsset {
    ImageAsset {
        data,
        display_width: 60.0,
        display_height: 30.0,
    }
}

pub fn with_branding(mut record: DocumentRecord) -> DocumentRecord {
    record.branding = Some(BrandingAssets {
        logos: Some(LogoPair {
            left: image_asset(png(40, 20, [200, 30, 30, 255])),
            right: image_asset(png(40, 20, [30, 30, 200, 128])),
        }),
        footer_company_name: Some("Acme Foods Pvt. Ltd.".into()),
        footer_company_address: Some("Plot 14, Industrial Area Phase II, Pune".into()),
        accent_color: Some([0, 70, 140]),
    });
    record
}

/// Every text string drawn in the body layer of `page`.
pub fn body_texts(doc: &LaidOutDocument, page: usize) -> Vec<String> {
    doc.pages[page].texts().map(str::to_string).collect()
}

/// Baseline of the first body text on any page equal to `needle`, with its
/// page index.
pub fn find_text(doc: &LaidOutDocument, needle: &str) -> Option<(usize, f32)> {
    doc.pages.iter().enumerate().find_map(|(i, page)| {
        page.body.iter().find_map(|op| match op {
            DrawOp::Text { text, baseline, .. } if text == needle => Some((i, *baseline)),
            _ => None,
        })
    })
}

/// Inflate every FlateDecode stream in `pdf` that inflates cleanly.
pub fn inflated_streams(pdf: &[u8]) -> Vec<Vec<u8>> {
    let mut streams = Vec::new();
    let mut rest = pdf;
    while let Some(start) = find(rest, b"stream\n") {
        let body = &rest[start + b"stream\n".len()..];
        let Some(end) = find(body, b"\nendstream") else {
            break;
        };
        if let Ok(data) = miniz_oxide::inflate::decompress_to_vec_zlib(&body[..end]) {
            streams.push(data);
        }
        rest = &body[end + b"\nendstream".len()..];
    }
    streams
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Write a rendered PDF to tests/output/ for manual inspection.
pub fn write_output(name: &str, bytes: &[u8]) -> PathBuf {
    let dir = PathBuf::from("tests/output");
    fs::create_dir_all(&dir).ok();
    let path = dir.join(format!("{name}.pdf"));
    fs::write(&path, bytes).ok();
    path
}
