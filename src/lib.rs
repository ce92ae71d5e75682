mod config;
mod error;
mod fonts;
mod model;
mod pdf;

pub use config::{FontConfig, FontSource, PageGeometry, RenderConfig};
pub use error::Error;
pub use fonts::FontStyle;
pub use model::{
    BrandingAssets, CommercialLineItem, ContactBlock, DocumentRecord, ImageAsset, KeyValue,
    LogoPair, Requester, SpecItem, SpecRow, Submission, TimelineEntry,
};
pub use pdf::{DrawOp, ImageId, LaidOutDocument, OverflowEvent, Page, PageKind, layout};

use std::path::Path;
use std::time::Instant;

/// Render `document` with the default configuration (A4, built-in Helvetica).
pub fn render(document: DocumentRecord) -> Result<Vec<u8>, Error> {
    render_with(document, &RenderConfig::default())
}

pub fn render_with(document: DocumentRecord, config: &RenderConfig) -> Result<Vec<u8>, Error> {
    pdf::render(&document, config)
}

/// Render and write the result to `output`. Nothing is written if rendering fails.
pub fn render_to_file(document: DocumentRecord, config: &RenderConfig, output: &Path) -> Result<(), Error> {
    let t0 = Instant::now();

    let bytes = pdf::render(&document, config)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_render.as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}
