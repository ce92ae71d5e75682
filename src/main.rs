use std::path::{Path, PathBuf};

use clap::Parser;

use rfq_pdf::{
    BrandingAssets, DocumentRecord, Error, FontConfig, FontSource, ImageAsset, LogoPair,
    PageGeometry, RenderConfig,
};

#[derive(Parser)]
#[command(name = "rfq-pdf", about = "Render a Request-for-Quotation record (JSON) to PDF", version)]
struct Cli {
    /// Document record as JSON
    input: PathBuf,

    /// Output file path (defaults to the input path with a .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TrueType/OpenType font for body text (overrides RFQ_PDF_FONT)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Bold companion of --font
    #[arg(long, requires = "font")]
    font_bold: Option<PathBuf>,

    /// Left header logo (PNG or JPEG); needs --right-logo as well
    #[arg(long, requires = "right_logo")]
    left_logo: Option<PathBuf>,

    /// Right header logo (PNG or JPEG); needs --left-logo as well
    #[arg(long, requires = "left_logo")]
    right_logo: Option<PathBuf>,

    /// "Generated on" text for the cover page
    #[arg(long)]
    generated_on: Option<String>,

    /// Use US Letter instead of A4
    #[arg(long)]
    letter: bool,

    /// Minimum number of rows in the commercial table
    #[arg(long)]
    min_commercial_rows: Option<usize>,
}

fn read_logo(path: &Path) -> Result<ImageAsset, Error> {
    Ok(ImageAsset {
        data: std::fs::read(path)?,
        // Zero means "use the image's own pixel size"
        display_width: 0.0,
        display_height: 0.0,
    })
}

fn run(cli: Cli) -> Result<(), Error> {
    let json = std::fs::read_to_string(&cli.input)?;
    let mut record: DocumentRecord =
        serde_json::from_str(&json).map_err(|e| Error::Json(e.to_string()))?;

    if let (Some(left), Some(right)) = (&cli.left_logo, &cli.right_logo) {
        let logos = LogoPair {
            left: read_logo(left)?,
            right: read_logo(right)?,
        };
        record.branding.get_or_insert_with(BrandingAssets::default).logos = Some(logos);
    }
    if let Some(generated_on) = cli.generated_on {
        record.generated_on = Some(generated_on);
    }

    let mut config = RenderConfig::from_env();
    if let Some(regular) = cli.font {
        config.font = FontConfig::Custom {
            regular: FontSource::Path(regular),
            bold: cli.font_bold.map(FontSource::Path),
        };
    }
    if cli.letter {
        config.geometry = PageGeometry::letter();
    }
    if let Some(rows) = cli.min_commercial_rows {
        config.min_commercial_rows = rows;
    }

    let output = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension("pdf"));
    rfq_pdf::render_to_file(record, &config, &output)?;
    log::info!("wrote {}", output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
