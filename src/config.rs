use std::path::PathBuf;

use crate::error::Error;

pub(crate) const PT_PER_MM: f32 = 72.0 / 25.4;

pub(crate) fn mm(v: f32) -> f32 {
    v * PT_PER_MM
}

/// Fixed page geometry for one render pass. All values in points, y measured
/// downward from the top edge of the page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Top of the running header band.
    pub margin_top: f32,
    pub margin_bottom: f32,
    /// Height of the running header band; body content starts below it.
    pub header_height: f32,
    /// Distance of the footer baseline band from the bottom edge.
    pub footer_offset: f32,
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            width: mm(210.0),
            height: mm(297.0),
            margin_left: mm(15.0),
            margin_right: mm(15.0),
            margin_top: mm(10.0),
            margin_bottom: mm(25.0),
            header_height: mm(22.0),
            footer_offset: mm(15.0),
        }
    }

    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            ..Self::a4()
        }
    }

    /// y beyond which nothing may be drawn without advancing the page.
    pub fn page_break_trigger(&self) -> f32 {
        self.height - self.margin_bottom
    }

    pub fn usable_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn content_top(&self) -> f32 {
        self.margin_top + self.header_height
    }

    fn check(&self) -> Result<(), Error> {
        if self.usable_width() <= 0.0 {
            return Err(Error::Configuration(format!(
                "page width {:.1}pt leaves no room between margins",
                self.width
            )));
        }
        if self.content_top() >= self.page_break_trigger() {
            return Err(Error::Configuration(format!(
                "page height {:.1}pt leaves no room between header and bottom margin",
                self.height
            )));
        }
        Ok(())
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

#[derive(Clone, Debug)]
pub enum FontSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Clone, Debug, Default)]
pub enum FontConfig {
    /// Standard 14 Helvetica family, WinAnsi only.
    #[default]
    Builtin,
    /// A TrueType/OpenType font for broader character coverage. Without a bold
    /// face the regular face is used for bold text as well.
    Custom {
        regular: FontSource,
        bold: Option<FontSource>,
    },
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub geometry: PageGeometry,
    pub font: FontConfig,
    /// The commercial table is padded with blank rows up to this count.
    pub min_commercial_rows: usize,
    /// Row height reserved for item rows that carry an image.
    pub image_row_height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::a4(),
            font: FontConfig::Builtin,
            min_commercial_rows: 4,
            image_row_height: mm(25.0),
        }
    }
}

impl RenderConfig {
    /// Defaults, with a custom font taken from `RFQ_PDF_FONT` / `RFQ_PDF_FONT_BOLD`
    /// when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(regular) = var("RFQ_PDF_FONT") {
            config.font = FontConfig::Custom {
                regular: FontSource::Path(PathBuf::from(regular)),
                bold: var("RFQ_PDF_FONT_BOLD").map(|p| FontSource::Path(PathBuf::from(p))),
            };
        }
        config
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        self.geometry.check()?;
        if self.image_row_height <= 0.0 {
            return Err(Error::Configuration(
                "image_row_height must be positive".into(),
            ));
        }
        Ok(())
    }
}
