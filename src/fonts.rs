use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use memmap2::Mmap;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Name, Pdf, Rect, Ref, Str};
use subsetter::GlyphRemapper;
use ttf_parser::Face;

use crate::config::{FontConfig, FontSource};
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    fn slot(self) -> usize {
        match self {
            FontStyle::Regular => 0,
            FontStyle::Bold => 1,
            FontStyle::Italic => 2,
        }
    }
}

enum FontData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for FontData {
    fn as_ref(&self) -> &[u8] {
        match self {
            FontData::Mapped(m) => &m[..],
            FontData::Owned(v) => &v[..],
        }
    }
}

enum FaceKind {
    Builtin {
        base_font: &'static str,
        widths_1000: Vec<f32>,
    },
    TrueType {
        data: FontData,
        family: String,
        metrics: FaceMetrics,
        /// Glyph id and advance width in 1000-units for every char layout may
        /// ask about.
        glyphs: BTreeMap<char, (u16, f32)>,
        notdef_width_1000: f32,
    },
}

/// Face-wide metrics in 1000-units, read once at load time for the font
/// descriptor.
#[derive(Clone, Copy, Debug)]
struct FaceMetrics {
    ascent: f32,
    descent: f32,
    cap_height: f32,
    bbox: [f32; 4],
}

impl FaceMetrics {
    fn read(face: &Face) -> Self {
        let scale = 1000.0 / face.units_per_em() as f32;
        let bb = face.global_bounding_box();
        Self {
            ascent: face.ascender() as f32 * scale,
            descent: face.descender() as f32 * scale,
            cap_height: face.capital_height().map_or(700.0, |h| h as f32 * scale),
            bbox: [
                bb.x_min as f32 * scale,
                bb.y_min as f32 * scale,
                bb.x_max as f32 * scale,
                bb.y_max as f32 * scale,
            ],
        }
    }
}

pub(crate) struct FontFace {
    pub(crate) pdf_name: String,
    kind: FaceKind,
}

impl FontFace {
    fn char_width_1000(&self, ch: char) -> f32 {
        match &self.kind {
            FaceKind::Builtin { widths_1000, .. } => {
                let byte = char_to_winansi(ch);
                if byte >= 32 {
                    widths_1000[(byte - 32) as usize]
                } else {
                    0.0
                }
            }
            FaceKind::TrueType {
                glyphs,
                notdef_width_1000,
                ..
            } => glyphs.get(&ch).map_or(*notdef_width_1000, |&(_, w)| w),
        }
    }

    pub(crate) fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }
}

/// The faces one render pass uses, addressed by style. Several styles may share
/// a face (a custom font without a bold variant).
pub(crate) struct FontSet {
    faces: Vec<FontFace>,
    by_style: [usize; 3],
}

impl FontSet {
    pub(crate) fn builtin() -> Self {
        let face = |pdf_name: &str, base_font, widths_1000| FontFace {
            pdf_name: pdf_name.to_string(),
            kind: FaceKind::Builtin {
                base_font,
                widths_1000,
            },
        };
        Self {
            faces: vec![
                face("F1", "Helvetica", helvetica_widths(false)),
                face("F2", "Helvetica-Bold", helvetica_widths(true)),
                face("F3", "Helvetica-Oblique", helvetica_widths(false)),
            ],
            by_style: [0, 1, 2],
        }
    }

    /// Resolve the configured fonts. `charset` lists every character layout may
    /// measure; widths of TrueType faces are cached for exactly these.
    pub(crate) fn load(config: &FontConfig, charset: &BTreeSet<char>) -> Result<Self, Error> {
        let (regular, bold) = match config {
            FontConfig::Builtin => return Ok(Self::builtin()),
            FontConfig::Custom { regular, bold } => (regular, bold),
        };

        let mut faces = vec![load_truetype(regular, "F1", charset)?];
        let bold_slot = match bold {
            Some(src) => {
                faces.push(load_truetype(src, "F2", charset)?);
                1
            }
            None => 0,
        };
        Ok(Self {
            faces,
            by_style: [0, bold_slot, 0],
        })
    }

    pub(crate) fn face(&self, style: FontStyle) -> &FontFace {
        &self.faces[self.by_style[style.slot()]]
    }

    pub(crate) fn face_index(&self, style: FontStyle) -> usize {
        self.by_style[style.slot()]
    }

    pub(crate) fn faces(&self) -> &[FontFace] {
        &self.faces
    }

    pub(crate) fn text_width(&self, style: FontStyle, font_size: f32, text: &str) -> f32 {
        self.face(style).text_width(text, font_size)
    }
}

fn read_source(source: &FontSource) -> Result<FontData, Error> {
    match source {
        FontSource::Bytes(bytes) => Ok(FontData::Owned(bytes.clone())),
        FontSource::Path(path) => map_font_file(path),
    }
}

fn map_font_file(path: &Path) -> Result<FontData, Error> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Configuration(format!("font file {}: {e}", path.display())))?;
    let mapped = unsafe { Mmap::map(&file) }
        .map_err(|e| Error::Configuration(format!("font file {}: {e}", path.display())))?;
    Ok(FontData::Mapped(mapped))
}

fn font_family_name(face: &Face) -> Option<String> {
    for name in face.names() {
        if name.name_id == ttf_parser::name_id::FAMILY
            && name.is_unicode()
            && let Some(s) = name.to_string()
        {
            return Some(s);
        }
    }
    None
}

fn load_truetype(
    source: &FontSource,
    pdf_name: &str,
    charset: &BTreeSet<char>,
) -> Result<FontFace, Error> {
    let data = read_source(source)?;
    let face = Face::parse(data.as_ref(), 0)
        .map_err(|e| Error::Configuration(format!("unusable font data: {e}")))?;

    let units = face.units_per_em() as f32;
    let advance = |gid| {
        face.glyph_hor_advance(gid)
            .map(|adv| adv as f32 / units * 1000.0)
            .unwrap_or(0.0)
    };
    let glyphs: BTreeMap<char, (u16, f32)> = charset
        .iter()
        .filter_map(|&ch| face.glyph_index(ch).map(|gid| (ch, (gid.0, advance(gid)))))
        .collect();
    let notdef_width_1000 = advance(ttf_parser::GlyphId(0));
    let metrics = FaceMetrics::read(&face);
    let family = font_family_name(&face).unwrap_or_else(|| format!("Custom{pdf_name}"));

    log::debug!(
        "Loaded font {family} as {pdf_name}: {} of {} chars mapped",
        glyphs.len(),
        charset.len()
    );

    Ok(FontFace {
        pdf_name: pdf_name.to_string(),
        kind: FaceKind::TrueType {
            data,
            family,
            metrics,
            glyphs,
            notdef_width_1000,
        },
    })
}

/// A face written into the PDF, with what is needed to encode text for it.
pub(crate) struct RegisteredFont {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    char_to_gid: Option<BTreeMap<char, u16>>,
}

impl RegisteredFont {
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.char_to_gid {
            Some(map) => encode_as_gids(text, map),
            None => to_winansi_bytes(text),
        }
    }
}

/// Write every face of `fonts` into `pdf`. `used_chars[i]` is the set of chars
/// drawn with face `i`; TrueType faces are subset to those glyphs.
pub(crate) fn register_fonts(
    pdf: &mut Pdf,
    fonts: &FontSet,
    used_chars: &[BTreeSet<char>],
    alloc: &mut impl FnMut() -> Ref,
) -> Result<Vec<RegisteredFont>, Error> {
    let empty = BTreeSet::new();
    fonts
        .faces()
        .iter()
        .enumerate()
        .map(|(i, face)| {
            let t0 = std::time::Instant::now();
            let font_ref = alloc();
            let char_to_gid = match &face.kind {
                FaceKind::Builtin { base_font, .. } => {
                    pdf.type1_font(font_ref)
                        .base_font(Name(base_font.as_bytes()))
                        .encoding_predefined(Name(b"WinAnsiEncoding"));
                    None
                }
                FaceKind::TrueType {
                    data,
                    family,
                    metrics,
                    glyphs,
                    ..
                } => {
                    // Glyphs are renumbered densely in char order, so the subset
                    // and the output bytes do not depend on discovery order.
                    let plan = SubsetPlan::new(glyphs, used_chars.get(i).unwrap_or(&empty));
                    let program = plan.font_program(family, data.as_ref())?;
                    let base_font = family.replace(' ', "");

                    let descriptor_ref = alloc();
                    let program_ref = alloc();
                    let cid_ref = alloc();
                    let cmap_ref = alloc();
                    pdf.stream(program_ref, &program.bytes)
                        .pair(Name(b"Length1"), program.len1);
                    write_descriptor(pdf, descriptor_ref, program_ref, &base_font, metrics);
                    plan.write_cid_font(pdf, cid_ref, descriptor_ref, &base_font);
                    plan.write_to_unicode(pdf, cmap_ref, &base_font);
                    pdf.type0_font(font_ref)
                        .base_font(Name(base_font.as_bytes()))
                        .encoding_predefined(Name(b"Identity-H"))
                        .descendant_font(cid_ref)
                        .to_unicode(cmap_ref);
                    Some(plan.char_to_gid)
                }
            };
            log::debug!(
                "register_font: {} → {:.1}ms",
                face.pdf_name,
                t0.elapsed().as_secs_f64() * 1000.0,
            );
            Ok(RegisteredFont {
                pdf_name: face.pdf_name.clone(),
                font_ref,
                char_to_gid,
            })
        })
        .collect()
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007F => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi (Windows-1252) bytes; unmappable chars are dropped.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(char_to_winansi)
        .filter(|&b| b >= 32)
        .collect()
}

/// Encode text as big-endian 2-byte glyph IDs for CIDFont content streams.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &BTreeMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.push((gid >> 8) as u8);
        out.push((gid & 0xFF) as u8);
    }
    out
}

#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_ASCII: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Helvetica widths at 1000 units/em for WinAnsi bytes 32..=255. ASCII is exact
/// (AFM); the upper half is approximated.
fn helvetica_widths(bold: bool) -> Vec<f32> {
    let ascii = if bold {
        &HELVETICA_BOLD_ASCII
    } else {
        &HELVETICA_ASCII
    };
    (32u8..=255u8)
        .map(|b| match b {
            32..=126 => ascii[(b - 32) as usize] as f32,
            0x91 | 0x92 | 0x82 => 222.0,
            0x93 | 0x94 | 0x84 => 333.0,
            0x95 => 350.0,
            0x97 | 0x85 | 0x89 => 1000.0,
            0xA0 => 278.0,
            _ => 556.0,
        })
        .collect()
}

fn identity_system_info() -> SystemInfo<'static> {
    SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    }
}

/// A subset font program ready to be written as a `FontFile2` stream.
struct FontProgram {
    bytes: Vec<u8>,
    len1: i32,
}

/// Which glyphs of a TrueType face end up in the PDF, and under which ids.
struct SubsetPlan {
    remapper: GlyphRemapper,
    char_to_gid: BTreeMap<char, u16>,
    /// Advance widths in 1000-units, indexed by subset glyph id.
    widths: BTreeMap<u16, f32>,
}

impl SubsetPlan {
    fn new(glyphs: &BTreeMap<char, (u16, f32)>, used: &BTreeSet<char>) -> Self {
        let mut remapper = GlyphRemapper::new();
        let mut char_to_gid = BTreeMap::new();
        let mut widths = BTreeMap::new();
        for ch in used {
            if let Some(&(gid, width)) = glyphs.get(ch) {
                let new_gid = remapper.remap(gid);
                char_to_gid.insert(*ch, new_gid);
                widths.insert(new_gid, width);
            }
        }
        Self {
            remapper,
            char_to_gid,
            widths,
        }
    }

    fn font_program(&self, family: &str, data: &[u8]) -> Result<FontProgram, Error> {
        let bytes = subsetter::subset(data, 0, &self.remapper).unwrap_or_else(|e| {
            log::warn!("Font subsetting failed for {family}: {e}; embedding full font");
            data.to_vec()
        });
        let len1 = i32::try_from(bytes.len())
            .map_err(|_| Error::Configuration(format!("font {family} is too large to embed")))?;
        Ok(FontProgram { bytes, len1 })
    }

    /// Runs of consecutive subset glyph ids, for a compact `W` array.
    fn width_runs(&self) -> Vec<(u16, Vec<f32>)> {
        let mut runs: Vec<(u16, Vec<f32>)> = Vec::new();
        for (&gid, &width) in &self.widths {
            match runs.last_mut() {
                Some((first, ws)) if usize::from(*first) + ws.len() == usize::from(gid) => ws.push(width),
                _ => runs.push((gid, vec![width])),
            }
        }
        runs
    }

    fn write_cid_font(&self, pdf: &mut Pdf, cid_ref: Ref, descriptor_ref: Ref, base_font: &str) {
        let mut cid = pdf.cid_font(cid_ref);
        cid.subtype(CidFontType::Type2)
            .base_font(Name(base_font.as_bytes()))
            .system_info(identity_system_info())
            .font_descriptor(descriptor_ref)
            .default_width(0.0)
            .cid_to_gid_map_predefined(Name(b"Identity"));
        let runs = self.width_runs();
        if !runs.is_empty() {
            let mut w = cid.widths();
            for (first, widths) in runs {
                w.consecutive(first, widths);
            }
        }
    }

    fn write_to_unicode(&self, pdf: &mut Pdf, cmap_ref: Ref, base_font: &str) {
        let name = format!("{base_font}-UTF16");
        let mut cmap = UnicodeCmap::new(Name(name.as_bytes()), identity_system_info());
        for (&ch, &gid) in &self.char_to_gid {
            cmap.pair(gid, ch);
        }
        pdf.stream(cmap_ref, cmap.finish().as_slice());
    }
}

fn write_descriptor(pdf: &mut Pdf, descriptor_ref: Ref, program_ref: Ref, base_font: &str, m: &FaceMetrics) {
    let [x0, y0, x1, y1] = m.bbox;
    pdf.font_descriptor(descriptor_ref)
        .name(Name(base_font.as_bytes()))
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(x0, y0, x1, y1))
        .italic_angle(0.0)
        .ascent(m.ascent)
        .descent(m.descent)
        .cap_height(m.cap_height)
        .stem_v(80.0)
        .font_file2(program_ref);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_widths_follow_afm() {
        let fonts = FontSet::builtin();
        // "Hi" = H(722) + i(222) at 10pt
        let w = fonts.text_width(FontStyle::Regular, 10.0, "Hi");
        assert!((w - 9.44).abs() < 1e-3, "got {w}");
        let bold = fonts.text_width(FontStyle::Bold, 10.0, "Hi");
        assert!(bold > w);
    }

    #[test]
    fn missing_font_file_is_a_configuration_error() {
        let config = FontConfig::Custom {
            regular: FontSource::Path("/nonexistent/font.ttf".into()),
            bold: None,
        };
        let err = FontSet::load(&config, &BTreeSet::new()).err();
        assert!(matches!(err, Some(Error::Configuration(_))));
    }

    #[test]
    fn garbage_font_bytes_are_a_configuration_error() {
        let config = FontConfig::Custom {
            regular: FontSource::Bytes(vec![0u8; 16]),
            bold: None,
        };
        let err = FontSet::load(&config, &BTreeSet::new()).err();
        assert!(matches!(err, Some(Error::Configuration(_))));
    }

    #[test]
    fn subset_plan_keeps_char_order_and_skips_missing_glyphs() {
        let glyphs: BTreeMap<char, (u16, f32)> =
            [('A', (36, 667.0)), ('B', (37, 667.0)), ('z', (93, 500.0)), ('é', (200, 556.0))]
                .into_iter()
                .collect();
        let used: BTreeSet<char> = ['z', 'A', 'B', '?'].into_iter().collect();
        let plan = SubsetPlan::new(&glyphs, &used);

        let chars: Vec<char> = plan.char_to_gid.keys().copied().collect();
        assert_eq!(chars, vec!['A', 'B', 'z']);
        let ids: Vec<u16> = plan.char_to_gid.values().copied().collect();
        assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(plan.width_runs(), vec![(ids[0], vec![667.0, 667.0, 500.0])]);
    }

    #[test]
    fn width_runs_break_at_gaps() {
        let plan = SubsetPlan {
            remapper: GlyphRemapper::new(),
            char_to_gid: BTreeMap::new(),
            widths: BTreeMap::from([(1, 250.0), (2, 500.0), (5, 750.0)]),
        };
        assert_eq!(plan.width_runs(), vec![(1, vec![250.0, 500.0]), (5, vec![750.0])]);
    }

    #[test]
    fn winansi_drops_unmappable_chars() {
        assert_eq!(to_winansi_bytes("a€b\u{4e2d}"), vec![b'a', 0x80, b'b']);
    }
}
