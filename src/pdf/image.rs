use crate::error::Error;
use crate::model::ImageAsset;

/// Image data ready to be written as a PDF XObject: deflated 8-bit RGB plus an
/// optional deflated alpha channel for the soft mask.
pub(crate) struct ImageXObject {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgb_deflated: Vec<u8>,
    pub(crate) alpha_deflated: Option<Vec<u8>>,
}

/// Decode `asset` and re-encode it for embedding. The decoded pixel buffer lives
/// only for the duration of this call.
pub(crate) fn decode_image(asset: &ImageAsset) -> Result<ImageXObject, Error> {
    if asset.data.is_empty() {
        return Err(Error::AssetDecode("image data is empty".into()));
    }
    let decoded = image::load_from_memory(&asset.data)
        .map_err(|e| Error::AssetDecode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    drop(decoded);

    let (width, height) = (rgba.width(), rgba.height());
    if width == 0 || height == 0 {
        return Err(Error::AssetDecode("image has no pixels".into()));
    }
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

    let rgb_data: Vec<u8> = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let rgb_deflated = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

    let alpha_deflated = has_alpha.then(|| {
        let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6)
    });

    Ok(ImageXObject {
        width,
        height,
        rgb_deflated,
        alpha_deflated,
    })
}

/// Largest size with the aspect ratio of `src_w`×`src_h` that fits inside
/// `box_w`×`box_h`.
pub(crate) fn fit_within(src_w: f32, src_h: f32, box_w: f32, box_h: f32) -> (f32, f32) {
    if src_w <= 0.0 || src_h <= 0.0 || box_w <= 0.0 || box_h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (box_w / src_w).min(box_h / src_h);
    (src_w * scale, src_h * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_preserves_aspect_ratio() {
        let (w, h) = fit_within(200.0, 100.0, 50.0, 50.0);
        assert!((w - 50.0).abs() < 1e-4);
        assert!((h - 25.0).abs() < 1e-4);

        let (w, h) = fit_within(10.0, 40.0, 100.0, 20.0);
        assert!((w - 5.0).abs() < 1e-4);
        assert!((h - 20.0).abs() < 1e-4);
    }

    #[test]
    fn undecodable_bytes_are_an_asset_error() {
        let asset = ImageAsset {
            data: b"definitely not a png".to_vec(),
            display_width: 10.0,
            display_height: 10.0,
        };
        assert!(matches!(decode_image(&asset), Err(Error::AssetDecode(_))));
    }
}
