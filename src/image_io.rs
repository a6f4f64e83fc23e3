//! Conversion between `image` crate images and surface texel planes.

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

use crate::gpu::SurfaceFormat;

/// Resize `image` to a `size` x `size` square ready for transforming.
pub fn fit_to_size(image: &DynamicImage, size: u32) -> DynamicImage {
    if image.width() == size && image.height() == size {
        return image.clone();
    }
    image.resize_exact(size, size, FilterType::Lanczos3)
}

/// Row-major texels of `image` laid out for a surface of `format`.
///
/// Single-channel formats take the luma of each pixel; multi-channel formats
/// take RGB with alpha set to 1.0. Values are in `[0, 1]`.
pub fn image_to_texels(image: &DynamicImage, format: SurfaceFormat) -> Vec<f32> {
    if format.components() == 1 {
        return image
            .to_luma32f()
            .pixels()
            .map(|pixel| pixel.0[0])
            .collect();
    }

    let rgb = image.to_rgb32f();
    let mut texels = Vec::with_capacity(rgb.width() as usize * rgb.height() as usize * 4);
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        texels.extend_from_slice(&[r, g, b, 1.0]);
    }
    texels
}

/// 8-bit RGB image from row-major texels with `components` values per texel.
///
/// With `normalize`, values are divided by the largest magnitude in the
/// colour channels first, which makes spectra visible. Otherwise values are
/// clamped to `[0, 1]`. Single-channel texels are replicated to grey.
///
/// # Panics
///
/// Panics if `components` is zero or `texels` is shorter than
/// `width * height * components`.
pub fn texels_to_image(
    texels: &[f32],
    width: u32,
    height: u32,
    components: usize,
    normalize: bool,
) -> RgbImage {
    assert!(components > 0, "components must be non-zero");
    let count = width as usize * height as usize;
    assert!(
        texels.len() >= count * components,
        "not enough texels for a {}x{} image",
        width,
        height
    );

    let colour = components.min(3);
    let scale = if normalize {
        let peak = texels
            .chunks_exact(components)
            .take(count)
            .flat_map(|texel| texel[..colour].iter())
            .fold(0.0f32, |peak, v| peak.max(v.abs()));
        if peak > 0.0 {
            1.0 / peak
        } else {
            1.0
        }
    } else {
        1.0
    };

    let to_byte = |v: f32| ((v * scale).clamp(0.0, 1.0) * 255.0).round() as u8;

    let mut image = RgbImage::new(width, height);
    for (pixel, texel) in image.pixels_mut().zip(texels.chunks_exact(components)) {
        *pixel = if colour == 1 {
            let v = to_byte(texel[0]);
            Rgb([v, v, v])
        } else {
            Rgb([
                to_byte(texel[0]),
                to_byte(texel[1]),
                to_byte(texel.get(2).copied().unwrap_or(0.0)),
            ])
        };
    }
    image
}
