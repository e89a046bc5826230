//! Small raster helpers shared by the pipeline stages.

use std::path::Path;

use anyhow::{Context, Result};
use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage};

/// Luma with the ITU-R BT.601 weights camera pipelines use.
#[inline]
pub fn luma(pixel: Rgb<u8>) -> u8 {
    let [r, g, b] = pixel.0.map(u32::from);
    ((299 * r + 587 * g + 114 * b) / 1000) as u8
}

/// Writes the luma of `src` into `dst` (which must have the same shape).
pub fn luma_into(src: &RgbImage, dst: &mut GrayImage) {
    debug_assert_eq!(src.dimensions(), dst.dimensions());
    for (s, d) in src.pixels().zip(dst.pixels_mut()) {
        *d = Luma([luma(*s)]);
    }
}

/// Reallocates `image` if it does not have the requested shape.
pub fn ensure_shape<P: Pixel>(image: &mut ImageBuffer<P, Vec<P::Subpixel>>, shape: (u32, u32)) {
    if image.dimensions() != shape {
        *image = ImageBuffer::new(shape.0, shape.1);
    }
}

/// Copies `src` into `dst` with one extra column and row on the right and
/// bottom repeating the last ones, so bilinear sampling at the last real
/// column or row stays inside the buffer. `src` must not be empty.
pub fn copy_padded<P: Pixel>(src: &ImageBuffer<P, Vec<P::Subpixel>>, dst: &mut ImageBuffer<P, Vec<P::Subpixel>>) {
    let (width, height) = src.dimensions();
    debug_assert!(width > 0 && height > 0);
    ensure_shape(dst, (width + 1, height + 1));

    let channels = P::CHANNEL_COUNT as usize;
    let src_row = width as usize * channels;
    let dst_row = src_row + channels;
    let raw: &mut [P::Subpixel] = dst;
    for (y, out) in raw.chunks_exact_mut(dst_row).enumerate() {
        let sy = y.min(height as usize - 1);
        let row = &src.as_raw()[sy * src_row..(sy + 1) * src_row];
        out[..src_row].copy_from_slice(row);
        out[src_row..].copy_from_slice(&row[src_row - channels..]);
    }
}

/// Debug snapshot helper.
pub fn save_png<P>(image: &ImageBuffer<P, Vec<u8>>, path: impl AsRef<Path>) -> Result<()>
where
    P: Pixel<Subpixel = u8> + image::PixelWithColorType,
{
    let path = path.as_ref();
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("save png {:?}", path))
}
