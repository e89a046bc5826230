//! Classifier input patches cut from the cleaned grid.

use anyhow::{anyhow, Result};
use image::GrayImage;

use crate::GRID_CELLS;

/// Edge of the square patch the digit classifier consumes.
pub const PATCH_EDGE: u32 = 28;

/// One cell, normalised to `[0, 1]`, `PATCH_EDGE x PATCH_EDGE` row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CellPatch {
    pub row: usize,
    pub col: usize,
    pixels: Vec<f32>,
}

impl CellPatch {
    fn from_bytes(row: usize, col: usize, bytes: &[u8]) -> Self {
        Self {
            row,
            col,
            pixels: bytes.iter().map(|&v| v as f32 / 255.0).collect(),
        }
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Values above one half.
    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&v| v > 0.5).count()
    }

    /// Too little ink to be worth classifying.
    pub fn is_blank(&self, min_lit: usize) -> bool {
        self.lit_pixels() < min_lit
    }
}

/// Cuts `cleaned` into 81 patches in row-major order.
///
/// Cells whose edge differs from [`PATCH_EDGE`] are resampled.
pub fn cell_patches(cleaned: &GrayImage, cell_edge: u32) -> Result<Vec<CellPatch>> {
    let side = cell_edge * GRID_CELLS as u32;
    if cleaned.width() < side || cleaned.height() < side {
        return Err(anyhow!(
            "grid image {}x{} is smaller than {side}x{side}",
            cleaned.width(),
            cleaned.height()
        ));
    }

    let mut resizer = fast_image_resize::Resizer::new();
    let mut patches = Vec::with_capacity(GRID_CELLS * GRID_CELLS);
    for row in 0..GRID_CELLS {
        for col in 0..GRID_CELLS {
            let cell = image::imageops::crop_imm(
                cleaned,
                col as u32 * cell_edge,
                row as u32 * cell_edge,
                cell_edge,
                cell_edge,
            )
            .to_image();

            let patch = if cell_edge == PATCH_EDGE {
                CellPatch::from_bytes(row, col, cell.as_raw())
            } else {
                CellPatch::from_bytes(row, col, &resample(&mut resizer, &cell)?)
            };
            patches.push(patch);
        }
    }
    Ok(patches)
}

fn resample(resizer: &mut fast_image_resize::Resizer, cell: &GrayImage) -> Result<Vec<u8>> {
    let src = fast_image_resize::images::ImageRef::new(
        cell.width(),
        cell.height(),
        cell.as_raw(),
        fast_image_resize::PixelType::U8,
    )
    .map_err(|e| anyhow!("fast_image_resize: ImageRef::new failed: {e:?}"))?;

    let mut dst = fast_image_resize::images::Image::new(PATCH_EDGE, PATCH_EDGE, fast_image_resize::PixelType::U8);
    let options = fast_image_resize::ResizeOptions::new().resize_alg(
        fast_image_resize::ResizeAlg::Convolution(fast_image_resize::FilterType::Bilinear),
    );
    resizer
        .resize(&src, &mut dst, &Some(options))
        .map_err(|e| anyhow!("fast_image_resize: resize failed: {e:?}"))?;

    Ok(dst.into_vec())
}
