//! Tunable constants of the scanning pipeline.
//!
//! Defaults are the values the pipeline was calibrated with for a phone camera
//! and a 28 px classifier input. They are plain data so the application can
//! load them from its JSON config.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::GRID_CELLS;

/// Resampling used when rectifying the detected grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

impl Interpolation {
    pub(crate) fn to_imageproc(self) -> imageproc::geometric_transformations::Interpolation {
        use imageproc::geometric_transformations::Interpolation as Ip;
        match self {
            Self::Nearest => Ip::Nearest,
            Self::Bilinear => Ip::Bilinear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    /// Edge of one cell in the rectified grid image, in pixels.
    pub cell_edge: u32,

    /// Sigma of the 5x5 smoothing applied to the raw frame.
    pub blur_sigma: f32,
    /// Radius of the median filter (1 = 3x3).
    pub median_radius: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Edge strengths above this become 255, everything else 0.
    pub edge_threshold: u8,
    /// L-inf radius of the closing dilation (5 passes of a 3x3 square).
    pub dilate_radius: u8,
    /// L-inf radius of the closing erosion (one pass of a 5x5 square).
    pub erode_radius: u8,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub approx_epsilon: f64,
    /// Smallest accepted hull area, in square pixels.
    pub min_hull_area: f64,
    pub interpolation: Interpolation,

    /// Radius of the adaptive threshold block (1 = 3x3).
    pub adaptive_block_radius: u32,
    pub adaptive_offset: i32,
    /// Sigma of the 3x3 smoothing applied after the adaptive threshold.
    pub smooth_sigma: f32,
    /// Edge of the square seed window grown from each cell centre. Must be odd.
    pub seed_window: u32,
    /// Pixels strictly brighter than this count as ink.
    pub ink_threshold: u8,
    /// Cells with less ink than this are erased.
    pub min_ink_pixels: usize,
    /// Patches with fewer normalised values above 0.5 are never classified.
    pub min_patch_pixels: usize,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            cell_edge: 28,
            blur_sigma: 1.1,
            median_radius: 1,
            canny_low: 60.0,
            canny_high: 200.0,
            edge_threshold: 127,
            dilate_radius: 5,
            erode_radius: 2,
            approx_epsilon: 0.01,
            min_hull_area: 30_000.0,
            interpolation: Interpolation::Bilinear,
            adaptive_block_radius: 1,
            adaptive_offset: 5,
            smooth_sigma: 0.8,
            seed_window: 11,
            ink_threshold: 60,
            min_ink_pixels: 10,
            min_patch_pixels: 15,
        }
    }
}

impl ScanParams {
    /// Side of the rectified grid image.
    #[inline]
    pub fn grid_side(&self) -> u32 {
        self.cell_edge * GRID_CELLS as u32
    }

    /// How far region growth may stray from a cell centre along either axis.
    #[inline]
    pub fn growth_reach(&self) -> u32 {
        self.cell_edge / 2
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.cell_edge >= 4, "cell_edge must be at least 4 (got {})", self.cell_edge);
        ensure!(self.seed_window % 2 == 1, "seed_window must be odd (got {})", self.seed_window);
        ensure!(
            self.seed_window <= self.cell_edge,
            "seed_window {} does not fit in a {} px cell",
            self.seed_window,
            self.cell_edge
        );
        ensure!(self.blur_sigma > 0.0 && self.smooth_sigma > 0.0, "blur sigmas must be positive");
        ensure!(self.canny_low <= self.canny_high, "canny_low must not exceed canny_high");
        ensure!(self.approx_epsilon > 0.0, "approx_epsilon must be positive (got {})", self.approx_epsilon);
        ensure!(self.adaptive_block_radius >= 1, "adaptive_block_radius must be at least 1");
        Ok(())
    }
}
