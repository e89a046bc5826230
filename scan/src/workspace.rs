//! Per-session scratch state.
//!
//! Everything the pipeline mutates while processing a frame lives here and is
//! handed to each run by exclusive borrow: the ping-pong pools, the snapshots
//! taken before destructive stages, the visitation mask and the grower's
//! worklist. Keeping one `Workspace` alive across frames of a constant size
//! keeps all of these buffers in place; only the temporaries returned by
//! imageproc filters are allocated per frame.

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::extract::{RegionGrower, VisitMask};
use crate::pool::BufferPool;
use crate::ScanParams;

pub struct Workspace {
    /// Frame-sized color stages.
    pub(crate) color: BufferPool<Rgb<u8>>,
    /// Frame-sized luminance and edge stages.
    pub(crate) gray: BufferPool<Luma<u8>>,
    /// Grid-sized stages: rectified, binarised, cleaned.
    pub(crate) grid: BufferPool<Luma<u8>>,
    /// Smoothed frame, padded by one column and row.
    pub(crate) color_snapshot: RgbImage,
    pub(crate) gray_snapshot: GrayImage,
    pub(crate) grid_color: RgbImage,
    pub(crate) mask: VisitMask,
    pub(crate) grower: RegionGrower,
}

impl Workspace {
    pub fn new(params: &ScanParams) -> Self {
        let side = params.grid_side();
        Self {
            color: BufferPool::new(),
            gray: BufferPool::new(),
            grid: BufferPool::new(),
            color_snapshot: RgbImage::new(0, 0),
            gray_snapshot: GrayImage::new(0, 0),
            grid_color: RgbImage::new(side, side),
            mask: VisitMask::new((side, side)),
            grower: RegionGrower::new(params.cell_edge),
        }
    }

    /// Current grid image: rectified after localisation, cleaned after extraction.
    pub fn grid(&self) -> &GrayImage {
        self.grid.current()
    }

    /// Rectified color grid from the last successful localisation.
    pub fn grid_color(&self) -> &RgbImage {
        &self.grid_color
    }
}
