//! Cell ink extraction.
//!
//! The rectified grid is binarised once, then every cell grows an ink region
//! from a seed window around its centre. Growth only follows ink, never leaves
//! the cell footprint, and never claims a pixel another cell already claimed
//! during this frame. Cells with too little ink are wiped so stray specks and
//! grid-line remnants never reach the classifier.

use image::{GrayImage, Luma};
use imageproc::contrast::adaptive_threshold;
use imageproc::filter::gaussian_blur_f32;
use serde::Serialize;

use crate::{GRID_CELLS, ScanParams, Workspace};

/// Offsets examined around each grown pixel, on both axes.
const NEIGHBOURHOOD: std::ops::Range<i64> = -2..2;

/// Frame-wide record of pixels already claimed by some cell.
#[derive(Debug, Clone, Default)]
pub struct VisitMask {
    width: u32,
    height: u32,
    visited: Vec<bool>,
}

impl VisitMask {
    pub fn new(shape: (u32, u32)) -> Self {
        let mut mask = Self::default();
        mask.reset(shape);
        mask
    }

    /// Clears every mark and adopts `shape`.
    pub fn reset(&mut self, (width, height): (u32, u32)) {
        self.width = width;
        self.height = height;
        self.visited.clear();
        self.visited.resize(width as usize * height as usize, false);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn is_visited(&self, x: u32, y: u32) -> bool {
        self.visited[self.index(x, y)]
    }

    /// Marks a pixel. Returns `false` if it was already marked.
    #[inline]
    pub fn visit(&mut self, x: u32, y: u32) -> bool {
        let i = self.index(x, y);
        !std::mem::replace(&mut self.visited[i], true)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.iter().filter(|v| **v).count()
    }
}

/// Breadth-first region grower with a reusable worklist.
///
/// The worklist holds every pixel claimed for the cell being grown. A pixel is
/// pushed at most once per frame and never outside the clipped footprint, so
/// the queue never outgrows `(2 * reach + 1)^2` entries.
#[derive(Debug, Clone, Default)]
pub struct RegionGrower {
    queue: Vec<(u32, u32)>,
}

impl RegionGrower {
    pub fn new(cell_edge: u32) -> Self {
        let span = cell_edge as usize + 1;
        Self {
            queue: Vec::with_capacity(span * span),
        }
    }

    /// Pixels claimed by the last [`RegionGrower::grow`] call, in visit order.
    pub fn claimed(&self) -> &[(u32, u32)] {
        &self.queue
    }

    /// Grows the ink region of cell `(row, col)` from `source` into `out` and
    /// returns its ink pixel count.
    ///
    /// When the count stays below `params.min_ink_pixels`, every pixel claimed
    /// for the cell is cleared in `out` again.
    pub fn grow(
        &mut self,
        params: &ScanParams,
        source: &GrayImage,
        out: &mut GrayImage,
        mask: &mut VisitMask,
        row: usize,
        col: usize,
    ) -> usize {
        let (width, height) = source.dimensions();
        let in_bounds = |x: i64, y: i64| x >= 0 && y >= 0 && x < width as i64 && y < height as i64;
        let reach = params.growth_reach() as i64;
        let (cx, cy) = cell_centre(params.cell_edge, row, col);
        let half_seed = (params.seed_window / 2) as i64;

        self.queue.clear();
        for dy in -half_seed..=half_seed {
            for dx in -half_seed..=half_seed {
                let (x, y) = (cx + dx, cy + dy);
                if in_bounds(x, y) && mask.visit(x as u32, y as u32) {
                    self.queue.push((x as u32, y as u32));
                }
            }
        }

        let mut ink = 0;
        let mut head = 0;
        while head < self.queue.len() {
            let (x, y) = self.queue[head];
            head += 1;

            let value = source.get_pixel(x, y).0[0];
            if value > params.ink_threshold {
                out.put_pixel(x, y, Luma([value]));
                ink += 1;
            }

            for dy in NEIGHBOURHOOD {
                for dx in NEIGHBOURHOOD {
                    let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                    if !in_bounds(nx, ny) {
                        continue;
                    }
                    // Clip to the cell footprint around the seed centre.
                    if (nx - cx).abs() > reach || (ny - cy).abs() > reach {
                        continue;
                    }
                    let (nx, ny) = (nx as u32, ny as u32);
                    if source.get_pixel(nx, ny).0[0] <= params.ink_threshold {
                        continue;
                    }
                    if mask.visit(nx, ny) {
                        self.queue.push((nx, ny));
                    }
                }
            }
        }
        debug_assert!(self.queue.len() <= ((2 * reach + 1) * (2 * reach + 1)) as usize);

        if ink < params.min_ink_pixels {
            for &(x, y) in &self.queue {
                out.put_pixel(x, y, Luma([0]));
            }
        }
        ink
    }
}

/// Geometric centre of cell `(row, col)` in grid-image coordinates.
pub fn cell_centre(cell_edge: u32, row: usize, col: usize) -> (i64, i64) {
    let edge = cell_edge as i64;
    (col as i64 * edge + edge / 2, row as i64 * edge + edge / 2)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CellReport {
    /// Ink pixels grown from the cell's seed.
    pub ink: usize,
    /// Whether the ink was kept in the cleaned image.
    pub retained: bool,
}

/// Per-cell outcome of one extraction, indexed `[row][col]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub cells: [[CellReport; GRID_CELLS]; GRID_CELLS],
}

impl Extraction {
    pub fn cell(&self, row: usize, col: usize) -> CellReport {
        self.cells[row][col]
    }

    /// `(row, col)` of every cell whose ink was kept.
    pub fn retained(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, c)| c.retained)
                .map(move |(col, _)| (row, col))
        })
    }

    pub fn retained_count(&self) -> usize {
        self.retained().count()
    }
}

/// Grows all 81 cells of the binarised `source` into `out`.
///
/// `out` must have the shape of `source` and be all zero. The mask is reset
/// here, once for the whole frame.
pub fn grow_cells(
    params: &ScanParams,
    source: &GrayImage,
    out: &mut GrayImage,
    mask: &mut VisitMask,
    grower: &mut RegionGrower,
) -> Extraction {
    debug_assert_eq!(source.dimensions(), out.dimensions());
    mask.reset(source.dimensions());

    let mut cells = [[CellReport::default(); GRID_CELLS]; GRID_CELLS];
    for (row, reports) in cells.iter_mut().enumerate() {
        for (col, report) in reports.iter_mut().enumerate() {
            let ink = grower.grow(params, source, out, mask, row, col);
            *report = CellReport {
                ink,
                retained: ink >= params.min_ink_pixels,
            };
        }
    }
    Extraction { cells }
}

/// Binarises the rectified grid in the workspace and extracts each cell's ink.
/// The cleaned grid is left as the grid pool's current slot.
pub(crate) fn extract(params: &ScanParams, ws: &mut Workspace) -> Extraction {
    let Workspace { grid, mask, grower, .. } = ws;
    let (block_radius, offset, sigma) = (params.adaptive_block_radius, params.adaptive_offset, params.smooth_sigma);

    // Dark strokes on light paper become bright on black.
    grid.stage(|src, dst| {
        dst.copy_from_slice(adaptive_threshold(src, block_radius, offset).as_raw());
        image::imageops::invert(dst);
    });
    grid.stage(|src, dst| dst.copy_from_slice(gaussian_blur_f32(src, sigma).as_raw()));

    grid.clear_other();
    let shape = grid.dimensions();
    let (working, out) = grid.acquire(shape);
    let extraction = grow_cells(params, working, out, mask, grower);
    grid.swap();

    tracing::debug!(
        retained = extraction.retained_count(),
        claimed = mask.visited_count(),
        "cell ink extracted"
    );
    extraction
}
