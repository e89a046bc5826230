//! What the CLI prints and dumps for a scanned frame.

use std::path::Path;

use scan::geometry::Corners;
use scan::{Extraction, GRID_CELLS, Located};
use serde::Serialize;

/// Per-frame JSON dump written next to the debug images.
#[derive(Debug, Serialize)]
pub struct FrameReport<'a> {
    pub frame: &'a Path,
    pub corners: Corners,
    pub hull_area: f64,
    pub retained: usize,
    pub extraction: &'a Extraction,
}

impl<'a> FrameReport<'a> {
    pub fn new(frame: &'a Path, located: &Located, extraction: &'a Extraction) -> Self {
        Self {
            frame,
            corners: located.corners,
            hull_area: located.hull_area,
            retained: extraction.retained_count(),
            extraction,
        }
    }
}

/// 9x9 occupancy map: `#` for a cell with retained ink, `.` otherwise.
/// Boxes are separated like on paper.
pub fn occupancy(extraction: &Extraction) -> String {
    let mut out = String::new();
    for row in 0..GRID_CELLS {
        if row > 0 && row % 3 == 0 {
            out.push_str("------+-------+------\n");
        }
        for col in 0..GRID_CELLS {
            if col > 0 && col % 3 == 0 {
                out.push_str("| ");
            }
            out.push(if extraction.cell(row, col).retained { '#' } else { '.' });
            if col + 1 < GRID_CELLS {
                out.push(' ');
            }
        }
        out.push('\n');
    }
    out
}
