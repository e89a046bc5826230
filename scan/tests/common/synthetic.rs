use image::{Rgb, RgbImage};

const PAPER: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// Axis-aligned rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    pub fn square(x0: u32, y0: u32, side: u32) -> Self {
        Self { x0, y0, x1: x0 + side, y1: y0 + side }
    }

    pub fn centred(cx: u32, cy: u32, side: u32) -> Self {
        Self::square(cx - side / 2, cy - side / 2, side)
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        (self.x0..self.x1).contains(&x) && (self.y0..self.y1).contains(&y)
    }
}

/// A sheet of white paper on a black table, with black marks on the sheet.
pub fn paper_frame(width: u32, height: u32, paper: Rect, marks: &[Rect]) -> RgbImage {
    assert!(width > 0 && height > 0, "frame dimensions must be positive");
    RgbImage::from_fn(width, height, |x, y| {
        if paper.contains(x, y) && !marks.iter().any(|m| m.contains(x, y)) {
            PAPER
        } else {
            INK
        }
    })
}

/// A frame without any structure.
pub fn uniform_frame(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value; 3]))
}

/// Frame coordinate of the centre of cell `(row, col)`, assuming the grid
/// spans exactly `paper`.
pub fn cell_centre_in(paper: Rect, row: u32, col: u32) -> (u32, u32) {
    let side = paper.x1 - paper.x0;
    let half = side / 18;
    (paper.x0 + col * side / 9 + half, paper.y0 + row * side / 9 + half)
}
