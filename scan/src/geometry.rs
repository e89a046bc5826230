//! Points, corner assignment and the perspective transform used for rectification.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use serde::Serialize;

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(&self, other: Point2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(&self, other: Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<imageproc::point::Point<i32>> for Point2 {
    fn from(p: imageproc::point::Point<i32>) -> Self {
        Self::new(p.x as f64, p.y as f64)
    }
}

/// Four points labelled by the grid corner they stand for.
///
/// Image coordinates: x grows to the right, y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Corners {
    pub top_left: Point2,
    pub top_right: Point2,
    pub bottom_left: Point2,
    pub bottom_right: Point2,
}

impl Corners {
    /// Labels the extreme points of `points` along the four diagonals.
    ///
    /// No ordering of `points` is assumed. Equal projections are settled by
    /// the smaller `(x, y)`, so any permutation of the same points gives the
    /// same result. Returns `None` for an empty slice.
    pub fn assign(points: &[Point2]) -> Option<Self> {
        Some(Self {
            top_left: extreme(points, Point2::new(-1.0, -1.0))?,
            top_right: extreme(points, Point2::new(1.0, -1.0))?,
            bottom_left: extreme(points, Point2::new(-1.0, 1.0))?,
            bottom_right: extreme(points, Point2::new(1.0, 1.0))?,
        })
    }

    /// Axis-aligned square `(0,0)-(side,side)`.
    pub fn square(side: f64) -> Self {
        Self {
            top_left: Point2::new(0.0, 0.0),
            top_right: Point2::new(side, 0.0),
            bottom_left: Point2::new(0.0, side),
            bottom_right: Point2::new(side, side),
        }
    }

    /// `[top_left, top_right, bottom_left, bottom_right]`
    pub fn to_array(&self) -> [Point2; 4] {
        [self.top_left, self.top_right, self.bottom_left, self.bottom_right]
    }
}

fn extreme(points: &[Point2], direction: Point2) -> Option<Point2> {
    points.iter().copied().reduce(|best, p| {
        let (db, dp) = (best.dot(direction), p.dot(direction));
        let better = dp > db || (dp == db && (p.x, p.y) < (best.x, best.y));
        if better { p } else { best }
    })
}

/// Absolute area of a simple polygon (shoelace formula).
pub fn polygon_area(points: &[Point2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    twice.abs() / 2.0
}

/// Projective mapping between two quadrilaterals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    matrix: Matrix3<f64>,
}

impl PerspectiveTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Solves for the homography mapping each corner of `from` onto the
    /// corresponding corner of `to`.
    ///
    /// Returns `None` when the corners are degenerate (three collinear points
    /// or a repeated point on either side).
    pub fn from_corners(from: &Corners, to: &Corners) -> Option<Self> {
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for (i, (p, q)) in from.to_array().into_iter().zip(to.to_array()).enumerate() {
            let r = 2 * i;
            a[(r, 0)] = p.x;
            a[(r, 1)] = p.y;
            a[(r, 2)] = 1.0;
            a[(r, 6)] = -p.x * q.x;
            a[(r, 7)] = -p.y * q.x;
            b[r] = q.x;

            a[(r + 1, 3)] = p.x;
            a[(r + 1, 4)] = p.y;
            a[(r + 1, 5)] = 1.0;
            a[(r + 1, 6)] = -p.x * q.y;
            a[(r + 1, 7)] = -p.y * q.y;
            b[r + 1] = q.y;
        }

        let h = a.lu().solve(&b)?;
        if h.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let matrix = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        if matrix.determinant().abs() <= EPS {
            return None;
        }
        let transform = Self { matrix };

        // A repeated source point can still yield a solvable system that sends
        // that point to infinity; only accept exact correspondences.
        let exact = from.to_array().into_iter().zip(to.to_array()).all(|(p, q)| {
            transform
                .apply(p)
                .is_some_and(|m| m.distance(q) <= 1e-6 * (1.0 + q.x.abs() + q.y.abs()))
        });
        exact.then_some(transform)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Maps a point, or `None` if it lands on the line at infinity.
    pub fn apply(&self, p: Point2) -> Option<Point2> {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        if v[2].abs() <= EPS || !v[2].is_finite() {
            return None;
        }
        Some(Point2::new(v[0] / v[2], v[1] / v[2]))
    }

    /// Largest absolute difference from the identity matrix.
    pub fn identity_deviation(&self) -> f64 {
        (self.matrix - Matrix3::identity()).amax()
    }

    pub fn inverse(&self) -> Option<Self> {
        let matrix = self.matrix.try_inverse()?;
        let scale = matrix[(2, 2)];
        if scale.abs() <= EPS || !scale.is_finite() {
            return None;
        }
        Some(Self { matrix: matrix / scale })
    }

    /// Output-to-source coordinate map for `imageproc`'s `warp_into_with`,
    /// with `self` mapping output pixels into a source of shape `source`.
    ///
    /// Coordinates up to one pixel outside the source are pulled onto its
    /// border, so the border rows and columns of the output are sampled
    /// instead of filled with the default pixel. Bilinear sampling at the last
    /// column or row needs the source padded by [`crate::raster::copy_padded`].
    pub fn sampler(self, (width, height): (u32, u32)) -> impl Fn(f32, f32) -> (f32, f32) + Copy + Send + Sync {
        move |x, y| match self.apply(Point2::new(x as f64, y as f64)) {
            Some(p) => (pull_inside(p.x as f32, width), pull_inside(p.y as f32, height)),
            None => (f32::MIN, f32::MIN),
        }
    }
}

fn pull_inside(v: f32, len: u32) -> f32 {
    let len = len as f32;
    if v < -1.0 || v > len {
        return v;
    }
    v.clamp(0.0, (len - 1.0).max(0.0))
}
