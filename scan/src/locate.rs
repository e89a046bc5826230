//! Grid localisation and rectification.
//!
//! The frame is smoothed, reduced to a closed edge map, and the biggest closed
//! contour is taken as the grid boundary. Its convex hull gives four corners,
//! which are mapped onto a canonical square so the rest of the pipeline can
//! work in fixed cell coordinates.
//!
//! A frame without a usable boundary is not an error of the pipeline, it is
//! just a frame to skip; [`LocateError`] says why.

use image::{Luma, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::contrast::{threshold_mut, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::geometric_transformations::warp_into_with;
use imageproc::geometry::{approximate_polygon_dp, arc_length, convex_hull};
use imageproc::morphology::{dilate_mut, erode_mut};
use imageproc::point::Point;

use crate::geometry::{polygon_area, Corners, PerspectiveTransform, Point2};
use crate::{raster, ScanParams, Workspace};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocateError {
    #[error("no closed boundary found in the frame")]
    NoBoundaryFound,

    #[error("grid boundary too small ({area:.0} px² < {min:.0} px²)")]
    BoundaryTooSmall { area: f64, min: f64 },

    #[error("grid corners do not define a perspective transform")]
    DegenerateQuad,
}

/// A grid boundary found in a frame.
#[derive(Debug, Clone)]
pub struct Located {
    /// Detected corners in frame coordinates.
    pub corners: Corners,
    /// Approximated hull polygon the corners were picked from.
    pub outline: Vec<Point2>,
    pub hull_area: f64,
    /// Frame -> canonical grid mapping.
    pub transform: PerspectiveTransform,
}

/// Finds the grid in `frame` and leaves the rectified gray grid as the grid
/// pool's current slot and the rectified color grid in `ws.grid_color`.
pub(crate) fn locate(params: &ScanParams, frame: &RgbImage, ws: &mut Workspace) -> Result<Located, LocateError> {
    let Workspace {
        color,
        gray,
        grid,
        color_snapshot,
        gray_snapshot,
        grid_color,
        ..
    } = ws;
    if frame.width() == 0 || frame.height() == 0 {
        return Err(LocateError::NoBoundaryFound);
    }

    // Smoothing. The color result is kept for the overlay. The imageproc
    // filters return fresh images; their output is copied into the slot.
    color.load(frame);
    color.stage(|src, dst| dst.copy_from_slice(gaussian_blur_f32(src, params.blur_sigma).as_raw()));
    color.stage(|src, dst| {
        dst.copy_from_slice(median_filter(src, params.median_radius, params.median_radius).as_raw())
    });
    raster::copy_padded(color.current(), color_snapshot);

    let (_, luma) = gray.acquire(frame.dimensions());
    raster::luma_into(color.current(), luma);
    gray.swap();
    raster::copy_padded(gray.current(), gray_snapshot);

    // Closed edge map.
    gray.stage(|src, dst| dst.copy_from_slice(canny(src, params.canny_low, params.canny_high).as_raw()));
    gray.stage(|src, dst| {
        dst.copy_from_slice(src);
        threshold_mut(dst, params.edge_threshold, ThresholdType::Binary);
    });
    gray.stage(|src, dst| {
        dst.copy_from_slice(src);
        dilate_mut(dst, Norm::LInf, params.dilate_radius);
    });
    gray.stage(|src, dst| {
        dst.copy_from_slice(src);
        erode_mut(dst, Norm::LInf, params.erode_radius);
    });

    let contours = find_contours::<i32>(gray.current());
    let boundary = largest_by_area(contours.iter().map(|c| c.points.as_slice()))
        .ok_or(LocateError::NoBoundaryFound)?;

    let hull = convex_hull(boundary);
    let epsilon = params.approx_epsilon * arc_length(boundary, true);
    let outline: Vec<Point2> = approximate_polygon_dp(&hull, epsilon, true)
        .into_iter()
        .map(Point2::from)
        .collect();
    let hull_area = polygon_area(&hull.iter().copied().map(Point2::from).collect::<Vec<_>>());

    tracing::debug!(
        contours = contours.len(),
        hull_area,
        outline = outline.len(),
        "grid boundary candidate"
    );
    if hull_area < params.min_hull_area {
        return Err(LocateError::BoundaryTooSmall {
            area: hull_area,
            min: params.min_hull_area,
        });
    }

    let corners = Corners::assign(&outline).ok_or(LocateError::DegenerateQuad)?;
    let side = params.grid_side();
    let transform = PerspectiveTransform::from_corners(&corners, &Corners::square(side as f64))
        .ok_or(LocateError::DegenerateQuad)?;
    let sample = transform
        .inverse()
        .ok_or(LocateError::DegenerateQuad)?
        .sampler(frame.dimensions());
    let interpolation = params.interpolation.to_imageproc();

    // Snapshots carry one padding column and row; `sample` clamps to the frame.
    let (_, rectified) = grid.acquire((side, side));
    warp_into_with(gray_snapshot, sample, interpolation, Luma([0]), rectified);
    grid.swap();

    raster::ensure_shape(grid_color, (side, side));
    warp_into_with(color_snapshot, sample, interpolation, Rgb([0, 0, 0]), grid_color);

    Ok(Located {
        corners,
        outline,
        hull_area,
        transform,
    })
}

/// First contour of maximal enclosed area.
fn largest_by_area<'a>(contours: impl Iterator<Item = &'a [Point<i32>]>) -> Option<&'a [Point<i32>]> {
    let mut best: Option<(&[Point<i32>], f64)> = None;
    for points in contours {
        let area = polygon_area(&points.iter().copied().map(Point2::from).collect::<Vec<_>>());
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((points, area)),
        }
    }
    best.map(|(points, _)| points)
}
