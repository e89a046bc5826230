mod common;

use common::synthetic::{Rect, cell_centre_in, paper_frame, uniform_frame};
use image::{GrayImage, Luma};
use scan::geometry::Point2;
use scan::{LocateError, ScanParams, Scanner};

const FRAME: u32 = 400;

fn paper() -> Rect {
    Rect::square(70, 70, 260)
}

#[test]
fn uniform_frame_has_no_boundary() {
    let scanner = Scanner::default();
    let mut ws = scanner.workspace();
    let err = scanner.locate(&uniform_frame(FRAME, FRAME, 128), &mut ws).unwrap_err();
    assert_eq!(err, LocateError::NoBoundaryFound);
}

#[test]
fn empty_and_tiny_frames_have_no_boundary() {
    let scanner = Scanner::default();
    let mut ws = scanner.workspace();
    for (width, height) in [(0, 0), (0, 40), (40, 0), (1, 1), (2, 2), (1, 50)] {
        let err = scanner.locate(&uniform_frame(width, height, 200), &mut ws).unwrap_err();
        assert_eq!(err, LocateError::NoBoundaryFound, "{width}x{height}");
    }
}

#[test]
fn small_sheet_is_rejected_by_area() {
    let scanner = Scanner::default();
    let mut ws = scanner.workspace();
    let frame = paper_frame(FRAME, FRAME, Rect::square(150, 150, 60), &[]);
    match scanner.locate(&frame, &mut ws) {
        Err(LocateError::BoundaryTooSmall { area, min }) => {
            assert!(area < min, "area {area} should be below {min}");
            assert_eq!(min, ScanParams::default().min_hull_area);
        }
        other => panic!("expected BoundaryTooSmall, got {other:?}"),
    }
}

#[test]
fn corners_follow_the_sheet() {
    let scanner = Scanner::default();
    let mut ws = scanner.workspace();
    let frame = paper_frame(FRAME, FRAME, paper(), &[]);
    let located = scanner.locate(&frame, &mut ws).unwrap();

    let expected = [(70.0, 70.0), (330.0, 70.0), (70.0, 330.0), (330.0, 330.0)];
    for (corner, (x, y)) in located.corners.to_array().into_iter().zip(expected) {
        let d = corner.distance(Point2::new(x, y));
        assert!(d < 10.0, "corner {corner:?} is {d:.1} px from ({x}, {y})");
    }
    assert!(located.hull_area >= 60_000.0, "hull area {}", located.hull_area);
    assert_eq!(ws.grid().dimensions(), (252, 252));
    assert_eq!(ws.grid_color().dimensions(), (252, 252));

    let mapped = located.transform.apply(located.corners.bottom_right).unwrap();
    assert!(mapped.distance(Point2::new(252.0, 252.0)) < 1e-3, "{mapped:?}");
}

#[test]
fn empty_sheet_has_no_ink() {
    let scanner = Scanner::default();
    let mut ws = scanner.workspace();
    let scan = scanner.scan(&paper_frame(FRAME, FRAME, paper(), &[]), &mut ws).unwrap();

    for row in 0..9 {
        for col in 0..9 {
            let cell = scan.extraction.cell(row, col);
            assert_eq!(cell.ink, 0, "cell ({row}, {col})");
            assert!(!cell.retained);
        }
    }
    assert!(scan.cleaned.pixels().all(|p| p.0[0] == 0));
}

#[test]
fn a_single_mark_is_retained_in_its_cell_only() {
    let scanner = Scanner::default();
    let mut ws = scanner.workspace();
    // The sheet's outline is about as large as the canonical grid.
    let sheet = Rect::square(70, 70, 246);
    let (cx, cy) = cell_centre_in(sheet, 3, 3);
    let frame = paper_frame(FRAME, FRAME, sheet, &[Rect::centred(cx, cy, 12)]);
    let scan = scanner.scan(&frame, &mut ws).unwrap();

    assert_eq!(scan.extraction.retained().collect::<Vec<_>>(), vec![(3, 3)]);
    assert!(scan.extraction.cell(3, 3).ink >= 10);

    // Ink stays inside the cell footprint.
    for (x, y, p) in scan.cleaned.enumerate_pixels() {
        if p.0[0] != 0 {
            assert!((84..=112).contains(&x) && (84..=112).contains(&y), "ink at ({x}, {y})");
        }
    }

    // Rectification is a near-identity scale plus a shift.
    let m = scan.located.transform.matrix();
    for (r, c, expected) in [(0, 0, 1.0), (1, 1, 1.0), (0, 1, 0.0), (1, 0, 0.0)] {
        assert!((m[(r, c)] - expected).abs() < 0.05, "m[{r},{c}] = {}", m[(r, c)]);
    }
    assert!(m[(2, 0)].abs() < 1e-4 && m[(2, 1)].abs() < 1e-4, "{m:?}");
    let top_left = scan.located.transform.apply(Point2::new(70.0, 70.0)).unwrap();
    assert!(top_left.distance(Point2::new(0.0, 0.0)) < 10.0, "{top_left:?}");
}

#[test]
fn workspace_reuse_gives_the_same_result() {
    let scanner = Scanner::default();
    let mut ws = scanner.workspace();
    let (cx, cy) = cell_centre_in(paper(), 5, 1);
    let frame = paper_frame(FRAME, FRAME, paper(), &[Rect::centred(cx, cy, 12)]);

    let first = {
        let scan = scanner.scan(&frame, &mut ws).unwrap();
        (scan.extraction.clone(), scan.cleaned.clone())
    };
    // A different frame in between must not leak into the next one.
    scanner.scan(&paper_frame(FRAME, FRAME, paper(), &[]), &mut ws).unwrap();
    let scan = scanner.scan(&frame, &mut ws).unwrap();

    assert_eq!(scan.extraction, first.0);
    assert_eq!(*scan.cleaned, first.1);
}

#[test]
fn rectified_blank_grid_extracts_nothing() {
    let scanner = Scanner::default();
    let mut ws = scanner.workspace();
    let grid = GrayImage::from_pixel(252, 252, Luma([230]));
    let extraction = scanner.extract_image(&grid, &mut ws);
    assert!(extraction.cells.iter().flatten().all(|c| c.ink == 0));
    assert_eq!(extraction.retained_count(), 0);
    assert!(ws.grid().pixels().all(|p| p.0[0] == 0));
}

#[test]
fn rectified_grid_with_stroke_extracts_its_cell() {
    let scanner = Scanner::default();
    let mut ws = scanner.workspace();
    // Vertical dark stroke through the centre of cell (7, 2).
    let grid = GrayImage::from_fn(252, 252, |x, y| {
        if (68..72).contains(&x) && (200..220).contains(&y) { Luma([20]) } else { Luma([230]) }
    });
    let extraction = scanner.extract_image(&grid, &mut ws);
    assert_eq!(extraction.retained().collect::<Vec<_>>(), vec![(7, 2)]);
}
