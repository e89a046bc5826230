//! Frame-by-frame orchestration around the scanner.
//!
//! A [`Session`] samples incoming frames, scans the sampled ones, classifies
//! the non-blank cells, asks the solver for a solution and prepares what the
//! overlay renderer needs. Classification and solving are black boxes behind
//! [`DigitClassifier`] and [`GridSolver`].

use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbImage;

use crate::patch::{cell_patches, CellPatch};
use crate::{GRID_CELLS, LocateError, Located, Scanner, Workspace};

/// 9x9 digits indexed `[row][col]`; 0 means unknown.
pub type Digits = [[u8; GRID_CELLS]; GRID_CELLS];

pub trait DigitClassifier {
	/// Class index for one cell patch. Indices above 9 are treated as unknown.
	fn classify(&mut self, patch: &CellPatch) -> Result<usize>;
}

pub trait GridSolver {
	fn solve(&mut self, digits: &Digits) -> Solution;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
	pub solved: bool,
	pub digits: Digits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOrigin {
	/// Read from the frame.
	Recognized,
	/// Filled in by the solver.
	Inferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayCell {
	pub recognized: u8,
	pub displayed: u8,
	pub origin: CellOrigin,
}

/// Everything the renderer draws for one frame.
#[derive(Debug, Clone)]
pub struct Overlay {
	/// Rectified color grid.
	pub color: RgbImage,
	pub cells: [[OverlayCell; GRID_CELLS]; GRID_CELLS],
	/// Whether the displayed digits come from a successful solve.
	pub solved: bool,
	pub located: Located,
}

#[derive(Debug)]
pub enum FrameOutcome {
	/// Dropped by the sampling policy.
	Skipped,
	/// Sampled, but no usable grid in it.
	Rejected(LocateError),
	Scanned(Box<Overlay>),
}

/// Lets every `every`-th offered frame through.
#[derive(Debug, Clone)]
pub struct FrameSampler {
	every: u64,
	seen: u64,
}

impl FrameSampler {
	pub fn new(every: u32) -> Self {
		Self {
			every: every.max(1) as u64,
			seen: 0,
		}
	}

	pub fn offer(&mut self) -> bool {
		self.seen += 1;
		self.seen % self.every == 0
	}
}

pub struct Session<C, S> {
	scanner: Scanner,
	workspace: Workspace,
	classifier: C,
	solver: S,
	sampler: FrameSampler,
	last_solution: Option<Solution>,
}

impl<C: DigitClassifier, S: GridSolver> Session<C, S> {
	pub fn new(scanner: Scanner, classifier: C, solver: S, sample_every: u32) -> Self {
		Self {
			workspace: scanner.workspace(),
			scanner,
			classifier,
			solver,
			sampler: FrameSampler::new(sample_every),
			last_solution: None,
		}
	}

	/// Entry point for a camera stream: applies the sampling policy first.
	pub fn offer_frame(&mut self, frame: &RgbImage) -> Result<FrameOutcome> {
		if !self.sampler.offer() {
			return Ok(FrameOutcome::Skipped);
		}
		self.process(frame)
	}

	/// Runs the whole pipeline on one frame, regardless of sampling.
	pub fn process(&mut self, frame: &RgbImage) -> Result<FrameOutcome> {
		let started = Instant::now();
		let scan = match self.scanner.scan(frame, &mut self.workspace) {
			Ok(scan) => scan,
			Err(err) => {
				tracing::debug!(error = %err, "frame rejected");
				return Ok(FrameOutcome::Rejected(err));
			}
		};
		let scanned = started.elapsed();

		let patches = cell_patches(scan.cleaned, self.scanner.params().cell_edge)?;
		let color = scan.color.clone();
		let located = scan.located;

		let classify_start = Instant::now();
		let recognized = recognize(&mut self.classifier, &patches, self.scanner.params().min_patch_pixels)?;
		let classified = classify_start.elapsed();

		let solution = self.solver.solve(&recognized);
		if solution.solved || self.last_solution.is_none() {
			self.last_solution = Some(solution);
		}
		let shown = self.last_solution.unwrap_or(solution);

		tracing::debug!(
			scan_ms = scanned.as_secs_f64() * 1000.0,
			classify_ms = classified.as_secs_f64() * 1000.0,
			total_ms = started.elapsed().as_secs_f64() * 1000.0,
			solved = solution.solved,
			"frame processed"
		);

		Ok(FrameOutcome::Scanned(Box::new(Overlay {
			color,
			cells: overlay_cells(&recognized, &shown.digits),
			solved: shown.solved,
			located,
		})))
	}

	/// Most recent solution kept for display.
	pub fn last_solution(&self) -> Option<&Solution> {
		self.last_solution.as_ref()
	}

	pub fn workspace(&self) -> &Workspace {
		&self.workspace
	}
}

/// Classifies every non-blank patch; blank cells stay 0 without a classifier call.
pub fn recognize<C: DigitClassifier + ?Sized>(classifier: &mut C, patches: &[CellPatch], min_lit: usize) -> Result<Digits> {
	let mut digits = [[0u8; GRID_CELLS]; GRID_CELLS];
	for patch in patches.iter().filter(|p| !p.is_blank(min_lit)) {
		let class = classifier
			.classify(patch)
			.with_context(|| format!("classify cell ({}, {})", patch.row, patch.col))?;
		digits[patch.row][patch.col] = if class > 9 { 0 } else { class as u8 };
	}
	Ok(digits)
}

fn overlay_cells(recognized: &Digits, displayed: &Digits) -> [[OverlayCell; GRID_CELLS]; GRID_CELLS] {
	std::array::from_fn(|row| {
		std::array::from_fn(|col| {
			let digit = recognized[row][col];
			OverlayCell {
				recognized: digit,
				displayed: displayed[row][col],
				origin: if digit != 0 { CellOrigin::Recognized } else { CellOrigin::Inferred },
			}
		})
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::patch::PATCH_EDGE;

	struct Fixed(usize, usize);

	impl DigitClassifier for Fixed {
		fn classify(&mut self, _: &CellPatch) -> Result<usize> {
			self.1 += 1;
			Ok(self.0)
		}
	}

	fn patch(row: usize, col: usize, lit: usize) -> CellPatch {
		let side = PATCH_EDGE;
		let mut cell = image::GrayImage::new(side * GRID_CELLS as u32, side * GRID_CELLS as u32);
		for i in 0..lit as u32 {
			cell.put_pixel(col as u32 * side + i % side, row as u32 * side + i / side, image::Luma([255]));
		}
		cell_patches(&cell, PATCH_EDGE).unwrap().swap_remove(row * GRID_CELLS + col)
	}

	#[test]
	fn sampler_passes_every_nth_frame() {
		let mut sampler = FrameSampler::new(10);
		let passed: Vec<usize> = (1..=35).filter(|_| sampler.offer()).collect();
		assert_eq!(passed, vec![10, 20, 30]);
	}

	#[test]
	fn sampler_of_zero_passes_everything() {
		let mut sampler = FrameSampler::new(0);
		assert!((0..5).all(|_| sampler.offer()));
	}

	#[test]
	fn blank_patches_never_reach_the_classifier() {
		let mut classifier = Fixed(4, 0);
		let patches = vec![patch(0, 0, 14), patch(1, 2, 15), patch(8, 8, 40)];
		let digits = recognize(&mut classifier, &patches, 15).unwrap();
		assert_eq!(classifier.1, 2);
		assert_eq!(digits[0][0], 0);
		assert_eq!(digits[1][2], 4);
		assert_eq!(digits[8][8], 4);
	}

	#[test]
	fn out_of_range_classes_become_unknown() {
		let mut classifier = Fixed(10, 0);
		let digits = recognize(&mut classifier, &[patch(3, 3, 30)], 15).unwrap();
		assert_eq!(digits[3][3], 0);
		assert_eq!(classifier.1, 1);
	}

	#[test]
	fn overlay_marks_recognized_and_inferred_cells() {
		let mut recognized = [[0u8; GRID_CELLS]; GRID_CELLS];
		recognized[0][1] = 7;
		let displayed = [[5u8; GRID_CELLS]; GRID_CELLS];
		let cells = overlay_cells(&recognized, &displayed);
		assert_eq!(
			cells[0][1],
			OverlayCell { recognized: 7, displayed: 5, origin: CellOrigin::Recognized }
		);
		assert_eq!(cells[4][4].origin, CellOrigin::Inferred);
		assert_eq!(cells[4][4].displayed, 5);
	}
}
