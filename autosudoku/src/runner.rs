//! Feeds image files through the scanner as if they were a camera stream.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use scan::session::FrameSampler;
use scan::{save_png, Scan, Scanner, Workspace};

use crate::config::Config;
use crate::report::{occupancy, FrameReport};

/// How the frames of one run were handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
	pub skipped: usize,
	pub rejected: usize,
	pub scanned: usize,
}

pub struct Runner {
	scanner: Scanner,
	workspace: Workspace,
	sampler: FrameSampler,
	debug_dir: Option<PathBuf>,
}

impl Runner {
	pub fn new(config: &Config) -> Result<Self> {
		let scanner = Scanner::try_new(config.scan).context("invalid scan parameters")?;
		Ok(Self {
			workspace: scanner.workspace(),
			scanner,
			sampler: FrameSampler::new(config.sample_every),
			debug_dir: config.debug_dir.clone(),
		})
	}

	pub fn run(&mut self, frames: &[PathBuf]) -> Result<Tally> {
		let mut tally = Tally::default();
		for path in frames {
			if !self.sampler.offer() {
				tracing::debug!(frame = ?path, "frame skipped");
				tally.skipped += 1;
				continue;
			}
			if self.scan_file(path)? {
				tally.scanned += 1;
			} else {
				tally.rejected += 1;
			}
		}
		Ok(tally)
	}

	/// Returns whether a grid was found. Frames that cannot be decoded count
	/// as frames without a grid.
	fn scan_file(&mut self, path: &Path) -> Result<bool> {
		let frame = match image::open(path) {
			Ok(decoded) => decoded.to_rgb8(),
			Err(err) => {
				tracing::warn!(frame = ?path, error = %err, "undecodable frame");
				return Ok(false);
			}
		};

		let started = Instant::now();
		let scan = match self.scanner.scan(&frame, &mut self.workspace) {
			Ok(scan) => scan,
			Err(err) => {
				tracing::info!(frame = ?path, error = %err, "no grid");
				return Ok(false);
			}
		};
		tracing::info!(
			frame = ?path,
			retained = scan.extraction.retained_count(),
			hull_area = scan.located.hull_area,
			elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
			"grid found"
		);
		println!("{}\n{}", path.display(), occupancy(&scan.extraction));

		if let Some(dir) = &self.debug_dir {
			write_debug(dir, path, &scan)?;
		}
		Ok(true)
	}
}

/// Rectified color grid, cleaned grid and a JSON report, named after the frame.
fn write_debug(dir: &Path, frame: &Path, scan: &Scan<'_>) -> Result<()> {
	fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
	let stem = frame.file_stem().and_then(|s| s.to_str()).unwrap_or("frame");

	save_png(scan.color, dir.join(format!("{stem}_grid.png")))?;
	save_png(scan.cleaned, dir.join(format!("{stem}_cleaned.png")))?;

	let report = FrameReport::new(frame, &scan.located, &scan.extraction);
	let json = serde_json::to_string_pretty(&report).context("serialize report")?;
	let path = dir.join(format!("{stem}.json"));
	fs::write(&path, json).with_context(|| format!("write {:?}", path))?;
	Ok(())
}
