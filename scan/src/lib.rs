mod params;
pub use params::*;
mod raster;
pub use raster::save_png;
mod workspace;
pub use workspace::Workspace;

pub mod extract;
pub mod geometry;
pub mod locate;
pub mod patch;
pub mod pool;
pub mod session;

pub use extract::{CellReport, Extraction};
pub use locate::{LocateError, Located};

use image::{GrayImage, RgbImage};

/// Cells along each side of the grid.
pub const GRID_CELLS: usize = 9;

/// Localises, rectifies and cleans puzzle grids.
pub struct Scanner {
	params: ScanParams,
}

/// Result of a full scan. The images borrow the workspace they were written to.
pub struct Scan<'w> {
	pub located: Located,
	pub extraction: Extraction,
	/// Cleaned grayscale grid, ready to be cut into cell patches.
	pub cleaned: &'w GrayImage,
	/// Rectified color grid for the overlay.
	pub color: &'w RgbImage,
}

impl Scanner {
	pub fn try_new(params: ScanParams) -> anyhow::Result<Self> {
		params.validate()?;
		Ok(Self { params })
	}

	pub fn params(&self) -> &ScanParams {
		&self.params
	}

	/// A workspace sized for this scanner's grid.
	pub fn workspace(&self) -> Workspace {
		Workspace::new(&self.params)
	}

	pub fn locate(&self, frame: &RgbImage, ws: &mut Workspace) -> Result<Located, LocateError> {
		locate::locate(&self.params, frame, ws)
	}

	/// Extracts cell ink from the grid rectified by the last [`Scanner::locate`].
	pub fn extract(&self, ws: &mut Workspace) -> Extraction {
		extract::extract(&self.params, ws)
	}

	/// Extracts cell ink from an already rectified grid image.
	pub fn extract_image(&self, grid: &GrayImage, ws: &mut Workspace) -> Extraction {
		ws.grid.load(grid);
		extract::extract(&self.params, ws)
	}

	pub fn scan<'w>(&self, frame: &RgbImage, ws: &'w mut Workspace) -> Result<Scan<'w>, LocateError> {
		let located = self.locate(frame, ws)?;
		let extraction = self.extract(ws);
		let ws = &*ws;
		Ok(Scan {
			located,
			extraction,
			cleaned: ws.grid(),
			color: ws.grid_color(),
		})
	}
}

impl Default for Scanner {
	fn default() -> Self {
		Self {
			params: ScanParams::default(),
		}
	}
}
