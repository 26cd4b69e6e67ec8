//! Fixed frame arena
//!
//! Frames are small RGB grids stored in a statically sized arena, indexed
//! by the 24-bit id carried in RENDER_FRAME commands. Uploads come from an
//! external collaborator; the panel driver only reads. The arena does not
//! arbitrate concurrent upload-while-render - collaborators use distinct
//! slots for that.

/// Maximum pixel rows per frame
pub const MAX_ROWS: usize = 10;
/// Maximum pixel columns per frame
pub const MAX_COLS: usize = 10;
/// Frame slots in the arena
pub const MAX_FRAMES: usize = 100;

/// One RGB pixel, 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Frame id as decoded from the wire (24 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameId(pub u32);

/// Frame arena errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Id outside the arena capacity; never wrapped or truncated
    BadId(u32),
    /// Requested grid exceeds the fixed maximum
    BadDimensions { rows: usize, cols: usize },
    /// Pixel coordinate outside the frame's grid
    OutOfBounds { row: usize, col: usize },
}

/// One renderable image: a bounded grid of RGB pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    rows: usize,
    cols: usize,
    pixels: [[Rgb8; MAX_COLS]; MAX_ROWS],
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            rows: MAX_ROWS,
            cols: MAX_COLS,
            pixels: [[Rgb8::default(); MAX_COLS]; MAX_ROWS],
        }
    }
}

impl Frame {
    /// Create an all-black frame with the given dimensions
    pub fn new(rows: usize, cols: usize) -> Result<Self, FrameError> {
        if rows == 0 || cols == 0 || rows > MAX_ROWS || cols > MAX_COLS {
            return Err(FrameError::BadDimensions { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            pixels: [[Rgb8::default(); MAX_COLS]; MAX_ROWS],
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn pixel(&self, row: usize, col: usize) -> Result<Rgb8, FrameError> {
        if row >= self.rows || col >= self.cols {
            return Err(FrameError::OutOfBounds { row, col });
        }
        Ok(self.pixels[row][col])
    }

    pub fn set_pixel(&mut self, row: usize, col: usize, px: Rgb8) -> Result<(), FrameError> {
        if row >= self.rows || col >= self.cols {
            return Err(FrameError::OutOfBounds { row, col });
        }
        self.pixels[row][col] = px;
        Ok(())
    }

    /// Pixels in row-major order, top-left first
    pub fn iter_pixels(&self) -> impl Iterator<Item = Rgb8> + '_ {
        self.pixels[..self.rows]
            .iter()
            .flat_map(move |row| row[..self.cols].iter().copied())
    }
}

/// Fixed arena of up to [`MAX_FRAMES`] frames
pub struct FrameStore {
    frames: [Frame; MAX_FRAMES],
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStore {
    pub fn new() -> Self {
        Self {
            frames: [Frame::default(); MAX_FRAMES],
        }
    }

    /// Fetch a frame by wire id. Ids at or beyond capacity are rejected.
    pub fn get(&self, id: FrameId) -> Result<&Frame, FrameError> {
        self.frames
            .get(id.0 as usize)
            .ok_or(FrameError::BadId(id.0))
    }

    /// Replace the frame in slot `id`
    pub fn put(&mut self, id: FrameId, frame: Frame) -> Result<(), FrameError> {
        let slot = self
            .frames
            .get_mut(id.0 as usize)
            .ok_or(FrameError::BadId(id.0))?;
        *slot = frame;
        Ok(())
    }
}
