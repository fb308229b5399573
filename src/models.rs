use serde::Serialize;

/// Length in bytes of the MD5 digest every identicon is derived from.
pub const DIGEST_LEN: usize = 16;
/// Number of cells along each side of the grid.
pub const GRID_DIM: usize = 5;
/// Total number of cells in the grid.
pub const CELL_COUNT: usize = GRID_DIM * GRID_DIM;
/// Side length of a single cell, in pixels.
pub const CELL_SIZE: u32 = 50;
/// Side length of the square canvas, in pixels.
pub const CANVAS_SIZE: u32 = CELL_SIZE * GRID_DIM as u32;

/// An opaque fill color taken straight from the digest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// RGBA channels with alpha fixed at fully opaque.
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, u8::MAX]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// A grid position selected for drawing, together with the byte that selected it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct GridCell {
    pub value: u8,
    /// Row-major position in the 5x5 grid, `0..CELL_COUNT`.
    pub index: usize,
}

impl GridCell {
    pub fn row(&self) -> usize {
        self.index / GRID_DIM
    }

    pub fn column(&self) -> usize {
        self.index % GRID_DIM
    }
}

/// A pixel coordinate on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned block covered by one visible cell. `bottom_right` is exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Rectangle {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl Rectangle {
    /// Maps a cell onto its 50x50 block of the canvas.
    pub fn for_cell(cell: &GridCell) -> Self {
        let horizontal = cell.column() as u32 * CELL_SIZE;
        let vertical = cell.row() as u32 * CELL_SIZE;
        Self {
            top_left: Point::new(horizontal, vertical),
            bottom_right: Point::new(horizontal + CELL_SIZE, vertical + CELL_SIZE),
        }
    }

    pub fn width(&self) -> u32 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> u32 {
        self.bottom_right.y - self.top_left.y
    }
}
