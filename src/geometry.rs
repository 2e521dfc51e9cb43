/// Real-valued position in machine units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Quarter turn into the canonical quadrant: `(x, y) -> (-y, x)`.
    pub fn rotate_quarter(self) -> Self {
        Self::new(-self.y, self.x)
    }
}

/// Cell address inside a grid, column along X and row along Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub column: usize,
    pub row: usize,
}

impl CellIndex {
    pub const fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }
}
