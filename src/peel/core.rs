use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::geometry::CellIndex;
use crate::grid::{CellSlot, GridError, SpatialGrid};

/// Axis a counter-clockwise pass mirrors the clockwise walk around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorAxis {
    #[default]
    X,
    Y,
}

/// Ring walk convention.
///
/// | variant | ring start, direction |
/// |---|---|
/// | `Clockwise` | bottom-left: up the left edge, right along the top, down the right edge, left along the bottom |
/// | `CounterClockwise(X)` | bottom-right: up the right edge, left along the top, down the left edge, right along the bottom |
/// | `CounterClockwise(Y)` | top-left: down the left edge, right along the bottom, up the right edge, left along the top |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Clockwise,
    CounterClockwise(MirrorAxis),
}

impl Orientation {
    /// The mirror axis only matters when `clockwise` is false.
    pub fn new(clockwise: bool, mirror: MirrorAxis) -> Self {
        if clockwise {
            Orientation::Clockwise
        } else {
            Orientation::CounterClockwise(mirror)
        }
    }

    pub fn is_clockwise(self) -> bool {
        matches!(self, Orientation::Clockwise)
    }

    /// Border cell visited at `step` of `leg` (0..4). Even legs run along a
    /// column and have `max_y` steps, odd legs run along a row and have
    /// `max_x` steps.
    fn border_cell(self, leg: usize, step: usize, max_x: usize, max_y: usize) -> CellIndex {
        let (column, row) = match (self, leg) {
            (Orientation::Clockwise, 0) => (0, step),
            (Orientation::Clockwise, 1) => (step, max_y),
            (Orientation::Clockwise, 2) => (max_x, max_y - step),
            (Orientation::Clockwise, _) => (max_x - step, 0),
            (Orientation::CounterClockwise(MirrorAxis::X), 0) => (max_x, step),
            (Orientation::CounterClockwise(MirrorAxis::X), 1) => (max_x - step, max_y),
            (Orientation::CounterClockwise(MirrorAxis::X), 2) => (0, max_y - step),
            (Orientation::CounterClockwise(MirrorAxis::X), _) => (step, 0),
            (Orientation::CounterClockwise(MirrorAxis::Y), 0) => (0, max_y - step),
            (Orientation::CounterClockwise(MirrorAxis::Y), 1) => (step, 0),
            (Orientation::CounterClockwise(MirrorAxis::Y), 2) => (max_x, step),
            (Orientation::CounterClockwise(MirrorAxis::Y), _) => (max_x - step, max_y),
        };
        CellIndex::new(column, row)
    }

    /// Cell visited at `step` of a single row or column scan, row by row.
    fn line_cell(self, step: usize, max_x: usize, max_y: usize) -> CellIndex {
        let (x, y) = (step % (max_x + 1), step / (max_x + 1));
        let (column, row) = match self {
            Orientation::Clockwise => (x, y),
            Orientation::CounterClockwise(MirrorAxis::X) => (max_x - x, y),
            Orientation::CounterClockwise(MirrorAxis::Y) => (x, max_y - y),
        };
        CellIndex::new(column, row)
    }
}

/// Cursor over the cells of one ring, captured against the grid bounds at
/// the moment the ring started.
#[derive(Debug, Clone, Copy)]
struct Ring {
    max_x: usize,
    max_y: usize,
    leg: usize,
    step: usize,
    extracted: usize,
}

impl Ring {
    fn new(width: usize, height: usize) -> Self {
        Self {
            max_x: width - 1,
            max_y: height - 1,
            leg: 0,
            step: 0,
            extracted: 0,
        }
    }

    fn is_line(&self) -> bool {
        self.max_x == 0 || self.max_y == 0
    }

    fn advance(&mut self, orientation: Orientation) -> Option<CellIndex> {
        if self.is_line() {
            let cells = (self.max_x + 1) * (self.max_y + 1);
            if self.step >= cells {
                return None;
            }
            let cell = orientation.line_cell(self.step, self.max_x, self.max_y);
            self.step += 1;
            return Some(cell);
        }

        while self.leg < 4 {
            let leg_len = if self.leg % 2 == 0 {
                self.max_y
            } else {
                self.max_x
            };
            if self.step < leg_len {
                let cell = orientation.border_cell(self.leg, self.step, self.max_x, self.max_y);
                self.step += 1;
                return Some(cell);
            }
            self.leg += 1;
            self.step = 0;
        }
        None
    }
}

#[derive(Debug)]
enum PeelState {
    RingStart,
    Walking(Ring),
    Finished,
}

/// Lazy outside-in drain of a grid.
///
/// Each call to `next` pops at most one item. A ring visits every border
/// cell once and takes only the first item of a non-empty cell, so a cell
/// holding several items is revisited on later rings. When a ring leaves the
/// whole border empty the grid is compacted before the next ring starts.
/// Once the grid is empty it is reset and the iterator ends for good.
#[derive(Debug)]
pub struct BoundaryPeel<'g, T> {
    grid: &'g mut SpatialGrid<T>,
    orientation: Orientation,
    state: PeelState,
    rings: usize,
    compactions: usize,
    emitted: usize,
}

impl<'g, T> BoundaryPeel<'g, T> {
    pub fn new(grid: &'g mut SpatialGrid<T>, orientation: Orientation) -> Self {
        Self {
            grid,
            orientation,
            state: PeelState::RingStart,
            rings: 0,
            compactions: 0,
            emitted: 0,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Rings walked so far, including the one in progress once it completes.
    pub fn rings_completed(&self) -> usize {
        self.rings
    }

    /// Rings after which the grid border was trimmed.
    pub fn compactions(&self) -> usize {
        self.compactions
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn finish_ring(&mut self, ring: Ring) -> Result<(), GridError> {
        self.rings += 1;

        let border_empty = self.grid.column_is_empty(0)
            && self.grid.column_is_empty(ring.max_x)
            && self.grid.row_is_empty(0)
            && self.grid.row_is_empty(ring.max_y);

        let trimmed = if border_empty { self.grid.compact() } else { 0 };
        if trimmed > 0 {
            self.compactions += 1;
        }

        check_progress(&*self.grid, ring.extracted, trimmed)
    }
}

/// A ring that neither popped nor trimmed anything while items remain
/// would repeat forever.
fn check_progress<T>(grid: &SpatialGrid<T>, extracted: usize, trimmed: usize) -> Result<(), GridError> {
    if extracted == 0 && trimmed == 0 && !grid.is_empty() {
        return Err(GridError::RingStalled {
            remaining: grid.len(),
            width: grid.width(),
            height: grid.height(),
        });
    }
    Ok(())
}

impl<T> Iterator for BoundaryPeel<'_, T> {
    type Item = Result<T, GridError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                PeelState::Finished => return None,
                PeelState::RingStart => {
                    if self.grid.is_empty() {
                        self.grid.reset();
                        self.state = PeelState::Finished;
                        return None;
                    }
                    self.state =
                        PeelState::Walking(Ring::new(self.grid.width(), self.grid.height()));
                }
                PeelState::Walking(ring) => {
                    while let Some(cell) = ring.advance(self.orientation) {
                        if self.grid.cell_is_empty(cell) {
                            continue;
                        }
                        ring.extracted += 1;
                        let popped = self.grid.pop_from(cell.column, cell.row, CellSlot::First);
                        if popped.is_ok() {
                            self.emitted += 1;
                        } else {
                            self.state = PeelState::Finished;
                        }
                        return Some(popped);
                    }

                    let ring = *ring;
                    if let Err(err) = self.finish_ring(ring) {
                        self.state = PeelState::Finished;
                        return Some(Err(err));
                    }
                    self.state = PeelState::RingStart;
                }
            }
        }
    }
}

impl<T> FusedIterator for BoundaryPeel<'_, T> {}

impl<T> SpatialGrid<T> {
    /// Drain this grid outside-in. See [`BoundaryPeel`].
    pub fn peel(&mut self, orientation: Orientation) -> BoundaryPeel<'_, T> {
        BoundaryPeel::new(self, orientation)
    }
}
