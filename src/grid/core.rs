use std::collections::VecDeque;

use thiserror::Error;

use crate::geometry::{CellIndex, Point};

/// Errors surfaced by [`SpatialGrid`] addressing and growth.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("cell pitch must be finite and non-zero (got {x} x {y})")]
    InvalidPitch { x: f64, y: f64 },
    #[error("point ({x}, {y}) is not finite")]
    NonFinitePoint { x: f64, y: f64 },
    #[error("point ({x}, {y}) does not map into the current grid")]
    PointOutOfRange { x: f64, y: f64 },
    #[error("cell ({column}, {row}) is outside the {width}x{height} grid")]
    CellOutOfRange {
        column: usize,
        row: usize,
        width: usize,
        height: usize,
    },
    #[error("slot {slot:?} is empty in cell ({column}, {row}) holding {len} item(s)")]
    SlotOutOfRange {
        column: usize,
        row: usize,
        slot: CellSlot,
        len: usize,
    },
    #[error("point ({x}, {y}) would grow the grid past {limit} cells along one axis")]
    ExtentExceeded { x: f64, y: f64, limit: usize },
    #[error("ring pass made no progress with {remaining} item(s) left in a {width}x{height} grid")]
    RingStalled {
        remaining: usize,
        width: usize,
        height: usize,
    },
}

/// Most columns, or rows, a grid may grow to.
pub const MAX_EXTENT: usize = 1 << 16;

/// Position of an item inside one cell's sequence.
///
/// `At` accepts negative offsets, counted back from the end (`At(-1)` is the
/// last item).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellSlot {
    First,
    #[default]
    Last,
    At(isize),
}

impl CellSlot {
    fn resolve(self, len: usize) -> Option<usize> {
        match self {
            CellSlot::First => (len > 0).then_some(0),
            CellSlot::Last => len.checked_sub(1),
            CellSlot::At(offset) if offset >= 0 => {
                let offset = offset as usize;
                (offset < len).then_some(offset)
            }
            CellSlot::At(offset) => len.checked_sub(offset.unsigned_abs()),
        }
    }
}

type Column<T> = VecDeque<Vec<T>>;

/// Two dimensional bucket grid that grows toward whichever side a new point
/// falls on.
///
/// Cell `(0, 0)` sits at `origin`; a coordinate maps to
/// `round((coord - origin) / pitch)` on each axis. The grid always holds at
/// least one (possibly empty) cell, and growth never relocates stored items:
/// growing toward negative indices only shifts `origin`.
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    pitch_x: f64,
    pitch_y: f64,
    origin: Option<Point>,
    width: usize,
    height: usize,
    columns: VecDeque<Column<T>>,
}

impl<T> SpatialGrid<T> {
    /// Create an ungrown grid. The sign of each pitch is ignored.
    pub fn new(pitch_x: f64, pitch_y: f64) -> Result<Self, GridError> {
        let (x, y) = (pitch_x.abs(), pitch_y.abs());
        if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
            return Err(GridError::InvalidPitch {
                x: pitch_x,
                y: pitch_y,
            });
        }
        Ok(Self {
            pitch_x: x,
            pitch_y: y,
            origin: None,
            width: 1,
            height: 1,
            columns: single_cell(),
        })
    }

    pub fn pitch(&self) -> (f64, f64) {
        (self.pitch_x, self.pitch_y)
    }

    /// Real-world coordinate of cell `(0, 0)`, unset until the first insert.
    pub fn origin(&self) -> Option<Point> {
        self.origin
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of stored items.
    pub fn len(&self) -> usize {
        self.columns.iter().flatten().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().flatten().all(Vec::is_empty)
    }

    /// Store `item` in the cell covering `position`, growing the grid one
    /// column or row at a time until that cell exists.
    pub fn insert(&mut self, position: Point, item: T) -> Result<CellIndex, GridError> {
        if !(position.x.is_finite() && position.y.is_finite()) {
            return Err(GridError::NonFinitePoint {
                x: position.x,
                y: position.y,
            });
        }

        let mut origin = self.origin.unwrap_or(position);
        let columns = grown_extent(axis_index(position.x, origin.x, self.pitch_x), self.width);
        let rows = grown_extent(axis_index(position.y, origin.y, self.pitch_y), self.height);
        if columns > MAX_EXTENT as i64 || rows > MAX_EXTENT as i64 {
            return Err(GridError::ExtentExceeded {
                x: position.x,
                y: position.y,
                limit: MAX_EXTENT,
            });
        }

        while axis_index(position.x, origin.x, self.pitch_x) >= self.width as i64 {
            self.columns.push_back(empty_column(self.height));
            self.width += 1;
        }
        while axis_index(position.x, origin.x, self.pitch_x) < 0 {
            self.columns.push_front(empty_column(self.height));
            self.width += 1;
            origin.x -= self.pitch_x;
        }
        while axis_index(position.y, origin.y, self.pitch_y) >= self.height as i64 {
            for column in self.columns.iter_mut() {
                column.push_back(Vec::new());
            }
            self.height += 1;
        }
        while axis_index(position.y, origin.y, self.pitch_y) < 0 {
            for column in self.columns.iter_mut() {
                column.push_front(Vec::new());
            }
            self.height += 1;
            origin.y -= self.pitch_y;
        }

        self.origin = Some(origin);
        let index = CellIndex::new(
            axis_index(position.x, origin.x, self.pitch_x) as usize,
            axis_index(position.y, origin.y, self.pitch_y) as usize,
        );
        self.columns[index.column][index.row].push(item);
        Ok(index)
    }

    /// Cell a coordinate maps to under the current origin and bounds.
    pub fn index_of(&self, position: Point) -> Result<CellIndex, GridError> {
        let out_of_range = GridError::PointOutOfRange {
            x: position.x,
            y: position.y,
        };
        let origin = self.origin.ok_or_else(|| out_of_range.clone())?;
        let column = axis_index(position.x, origin.x, self.pitch_x);
        let row = axis_index(position.y, origin.y, self.pitch_y);
        if (0..self.width as i64).contains(&column) && (0..self.height as i64).contains(&row) {
            Ok(CellIndex::new(column as usize, row as usize))
        } else {
            Err(out_of_range)
        }
    }

    /// Items stored in one cell, in insertion order.
    pub fn cell(&self, column: usize, row: usize) -> Result<&[T], GridError> {
        self.check_cell(column, row)?;
        Ok(&self.columns[column][row])
    }

    pub fn item(&self, column: usize, row: usize, slot: CellSlot) -> Result<&T, GridError> {
        let cell = self.cell(column, row)?;
        let index = slot.resolve(cell.len()).ok_or(GridError::SlotOutOfRange {
            column,
            row,
            slot,
            len: cell.len(),
        })?;
        Ok(&cell[index])
    }

    /// Count items over a selection: `None` on an axis selects every
    /// column (or row), so `count_items(None, None)` counts the whole grid.
    pub fn count_items(&self, column: Option<usize>, row: Option<usize>) -> Result<usize, GridError> {
        let columns = match column {
            Some(c) => {
                self.check_cell(c, row.unwrap_or(0))?;
                c..c + 1
            }
            None => 0..self.width,
        };
        let rows = match row {
            Some(r) => {
                self.check_cell(column.unwrap_or(0), r)?;
                r..r + 1
            }
            None => 0..self.height,
        };

        Ok(columns
            .flat_map(|c| rows.clone().map(move |r| (c, r)))
            .map(|(c, r)| self.columns[c][r].len())
            .sum())
    }

    /// Remove and return one item from a cell.
    pub fn pop_from(&mut self, column: usize, row: usize, slot: CellSlot) -> Result<T, GridError> {
        self.check_cell(column, row)?;
        let cell = &mut self.columns[column][row];
        let index = slot.resolve(cell.len()).ok_or(GridError::SlotOutOfRange {
            column,
            row,
            slot,
            len: cell.len(),
        })?;
        Ok(cell.remove(index))
    }

    /// Drop empty border columns and rows, never shrinking below one cell.
    /// Returns how many columns and rows were removed.
    pub fn compact(&mut self) -> usize {
        let mut removed = 0;

        while self.width > 1 && self.column_is_empty(0) {
            self.columns.pop_front();
            self.width -= 1;
            if let Some(origin) = self.origin.as_mut() {
                origin.x += self.pitch_x;
            }
            removed += 1;
        }
        while self.width > 1 && self.column_is_empty(self.width - 1) {
            self.columns.pop_back();
            self.width -= 1;
            removed += 1;
        }
        while self.height > 1 && self.row_is_empty(0) {
            for column in self.columns.iter_mut() {
                column.pop_front();
            }
            self.height -= 1;
            if let Some(origin) = self.origin.as_mut() {
                origin.y += self.pitch_y;
            }
            removed += 1;
        }
        while self.height > 1 && self.row_is_empty(self.height - 1) {
            for column in self.columns.iter_mut() {
                column.pop_back();
            }
            self.height -= 1;
            removed += 1;
        }

        removed
    }

    /// Back to the ungrown state: one empty cell and no origin.
    pub fn reset(&mut self) {
        self.origin = None;
        self.width = 1;
        self.height = 1;
        self.columns = single_cell();
    }

    pub(crate) fn column_is_empty(&self, column: usize) -> bool {
        self.columns[column].iter().all(Vec::is_empty)
    }

    pub(crate) fn row_is_empty(&self, row: usize) -> bool {
        self.columns.iter().all(|column| column[row].is_empty())
    }

    pub(crate) fn cell_is_empty(&self, index: CellIndex) -> bool {
        self.columns[index.column][index.row].is_empty()
    }

    fn check_cell(&self, column: usize, row: usize) -> Result<(), GridError> {
        if column < self.width && row < self.height {
            Ok(())
        } else {
            Err(GridError::CellOutOfRange {
                column,
                row,
                width: self.width,
                height: self.height,
            })
        }
    }
}

fn axis_index(coord: f64, origin: f64, pitch: f64) -> i64 {
    ((coord - origin) / pitch).round() as i64
}

/// Extent an axis needs to hold `index`.
fn grown_extent(index: i64, extent: usize) -> i64 {
    let extent = extent as i64;
    if index < 0 {
        extent.saturating_sub(index)
    } else {
        index.saturating_add(1).max(extent)
    }
}

fn empty_column<T>(height: usize) -> Column<T> {
    (0..height).map(|_| Vec::new()).collect()
}

fn single_cell<T>() -> VecDeque<Column<T>> {
    VecDeque::from([empty_column(1)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> SpatialGrid<&'static str> {
        SpatialGrid::new(30.0, 30.0).unwrap()
    }

    #[test]
    fn new_grid_is_one_empty_cell() {
        let grid = grid();
        assert_eq!((grid.width(), grid.height()), (1, 1));
        assert!(grid.origin().is_none());
        assert!(grid.is_empty());
        assert_eq!(grid.count_items(None, None).unwrap(), 0);
    }

    #[test]
    fn rejects_zero_pitch() {
        assert!(matches!(
            SpatialGrid::<()>::new(0.0, 30.0),
            Err(GridError::InvalidPitch { .. })
        ));
        assert!(SpatialGrid::<()>::new(-30.0, 30.0).is_ok());
    }

    #[test]
    fn far_points_are_refused_without_growing() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();

        let far = 30.0 * MAX_EXTENT as f64;
        assert!(matches!(
            grid.insert(Point::new(far, 0.0), "b"),
            Err(GridError::ExtentExceeded { limit: MAX_EXTENT, .. })
        ));
        assert!(matches!(
            grid.insert(Point::new(0.0, -1e300), "c"),
            Err(GridError::ExtentExceeded { .. })
        ));
        assert_eq!((grid.width(), grid.height()), (1, 1));
        assert_eq!(grid.len(), 1);

        let edge = 30.0 * (MAX_EXTENT - 1) as f64;
        grid.insert(Point::new(edge, 0.0), "d").unwrap();
        assert_eq!(grid.width(), MAX_EXTENT);
    }

    #[test]
    fn first_insert_seeds_origin() {
        let mut grid = grid();
        let index = grid.insert(Point::new(12.5, -4.0), "a").unwrap();
        assert_eq!(index, CellIndex::new(0, 0));
        assert_eq!(grid.origin(), Some(Point::new(12.5, -4.0)));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn grows_toward_positive_indices() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();
        let index = grid.insert(Point::new(90.0, 31.0), "b").unwrap();
        assert_eq!(index, CellIndex::new(3, 1));
        assert_eq!((grid.width(), grid.height()), (4, 2));
        assert_eq!(grid.origin(), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn negative_growth_shifts_origin_without_moving_items() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();
        let index = grid.insert(Point::new(-60.0, -30.0), "b").unwrap();

        assert_eq!(index, CellIndex::new(0, 0));
        assert_eq!(grid.origin(), Some(Point::new(-60.0, -30.0)));
        assert_eq!(grid.cell(2, 1).unwrap(), &["a"]);
        assert_eq!(grid.index_of(Point::new(0.0, 0.0)).unwrap(), CellIndex::new(2, 1));
    }

    #[test]
    fn index_rounds_half_away_from_zero() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();
        assert_eq!(grid.insert(Point::new(15.0, 0.0), "b").unwrap().column, 1);
        assert_eq!(grid.insert(Point::new(14.9, 0.0), "c").unwrap().column, 0);
    }

    #[test]
    fn index_of_outside_bounds_fails() {
        let mut grid = grid();
        assert!(grid.index_of(Point::new(0.0, 0.0)).is_err());
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();
        assert!(matches!(
            grid.index_of(Point::new(100.0, 0.0)),
            Err(GridError::PointOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_points() {
        let mut grid = grid();
        assert!(matches!(
            grid.insert(Point::new(f64::NAN, 0.0), "a"),
            Err(GridError::NonFinitePoint { .. })
        ));
        assert!(grid.is_empty());
    }

    #[test]
    fn cells_keep_insertion_order_and_pop_last_by_default() {
        let mut grid = grid();
        for label in ["a", "b", "c"] {
            grid.insert(Point::new(1.0, 1.0), label).unwrap();
        }
        assert_eq!(grid.cell(0, 0).unwrap(), &["a", "b", "c"]);
        assert_eq!(*grid.item(0, 0, CellSlot::At(-2)).unwrap(), "b");
        assert_eq!(grid.pop_from(0, 0, CellSlot::default()).unwrap(), "c");
        assert_eq!(grid.pop_from(0, 0, CellSlot::First).unwrap(), "a");
        assert_eq!(grid.pop_from(0, 0, CellSlot::At(-1)).unwrap(), "b");
        assert!(matches!(
            grid.pop_from(0, 0, CellSlot::Last),
            Err(GridError::SlotOutOfRange { len: 0, .. })
        ));
    }

    #[test]
    fn addressing_outside_bounds_fails() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();
        assert!(matches!(
            grid.pop_from(1, 0, CellSlot::Last),
            Err(GridError::CellOutOfRange { width: 1, height: 1, .. })
        ));
        assert!(grid.count_items(Some(3), None).is_err());
        assert!(grid.count_items(None, Some(1)).is_err());
        assert!(grid.cell(0, 2).is_err());
    }

    #[test]
    fn counts_columns_rows_and_cells() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();
        grid.insert(Point::new(0.0, 30.0), "b").unwrap();
        grid.insert(Point::new(30.0, 30.0), "c").unwrap();
        grid.insert(Point::new(30.0, 30.0), "d").unwrap();

        assert_eq!(grid.count_items(None, None).unwrap(), 4);
        assert_eq!(grid.count_items(Some(0), None).unwrap(), 2);
        assert_eq!(grid.count_items(None, Some(1)).unwrap(), 3);
        assert_eq!(grid.count_items(Some(1), Some(1)).unwrap(), 2);
        assert_eq!(grid.count_items(Some(1), Some(0)).unwrap(), 0);
    }

    #[test]
    fn compact_trims_empty_borders_and_advances_origin() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "corner").unwrap();
        grid.insert(Point::new(30.0, 30.0), "middle").unwrap();
        grid.insert(Point::new(60.0, 60.0), "far").unwrap();

        grid.pop_from(0, 0, CellSlot::Last).unwrap();
        grid.pop_from(2, 2, CellSlot::Last).unwrap();
        assert_eq!(grid.compact(), 4);

        assert_eq!((grid.width(), grid.height()), (1, 1));
        assert_eq!(grid.origin(), Some(Point::new(30.0, 30.0)));
        assert_eq!(grid.cell(0, 0).unwrap(), &["middle"]);
    }

    #[test]
    fn compact_never_goes_below_one_cell() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();
        grid.insert(Point::new(90.0, 90.0), "b").unwrap();
        grid.pop_from(0, 0, CellSlot::Last).unwrap();
        grid.pop_from(3, 3, CellSlot::Last).unwrap();

        grid.compact();
        assert_eq!((grid.width(), grid.height()), (1, 1));
    }

    #[test]
    fn compact_is_idempotent() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();
        grid.insert(Point::new(60.0, 30.0), "b").unwrap();
        grid.insert(Point::new(30.0, 90.0), "c").unwrap();
        grid.pop_from(0, 0, CellSlot::Last).unwrap();

        grid.compact();
        let bounds = (grid.width(), grid.height(), grid.origin());
        assert_eq!(grid.compact(), 0);
        assert_eq!((grid.width(), grid.height(), grid.origin()), bounds);
    }

    #[test]
    fn reset_returns_to_ungrown_state() {
        let mut grid = grid();
        grid.insert(Point::new(0.0, 0.0), "a").unwrap();
        grid.insert(Point::new(-90.0, 120.0), "b").unwrap();
        grid.reset();

        assert_eq!((grid.width(), grid.height()), (1, 1));
        assert!(grid.origin().is_none());
        assert!(grid.is_empty());
        assert_eq!(grid.pitch(), (30.0, 30.0));
    }

    fn coords() -> impl Strategy<Value = Vec<(f64, f64)>> {
        prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 0..64)
    }

    proptest! {
        #[test]
        fn every_insert_lands_inside_bounds(points in coords()) {
            let mut grid = SpatialGrid::new(30.0, 30.0).unwrap();
            for (i, (x, y)) in points.iter().enumerate() {
                let index = grid.insert(Point::new(*x, *y), i).unwrap();
                prop_assert!(index.column < grid.width());
                prop_assert!(index.row < grid.height());
                prop_assert_eq!(grid.index_of(Point::new(*x, *y)).unwrap(), index);
                prop_assert!(grid.cell(index.column, index.row).unwrap().contains(&i));
            }
            prop_assert_eq!(grid.len(), points.len());
        }

        #[test]
        fn compaction_keeps_every_item(points in coords(), removals in prop::collection::vec(any::<bool>(), 64)) {
            let mut grid = SpatialGrid::new(25.0, 40.0).unwrap();
            for (i, (x, y)) in points.iter().enumerate() {
                grid.insert(Point::new(*x, *y), i).unwrap();
            }
            let cells: Vec<CellIndex> = points
                .iter()
                .map(|(x, y)| grid.index_of(Point::new(*x, *y)).unwrap())
                .collect();
            let mut kept = points.len();
            for (index, remove) in cells.iter().zip(removals.iter()) {
                if *remove && !grid.cell(index.column, index.row).unwrap().is_empty() {
                    grid.pop_from(index.column, index.row, CellSlot::Last).unwrap();
                    kept -= 1;
                }
            }

            grid.compact();
            prop_assert!(grid.width() >= 1 && grid.height() >= 1);
            prop_assert_eq!(grid.len(), kept);
            if kept > 0 {
                prop_assert!(!grid.column_is_empty(0));
                prop_assert!(!grid.column_is_empty(grid.width() - 1));
                prop_assert!(!grid.row_is_empty(0));
                prop_assert!(!grid.row_is_empty(grid.height() - 1));
            }
        }
    }
}
