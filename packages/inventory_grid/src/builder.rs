use std::num::NonZero;

use new_zealand::nz;

use crate::{GridShape, InventoryGrid};

const DEFAULT_PAGES: NonZero<usize> = nz!(3);
const DEFAULT_ROWS: NonZero<usize> = nz!(8);
const DEFAULT_COLS: NonZero<usize> = nz!(8);
const DEFAULT_MAX_PER_SLOT: NonZero<u32> = nz!(64);

/// Builder for creating an instance of [`InventoryGrid`].
///
/// You only need to use this builder if you want to customize the grid configuration.
/// The default configuration used by [`InventoryGrid::new()`][1] is 3 pages of 8 x 8 slots,
/// each slot holding up to 64 units.
///
/// # Examples
///
/// ```
/// use inventory_grid::InventoryGrid;
/// use new_zealand::nz;
///
/// let grid = InventoryGrid::builder()
///     .pages(nz!(2))
///     .rows(nz!(4))
///     .cols(nz!(5))
///     .max_per_slot(nz!(99))
///     .build();
///
/// assert_eq!(grid.capacity(), 40);
/// assert_eq!(grid.max_per_slot().get(), 99);
/// ```
///
/// [1]: InventoryGrid::new
#[derive(Debug)]
#[must_use]
pub struct InventoryGridBuilder {
    pages: NonZero<usize>,
    rows: NonZero<usize>,
    cols: NonZero<usize>,
    max_per_slot: NonZero<u32>,
}

impl InventoryGridBuilder {
    pub(crate) fn new() -> Self {
        Self {
            pages: DEFAULT_PAGES,
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            max_per_slot: DEFAULT_MAX_PER_SLOT,
        }
    }

    /// Sets the number of pages.
    pub fn pages(mut self, pages: NonZero<usize>) -> Self {
        self.pages = pages;
        self
    }

    /// Sets the number of rows on each page.
    pub fn rows(mut self, rows: NonZero<usize>) -> Self {
        self.rows = rows;
        self
    }

    /// Sets the number of columns in each row.
    pub fn cols(mut self, cols: NonZero<usize>) -> Self {
        self.cols = cols;
        self
    }

    /// Sets the maximum number of units a single slot can hold.
    pub fn max_per_slot(mut self, max_per_slot: NonZero<u32>) -> Self {
        self.max_per_slot = max_per_slot;
        self
    }

    /// Builds an empty grid with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the total number of slots does not fit in `usize`.
    #[must_use]
    pub fn build(self) -> InventoryGrid {
        InventoryGrid::new_inner(
            GridShape::new(self.pages, self.rows, self.cols),
            self.max_per_slot,
        )
    }
}
