use std::num::NonZero;

/// The dimensions of an [`InventoryGrid`][crate::InventoryGrid]: a number of pages, each laid out
/// as rows by columns of slots.
///
/// Slots are addressed by a flat position in `0..capacity()`, numbered page-major and then
/// row-major within a page.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct GridShape {
    pages: NonZero<usize>,
    rows: NonZero<usize>,
    cols: NonZero<usize>,
}

/// Identifies one slot by page, row and column.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SlotCoordinates {
    /// Index of the page holding the slot.
    pub page: usize,

    /// Row within the page.
    pub row: usize,

    /// Column within the row.
    pub col: usize,
}

impl GridShape {
    /// Creates a shape with the given dimensions.
    ///
    /// # Panics
    ///
    /// Panics if the total number of slots does not fit in `usize`.
    #[must_use]
    pub fn new(pages: NonZero<usize>, rows: NonZero<usize>, cols: NonZero<usize>) -> Self {
        Self::checked(pages, rows, cols).expect("grid capacity overflows usize")
    }

    /// Creates a shape, returning `None` if the total number of slots does not fit in `usize`.
    #[must_use]
    pub(crate) fn checked(
        pages: NonZero<usize>,
        rows: NonZero<usize>,
        cols: NonZero<usize>,
    ) -> Option<Self> {
        rows.get()
            .checked_mul(cols.get())?
            .checked_mul(pages.get())?;

        Some(Self { pages, rows, cols })
    }

    /// Number of pages.
    #[must_use]
    pub fn pages(&self) -> NonZero<usize> {
        self.pages
    }

    /// Number of rows on each page.
    #[must_use]
    pub fn rows(&self) -> NonZero<usize> {
        self.rows
    }

    /// Number of columns in each row.
    #[must_use]
    pub fn cols(&self) -> NonZero<usize> {
        self.cols
    }

    /// Number of slots on one page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        // Cannot overflow, verified when the shape was created.
        self.rows.get().wrapping_mul(self.cols.get())
    }

    /// Total number of slots across all pages.
    #[must_use]
    pub fn capacity(&self) -> usize {
        // Cannot overflow, verified when the shape was created.
        self.page_size().wrapping_mul(self.pages.get())
    }

    /// The flat position of the slot at `coordinates`, or `None` if any coordinate is out of
    /// range.
    #[must_use]
    pub fn position_of(&self, coordinates: SlotCoordinates) -> Option<usize> {
        if coordinates.page >= self.pages.get()
            || coordinates.row >= self.rows.get()
            || coordinates.col >= self.cols.get()
        {
            return None;
        }

        // All three terms are bounded by capacity, which fits in usize.
        Some(
            coordinates
                .page
                .wrapping_mul(self.page_size())
                .wrapping_add(coordinates.row.wrapping_mul(self.cols.get()))
                .wrapping_add(coordinates.col),
        )
    }

    /// The coordinates of the slot at `position`, or `None` if the position is out of range.
    #[must_use]
    pub fn coordinates_of(&self, position: usize) -> Option<SlotCoordinates> {
        if position >= self.capacity() {
            return None;
        }

        let page_size = NonZero::new(self.page_size())?;

        let page = position / page_size;
        let within_page = position % page_size;

        Some(SlotCoordinates {
            page,
            row: within_page / self.cols,
            col: within_page % self.cols,
        })
    }

    /// The range of flat positions that make up page `page`, or `None` if the page does not exist.
    #[must_use]
    pub(crate) fn page_range(&self, page: usize) -> Option<std::ops::Range<usize>> {
        if page >= self.pages.get() {
            return None;
        }

        // Both bounds are at most capacity.
        let start = page.wrapping_mul(self.page_size());
        Some(start..start.wrapping_add(self.page_size()))
    }
}
