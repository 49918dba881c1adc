use std::num::NonZero;

use crate::{Error, GridShape, Result, Slot};

/// The complete state of an [`InventoryGrid`][crate::InventoryGrid] as plain data.
///
/// Produced by [`InventoryGrid::save()`][1] and consumed by [`InventoryGrid::load()`][2]. The grid
/// does not perform any I/O itself; persisting the snapshot is up to the caller. With the `serde`
/// feature enabled, the snapshot can be serialized with any `serde` data format.
///
/// `slots` lists every slot in position order: page by page, each page row by row.
///
/// [1]: crate::InventoryGrid::save
/// [2]: crate::InventoryGrid::load
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Number of pages.
    pub pages: usize,

    /// Number of rows on each page.
    pub rows: usize,

    /// Number of columns in each row.
    pub cols: usize,

    /// Maximum number of units per slot.
    ///
    /// Snapshots without this value keep the maximum of the grid they are loaded into.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_per_slot: Option<NonZero<u32>>,

    /// Contents of every slot, in position order.
    pub slots: Vec<Slot>,
}

/// A snapshot that passed validation and can replace the state of a grid as a whole.
#[derive(Debug)]
pub(crate) struct ValidatedSnapshot<'a> {
    pub(crate) shape: GridShape,
    pub(crate) max_per_slot: NonZero<u32>,
    pub(crate) slots: &'a [Slot],
}

impl Snapshot {
    /// Checks that the snapshot describes a consistent grid, using `fallback_max_per_slot` when
    /// the snapshot does not carry its own maximum.
    pub(crate) fn validate(
        &self,
        fallback_max_per_slot: NonZero<u32>,
    ) -> Result<ValidatedSnapshot<'_>> {
        let (Some(pages), Some(rows), Some(cols)) = (
            NonZero::new(self.pages),
            NonZero::new(self.rows),
            NonZero::new(self.cols),
        ) else {
            return Err(Error::damaged(format!(
                "grid dimensions must be non-zero but are {} pages of {} x {}",
                self.pages, self.rows, self.cols
            )));
        };

        let shape = GridShape::checked(pages, rows, cols).ok_or_else(|| {
            Error::damaged(format!(
                "{} pages of {} x {} slots exceed the addressable capacity",
                self.pages, self.rows, self.cols
            ))
        })?;

        if self.slots.len() != shape.capacity() {
            return Err(Error::damaged(format!(
                "expected {} slots for {} pages of {} x {} but found {}",
                shape.capacity(),
                self.pages,
                self.rows,
                self.cols,
                self.slots.len()
            )));
        }

        let max_per_slot = self.max_per_slot.unwrap_or(fallback_max_per_slot);

        if let Some((position, slot)) = self
            .slots
            .iter()
            .enumerate()
            .find(|(_, slot)| !slot.is_well_formed(max_per_slot.get()))
        {
            return Err(Error::damaged(format!(
                "slot {position} holds {} units of {:?}, allowed is an empty slot or 1..={} units",
                slot.count, slot.type_key, max_per_slot
            )));
        }

        Ok(ValidatedSnapshot {
            shape,
            max_per_slot,
            slots: &self.slots,
        })
    }
}
