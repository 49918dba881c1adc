use std::num::NonZero;

use crate::metrics::{ARRANGE, LOADS, UNITS_INSERTED, UNITS_REMOVED, UNITS_UNPLACED};
use crate::{
    Change, Error, GridShape, InventoryGridBuilder, Listeners, Result, Slot, SlotIndex, Snapshot,
    SubscriptionId, TypeKey,
};

/// A fixed number of slots, arranged as pages of rows by columns, each holding a stack of up to
/// [`max_per_slot()`][1] units of a single item type.
///
/// Slots are addressed by a flat position in `0..capacity()`. Use [`shape()`][2] to convert
/// between positions and page/row/column coordinates.
///
/// # Insertion
///
/// [`insert_stack()`][3] distributes units over the grid, topping up partially filled slots of
/// the same type before opening empty ones. If the grid runs out of candidate slots while free
/// capacity still exists in fragmented form, it is compacted once via the same algorithm as
/// [`arrange()`][4] and insertion continues. Units that still do not fit are reported back to the
/// caller.
///
/// # Change notifications
///
/// Listeners registered via [`subscribe()`][5] are called inline once at the end of every
/// mutating call that changed the grid, with a [`Change`] describing what happened.
///
/// # Example
///
/// ```
/// use inventory_grid::{InventoryGrid, TypeKey};
/// use new_zealand::nz;
///
/// let mut grid = InventoryGrid::builder()
///     .pages(nz!(1))
///     .rows(nz!(2))
///     .cols(nz!(2))
///     .max_per_slot(nz!(10))
///     .build();
///
/// let wood = TypeKey::new(7);
///
/// let unplaced = grid.insert_stack(wood, 25);
/// assert_eq!(unplaced, 0);
/// assert_eq!(grid.total_of(wood), 25);
///
/// grid.remove_units(wood, 12).unwrap();
/// grid.arrange();
///
/// let counts: Vec<u32> = grid.slots().iter().map(|slot| slot.count).collect();
/// assert_eq!(counts, vec![10, 3, 0, 0]);
/// ```
///
/// [1]: Self::max_per_slot
/// [2]: Self::shape
/// [3]: Self::insert_stack
/// [4]: Self::arrange
/// [5]: Self::subscribe
#[derive(Debug)]
pub struct InventoryGrid {
    shape: GridShape,
    max_per_slot: NonZero<u32>,

    /// The source of truth, one record per position.
    slots: Vec<Slot>,

    /// Derived from `slots`, kept in sync by every mutation.
    index: SlotIndex,

    listeners: Listeners,
}

impl InventoryGrid {
    pub(crate) fn new_inner(shape: GridShape, max_per_slot: NonZero<u32>) -> Self {
        let slots = vec![Slot::EMPTY; shape.capacity()];
        let index = SlotIndex::rebuild(&slots, max_per_slot.get());

        Self {
            shape,
            max_per_slot,
            slots,
            index,
            listeners: Listeners::default(),
        }
    }

    /// Creates an empty grid with the default configuration of 3 pages of 8 x 8 slots, each
    /// holding up to 64 units.
    ///
    /// # Example
    ///
    /// ```
    /// use inventory_grid::InventoryGrid;
    ///
    /// let grid = InventoryGrid::new();
    ///
    /// assert_eq!(grid.capacity(), 192);
    /// assert_eq!(grid.free_slot_count(), 192);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`InventoryGrid`].
    ///
    /// Use this when you want to customize the grid configuration beyond the defaults.
    pub fn builder() -> InventoryGridBuilder {
        InventoryGridBuilder::new()
    }

    /// The dimensions of the grid.
    #[must_use]
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shape.capacity()
    }

    /// Number of slots on one page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.shape.page_size()
    }

    /// Maximum number of units a single slot can hold.
    #[must_use]
    pub fn max_per_slot(&self) -> NonZero<u32> {
        self.max_per_slot
    }

    /// All slots in position order.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// The slot at `position`, or `None` if the position is out of range.
    #[must_use]
    pub fn slot(&self, position: usize) -> Option<&Slot> {
        self.slots.get(position)
    }

    /// The slots of one page, in position order, or `None` if the page does not exist.
    ///
    /// # Example
    ///
    /// ```
    /// use inventory_grid::{InventoryGrid, TypeKey};
    /// use new_zealand::nz;
    ///
    /// let mut grid = InventoryGrid::builder()
    ///     .pages(nz!(2))
    ///     .rows(nz!(1))
    ///     .cols(nz!(2))
    ///     .build();
    ///
    /// grid.set_slot(3, TypeKey::new(1), 5).unwrap();
    ///
    /// let second_page = grid.page(1).unwrap();
    /// assert_eq!(second_page.len(), 2);
    /// assert_eq!(second_page[1].count, 5);
    ///
    /// assert!(grid.page(2).is_none());
    /// ```
    #[must_use]
    pub fn page(&self, page: usize) -> Option<&[Slot]> {
        self.shape
            .page_range(page)
            .and_then(|range| self.slots.get(range))
    }

    /// Iterates over the slots of every page, one slice per page.
    pub fn pages(&self) -> impl Iterator<Item = &[Slot]> {
        self.slots.chunks_exact(self.shape.page_size())
    }

    /// Total number of units of `type_key` held in the grid.
    #[must_use]
    pub fn total_of(&self, type_key: TypeKey) -> u64 {
        self.index
            .occupancy(type_key)
            .map_or(0, |occupancy| occupancy.total)
    }

    /// Iterates over every type held in the grid together with its total number of units, in
    /// ascending type key order.
    pub fn types(&self) -> impl Iterator<Item = (TypeKey, u64)> {
        self.index
            .occupancies()
            .map(|(type_key, occupancy)| (type_key, occupancy.total))
    }

    /// Number of empty slots.
    #[must_use]
    pub fn free_slot_count(&self) -> usize {
        self.index.free_count()
    }

    /// Number of slots holding at least one unit.
    #[must_use]
    pub fn occupied_slot_count(&self) -> usize {
        self.capacity()
            .checked_sub(self.free_slot_count())
            .expect("free slots are a subset of all slots")
    }

    /// How many more units of `type_key` fit without compaction: the headroom of partially
    /// filled slots of that type plus the capacity of every empty slot.
    #[must_use]
    pub fn free_space_for(&self, type_key: TypeKey) -> u64 {
        let headroom = self.headroom(self.index.partial_positions(type_key));

        headroom
            .checked_add(self.empty_slot_space())
            .expect("free space cannot exceed capacity * max_per_slot, which fits in u64")
    }

    /// Headroom of every partially filled slot plus the capacity of every empty slot.
    ///
    /// Together with the totals of all types this always adds up to
    /// `capacity() * max_per_slot()`.
    #[must_use]
    pub fn total_free_space(&self) -> u64 {
        let headroom = self.headroom(self.index.all_partial_positions());

        headroom
            .checked_add(self.empty_slot_space())
            .expect("free space cannot exceed capacity * max_per_slot, which fits in u64")
    }

    fn headroom(&self, positions: impl Iterator<Item = usize>) -> u64 {
        positions
            .filter_map(|position| self.slots.get(position))
            .map(|slot| u64::from(self.max_per_slot.get().saturating_sub(slot.count)))
            .sum()
    }

    fn empty_slot_space(&self) -> u64 {
        to_units(self.free_slot_count())
            .checked_mul(u64::from(self.max_per_slot.get()))
            .expect("free space cannot exceed capacity * max_per_slot, which fits in u64")
    }

    /// Verifies that every lookup structure agrees with the slot contents.
    ///
    /// This is a full scan intended for tests and diagnostics. An error here indicates a defect
    /// in this crate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvariantViolation`] describing the first inconsistency found.
    pub fn check_invariants(&self) -> Result<()> {
        if self.slots.len() != self.capacity() {
            return Err(Error::invariant_violation(format!(
                "slot store holds {} records for a capacity of {}",
                self.slots.len(),
                self.capacity()
            )));
        }

        self.index.verify(&self.slots, self.max_per_slot.get())
    }

    /// Registers a listener that is called after every mutation of the grid.
    ///
    /// Listeners are called inline, in the order they were registered, before the mutating call
    /// returns.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::{Arc, Mutex};
    ///
    /// use inventory_grid::{Change, InventoryGrid};
    ///
    /// let mut grid = InventoryGrid::new();
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    ///
    /// let subscription = grid.subscribe({
    ///     let seen = Arc::clone(&seen);
    ///     move |change| seen.lock().unwrap().push(*change)
    /// });
    ///
    /// grid.arrange();
    /// assert_eq!(*seen.lock().unwrap(), vec![Change::Arranged]);
    ///
    /// assert!(grid.unsubscribe(subscription));
    /// ```
    pub fn subscribe(&mut self, listener: impl FnMut(&Change) + Send + 'static) -> SubscriptionId {
        self.listeners.subscribe(Box::new(listener))
    }

    /// Removes a listener registered via [`subscribe()`][Self::subscribe].
    ///
    /// Returns `false` if the listener was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn notify(&mut self, change: Change) {
        self.listeners.notify(&change);
    }

    /// Places `amount` units of `type_key` into the grid and returns how many did not fit.
    ///
    /// Partially filled slots of the same type are topped up first, then empty slots are opened,
    /// lowest position first. If no slot can take more units, the grid is compacted once and
    /// insertion continues. A non-zero return value means the grid is full; the units that were
    /// placed stay placed.
    ///
    /// Inserting zero units does nothing.
    ///
    /// # Example
    ///
    /// ```
    /// use inventory_grid::{InventoryGrid, TypeKey};
    /// use new_zealand::nz;
    ///
    /// let mut grid = InventoryGrid::builder()
    ///     .pages(nz!(1))
    ///     .rows(nz!(1))
    ///     .cols(nz!(2))
    ///     .max_per_slot(nz!(10))
    ///     .build();
    ///
    /// assert_eq!(grid.insert_stack(TypeKey::new(1), 25), 5);
    /// assert_eq!(grid.total_of(TypeKey::new(1)), 20);
    /// ```
    #[must_use = "units that did not fit are reported via the return value"]
    pub fn insert_stack(&mut self, type_key: TypeKey, amount: u64) -> u64 {
        if amount == 0 {
            return 0;
        }

        let max_per_slot = self.max_per_slot.get();
        let mut remaining = amount;
        let mut compacted = false;

        while remaining > 0 {
            let Some(position) = self.index.candidate_for(type_key) else {
                if compacted {
                    break;
                }

                tracing::debug!(
                    %type_key,
                    remaining,
                    "no slot can take more units, compacting before retrying"
                );

                self.arrange_inner();
                compacted = true;
                continue;
            };

            let slot = self
                .slots
                .get_mut(position)
                .expect("indices only ever hold positions within capacity");

            let current = slot.count;
            let headroom = max_per_slot.saturating_sub(current);
            debug_assert!(headroom > 0, "candidate slot {position} has no headroom");

            let added = u32::try_from(remaining).map_or(headroom, |remaining| remaining.min(headroom));

            // Cannot overflow, added is at most the headroom of the slot.
            let new_count = current.wrapping_add(added);
            *slot = Slot::occupied(type_key, new_count);

            if current == 0 {
                self.index.attach(position, type_key, new_count, max_per_slot);
            } else {
                self.index
                    .grow(position, type_key, added, new_count, max_per_slot);
            }

            // Cannot underflow, added is at most remaining.
            remaining = remaining.wrapping_sub(u64::from(added));
        }

        // Cannot underflow, remaining only ever decreases from amount.
        let placed = amount.wrapping_sub(remaining);

        UNITS_INSERTED.with(|e| e.observe(placed));

        if remaining > 0 {
            UNITS_UNPLACED.with(|e| e.observe(remaining));
        }

        if placed > 0 || compacted {
            self.notify(Change::Inserted {
                type_key,
                placed,
                unplaced: remaining,
                compacted,
            });
        }

        remaining
    }

    /// Compacts the grid so that every type occupies the fewest possible slots.
    ///
    /// Types are laid out in ascending type key order starting from position zero, each as a run
    /// of full slots followed by at most one partially filled slot holding the remainder. All
    /// following slots become empty. The total number of units of each type does not change.
    ///
    /// Calling this on an already compacted grid produces the same layout again.
    pub fn arrange(&mut self) {
        self.arrange_inner();
        self.notify(Change::Arranged);
    }

    fn arrange_inner(&mut self) {
        let max_per_slot = self.max_per_slot.get();
        let mut slots = vec![Slot::EMPTY; self.capacity()];
        let mut next_position = 0_usize;

        for (type_key, occupancy) in self.index.occupancies() {
            let mut remaining = occupancy.total;

            while remaining > 0 {
                let count = u32::try_from(remaining).map_or(max_per_slot, |remaining| {
                    remaining.min(max_per_slot)
                });

                *slots.get_mut(next_position).expect(
                    "a compacted layout never needs more slots than the grid already occupies",
                ) = Slot::occupied(type_key, count);

                // Cannot overflow, bounded by capacity.
                next_position = next_position.wrapping_add(1);

                // Cannot underflow, count is at most remaining.
                remaining = remaining.wrapping_sub(u64::from(count));
            }
        }

        self.slots = slots;
        self.index = SlotIndex::rebuild(&self.slots, max_per_slot);

        ARRANGE.with(|e| e.observe_once());
        tracing::debug!(occupied = next_position, capacity = self.capacity(), "grid compacted");
    }

    /// Empties the slot at `position`, whatever it holds.
    ///
    /// Clearing an empty slot succeeds without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if `position` is out of range.
    pub fn clear_slot(&mut self, position: usize) -> Result<()> {
        self.ensure_position(position)?;

        if self.vacate(position)? {
            self.notify(Change::SlotCleared { position });
        }

        Ok(())
    }

    /// Takes exactly `amount` units of `type_key` out of the grid.
    ///
    /// Slots holding the type are consumed in position order: slots that hold no more than what
    /// is still to be removed are emptied, and the first slot holding more is reduced.
    ///
    /// Either all units are removed or, if an error is returned, none are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if the grid holds no units of `type_key`, and
    /// [`Error::InvalidAmount`] if `amount` is zero or exceeds the units held.
    pub fn remove_units(&mut self, type_key: TypeKey, amount: u64) -> Result<()> {
        let occupancy = self
            .index
            .occupancy(type_key)
            .ok_or(Error::UnknownType { type_key })?;

        if amount == 0 {
            return Err(Error::InvalidAmount {
                amount,
                problem: "removing zero units is not meaningful",
            });
        }

        if amount > occupancy.total {
            return Err(Error::InvalidAmount {
                amount,
                problem: "cannot remove more units than the grid holds of the type",
            });
        }

        let positions: Vec<usize> = occupancy.positions.iter().copied().collect();
        let mut remaining = amount;

        for position in positions {
            let count = self.slots.get(position).map_or(0, |slot| slot.count);

            if remaining >= u64::from(count) {
                self.vacate(position)?;

                // Cannot underflow, just checked.
                remaining = remaining.wrapping_sub(u64::from(count));
            } else {
                // remaining < count, so it fits in u32 and the difference is positive.
                let kept = count.wrapping_sub(
                    u32::try_from(remaining).expect("remaining is less than a u32 slot count"),
                );

                self.vacate(position)?;
                self.occupy(position, type_key, kept);
                remaining = 0;
            }

            if remaining == 0 {
                break;
            }
        }

        UNITS_REMOVED.with(|e| e.observe(amount));
        self.notify(Change::UnitsRemoved { type_key, amount });

        Ok(())
    }

    /// Overwrites the slot at `position` to hold exactly `count` units of `type_key`.
    ///
    /// Whatever the slot held before is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if `position` is out of range and
    /// [`Error::InvalidAmount`] unless `0 < count <= max_per_slot()`.
    pub fn set_slot(&mut self, position: usize, type_key: TypeKey, count: u32) -> Result<()> {
        self.ensure_position(position)?;

        if count == 0 || count > self.max_per_slot.get() {
            return Err(Error::InvalidAmount {
                amount: u64::from(count),
                problem: "a slot must hold between one unit and the per-slot maximum",
            });
        }

        self.vacate(position)?;
        self.occupy(position, type_key, count);

        self.notify(Change::SlotSet { position });

        Ok(())
    }

    /// Empties every slot. The shape and per-slot maximum are kept.
    pub fn clear(&mut self) {
        self.slots.fill(Slot::EMPTY);
        self.index = SlotIndex::rebuild(&self.slots, self.max_per_slot.get());

        self.notify(Change::Cleared);
    }

    /// Replaces the entire state of the grid, including its shape, with that of `snapshot`.
    ///
    /// If the snapshot does not specify a per-slot maximum, the current one is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DamagedData`] if the snapshot is inconsistent: a zero dimension, a slot
    /// list whose length does not match the dimensions, or a malformed slot. The grid is left
    /// unchanged in that case.
    pub fn load(&mut self, snapshot: &Snapshot) -> Result<()> {
        let validated = snapshot.validate(self.max_per_slot)?;

        self.shape = validated.shape;
        self.max_per_slot = validated.max_per_slot;
        self.slots = validated.slots.to_vec();
        self.index = SlotIndex::rebuild(&self.slots, self.max_per_slot.get());

        LOADS.with(|e| e.observe_once());
        tracing::debug!(
            pages = self.shape.pages().get(),
            rows = self.shape.rows().get(),
            cols = self.shape.cols().get(),
            occupied = self.occupied_slot_count(),
            "inventory loaded"
        );

        self.notify(Change::Loaded);

        Ok(())
    }

    /// Captures the entire state of the grid.
    #[must_use]
    pub fn save(&self) -> Snapshot {
        Snapshot {
            pages: self.shape.pages().get(),
            rows: self.shape.rows().get(),
            cols: self.shape.cols().get(),
            max_per_slot: Some(self.max_per_slot),
            slots: self.slots.clone(),
        }
    }

    fn ensure_position(&self, position: usize) -> Result<()> {
        if position < self.capacity() {
            Ok(())
        } else {
            Err(Error::InvalidIndex {
                position,
                capacity: self.capacity(),
            })
        }
    }

    /// Empties an in-range slot, unwinding its bookkeeping. Returns whether it held anything.
    fn vacate(&mut self, position: usize) -> Result<bool> {
        let max_per_slot = self.max_per_slot.get();

        let slot = self
            .slots
            .get_mut(position)
            .expect("caller verified that the position is in range");

        let Some(type_key) = slot.type_key else {
            return Ok(false);
        };

        self.index.detach(position, type_key, slot.count, max_per_slot)?;
        *slot = Slot::EMPTY;

        Ok(true)
    }

    /// Fills an in-range, empty slot.
    fn occupy(&mut self, position: usize, type_key: TypeKey, count: u32) {
        let max_per_slot = self.max_per_slot.get();

        let slot = self
            .slots
            .get_mut(position)
            .expect("caller verified that the position is in range");

        debug_assert!(slot.is_empty(), "slot {position} must be vacated first");

        *slot = Slot::occupied(type_key, count);
        self.index.attach(position, type_key, count, max_per_slot);
    }
}

impl Default for InventoryGrid {
    fn default() -> Self {
        Self::new()
    }
}

fn to_units(slot_count: usize) -> u64 {
    u64::try_from(slot_count).expect("slot counts fit in u64 on every supported platform")
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::{Arc, Mutex};

    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(InventoryGrid: Send, std::fmt::Debug);

    const A: TypeKey = TypeKey::new(1);
    const B: TypeKey = TypeKey::new(2);
    const C: TypeKey = TypeKey::new(3);

    /// One page of 2 x 2 slots holding up to 10 units each.
    fn small_grid() -> InventoryGrid {
        InventoryGrid::builder()
            .pages(nz!(1))
            .rows(nz!(2))
            .cols(nz!(2))
            .max_per_slot(nz!(10))
            .build()
    }

    fn counts(grid: &InventoryGrid) -> Vec<u32> {
        grid.slots().iter().map(|slot| slot.count).collect()
    }

    fn record_changes(grid: &mut InventoryGrid) -> Arc<Mutex<Vec<Change>>> {
        let changes = Arc::new(Mutex::new(Vec::new()));

        grid.subscribe({
            let changes = Arc::clone(&changes);
            move |change| changes.lock().unwrap().push(*change)
        });

        changes
    }

    fn assert_accounting(grid: &InventoryGrid) {
        let held: u64 = grid.types().map(|(_, total)| total).sum();
        let capacity_units = u64::try_from(grid.capacity()).unwrap()
            * u64::from(grid.max_per_slot().get());

        assert_eq!(held + grid.total_free_space(), capacity_units);
        grid.check_invariants().unwrap();
    }

    #[test]
    fn new_grid_is_empty() {
        let grid = small_grid();

        assert_eq!(grid.capacity(), 4);
        assert_eq!(grid.free_slot_count(), 4);
        assert_eq!(grid.occupied_slot_count(), 0);
        assert_eq!(grid.types().count(), 0);
        assert!(grid.slots().iter().all(Slot::is_empty));
        assert_accounting(&grid);
    }

    #[test]
    fn insert_fills_slots_in_order() {
        let mut grid = small_grid();

        assert_eq!(grid.insert_stack(A, 25), 0);

        assert_eq!(counts(&grid), vec![10, 10, 5, 0]);
        assert_eq!(grid.total_of(A), 25);
        assert_accounting(&grid);
    }

    #[test]
    fn insert_exact_multiple_fills_last_slot() {
        let mut grid = small_grid();

        assert_eq!(grid.insert_stack(A, 20), 0);

        assert_eq!(counts(&grid), vec![10, 10, 0, 0]);
        assert_eq!(grid.free_space_for(A), 20);
    }

    #[test]
    fn insert_tops_up_partial_slot_first() {
        let mut grid = small_grid();
        grid.set_slot(3, A, 4).unwrap();

        assert_eq!(grid.insert_stack(A, 8), 0);

        // Six go into the partial slot at position 3, the remaining two open position 0.
        assert_eq!(counts(&grid), vec![2, 0, 0, 10]);
        assert_accounting(&grid);
    }

    #[test]
    fn insert_beyond_capacity_reports_residual() {
        let mut grid = small_grid();

        assert_eq!(grid.insert_stack(A, 45), 5);

        assert_eq!(counts(&grid), vec![10, 10, 10, 10]);
        assert_eq!(grid.total_of(A), 40);
        assert_eq!(grid.insert_stack(B, 3), 3);
        assert_accounting(&grid);
    }

    #[test]
    fn insert_zero_is_noop() {
        let mut grid = small_grid();
        let changes = record_changes(&mut grid);

        assert_eq!(grid.insert_stack(A, 0), 0);

        assert_eq!(grid.free_slot_count(), 4);
        assert!(changes.lock().unwrap().is_empty());
    }

    #[test]
    fn insert_compacts_fragmented_grid() {
        let mut grid = small_grid();
        grid.set_slot(0, A, 3).unwrap();
        grid.set_slot(1, B, 4).unwrap();
        grid.set_slot(2, A, 3).unwrap();
        grid.set_slot(3, B, 4).unwrap();

        let changes = record_changes(&mut grid);

        // No free slot exists, but compaction merges both types into one slot each.
        assert_eq!(grid.insert_stack(C, 15), 0);

        assert_eq!(grid.total_of(A), 6);
        assert_eq!(grid.total_of(B), 8);
        assert_eq!(grid.total_of(C), 15);
        assert_eq!(counts(&grid), vec![6, 8, 10, 5]);
        assert_accounting(&grid);

        assert_eq!(
            *changes.lock().unwrap(),
            vec![Change::Inserted {
                type_key: C,
                placed: 15,
                unplaced: 0,
                compacted: true,
            }]
        );
    }

    #[test]
    fn insert_compacts_at_most_once() {
        let mut grid = small_grid();
        grid.set_slot(0, A, 3).unwrap();
        grid.set_slot(1, A, 3).unwrap();
        grid.set_slot(2, B, 10).unwrap();
        grid.set_slot(3, B, 10).unwrap();

        // Compaction frees one slot, which takes ten of the twelve units.
        assert_eq!(grid.insert_stack(C, 12), 2);

        assert_eq!(counts(&grid), vec![6, 10, 10, 10]);
        assert_accounting(&grid);
    }

    #[test]
    fn arrange_packs_types_in_key_order() {
        let mut grid = small_grid();
        grid.set_slot(0, B, 2).unwrap();
        grid.set_slot(1, A, 7).unwrap();
        grid.set_slot(3, A, 7).unwrap();

        grid.arrange();

        assert_eq!(
            grid.slots(),
            &[
                Slot::occupied(A, 10),
                Slot::occupied(A, 4),
                Slot::occupied(B, 2),
                Slot::EMPTY
            ]
        );
        assert_accounting(&grid);
    }

    #[test]
    fn arrange_is_idempotent() {
        let mut grid = small_grid();
        grid.set_slot(3, A, 7).unwrap();
        grid.set_slot(1, B, 9).unwrap();
        grid.set_slot(0, A, 5).unwrap();

        grid.arrange();
        let once = grid.save();

        grid.arrange();
        assert_eq!(grid.save(), once);
        assert_eq!(grid.total_of(A), 12);
        assert_eq!(grid.total_of(B), 9);
    }

    #[test]
    fn arrange_always_notifies() {
        let mut grid = small_grid();
        let changes = record_changes(&mut grid);

        grid.arrange();

        assert_eq!(*changes.lock().unwrap(), vec![Change::Arranged]);
    }

    #[test]
    fn clear_slot_unwinds_bookkeeping() {
        let mut grid = small_grid();
        assert_eq!(grid.insert_stack(A, 15), 0);

        grid.clear_slot(1).unwrap();

        assert_eq!(grid.total_of(A), 10);
        assert_eq!(counts(&grid), vec![10, 0, 0, 0]);
        assert_eq!(grid.free_slot_count(), 3);
        assert_accounting(&grid);

        grid.clear_slot(0).unwrap();

        assert_eq!(grid.total_of(A), 0);
        assert_eq!(grid.types().count(), 0);
        assert_accounting(&grid);
    }

    #[test]
    fn clear_empty_slot_is_silent_success() {
        let mut grid = small_grid();
        let changes = record_changes(&mut grid);

        grid.clear_slot(2).unwrap();

        assert!(changes.lock().unwrap().is_empty());
    }

    #[test]
    fn clear_slot_out_of_range_is_error() {
        let mut grid = small_grid();

        assert_eq!(
            grid.clear_slot(4),
            Err(Error::InvalidIndex {
                position: 4,
                capacity: 4
            })
        );
    }

    #[test]
    fn remove_units_consumes_in_position_order() {
        let mut grid = small_grid();
        assert_eq!(grid.insert_stack(A, 25), 0);

        grid.remove_units(A, 12).unwrap();

        assert_eq!(counts(&grid), vec![0, 8, 5, 0]);
        assert_eq!(grid.total_of(A), 13);
        assert_accounting(&grid);
    }

    #[test]
    fn remove_all_units_frees_every_position() {
        let mut grid = small_grid();
        assert_eq!(grid.insert_stack(A, 25), 0);
        grid.set_slot(3, B, 1).unwrap();

        grid.remove_units(A, 25).unwrap();

        assert_eq!(grid.total_of(A), 0);
        assert!(grid.types().all(|(type_key, _)| type_key != A));
        assert_eq!(grid.free_slot_count(), 3);
        assert_eq!(grid.free_space_for(A), 30);
        assert_accounting(&grid);
    }

    #[test]
    fn remove_units_validates_before_mutating() {
        let mut grid = small_grid();
        assert_eq!(grid.insert_stack(A, 25), 0);
        let before = grid.save();

        assert_eq!(grid.remove_units(B, 1), Err(Error::UnknownType { type_key: B }));
        assert!(matches!(
            grid.remove_units(A, 0),
            Err(Error::InvalidAmount { amount: 0, .. })
        ));
        assert!(matches!(
            grid.remove_units(A, 26),
            Err(Error::InvalidAmount { amount: 26, .. })
        ));

        assert_eq!(grid.save(), before);
    }

    #[test]
    fn remove_units_notifies_once() {
        let mut grid = small_grid();
        assert_eq!(grid.insert_stack(A, 25), 0);
        let changes = record_changes(&mut grid);

        grid.remove_units(A, 22).unwrap();

        assert_eq!(
            *changes.lock().unwrap(),
            vec![Change::UnitsRemoved {
                type_key: A,
                amount: 22
            }]
        );
    }

    #[test]
    fn set_slot_replaces_previous_type() {
        let mut grid = small_grid();
        assert_eq!(grid.insert_stack(A, 15), 0);
        assert_accounting(&grid);

        grid.set_slot(0, B, 3).unwrap();

        assert_eq!(grid.total_of(A), 5);
        assert_eq!(grid.total_of(B), 3);
        assert_eq!(grid.slot(0), Some(&Slot::occupied(B, 3)));
        assert_accounting(&grid);
    }

    #[test]
    fn set_slot_same_type_adjusts_total() {
        let mut grid = small_grid();
        grid.set_slot(2, A, 4).unwrap();

        grid.set_slot(2, A, 10).unwrap();

        assert_eq!(grid.total_of(A), 10);
        assert_eq!(grid.free_space_for(A), 30);
        assert_accounting(&grid);
    }

    #[test]
    fn set_slot_rejects_bad_input() {
        let mut grid = small_grid();

        assert!(matches!(
            grid.set_slot(9, A, 1),
            Err(Error::InvalidIndex { position: 9, .. })
        ));
        assert!(matches!(
            grid.set_slot(0, A, 0),
            Err(Error::InvalidAmount { amount: 0, .. })
        ));
        assert!(matches!(
            grid.set_slot(0, A, 11),
            Err(Error::InvalidAmount { amount: 11, .. })
        ));

        assert_eq!(grid.free_slot_count(), 4);
    }

    #[test]
    fn set_slot_accepts_exact_maximum() {
        let mut grid = small_grid();

        grid.set_slot(0, A, 10).unwrap();

        assert_eq!(grid.free_space_for(A), 30);
        assert_accounting(&grid);
    }

    #[test]
    fn free_space_counts_partial_headroom_of_type_only() {
        let mut grid = small_grid();
        grid.set_slot(0, A, 4).unwrap();
        grid.set_slot(1, B, 7).unwrap();

        assert_eq!(grid.free_space_for(A), 6 + 20);
        assert_eq!(grid.free_space_for(B), 3 + 20);
        assert_eq!(grid.free_space_for(C), 20);
        assert_eq!(grid.total_free_space(), 6 + 3 + 20);
    }

    #[test]
    fn pages_split_slots() {
        let mut grid = InventoryGrid::builder()
            .pages(nz!(3))
            .rows(nz!(1))
            .cols(nz!(2))
            .max_per_slot(nz!(5))
            .build();

        assert_eq!(grid.insert_stack(A, 12), 0);

        let pages: Vec<Vec<u32>> = grid
            .pages()
            .map(|page| page.iter().map(|slot| slot.count).collect())
            .collect();

        assert_eq!(pages, vec![vec![5, 5], vec![2, 0], vec![0, 0]]);
        assert_eq!(grid.page(1).map(<[Slot]>::len), Some(2));
        assert!(grid.page(3).is_none());
    }

    #[test]
    fn clear_empties_everything() {
        let mut grid = small_grid();
        assert_eq!(grid.insert_stack(A, 17), 0);
        assert_eq!(grid.insert_stack(B, 3), 0);
        let changes = record_changes(&mut grid);

        grid.clear();

        assert_eq!(grid.free_slot_count(), 4);
        assert_eq!(grid.types().count(), 0);
        assert_accounting(&grid);
        assert_eq!(*changes.lock().unwrap(), vec![Change::Cleared]);
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut grid = small_grid();
        assert_eq!(grid.insert_stack(A, 13), 0);
        grid.set_slot(3, B, 2).unwrap();

        let snapshot = grid.save();
        assert_eq!(snapshot.pages, 1);
        assert_eq!(snapshot.rows, 2);
        assert_eq!(snapshot.cols, 2);
        assert_eq!(snapshot.max_per_slot, Some(nz!(10)));

        let mut restored = InventoryGrid::new();
        restored.load(&snapshot).unwrap();

        assert_eq!(restored.shape(), grid.shape());
        assert_eq!(restored.max_per_slot(), grid.max_per_slot());
        assert_eq!(restored.slots(), grid.slots());
        assert_eq!(restored.total_of(A), 13);
        assert_eq!(restored.free_space_for(A), grid.free_space_for(A));
        assert_accounting(&restored);
    }

    #[test]
    fn load_replaces_shape() {
        let mut grid = InventoryGrid::new();
        let changes = record_changes(&mut grid);

        let snapshot = Snapshot {
            pages: 2,
            rows: 1,
            cols: 3,
            max_per_slot: None,
            slots: vec![
                Slot::occupied(A, 64),
                Slot::occupied(A, 1),
                Slot::EMPTY,
                Slot::EMPTY,
                Slot::occupied(B, 30),
                Slot::EMPTY,
            ],
        };

        grid.load(&snapshot).unwrap();

        assert_eq!(grid.capacity(), 6);
        assert_eq!(grid.page_size(), 3);
        assert_eq!(grid.max_per_slot().get(), 64);
        assert_eq!(grid.total_of(A), 65);
        assert_eq!(grid.total_of(B), 30);
        assert_accounting(&grid);
        assert_eq!(*changes.lock().unwrap(), vec![Change::Loaded]);
    }

    #[test]
    fn damaged_snapshot_leaves_grid_untouched() {
        let mut grid = small_grid();
        assert_eq!(grid.insert_stack(A, 13), 0);
        let before = grid.save();
        let changes = record_changes(&mut grid);

        let snapshot = Snapshot {
            pages: 1,
            rows: 3,
            cols: 3,
            max_per_slot: None,
            slots: vec![Slot::EMPTY; 8],
        };

        assert!(matches!(
            grid.load(&snapshot),
            Err(Error::DamagedData { .. })
        ));

        assert_eq!(grid.save(), before);
        assert!(changes.lock().unwrap().is_empty());
        assert_accounting(&grid);
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let mut grid = small_grid();
        let hits = Arc::new(Mutex::new(0_u32));

        let id = grid.subscribe({
            let hits = Arc::clone(&hits);
            move |_| *hits.lock().unwrap() += 1
        });

        assert_eq!(grid.insert_stack(A, 1), 0);
        assert!(grid.unsubscribe(id));
        assert_eq!(grid.insert_stack(A, 1), 0);

        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn notification_sees_finished_mutation() {
        let mut grid = small_grid();
        let changes = record_changes(&mut grid);

        assert_eq!(grid.insert_stack(A, 25), 0);
        grid.clear_slot(0).unwrap();
        grid.set_slot(0, B, 1).unwrap();

        assert_eq!(
            *changes.lock().unwrap(),
            vec![
                Change::Inserted {
                    type_key: A,
                    placed: 25,
                    unplaced: 0,
                    compacted: false,
                },
                Change::SlotCleared { position: 0 },
                Change::SlotSet { position: 0 },
            ]
        );
    }

    #[test]
    fn large_amounts_do_not_truncate() {
        let mut grid = InventoryGrid::builder()
            .pages(nz!(1))
            .rows(nz!(1))
            .cols(nz!(3))
            .max_per_slot(nz!(u32::MAX))
            .build();

        let amount = u64::from(u32::MAX) * 2 + 5;
        assert_eq!(grid.insert_stack(A, amount), 0);

        assert_eq!(grid.total_of(A), amount);
        assert_eq!(counts(&grid), vec![u32::MAX, u32::MAX, 5]);
        assert_accounting(&grid);
    }
}
