use std::collections::{BTreeMap, BTreeSet};

use crate::{Error, Result, Slot, TypeKey};

/// Aggregate bookkeeping for one type held in the grid.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Occupancy {
    /// Sum of the slot counts over `positions`.
    pub(crate) total: u64,

    /// Every position holding this type.
    pub(crate) positions: BTreeSet<usize>,
}

/// Derived lookup structures over the slot store.
///
/// The slot store is the source of truth. These indices are views keyed by plain positions,
/// updated incrementally by every mutation and rebuilt from a full scan by compaction and loading.
///
/// Every position is in exactly one of: `free`, or the `positions` of exactly one occupancy entry.
/// Partial-fill sets only ever hold positions whose count is below the per-slot maximum, and no
/// empty partial-fill set is kept around.
#[derive(Clone, Debug, Default)]
pub(crate) struct SlotIndex {
    free: BTreeSet<usize>,
    occupancy: BTreeMap<TypeKey, Occupancy>,
    partial: BTreeMap<TypeKey, BTreeSet<usize>>,
}

impl SlotIndex {
    /// Builds the indices from a full scan of `slots`.
    pub(crate) fn rebuild(slots: &[Slot], max_per_slot: u32) -> Self {
        let mut index = Self::default();

        for (position, slot) in slots.iter().enumerate() {
            match slot.type_key {
                None => {
                    index.free.insert(position);
                }
                Some(type_key) => index.attach(position, type_key, slot.count, max_per_slot),
            }
        }

        index
    }

    /// Records that `position`, previously free, now holds `count` units of `type_key`.
    pub(crate) fn attach(
        &mut self,
        position: usize,
        type_key: TypeKey,
        count: u32,
        max_per_slot: u32,
    ) {
        let entry = self.occupancy.entry(type_key).or_default();
        entry.total = entry
            .total
            .checked_add(u64::from(count))
            .expect("total units cannot exceed capacity * max_per_slot, which fits in u64");
        entry.positions.insert(position);

        if count < max_per_slot {
            self.partial.entry(type_key).or_default().insert(position);
        }

        self.free.remove(&position);
    }

    /// Records that `added` more units of `type_key` went into `position`, which already held
    /// some of them and now holds `new_count`.
    pub(crate) fn grow(
        &mut self,
        position: usize,
        type_key: TypeKey,
        added: u32,
        new_count: u32,
        max_per_slot: u32,
    ) {
        let entry = self
            .occupancy
            .get_mut(&type_key)
            .expect("a slot can only be topped up if its type is already tracked");
        entry.total = entry
            .total
            .checked_add(u64::from(added))
            .expect("total units cannot exceed capacity * max_per_slot, which fits in u64");

        if new_count >= max_per_slot {
            self.remove_partial(position, type_key);
        }
    }

    fn remove_partial(&mut self, position: usize, type_key: TypeKey) {
        if let Some(positions) = self.partial.get_mut(&type_key) {
            positions.remove(&position);

            if positions.is_empty() {
                self.partial.remove(&type_key);
            }
        }
    }

    /// Records that `position`, which held `count` units of `type_key`, is now free.
    ///
    /// Returns [`Error::InvariantViolation`] if the indices do not agree that `position` held
    /// those units. In that case the indices are left untouched.
    pub(crate) fn detach(
        &mut self,
        position: usize,
        type_key: TypeKey,
        count: u32,
        max_per_slot: u32,
    ) -> Result<()> {
        let Some(entry) = self.occupancy.get(&type_key) else {
            return Err(violation(format!(
                "slot {position} holds type {type_key} but the type has no occupancy entry"
            )));
        };

        if !entry.positions.contains(&position) {
            return Err(violation(format!(
                "slot {position} holds type {type_key} but is not among the positions of that type"
            )));
        }

        let Some(remaining) = entry.total.checked_sub(u64::from(count)) else {
            return Err(violation(format!(
                "type {type_key} totals {} units but slot {position} alone holds {count}",
                entry.total
            )));
        };

        let partially_filled = count < max_per_slot;
        let tracked_as_partial = self
            .partial
            .get(&type_key)
            .is_some_and(|positions| positions.contains(&position));

        if partially_filled != tracked_as_partial {
            return Err(violation(format!(
                "slot {position} holding {count} units disagrees with the partial-fill index of type {type_key}"
            )));
        }

        // All checks passed, from here on we only mutate.
        if remaining == 0 {
            self.occupancy.remove(&type_key);
        } else if let Some(entry) = self.occupancy.get_mut(&type_key) {
            entry.positions.remove(&position);
            entry.total = remaining;
        }

        if partially_filled {
            self.remove_partial(position, type_key);
        }

        self.free.insert(position);

        Ok(())
    }

    /// The position the next units of `type_key` should go to: any partially filled slot of that
    /// type, otherwise the lowest free position.
    pub(crate) fn candidate_for(&self, type_key: TypeKey) -> Option<usize> {
        self.partial
            .get(&type_key)
            .and_then(|positions| positions.first().copied())
            .or_else(|| self.free.first().copied())
    }

    pub(crate) fn occupancy(&self, type_key: TypeKey) -> Option<&Occupancy> {
        self.occupancy.get(&type_key)
    }

    /// All occupancy entries in ascending type key order.
    pub(crate) fn occupancies(&self) -> impl Iterator<Item = (TypeKey, &Occupancy)> {
        self.occupancy.iter().map(|(key, entry)| (*key, entry))
    }

    pub(crate) fn partial_positions(&self, type_key: TypeKey) -> impl Iterator<Item = usize> + '_ {
        self.partial
            .get(&type_key)
            .into_iter()
            .flat_map(|positions| positions.iter().copied())
    }

    pub(crate) fn all_partial_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.partial.values().flat_map(|positions| positions.iter().copied())
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Verifies every index against a full scan of `slots`.
    pub(crate) fn verify(&self, slots: &[Slot], max_per_slot: u32) -> Result<()> {
        if let Some((position, slot)) = slots
            .iter()
            .enumerate()
            .find(|(_, slot)| !slot.is_well_formed(max_per_slot))
        {
            return Err(violation(format!(
                "slot {position} holds a malformed record {slot:?}"
            )));
        }

        let expected = Self::rebuild(slots, max_per_slot);

        if self.free != expected.free {
            return Err(violation("free index does not match the empty slots"));
        }

        if self.occupancy != expected.occupancy {
            return Err(violation("occupancy index does not match the slot contents"));
        }

        if self.partial != expected.partial {
            return Err(violation(
                "partial-fill index does not match the partially filled slots",
            ));
        }

        Ok(())
    }
}

fn violation(problem: impl Into<String>) -> Error {
    let error = Error::invariant_violation(problem);
    tracing::error!(%error, "inventory bookkeeping check failed");
    error
}
