use std::fmt;

use crate::TypeKey;

/// Describes a mutation that was applied to an [`InventoryGrid`][crate::InventoryGrid].
///
/// Delivered to every subscribed listener once per mutating call, after the call has finished
/// updating the grid. Calls that turn out not to change anything (e.g. clearing an already empty
/// slot) do not produce a notification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Change {
    /// Units were placed by [`insert_stack()`][crate::InventoryGrid::insert_stack].
    Inserted {
        /// The type that was inserted.
        type_key: TypeKey,

        /// How many units were placed.
        placed: u64,

        /// How many units did not fit.
        unplaced: u64,

        /// Whether the grid was compacted to make room.
        compacted: bool,
    },

    /// The grid was compacted by [`arrange()`][crate::InventoryGrid::arrange].
    Arranged,

    /// A slot was emptied by [`clear_slot()`][crate::InventoryGrid::clear_slot].
    SlotCleared {
        /// The position that was emptied.
        position: usize,
    },

    /// Units were taken out by [`remove_units()`][crate::InventoryGrid::remove_units].
    UnitsRemoved {
        /// The type that was removed.
        type_key: TypeKey,

        /// How many units were removed.
        amount: u64,
    },

    /// A slot was overwritten by [`set_slot()`][crate::InventoryGrid::set_slot].
    SlotSet {
        /// The position that was overwritten.
        position: usize,
    },

    /// The whole grid was replaced by [`load()`][crate::InventoryGrid::load].
    Loaded,

    /// Every slot was emptied by [`clear()`][crate::InventoryGrid::clear].
    Cleared,
}

/// Identifies a listener registered via [`InventoryGrid::subscribe()`][1].
///
/// [1]: crate::InventoryGrid::subscribe
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Change) + Send>;

/// Ordered set of change listeners, invoked inline.
#[derive(Default)]
pub(crate) struct Listeners {
    entries: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Listeners {
    pub(crate) fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);

        self.next_id = self
            .next_id
            .checked_add(1)
            .expect("subscription IDs cannot be exhausted by any realistic number of subscriptions");

        self.entries.push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&mut self, change: &Change) {
        for (_, listener) in &mut self.entries {
            listener(change);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Listeners {
    #[cfg_attr(test, mutants::skip)] // Debug output is not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
