use std::fmt;

/// Identifies one kind of stackable item.
///
/// The grid treats the key as opaque: it only compares keys for equality and orders them when
/// compacting. Mapping display-facing item identifiers to keys is up to the caller.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TypeKey(u32);

impl TypeKey {
    /// Creates a key from its numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// The numeric value of the key.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for TypeKey {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The contents of one position in an [`InventoryGrid`][crate::InventoryGrid].
///
/// A slot is either empty (no type key, zero count) or holds between one unit and the grid's
/// per-slot maximum of a single type.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    /// The type held in the slot, `None` if the slot is empty.
    pub type_key: Option<TypeKey>,

    /// Number of units held in the slot, zero if the slot is empty.
    pub count: u32,
}

impl Slot {
    /// A slot holding nothing.
    pub const EMPTY: Self = Self {
        type_key: None,
        count: 0,
    };

    /// Creates a slot holding `count` units of `type_key`.
    #[must_use]
    pub const fn occupied(type_key: TypeKey, count: u32) -> Self {
        Self {
            type_key: Some(type_key),
            count,
        }
    }

    /// Whether the slot holds nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.type_key.is_none()
    }

    /// Whether the record obeys the slot rule: empty with zero count, or occupied with a count
    /// between one and `max_per_slot`.
    pub(crate) fn is_well_formed(&self, max_per_slot: u32) -> bool {
        match self.type_key {
            None => self.count == 0,
            Some(_) => self.count > 0 && self.count <= max_per_slot,
        }
    }
}
