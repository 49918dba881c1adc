#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A fixed-capacity grid of stack-limited slots, as used for item inventories.
//!
//! This crate provides [`InventoryGrid`], a collection of slots arranged as pages of rows by
//! columns. Every slot holds a stack of up to a configured maximum number of units of one item
//! type, identified by a [`TypeKey`]. The grid keeps indices over its slots so that bulk
//! insertion can pack units tightly without scanning the whole grid.
//!
//! # Key Features
//!
//! - **Bin-packed insertion**: [`insert_stack()`][1] tops up partially filled slots of the same
//!   type before opening empty ones, and reports the units that did not fit
//! - **Compaction**: [`arrange()`][2] repacks every type into the fewest possible slots,
//!   reclaiming capacity lost to fragmentation
//! - **Removal by slot or by type**: [`clear_slot()`][3] and [`remove_units()`][4]
//! - **Direct overwrite**: [`set_slot()`][5]
//! - **Snapshots**: [`save()`][6] and [`load()`][7] convert the whole grid to and from a plain
//!   [`Snapshot`], serializable with `serde` when the `serde` feature is enabled
//! - **Change notifications**: listeners registered via [`subscribe()`][8] are called after every
//!   mutation, e.g. to refresh a displayed page obtained via [`page()`][9]
//!
//! The grid does no I/O and has no internal synchronization. It is meant to be owned and driven
//! by a single logical thread.
//!
//! # Example
//!
//! ```
//! use inventory_grid::{InventoryGrid, TypeKey};
//! use new_zealand::nz;
//!
//! let mut grid = InventoryGrid::builder()
//!     .pages(nz!(2))
//!     .rows(nz!(4))
//!     .cols(nz!(4))
//!     .max_per_slot(nz!(64))
//!     .build();
//!
//! let stone = TypeKey::new(1);
//! let arrows = TypeKey::new(2);
//!
//! assert_eq!(grid.insert_stack(stone, 150), 0);
//! assert_eq!(grid.insert_stack(arrows, 20), 0);
//!
//! // 150 stone take three slots, the arrows the fourth.
//! assert_eq!(grid.occupied_slot_count(), 4);
//!
//! grid.remove_units(stone, 100).unwrap();
//! assert_eq!(grid.total_of(stone), 50);
//!
//! let snapshot = grid.save();
//!
//! let mut restored = InventoryGrid::new();
//! restored.load(&snapshot).unwrap();
//! assert_eq!(restored.slots(), grid.slots());
//! ```
//!
//! # Observability
//!
//! The grid reports the following events via the [`nm`] metrics crate:
//!
//! * `inventory_grid_units_inserted` - units placed per insertion.
//! * `inventory_grid_units_unplaced` - units that did not fit, per insertion that ran out of room.
//! * `inventory_grid_units_removed` - units removed per [`remove_units()`][4] call.
//! * `inventory_grid_arrange` - compactions, both explicit and during insertion.
//! * `inventory_grid_loads` - snapshots loaded.
//!
//! [1]: InventoryGrid::insert_stack
//! [2]: InventoryGrid::arrange
//! [3]: InventoryGrid::clear_slot
//! [4]: InventoryGrid::remove_units
//! [5]: InventoryGrid::set_slot
//! [6]: InventoryGrid::save
//! [7]: InventoryGrid::load
//! [8]: InventoryGrid::subscribe
//! [9]: InventoryGrid::page

mod builder;
mod change;
mod coordinates;
mod error;
mod grid;
mod index;
mod metrics;
mod slot;
mod snapshot;

pub use builder::*;
pub use change::{Change, SubscriptionId};
pub(crate) use change::Listeners;
pub use coordinates::*;
pub use error::*;
pub use grid::InventoryGrid;
pub(crate) use index::*;
pub use slot::*;
pub use snapshot::Snapshot;
