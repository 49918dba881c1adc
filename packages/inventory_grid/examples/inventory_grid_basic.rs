//! Demonstrates filling, draining and compacting an inventory while a listener tracks which
//! pages need to be redrawn.

use std::sync::{Arc, Mutex};

use inventory_grid::{Change, InventoryGrid, TypeKey};
use new_zealand::nz;

const STONE: TypeKey = TypeKey::new(1);
const ARROWS: TypeKey = TypeKey::new(2);
const HERBS: TypeKey = TypeKey::new(3);

fn main() {
    let mut grid = InventoryGrid::builder()
        .pages(nz!(2))
        .rows(nz!(2))
        .cols(nz!(3))
        .max_per_slot(nz!(20))
        .build();

    let changes = Arc::new(Mutex::new(Vec::new()));
    grid.subscribe({
        let changes = Arc::clone(&changes);
        move |change: &Change| changes.lock().unwrap().push(*change)
    });

    println!("Capacity: {} slots", grid.capacity());

    for (type_key, amount) in [(STONE, 75), (ARROWS, 33), (HERBS, 9)] {
        let unplaced = grid.insert_stack(type_key, amount);
        println!("Inserted {amount} of {type_key}, {unplaced} did not fit");
    }

    grid.remove_units(STONE, 41).unwrap();
    grid.clear_slot(4).unwrap();
    print_pages(&grid);

    grid.arrange();
    println!("After arrange:");
    print_pages(&grid);

    for change in changes.lock().unwrap().iter() {
        println!("Change: {change:?}");
    }

    let snapshot = grid.save();
    println!("Snapshot holds {} slots", snapshot.slots.len());
}

fn print_pages(grid: &InventoryGrid) {
    for (index, page) in grid.pages().enumerate() {
        let cells: Vec<String> = page
            .iter()
            .map(|slot| match slot.type_key {
                Some(type_key) => format!("{type_key}x{}", slot.count),
                None => "-".to_string(),
            })
            .collect();

        println!("Page {index}: {}", cells.join(" "));
    }
}
