use nm::{Event, Magnitude};

const UNITS_BUCKETS: &[Magnitude] = &[1, 8, 64, 256, 1024, 4096];

thread_local! {
    pub(crate) static UNITS_INSERTED: Event = Event::builder()
        .name("inventory_grid_units_inserted")
        .histogram(UNITS_BUCKETS)
        .build();

    pub(crate) static UNITS_UNPLACED: Event = Event::builder()
        .name("inventory_grid_units_unplaced")
        .histogram(UNITS_BUCKETS)
        .build();

    pub(crate) static UNITS_REMOVED: Event = Event::builder()
        .name("inventory_grid_units_removed")
        .histogram(UNITS_BUCKETS)
        .build();

    pub(crate) static ARRANGE: Event = Event::builder()
        .name("inventory_grid_arrange")
        .build();

    pub(crate) static LOADS: Event = Event::builder()
        .name("inventory_grid_loads")
        .build();
}
