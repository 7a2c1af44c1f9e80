pub mod error;
pub mod location;
pub mod page;
pub mod record;

// Common type aliases
pub type Rid = u64;
pub type ColumnValue = i64;
pub type ColumnId = usize;

// Column page geometry
pub const PAGE_SIZE: usize = 4096;
pub const SLOT_SIZE: usize = 8; // one little-endian i64 per slot
pub const PAGE_CAPACITY: usize = PAGE_SIZE / SLOT_SIZE; // 512 slots

pub const FIRST_RID: Rid = 1;
pub const DEFAULT_INDEX_ORDER: usize = 4;
pub const MIN_INDEX_ORDER: usize = 4;
