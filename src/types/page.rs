use crate::types::{
    ColumnValue, PAGE_CAPACITY, PAGE_SIZE, SLOT_SIZE,
    error::{DatabaseError, Result},
};

/*
 * Column Page Layout (one column, fixed-width slots)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │ slot0 (8) │ slot1 (8) │ slot2 (8) │ ...            │ slot511 (8) │
 * └─────────────────────────────────────────────────────────────────┘
 * Each slot holds one little-endian i64. Slots [0, num_records) are
 * written; the rest are zero. Pages are append-only apart from `patch`.
 */

#[derive(Debug, Clone)]
pub struct Page {
    num_records: usize,
    data: Box<[u8]>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Self {
            num_records: 0,
            data: vec![0u8; PAGE_SIZE].into_boxed_slice(),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.num_records < PAGE_CAPACITY
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }

    pub fn is_empty(&self) -> bool {
        self.num_records == 0
    }

    /// Append `value` to the next free slot and return the slot index.
    pub fn write(&mut self, value: ColumnValue) -> Result<usize> {
        if !self.has_capacity() {
            return Err(DatabaseError::PageFull);
        }
        let slot = self.num_records;
        self.encode(slot, value);
        self.num_records += 1;
        Ok(slot)
    }

    pub fn read(&self, slot: usize) -> ColumnValue {
        debug_assert!(
            slot < self.num_records,
            "read of unwritten slot {slot} (written: {})",
            self.num_records
        );
        let start = slot * SLOT_SIZE;
        let mut bytes = [0u8; SLOT_SIZE];
        bytes.copy_from_slice(&self.data[start..start + SLOT_SIZE]);
        ColumnValue::from_le_bytes(bytes)
    }

    /// Overwrite an already-written slot in place.
    pub fn patch(&mut self, slot: usize, value: ColumnValue) -> Result<()> {
        if slot >= self.num_records {
            return Err(DatabaseError::InvalidSlotIndex {
                index: slot,
                max: self.num_records,
            });
        }
        self.encode(slot, value);
        Ok(())
    }

    fn encode(&mut self, slot: usize, value: ColumnValue) {
        let start = slot * SLOT_SIZE;
        self.data[start..start + SLOT_SIZE].copy_from_slice(&value.to_le_bytes());
    }
}
