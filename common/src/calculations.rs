//! Slot and time arithmetic across the Byron/Shelley era boundary

const BYRON_SLOTS_PER_EPOCH: u64 = 21_600;
const BYRON_SLOT_LENGTH: u64 = 20;
pub const SHELLEY_SLOTS_PER_EPOCH: u64 = 432_000;

pub fn slot_to_epoch_with_shelley_params(
    slot: u64,
    shelley_epoch: u64,
    shelley_epoch_len: u64,
) -> u64 {
    let shelley_start_slot = shelley_epoch * BYRON_SLOTS_PER_EPOCH;
    if slot < shelley_start_slot {
        slot / BYRON_SLOTS_PER_EPOCH
    } else {
        shelley_epoch + (slot - shelley_start_slot) / shelley_epoch_len
    }
}

/// POSIX time at the start of a slot
pub fn slot_to_timestamp_with_params(slot: u64, byron_timestamp: u64, shelley_epoch: u64) -> u64 {
    let shelley_start_slot = shelley_epoch * BYRON_SLOTS_PER_EPOCH;
    if slot < shelley_start_slot {
        byron_timestamp + slot * BYRON_SLOT_LENGTH
    } else {
        byron_timestamp + shelley_start_slot * BYRON_SLOT_LENGTH + (slot - shelley_start_slot)
    }
}

/// Slot containing a POSIX time. Times before genesis map to slot 0.
pub fn timestamp_to_slot_with_params(
    timestamp: u64,
    byron_timestamp: u64,
    shelley_epoch: u64,
) -> u64 {
    let shelley_start_slot = shelley_epoch * BYRON_SLOTS_PER_EPOCH;
    let shelley_start_time = byron_timestamp + shelley_start_slot * BYRON_SLOT_LENGTH;
    if timestamp >= shelley_start_time {
        shelley_start_slot + (timestamp - shelley_start_time)
    } else {
        timestamp.saturating_sub(byron_timestamp) / BYRON_SLOT_LENGTH
    }
}
