use serde::{Deserialize, Serialize};

/// Capacity accounting for one bookable slot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotInventory {
    pub capacity: i32,
    pub booked: i32,
}

/// Why a reservation does not fit into a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityShortfall {
    pub requested: i32,
    pub remaining: i32,
}

impl SlotInventory {
    pub fn new(capacity: i32, booked: i32) -> Self {
        Self { capacity, booked }
    }

    /// Places still free; never negative even for inconsistent rows
    pub fn remaining(&self) -> i32 {
        (self.capacity - self.booked).max(0)
    }

    /// Checks whether `quantity` more places fit, returning the inventory after the reservation.
    pub fn reserve(&self, quantity: i32) -> Result<SlotInventory, CapacityShortfall> {
        let remaining = self.remaining();
        if quantity > remaining {
            return Err(CapacityShortfall {
                requested: quantity,
                remaining,
            });
        }
        Ok(SlotInventory {
            capacity: self.capacity,
            booked: self.booked + quantity,
        })
    }
}
