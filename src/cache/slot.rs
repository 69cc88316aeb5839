use std::sync::Arc;

use crate::raster::Raster;

/// A page resident in a slot.
#[derive(Debug, Clone)]
struct Occupant {
    page_index: usize,
    raster: Arc<Raster>,
}

/// One cache entry; empty until first filled.
#[derive(Debug, Clone, Default)]
pub struct CacheSlot {
    occupant: Option<Occupant>,
    last_used: u64,
}

impl CacheSlot {
    pub fn page_index(&self) -> Option<usize> {
        self.occupant.as_ref().map(|o| o.page_index)
    }

    pub fn last_used(&self) -> u64 {
        self.last_used
    }

    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Fixed-size slot array with least-recently-used replacement.
#[derive(Debug)]
pub(crate) struct SlotTable {
    slots: Vec<CacheSlot>,
    access_counter: u64,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![CacheSlot::default(); capacity.max(1)],
            access_counter: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Advance the access counter and return the new stamp.
    pub fn tick(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    /// Return the raster for `page_index` if resident, refreshing its stamp.
    pub fn touch(&mut self, page_index: usize, stamp: u64) -> Option<Arc<Raster>> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.page_index() == Some(page_index))?;
        slot.last_used = stamp;
        slot.occupant.as_ref().map(|o| Arc::clone(&o.raster))
    }

    /// Slot to fill next: the first empty one, else the least recently used,
    /// lowest index winning ties.
    pub fn victim(&self) -> usize {
        if let Some(empty) = self.slots.iter().position(CacheSlot::is_empty) {
            return empty;
        }
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(i, slot)| (slot.last_used, *i))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Store a freshly loaded page, returning the index of the page it displaced.
    pub fn insert(&mut self, page_index: usize, raster: Arc<Raster>, stamp: u64) -> Option<usize> {
        let victim = self.victim();
        let slot = &mut self.slots[victim];
        let evicted = slot.occupant.take().map(|o| o.page_index);
        slot.occupant = Some(Occupant { page_index, raster });
        slot.last_used = stamp;
        evicted
    }

    /// Drop every raster and mark all slots empty.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = CacheSlot::default();
        }
    }

    /// Resident page indices in slot order.
    pub fn pages(&self) -> Vec<usize> {
        self.slots.iter().filter_map(CacheSlot::page_index).collect()
    }

    pub fn slots(&self) -> &[CacheSlot] {
        &self.slots
    }
}
