//! Device registry: immutable arena keyed by `(category, index)`.
//!
//! Built once before any runtime thread starts; afterwards it is only
//! read, so it is shared as `Arc<DeviceRegistry>` without locking.
//! Devices are addressed by their arena slot, never by reference into a
//! growable container.

use heapless::Vec as FixedVec;
use log::debug;

use super::{Device, DeviceCategory, DeviceKey, MASK_BITS};
use crate::error::RegistryError;

/// Lookup table for one category: index → arena slot, plus the arena
/// slots in registration order.
struct CategoryTable {
    by_index: [Option<usize>; MASK_BITS],
    members: FixedVec<usize, MASK_BITS>,
}

impl CategoryTable {
    const fn new() -> Self {
        Self {
            by_index: [None; MASK_BITS],
            members: FixedVec::new(),
        }
    }
}

pub struct DeviceRegistry {
    devices: Vec<Device>,
    tables: [CategoryTable; DeviceCategory::ALL.len()],
}

impl DeviceRegistry {
    /// Take ownership of the inventory and index it.
    ///
    /// Identity is already fixed on each [`Device`]; this only checks it.
    /// A `(category, index)` collision or an index that does not fit the
    /// 64-bit mask is a fatal configuration error.
    pub fn register<I>(devices: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Device>,
    {
        let mut registry = Self {
            devices: Vec::new(),
            tables: [const { CategoryTable::new() }; DeviceCategory::ALL.len()],
        };

        for device in devices {
            let DeviceKey { category, index } = device.key();
            if index >= MASK_BITS as u32 {
                return Err(RegistryError::IndexOutOfRange { category, index });
            }

            let table = &mut registry.tables[category.slot()];
            let entry = &mut table.by_index[index as usize];
            if entry.is_some() {
                return Err(RegistryError::DuplicateDevice { category, index });
            }

            let slot = registry.devices.len();
            // Distinct indices below MASK_BITS cannot overflow the table.
            if table.members.push(slot).is_err() {
                return Err(RegistryError::IndexOutOfRange { category, index });
            }
            *entry = Some(slot);

            debug!(
                "registry: {} -> '{}'{}",
                device.key(),
                device.name(),
                if device.is_passive() { " (passive)" } else { "" }
            );
            registry.devices.push(device);
        }

        Ok(registry)
    }

    pub fn lookup(&self, category: DeviceCategory, index: u32) -> Option<&Device> {
        let slot = *self.tables[category.slot()]
            .by_index
            .get(usize::try_from(index).ok()?)?;
        slot.map(|s| &self.devices[s])
    }

    /// Devices of one category, in registration order.
    pub fn all_in(&self, category: DeviceCategory) -> impl Iterator<Item = &Device> + '_ {
        self.tables[category.slot()]
            .members
            .iter()
            .map(move |&s| &self.devices[s])
    }

    /// Every device, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> + '_ {
        self.devices.iter()
    }

    pub fn count_in(&self, category: DeviceCategory) -> usize {
        self.tables[category.slot()].members.len()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl core::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.devices.iter()).finish()
    }
}
