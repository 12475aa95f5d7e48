//! 64-bit per-category state mask.
//!
//! Bit *i* is set when the device with index *i* in the category is
//! asserted: powered on for actuators, triggered for sensors.

use core::fmt;

/// Number of device slots a mask can carry.
pub const MASK_BITS: usize = 64;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StateMask(u64);

impl StateMask {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Indices outside the mask read as clear.
    pub const fn is_set(self, index: u32) -> bool {
        index < MASK_BITS as u32 && self.0 & (1 << index) != 0
    }

    /// Set bit `index`.  Returns `false` (mask unchanged) if the index
    /// does not fit.
    pub fn set(&mut self, index: u32) -> bool {
        if index >= MASK_BITS as u32 {
            return false;
        }
        self.0 |= 1 << index;
        true
    }

    pub fn clear(&mut self, index: u32) {
        if index < MASK_BITS as u32 {
            self.0 &= !(1 << index);
        }
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Indices of all set bits, ascending.
    pub fn iter(self) -> impl Iterator<Item = u32> {
        (0..MASK_BITS as u32).filter(move |&i| self.is_set(i))
    }
}

impl From<u64> for StateMask {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl FromIterator<u32> for StateMask {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut mask = Self::EMPTY;
        for i in iter {
            mask.set(i);
        }
        mask
    }
}

impl fmt::Debug for StateMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateMask({:#018x})", self.0)
    }
}

impl fmt::Binary for StateMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}
