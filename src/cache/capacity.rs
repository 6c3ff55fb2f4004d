//! Capacity Accounting Module
//!
//! Coarse admission control: every entry costs one slot, whatever its payload.

use crate::error::{CacheError, Result};

// == Slots ==
/// Used-versus-budgeted entry slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slots {
    used: usize,
    budget: usize,
}

impl Slots {
    // == Constructor ==
    pub fn new(budget: usize) -> Self {
        Self { used: 0, budget }
    }

    // == Reserve ==
    /// Takes one slot, failing without any change when none is left.
    pub fn reserve(&mut self) -> Result<()> {
        if self.used >= self.budget {
            return Err(CacheError::CapacityExceeded {
                capacity: self.budget,
            });
        }
        self.used += 1;
        Ok(())
    }

    /// Takes `n` slots at once, used when a cache is seeded with entries.
    pub fn reserve_many(&mut self, n: usize) -> Result<()> {
        match self.used.checked_add(n) {
            Some(total) if total <= self.budget => {
                self.used = total;
                Ok(())
            }
            _ => Err(CacheError::CapacityExceeded {
                capacity: self.budget,
            }),
        }
    }

    // == Release ==
    /// Gives back the slot of a physically removed entry.
    pub fn release(&mut self) {
        self.used = self.used.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn budget(&self) -> usize {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_until_full() {
        let mut slots = Slots::new(2);
        assert!(slots.reserve().is_ok());
        assert!(slots.reserve().is_ok());
        assert!(matches!(
            slots.reserve(),
            Err(CacheError::CapacityExceeded { capacity: 2 })
        ));
        assert_eq!(slots.used(), 2);
    }

    #[test]
    fn test_release_frees_one_slot() {
        let mut slots = Slots::new(1);
        slots.reserve().unwrap();
        slots.release();
        assert_eq!(slots.used(), 0);
        assert!(slots.reserve().is_ok());
    }

    #[test]
    fn test_release_never_underflows() {
        let mut slots = Slots::new(1);
        slots.release();
        slots.release();
        assert_eq!(slots.used(), 0);
    }

    #[test]
    fn test_reserve_many() {
        let mut slots = Slots::new(3);
        assert!(slots.reserve_many(4).is_err());
        assert_eq!(slots.used(), 0);
        assert!(slots.reserve_many(3).is_ok());
        slots.reset();
        assert_eq!(slots.used(), 0);
        assert_eq!(slots.budget(), 3);
    }
}
