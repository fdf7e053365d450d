use serde::{Deserialize, Serialize};

use hemobank_core::{BloodType, DomainError, DomainResult, ValueObject};

/// Read-only view of all inventory counters at one point in time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Units on hand per blood group, indexed by `BloodType::index()`.
    pub by_type: [u64; BloodType::COUNT],
    /// Units ever donated.
    pub total_donated: u64,
    /// Units currently on hand (sum of `by_type`).
    pub total_bank: u64,
    /// Units consumed by fulfilled matches.
    pub total_spent: u64,
}

impl InventorySnapshot {
    /// Units on hand for one blood group.
    pub fn level(&self, blood_type: BloodType) -> u64 {
        self.by_type[blood_type.index()]
    }
}

impl ValueObject for InventorySnapshot {}

/// Authoritative stock counts and running aggregates of the bank.
///
/// Invariants, preserved by every operation:
/// - `total_donated == total_bank + total_spent`
/// - `total_bank` equals the sum of the 8 per-type counts
///
/// Counts are unsigned; a negative level is unrepresentable. Stock has no
/// upper bound — donations never expire in this model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    counts: [u64; BloodType::COUNT],
    total_donated: u64,
    total_spent: u64,
}

impl Inventory {
    /// Empty bank: all 8 counters present at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Units on hand for one blood group.
    pub fn available(&self, blood_type: BloodType) -> u64 {
        self.counts[blood_type.index()]
    }

    /// Add donated units to the bank.
    ///
    /// Increments the per-type count, `total_donated` and `total_bank`.
    /// Rejects a zero amount; state is untouched on failure.
    pub fn credit(&mut self, blood_type: BloodType, units: u64) -> DomainResult<()> {
        if units == 0 {
            return Err(DomainError::InvalidAmount);
        }

        self.counts[blood_type.index()] += units;
        self.total_donated += units;
        Ok(())
    }

    /// Consume units from the bank.
    ///
    /// Succeeds only if the per-type count covers `units`; decrements the
    /// count and `total_bank`, increments `total_spent`. No partial debit:
    /// on failure all counters are untouched.
    pub fn debit(&mut self, blood_type: BloodType, units: u64) -> DomainResult<()> {
        if units == 0 {
            return Err(DomainError::InvalidAmount);
        }

        let count = &mut self.counts[blood_type.index()];
        if *count < units {
            return Err(DomainError::InsufficientStock(blood_type));
        }

        *count -= units;
        self.total_spent += units;
        Ok(())
    }

    /// Read-only view of all counters.
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            by_type: self.counts,
            total_donated: self.total_donated,
            total_bank: self.total_bank(),
            total_spent: self.total_spent,
        }
    }

    fn total_bank(&self) -> u64 {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_invariants(inv: &Inventory) {
        let snap = inv.snapshot();
        assert_eq!(snap.total_donated, snap.total_bank + snap.total_spent);
        assert_eq!(snap.total_bank, snap.by_type.iter().sum::<u64>());
    }

    #[test]
    fn new_bank_is_empty() {
        let snap = Inventory::new().snapshot();
        assert_eq!(snap.by_type, [0; BloodType::COUNT]);
        assert_eq!(
            (snap.total_donated, snap.total_bank, snap.total_spent),
            (0, 0, 0)
        );
    }

    #[test]
    fn credit_updates_count_and_aggregates() {
        let mut inv = Inventory::new();
        inv.credit(BloodType::ANegative, 5).unwrap();

        let snap = inv.snapshot();
        assert_eq!(snap.level(BloodType::ANegative), 5);
        assert_eq!(
            (snap.total_donated, snap.total_bank, snap.total_spent),
            (5, 5, 0)
        );
    }

    #[test]
    fn credit_rejects_zero_units() {
        let mut inv = Inventory::new();
        let before = inv.clone();

        assert_eq!(
            inv.credit(BloodType::OPositive, 0),
            Err(DomainError::InvalidAmount)
        );
        assert_eq!(inv, before);
    }

    #[test]
    fn debit_moves_units_from_bank_to_spent() {
        let mut inv = Inventory::new();
        inv.credit(BloodType::BPositive, 3).unwrap();
        inv.debit(BloodType::BPositive, 2).unwrap();

        let snap = inv.snapshot();
        assert_eq!(snap.level(BloodType::BPositive), 1);
        assert_eq!(
            (snap.total_donated, snap.total_bank, snap.total_spent),
            (3, 1, 2)
        );
    }

    #[test]
    fn debit_rejects_insufficient_stock_without_partial_mutation() {
        let mut inv = Inventory::new();
        inv.credit(BloodType::AbNegative, 1).unwrap();
        let before = inv.clone();

        assert_eq!(
            inv.debit(BloodType::AbNegative, 2),
            Err(DomainError::InsufficientStock(BloodType::AbNegative))
        );
        assert_eq!(inv, before);

        // Stock of a different group never covers the debit.
        assert_eq!(
            inv.debit(BloodType::ONegative, 1),
            Err(DomainError::InsufficientStock(BloodType::ONegative))
        );
        assert_eq!(inv, before);
    }

    #[test]
    fn debit_rejects_zero_units() {
        let mut inv = Inventory::new();
        inv.credit(BloodType::OPositive, 4).unwrap();
        let before = inv.clone();

        assert_eq!(
            inv.debit(BloodType::OPositive, 0),
            Err(DomainError::InvalidAmount)
        );
        assert_eq!(inv, before);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any interleaving of credits and debits preserves the
        /// aggregate invariant, whether or not individual operations succeed.
        #[test]
        fn aggregate_invariant_holds_under_random_operations(
            ops in prop::collection::vec((0u8..8, 0u64..50, prop::bool::ANY), 0..64)
        ) {
            let mut inv = Inventory::new();

            for (code, units, is_credit) in ops {
                let blood_type = BloodType::from_index(code).unwrap();
                let _outcome = if is_credit {
                    inv.credit(blood_type, units)
                } else {
                    inv.debit(blood_type, units)
                };
                assert_invariants(&inv);
            }
        }

        /// Property: a failed operation leaves the inventory byte-for-byte
        /// unchanged.
        #[test]
        fn failed_operations_do_not_mutate(
            seed in prop::collection::vec((0u8..8, 1u64..10), 0..16),
            code in 0u8..8,
            units in 1u64..1000,
        ) {
            let mut inv = Inventory::new();
            for (c, u) in seed {
                inv.credit(BloodType::from_index(c).unwrap(), u).unwrap();
            }

            let blood_type = BloodType::from_index(code).unwrap();
            let before = inv.clone();

            if inv.debit(blood_type, units).is_err() {
                prop_assert_eq!(inv, before);
            }
        }
    }
}
