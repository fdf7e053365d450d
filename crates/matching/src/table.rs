use serde::{Deserialize, Serialize};
use thiserror::Error;

use hemobank_core::{BloodType, ValueObject};

/// Error constructing a custom compatibility policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A recipient row lists the same donor type twice.
    #[error("duplicate donor type {donor} in row for recipient {recipient}")]
    DuplicateDonor {
        recipient: BloodType,
        donor: BloodType,
    },
}

/// Static recipient → ordered donor types lookup.
///
/// For each of the 8 recipient blood groups, the table holds the ordered
/// list of donor groups usable for that recipient. The order is the
/// allocation preference: the exact type first, falling back to broader
/// donors, so that universal-donor stock is conserved for recipients who can
/// use nothing else. First-fit over this order is the documented allocation
/// policy of the bank.
///
/// Immutable for the process lifetime. The default table is the standard
/// ABO/Rh rule set (O− universal donor, AB+ universal recipient); a custom
/// rule set can be supplied as a value via [`CompatibilityTable::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityTable {
    /// Indexed by `BloodType::index()` of the recipient.
    rows: [Vec<BloodType>; BloodType::COUNT],
}

impl CompatibilityTable {
    /// Build a table from explicit recipient rows (custom policy input).
    ///
    /// Rows are indexed by recipient and must not repeat a donor type.
    /// An empty row is allowed and means the recipient can never be served.
    pub fn new(rows: [Vec<BloodType>; BloodType::COUNT]) -> Result<Self, TableError> {
        for (idx, row) in rows.iter().enumerate() {
            let recipient = BloodType::ALL[idx];
            let mut seen = [false; BloodType::COUNT];
            for donor in row {
                if seen[donor.index()] {
                    return Err(TableError::DuplicateDonor {
                        recipient,
                        donor: *donor,
                    });
                }
                seen[donor.index()] = true;
            }
        }
        Ok(Self { rows })
    }

    /// Ordered donor types usable for `recipient`. Total and pure.
    pub fn compatible_donors_for(&self, recipient: BloodType) -> &[BloodType] {
        &self.rows[recipient.index()]
    }
}

impl Default for CompatibilityTable {
    /// The standard ABO/Rh rule set.
    ///
    /// Row order: exact type, then same-group Rh-negative, then O-group
    /// fallbacks ending with O−.
    fn default() -> Self {
        use hemobank_core::BloodType::*;

        Self {
            rows: [
                // O− receives only O−.
                vec![ONegative],
                vec![OPositive, ONegative],
                vec![ANegative, ONegative],
                vec![APositive, ANegative, OPositive, ONegative],
                vec![BNegative, ONegative],
                vec![BPositive, BNegative, OPositive, ONegative],
                vec![AbNegative, ANegative, BNegative, ONegative],
                // AB+ is the universal recipient.
                vec![
                    AbPositive, AbNegative, APositive, ANegative, BPositive, BNegative, OPositive,
                    ONegative,
                ],
            ],
        }
    }
}

impl ValueObject for CompatibilityTable {}

#[cfg(test)]
mod tests {
    use super::*;
    use hemobank_core::BloodType::*;

    #[test]
    fn every_row_starts_with_the_exact_type() {
        let table = CompatibilityTable::default();
        for recipient in BloodType::ALL {
            assert_eq!(
                table.compatible_donors_for(recipient).first(),
                Some(&recipient),
                "row for {recipient} must prefer the exact type"
            );
        }
    }

    #[test]
    fn universal_donor_closes_every_row() {
        let table = CompatibilityTable::default();
        for recipient in BloodType::ALL {
            assert_eq!(
                table.compatible_donors_for(recipient).last(),
                Some(&ONegative),
                "O- must be the last resort for {recipient}"
            );
        }
    }

    #[test]
    fn universal_recipient_accepts_all_groups() {
        let table = CompatibilityTable::default();
        let row = table.compatible_donors_for(AbPositive);
        assert_eq!(row.len(), BloodType::COUNT);
        for donor in BloodType::ALL {
            assert!(row.contains(&donor));
        }
    }

    #[test]
    fn o_negative_recipient_accepts_only_o_negative() {
        let table = CompatibilityTable::default();
        assert_eq!(table.compatible_donors_for(ONegative), &[ONegative]);
    }

    #[test]
    fn rh_negative_recipients_never_accept_rh_positive_donors() {
        let table = CompatibilityTable::default();
        for recipient in [ONegative, ANegative, BNegative, AbNegative] {
            for donor in table.compatible_donors_for(recipient) {
                assert!(
                    matches!(donor, ONegative | ANegative | BNegative | AbNegative),
                    "{recipient} must not receive Rh-positive {donor}"
                );
            }
        }
    }

    #[test]
    fn no_row_repeats_a_donor_type() {
        let table = CompatibilityTable::default();
        for recipient in BloodType::ALL {
            let row = table.compatible_donors_for(recipient);
            let mut sorted: Vec<_> = row.to_vec();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), row.len());
        }
    }

    /// ABO/Rh containment: a donor serves a recipient iff the recipient's
    /// antigens include the donor's.
    fn serves(donor: BloodType, recipient: BloodType) -> bool {
        let rh_ok = donor.index() % 2 == 0 || recipient.index() % 2 == 1;
        let abo = |t: BloodType| match t {
            ONegative | OPositive => (false, false),
            ANegative | APositive => (true, false),
            BNegative | BPositive => (false, true),
            AbNegative | AbPositive => (true, true),
        };
        let (da, db) = abo(donor);
        let (ra, rb) = abo(recipient);
        rh_ok && (!da || ra) && (!db || rb)
    }

    #[test]
    fn default_table_is_exactly_the_abo_rh_relation() {
        let table = CompatibilityTable::default();
        for recipient in BloodType::ALL {
            let row = table.compatible_donors_for(recipient);
            for donor in BloodType::ALL {
                assert_eq!(
                    row.contains(&donor),
                    serves(donor, recipient),
                    "{donor} -> {recipient}"
                );
            }
        }
    }

    #[test]
    fn custom_table_rejects_duplicate_donors() {
        let mut rows: [Vec<BloodType>; BloodType::COUNT] = Default::default();
        rows[APositive.index()] = vec![APositive, APositive];

        let err = CompatibilityTable::new(rows).unwrap_err();
        assert_eq!(
            err,
            TableError::DuplicateDonor {
                recipient: APositive,
                donor: APositive,
            }
        );
    }

    #[test]
    fn custom_table_is_consulted_as_given() {
        let mut rows: [Vec<BloodType>; BloodType::COUNT] = Default::default();
        rows[APositive.index()] = vec![ONegative, APositive];

        let table = CompatibilityTable::new(rows).unwrap();
        assert_eq!(
            table.compatible_donors_for(APositive),
            &[ONegative, APositive]
        );
        // Unlisted recipients simply have no candidates.
        assert!(table.compatible_donors_for(BNegative).is_empty());
    }
}
