//! ABO/Rh blood groups.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// One of the 8 standard ABO/Rh blood groups.
///
/// The discriminant (0..=7) is the wire code used by external drivers; it
/// carries identity only, no numeric meaning. Ordering follows the
/// discriminant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloodType {
    ONegative = 0,
    OPositive = 1,
    ANegative = 2,
    APositive = 3,
    BNegative = 4,
    BPositive = 5,
    AbNegative = 6,
    AbPositive = 7,
}

impl BloodType {
    /// Number of blood groups.
    pub const COUNT: usize = 8;

    /// All groups in discriminant order.
    pub const ALL: [BloodType; Self::COUNT] = [
        BloodType::ONegative,
        BloodType::OPositive,
        BloodType::ANegative,
        BloodType::APositive,
        BloodType::BNegative,
        BloodType::BPositive,
        BloodType::AbNegative,
        BloodType::AbPositive,
    ];

    /// Stable index of this group (0..=7).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Decode an external integer code.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl TryFrom<u8> for BloodType {
    type Error = DomainError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_index(code).ok_or(DomainError::InvalidBloodType(code))
    }
}

impl core::fmt::Display for BloodType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            BloodType::ONegative => "O-",
            BloodType::OPositive => "O+",
            BloodType::ANegative => "A-",
            BloodType::APositive => "A+",
            BloodType::BNegative => "B-",
            BloodType::BPositive => "B+",
            BloodType::AbNegative => "AB-",
            BloodType::AbPositive => "AB+",
        };
        f.write_str(label)
    }
}

impl ValueObject for BloodType {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_through_from_index() {
        for bt in BloodType::ALL {
            assert_eq!(BloodType::from_index(bt.index() as u8), Some(bt));
        }
    }

    #[test]
    fn out_of_range_code_is_rejected() {
        assert_eq!(BloodType::from_index(8), None);
        assert!(matches!(
            BloodType::try_from(8u8),
            Err(DomainError::InvalidBloodType(8))
        ));
    }

    #[test]
    fn all_is_ordered_by_index() {
        for (i, bt) in BloodType::ALL.iter().enumerate() {
            assert_eq!(bt.index(), i);
        }
    }
}
