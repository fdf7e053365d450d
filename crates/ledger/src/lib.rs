//! Ledger domain module (event-sourced).
//!
//! The root aggregate of the bank: donor registry + typed inventory,
//! orchestrating registration, donation intake and match allocation against
//! the compatibility policy. Implemented purely as deterministic domain
//! logic (no IO, no storage).

pub mod ledger;

pub use ledger::{
    DonationRecorded, DonorRecord, DonorRegistered, Ledger, LedgerCommand, LedgerEvent, LedgerId,
    MatchFulfilled, RecordDonation, RegisterDonor, RequestMatch,
};
