use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hemobank_core::{
    Aggregate, AggregateId, AggregateRoot, BloodType, DomainError, DonorId, Entity,
};
use hemobank_events::Event;
use hemobank_inventory::{Inventory, InventorySnapshot};
use hemobank_matching::CompatibilityTable;

/// Ledger identifier (aggregate id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerId(pub AggregateId);

impl LedgerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LedgerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Registry entry for one donor.
///
/// Created on first successful registration, never deleted. The donation
/// count only increases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorRecord {
    donor_id: DonorId,
    registered: bool,
    donations: u64,
}

impl DonorRecord {
    fn new(donor_id: DonorId) -> Self {
        Self {
            donor_id,
            registered: true,
            donations: 0,
        }
    }

    pub fn registered(&self) -> bool {
        self.registered
    }

    pub fn donations(&self) -> u64 {
        self.donations
    }
}

impl Entity for DonorRecord {
    type Id = DonorId;

    fn id(&self) -> &Self::Id {
        &self.donor_id
    }
}

/// Aggregate root: the blood-bank ledger.
///
/// Owns the donor registry and the typed inventory; every externally
/// callable operation of the bank goes through this aggregate. The event
/// stream is the append-only audit trail of donations and fulfilled
/// matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    id: LedgerId,
    donors: HashMap<DonorId, DonorRecord>,
    inventory: Inventory,
    table: CompatibilityTable,
    version: u64,
}

impl Ledger {
    /// Empty aggregate for rehydration, using the standard ABO/Rh policy.
    pub fn empty(id: LedgerId) -> Self {
        Self::with_table(id, CompatibilityTable::default())
    }

    /// Empty aggregate with a custom compatibility policy.
    ///
    /// The table is configuration, not event-sourced state: all replicas of
    /// the same stream must rehydrate with the same policy.
    pub fn with_table(id: LedgerId, table: CompatibilityTable) -> Self {
        Self {
            id,
            donors: HashMap::new(),
            inventory: Inventory::new(),
            table,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> LedgerId {
        self.id
    }

    /// Registry entry for a donor, if one was ever registered.
    pub fn donor(&self, donor_id: &DonorId) -> Option<&DonorRecord> {
        self.donors.get(donor_id)
    }

    /// Number of registered donors.
    pub fn donor_count(&self) -> usize {
        self.donors.len()
    }

    /// Read-only aggregate report; delegates to the inventory snapshot.
    pub fn totals(&self) -> InventorySnapshot {
        self.inventory.snapshot()
    }

    /// The compatibility policy this ledger allocates against.
    pub fn table(&self) -> &CompatibilityTable {
        &self.table
    }
}

impl AggregateRoot for Ledger {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterDonor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDonor {
    pub donor_id: DonorId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordDonation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDonation {
    pub donor_id: DonorId,
    pub blood_type: BloodType,
    pub units: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RequestMatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMatch {
    pub recipient: BloodType,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    RegisterDonor(RegisterDonor),
    RecordDonation(RecordDonation),
    RequestMatch(RequestMatch),
}

/// Event: DonorRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorRegistered {
    pub ledger_id: LedgerId,
    pub donor_id: DonorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DonationRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecorded {
    pub ledger_id: LedgerId,
    pub donor_id: DonorId,
    pub blood_type: BloodType,
    pub units: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MatchFulfilled.
///
/// Records the recipient type and the donor type actually consumed; one
/// unit of `matched` moves from the bank to spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFulfilled {
    pub ledger_id: LedgerId,
    pub recipient: BloodType,
    pub matched: BloodType,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    DonorRegistered(DonorRegistered),
    DonationRecorded(DonationRecorded),
    MatchFulfilled(MatchFulfilled),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::DonorRegistered(_) => "ledger.donor.registered",
            LedgerEvent::DonationRecorded(_) => "ledger.donation.recorded",
            LedgerEvent::MatchFulfilled(_) => "ledger.match.fulfilled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::DonorRegistered(e) => e.occurred_at,
            LedgerEvent::DonationRecorded(e) => e.occurred_at,
            LedgerEvent::MatchFulfilled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Ledger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        // Events are facts: handle() emits them only for valid transitions,
        // so a failed inventory update here means a corrupted stream.
        match event {
            LedgerEvent::DonorRegistered(e) => {
                self.donors
                    .entry(e.donor_id.clone())
                    .or_insert_with(|| DonorRecord::new(e.donor_id.clone()));
            }
            LedgerEvent::DonationRecorded(e) => {
                let credited = self.inventory.credit(e.blood_type, e.units);
                debug_assert!(credited.is_ok(), "replayed donation failed credit");

                if let Some(donor) = self.donors.get_mut(&e.donor_id) {
                    donor.donations += 1;
                }
            }
            LedgerEvent::MatchFulfilled(e) => {
                let debited = self.inventory.debit(e.matched, 1);
                debug_assert!(debited.is_ok(), "replayed match failed debit");
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::RegisterDonor(cmd) => self.handle_register(cmd),
            LedgerCommand::RecordDonation(cmd) => self.handle_donation(cmd),
            LedgerCommand::RequestMatch(cmd) => self.handle_match(cmd),
        }
    }
}

impl Ledger {
    fn handle_register(&self, cmd: &RegisterDonor) -> Result<Vec<LedgerEvent>, DomainError> {
        if self.donors.contains_key(&cmd.donor_id) {
            return Err(DomainError::AlreadyRegistered);
        }

        Ok(vec![LedgerEvent::DonorRegistered(DonorRegistered {
            ledger_id: self.id,
            donor_id: cmd.donor_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_donation(&self, cmd: &RecordDonation) -> Result<Vec<LedgerEvent>, DomainError> {
        if !self.donors.contains_key(&cmd.donor_id) {
            return Err(DomainError::DonorNotRegistered);
        }
        if cmd.units == 0 {
            return Err(DomainError::InvalidAmount);
        }

        Ok(vec![LedgerEvent::DonationRecorded(DonationRecorded {
            ledger_id: self.id,
            donor_id: cmd.donor_id.clone(),
            blood_type: cmd.blood_type,
            units: cmd.units,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// First-fit allocation over the compatibility-ordered candidate list.
    ///
    /// Ties are broken purely by table order; this is the documented policy,
    /// not a search for a globally optimal assignment.
    fn handle_match(&self, cmd: &RequestMatch) -> Result<Vec<LedgerEvent>, DomainError> {
        for candidate in self.table.compatible_donors_for(cmd.recipient) {
            if self.inventory.available(*candidate) > 0 {
                return Ok(vec![LedgerEvent::MatchFulfilled(MatchFulfilled {
                    ledger_id: self.id,
                    recipient: cmd.recipient,
                    matched: *candidate,
                    occurred_at: cmd.occurred_at,
                })]);
            }
        }

        Err(DomainError::NoCompatibleStock(cmd.recipient))
    }
}
