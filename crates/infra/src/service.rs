//! Externally callable surface of the bank.
//!
//! `LedgerService` is the single entry point drivers call: donor
//! registration, donation intake, match requests and the aggregate reads.
//! Every mutating operation runs inside one mutual-exclusion boundary (the
//! write gate), which realizes the single-writer model: a match request's
//! walk over candidate types can never interleave with another mutation.
//! Reads rehydrate a consistent snapshot from the append-only store and do
//! not take the gate.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde_json::Value as JsonValue;

use hemobank_core::{AggregateId, BloodType, DonorId};
use hemobank_events::{EventBus, EventEnvelope};
use hemobank_inventory::InventorySnapshot;
use hemobank_ledger::{
    Ledger, LedgerCommand, LedgerEvent, LedgerId, RecordDonation, RegisterDonor, RequestMatch,
};
use hemobank_matching::CompatibilityTable;

use crate::command_dispatcher::{
    CommandDispatcher, DispatchError, apply_history, validate_loaded_stream,
};
use crate::event_store::{EventStore, StoredEvent};

/// Aggregate type identifier of ledger streams.
pub const LEDGER_AGGREGATE_TYPE: &str = "hemobank.ledger";

/// The blood-bank call surface over one ledger stream.
pub struct LedgerService<S, B> {
    dispatcher: CommandDispatcher<S, B>,
    ledger_id: LedgerId,
    table: CompatibilityTable,
    /// Serializes all mutating operations (single logical writer).
    write_gate: Mutex<()>,
}

impl<S, B> LedgerService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Service over a fresh ledger stream with the standard ABO/Rh policy.
    pub fn new(store: S, bus: B) -> Self {
        Self::with_table(
            store,
            bus,
            LedgerId::new(AggregateId::new()),
            CompatibilityTable::default(),
        )
    }

    /// Service over an explicit stream with a custom compatibility policy.
    pub fn with_table(store: S, bus: B, ledger_id: LedgerId, table: CompatibilityTable) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            ledger_id,
            table,
            write_gate: Mutex::new(()),
        }
    }

    pub fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    /// Register a donor identity.
    ///
    /// Re-registration reports `AlreadyRegistered` and mutates nothing.
    pub fn register_donor(&self, donor_id: DonorId) -> Result<(), DispatchError> {
        self.execute(LedgerCommand::RegisterDonor(RegisterDonor {
            donor_id: donor_id.clone(),
            occurred_at: Utc::now(),
        }))?;

        tracing::info!(donor = %donor_id, "donor registered");
        Ok(())
    }

    /// Record a donation of `units` of `blood_type` by a registered donor.
    pub fn record_donation(
        &self,
        donor_id: DonorId,
        blood_type: BloodType,
        units: u64,
    ) -> Result<(), DispatchError> {
        self.execute(LedgerCommand::RecordDonation(RecordDonation {
            donor_id: donor_id.clone(),
            blood_type,
            units,
            occurred_at: Utc::now(),
        }))?;

        tracing::info!(donor = %donor_id, %blood_type, units, "donation recorded");
        Ok(())
    }

    /// Serve a recipient: consume 1 unit of the first compatible donor type
    /// with stock, in policy order. Returns the type actually consumed.
    pub fn request_match(&self, recipient: BloodType) -> Result<BloodType, DispatchError> {
        let committed = self
            .execute(LedgerCommand::RequestMatch(RequestMatch {
                recipient,
                occurred_at: Utc::now(),
            }))
            .inspect_err(|e| {
                if e.domain().is_some() {
                    tracing::warn!(%recipient, "no compatible stock");
                }
            })?;

        let matched = decode_match(&committed)?;
        tracing::info!(%recipient, %matched, "match fulfilled");
        Ok(matched)
    }

    /// Aggregate report: total donated / on hand / consumed.
    pub fn totals(&self) -> Result<InventorySnapshot, DispatchError> {
        Ok(self.rehydrate()?.totals())
    }

    /// Units on hand per blood group, in index order.
    pub fn bank_by_type(&self) -> Result<BTreeMap<BloodType, u64>, DispatchError> {
        let snapshot = self.totals()?;
        Ok(BloodType::ALL
            .into_iter()
            .map(|bt| (bt, snapshot.level(bt)))
            .collect())
    }

    /// Lifetime donation count of a donor, if registered.
    pub fn donation_count(&self, donor_id: &DonorId) -> Result<Option<u64>, DispatchError> {
        Ok(self
            .rehydrate()?
            .donor(donor_id)
            .map(|record| record.donations()))
    }

    fn execute(&self, command: LedgerCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        // A poisoned gate only means another writer panicked; the store
        // itself is still consistent, so keep serving.
        let _gate = self
            .write_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.dispatcher.dispatch(
            self.ledger_id.0,
            LEDGER_AGGREGATE_TYPE,
            command,
            |id| Ledger::with_table(LedgerId::new(id), self.table.clone()),
        )
    }

    /// Consistent read snapshot: replay the full stream into a fresh
    /// aggregate.
    fn rehydrate(&self) -> Result<Ledger, DispatchError> {
        let history = self.dispatcher.store().load_stream(self.ledger_id.0)?;
        validate_loaded_stream(self.ledger_id.0, &history)?;

        let mut ledger = Ledger::with_table(self.ledger_id, self.table.clone());
        apply_history::<Ledger>(&mut ledger, &history)?;
        Ok(ledger)
    }
}

fn decode_match(committed: &[StoredEvent]) -> Result<BloodType, DispatchError> {
    let stored = committed.first().ok_or_else(|| {
        DispatchError::Deserialize("match request committed no event".to_string())
    })?;

    let event: LedgerEvent = serde_json::from_value(stored.payload.clone())
        .map_err(|e| DispatchError::Deserialize(e.to_string()))?;

    match event {
        LedgerEvent::MatchFulfilled(e) => Ok(e.matched),
        other => Err(DispatchError::Deserialize(format!(
            "expected ledger.match.fulfilled, found {}",
            hemobank_events::Event::event_type(&other)
        ))),
    }
}
