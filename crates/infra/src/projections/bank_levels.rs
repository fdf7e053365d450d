use std::sync::RwLock;

use serde_json::Value as JsonValue;

use hemobank_core::BloodType;
use hemobank_events::EventEnvelope;
use hemobank_ledger::LedgerEvent;

use super::ProjectionError;

/// Queryable bank read model: units on hand per blood group plus the three
/// running aggregates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct BankLevels {
    /// Units on hand, indexed by `BloodType::index()`.
    pub by_type: [u64; BloodType::COUNT],
    pub total_donated: u64,
    pub total_bank: u64,
    pub total_spent: u64,
}

impl BankLevels {
    pub fn level(&self, blood_type: BloodType) -> u64 {
        self.by_type[blood_type.index()]
    }
}

#[derive(Debug, Default)]
struct Inner {
    levels: BankLevels,
    /// Last applied sequence number (at-least-once delivery cursor).
    cursor: u64,
}

/// Bank levels projection.
///
/// Consumes published envelopes (JSON payloads) of one ledger stream and
/// maintains the stock read model. Duplicate deliveries at or below the
/// cursor are ignored; each envelope is applied atomically, so readers
/// always observe a state in which the aggregate invariant holds.
#[derive(Debug, Default)]
pub struct BankLevelsProjection {
    inner: RwLock<Inner>,
}

impl BankLevelsProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current read model (consistent snapshot).
    pub fn levels(&self) -> Result<BankLevels, ProjectionError> {
        let inner = self.inner.read().map_err(|_| ProjectionError::Poisoned)?;
        Ok(inner.levels)
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Enforces monotonic sequence numbers per stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        let seq = envelope.sequence_number();

        let mut inner = self.inner.write().map_err(|_| ProjectionError::Poisoned)?;
        let last = inner.cursor;

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }
        if last != 0 && seq != last + 1 {
            // The first event may carry any positive sequence; after that we
            // require strict +1 increments.
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: LedgerEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        // Validate that the event belongs to the envelope's stream.
        let ledger_id = match &event {
            LedgerEvent::DonorRegistered(e) => e.ledger_id,
            LedgerEvent::DonationRecorded(e) => e.ledger_id,
            LedgerEvent::MatchFulfilled(e) => e.ledger_id,
        };
        if ledger_id.0 != envelope.aggregate_id() {
            return Err(ProjectionError::StreamMismatch(
                "event ledger_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match event {
            LedgerEvent::DonorRegistered(_) => {}
            LedgerEvent::DonationRecorded(e) => {
                let levels = &mut inner.levels;
                levels.by_type[e.blood_type.index()] += e.units;
                levels.total_donated += e.units;
                levels.total_bank += e.units;
            }
            LedgerEvent::MatchFulfilled(e) => {
                let levels = &mut inner.levels;
                levels.by_type[e.matched.index()] =
                    levels.by_type[e.matched.index()].saturating_sub(1);
                levels.total_bank = levels.total_bank.saturating_sub(1);
                levels.total_spent += 1;
            }
        }

        // Advance cursor after successful apply.
        inner.cursor = seq;

        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        {
            let mut inner = self.inner.write().map_err(|_| ProjectionError::Poisoned)?;
            *inner = Inner::default();
        }

        // Deterministic replay order.
        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| e.sequence_number());

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
