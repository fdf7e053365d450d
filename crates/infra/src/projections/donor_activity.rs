use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use hemobank_core::DonorId;
use hemobank_events::EventEnvelope;
use hemobank_ledger::LedgerEvent;

use super::ProjectionError;

/// Queryable donor read model: registration and donation count per donor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorActivity {
    pub donor_id: DonorId,
    pub registered: bool,
    pub donations: u64,
}

#[derive(Debug, Default)]
struct Inner {
    donors: HashMap<DonorId, DonorActivity>,
    cursor: u64,
}

/// Donor activity projection.
///
/// Same delivery contract as `BankLevelsProjection`: monotonic sequence
/// cursor, duplicates ignored, rebuildable from the stream.
#[derive(Debug, Default)]
pub struct DonorActivityProjection {
    inner: RwLock<Inner>,
}

impl DonorActivityProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read model for one donor.
    pub fn get(&self, donor_id: &DonorId) -> Result<Option<DonorActivity>, ProjectionError> {
        let inner = self.inner.read().map_err(|_| ProjectionError::Poisoned)?;
        Ok(inner.donors.get(donor_id).cloned())
    }

    /// Number of registered donors.
    pub fn registered_count(&self) -> Result<usize, ProjectionError> {
        let inner = self.inner.read().map_err(|_| ProjectionError::Poisoned)?;
        Ok(inner.donors.len())
    }

    /// Apply a published envelope into the projection.
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
            return Ok(());
        }
        if last != 0 && seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: LedgerEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        match event {
            LedgerEvent::DonorRegistered(e) => {
                inner
                    .donors
                    .entry(e.donor_id.clone())
                    .or_insert(DonorActivity {
                        donor_id: e.donor_id,
                        registered: true,
                        donations: 0,
                    });
            }
            LedgerEvent::DonationRecorded(e) => {
                if let Some(donor) = inner.donors.get_mut(&e.donor_id) {
                    donor.donations += 1;
                }
            }
            LedgerEvent::MatchFulfilled(_) => {}
        }

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

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| e.sequence_number());

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}
