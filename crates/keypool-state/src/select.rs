//! Round-robin selection over the eligible key subset
//!
//! Eligibility is recomputed per call, so the cursor does not track a
//! stable position in the full key list: fairness is approximate and
//! weighted toward whichever subset is eligible at call time. That is
//! intentional — eligibility changes slowly relative to traffic.

use keypool_core::Provider;

use crate::types::{KeyRecord, PoolSnapshot};

/// Capability constraints for a selection
#[derive(Debug, Clone, Default)]
pub struct SelectionFilter {
    /// Restrict to one provider
    pub provider: Option<Provider>,
    /// Restrict to keys allowing this model
    pub model: Option<String>,
}

/// Whether a key can serve a request under the given filter right now
pub fn is_eligible(key: &KeyRecord, filter: &SelectionFilter, now_ms: i64) -> bool {
    if !key.enabled {
        return false;
    }
    if key.cooldown_until != 0 && now_ms < key.cooldown_until {
        return false;
    }
    if let Some(provider) = filter.provider
        && key.provider != provider
    {
        return false;
    }
    if let Some(ref model) = filter.model
        && !key.models.is_empty()
        && !key.models.iter().any(|m| m == model)
    {
        return false;
    }
    true
}

/// Pick the next eligible key and advance the cursor
///
/// The cursor is incremented by exactly one per call, pick or no pick,
/// and the caller persists the mutated snapshot. The double modulo
/// guards against a negative cursor in a hand-edited snapshot.
pub fn pick_round_robin(snapshot: &mut PoolSnapshot, filter: &SelectionFilter, now_ms: i64) -> Option<KeyRecord> {
    let eligible: Vec<usize> = snapshot
        .keys
        .iter()
        .enumerate()
        .filter(|(_, key)| is_eligible(key, filter, now_ms))
        .map(|(i, _)| i)
        .collect();

    let cursor = snapshot.rr_index;
    snapshot.rr_index += 1;

    if eligible.is_empty() {
        return None;
    }

    let n = i64::try_from(eligible.len()).expect("key count fits in i64");
    let slot = usize::try_from(((cursor % n) + n) % n).expect("reduced cursor fits in usize");
    Some(snapshot.keys[eligible[slot]].clone())
}
