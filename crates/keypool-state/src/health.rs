//! Per-key health transitions
//!
//! A key is Healthy (failures 0, no cooldown), Degraded (failures > 0,
//! still eligible), or Cooling (cooldown in the future, ineligible).
//! Any success returns it to Healthy; cooldown-worthy failures push it
//! into Cooling with a status-dependent duration.

use crate::types::PoolSnapshot;

/// Fixed cooldown after an upstream 429
pub const RATE_LIMIT_COOLDOWN_MS: i64 = 30_000;

/// Fixed cooldown after an upstream 401/403
pub const AUTH_COOLDOWN_MS: i64 = 600_000;

/// Base of the exponential backoff for server/transport errors
const BACKOFF_BASE_MS: i64 = 10_000;

/// Failure count beyond which the backoff stops growing
const BACKOFF_SATURATION: u32 = 6;

/// Whether a failure with this status should cool the key down
///
/// Rate limiting, auth rejection, server errors, and transport
/// failures (`None`) are key-health problems. Other 4xx are
/// request-shaped errors another key would reproduce, so the key stays
/// eligible.
pub const fn should_cooldown(status: Option<u16>) -> bool {
    match status {
        None => true,
        Some(code) => matches!(code, 429 | 401 | 403) || code >= 500,
    }
}

/// Cooldown duration for a cooldown-worthy failure
///
/// 429 and 401/403 get fixed windows; everything else backs off
/// exponentially on the failure count, saturating at the sixth
/// failure. The count itself is uncapped — only its effect here is.
pub fn cooldown_duration_ms(status: Option<u16>, failures: u32) -> i64 {
    match status {
        Some(429) => RATE_LIMIT_COOLDOWN_MS,
        Some(401 | 403) => AUTH_COOLDOWN_MS,
        _ => {
            let exponent = failures.clamp(1, BACKOFF_SATURATION) - 1;
            BACKOFF_BASE_MS << exponent
        }
    }
}

/// Record a successful attempt against a key
///
/// Resets the key to Healthy: failures and cooldown cleared. A key
/// that no longer exists in the snapshot is ignored.
pub fn mark_success(snapshot: &mut PoolSnapshot, key_id: &str) {
    let Some(key) = snapshot.key_mut(key_id) else {
        return;
    };
    key.failures = 0;
    key.cooldown_until = 0;
    key.updated_at = jiff::Timestamp::now().to_string();
}

/// Record a failed attempt against a key
///
/// `status` is the upstream HTTP status, or `None` for a transport
/// failure. The failure counter always increments; a cooldown window
/// is opened only for cooldown-worthy statuses.
pub fn mark_failure(snapshot: &mut PoolSnapshot, key_id: &str, status: Option<u16>, now_ms: i64) {
    let Some(key) = snapshot.key_mut(key_id) else {
        return;
    };
    key.failures += 1;
    if should_cooldown(status) {
        key.cooldown_until = now_ms + cooldown_duration_ms(status, key.failures);
    }
    key.updated_at = jiff::Timestamp::now().to_string();
}
