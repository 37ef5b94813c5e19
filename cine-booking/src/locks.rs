use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use cine_domain::error::BookingError;
use cine_domain::repository::LockStore;

pub fn seat_lock_key(showing_id: Uuid, seat_id: Uuid) -> String {
    format!("lock:showing:{}:seat:{}", showing_id, seat_id)
}

/// Batch advisory locking over per-(showing, seat) keys.
///
/// The lock is a throughput optimization to fail contended attempts fast; the
/// transactional double-check remains the final arbiter of availability.
pub struct SeatLockManager {
    store: Arc<dyn LockStore>,
    ttl_seconds: u64,
}

impl SeatLockManager {
    pub fn new(store: Arc<dyn LockStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    /// Attempts an exclusive create of every key in order, stopping at the
    /// first one already held. Returns the blocking seat id on conflict.
    ///
    /// Callers must pair every call with `release_all` over the same seat
    /// set once the booking attempt concludes, whatever the outcome.
    pub async fn acquire_all(
        &self,
        showing_id: Uuid,
        seat_ids: &[Uuid],
        token: &str,
    ) -> Result<Option<Uuid>, BookingError> {
        for &seat_id in seat_ids {
            let key = seat_lock_key(showing_id, seat_id);
            let acquired = self.store.try_lock(&key, token, self.ttl_seconds).await?;
            if !acquired {
                return Ok(Some(seat_id));
            }
        }
        Ok(None)
    }

    /// Releases every key of an attempt, acquired or not. Failures are
    /// logged and swallowed; the TTL bounds any leftover lock.
    pub async fn release_all(&self, showing_id: Uuid, seat_ids: &[Uuid]) {
        for &seat_id in seat_ids {
            let key = seat_lock_key(showing_id, seat_id);
            if let Err(e) = self.store.unlock(&key).await {
                warn!(%key, error = %e, "failed to release seat lock; TTL will reap it");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_scoped_to_showing_and_seat() {
        let showing = Uuid::new_v4();
        let seat = Uuid::new_v4();
        let key = seat_lock_key(showing, seat);
        assert_eq!(key, format!("lock:showing:{}:seat:{}", showing, seat));
    }
}
