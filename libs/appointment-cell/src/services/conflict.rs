// libs/appointment-cell/src/services/conflict.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::SchedulingStore;

use crate::models::AppointmentError;

/// One async mutex per professional. Holding the guard serialises the
/// check-then-insert of bookings for that professional only.
#[derive(Default)]
pub struct ProfessionalLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ProfessionalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, professional_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(professional_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Fail with `Conflict` when `[start, end)` strictly overlaps a
/// non-cancelled appointment of the professional.
pub async fn ensure_slot_free(
    store: &dyn SchedulingStore,
    professional_id: Uuid,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<(), AppointmentError> {
    let overlapping = store
        .find_overlapping_appointments(professional_id, start, end)
        .await?;

    if let Some(existing) = overlapping.first() {
        warn!(
            "Slot {} - {} for professional {} overlaps appointment {}",
            start, end, professional_id, existing.id
        );
        return Err(AppointmentError::Conflict(
            "This time slot is no longer available".to_string(),
        ));
    }

    debug!("Slot {} - {} is free for professional {}", start, end, professional_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_professional_waits_for_the_guard() {
        let locks = Arc::new(ProfessionalLocks::new());
        let pro = Uuid::new_v4();

        let guard = locks.acquire(pro).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(pro).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_professionals_do_not_contend() {
        let locks = ProfessionalLocks::new();

        let _first = locks.acquire(Uuid::new_v4()).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Uuid::new_v4())).await;

        assert!(second.is_ok());
    }
}
