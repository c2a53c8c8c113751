use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use skyfare_core::penalty::compute_refund;
use skyfare_core::repository::{BookingStore, BookingTx};
use skyfare_core::{BookingError, Cancellation, OfferingKey, StoreError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelCommand {
    pub customer_id: String,
    #[serde(flatten)]
    pub key: OfferingKey,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelReceipt {
    pub refund_amount: i64,
    pub penalty: i64,
    pub cancelled_at: NaiveDateTime,
}

/// Runs the cancellation transaction: reservation lookup, double-cancel
/// guard, past-departure guard, penalty computation, cancellation insert,
/// commit. The reservation row itself is never touched; the cancellation
/// record is what voids it.
pub struct CancellationManager {
    store: Arc<dyn BookingStore>,
}

impl CancellationManager {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn cancel(&self, cmd: &CancelCommand) -> Result<CancelReceipt, BookingError> {
        self.cancel_as_of(cmd, Utc::now().date_naive()).await
    }

    /// Same as [`cancel`](Self::cancel) with an explicit "today", so the
    /// day-based penalty schedule can be exercised deterministically.
    pub async fn cancel_as_of(
        &self,
        cmd: &CancelCommand,
        today: NaiveDate,
    ) -> Result<CancelReceipt, BookingError> {
        let mut tx = self.store.begin().await?;

        match Self::try_cancel(tx.as_mut(), cmd, today).await {
            Ok(receipt) => {
                tx.commit().await?;
                info!(
                    flight = %cmd.key.flight_number,
                    customer = %cmd.customer_id,
                    refund = receipt.refund_amount,
                    "cancellation committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("rollback after failed cancellation also failed: {}", rollback_err);
                }
                info!(
                    flight = %cmd.key.flight_number,
                    customer = %cmd.customer_id,
                    "cancellation rejected: {}",
                    err
                );
                Err(err)
            }
        }
    }

    async fn try_cancel(
        tx: &mut dyn BookingTx,
        cmd: &CancelCommand,
        today: NaiveDate,
    ) -> Result<CancelReceipt, BookingError> {
        let reservation = tx
            .latest_reservation(&cmd.customer_id, &cmd.key)
            .await?
            .ok_or(BookingError::ReservationNotFound)?;

        if tx.is_cancelled(reservation.id).await? {
            return Err(BookingError::AlreadyCancelled);
        }

        // Date-only comparison: a flight departing later today is still
        // cancellable (at full penalty).
        let departure_date = reservation.key.departure_date_time.date();
        if departure_date < today {
            return Err(BookingError::DepartedAlready);
        }

        let breakdown = compute_refund(reservation.payment_amount, departure_date, today);

        let cancellation = Cancellation {
            reservation_id: reservation.id,
            refund_amount: breakdown.refund,
            cancelled_at: Utc::now().naive_utc(),
        };
        tx.insert_cancellation(&cancellation)
            .await
            .map_err(|err| match err {
                StoreError::Constraint(_) => BookingError::AlreadyCancelled,
                other => BookingError::Persistence(other),
            })?;

        Ok(CancelReceipt {
            refund_amount: breakdown.refund,
            penalty: breakdown.penalty,
            cancelled_at: cancellation.cancelled_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use skyfare_core::{Reservation, SeatOffering};
    use skyfare_store::InMemoryStore;
    use uuid::Uuid;

    const PAYMENT: i64 = 300_000;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn key_departing_in(days_ahead: i64) -> OfferingKey {
        let date = if days_ahead >= 0 {
            today().checked_add_days(Days::new(days_ahead as u64)).unwrap()
        } else {
            today()
                .checked_sub_days(Days::new((-days_ahead) as u64))
                .unwrap()
        };
        OfferingKey {
            flight_number: "SF101".into(),
            departure_date_time: date.and_hms_opt(9, 0, 0).unwrap(),
            seat_class: "economy".into(),
        }
    }

    async fn store_with_reservation(key: &OfferingKey) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_offering(SeatOffering {
                key: key.clone(),
                price: PAYMENT,
                total_seat_capacity: 5,
            })
            .await;

        let mut tx = skyfare_core::repository::BookingStore::begin(store.as_ref())
            .await
            .unwrap();
        tx.insert_reservation(&Reservation {
            id: Uuid::new_v4(),
            customer_id: "c1".into(),
            key: key.clone(),
            payment_amount: PAYMENT,
            reserved_at: today().and_hms_opt(8, 0, 0).unwrap(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
        store
    }

    fn command(key: &OfferingKey) -> CancelCommand {
        CancelCommand {
            customer_id: "c1".into(),
            key: key.clone(),
        }
    }

    #[tokio::test]
    async fn cancelling_an_unreserved_key_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = CancellationManager::new(store);

        let err = mgr
            .cancel_as_of(&command(&key_departing_in(5)), today())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ReservationNotFound));
    }

    #[tokio::test]
    async fn second_cancellation_is_rejected() {
        let key = key_departing_in(5);
        let store = store_with_reservation(&key).await;
        let mgr = CancellationManager::new(store.clone());

        mgr.cancel_as_of(&command(&key), today()).await.unwrap();
        let err = mgr
            .cancel_as_of(&command(&key), today())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::AlreadyCancelled));
        assert_eq!(store.cancellation_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn departed_flights_cannot_be_cancelled() {
        let key = key_departing_in(-1);
        let store = store_with_reservation(&key).await;
        let mgr = CancellationManager::new(store.clone());

        let err = mgr
            .cancel_as_of(&command(&key), today())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::DepartedAlready));
        assert!(store.cancellation_rows().await.is_empty());
    }

    #[tokio::test]
    async fn same_day_cancellation_refunds_nothing() {
        let key = key_departing_in(0);
        let store = store_with_reservation(&key).await;
        let mgr = CancellationManager::new(store);

        let receipt = mgr.cancel_as_of(&command(&key), today()).await.unwrap();
        assert_eq!(receipt.penalty, PAYMENT);
        assert_eq!(receipt.refund_amount, 0);
    }

    #[tokio::test]
    async fn refund_follows_the_day_based_schedule() {
        for (days_ahead, penalty) in [(3, 250_000), (4, 180_000), (14, 180_000), (15, 150_000)] {
            let key = key_departing_in(days_ahead);
            let store = store_with_reservation(&key).await;
            let mgr = CancellationManager::new(store);

            let receipt = mgr.cancel_as_of(&command(&key), today()).await.unwrap();
            assert_eq!(receipt.penalty, penalty, "departure in {days_ahead} days");
            assert_eq!(receipt.refund_amount, PAYMENT - penalty);
        }
    }

    #[tokio::test]
    async fn reservation_row_survives_cancellation() {
        let key = key_departing_in(10);
        let store = store_with_reservation(&key).await;
        let before = store.reservation_rows().await;

        let mgr = CancellationManager::new(store.clone());
        mgr.cancel_as_of(&command(&key), today()).await.unwrap();

        let after = store.reservation_rows().await;
        assert_eq!(before.len(), after.len());
        assert_eq!(before[0].id, after[0].id);
        assert_eq!(before[0].payment_amount, after[0].payment_amount);
    }

    #[tokio::test]
    async fn cancelled_key_can_be_booked_again_and_cancelled_again() {
        let key = key_departing_in(10);
        let store = store_with_reservation(&key).await;
        let mgr = CancellationManager::new(store.clone());

        mgr.cancel_as_of(&command(&key), today()).await.unwrap();

        // Re-book the same key after cancellation.
        let mut tx = skyfare_core::repository::BookingStore::begin(store.as_ref())
            .await
            .unwrap();
        tx.insert_reservation(&Reservation {
            id: Uuid::new_v4(),
            customer_id: "c1".into(),
            key: key.clone(),
            payment_amount: PAYMENT,
            reserved_at: today().and_hms_opt(12, 0, 0).unwrap(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let receipt = mgr.cancel_as_of(&command(&key), today()).await.unwrap();
        assert_eq!(receipt.penalty, 180_000);
        assert_eq!(store.cancellation_rows().await.len(), 2);
    }
}
