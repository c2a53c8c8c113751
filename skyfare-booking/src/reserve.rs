use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use skyfare_core::repository::{BookingStore, BookingTx};
use skyfare_core::{BookingError, OfferingKey, Reservation, StoreError};

use crate::notify::{BookingConfirmation, ConfirmationSender};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveCommand {
    pub customer_id: String,
    pub customer_email: String,
    #[serde(flatten)]
    pub key: OfferingKey,
    pub payment_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveReceipt {
    pub email: String,
    pub payment_amount: i64,
    pub reserved_at: NaiveDateTime,
}

/// Runs the reservation transaction: availability check under an exclusive
/// offering lock, duplicate guard, insert, synchronous confirmation send,
/// then commit. Every failure path rolls the transaction back, so a
/// reservation only exists once its confirmation was deliverable.
pub struct ReservationManager {
    store: Arc<dyn BookingStore>,
    sender: Arc<dyn ConfirmationSender>,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn BookingStore>, sender: Arc<dyn ConfirmationSender>) -> Self {
        Self { store, sender }
    }

    pub async fn reserve(&self, cmd: &ReserveCommand) -> Result<ReserveReceipt, BookingError> {
        let mut tx = self.store.begin().await?;

        match self.try_reserve(tx.as_mut(), cmd).await {
            Ok(receipt) => {
                tx.commit().await?;
                info!(
                    flight = %cmd.key.flight_number,
                    seat_class = %cmd.key.seat_class,
                    customer = %cmd.customer_id,
                    "reservation committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("rollback after failed reservation also failed: {}", rollback_err);
                }
                info!(
                    flight = %cmd.key.flight_number,
                    customer = %cmd.customer_id,
                    "reservation rejected: {}",
                    err
                );
                Err(err)
            }
        }
    }

    async fn try_reserve(
        &self,
        tx: &mut dyn BookingTx,
        cmd: &ReserveCommand,
    ) -> Result<ReserveReceipt, BookingError> {
        // Exclusive lock on the offering row; the remaining-seats read and
        // the insert below are observed atomically by every other
        // reservation attempt for this key.
        let remaining = tx
            .lock_remaining_seats(&cmd.key)
            .await?
            .unwrap_or(0);
        if remaining <= 0 {
            return Err(BookingError::SeatsUnavailable);
        }

        // An earlier reservation only blocks re-booking while it is active;
        // a cancelled one releases the key.
        if let Some(previous) = tx.latest_reservation(&cmd.customer_id, &cmd.key).await? {
            if !tx.is_cancelled(previous.id).await? {
                return Err(BookingError::DuplicateReservation);
            }
        }

        let reservation = Reservation {
            id: Uuid::new_v4(),
            customer_id: cmd.customer_id.clone(),
            key: cmd.key.clone(),
            payment_amount: cmd.payment_amount,
            reserved_at: Utc::now().naive_utc(),
        };
        tx.insert_reservation(&reservation)
            .await
            .map_err(|err| match err {
                StoreError::Constraint(_) => BookingError::DuplicateReservation,
                other => BookingError::Persistence(other),
            })?;

        // The confirmation send is deliberately inside the transaction: if
        // it cannot be delivered, the insert above is undone.
        let details = BookingConfirmation {
            flight_number: cmd.key.flight_number.clone(),
            departure_date_time: cmd.key.departure_date_time,
            seat_class: cmd.key.seat_class.clone(),
            payment_amount: cmd.payment_amount,
        };
        self.sender
            .send_confirmation(&cmd.customer_email, &details)
            .await
            .map_err(|_| BookingError::NotificationFailed)?;

        Ok(ReserveReceipt {
            email: cmd.customer_email.clone(),
            payment_amount: cmd.payment_amount,
            reserved_at: reservation.reserved_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use skyfare_store::InMemoryStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubSender {
        fail: AtomicBool,
        sent: AtomicUsize,
    }

    #[async_trait]
    impl ConfirmationSender for StubSender {
        async fn send_confirmation(
            &self,
            _email: &str,
            _details: &BookingConfirmation,
        ) -> Result<(), NotifyError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(NotifyError::Transport("stub failure".into()));
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn key() -> OfferingKey {
        OfferingKey {
            flight_number: "SF101".into(),
            departure_date_time: NaiveDate::from_ymd_opt(2025, 7, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            seat_class: "economy".into(),
        }
    }

    fn command(customer: &str) -> ReserveCommand {
        ReserveCommand {
            customer_id: customer.into(),
            customer_email: format!("{customer}@example.com"),
            key: key(),
            payment_amount: 300_000,
        }
    }

    async fn store_with_capacity(capacity: i32) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_offering(skyfare_core::SeatOffering {
                key: key(),
                price: 300_000,
                total_seat_capacity: capacity,
            })
            .await;
        store
    }

    fn manager(store: Arc<InMemoryStore>, sender: Arc<StubSender>) -> ReservationManager {
        ReservationManager::new(store, sender)
    }

    #[tokio::test]
    async fn successful_reservation_returns_receipt_and_persists() {
        let store = store_with_capacity(2).await;
        let sender = Arc::new(StubSender::default());
        let mgr = manager(store.clone(), sender.clone());

        let receipt = mgr.reserve(&command("c1")).await.unwrap();
        assert_eq!(receipt.email, "c1@example.com");
        assert_eq!(receipt.payment_amount, 300_000);
        assert_eq!(sender.sent.load(Ordering::SeqCst), 1);
        assert_eq!(store.reservation_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn full_flight_is_rejected_and_stays_rejected() {
        let store = store_with_capacity(1).await;
        let sender = Arc::new(StubSender::default());
        let mgr = manager(store.clone(), sender);

        mgr.reserve(&command("c1")).await.unwrap();

        for _ in 0..2 {
            let err = mgr.reserve(&command("c2")).await.unwrap_err();
            assert!(matches!(err, BookingError::SeatsUnavailable));
        }
        assert_eq!(store.reservation_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_offering_reads_as_no_seats() {
        let store = Arc::new(InMemoryStore::new());
        let mgr = manager(store, Arc::new(StubSender::default()));

        let err = mgr.reserve(&command("c1")).await.unwrap_err();
        assert!(matches!(err, BookingError::SeatsUnavailable));
    }

    #[tokio::test]
    async fn double_booking_the_same_key_is_rejected() {
        let store = store_with_capacity(5).await;
        let mgr = manager(store.clone(), Arc::new(StubSender::default()));

        mgr.reserve(&command("c1")).await.unwrap();
        let err = mgr.reserve(&command("c1")).await.unwrap_err();
        assert!(matches!(err, BookingError::DuplicateReservation));
        assert_eq!(store.reservation_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn notification_failure_rolls_back_the_insert() {
        let store = store_with_capacity(5).await;
        let sender = Arc::new(StubSender::default());
        sender.fail.store(true, Ordering::SeqCst);
        let mgr = manager(store.clone(), sender.clone());

        let err = mgr.reserve(&command("c1")).await.unwrap_err();
        assert!(matches!(err, BookingError::NotificationFailed));
        assert!(store.reservation_rows().await.is_empty());

        // The key is free again: the retry must succeed rather than trip the
        // duplicate guard.
        sender.fail.store(false, Ordering::SeqCst);
        mgr.reserve(&command("c1")).await.unwrap();
        assert_eq!(store.reservation_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn two_racers_for_the_last_seat_yield_one_winner() {
        let store = store_with_capacity(1).await;
        let mgr = Arc::new(manager(store.clone(), Arc::new(StubSender::default())));

        let a = tokio::spawn({
            let mgr = mgr.clone();
            async move { mgr.reserve(&command("c1")).await }
        });
        let b = tokio::spawn({
            let mgr = mgr.clone();
            async move { mgr.reserve(&command("c2")).await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(BookingError::SeatsUnavailable))));
        assert_eq!(store.reservation_rows().await.len(), 1);
    }
}
