use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use skyfare_core::repository::{BookingStore, BookingTx};
use skyfare_core::{Cancellation, OfferingKey, Reservation, StoreError};

use crate::database::map_sqlx;

/// Postgres unit-of-work backend for the booking managers. Seat-count
/// serialization rides on `SELECT ... FOR UPDATE` of the offering row, held
/// from the availability check until commit or rollback.
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError> {
        let tx = self.pool.begin().await.map_err(map_sqlx)?;
        Ok(Box::new(PgBookingTx { tx }))
    }
}

struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    customer_id: String,
    flight_number: String,
    departure_at: NaiveDateTime,
    seat_class: String,
    payment_amount: i64,
    reserved_at: NaiveDateTime,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            id: row.id,
            customer_id: row.customer_id,
            key: OfferingKey {
                flight_number: row.flight_number,
                departure_date_time: row.departure_at,
                seat_class: row.seat_class,
            },
            payment_amount: row.payment_amount,
            reserved_at: row.reserved_at,
        }
    }
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn lock_remaining_seats(&mut self, key: &OfferingKey) -> Result<Option<i64>, StoreError> {
        // Remaining = capacity minus reservations that have no matching
        // cancellation. FOR UPDATE OF s blocks every other reservation
        // transaction for this offering until we commit or roll back.
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT s.total_seat_capacity::BIGINT - (
                SELECT COUNT(*)
                FROM reservations r
                WHERE r.flight_number = s.flight_number
                  AND r.departure_at = s.departure_at
                  AND r.seat_class = s.seat_class
                  AND NOT EXISTS (
                      SELECT 1 FROM cancellations c WHERE c.reservation_id = r.id
                  )
            )
            FROM seat_offerings s
            WHERE s.flight_number = $1 AND s.departure_at = $2 AND s.seat_class = $3
            FOR UPDATE OF s
            "#,
        )
        .bind(&key.flight_number)
        .bind(key.departure_date_time)
        .bind(&key.seat_class)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(remaining)
    }

    async fn latest_reservation(
        &mut self,
        customer_id: &str,
        key: &OfferingKey,
    ) -> Result<Option<Reservation>, StoreError> {
        let row: Option<ReservationRow> = sqlx::query_as(
            r#"
            SELECT id, customer_id, flight_number, departure_at, seat_class,
                   payment_amount, reserved_at
            FROM reservations
            WHERE customer_id = $1
              AND flight_number = $2
              AND departure_at = $3
              AND seat_class = $4
            ORDER BY reserved_at DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .bind(&key.flight_number)
        .bind(key.departure_date_time)
        .bind(&key.seat_class)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(Reservation::from))
    }

    async fn is_cancelled(&mut self, reservation_id: Uuid) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cancellations WHERE reservation_id = $1",
        )
        .bind(reservation_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(count > 0)
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, customer_id, flight_number, departure_at, seat_class,
                 payment_amount, reserved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reservation.id)
        .bind(&reservation.customer_id)
        .bind(&reservation.key.flight_number)
        .bind(reservation.key.departure_date_time)
        .bind(&reservation.key.seat_class)
        .bind(reservation.payment_amount)
        .bind(reservation.reserved_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn insert_cancellation(&mut self, cancellation: &Cancellation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cancellations (reservation_id, refund_amount, cancelled_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(cancellation.reservation_id)
        .bind(cancellation.refund_amount)
        .bind(cancellation.cancelled_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(map_sqlx)
    }
}
