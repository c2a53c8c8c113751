use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use skyfare_core::repository::{
    AirlineSales, CancellationHistoryEntry, CustomerRanking, CustomerTier, HistoryRepository,
    ReservationHistoryEntry,
};
use skyfare_core::{OfferingKey, StoreError};

use crate::database::map_sqlx;

pub struct PostgresHistory {
    pool: PgPool,
}

impl PostgresHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationHistoryRow {
    airline: String,
    flight_number: String,
    departure_at: NaiveDateTime,
    seat_class: String,
    arrival_at: NaiveDateTime,
    departure_airport: String,
    arrival_airport: String,
    payment_amount: i64,
    reserved_at: NaiveDateTime,
    cancelled: bool,
}

#[derive(sqlx::FromRow)]
struct CancellationHistoryRow {
    airline: String,
    flight_number: String,
    departure_at: NaiveDateTime,
    seat_class: String,
    payment_amount: i64,
    refund_amount: i64,
    cancelled_at: NaiveDateTime,
}

#[derive(sqlx::FromRow)]
struct AirlineSalesRow {
    airline: String,
    total_reservations: i64,
    total_sales: i64,
}

#[derive(sqlx::FromRow)]
struct RankingRow {
    rank: i64,
    customer_id: String,
    customer_name: String,
    total_spent: i64,
}

#[async_trait]
impl HistoryRepository for PostgresHistory {
    async fn reservations_for(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ReservationHistoryEntry>, StoreError> {
        let rows: Vec<ReservationHistoryRow> = sqlx::query_as(
            r#"
            SELECT f.airline, r.flight_number, r.departure_at, r.seat_class,
                   f.arrival_at, f.departure_airport, f.arrival_airport,
                   r.payment_amount, r.reserved_at,
                   EXISTS (
                       SELECT 1 FROM cancellations c WHERE c.reservation_id = r.id
                   ) AS cancelled
            FROM reservations r
            JOIN flights f
              ON f.flight_number = r.flight_number AND f.departure_at = r.departure_at
            WHERE r.customer_id = $1
            ORDER BY r.reserved_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| ReservationHistoryEntry {
                airline: row.airline,
                key: OfferingKey {
                    flight_number: row.flight_number,
                    departure_date_time: row.departure_at,
                    seat_class: row.seat_class,
                },
                arrival_date_time: row.arrival_at,
                departure_airport: row.departure_airport,
                arrival_airport: row.arrival_airport,
                payment_amount: row.payment_amount,
                reserved_at: row.reserved_at,
                cancelled: row.cancelled,
            })
            .collect())
    }

    async fn cancellations_for(
        &self,
        customer_id: &str,
    ) -> Result<Vec<CancellationHistoryEntry>, StoreError> {
        let rows: Vec<CancellationHistoryRow> = sqlx::query_as(
            r#"
            SELECT f.airline, r.flight_number, r.departure_at, r.seat_class,
                   r.payment_amount, c.refund_amount, c.cancelled_at
            FROM cancellations c
            JOIN reservations r ON r.id = c.reservation_id
            JOIN flights f
              ON f.flight_number = r.flight_number AND f.departure_at = r.departure_at
            WHERE r.customer_id = $1
            ORDER BY c.cancelled_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| CancellationHistoryEntry {
                airline: row.airline,
                key: OfferingKey {
                    flight_number: row.flight_number,
                    departure_date_time: row.departure_at,
                    seat_class: row.seat_class,
                },
                payment_amount: row.payment_amount,
                refund_amount: row.refund_amount,
                cancelled_at: row.cancelled_at,
            })
            .collect())
    }

    async fn airline_sales(&self) -> Result<Vec<AirlineSales>, StoreError> {
        let rows: Vec<AirlineSalesRow> = sqlx::query_as(
            r#"
            SELECT f.airline,
                   COUNT(*) AS total_reservations,
                   COALESCE(SUM(r.payment_amount), 0)::BIGINT AS total_sales
            FROM flights f
            JOIN reservations r
              ON f.flight_number = r.flight_number AND f.departure_at = r.departure_at
            GROUP BY f.airline
            ORDER BY total_sales DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| AirlineSales {
                airline: row.airline,
                total_reservations: row.total_reservations,
                total_sales: row.total_sales,
            })
            .collect())
    }

    async fn customer_ranking(&self) -> Result<Vec<CustomerRanking>, StoreError> {
        let rows: Vec<RankingRow> = sqlx::query_as(
            r#"
            SELECT RANK() OVER (ORDER BY totals.total_spent DESC) AS rank,
                   cu.customer_id,
                   cu.name AS customer_name,
                   totals.total_spent
            FROM customers cu
            JOIN (
                SELECT r.customer_id, SUM(r.payment_amount)::BIGINT AS total_spent
                FROM reservations r
                GROUP BY r.customer_id
            ) totals ON totals.customer_id = cu.customer_id
            WHERE cu.is_admin = FALSE
            ORDER BY rank ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| CustomerRanking {
                rank: row.rank,
                customer_id: row.customer_id,
                customer_name: row.customer_name,
                tier: CustomerTier::from_total_spent(row.total_spent),
                total_spent: row.total_spent,
            })
            .collect())
    }
}
