use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use skyfare_core::repository::FlightCatalog;
use skyfare_core::{FlightOffer, FlightQuery, SortKey, StoreError};

use crate::database::map_sqlx;

pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OfferRow {
    airline: String,
    flight_number: String,
    departure_at: NaiveDateTime,
    arrival_at: NaiveDateTime,
    departure_airport: String,
    arrival_airport: String,
    seat_class: String,
    price: i64,
    remaining_seats: i64,
}

#[async_trait]
impl FlightCatalog for PostgresCatalog {
    async fn find_flights(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, StoreError> {
        // Plain read without locks; the reservation path re-checks
        // availability under its own lock, so a stale count here is harmless.
        let order_by = match query.sort {
            SortKey::Price => "s.price ASC, f.departure_at ASC",
            SortKey::DepartureTime => "f.departure_at ASC, s.price ASC",
        };

        let sql = format!(
            r#"
            SELECT f.airline, f.flight_number, f.departure_at, f.arrival_at,
                   f.departure_airport, f.arrival_airport,
                   s.seat_class, s.price,
                   s.total_seat_capacity::BIGINT - (
                       SELECT COUNT(*)
                       FROM reservations r
                       WHERE r.flight_number = s.flight_number
                         AND r.departure_at = s.departure_at
                         AND r.seat_class = s.seat_class
                         AND NOT EXISTS (
                             SELECT 1 FROM cancellations c
                             WHERE c.reservation_id = r.id
                         )
                   ) AS remaining_seats
            FROM flights f
            JOIN seat_offerings s
              ON f.flight_number = s.flight_number AND f.departure_at = s.departure_at
            WHERE f.departure_airport = $1
              AND f.arrival_airport = $2
              AND f.departure_at::DATE = $3
              AND s.seat_class = $4
            ORDER BY {order_by}
            "#
        );

        let rows: Vec<OfferRow> = sqlx::query_as(&sql)
            .bind(&query.departure_airport)
            .bind(&query.arrival_airport)
            .bind(query.date)
            .bind(&query.seat_class)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| FlightOffer {
                airline: row.airline,
                flight_number: row.flight_number,
                departure_date_time: row.departure_at,
                arrival_date_time: row.arrival_at,
                departure_airport: row.departure_airport,
                arrival_airport: row.arrival_airport,
                seat_class: row.seat_class,
                price: row.price,
                remaining_seats: row.remaining_seats,
            })
            .collect())
    }

    async fn list_airports(&self) -> Result<Vec<String>, StoreError> {
        let codes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT departure_airport AS code FROM flights
            UNION
            SELECT DISTINCT arrival_airport AS code FROM flights
            ORDER BY code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(codes)
    }
}
