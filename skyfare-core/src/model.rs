use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a sellable seat offering: one (flight, departure, class)
/// combination with finite capacity. All reservation-path locking is scoped
/// to this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingKey {
    pub flight_number: String,
    pub departure_date_time: NaiveDateTime,
    pub seat_class: String,
}

/// Immutable flight reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub flight_number: String,
    pub departure_date_time: NaiveDateTime,
    pub airline: String,
    pub arrival_date_time: NaiveDateTime,
    pub departure_airport: String,
    pub arrival_airport: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatOffering {
    pub key: OfferingKey,
    pub price: i64,
    pub total_seat_capacity: i32,
}

/// A committed booking fact. Never mutated or deleted; a cancellation is a
/// companion record, so "active" means no cancellations row references `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub customer_id: String,
    #[serde(flatten)]
    pub key: OfferingKey,
    pub payment_amount: i64,
    pub reserved_at: NaiveDateTime,
}

/// A committed cancellation fact, one per reservation at most.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub reservation_id: Uuid,
    pub refund_amount: i64,
    pub cancelled_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub passport_number: Option<String>,
    pub is_admin: bool,
}

/// Sort order for catalog searches. Unspecified input defaults to price
/// ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Price,
    #[serde(alias = "time")]
    DepartureTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightQuery {
    pub departure_airport: String,
    pub arrival_airport: String,
    pub date: NaiveDate,
    pub seat_class: String,
    #[serde(default)]
    pub sort: SortKey,
}

/// One row of a catalog search result, remaining seats already computed
/// (capacity minus active reservations).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    pub airline: String,
    pub flight_number: String,
    pub departure_date_time: NaiveDateTime,
    pub arrival_date_time: NaiveDateTime,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub seat_class: String,
    pub price: i64,
    pub remaining_seats: i64,
}
