use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Cancellation, Customer, FlightOffer, FlightQuery, OfferingKey, Reservation};

/// Read-only flight lookup. No side effects; an empty result is a valid
/// answer, not an error.
#[async_trait]
pub trait FlightCatalog: Send + Sync {
    async fn find_flights(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, StoreError>;

    /// Distinct airport codes appearing as either endpoint of any flight.
    async fn list_airports(&self) -> Result<Vec<String>, StoreError>;
}

/// Entry point for the booking transaction managers. Each call to `begin`
/// opens one atomic unit of work; nothing is visible to other requests until
/// `commit`.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError>;
}

/// One in-progress booking transaction. Dropping without `commit` must leave
/// no trace (backends roll back on drop as well as on explicit `rollback`).
#[async_trait]
pub trait BookingTx: Send {
    /// Locks the seat offering row exclusively and returns its remaining
    /// seat count (capacity minus active reservations), or `None` when no
    /// such offering exists. The lock is held until commit or rollback,
    /// serializing every reservation attempt against this key.
    async fn lock_remaining_seats(&mut self, key: &OfferingKey) -> Result<Option<i64>, StoreError>;

    /// The most recently created reservation for (customer, key), cancelled
    /// or not.
    async fn latest_reservation(
        &mut self,
        customer_id: &str,
        key: &OfferingKey,
    ) -> Result<Option<Reservation>, StoreError>;

    async fn is_cancelled(&mut self, reservation_id: Uuid) -> Result<bool, StoreError>;

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError>;

    async fn insert_cancellation(&mut self, cancellation: &Cancellation) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Customer records and credential checks. Identity established here is
/// passed into the booking core explicitly; the core never reads ambient
/// session state.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// `Some(customer)` when the id exists and the password matches.
    async fn verify_credentials(
        &self,
        customer_id: &str,
        password: &str,
    ) -> Result<Option<Customer>, StoreError>;

    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, StoreError>;

    async fn set_passport_number(
        &self,
        customer_id: &str,
        passport_number: &str,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationHistoryEntry {
    pub airline: String,
    #[serde(flatten)]
    pub key: OfferingKey,
    pub arrival_date_time: NaiveDateTime,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub payment_amount: i64,
    pub reserved_at: NaiveDateTime,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationHistoryEntry {
    pub airline: String,
    #[serde(flatten)]
    pub key: OfferingKey,
    pub payment_amount: i64,
    pub refund_amount: i64,
    pub cancelled_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirlineSales {
    pub airline: String,
    pub total_reservations: i64,
    pub total_sales: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRanking {
    pub rank: i64,
    pub customer_id: String,
    pub customer_name: String,
    pub total_spent: i64,
    pub tier: CustomerTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerTier {
    Vip,
    Gold,
    Silver,
    Bronze,
}

impl CustomerTier {
    /// Tier thresholds over cumulative payment.
    pub fn from_total_spent(total: i64) -> Self {
        match total {
            t if t >= 1_000_000 => CustomerTier::Vip,
            t if t >= 500_000 => CustomerTier::Gold,
            t if t >= 200_000 => CustomerTier::Silver,
            _ => CustomerTier::Bronze,
        }
    }
}

/// Per-customer history views and the aggregate admin reports.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn reservations_for(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ReservationHistoryEntry>, StoreError>;

    async fn cancellations_for(
        &self,
        customer_id: &str,
    ) -> Result<Vec<CancellationHistoryEntry>, StoreError>;

    /// Per-airline reservation count and sales total, largest sales first.
    async fn airline_sales(&self) -> Result<Vec<AirlineSales>, StoreError>;

    /// Customers ranked by cumulative payment, admin accounts excluded.
    async fn customer_ranking(&self) -> Result<Vec<CustomerRanking>, StoreError>;
}
