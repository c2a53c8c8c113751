//! In-memory store backend. Implements every repository trait so the
//! managers and the HTTP surface can run without Postgres; used by the test
//! suites and local demos. One store-wide async mutex stands in for
//! row-level locking, which is coarser than the Postgres backend but keeps
//! the same observable semantics: a transaction holds the lock from `begin`
//! until commit or rollback, and staged writes are invisible until commit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use skyfare_core::repository::{
    AirlineSales, BookingStore, BookingTx, CancellationHistoryEntry, CustomerDirectory,
    CustomerRanking, CustomerTier, FlightCatalog, HistoryRepository, ReservationHistoryEntry,
};
use skyfare_core::{
    Cancellation, Customer, Flight, FlightOffer, FlightQuery, OfferingKey, Reservation,
    SeatOffering, SortKey, StoreError,
};

#[derive(Default)]
struct MemState {
    flights: Vec<Flight>,
    offerings: HashMap<OfferingKey, SeatOffering>,
    customers: HashMap<String, Customer>,
    passwords: HashMap<String, String>,
    reservations: Vec<Reservation>,
    cancellations: Vec<Cancellation>,
}

impl MemState {
    fn is_cancelled(&self, reservation_id: Uuid) -> bool {
        self.cancellations
            .iter()
            .any(|c| c.reservation_id == reservation_id)
    }

    fn active_count(&self, key: &OfferingKey) -> i64 {
        self.reservations
            .iter()
            .filter(|r| &r.key == key && !self.is_cancelled(r.id))
            .count() as i64
    }

    fn flight_for(&self, key: &OfferingKey) -> Option<&Flight> {
        self.flights.iter().find(|f| {
            f.flight_number == key.flight_number
                && f.departure_date_time == key.departure_date_time
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_flight(&self, flight: Flight) {
        self.state.lock().await.flights.push(flight);
    }

    pub async fn add_offering(&self, offering: SeatOffering) {
        self.state
            .lock()
            .await
            .offerings
            .insert(offering.key.clone(), offering);
    }

    pub async fn add_customer(&self, customer: Customer, password: &str) {
        let mut state = self.state.lock().await;
        state
            .passwords
            .insert(customer.customer_id.clone(), password.to_owned());
        state.customers.insert(customer.customer_id.clone(), customer);
    }

    /// Snapshot of all reservation rows, for assertions on append-only
    /// behavior.
    pub async fn reservation_rows(&self) -> Vec<Reservation> {
        self.state.lock().await.reservations.clone()
    }

    pub async fn cancellation_rows(&self) -> Vec<Cancellation> {
        self.state.lock().await.cancellations.clone()
    }
}

// ============================================================================
// Booking unit of work
// ============================================================================

struct MemBookingTx {
    guard: OwnedMutexGuard<MemState>,
    staged_reservations: Vec<Reservation>,
    staged_cancellations: Vec<Cancellation>,
}

impl MemBookingTx {
    fn is_cancelled_anywhere(&self, reservation_id: Uuid) -> bool {
        self.guard.is_cancelled(reservation_id)
            || self
                .staged_cancellations
                .iter()
                .any(|c| c.reservation_id == reservation_id)
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemBookingTx {
            guard,
            staged_reservations: Vec::new(),
            staged_cancellations: Vec::new(),
        }))
    }
}

#[async_trait]
impl BookingTx for MemBookingTx {
    async fn lock_remaining_seats(&mut self, key: &OfferingKey) -> Result<Option<i64>, StoreError> {
        let Some(offering) = self.guard.offerings.get(key) else {
            return Ok(None);
        };
        let capacity = i64::from(offering.total_seat_capacity);

        let staged_active = self
            .staged_reservations
            .iter()
            .filter(|r| &r.key == key && !self.is_cancelled_anywhere(r.id))
            .count() as i64;

        Ok(Some(capacity - self.guard.active_count(key) - staged_active))
    }

    async fn latest_reservation(
        &mut self,
        customer_id: &str,
        key: &OfferingKey,
    ) -> Result<Option<Reservation>, StoreError> {
        let latest = self
            .guard
            .reservations
            .iter()
            .chain(self.staged_reservations.iter())
            .filter(|r| r.customer_id == customer_id && &r.key == key)
            .max_by_key(|r| r.reserved_at)
            .cloned();
        Ok(latest)
    }

    async fn is_cancelled(&mut self, reservation_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.is_cancelled_anywhere(reservation_id))
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError> {
        self.staged_reservations.push(reservation.clone());
        Ok(())
    }

    async fn insert_cancellation(&mut self, cancellation: &Cancellation) -> Result<(), StoreError> {
        if self.is_cancelled_anywhere(cancellation.reservation_id) {
            return Err(StoreError::Constraint(
                "cancellation already recorded for this reservation".into(),
            ));
        }
        self.staged_cancellations.push(cancellation.clone());
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.guard.reservations.append(&mut self.staged_reservations);
        self.guard
            .cancellations
            .append(&mut self.staged_cancellations);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // Staged writes are discarded with the transaction.
        Ok(())
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[async_trait]
impl FlightCatalog for InMemoryStore {
    async fn find_flights(&self, query: &FlightQuery) -> Result<Vec<FlightOffer>, StoreError> {
        let state = self.state.lock().await;

        let mut offers: Vec<FlightOffer> = state
            .flights
            .iter()
            .filter(|f| {
                f.departure_airport == query.departure_airport
                    && f.arrival_airport == query.arrival_airport
                    && f.departure_date_time.date() == query.date
            })
            .filter_map(|f| {
                let key = OfferingKey {
                    flight_number: f.flight_number.clone(),
                    departure_date_time: f.departure_date_time,
                    seat_class: query.seat_class.clone(),
                };
                let offering = state.offerings.get(&key)?;
                Some(FlightOffer {
                    airline: f.airline.clone(),
                    flight_number: f.flight_number.clone(),
                    departure_date_time: f.departure_date_time,
                    arrival_date_time: f.arrival_date_time,
                    departure_airport: f.departure_airport.clone(),
                    arrival_airport: f.arrival_airport.clone(),
                    seat_class: offering.key.seat_class.clone(),
                    price: offering.price,
                    remaining_seats: i64::from(offering.total_seat_capacity)
                        - state.active_count(&key),
                })
            })
            .collect();

        match query.sort {
            SortKey::Price => offers.sort_by_key(|o| (o.price, o.departure_date_time)),
            SortKey::DepartureTime => offers.sort_by_key(|o| (o.departure_date_time, o.price)),
        }

        Ok(offers)
    }

    async fn list_airports(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().await;
        let mut codes: Vec<String> = state
            .flights
            .iter()
            .flat_map(|f| [f.departure_airport.clone(), f.arrival_airport.clone()])
            .collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }
}

// ============================================================================
// Customers
// ============================================================================

#[async_trait]
impl CustomerDirectory for InMemoryStore {
    async fn verify_credentials(
        &self,
        customer_id: &str,
        password: &str,
    ) -> Result<Option<Customer>, StoreError> {
        let state = self.state.lock().await;
        let matches = state
            .passwords
            .get(customer_id)
            .is_some_and(|stored| stored == password);
        Ok(matches
            .then(|| state.customers.get(customer_id).cloned())
            .flatten())
    }

    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, StoreError> {
        Ok(self.state.lock().await.customers.get(customer_id).cloned())
    }

    async fn set_passport_number(
        &self,
        customer_id: &str,
        passport_number: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        match state.customers.get_mut(customer_id) {
            Some(customer) => {
                customer.passport_number = Some(passport_number.to_owned());
                Ok(())
            }
            None => Err(StoreError::Constraint(format!(
                "unknown customer {customer_id}"
            ))),
        }
    }
}

// ============================================================================
// History and reports
// ============================================================================

#[async_trait]
impl HistoryRepository for InMemoryStore {
    async fn reservations_for(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ReservationHistoryEntry>, StoreError> {
        let state = self.state.lock().await;
        let mut entries: Vec<ReservationHistoryEntry> = state
            .reservations
            .iter()
            .filter(|r| r.customer_id == customer_id)
            .filter_map(|r| {
                let flight = state.flight_for(&r.key)?;
                Some(ReservationHistoryEntry {
                    airline: flight.airline.clone(),
                    key: r.key.clone(),
                    arrival_date_time: flight.arrival_date_time,
                    departure_airport: flight.departure_airport.clone(),
                    arrival_airport: flight.arrival_airport.clone(),
                    payment_amount: r.payment_amount,
                    reserved_at: r.reserved_at,
                    cancelled: state.is_cancelled(r.id),
                })
            })
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.reserved_at));
        Ok(entries)
    }

    async fn cancellations_for(
        &self,
        customer_id: &str,
    ) -> Result<Vec<CancellationHistoryEntry>, StoreError> {
        let state = self.state.lock().await;
        let mut entries: Vec<CancellationHistoryEntry> = state
            .cancellations
            .iter()
            .filter_map(|c| {
                let reservation = state
                    .reservations
                    .iter()
                    .find(|r| r.id == c.reservation_id && r.customer_id == customer_id)?;
                let flight = state.flight_for(&reservation.key)?;
                Some(CancellationHistoryEntry {
                    airline: flight.airline.clone(),
                    key: reservation.key.clone(),
                    payment_amount: reservation.payment_amount,
                    refund_amount: c.refund_amount,
                    cancelled_at: c.cancelled_at,
                })
            })
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.cancelled_at));
        Ok(entries)
    }

    async fn airline_sales(&self) -> Result<Vec<AirlineSales>, StoreError> {
        let state = self.state.lock().await;
        let mut by_airline: HashMap<String, (i64, i64)> = HashMap::new();
        for r in &state.reservations {
            let Some(flight) = state.flight_for(&r.key) else {
                continue;
            };
            let entry = by_airline.entry(flight.airline.clone()).or_default();
            entry.0 += 1;
            entry.1 += r.payment_amount;
        }
        let mut sales: Vec<AirlineSales> = by_airline
            .into_iter()
            .map(|(airline, (total_reservations, total_sales))| AirlineSales {
                airline,
                total_reservations,
                total_sales,
            })
            .collect();
        sales.sort_by_key(|s| std::cmp::Reverse(s.total_sales));
        Ok(sales)
    }

    async fn customer_ranking(&self) -> Result<Vec<CustomerRanking>, StoreError> {
        let state = self.state.lock().await;
        let mut totals: HashMap<String, i64> = HashMap::new();
        for r in &state.reservations {
            *totals.entry(r.customer_id.clone()).or_default() += r.payment_amount;
        }

        let mut ranked: Vec<(String, i64)> = totals
            .into_iter()
            .filter(|(id, _)| {
                state
                    .customers
                    .get(id)
                    .is_some_and(|customer| !customer.is_admin)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        // RANK() semantics: ties share a rank, the next rank skips ahead.
        let mut out = Vec::with_capacity(ranked.len());
        let mut rank = 0i64;
        let mut previous_total = None;
        for (position, (customer_id, total_spent)) in ranked.into_iter().enumerate() {
            if previous_total != Some(total_spent) {
                rank = position as i64 + 1;
                previous_total = Some(total_spent);
            }
            let customer_name = state
                .customers
                .get(&customer_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            out.push(CustomerRanking {
                rank,
                customer_id,
                customer_name,
                tier: CustomerTier::from_total_spent(total_spent),
                total_spent,
            });
        }
        Ok(out)
    }
}
