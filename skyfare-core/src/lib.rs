pub mod error;
pub mod model;
pub mod penalty;
pub mod repository;

pub use error::{BookingError, StoreError};
pub use model::{
    Cancellation, Customer, Flight, FlightOffer, FlightQuery, OfferingKey, Reservation,
    SeatOffering, SortKey,
};
