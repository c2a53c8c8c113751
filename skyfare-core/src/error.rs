use thiserror::Error;

/// Failures surfaced by the storage layer. Everything that is not a
/// recognized constraint conflict collapses into `Database`; callers treat
/// it as a generic persistence error and do not retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    /// A unique or foreign-key constraint rejected a write. Kept separate so
    /// the transaction managers can map the constraint backstop onto the
    /// matching business error instead of a generic one.
    #[error("constraint violation: {0}")]
    Constraint(String),
}

/// Business-level outcome taxonomy for the booking core. Every variant is
/// recovered at the transaction boundary: the in-progress transaction is
/// rolled back and the message becomes the user-facing failure text.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("no seats are available on this flight; please choose another")]
    SeatsUnavailable,

    #[error("this flight is already reserved; see your booking history")]
    DuplicateReservation,

    #[error("the confirmation email could not be sent, so the reservation was not kept")]
    NotificationFailed,

    #[error("no matching reservation was found")]
    ReservationNotFound,

    #[error("this reservation has already been cancelled")]
    AlreadyCancelled,

    #[error("flights that have already departed cannot be cancelled")]
    DepartedAlready,

    #[error("a storage failure interrupted the request; nothing was changed")]
    Persistence(#[source] StoreError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        BookingError::Persistence(err)
    }
}
