pub mod cancel;
pub mod notify;
pub mod reserve;

pub use cancel::{CancelCommand, CancelReceipt, CancellationManager};
pub use notify::{BookingConfirmation, ConfirmationSender, HttpMailer, NotifyError};
pub use reserve::{ReservationManager, ReserveCommand, ReserveReceipt};
