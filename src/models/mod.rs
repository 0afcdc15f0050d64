pub mod booking;
pub mod payment;

pub use booking::{
    Booking, BookingPaymentStatus, BookingStatus, Location, LocationKind, Receiver, StatusEvent,
    STEPS,
};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
