pub mod bookings;
pub mod payments;
pub mod provider;
pub mod status;
pub mod tracking;
