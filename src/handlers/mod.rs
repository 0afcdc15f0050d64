pub mod bookings;
pub mod health;
pub mod payments;
