use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::Booking;

/// Minutes for the simulated worker to cover the dispatch-to-door leg.
const TRAVEL_MINUTES: f64 = 8.0;

/// Dispatch origin offset from the customer, in degrees.
const START_OFFSET_LAT: f64 = 0.02;
const START_OFFSET_LNG: f64 = -0.02;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPositions {
    pub worker_location: GeoPoint,
    pub customer_location: GeoPoint,
}

/// Synthesizes the worker's position along a straight line toward the
/// customer, as a pure function of elapsed time. Nothing is persisted; every
/// track request recomputes from scratch since "now" keeps moving.
pub fn compute_map_positions(booking: &Booking, now: &NaiveDateTime) -> MapPositions {
    let (lon, lat) = booking.location.coordinates;
    let customer = GeoPoint { lat, lng: lon };

    let start = GeoPoint {
        lat: customer.lat + START_OFFSET_LAT,
        lng: customer.lng + START_OFFSET_LNG,
    };

    let elapsed = (*now - booking.created_at).num_seconds() as f64 / 60.0;
    let progress = (elapsed / TRAVEL_MINUTES).clamp(0.0, 1.0);

    let worker = GeoPoint {
        lat: start.lat + (customer.lat - start.lat) * progress,
        lng: start.lng + (customer.lng - start.lng) * progress,
    };

    MapPositions {
        worker_location: worker,
        customer_location: customer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BookingPaymentStatus, BookingStatus, Location, LocationKind, StatusEvent,
    };
    use chrono::Duration;

    fn booking_at(coords: (f64, f64)) -> Booking {
        let created_at = chrono::NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Booking {
            id: "b-1".to_string(),
            customer_id: "c-1".to_string(),
            worker_id: "w-1".to_string(),
            job_id: None,
            service_name: None,
            customer_name: None,
            customer_phone: None,
            amount: 499.0,
            currency: "INR".to_string(),
            status: BookingStatus::Requested,
            location: Location {
                kind: LocationKind::Home,
                address: "42 Test Lane".to_string(),
                coordinates: coords,
            },
            receiver: None,
            eta_minutes: Some(25),
            tracking_note: None,
            payment_status: BookingPaymentStatus::Pending,
            payment_method: None,
            payment_id: None,
            status_history: vec![StatusEvent {
                status: BookingStatus::Requested,
                at: created_at,
                note: None,
                eta_minutes: Some(25),
            }],
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn worker_starts_at_offset_point() {
        let booking = booking_at((77.209, 28.6139));
        let map = compute_map_positions(&booking, &booking.created_at);

        assert_eq!(map.customer_location, GeoPoint { lat: 28.6139, lng: 77.209 });
        assert!((map.worker_location.lat - 28.6339).abs() < 1e-9);
        assert!((map.worker_location.lng - 77.189).abs() < 1e-9);
    }

    #[test]
    fn worker_reaches_customer_after_travel_window() {
        let booking = booking_at((77.209, 28.6139));
        for minutes in [8, 9, 120] {
            let now = booking.created_at + Duration::minutes(minutes);
            let map = compute_map_positions(&booking, &now);
            assert_eq!(map.worker_location, map.customer_location);
        }
    }

    #[test]
    fn approach_is_monotonic() {
        let booking = booking_at((77.209, 28.6139));
        let customer = GeoPoint { lat: 28.6139, lng: 77.209 };

        let mut last_dist = f64::MAX;
        for minutes in 0..=8 {
            let now = booking.created_at + Duration::minutes(minutes);
            let map = compute_map_positions(&booking, &now);
            let dist = (map.worker_location.lat - customer.lat).abs()
                + (map.worker_location.lng - customer.lng).abs();
            assert!(dist <= last_dist, "worker moved away at minute {minutes}");
            last_dist = dist;
        }
        assert!(last_dist.abs() < 1e-12);
    }

    #[test]
    fn midpoint_at_half_travel_time() {
        let booking = booking_at((77.0, 28.0));
        let now = booking.created_at + Duration::minutes(4);
        let map = compute_map_positions(&booking, &now);
        assert!((map.worker_location.lat - 28.01).abs() < 1e-9);
        assert!((map.worker_location.lng - 76.99).abs() < 1e-9);
    }
}
