use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    Booking, BookingPaymentStatus, BookingStatus, Location, LocationKind, Receiver, StatusEvent,
    STEPS,
};
use crate::services::status::{self, AdvancePolicy};
use crate::services::tracking::{self, MapPositions};

/// Dispatch origin used when a booking arrives without coordinates (Connaught
/// Place, New Delhi -- the demo city center).
const DEFAULT_COORDS: (f64, f64) = (77.209, 28.6139);

const CREATED_NOTE: &str = "We are finding the best worker for you";
const INITIAL_ETA_MINUTES: i64 = 25;
const MAX_ADDRESS_LEN: usize = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingDto {
    pub customer_id: String,
    pub worker_id: String,
    pub job_id: Option<String>,
    pub service_name: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub amount: Option<f64>,
    pub location_type: String,
    pub location_address: String,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub receiver_relation: Option<String>,
}

pub fn create(
    conn: &Connection,
    config: &AppConfig,
    dto: CreateBookingDto,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    if dto.customer_id.trim().is_empty() {
        return Err(AppError::InvalidInput("customerId is required".to_string()));
    }
    if dto.worker_id.trim().is_empty() {
        return Err(AppError::InvalidInput("workerId is required".to_string()));
    }
    let kind = LocationKind::parse(&dto.location_type).ok_or_else(|| {
        AppError::InvalidInput(format!("invalid locationType: {}", dto.location_type))
    })?;
    if dto.location_address.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "locationAddress is required".to_string(),
        ));
    }
    if dto.location_address.len() > MAX_ADDRESS_LEN {
        return Err(AppError::InvalidInput(
            "locationAddress exceeds 500 characters".to_string(),
        ));
    }
    if kind.requires_receiver() {
        let has_receiver = dto.receiver_name.as_deref().is_some_and(|s| !s.is_empty())
            && dto.receiver_phone.as_deref().is_some_and(|s| !s.is_empty());
        if !has_receiver {
            return Err(AppError::InvalidInput(
                "receiverName and receiverPhone are required for friend/other locations"
                    .to_string(),
            ));
        }
    }

    let coordinates = match (dto.location_lng, dto.location_lat) {
        (Some(lng), Some(lat)) => (lng, lat),
        _ => DEFAULT_COORDS,
    };

    let any_receiver_field = dto.receiver_name.is_some()
        || dto.receiver_phone.is_some()
        || dto.receiver_relation.is_some();
    let receiver = any_receiver_field.then(|| Receiver {
        name: dto
            .receiver_name
            .or_else(|| dto.customer_name.clone())
            .unwrap_or_else(|| "Receiver".to_string()),
        phone: dto
            .receiver_phone
            .or_else(|| dto.customer_phone.clone())
            .unwrap_or_default(),
        relation: dto.receiver_relation,
    });

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        customer_id: dto.customer_id,
        worker_id: dto.worker_id,
        job_id: dto.job_id,
        service_name: dto.service_name,
        customer_name: dto.customer_name,
        customer_phone: dto.customer_phone,
        amount: dto.amount.unwrap_or(config.flat_fee_amount),
        currency: config.currency.clone(),
        status: BookingStatus::Requested,
        location: Location {
            kind,
            address: dto.location_address,
            coordinates,
        },
        receiver,
        eta_minutes: Some(INITIAL_ETA_MINUTES),
        tracking_note: Some(CREATED_NOTE.to_string()),
        payment_status: BookingPaymentStatus::Pending,
        payment_method: None,
        payment_id: None,
        status_history: vec![StatusEvent {
            status: BookingStatus::Requested,
            at: now,
            note: Some("Booking created".to_string()),
            eta_minutes: Some(INITIAL_ETA_MINUTES),
        }],
        created_at: now,
        updated_at: now,
    };

    queries::create_booking(conn, &booking)?;
    tracing::info!(booking_id = %booking.id, customer_id = %booking.customer_id, "booking created");
    Ok(booking)
}

/// Loads a booking and lazily applies any time-derived transition before
/// returning it. Every read path goes through here.
pub fn find_by_id(
    conn: &Connection,
    policy: &AdvancePolicy,
    id: &str,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let booking = queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    auto_advance(conn, policy, booking, now)
}

fn auto_advance(
    conn: &Connection,
    policy: &AdvancePolicy,
    mut booking: Booking,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let Some(advance) = status::evaluate(policy, booking.status, &booking.created_at, &now) else {
        return Ok(booking);
    };

    // Redundant concurrent evaluations all compute the same target, so the
    // last writer wins with identical content.
    queries::set_booking_progress(
        conn,
        &booking.id,
        advance.status,
        Some(advance.eta_minutes),
        Some(advance.note),
        &now,
    )?;
    let event = StatusEvent {
        status: advance.status,
        at: now,
        note: Some(advance.note.to_string()),
        eta_minutes: Some(advance.eta_minutes),
    };
    queries::append_status_event(conn, &booking.id, &event)?;

    tracing::info!(
        booking_id = %booking.id,
        from = booking.status.as_str(),
        to = advance.status.as_str(),
        "booking auto-advanced"
    );

    booking.status = advance.status;
    booking.eta_minutes = Some(advance.eta_minutes);
    booking.tracking_note = Some(advance.note.to_string());
    booking.status_history.push(event);
    booking.updated_at = now;
    Ok(booking)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub booking: Booking,
    pub progress: TrackProgress,
    pub map: MapPositions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackProgress {
    pub steps: Vec<&'static str>,
    pub current_step: usize,
    pub eta_minutes: Option<i64>,
    pub note: Option<String>,
}

pub fn track(
    conn: &Connection,
    policy: &AdvancePolicy,
    id: &str,
    now: NaiveDateTime,
) -> Result<TrackResponse, AppError> {
    let booking = find_by_id(conn, policy, id, now)?;
    let map = tracking::compute_map_positions(&booking, &now);

    Ok(TrackResponse {
        progress: TrackProgress {
            steps: STEPS.iter().map(|s| s.as_str()).collect(),
            current_step: status::current_step(booking.status),
            eta_minutes: booking.eta_minutes,
            note: booking.tracking_note.clone(),
        },
        map,
        booking,
    })
}

/// Operator/admin override path. Any valid status is accepted, including
/// backward or skipped steps; that permissiveness is intentional.
pub fn update_status(
    conn: &Connection,
    id: &str,
    new_status: BookingStatus,
    note: Option<String>,
    eta_minutes: Option<i64>,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    let mut booking = queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    let resolved_eta = eta_minutes.or(booking.eta_minutes);
    let resolved_note = note.clone().or(booking.tracking_note.clone());
    queries::set_booking_progress(
        conn,
        id,
        new_status,
        resolved_eta,
        resolved_note.as_deref(),
        &now,
    )?;

    // The history row records what the caller supplied, not the retained
    // values.
    let event = StatusEvent {
        status: new_status,
        at: now,
        note,
        eta_minutes,
    };
    queries::append_status_event(conn, id, &event)?;

    tracing::info!(booking_id = %id, status = new_status.as_str(), "booking status updated");

    booking.status = new_status;
    booking.eta_minutes = resolved_eta;
    booking.tracking_note = resolved_note;
    booking.status_history.push(event);
    booking.updated_at = now;
    Ok(booking)
}

// ── Listings (no auto-advance; display-only summaries) ──

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBookings {
    pub bookings: Vec<CustomerBookingSummary>,
    pub total_spent: f64,
    pub active_count: usize,
    pub completed_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBookingSummary {
    pub id: String,
    pub service_name: Option<String>,
    pub status: BookingStatus,
    pub amount: f64,
    pub address: String,
    pub eta_minutes: Option<i64>,
    pub payment_status: BookingPaymentStatus,
    pub created_at: NaiveDateTime,
}

pub fn list_for_customer(
    conn: &Connection,
    customer_id: &str,
) -> Result<CustomerBookings, AppError> {
    let bookings = queries::get_bookings_for_customer(conn, customer_id)?;

    let mut total_spent = 0.0;
    let mut active_count = 0;
    let mut completed_count = 0;

    let summaries = bookings
        .into_iter()
        .map(|b| {
            match b.status {
                BookingStatus::Completed => {
                    total_spent += b.amount;
                    completed_count += 1;
                }
                BookingStatus::Cancelled => {}
                _ => active_count += 1,
            }
            CustomerBookingSummary {
                id: b.id,
                service_name: b.service_name,
                status: b.status,
                amount: b.amount,
                address: b.location.address,
                eta_minutes: b.eta_minutes,
                payment_status: b.payment_status,
                created_at: b.created_at,
            }
        })
        .collect();

    Ok(CustomerBookings {
        bookings: summaries,
        total_spent,
        active_count,
        completed_count,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableJobs {
    pub jobs: Vec<AvailableJobSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableJobSummary {
    pub id: String,
    pub title: String,
    pub amount: f64,
    pub address: String,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
}

const AVAILABLE_JOBS_LIMIT: i64 = 10;

/// Open-jobs feed for workers browsing for work. Only `requested` bookings
/// qualify; a worker never sees their own.
pub fn list_available(
    conn: &Connection,
    worker_id: Option<&str>,
) -> Result<AvailableJobs, AppError> {
    let bookings = queries::get_available_bookings(conn, worker_id, AVAILABLE_JOBS_LIMIT)?;

    let jobs = bookings
        .into_iter()
        .map(|b| AvailableJobSummary {
            id: b.id,
            title: b.service_name.unwrap_or_else(|| "Job".to_string()),
            amount: b.amount,
            address: b.location.address,
            status: b.status,
            created_at: b.created_at,
        })
        .collect();

    Ok(AvailableJobs { jobs })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerJobs {
    pub jobs: Vec<WorkerJobSummary>,
    pub total_earnings: f64,
    pub completed_jobs: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerJobSummary {
    pub id: String,
    pub title: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub amount: f64,
    pub status: BookingStatus,
    pub address: String,
}

pub fn list_for_worker(conn: &Connection, worker_id: &str) -> Result<WorkerJobs, AppError> {
    let bookings = queries::get_bookings_for_worker(conn, worker_id)?;

    let mut total_earnings = 0.0;
    let mut completed_jobs = 0;

    let jobs = bookings
        .into_iter()
        .map(|b| {
            if b.status == BookingStatus::Completed {
                total_earnings += b.amount;
                completed_jobs += 1;
            }
            WorkerJobSummary {
                id: b.id,
                title: b.service_name,
                customer_name: b.customer_name,
                customer_phone: b.customer_phone,
                amount: b.amount,
                status: b.status,
                address: b.location.address,
            }
        })
        .collect();

    Ok(WorkerJobs {
        jobs,
        total_earnings,
        completed_jobs,
    })
}
