use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::bookings::{
    self, AvailableJobs, CreateBookingDto, CustomerBookings, TrackResponse, WorkerJobs,
};
use crate::state::AppState;

// POST /v1/bookings
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<CreateBookingDto>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db.lock().unwrap();
    let booking = bookings::create(&db, &state.config, dto, Utc::now().naive_utc())?;
    Ok(Json(booking))
}

// GET /v1/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = state.db.lock().unwrap();
    let booking = bookings::find_by_id(&db, &state.policy, &id, Utc::now().naive_utc())?;
    Ok(Json(booking))
}

// GET /v1/bookings/:id/track
pub async fn track(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TrackResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let response = bookings::track(&db, &state.policy, &id, Utc::now().naive_utc())?;
    Ok(Json(response))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusDto {
    pub status: String,
    pub note: Option<String>,
    pub eta_minutes: Option<i64>,
}

// PATCH /v1/bookings/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(dto): Json<UpdateStatusDto>,
) -> Result<Json<Booking>, AppError> {
    let status = BookingStatus::parse(&dto.status)
        .ok_or_else(|| AppError::InvalidInput(format!("invalid status: {}", dto.status)))?;

    let db = state.db.lock().unwrap();
    let booking = bookings::update_status(
        &db,
        &id,
        status,
        dto.note,
        dto.eta_minutes,
        Utc::now().naive_utc(),
    )?;
    Ok(Json(booking))
}

// GET /v1/bookings/customer/:customer_id
pub async fn customer_bookings(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Result<Json<CustomerBookings>, AppError> {
    let db = state.db.lock().unwrap();
    Ok(Json(bookings::list_for_customer(&db, &customer_id)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerJobsQuery {
    pub worker_id: Option<String>,
}

// GET /v1/bookings/available?workerId=...
pub async fn available_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WorkerJobsQuery>,
) -> Result<Json<AvailableJobs>, AppError> {
    let db = state.db.lock().unwrap();
    Ok(Json(bookings::list_available(
        &db,
        query.worker_id.as_deref(),
    )?))
}

// GET /v1/bookings/worker-jobs?workerId=...
pub async fn worker_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WorkerJobsQuery>,
) -> Result<Json<WorkerJobs>, AppError> {
    let worker_id = query
        .worker_id
        .ok_or_else(|| AppError::InvalidInput("workerId is required".to_string()))?;

    let db = state.db.lock().unwrap();
    Ok(Json(bookings::list_for_worker(&db, &worker_id)?))
}
