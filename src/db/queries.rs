use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingPaymentStatus, BookingStatus, Location, LocationKind, Payment, PaymentMethod,
    PaymentStatus, Receiver, StatusEvent,
};

const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FORMAT).to_string()
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DT_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, customer_id, worker_id, job_id, service_name, customer_name,
            customer_phone, amount, currency, status, location_kind, location_address,
            location_lon, location_lat, receiver_name, receiver_phone, receiver_relation,
            eta_minutes, tracking_note, payment_status, payment_method, payment_id,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
            ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
        params![
            booking.id,
            booking.customer_id,
            booking.worker_id,
            booking.job_id,
            booking.service_name,
            booking.customer_name,
            booking.customer_phone,
            booking.amount,
            booking.currency,
            booking.status.as_str(),
            booking.location.kind.as_str(),
            booking.location.address,
            booking.location.coordinates.0,
            booking.location.coordinates.1,
            booking.receiver.as_ref().map(|r| r.name.clone()),
            booking.receiver.as_ref().map(|r| r.phone.clone()),
            booking.receiver.as_ref().and_then(|r| r.relation.clone()),
            booking.eta_minutes,
            booking.tracking_note,
            booking.payment_status.as_str(),
            booking.payment_method,
            booking.payment_id,
            fmt_dt(&booking.created_at),
            fmt_dt(&booking.updated_at),
        ],
    )?;

    for event in &booking.status_history {
        append_status_event(conn, &booking.id, event)?;
    }
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("{BOOKING_SELECT} WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => {
            let mut booking = booking?;
            booking.status_history = load_status_history(conn, id)?;
            Ok(Some(booking))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_for_customer(
    conn: &Connection,
    customer_id: &str,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "{BOOKING_SELECT} WHERE customer_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![customer_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    for booking in &mut bookings {
        booking.status_history = load_status_history(conn, &booking.id)?;
    }
    Ok(bookings)
}

/// Open `requested` bookings for the worker feed, newest first. A worker id,
/// when given, filters out that worker's own bookings.
pub fn get_available_bookings(
    conn: &Connection,
    exclude_worker: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "{BOOKING_SELECT} WHERE status = 'requested' AND (?1 IS NULL OR worker_id <> ?1)
         ORDER BY created_at DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![exclude_worker, limit], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_bookings_for_worker(conn: &Connection, worker_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "{BOOKING_SELECT} WHERE worker_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![worker_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    for booking in &mut bookings {
        booking.status_history = load_status_history(conn, &booking.id)?;
    }
    Ok(bookings)
}

/// Writes the resolved status/eta/note in one statement. History rows are
/// appended separately so the log stays append-only.
pub fn set_booking_progress(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    eta_minutes: Option<i64>,
    tracking_note: Option<&str>,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, eta_minutes = ?2, tracking_note = ?3, updated_at = ?4
         WHERE id = ?5",
        params![status.as_str(), eta_minutes, tracking_note, fmt_dt(now), id],
    )?;
    Ok(count > 0)
}

pub fn append_status_event(
    conn: &Connection,
    booking_id: &str,
    event: &StatusEvent,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO booking_status_history (booking_id, status, at, note, eta_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            booking_id,
            event.status.as_str(),
            fmt_dt(&event.at),
            event.note,
            event.eta_minutes,
        ],
    )?;
    Ok(())
}

pub fn set_booking_payment_link(
    conn: &Connection,
    id: &str,
    payment_status: BookingPaymentStatus,
    method: PaymentMethod,
    payment_id: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE bookings SET payment_status = ?1, payment_method = ?2, payment_id = ?3,
            updated_at = ?4
         WHERE id = ?5",
        params![
            payment_status.as_str(),
            method.as_str(),
            payment_id,
            fmt_dt(now),
            id
        ],
    )?;
    Ok(())
}

pub fn set_booking_payment_status(
    conn: &Connection,
    id: &str,
    payment_status: BookingPaymentStatus,
    now: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE bookings SET payment_status = ?1, updated_at = ?2 WHERE id = ?3",
        params![payment_status.as_str(), fmt_dt(now), id],
    )?;
    Ok(())
}

pub fn set_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    now: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), fmt_dt(now), id],
    )?;
    Ok(())
}

const BOOKING_SELECT: &str = "SELECT id, customer_id, worker_id, job_id, service_name,
    customer_name, customer_phone, amount, currency, status, location_kind, location_address,
    location_lon, location_lat, receiver_name, receiver_phone, receiver_relation, eta_minutes,
    tracking_note, payment_status, payment_method, payment_id, created_at, updated_at
    FROM bookings";

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let status_str: String = row.get(9)?;
    let kind_str: String = row.get(10)?;
    let receiver_name: Option<String> = row.get(14)?;
    let receiver_phone: Option<String> = row.get(15)?;
    let payment_status_str: String = row.get(19)?;
    let created_at_str: String = row.get(22)?;
    let updated_at_str: String = row.get(23)?;

    let receiver = match (receiver_name, receiver_phone) {
        (Some(name), Some(phone)) => Some(Receiver {
            name,
            phone,
            relation: row.get(16)?,
        }),
        _ => None,
    };

    Ok(Booking {
        id,
        customer_id: row.get(1)?,
        worker_id: row.get(2)?,
        job_id: row.get(3)?,
        service_name: row.get(4)?,
        customer_name: row.get(5)?,
        customer_phone: row.get(6)?,
        amount: row.get(7)?,
        currency: row.get(8)?,
        status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Requested),
        location: Location {
            kind: LocationKind::parse(&kind_str).unwrap_or(LocationKind::Other),
            address: row.get(11)?,
            coordinates: (row.get(12)?, row.get(13)?),
        },
        receiver,
        eta_minutes: row.get(17)?,
        tracking_note: row.get(18)?,
        payment_status: BookingPaymentStatus::parse(&payment_status_str),
        payment_method: row.get(20)?,
        payment_id: row.get(21)?,
        status_history: vec![],
        created_at: parse_dt(&created_at_str),
        updated_at: parse_dt(&updated_at_str),
    })
}

fn load_status_history(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<StatusEvent>> {
    let mut stmt = conn.prepare(
        "SELECT status, at, note, eta_minutes FROM booking_status_history
         WHERE booking_id = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![booking_id], |row| {
        let status_str: String = row.get(0)?;
        let at_str: String = row.get(1)?;
        Ok(StatusEvent {
            status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Requested),
            at: parse_dt(&at_str),
            note: row.get(2)?,
            eta_minutes: row.get(3)?,
        })
    })?;

    let mut events = vec![];
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

// ── Payments ──

pub fn create_payment(conn: &Connection, payment: &Payment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payments (id, booking_id, amount, currency, method, status,
            provider_payment_intent_id, receipt_url, error_code, error_message,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            payment.id,
            payment.booking_id,
            payment.amount,
            payment.currency,
            payment.method.as_str(),
            payment.status.as_str(),
            payment.provider_payment_intent_id,
            payment.receipt_url,
            payment.error_code,
            payment.error_message,
            fmt_dt(&payment.created_at),
            fmt_dt(&payment.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_payment_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Payment>> {
    let result = conn.query_row(
        &format!("{PAYMENT_SELECT} WHERE id = ?1"),
        params![id],
        |row| Ok(parse_payment_row(row)),
    );

    match result {
        Ok(payment) => Ok(Some(payment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_payment_by_intent_id(
    conn: &Connection,
    intent_id: &str,
) -> anyhow::Result<Option<Payment>> {
    let result = conn.query_row(
        &format!("{PAYMENT_SELECT} WHERE provider_payment_intent_id = ?1"),
        params![intent_id],
        |row| Ok(parse_payment_row(row)),
    );

    match result {
        Ok(payment) => Ok(Some(payment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_payment_processing(
    conn: &Connection,
    id: &str,
    intent_id: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE payments SET status = 'processing', provider_payment_intent_id = ?1,
            updated_at = ?2
         WHERE id = ?3",
        params![intent_id, fmt_dt(now), id],
    )?;
    Ok(())
}

pub fn set_payment_succeeded(
    conn: &Connection,
    id: &str,
    receipt_url: Option<&str>,
    now: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE payments SET status = 'succeeded', receipt_url = ?1, updated_at = ?2
         WHERE id = ?3",
        params![receipt_url, fmt_dt(now), id],
    )?;
    Ok(())
}

pub fn set_payment_failed(
    conn: &Connection,
    id: &str,
    error_code: Option<&str>,
    error_message: Option<&str>,
    now: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE payments SET status = 'failed', error_code = ?1, error_message = ?2,
            updated_at = ?3
         WHERE id = ?4",
        params![error_code, error_message, fmt_dt(now), id],
    )?;
    Ok(())
}

const PAYMENT_SELECT: &str = "SELECT id, booking_id, amount, currency, method, status,
    provider_payment_intent_id, receipt_url, error_code, error_message, created_at, updated_at
    FROM payments";

fn parse_payment_row(row: &rusqlite::Row) -> anyhow::Result<Payment> {
    let method_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    Ok(Payment {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        amount: row.get(2)?,
        currency: row.get(3)?,
        method: PaymentMethod::parse(&method_str).unwrap_or(PaymentMethod::Card),
        status: PaymentStatus::parse(&status_str),
        provider_payment_intent_id: row.get(6)?,
        receipt_url: row.get(7)?,
        error_code: row.get(8)?,
        error_message: row.get(9)?,
        created_at: parse_dt(&created_at_str),
        updated_at: parse_dt(&updated_at_str),
    })
}
