use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    BookingPaymentStatus, BookingStatus, Payment, PaymentMethod, PaymentStatus,
};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
}

/// Creates a payment attempt for a booking. COD short-circuits locally;
/// card/upi go through the provider and only reach `processing` once the
/// provider accepted the intent. The db lock is never held across the
/// provider call.
pub async fn create_intent(
    state: &AppState,
    booking_id: &str,
    method: PaymentMethod,
    now: NaiveDateTime,
) -> Result<IntentResponse, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking_by_id(&db, booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?
    };

    let amount = if booking.amount > 0.0 {
        booking.amount
    } else {
        state.config.flat_fee_amount
    };
    let currency = if booking.currency.is_empty() {
        state.config.currency.clone()
    } else {
        booking.currency.clone()
    };

    if method == PaymentMethod::Cod {
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            booking_id: booking_id.to_string(),
            amount,
            currency: currency.clone(),
            method,
            status: PaymentStatus::CodPending,
            provider_payment_intent_id: None,
            receipt_url: None,
            error_code: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        {
            let db = state.db.lock().unwrap();
            queries::create_payment(&db, &payment)?;
            queries::set_booking_payment_link(
                &db,
                booking_id,
                BookingPaymentStatus::CodPending,
                method,
                &payment.id,
                &now,
            )?;
        }

        tracing::info!(booking_id = %booking_id, payment_id = %payment.id, "cod payment recorded");
        return Ok(IntentResponse {
            payment_id: payment.id,
            client_secret: None,
            amount,
            currency,
            status: PaymentStatus::CodPending,
        });
    }

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        booking_id: booking_id.to_string(),
        amount,
        currency: currency.clone(),
        method,
        status: PaymentStatus::RequiresPayment,
        provider_payment_intent_id: None,
        receipt_url: None,
        error_code: None,
        error_message: None,
        created_at: now,
        updated_at: now,
    };
    {
        let db = state.db.lock().unwrap();
        queries::create_payment(&db, &payment)?;
    }

    let metadata = HashMap::from([
        ("bookingId".to_string(), booking_id.to_string()),
        ("paymentId".to_string(), payment.id.clone()),
    ]);
    let amount_minor = (amount * 100.0).round() as i64;

    // On provider failure the payment row stays in requires_payment so the
    // client can retry intent creation; nothing is rolled back.
    let intent = state
        .provider
        .create_intent(amount_minor, &currency, metadata)
        .await
        .map_err(|e| {
            tracing::error!(booking_id = %booking_id, payment_id = %payment.id, error = %e,
                "provider intent creation failed");
            AppError::Provider(e.to_string())
        })?;

    {
        let db = state.db.lock().unwrap();
        queries::set_payment_processing(&db, &payment.id, &intent.id, &now)?;
        queries::set_booking_payment_link(
            &db,
            booking_id,
            BookingPaymentStatus::Processing,
            method,
            &payment.id,
            &now,
        )?;
    }

    tracing::info!(
        booking_id = %booking_id,
        payment_id = %payment.id,
        intent_id = %intent.id,
        "payment intent created"
    );

    Ok(IntentResponse {
        payment_id: payment.id,
        client_secret: Some(intent.client_secret),
        amount,
        currency,
        status: PaymentStatus::Processing,
    })
}

// ── Webhook reconciliation ──

/// Envelope only; `data` stays untyped so events of kinds we never handle
/// can carry any shape without tripping deserialization.
#[derive(Debug, Deserialize)]
pub struct ProviderEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct IntentObject {
    pub id: String,
    #[serde(default)]
    pub charges: Option<Charges>,
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Deserialize)]
pub struct Charges {
    #[serde(default)]
    pub data: Vec<Charge>,
}

#[derive(Debug, Deserialize)]
pub struct Charge {
    #[serde(default)]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LastPaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Applies a provider webhook to the ledger and the booking projection.
/// Unknown event kinds and unmatched intents are acknowledged and dropped so
/// the provider's at-least-once retries never see an error. Safe under
/// duplicate delivery: re-setting the same terminal fields is harmless.
pub fn handle_provider_event(
    conn: &Connection,
    event: &ProviderEvent,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    match event.kind.as_str() {
        "payment_intent.succeeded" => on_intent_succeeded(conn, &parse_intent(event)?, now),
        "payment_intent.payment_failed" => on_intent_failed(conn, &parse_intent(event)?, now),
        other => {
            tracing::debug!(kind = other, "ignoring provider event");
            Ok(())
        }
    }
}

fn parse_intent(event: &ProviderEvent) -> Result<IntentObject, AppError> {
    serde_json::from_value(event.data["object"].clone())
        .map_err(|e| AppError::InvalidInput(format!("malformed intent object: {e}")))
}

fn on_intent_succeeded(
    conn: &Connection,
    intent: &IntentObject,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    let Some(payment) = queries::get_payment_by_intent_id(conn, &intent.id)? else {
        tracing::warn!(intent_id = %intent.id, "payment not found for succeeded intent");
        return Ok(());
    };

    let receipt_url = intent
        .charges
        .as_ref()
        .and_then(|c| c.data.first())
        .and_then(|c| c.receipt_url.as_deref());
    queries::set_payment_succeeded(conn, &payment.id, receipt_url, &now)?;

    if let Some(booking) = queries::get_booking_by_id(conn, &payment.booking_id)? {
        queries::set_booking_payment_status(conn, &booking.id, BookingPaymentStatus::Paid, &now)?;
        // Payment confirmation doubles as the acceptance signal, but only
        // from the initial state.
        if booking.status == BookingStatus::Requested {
            queries::set_booking_status(conn, &booking.id, BookingStatus::Accepted, &now)?;
        }
    }

    tracing::info!(intent_id = %intent.id, payment_id = %payment.id, "payment succeeded");
    Ok(())
}

fn on_intent_failed(
    conn: &Connection,
    intent: &IntentObject,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    let Some(payment) = queries::get_payment_by_intent_id(conn, &intent.id)? else {
        tracing::warn!(intent_id = %intent.id, "payment not found for failed intent");
        return Ok(());
    };

    let (code, message) = intent
        .last_payment_error
        .as_ref()
        .map(|e| (e.code.as_deref(), e.message.as_deref()))
        .unwrap_or((None, None));
    queries::set_payment_failed(conn, &payment.id, code, message, &now)?;

    // A failed payment never cancels the booking, it just marks the
    // projection.
    queries::set_booking_payment_status(
        conn,
        &payment.booking_id,
        BookingPaymentStatus::Failed,
        &now,
    )?;

    tracing::info!(intent_id = %intent.id, payment_id = %payment.id, "payment failed");
    Ok(())
}
