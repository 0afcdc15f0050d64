use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Ledger entry for one payment attempt. A booking may accumulate several
/// across retries; `booking.payment_id` points at the latest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    /// Major currency units, snapshotted from the booking at intent creation.
    pub amount: f64,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub provider_payment_intent_id: Option<String>,
    pub receipt_url: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Cod => "cod",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "card" => Some(PaymentMethod::Card),
            "upi" => Some(PaymentMethod::Upi),
            "cod" => Some(PaymentMethod::Cod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresPayment,
    Processing,
    Succeeded,
    Failed,
    CodPending,
    CodCollected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::RequiresPayment => "requires_payment",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::CodPending => "cod_pending",
            PaymentStatus::CodCollected => "cod_collected",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => PaymentStatus::Processing,
            "succeeded" => PaymentStatus::Succeeded,
            "failed" => PaymentStatus::Failed,
            "cod_pending" => PaymentStatus::CodPending,
            "cod_collected" => PaymentStatus::CodCollected,
            _ => PaymentStatus::RequiresPayment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_round_trips() {
        for s in [
            "requires_payment",
            "processing",
            "succeeded",
            "failed",
            "cod_pending",
            "cod_collected",
        ] {
            assert_eq!(PaymentStatus::parse(s).as_str(), s);
        }
    }

    #[test]
    fn method_rejects_unknown() {
        assert!(PaymentMethod::parse("cheque").is_none());
        assert_eq!(PaymentMethod::parse("upi"), Some(PaymentMethod::Upi));
    }
}
