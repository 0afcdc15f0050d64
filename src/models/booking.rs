use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Canonical forward order of a booking's life. `cancelled` sits outside the
/// sequence and is reachable from any non-terminal state.
pub const STEPS: [BookingStatus; 4] = [
    BookingStatus::Requested,
    BookingStatus::Accepted,
    BookingStatus::InProgress,
    BookingStatus::Completed,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub worker_id: String,
    pub job_id: Option<String>,
    pub service_name: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: BookingStatus,
    pub location: Location,
    pub receiver: Option<Receiver>,
    pub eta_minutes: Option<i64>,
    pub tracking_note: Option<String>,
    pub payment_status: BookingPaymentStatus,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub status_history: Vec<StatusEvent>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            BookingStatus::Completed | BookingStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    #[serde(rename = "requested")]
    Requested,
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Accepted => "accepted",
            BookingStatus::InProgress => "in-progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(BookingStatus::Requested),
            "accepted" => Some(BookingStatus::Accepted),
            "in-progress" => Some(BookingStatus::InProgress),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// Denormalized projection of the latest payment attempt. Maintained only by
/// the payment service; the `payments` table is the source of truth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingPaymentStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "paid")]
    Paid,
    #[serde(rename = "cod_pending")]
    CodPending,
    #[serde(rename = "failed")]
    Failed,
}

impl BookingPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPaymentStatus::Pending => "pending",
            BookingPaymentStatus::Processing => "processing",
            BookingPaymentStatus::Paid => "paid",
            BookingPaymentStatus::CodPending => "cod_pending",
            BookingPaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => BookingPaymentStatus::Processing,
            "paid" => BookingPaymentStatus::Paid,
            "cod_pending" => BookingPaymentStatus::CodPending,
            "failed" => BookingPaymentStatus::Failed,
            _ => BookingPaymentStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub kind: LocationKind,
    pub address: String,
    /// Stored as (lon, lat), GeoJSON order.
    pub coordinates: (f64, f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Home,
    Office,
    Friend,
    Other,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Home => "home",
            LocationKind::Office => "office",
            LocationKind::Friend => "friend",
            LocationKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "home" => Some(LocationKind::Home),
            "office" => Some(LocationKind::Office),
            "friend" => Some(LocationKind::Friend),
            "other" => Some(LocationKind::Other),
            _ => None,
        }
    }

    /// Receiver details are mandatory when booking for someone else.
    pub fn requires_receiver(&self) -> bool {
        matches!(self, LocationKind::Friend | LocationKind::Other)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    pub phone: String,
    pub relation: Option<String>,
}

/// One row of the append-only status log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub status: BookingStatus,
    pub at: NaiveDateTime,
    pub note: Option<String>,
    pub eta_minutes: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [
            "requested",
            "accepted",
            "in-progress",
            "completed",
            "cancelled",
        ] {
            assert_eq!(BookingStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(BookingStatus::parse("shipped").is_none());
    }

    #[test]
    fn receiver_required_for_third_party_locations() {
        assert!(!LocationKind::Home.requires_receiver());
        assert!(!LocationKind::Office.requires_receiver());
        assert!(LocationKind::Friend.requires_receiver());
        assert!(LocationKind::Other.requires_receiver());
    }
}
