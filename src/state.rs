use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::provider::PaymentProvider;
use crate::services::status::AdvancePolicy;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub policy: AdvancePolicy,
    pub provider: Box<dyn PaymentProvider>,
}
