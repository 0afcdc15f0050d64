use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub flat_fee_amount: f64,
    pub currency: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "worklane.db".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            flat_fee_amount: env::var("BOOKING_FLAT_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(499.0),
            currency: env::var("BOOKING_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|_| "INR".to_string()),
        }
    }
}
