pub mod stripe;

use std::collections::HashMap;

use async_trait::async_trait;

/// Provider-side intent handle returned on creation. The id is the key used
/// to correlate webhook deliveries back to a local payment row.
#[derive(Debug, Clone)]
pub struct CreatedIntent {
    pub id: String,
    pub client_secret: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a payment intent for `amount_minor` minor currency units.
    /// Metadata is echoed back on webhook events for correlation.
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> anyhow::Result<CreatedIntent>;
}
