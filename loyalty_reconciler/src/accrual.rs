//! The client side of the external accrual service.
//!
//! One lookup per order number, classified into a [`Classification`] by HTTP status code. Everything the pipeline
//! needs from the service goes through the [`AccrualSource`] trait so that tests can script responses.
use std::{sync::Arc, time::Duration};

use log::*;
use lps_common::Points;
use loyalty_engine::db_types::{Order, Verdict, VerdictStatus};
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::Deserialize;

use crate::errors::AccrualClientError;

/// The body of a successful accrual lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: VerdictStatus,
    #[serde(default)]
    pub accrual: Option<f64>,
}

/// What one lookup told us about an order.
#[derive(Debug, Clone)]
pub enum Classification {
    /// The service returned a status for the order.
    Verdict(Verdict),
    /// The order has not reached the accrual service yet. Not an error; try again next tick.
    NotRegistered,
    /// The service is throttling us and advertised a cooldown.
    Throttled(Duration),
}

/// The pipeline's view of the accrual service.
#[allow(async_fn_in_trait)]
pub trait AccrualSource: Clone {
    async fn classify(&self, order: &Order) -> Result<Classification, AccrualClientError>;
}

#[derive(Clone)]
pub struct AccrualClient {
    base_url: String,
    client: Arc<Client>,
}

impl AccrualClient {
    /// Builds a client against the given base URL. Every request carries `request_timeout` as an upper bound so
    /// an unresponsive service cannot stall a fetch indefinitely.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, AccrualClientError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AccrualClientError::Initialization(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    fn url(&self, order: &Order) -> String {
        format!("{}/api/orders/{}", self.base_url, order.number)
    }
}

impl AccrualSource for AccrualClient {
    async fn classify(&self, order: &Order) -> Result<Classification, AccrualClientError> {
        let url = self.url(order);
        trace!("🔎️ Querying accrual service: {url}");
        let response = self.client.get(&url).send().await.map_err(|e| AccrualClientError::Transport(e.to_string()))?;
        match response.status() {
            StatusCode::OK => {
                let body: AccrualResponse =
                    response.json().await.map_err(|e| AccrualClientError::InvalidResponse(e.to_string()))?;
                let accrual = body
                    .accrual
                    .map(Points::try_from_f64)
                    .transpose()
                    .map_err(|e| AccrualClientError::InvalidResponse(e.to_string()))?;
                trace!("🔎️ Order [{}] is {} at the accrual service", body.order, body.status);
                Ok(Classification::Verdict(Verdict::for_order(order, body.status, accrual)))
            },
            StatusCode::NO_CONTENT => Ok(Classification::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => {
                let secs = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .ok_or_else(|| {
                        AccrualClientError::InvalidResponse("missing or malformed Retry-After header".to_string())
                    })?;
                Ok(Classification::Throttled(Duration::from_secs(secs)))
            },
            other => Err(AccrualClientError::UnexpectedStatus(other.as_u16())),
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use loyalty_engine::db_types::VerdictStatus;

    use super::{AccrualClient, AccrualResponse};

    #[test]
    fn lookup_url() {
        let client = AccrualClient::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        let order = loyalty_engine::db_types::Order {
            id: 1,
            number: "79927398713".into(),
            user_id: 1,
            status: loyalty_engine::db_types::OrderStatusType::New,
            accrual: None,
            created_at: chrono::Utc::now(),
        };
        assert_eq!(client.url(&order), "http://localhost:8080/api/orders/79927398713");
    }

    #[test]
    fn response_decoding() {
        let body: AccrualResponse =
            serde_json::from_str(r#"{"order": "79927398713", "status": "PROCESSED", "accrual": 500.0}"#).unwrap();
        assert_eq!(body.status, VerdictStatus::Processed);
        assert_eq!(body.accrual, Some(500.0));

        let body: AccrualResponse = serde_json::from_str(r#"{"order": "49927398716", "status": "REGISTERED"}"#).unwrap();
        assert_eq!(body.status, VerdictStatus::Registered);
        assert_eq!(body.accrual, None);

        // A status we do not know is a malformed response, not a verdict.
        let result = serde_json::from_str::<AccrualResponse>(r#"{"order": "1", "status": "SHREDDED"}"#);
        assert!(result.is_err());
    }
}
