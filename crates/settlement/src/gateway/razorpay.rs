//! Razorpay REST adapter.

use std::time::Duration;

use async_trait::async_trait;
use domain::Money;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{
    GatewayError, PaymentGateway, RemoteOrder, RemotePayment, RemoteRefund, record_request,
    signature,
};

/// Default production endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com/v1";

/// Credentials and endpoint for the Razorpay API.
#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl RazorpayConfig {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[redacted]")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
    receipt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: String,
    order_id: Option<String>,
    amount: i64,
    status: String,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    id: String,
    payment_id: String,
    amount: i64,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    description: Option<String>,
    code: Option<String>,
}

/// Payment gateway backed by the Razorpay HTTP API.
#[derive(Debug, Clone)]
pub struct RazorpayGateway {
    config: RazorpayConfig,
    client: Client,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.config.key_id, Some(&self.config.key_secret))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::MalformedResponse(e.to_string()))
    }

    fn transport_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.config.timeout)
        } else {
            GatewayError::Http(error)
        }
    }
}

fn api_error(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.description.or(e.error.code))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    GatewayError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.config.key_id
    }

    #[tracing::instrument(skip(self), fields(gateway = "razorpay"))]
    async fn create_remote_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteOrder, GatewayError> {
        if !amount.is_positive() {
            let result = Err(GatewayError::InvalidAmount(amount));
            record_request("create_order", &result);
            return result;
        }

        let body = json!({
            "amount": amount.minor(),
            "currency": currency,
            "receipt": receipt,
            "payment_capture": 1,
        });
        let result = self
            .send::<OrderResponse>(self.client.post(self.url("orders")).json(&body))
            .await
            .map(|order| RemoteOrder {
                id: order.id,
                amount: Money::from_minor(order.amount),
                currency: order.currency,
                receipt: order.receipt,
            });
        record_request("create_order", &result);

        match &result {
            Ok(order) => tracing::info!(remote_order_id = %order.id, "remote order created"),
            Err(e) => tracing::error!(error = %e, "remote order creation failed"),
        }
        result
    }

    fn verify_signature(
        &self,
        payment_id: &str,
        remote_order_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError> {
        let result = signature::verify(&self.config.key_secret, remote_order_id, payment_id, signature);
        record_request("verify_signature", &result);
        result
    }

    #[tracing::instrument(skip(self), fields(gateway = "razorpay"))]
    async fn fetch_payment(&self, payment_id: &str) -> Result<RemotePayment, GatewayError> {
        let path = format!("payments/{payment_id}");
        let result = self
            .send::<PaymentResponse>(self.client.get(self.url(&path)))
            .await
            .map(|payment| RemotePayment {
                id: payment.id,
                order_id: payment.order_id,
                amount: Money::from_minor(payment.amount),
                status: payment.status,
            });
        record_request("fetch_payment", &result);

        if let Err(e) = &result {
            tracing::warn!(error = %e, "payment lookup failed");
        }
        result
    }

    #[tracing::instrument(skip(self), fields(gateway = "razorpay"))]
    async fn refund_payment(
        &self,
        payment_id: &str,
        amount: Option<Money>,
        reason: Option<&str>,
    ) -> Result<RemoteRefund, GatewayError> {
        if let Some(amount) = amount
            && !amount.is_positive()
        {
            let result = Err(GatewayError::InvalidAmount(amount));
            record_request("refund", &result);
            return result;
        }

        let mut body = serde_json::Map::new();
        if let Some(amount) = amount {
            body.insert("amount".to_string(), json!(amount.minor()));
        }
        if let Some(reason) = reason {
            body.insert("notes".to_string(), json!({ "reason": reason }));
        }

        let path = format!("payments/{payment_id}/refund");
        let result = self
            .send::<RefundResponse>(self.client.post(self.url(&path)).json(&body))
            .await
            .map(|refund| RemoteRefund {
                id: refund.id,
                payment_id: refund.payment_id,
                amount: Money::from_minor(refund.amount),
                status: refund.status,
            });
        record_request("refund", &result);

        if let Err(e) = &result {
            tracing::error!(error = %e, "refund failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = RazorpayConfig::new("rzp_test_key", "super_secret");
        let debug = format!("{config:?}");
        assert!(debug.contains("rzp_test_key"));
        assert!(!debug.contains("super_secret"));
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let config = RazorpayConfig::new("k", "s").with_api_base("http://localhost:9000/v1/");
        assert_eq!(config.api_base, "http://localhost:9000/v1");
    }

    #[test]
    fn test_api_error_prefers_description() {
        let body = r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"Authentication failed"}}"#;
        match api_error(StatusCode::UNAUTHORIZED, body) {
            GatewayError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Authentication failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_without_json_body() {
        match api_error(StatusCode::BAD_GATEWAY, "upstream down") {
            GatewayError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
