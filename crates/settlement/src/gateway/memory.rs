//! In-memory sandbox gateway for tests and credential-less local runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::Money;
use tokio::sync::RwLock;

use super::{
    GatewayError, PaymentGateway, RemoteOrder, RemotePayment, RemoteRefund, record_request,
    signature,
};

pub const SANDBOX_KEY_ID: &str = "rzp_test_sandbox";
const SANDBOX_KEY_SECRET: &str = "sandbox_secret";

#[derive(Debug, Default)]
struct SandboxState {
    orders: HashMap<String, RemoteOrder>,
    payments: HashMap<String, RemotePayment>,
    refunds: Vec<RemoteRefund>,
    next_id: u32,
    create_calls: u32,
    fail_on_create: bool,
    fail_on_fetch: bool,
    latency: Option<Duration>,
}

impl SandboxState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_sandbox{:06}", self.next_id)
    }
}

/// In-memory payment gateway.
///
/// Orders and payments live in memory; failures, latency and payment
/// statuses can be scripted by tests.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentGateway {
    key_id: String,
    key_secret: String,
    state: Arc<RwLock<SandboxState>>,
}

impl Default for InMemoryPaymentGateway {
    fn default() -> Self {
        Self::new(SANDBOX_KEY_ID, SANDBOX_KEY_SECRET)
    }
}

impl InMemoryPaymentGateway {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            state: Arc::default(),
        }
    }

    /// Configures order creation to fail.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Configures payment lookups to fail.
    pub async fn set_fail_on_fetch(&self, fail: bool) {
        self.state.write().await.fail_on_fetch = fail;
    }

    /// Delays every remote call by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }

    /// Simulates a customer paying a remote order; the payment gets `status`.
    ///
    /// Returns the new payment id, or `None` if the order is unknown.
    pub async fn record_payment(&self, remote_order_id: &str, status: &str) -> Option<String> {
        let mut state = self.state.write().await;
        let amount = state.orders.get(remote_order_id)?.amount;
        let id = state.next_id("pay");
        state.payments.insert(
            id.clone(),
            RemotePayment {
                id: id.clone(),
                order_id: Some(remote_order_id.to_string()),
                amount,
                status: status.to_string(),
            },
        );
        Some(id)
    }

    /// Produces the signature the processor would send for a callback.
    pub fn sign(&self, payment_id: &str, remote_order_id: &str) -> Result<String, GatewayError> {
        signature::sign(&self.key_secret, remote_order_id, payment_id)
    }

    /// Returns the number of remote orders created.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns how many times order creation was attempted.
    pub async fn create_calls(&self) -> u32 {
        self.state.read().await.create_calls
    }

    /// Returns the remote order with the given id.
    pub async fn remote_order(&self, remote_order_id: &str) -> Option<RemoteOrder> {
        self.state.read().await.orders.get(remote_order_id).cloned()
    }

    /// Returns the number of refunds issued.
    pub async fn refund_count(&self) -> usize {
        self.state.read().await.refunds.len()
    }

    async fn simulate_latency(&self) {
        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_remote_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteOrder, GatewayError> {
        self.simulate_latency().await;

        let result = {
            let mut state = self.state.write().await;
            state.create_calls += 1;

            if !amount.is_positive() {
                Err(GatewayError::InvalidAmount(amount))
            } else if state.fail_on_create {
                Err(GatewayError::Api {
                    status: 401,
                    message: "Authentication failed".to_string(),
                })
            } else {
                let order = RemoteOrder {
                    id: state.next_id("order"),
                    amount,
                    currency: currency.to_string(),
                    receipt: Some(receipt.to_string()),
                };
                state.orders.insert(order.id.clone(), order.clone());
                Ok(order)
            }
        };
        record_request("create_order", &result);
        result
    }

    fn verify_signature(
        &self,
        payment_id: &str,
        remote_order_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError> {
        let result = signature::verify(&self.key_secret, remote_order_id, payment_id, signature);
        record_request("verify_signature", &result);
        result
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<RemotePayment, GatewayError> {
        self.simulate_latency().await;

        let result = {
            let state = self.state.read().await;
            if state.fail_on_fetch {
                Err(GatewayError::Api {
                    status: 500,
                    message: "Payment lookup failed".to_string(),
                })
            } else {
                state
                    .payments
                    .get(payment_id)
                    .cloned()
                    .ok_or_else(|| GatewayError::Api {
                        status: 404,
                        message: "The id provided does not exist".to_string(),
                    })
            }
        };
        record_request("fetch_payment", &result);
        result
    }

    async fn refund_payment(
        &self,
        payment_id: &str,
        amount: Option<Money>,
        _reason: Option<&str>,
    ) -> Result<RemoteRefund, GatewayError> {
        self.simulate_latency().await;

        let result = {
            let mut state = self.state.write().await;
            match state.payments.get(payment_id).cloned() {
                None => Err(GatewayError::Api {
                    status: 404,
                    message: "The id provided does not exist".to_string(),
                }),
                Some(payment) if !payment.is_captured() => Err(GatewayError::Api {
                    status: 400,
                    message: "The payment has not been captured".to_string(),
                }),
                Some(payment) => {
                    let amount = amount.unwrap_or(payment.amount);
                    if !amount.is_positive() || amount > payment.amount {
                        Err(GatewayError::InvalidAmount(amount))
                    } else {
                        let refund = RemoteRefund {
                            id: state.next_id("rfnd"),
                            payment_id: payment.id.clone(),
                            amount,
                            status: "processed".to_string(),
                        };
                        if amount == payment.amount
                            && let Some(stored) = state.payments.get_mut(payment_id)
                        {
                            stored.status = "refunded".to_string();
                        }
                        state.refunds.push(refund.clone());
                        Ok(refund)
                    }
                }
            }
        };
        record_request("refund", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_order_and_capture() {
        let gateway = InMemoryPaymentGateway::default();
        let order = gateway
            .create_remote_order(Money::from_minor(1500), "INR", "order_1")
            .await
            .unwrap();

        assert!(order.id.starts_with("order_"));
        assert_eq!(order.amount, Money::from_minor(1500));
        assert_eq!(gateway.order_count().await, 1);

        let payment_id = gateway.record_payment(&order.id, "captured").await.unwrap();
        let payment = gateway.fetch_payment(&payment_id).await.unwrap();
        assert!(payment.is_captured());
        assert_eq!(payment.order_id.as_deref(), Some(order.id.as_str()));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let gateway = InMemoryPaymentGateway::default();
        let result = gateway
            .create_remote_order(Money::zero(), "INR", "order_1")
            .await;

        assert!(matches!(result, Err(GatewayError::InvalidAmount(_))));
        assert_eq!(gateway.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let gateway = InMemoryPaymentGateway::default();
        gateway.set_fail_on_create(true).await;

        let result = gateway
            .create_remote_order(Money::from_minor(100), "INR", "order_1")
            .await;
        assert!(matches!(result, Err(GatewayError::Api { status: 401, .. })));
        assert_eq!(gateway.create_calls().await, 1);
        assert_eq!(gateway.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_signature_round_trip() {
        let gateway = InMemoryPaymentGateway::default();
        let signature = gateway.sign("pay_1", "order_1").unwrap();

        assert!(gateway.verify_signature("pay_1", "order_1", &signature).is_ok());
        assert!(gateway.verify_signature("pay_2", "order_1", &signature).is_err());
    }

    #[tokio::test]
    async fn test_refund_only_captured_payments() {
        let gateway = InMemoryPaymentGateway::default();
        let order = gateway
            .create_remote_order(Money::from_minor(1000), "INR", "order_1")
            .await
            .unwrap();
        let authorized = gateway.record_payment(&order.id, "authorized").await.unwrap();
        let captured = gateway.record_payment(&order.id, "captured").await.unwrap();

        assert!(gateway.refund_payment(&authorized, None, None).await.is_err());

        let partial = gateway
            .refund_payment(&captured, Some(Money::from_minor(400)), Some("partial"))
            .await
            .unwrap();
        assert_eq!(partial.amount, Money::from_minor(400));
        assert_eq!(gateway.refund_count().await, 1);

        let too_much = gateway
            .refund_payment(&captured, Some(Money::from_minor(5000)), None)
            .await;
        assert!(matches!(too_much, Err(GatewayError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_unknown_payment() {
        let gateway = InMemoryPaymentGateway::default();
        assert!(gateway.fetch_payment("pay_missing").await.is_err());
        assert!(gateway.record_payment("order_missing", "captured").await.is_none());
    }
}
