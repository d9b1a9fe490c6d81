//! Payment gateway abstraction.
//!
//! The booking flow needs two things from a payment provider: a hosted
//! checkout URL for a transaction, and a way to tell the provider's webhook
//! calls apart from anyone else's. The outcome itself arrives through the
//! webhook (see `core::transaction::handle_payment_webhook`).
//!
//! Webhook bodies are signed with HMAC-SHA256 over the raw body using a
//! shared secret; the hex digest travels in [`SIGNATURE_HEADER`].

use crate::{
    config::PaymentConfig,
    errors::{Error, Result},
};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

/// Header carrying the hex HMAC-SHA256 of the webhook body.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

type HmacSha256 = Hmac<Sha256>;

/// What the provider needs to open a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkRequest {
    /// Our transaction reference, echoed back by the webhook
    pub reference: String,
    /// Amount to charge, in the smallest currency unit
    pub amount: i64,
}

/// Abstraction over payment processors.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a checkout session and returns the URL the customer pays at.
    ///
    /// # Errors
    ///
    /// Returns `Error::PaymentGateway` if the provider refuses the request.
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String>;

    /// Checks that a webhook body was sent by the provider.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unauthorized` for a missing, malformed or wrong signature.
    fn verify_notification(&self, payload: &[u8], signature: Option<&str>) -> Result<()>;
}

/// Verifies a hex HMAC-SHA256 `signature` of `payload` under `secret`.
///
/// The comparison is constant-time.
pub fn verify_signature(secret: &[u8], payload: &[u8], signature: Option<&str>) -> Result<()> {
    let signature = signature.ok_or_else(|| Error::unauthorized("missing payment signature"))?;
    let expected = hex::decode(signature.trim())
        .map_err(|_| Error::unauthorized("malformed payment signature"))?;
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| Error::unauthorized("unusable webhook secret"))?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| Error::unauthorized("payment signature mismatch"))
}

/// Hex HMAC-SHA256 of `payload`, as the provider computes it.
#[cfg(test)]
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> String {
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Gateway for providers with a static hosted-checkout endpoint keyed by reference.
///
/// Without a configured `webhook_secret` every webhook is refused.
#[derive(Debug, Clone)]
pub struct HostedCheckoutGateway {
    base_url: String,
    webhook_secret: Option<String>,
}

impl HostedCheckoutGateway {
    /// Builds the gateway from the `[payment]` settings.
    #[must_use]
    pub fn new(config: &PaymentConfig) -> Self {
        let webhook_secret = config
            .webhook_secret
            .clone()
            .filter(|secret| !secret.is_empty());
        if webhook_secret.is_none() {
            tracing::warn!("No payment webhook secret configured; webhooks will be rejected");
        }
        Self {
            base_url: config.checkout_base_url.trim_end_matches('/').to_string(),
            webhook_secret,
        }
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared(config: &PaymentConfig) -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new(config))
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String> {
        if request.amount <= 0 {
            return Err(Error::PaymentGateway {
                message: format!("cannot charge {} for {}", request.amount, request.reference),
            });
        }
        let url = format!(
            "{}/{}?amount={}",
            self.base_url, request.reference, request.amount
        );
        tracing::debug!(reference = %request.reference, %url, "Payment link created");
        Ok(url)
    }

    fn verify_notification(&self, payload: &[u8], signature: Option<&str>) -> Result<()> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| Error::unauthorized("payment webhooks are not configured"))?;
        verify_signature(secret.as_bytes(), payload, signature)
    }
}

/// Webhook secret shared by [`MockPaymentGateway`] and the tests that sign for it.
#[cfg(test)]
pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

/// In-memory gateway for tests: records requests and optionally fails.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    fail: bool,
    requests: std::sync::Mutex<Vec<PaymentLinkRequest>>,
}

#[cfg(test)]
impl MockPaymentGateway {
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[allow(clippy::unwrap_used)]
    pub fn requests(&self) -> Vec<PaymentLinkRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    #[allow(clippy::unwrap_used)]
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(Error::PaymentGateway {
                message: "provider unavailable".to_string(),
            });
        }
        Ok(format!("https://pay.test/{}", request.reference))
    }

    fn verify_notification(&self, payload: &[u8], signature: Option<&str>) -> Result<()> {
        verify_signature(TEST_WEBHOOK_SECRET.as_bytes(), payload, signature)
    }
}
