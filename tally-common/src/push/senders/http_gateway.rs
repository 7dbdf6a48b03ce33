use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use crate::push::{PushError, PushNotification, SendPush};

/// Relays notifications to a web push gateway that holds the VAPID keys and
/// speaks the browser push protocols.
pub struct HttpGateway {
    client: reqwest::Client,
    gateway_url: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(gateway_url: &str, api_key: &str, timeout: Duration) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PushError::GatewayConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            gateway_url: String::from(gateway_url),
            api_key: String::from(api_key),
        })
    }
}

#[async_trait]
impl SendPush for HttpGateway {
    async fn send<'a>(
        &self,
        endpoint: &str,
        subscription_keys: &serde_json::Value,
        notification: PushNotification<'a>,
    ) -> Result<(), PushError> {
        let response = self
            .client
            .post(&self.gateway_url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "endpoint": endpoint,
                "keys": subscription_keys,
                "notification": notification,
            }))
            .send()
            .await
            .map_err(|e| PushError::GatewayConnectionFailed(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        // The push services answer 404/410 for endpoints that no longer exist
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(PushError::ExpiredSubscription);
        }

        Err(PushError::DeliveryFailed(format!(
            "Push gateway returned status {status}"
        )))
    }
}
